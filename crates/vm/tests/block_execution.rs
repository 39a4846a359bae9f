//! Block driver: receipts, block gas checks and mining rewards.

use bytes::Bytes;
use ferrum_common::{
    Address, U256,
    constants::WEI_PER_ETHER,
    types::{
        Account, Block, BlockBody, BlockHeader, ChainConfig, Code, Fork, ForkConfig,
        ReceiptOutcome, Transaction, TxKind,
    },
};
use ferrum_vm::{Database, Evm, EvmError, InMemoryDatabase};
use hex_literal::hex;
use rustc_hash::FxHashMap;
use std::sync::Arc;

const COINBASE: Address = Address::repeat_byte(0xc0);
const RECIPIENT: Address = Address::repeat_byte(0xde);
const CONTRACT: Address = Address::repeat_byte(0x42);

fn secret_key() -> secp256k1::SecretKey {
    secp256k1::SecretKey::from_slice(&[0x11; 32]).expect("valid secret key")
}

fn ether(amount: u64) -> U256 {
    U256::from(WEI_PER_ETHER) * U256::from(amount)
}

fn signed_tx(nonce: u64, to: Address, value: u64, gas: u64) -> Transaction {
    let mut tx = Transaction {
        nonce,
        gas_price: U256::from(10),
        gas,
        to: TxKind::Call(to),
        value: U256::from(value),
        ..Default::default()
    };
    tx.sign_inplace(&secret_key(), None);
    tx
}

fn sender() -> Address {
    signed_tx(0, RECIPIENT, 0, 21_000).sender().expect("sender")
}

/// A store holding the sender's funds and a contract that stores 1 in slot 0.
fn store(fork: Fork) -> InMemoryDatabase {
    let mut store = InMemoryDatabase::new(ChainConfig::new(1, ForkConfig::single(fork)));
    store.add_account(
        sender(),
        Account::new(ether(10), Code::default(), 0, FxHashMap::default()),
    );
    store.add_account(
        CONTRACT,
        Account::new(
            U256::zero(),
            Code::from_bytecode(Bytes::from_static(&hex!("600160005500"))),
            0,
            FxHashMap::default(),
        ),
    );
    store
}

fn block(transactions: Vec<Transaction>, gas_used: u64) -> Block {
    Block::new(
        BlockHeader {
            coinbase: COINBASE,
            number: 1,
            gas_limit: 1_000_000,
            gas_used,
            timestamp: 1_000,
            ..Default::default()
        },
        BlockBody {
            transactions,
            ommers: Vec::new(),
        },
    )
}

#[test]
fn test_byzantium_block_receipts_and_rewards() {
    let mut evm = Evm::new(Arc::new(store(Fork::Byzantium)));
    let transactions = vec![
        signed_tx(0, RECIPIENT, 1_000, 21_000),
        signed_tx(1, CONTRACT, 0, 100_000),
    ];
    let contract_call_gas = 21_000 + 3 + 3 + 20_000;
    let block = block(transactions, 21_000 + contract_call_gas);

    let result = evm.execute_block(&block).expect("block executes");
    assert_eq!(result.block_gas_used, 21_000 + contract_call_gas);
    assert_eq!(result.receipts.len(), 2);
    assert_eq!(result.receipts[0].outcome, ReceiptOutcome::Status(true));
    assert_eq!(result.receipts[0].cumulative_gas_used, 21_000);
    assert_eq!(
        result.receipts[1].cumulative_gas_used,
        21_000 + contract_call_gas
    );
    assert!(result.results.iter().all(|result| result.is_success()));
    assert_eq!(result.results[1].gas_used, contract_call_gas);
    assert_eq!(result.results[1].gas_price, U256::from(10));

    let fees = U256::from((21_000 + contract_call_gas) * 10);
    let coinbase = evm.db.get_account(COINBASE).expect("coinbase");
    assert_eq!(coinbase.info.balance, ether(3) + fees);
    let recipient = evm.db.get_account(RECIPIENT).expect("recipient");
    assert_eq!(recipient.info.balance, U256::from(1_000));
    assert_eq!(
        evm.db
            .get_storage_value(CONTRACT, Default::default())
            .expect("slot"),
        U256::one()
    );
}

#[test]
fn test_pre_byzantium_receipts_carry_state_root() {
    let mut evm = Evm::new(Arc::new(store(Fork::Frontier)));
    let block = block(vec![signed_tx(0, RECIPIENT, 1, 21_000)], 21_000);

    let result = evm.execute_block(&block).expect("block executes");
    let root_after_tx = result.results[0].state_root;
    assert_eq!(
        result.receipts[0].outcome,
        ReceiptOutcome::PostState(root_after_tx)
    );
    assert_eq!(result.receipts[0].succeeded(), None);
    // The mining reward comes after the last receipt.
    assert_ne!(evm.state_root().expect("root"), root_after_tx);
    assert_eq!(
        evm.db.get_account(COINBASE).expect("coinbase").info.balance,
        ether(5) + U256::from(210_000)
    );
}

#[test]
fn test_gas_used_mismatch_rejects_block() {
    let mut evm = Evm::new(Arc::new(store(Fork::Byzantium)));
    let block = block(vec![signed_tx(0, RECIPIENT, 1, 21_000)], 21_001);
    assert!(matches!(
        evm.execute_block(&block),
        Err(EvmError::InvalidTransition(_))
    ));
}

#[test]
fn test_transaction_over_block_gas_limit_rejects_block() {
    let mut evm = Evm::new(Arc::new(store(Fork::Byzantium)));
    let mut block = block(
        vec![
            signed_tx(0, RECIPIENT, 1, 600_000),
            signed_tx(1, RECIPIENT, 1, 990_000),
        ],
        42_000,
    );
    block.header.gas_limit = 1_000_000;
    assert!(matches!(
        evm.execute_block(&block),
        Err(EvmError::InvalidTransition(message)) if message.contains("Gas allowance exceeded")
    ));
}

#[test]
fn test_invalid_nonce_rejects_block() {
    let mut evm = Evm::new(Arc::new(store(Fork::Byzantium)));
    let block = block(vec![signed_tx(3, RECIPIENT, 1, 21_000)], 21_000);
    assert!(matches!(
        evm.execute_block(&block),
        Err(EvmError::Transaction(_))
    ));
}

#[test]
fn test_high_s_signature_valid_only_in_frontier() {
    let mut tx = signed_tx(0, RECIPIENT, 1, 21_000);
    let n = U256::from_big_endian(&hex!(
        "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141"
    ));
    tx.s = n - tx.s;
    tx.v = if tx.v == U256::from(27) {
        U256::from(28)
    } else {
        U256::from(27)
    };
    tx.sender_cache = Default::default();

    let mut frontier = Evm::new(Arc::new(store(Fork::Frontier)));
    let result = frontier
        .execute_block(&block(vec![tx.clone()], 21_000))
        .expect("frontier accepts high s");
    assert!(result.results[0].is_success());

    let mut homestead = Evm::new(Arc::new(store(Fork::Homestead)));
    assert!(matches!(
        homestead.execute_block(&block(vec![tx], 21_000)),
        Err(EvmError::Transaction(_))
    ));
}

#[test]
fn test_state_transitions_apply_to_store() {
    let mut store = store(Fork::Byzantium);
    let mut evm = Evm::new(Arc::new(store.clone()));
    let block = block(vec![signed_tx(0, RECIPIENT, 7, 21_000)], 21_000);
    evm.execute_block(&block).expect("block executes");

    let updates = evm.get_state_transitions().expect("transitions");
    let expected_root = evm.state_root().expect("root");
    store.apply_account_updates(&updates);
    assert_eq!(store.state_root(&[]).expect("root"), expected_root);
    assert_eq!(
        store.get_account_info(RECIPIENT).expect("info").balance,
        U256::from(7)
    );
    assert_eq!(store.get_account_info(sender()).expect("info").nonce, 1);
}
