//! Shared helpers for the interpreter and transaction tests.
#![allow(dead_code, clippy::arithmetic_side_effects)]

use bytes::Bytes;
use ferrum_common::{
    Address, H256, U256,
    types::{Account, ChainConfig, Code, Fork, ForkConfig, Transaction, TxKind},
};
use ferrum_evm::{
    EVMConfig, Environment,
    db::{InMemoryDatabase, gen_db::GeneralizedDatabase},
    errors::ContextResult,
    vm::{ExecutionMode, Message, VM},
};
use rustc_hash::FxHashMap;
use std::sync::Arc;

pub const CONTRACT_ADDR: u64 = 0x42;
pub const SENDER_ADDR: u64 = 0x100;
pub const COINBASE_ADDR: u64 = 0xc0ffee;
pub const INTRINSIC_GAS: u64 = 21_000;

pub fn contract() -> Address {
    Address::from_low_u64_be(CONTRACT_ADDR)
}

pub fn sender() -> Address {
    Address::from_low_u64_be(SENDER_ADDR)
}

pub fn coinbase() -> Address {
    Address::from_low_u64_be(COINBASE_ADDR)
}

pub fn ether(amount: u64) -> U256 {
    U256::from(amount) * U256::exp10(18)
}

/// Account setup entry for [`make_test_db`].
pub struct TestAccount {
    pub address: Address,
    pub balance: U256,
    pub code: Vec<u8>,
    pub storage: Vec<(u64, u64)>,
}

impl TestAccount {
    pub fn eoa(address: Address, balance: U256) -> Self {
        Self {
            address,
            balance,
            code: Vec::new(),
            storage: Vec::new(),
        }
    }

    pub fn contract(address: Address, code: &[u8]) -> Self {
        Self {
            address,
            balance: U256::zero(),
            code: code.to_vec(),
            storage: Vec::new(),
        }
    }

    pub fn with_storage(mut self, storage: &[(u64, u64)]) -> Self {
        self.storage = storage.to_vec();
        self
    }
}

pub fn slot(key: u64) -> H256 {
    H256::from_low_u64_be(key)
}

/// A journaled database over an in-memory store holding `accounts`.
pub fn make_test_db(fork: Fork, accounts: Vec<TestAccount>) -> GeneralizedDatabase {
    let chain_config = ChainConfig {
        chain_id: 1,
        forks: ForkConfig::single(fork),
    };
    let mut store = InMemoryDatabase::new(chain_config);
    for account in accounts {
        let storage: FxHashMap<H256, U256> = account
            .storage
            .iter()
            .map(|(key, value)| (slot(*key), U256::from(*value)))
            .collect();
        let code = Code::from_bytecode(Bytes::from(account.code));
        store.add_account(
            account.address,
            Account::new(account.balance, code, 0, storage),
        );
    }
    GeneralizedDatabase::new(Arc::new(store))
}

pub fn make_test_env(fork: Fork, gas_limit: u64, gas_price: u64) -> Environment {
    Environment {
        origin: sender(),
        gas_limit,
        config: EVMConfig::new(fork),
        block_number: 1,
        coinbase: coinbase(),
        chain_id: 1,
        gas_price: U256::from(gas_price),
        block_gas_limit: 10_000_000,
        ..Default::default()
    }
}

pub fn make_call_tx(to: Address, data: &[u8], gas_limit: u64, gas_price: u64) -> Transaction {
    Transaction {
        to: TxKind::Call(to),
        data: Bytes::copy_from_slice(data),
        gas: gas_limit,
        gas_price: U256::from(gas_price),
        ..Default::default()
    }
}

/// Runs a message call from [`sender`] to `to` outside of any transaction.
pub fn run_message(
    db: &mut GeneralizedDatabase,
    fork: Fork,
    mode: ExecutionMode,
    message: Message,
) -> ContextResult {
    let env = make_test_env(fork, message.gas_limit, 0);
    let tx = Transaction::default();
    let mut vm = VM::new(env, db, &tx, mode);
    vm.call_message(message).expect("message call")
}

pub fn message_to(to: Address, gas_limit: u64) -> Message {
    Message {
        sender: sender(),
        to,
        code_address: to,
        gas_limit,
        should_transfer_value: true,
        ..Default::default()
    }
}

/// Runs `code` as the code of [`contract`] with `gas_limit` gas.
pub fn run_code(fork: Fork, code: &[u8], gas_limit: u64) -> (ContextResult, GeneralizedDatabase) {
    let mut db = make_test_db(
        fork,
        vec![
            TestAccount::contract(contract(), code),
            TestAccount::eoa(sender(), ether(1)),
        ],
    );
    let result = run_message(
        &mut db,
        fork,
        ExecutionMode::default(),
        message_to(contract(), gas_limit),
    );
    (result, db)
}
