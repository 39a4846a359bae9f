//! Whole-transaction behavior: validation, fees, refunds, contract creation.
#![allow(clippy::arithmetic_side_effects)]

mod common;

use bytes::Bytes;
use common::*;
use ferrum_common::{
    Address, U256,
    evm::calculate_create_address,
    types::{Fork, Transaction, TxKind},
};
use ferrum_evm::{
    Environment,
    db::gen_db::GeneralizedDatabase,
    errors::{ContextResult, ExceptionalHalt, ExecutionReport, TxResult, TxValidationError, VMError},
    vm::{ExecutionMode, Message, VM},
};
use hex_literal::hex;

fn execute(
    fork: Fork,
    accounts: Vec<TestAccount>,
    tx: &Transaction,
) -> (Result<ExecutionReport, VMError>, GeneralizedDatabase) {
    let mut db = make_test_db(fork, accounts);
    let env = make_test_env(fork, tx.gas_limit(), 0);
    let env = Environment {
        gas_price: tx.gas_price(),
        tx_nonce: tx.nonce(),
        ..env
    };
    let result = VM::new(env, &mut db, tx, ExecutionMode::default()).execute();
    (result, db)
}

#[test]
fn test_intrinsic_gas_and_fees() {
    let tx = make_call_tx(contract(), &[0, 1, 2], 100_000, 2);
    let (report, mut db) = execute(
        Fork::Byzantium,
        vec![TestAccount::eoa(sender(), ether(1))],
        &tx,
    );
    let report = report.expect("execution");
    let gas_used = INTRINSIC_GAS + 4 + 68 + 68;
    assert!(report.is_success());
    assert_eq!(report.gas_used, gas_used);

    let fee = U256::from(gas_used * 2);
    assert_eq!(db.get_account(sender()).expect("sender").info.balance, ether(1) - fee);
    assert_eq!(db.get_account(sender()).expect("sender").info.nonce, 1);
    assert_eq!(db.get_account(coinbase()).expect("coinbase").info.balance, fee);
}

#[test]
fn test_intrinsic_gas_too_low_is_rejected() {
    let tx = make_call_tx(contract(), &[1], 21_000, 1);
    let (report, mut db) = execute(
        Fork::Byzantium,
        vec![TestAccount::eoa(sender(), ether(1))],
        &tx,
    );
    assert_eq!(
        report,
        Err(VMError::TxValidation(TxValidationError::IntrinsicGasTooLow {
            intrinsic: 21_068,
            gas_limit: 21_000
        }))
    );
    let sender_account = db.get_account(sender()).expect("sender");
    assert_eq!(sender_account.info.balance, ether(1));
    assert_eq!(sender_account.info.nonce, 0);
}

#[test]
fn test_insufficient_funds_and_bad_nonce_are_rejected() {
    let tx = make_call_tx(contract(), &[], 21_000, 1);
    let (report, _) = execute(
        Fork::Byzantium,
        vec![TestAccount::eoa(sender(), U256::from(20_999))],
        &tx,
    );
    assert_eq!(
        report,
        Err(VMError::TxValidation(
            TxValidationError::InsufficientAccountFunds(sender())
        ))
    );

    let tx = Transaction {
        nonce: 5,
        ..make_call_tx(contract(), &[], 21_000, 1)
    };
    let (report, _) = execute(
        Fork::Byzantium,
        vec![TestAccount::eoa(sender(), ether(1))],
        &tx,
    );
    assert_eq!(
        report,
        Err(VMError::TxValidation(TxValidationError::NonceMismatch {
            expected: 0,
            actual: 5
        }))
    );
}

#[test]
fn test_refund_is_capped_at_half_the_gas_used() {
    // Clears slot 0: PUSH1 0, PUSH1 0, SSTORE, STOP
    let tx = make_call_tx(contract(), &[], 100_000, 1);
    let (report, mut db) = execute(
        Fork::Frontier,
        vec![
            TestAccount::eoa(sender(), ether(1)),
            TestAccount::contract(contract(), &hex!("600060005500")).with_storage(&[(0, 1)]),
        ],
        &tx,
    );
    let report = report.expect("execution");
    let gas_before_refund = INTRINSIC_GAS + 3 + 3 + 5_000;
    let refund = gas_before_refund / 2;
    assert!(report.is_success());
    assert_eq!(report.gas_refunded, refund);
    assert_eq!(report.gas_used, gas_before_refund - refund);
    assert_eq!(
        db.get_storage_value(contract(), slot(0)).expect("storage"),
        U256::zero()
    );
}

#[test]
fn test_failed_transaction_charges_all_gas_and_keeps_nonce() {
    let tx = Transaction {
        value: U256::from(10),
        ..make_call_tx(contract(), &[], 60_000, 1)
    };
    let (report, mut db) = execute(
        Fork::Byzantium,
        vec![
            TestAccount::eoa(sender(), ether(1)),
            TestAccount::contract(contract(), &hex!("fe")),
        ],
        &tx,
    );
    let report = report.expect("execution");
    assert!(!report.is_success());
    assert_eq!(report.gas_used, 60_000);
    assert!(report.logs.is_empty());

    let sender_account = db.get_account(sender()).expect("sender");
    assert_eq!(sender_account.info.nonce, 1);
    assert_eq!(sender_account.info.balance, ether(1) - U256::from(60_000));
    assert_eq!(
        db.get_account(contract()).expect("contract").info.balance,
        U256::zero()
    );
}

#[test]
fn test_logs_are_reported_on_success() {
    // LOG1(0, 0, topic 0xaa)
    let tx = make_call_tx(contract(), &[], 100_000, 0);
    let (report, _) = execute(
        Fork::Byzantium,
        vec![
            TestAccount::eoa(sender(), ether(1)),
            TestAccount::contract(contract(), &hex!("60aa60006000a100")),
        ],
        &tx,
    );
    let report = report.expect("execution");
    assert_eq!(report.logs.len(), 1);
    assert_eq!(report.logs[0].address, contract());
    assert_eq!(report.logs[0].topics[0].to_low_u64_be(), 0xaa);
}

/// Init code returning 100 zero bytes: PUSH1 100, PUSH1 0, RETURN
const RETURN_100_BYTES: [u8; 5] = hex!("60646000f3");

fn create_with_gas(fork: Fork, gas_limit: u64) -> (ContextResult, Address) {
    let mut db = make_test_db(fork, vec![TestAccount::eoa(sender(), ether(1))]);
    let env = make_test_env(fork, gas_limit, 0);
    let tx = Transaction::default();
    let mut vm = VM::new(env, &mut db, &tx, ExecutionMode::default());
    let message = Message {
        sender: sender(),
        data: Bytes::from_static(&RETURN_100_BYTES),
        gas_limit,
        touch_nonce: true,
        should_transfer_value: true,
        ..Default::default()
    };
    let result = vm.create_contract(message).expect("create");
    (result, calculate_create_address(sender(), 0))
}

#[test]
fn test_create_deposit_failure() {
    // Init code costs 18 gas, the deposit 20000.
    let (result, _) = create_with_gas(Fork::Homestead, 10_000);
    assert_eq!(
        result.result,
        TxResult::Revert(ExceptionalHalt::OutOfGas.into())
    );
    assert_eq!(result.created_address, None);
    assert_eq!(result.gas_used, 10_000);

    // Frontier keeps the account, without code.
    let (result, address) = create_with_gas(Fork::Frontier, 10_000);
    assert!(result.is_success());
    assert_eq!(result.created_address, Some(address));
    assert_eq!(result.gas_used, 18);
}

#[test]
fn test_create_with_max_nonce_fails_without_state_change() {
    let fork = Fork::Byzantium;
    let mut db = make_test_db(fork, vec![TestAccount::eoa(sender(), ether(1))]);
    db.set_account_nonce(sender(), u64::MAX).expect("set nonce");
    let env = make_test_env(fork, 100_000, 0);
    let tx = Transaction::default();
    let mut vm = VM::new(env, &mut db, &tx, ExecutionMode::default());
    let message = Message {
        sender: sender(),
        data: Bytes::from_static(&RETURN_100_BYTES),
        gas_limit: 100_000,
        touch_nonce: true,
        should_transfer_value: true,
        ..Default::default()
    };

    let result = vm.create_contract(message).expect("create");
    assert_eq!(
        result.result,
        TxResult::Revert(ExceptionalHalt::NonceOverflow.into())
    );
    assert_eq!(result.gas_used, 0);
    assert_eq!(result.created_address, None);
    assert_eq!(db.get_account(sender()).expect("sender").info.nonce, u64::MAX);
}

#[test]
fn test_create_stores_code() {
    let (result, address) = create_with_gas(Fork::Byzantium, 100_000);
    assert!(result.is_success());
    assert_eq!(result.created_address, Some(address));
    assert_eq!(result.gas_used, 18 + 100 * 200);
}

#[test]
fn test_create_transaction_sets_contract_nonce() {
    let tx = Transaction {
        to: TxKind::Create,
        data: Bytes::from_static(&RETURN_100_BYTES),
        gas: 200_000,
        ..Default::default()
    };
    let (report, mut db) = execute(
        Fork::SpuriousDragon,
        vec![TestAccount::eoa(sender(), ether(1))],
        &tx,
    );
    let report = report.expect("execution");
    let address = calculate_create_address(sender(), 0);
    assert_eq!(report.created_address, Some(address));

    let created = db.get_account(address).expect("created");
    assert_eq!(created.info.nonce, 1);
    assert_eq!(db.get_account_code(address).expect("code").len(), 100);
}

#[test]
fn test_selfdestruct_moves_balance_and_deletes_account() {
    let beneficiary = Address::from_low_u64_be(0xbe);
    // SELFDESTRUCT(0xbe)
    let code = hex!("60be ff");
    let tx = make_call_tx(contract(), &[], 100_000, 1);
    let mut contract_account = TestAccount::contract(contract(), &code);
    contract_account.balance = U256::from(500);
    let (report, mut db) = execute(
        Fork::Byzantium,
        vec![TestAccount::eoa(sender(), ether(1)), contract_account],
        &tx,
    );
    let report = report.expect("execution");
    assert!(report.is_success());

    // 21000 + 3 + 5000 + 25000 (new beneficiary), half refunded at most
    let gas_before_refund = INTRINSIC_GAS + 3 + 5_000 + 25_000;
    assert_eq!(report.gas_refunded, 24_000);
    assert_eq!(report.gas_used, gas_before_refund - 24_000);

    assert!(!db.get_account(contract()).expect("contract").exists);
    assert_eq!(
        db.get_account(beneficiary).expect("beneficiary").info.balance,
        U256::from(500)
    );
}

#[test]
fn test_touched_empty_accounts_cleared_from_spurious_dragon() {
    let empty = Address::from_low_u64_be(0xe0);
    let tx = make_call_tx(empty, &[], 100_000, 0);
    for (fork, survives) in [(Fork::TangerineWhistle, true), (Fork::SpuriousDragon, false)] {
        let (report, mut db) = execute(fork, vec![TestAccount::eoa(sender(), ether(1))], &tx);
        assert!(report.expect("execution").is_success());
        assert_eq!(
            db.get_account(empty).expect("account").exists,
            survives,
            "{fork:?}"
        );
        // The zero-fee coinbase is touched as well.
        assert_eq!(
            db.get_account(coinbase()).expect("coinbase").exists,
            survives,
            "{fork:?}"
        );
    }
}
