//! Frame-level behavior: gas accounting, jumps, storage, reverts, nested calls.
#![allow(clippy::arithmetic_side_effects)]

mod common;

use common::*;
use ferrum_common::{Address, U256, types::Fork};
use ferrum_evm::{
    errors::{ContextResult, ExceptionalHalt, PrecompileError, TxResult, VMError},
    vm::{ExecutionMode, Message},
};
use hex_literal::hex;

fn halt(result: &TxResult) -> Option<ExceptionalHalt> {
    match result {
        TxResult::Revert(VMError::ExceptionalHalt(halt)) => Some(halt.clone()),
        _ => None,
    }
}

#[test]
fn test_add_scenario() {
    // PUSH1 0, PUSH1 0, ADD, STOP
    let (result, _) = run_code(Fork::Frontier, &hex!("6000600001 00"), 100_000);
    assert!(result.is_success());
    assert!(result.output.is_empty());
    assert_eq!(result.gas_used, 9);
}

#[test]
fn test_gas_monotonicity() {
    let code = hex!("600060000100");
    for gas_limit in 0..20 {
        let (result, _) = run_code(Fork::Byzantium, &code, gas_limit);
        assert!(result.gas_used <= gas_limit);
        if gas_limit < 9 {
            assert_eq!(halt(&result.result), Some(ExceptionalHalt::OutOfGas));
            assert_eq!(result.gas_used, gas_limit);
        } else {
            assert!(result.is_success());
            assert_eq!(result.gas_used, 9);
        }
    }
}

#[test]
fn test_jump_to_jumpdest() {
    // PUSH1 4, JUMP, STOP, JUMPDEST, PUSH1 1, PUSH1 0, MSTORE8, PUSH1 1, PUSH1 0, RETURN
    let code = hex!("600456005b6001600053 60016000f3");
    let (result, _) = run_code(Fork::Frontier, &code, 100_000);
    assert!(result.is_success());
    assert_eq!(result.output.as_ref(), &[1]);
}

#[test]
fn test_jump_into_push_data_fails() {
    // PUSH1 0x5b, PUSH1 1, JUMP: offset 1 is the immediate of the first push
    let code = hex!("605b600156");
    let (result, _) = run_code(Fork::Frontier, &code, 50_000);
    assert_eq!(halt(&result.result), Some(ExceptionalHalt::InvalidJump));
    assert_eq!(result.gas_used, 50_000);
}

#[test]
fn test_jumpi_not_taken_ignores_destination() {
    // PUSH1 0, PUSH1 0xff, JUMPI, STOP
    let (result, _) = run_code(Fork::Frontier, &hex!("600060ff5700"), 100);
    assert!(result.is_success());
    assert_eq!(result.gas_used, 3 + 3 + 10);
}

#[test]
fn test_keep_gas_mode_returns_unused_gas() {
    let mut db = make_test_db(
        Fork::Frontier,
        vec![TestAccount::contract(contract(), &hex!("605b600156"))],
    );
    let result = run_message(
        &mut db,
        Fork::Frontier,
        ExecutionMode::KeepGasOnException,
        message_to(contract(), 50_000),
    );
    assert_eq!(halt(&result.result), Some(ExceptionalHalt::InvalidJump));
    assert_eq!(result.gas_used, 3 + 3 + 8);
}

#[test]
fn test_sstore_set_and_reset() {
    // PUSH1 1, PUSH1 0, SSTORE, STOP
    let (result, mut db) = run_code(Fork::Frontier, &hex!("600160005500"), 100_000);
    assert!(result.is_success());
    assert_eq!(result.gas_used, 3 + 3 + 20_000);
    assert_eq!(
        db.get_storage_value(contract(), slot(0)).expect("storage"),
        U256::one()
    );

    // Writing the same value again only pays the reset cost.
    let mut db = make_test_db(
        Fork::Frontier,
        vec![TestAccount::contract(contract(), &hex!("600160005500")).with_storage(&[(0, 1)])],
    );
    let result = run_message(
        &mut db,
        Fork::Frontier,
        ExecutionMode::default(),
        message_to(contract(), 100_000),
    );
    assert!(result.is_success());
    assert_eq!(result.gas_used, 3 + 3 + 5_000);
}

#[test]
fn test_revert_keeps_gas_and_rolls_back_storage() {
    // PUSH1 1, PUSH1 0, SSTORE, PUSH1 2, PUSH1 0, MSTORE8... REVERT(0, 1)
    let code = hex!("6001600055 6002600053 60016000fd");
    let (result, mut db) = run_code(Fork::Byzantium, &code, 100_000);
    assert_eq!(result.result, TxResult::Revert(VMError::RevertOpcode));
    assert_eq!(result.output.as_ref(), &[2]);
    assert_eq!(result.gas_used, 3 + 3 + 20_000 + 3 + 3 + 6 + 3 + 3);
    assert_eq!(
        db.get_storage_value(contract(), slot(0)).expect("storage"),
        U256::zero()
    );
}

#[test]
fn test_exceptional_halt_reverts_everything() {
    // PUSH1 1, PUSH1 0, SSTORE, INVALID
    let code = hex!("6001600055fe");
    let mut db = make_test_db(
        Fork::Byzantium,
        vec![
            TestAccount::contract(contract(), &code).with_storage(&[(0, 7)]),
            TestAccount::eoa(sender(), ether(1)),
        ],
    );
    let message = Message {
        value: U256::from(1000),
        ..message_to(contract(), 100_000)
    };
    let result = run_message(&mut db, Fork::Byzantium, ExecutionMode::default(), message);

    assert_eq!(halt(&result.result), Some(ExceptionalHalt::InvalidOpcode));
    assert_eq!(result.gas_used, 100_000);
    assert_eq!(
        db.get_storage_value(contract(), slot(0)).expect("storage"),
        U256::from(7)
    );
    assert_eq!(db.get_account(sender()).expect("sender").info.balance, ether(1));
    assert_eq!(
        db.get_account(contract()).expect("contract").info.balance,
        U256::zero()
    );
}

#[test]
fn test_revert_opcode_missing_before_byzantium() {
    let (result, _) = run_code(Fork::SpuriousDragon, &hex!("60006000fd"), 10_000);
    assert_eq!(halt(&result.result), Some(ExceptionalHalt::InvalidOpcode));
}

#[test]
fn test_stack_underflow() {
    let (result, _) = run_code(Fork::Frontier, &hex!("01"), 10_000);
    assert_eq!(halt(&result.result), Some(ExceptionalHalt::StackUnderflow));
}

#[test]
fn test_returndatacopy_out_of_bounds() {
    // RETURNDATACOPY(0, 0, 1) with no return data
    let (result, _) = run_code(Fork::Byzantium, &hex!("600160006000 3e"), 10_000);
    assert_eq!(halt(&result.result), Some(ExceptionalHalt::OutOfBounds));
}

#[test]
fn test_blockhash_outside_window_is_zero() {
    // BLOCKHASH(1) in block 1, MSTORE at 0, RETURN 32 bytes
    let (result, _) = run_code(Fork::Frontier, &hex!("600140 600052 60206000f3"), 10_000);
    assert!(result.is_success());
    assert_eq!(result.output.as_ref(), &[0u8; 32]);
}

/// Calls itself with all the gas it can forward, then stores `call result + 1` in slot 0.
const SELF_CALL: [u8; 20] = hex!("6000600060006000600030 5a f1 600101 600055 00");

#[test]
fn test_call_depth_limit() {
    for (depth, expected) in [(1024, 1), (1023, 2)] {
        let mut db = make_test_db(
            Fork::Byzantium,
            vec![TestAccount::contract(contract(), &SELF_CALL)],
        );
        let message = Message {
            depth,
            ..message_to(contract(), 1_000_000)
        };
        let result = run_message(&mut db, Fork::Byzantium, ExecutionMode::default(), message);
        assert!(result.is_success(), "depth {depth}");
        assert_eq!(
            db.get_storage_value(contract(), slot(0)).expect("storage"),
            U256::from(expected),
            "depth {depth}"
        );
    }
}

#[test]
fn test_message_beyond_depth_limit_fails_without_gas() {
    let mut db = make_test_db(Fork::Byzantium, vec![]);
    let message = Message {
        depth: 1025,
        ..message_to(contract(), 1_000)
    };
    let result = run_message(&mut db, Fork::Byzantium, ExecutionMode::default(), message);
    assert_eq!(halt(&result.result), Some(ExceptionalHalt::CallDepthExceeded));
    assert_eq!(result.gas_used, 0);
}

#[test]
fn test_staticcall_rejects_sstore() {
    let callee = Address::from_low_u64_be(0x43);
    // STATICCALL(gas, callee, 0, 0, 0, 0), then store the result in slot 0
    let caller_code = hex!("600060006000600073 0000000000000000000000000000000000000043 5a fa 600055 00");
    let mut db = make_test_db(
        Fork::Byzantium,
        vec![
            TestAccount::contract(contract(), &caller_code).with_storage(&[(0, 9)]),
            TestAccount::contract(callee, &hex!("600160005500")),
        ],
    );
    let result = run_message(
        &mut db,
        Fork::Byzantium,
        ExecutionMode::default(),
        message_to(contract(), 2_000_000),
    );
    assert!(result.is_success());
    assert_eq!(
        db.get_storage_value(contract(), slot(0)).expect("storage"),
        U256::zero()
    );
    assert_eq!(
        db.get_storage_value(callee, slot(0)).expect("storage"),
        U256::zero()
    );
}

#[test]
fn test_ecrecover_invalid_signature_costs_fixed_gas() {
    let ecrecover = Address::from_low_u64_be(1);
    let mut input = [0u8; 128];
    input[63] = 27;
    input[95] = 1;
    // s = 0 is outside [1, n)
    let mut db = make_test_db(Fork::Byzantium, vec![TestAccount::eoa(sender(), ether(1))]);
    let message = Message {
        data: bytes::Bytes::copy_from_slice(&input),
        ..message_to(ecrecover, 100_000)
    };
    let result = run_message(&mut db, Fork::Byzantium, ExecutionMode::default(), message);
    assert_eq!(
        halt(&result.result),
        Some(ExceptionalHalt::Precompile(PrecompileError::InvalidSignature))
    );
    assert_eq!(result.gas_used, 3000);
    assert!(result.output.is_empty());
}

#[test]
fn test_identity_precompile_through_call() {
    let identity = Address::from_low_u64_be(4);
    let mut db = make_test_db(Fork::Frontier, vec![TestAccount::eoa(sender(), ether(1))]);
    let message = Message {
        data: bytes::Bytes::from_static(&[1, 2, 3]),
        ..message_to(identity, 100)
    };
    let result = run_message(&mut db, Fork::Frontier, ExecutionMode::default(), message);
    assert!(result.is_success());
    assert_eq!(result.output.as_ref(), &[1, 2, 3]);
    assert_eq!(result.gas_used, 18);
}

/// Code that pushes `operands` in order, runs `opcode` and returns the top word.
fn binary_op_code(operands: [U256; 2], opcode: u8) -> Vec<u8> {
    let mut code = Vec::new();
    for operand in operands {
        code.push(0x7f);
        code.extend_from_slice(&operand.to_big_endian());
    }
    code.push(opcode);
    // PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, RETURN
    code.extend_from_slice(&hex!("600052 60206000f3"));
    code
}

fn returned_word(result: &ContextResult) -> U256 {
    assert!(result.is_success());
    U256::from_big_endian(&result.output)
}

#[test]
fn test_sdiv_min_by_minus_one_wraps() {
    let min = U256::one() << 255;
    // divisor pushed first, dividend on top
    let code = binary_op_code([U256::MAX, min], 0x05);
    let (result, _) = run_code(Fork::Frontier, &code, 100_000);
    assert_eq!(returned_word(&result), min);
}

#[test]
fn test_sdiv_by_zero_is_zero() {
    let code = binary_op_code([U256::zero(), U256::MAX], 0x05);
    let (result, _) = run_code(Fork::Frontier, &code, 100_000);
    assert_eq!(returned_word(&result), U256::zero());
}

#[test]
fn test_signextend_low_byte() {
    // value first, byte index on top
    let code = binary_op_code([U256::from(0xff), U256::zero()], 0x0b);
    let (result, _) = run_code(Fork::Frontier, &code, 100_000);
    assert_eq!(returned_word(&result), U256::MAX);

    let code = binary_op_code([U256::from(0x7f), U256::zero()], 0x0b);
    let (result, _) = run_code(Fork::Frontier, &code, 100_000);
    assert_eq!(returned_word(&result), U256::from(0x7f));
}

#[test]
fn test_signextend_wide_index_is_identity() {
    let value = U256::one() << 255 | U256::from(0x80);
    for index in [31u64, 32, 1000] {
        let code = binary_op_code([value, U256::from(index)], 0x0b);
        let (result, _) = run_code(Fork::Frontier, &code, 100_000);
        assert_eq!(returned_word(&result), value);
    }
}

#[test]
fn test_mstore_pays_memory_expansion() {
    // PUSH1 1, PUSH1 0, MSTORE, STOP: one word
    let (result, _) = run_code(Fork::Frontier, &hex!("6001600052 00"), 100_000);
    assert!(result.is_success());
    assert_eq!(result.gas_used, 3 + 3 + 3 + 3);

    // PUSH1 1, PUSH2 0x7fe0, MSTORE, STOP: 1024 words, 3 * 1024 + 1024^2 / 512
    let (result, _) = run_code(Fork::Byzantium, &hex!("6001617fe052 00"), 100_000);
    assert!(result.is_success());
    assert_eq!(result.gas_used, 3 + 3 + 3 + 5120);
}
