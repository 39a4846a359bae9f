use crate::{
    errors::{ExceptionalHalt, InternalError, VMError},
    utils::words_for,
};
use ExceptionalHalt::OutOfGas;
use ferrum_common::U256;

// Opcodes cost
pub const STOP: u64 = 0;
pub const ADD: u64 = 3;
pub const MUL: u64 = 5;
pub const SUB: u64 = 3;
pub const DIV: u64 = 5;
pub const SDIV: u64 = 5;
pub const MOD: u64 = 5;
pub const SMOD: u64 = 5;
pub const ADDMOD: u64 = 8;
pub const MULMOD: u64 = 8;
pub const EXP_STATIC: u64 = 10;
pub const SIGNEXTEND: u64 = 5;
pub const LT: u64 = 3;
pub const GT: u64 = 3;
pub const SLT: u64 = 3;
pub const SGT: u64 = 3;
pub const EQ: u64 = 3;
pub const ISZERO: u64 = 3;
pub const AND: u64 = 3;
pub const OR: u64 = 3;
pub const XOR: u64 = 3;
pub const NOT: u64 = 3;
pub const BYTE: u64 = 3;
pub const KECCAK25_STATIC: u64 = 30;
pub const KECCAK25_DYNAMIC_BASE: u64 = 6;
pub const CALLDATALOAD: u64 = 3;
pub const CALLDATASIZE: u64 = 2;
pub const CALLDATACOPY_STATIC: u64 = 3;
pub const CALLDATACOPY_DYNAMIC_BASE: u64 = 3;
pub const CODESIZE: u64 = 2;
pub const CODECOPY_STATIC: u64 = 3;
pub const CODECOPY_DYNAMIC_BASE: u64 = 3;
pub const GASPRICE: u64 = 2;
pub const EXTCODECOPY_DYNAMIC_BASE: u64 = 3;
pub const RETURNDATASIZE: u64 = 2;
pub const RETURNDATACOPY_STATIC: u64 = 3;
pub const RETURNDATACOPY_DYNAMIC_BASE: u64 = 3;
pub const ADDRESS: u64 = 2;
pub const ORIGIN: u64 = 2;
pub const CALLER: u64 = 2;
pub const CALLVALUE: u64 = 2;
pub const BLOCKHASH: u64 = 20;
pub const COINBASE: u64 = 2;
pub const TIMESTAMP: u64 = 2;
pub const NUMBER: u64 = 2;
pub const DIFFICULTY: u64 = 2;
pub const GASLIMIT: u64 = 2;
pub const POP: u64 = 2;
pub const MLOAD_STATIC: u64 = 3;
pub const MSTORE_STATIC: u64 = 3;
pub const MSTORE8_STATIC: u64 = 3;
pub const JUMP: u64 = 8;
pub const JUMPI: u64 = 10;
pub const JUMPDEST: u64 = 1;
pub const PC: u64 = 2;
pub const MSIZE: u64 = 2;
pub const GAS: u64 = 2;
pub const PUSHN: u64 = 3;
pub const DUPN: u64 = 3;
pub const SWAPN: u64 = 3;
pub const LOGN_STATIC: u64 = 375;
pub const LOGN_DYNAMIC_BASE: u64 = 375;
pub const LOGN_DYNAMIC_BYTE_BASE: u64 = 8;
pub const CREATE_BASE_COST: u64 = 32000;

// Storage
pub const SSTORE_SET: u64 = 20000;
pub const SSTORE_RESET: u64 = 5000;
pub const SSTORE_CLEARS_REFUND: u64 = 15000;

// Calls
pub const CALL_POSITIVE_VALUE: u64 = 9000;
pub const CALL_POSITIVE_VALUE_STIPEND: u64 = 2300;
pub const CALL_TO_EMPTY_ACCOUNT: u64 = 25000;

// Self destruct
pub const SELFDESTRUCT_NEW_ACCOUNT: u64 = 25000;
pub const SELFDESTRUCT_REFUND: u64 = 24000;

// Contract creation
pub const CODE_DEPOSIT_COST: u64 = 200;

// Transactions
pub const TX_DATA_ZERO_COST: u64 = 4;
pub const TX_DATA_NON_ZERO_COST: u64 = 68;
pub const TX_CREATE_COST: u64 = 32000;

// Precompiles
pub const ECRECOVER_COST: u64 = 3000;
pub const SHA2_256_STATIC_COST: u64 = 60;
pub const SHA2_256_DYNAMIC_BASE: u64 = 12;
pub const RIPEMD_160_STATIC_COST: u64 = 600;
pub const RIPEMD_160_DYNAMIC_BASE: u64 = 120;
pub const IDENTITY_STATIC_COST: u64 = 15;
pub const IDENTITY_DYNAMIC_BASE: u64 = 3;

/// EXP pays `exp_byte_cost` for every byte of the exponent.
pub fn exp(exponent: U256, exp_byte_cost: u64) -> Result<u64, VMError> {
    let exponent_byte_size = u64::try_from(exponent.bits().div_ceil(8))
        .map_err(|_| InternalError::TypeConversion)?;
    let exponent_byte_size_cost = exponent_byte_size
        .checked_mul(exp_byte_cost)
        .ok_or(OutOfGas)?;
    Ok(EXP_STATIC
        .checked_add(exponent_byte_size_cost)
        .ok_or(OutOfGas)?)
}

pub fn keccak256(memory_expansion_cost: u64, size: usize) -> Result<u64, VMError> {
    compute_gas_cost_for_dynamic_access(
        memory_expansion_cost,
        size,
        KECCAK25_DYNAMIC_BASE,
        KECCAK25_STATIC,
    )
}

pub fn calldatacopy(memory_expansion_cost: u64, size: usize) -> Result<u64, VMError> {
    compute_gas_cost_for_dynamic_access(
        memory_expansion_cost,
        size,
        CALLDATACOPY_DYNAMIC_BASE,
        CALLDATACOPY_STATIC,
    )
}

pub fn codecopy(memory_expansion_cost: u64, size: usize) -> Result<u64, VMError> {
    compute_gas_cost_for_dynamic_access(
        memory_expansion_cost,
        size,
        CODECOPY_DYNAMIC_BASE,
        CODECOPY_STATIC,
    )
}

pub fn returndatacopy(memory_expansion_cost: u64, size: usize) -> Result<u64, VMError> {
    compute_gas_cost_for_dynamic_access(
        memory_expansion_cost,
        size,
        RETURNDATACOPY_DYNAMIC_BASE,
        RETURNDATACOPY_STATIC,
    )
}

/// EXTCODECOPY: fork dependent base cost plus copy and expansion.
pub fn extcodecopy(
    memory_expansion_cost: u64,
    size: usize,
    static_cost: u64,
) -> Result<u64, VMError> {
    compute_gas_cost_for_dynamic_access(
        memory_expansion_cost,
        size,
        EXTCODECOPY_DYNAMIC_BASE,
        static_cost,
    )
}

fn compute_gas_cost_for_dynamic_access(
    memory_expansion_cost: u64,
    size: usize,
    dynamic_base: u64,
    static_cost: u64,
) -> Result<u64, VMError> {
    let dynamic_cost = words_for(size)?
        .checked_mul(dynamic_base)
        .ok_or(OutOfGas)?
        .checked_add(memory_expansion_cost)
        .ok_or(OutOfGas)?;
    Ok(static_cost.checked_add(dynamic_cost).ok_or(OutOfGas)?)
}

pub fn mload(memory_expansion_cost: u64) -> Result<u64, VMError> {
    mem_expansion_behavior(memory_expansion_cost, MLOAD_STATIC)
}

pub fn mstore(memory_expansion_cost: u64) -> Result<u64, VMError> {
    mem_expansion_behavior(memory_expansion_cost, MSTORE_STATIC)
}

pub fn mstore8(memory_expansion_cost: u64) -> Result<u64, VMError> {
    mem_expansion_behavior(memory_expansion_cost, MSTORE8_STATIC)
}

fn mem_expansion_behavior(memory_expansion_cost: u64, static_cost: u64) -> Result<u64, VMError> {
    Ok(static_cost
        .checked_add(memory_expansion_cost)
        .ok_or(OutOfGas)?)
}

pub fn log(
    memory_expansion_cost: u64,
    size: usize,
    number_of_topics: usize,
) -> Result<u64, VMError> {
    let topics = u64::try_from(number_of_topics).map_err(|_| InternalError::TypeConversion)?;
    let size = u64::try_from(size).map_err(|_| ExceptionalHalt::VeryLargeNumber)?;

    let topics_cost = LOGN_DYNAMIC_BASE.checked_mul(topics).ok_or(OutOfGas)?;
    let bytes_cost = LOGN_DYNAMIC_BYTE_BASE.checked_mul(size).ok_or(OutOfGas)?;
    Ok(topics_cost
        .checked_add(LOGN_STATIC)
        .and_then(|cost| cost.checked_add(bytes_cost))
        .and_then(|cost| cost.checked_add(memory_expansion_cost))
        .ok_or(OutOfGas)?)
}

pub fn create(memory_expansion_cost: u64) -> Result<u64, VMError> {
    Ok(CREATE_BASE_COST
        .checked_add(memory_expansion_cost)
        .ok_or(OutOfGas)?)
}

/// Cost a CALL-family opcode pays before any gas is forwarded: the fork's
/// base cost, memory expansion for both the argument and the return
/// regions, the value transfer surcharge and the new account surcharge.
pub fn call_base(
    memory_expansion_cost: u64,
    base_cost: u64,
    value: U256,
    new_account_cost: u64,
) -> Result<u64, VMError> {
    let positive_value_cost = if value.is_zero() {
        0
    } else {
        CALL_POSITIVE_VALUE
    };
    Ok(base_cost
        .checked_add(memory_expansion_cost)
        .and_then(|cost| cost.checked_add(positive_value_cost))
        .and_then(|cost| cost.checked_add(new_account_cost))
        .ok_or(OutOfGas)?)
}

/// Static plus per-word cost, as the hashing and identity precompiles charge.
pub fn precompile_linear(static_cost: u64, dynamic_base: u64, size: usize) -> Result<u64, VMError> {
    Ok(words_for(size)?
        .checked_mul(dynamic_base)
        .and_then(|cost| cost.checked_add(static_cost))
        .ok_or(OutOfGas)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exp_cost_per_byte() {
        assert_eq!(exp(U256::zero(), 10).expect("cost"), 10);
        assert_eq!(exp(U256::from(0xff), 10).expect("cost"), 20);
        assert_eq!(exp(U256::from(0x100), 50).expect("cost"), 110);
        assert_eq!(exp(U256::MAX, 50).expect("cost"), 10 + 32 * 50);
    }

    #[test]
    fn test_keccak_cost() {
        // 30 + 6 * 2 words + expansion of 2 words
        assert_eq!(keccak256(6, 64).expect("cost"), 30 + 12 + 6);
    }

    #[test]
    fn test_log_cost() {
        // LOG2 with 10 bytes, memory already expanded
        assert_eq!(log(0, 10, 2).expect("cost"), 375 + 750 + 80);
    }

    #[test]
    fn test_call_base_cost() {
        assert_eq!(call_base(0, 700, U256::zero(), 0).expect("cost"), 700);
        assert_eq!(
            call_base(0, 40, U256::one(), CALL_TO_EMPTY_ACCOUNT).expect("cost"),
            40 + 9000 + 25000
        );
    }

    #[test]
    fn test_precompile_linear() {
        assert_eq!(
            precompile_linear(SHA2_256_STATIC_COST, SHA2_256_DYNAMIC_BASE, 33).expect("cost"),
            60 + 24
        );
        assert_eq!(
            precompile_linear(IDENTITY_STATIC_COST, IDENTITY_DYNAMIC_BASE, 0).expect("cost"),
            15
        );
    }
}
