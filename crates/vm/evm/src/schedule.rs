//! Per-fork gas costs and protocol rules.
//!
//! Every supported fork is a unit struct implementing [`CostSchedule`]. The
//! trait's provided methods hold the rules, switching on [`CostSchedule::fork`]
//! where a later fork changed them, and each fork's [`GasTable`] is its
//! predecessor's table with the repriced entries overridden.

use crate::{
    constants::{MAX_CODE_SIZE, TX_BASE_COST},
    errors::{ExceptionalHalt, InternalError, VMError},
    gas_cost::{
        CALL_POSITIVE_VALUE_STIPEND, CALL_TO_EMPTY_ACCOUNT, CODE_DEPOSIT_COST,
        SELFDESTRUCT_NEW_ACCOUNT, SSTORE_CLEARS_REFUND, SSTORE_RESET, SSTORE_SET,
        TX_CREATE_COST, TX_DATA_NON_ZERO_COST, TX_DATA_ZERO_COST,
    },
    memory,
    precompiles::{self, Precompile},
    utils::words_for,
};
use ferrum_common::{
    Address, U256,
    constants::WEI_PER_ETHER,
    types::{BlockHeader, Fork, Transaction},
};
use std::collections::BTreeMap;

/// Costs that were repriced between forks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasTable {
    pub balance: u64,
    pub extcodesize: u64,
    pub extcodecopy: u64,
    pub sload: u64,
    pub call: u64,
    pub selfdestruct: u64,
    pub exp_byte: u64,
}

pub const FRONTIER_GAS_TABLE: GasTable = GasTable {
    balance: 20,
    extcodesize: 20,
    extcodecopy: 20,
    sload: 50,
    call: 40,
    selfdestruct: 0,
    exp_byte: 10,
};

pub const HOMESTEAD_GAS_TABLE: GasTable = FRONTIER_GAS_TABLE;

/// EIP-150 IO-heavy operation repricing.
pub const TANGERINE_WHISTLE_GAS_TABLE: GasTable = GasTable {
    balance: 400,
    extcodesize: 700,
    extcodecopy: 700,
    sload: 200,
    call: 700,
    selfdestruct: 5000,
    ..HOMESTEAD_GAS_TABLE
};

/// EIP-160 EXP repricing.
pub const SPURIOUS_DRAGON_GAS_TABLE: GasTable = GasTable {
    exp_byte: 50,
    ..TANGERINE_WHISTLE_GAS_TABLE
};

pub const BYZANTIUM_GAS_TABLE: GasTable = SPURIOUS_DRAGON_GAS_TABLE;

/// Cost and feature schedule of a fork.
pub trait CostSchedule: Send + Sync + std::fmt::Debug {
    fn fork(&self) -> Fork;

    fn gas_table(&self) -> &'static GasTable;

    /// Total cost of `words` words of memory.
    fn memory_cost(&self, words: u64) -> Result<u64, VMError> {
        memory::words_cost(words)
    }

    /// What growing memory from `current_memory_size` to `new_memory_size`
    /// bytes costs. Only the added words are paid for.
    fn memory_expansion_cost(
        &self,
        new_memory_size: usize,
        current_memory_size: usize,
    ) -> Result<u64, VMError> {
        if new_memory_size <= current_memory_size {
            return Ok(0);
        }
        let new_cost = self.memory_cost(words_for(new_memory_size)?)?;
        let current_cost = self.memory_cost(words_for(current_memory_size)?)?;
        Ok(new_cost.saturating_sub(current_cost))
    }

    /// `(cost, refund)` of an SSTORE writing `new` over `current`.
    fn sstore_cost(&self, current: U256, new: U256) -> (u64, u64) {
        let cost = if current.is_zero() && !new.is_zero() {
            SSTORE_SET
        } else {
            SSTORE_RESET
        };
        let refund = if !current.is_zero() && new.is_zero() {
            SSTORE_CLEARS_REFUND
        } else {
            0
        };
        (cost, refund)
    }

    /// `(child_gas_limit, total_charge)` of a CALL-family opcode.
    ///
    /// `base_cost` is what the caller pays regardless of the gas it forwards.
    /// The stipend given along with a value transfer is part of the child's
    /// limit but not of the caller's charge.
    fn call_gas(
        &self,
        requested: U256,
        gas_left: u64,
        base_cost: u64,
        value: U256,
    ) -> Result<(u64, u64), VMError> {
        let forwarded = if self.fork() >= Fork::TangerineWhistle {
            let available = gas_left
                .checked_sub(base_cost)
                .ok_or(ExceptionalHalt::OutOfGas)?;
            let max_forwardable = available.saturating_sub(available / 64);
            u64::try_from(requested)
                .unwrap_or(u64::MAX)
                .min(max_forwardable)
        } else {
            u64::try_from(requested).map_err(|_| ExceptionalHalt::OutOfGas)?
        };

        let total_charge = base_cost
            .checked_add(forwarded)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        let stipend = if value.is_zero() {
            0
        } else {
            CALL_POSITIVE_VALUE_STIPEND
        };
        let child_gas_limit = forwarded
            .checked_add(stipend)
            .ok_or(InternalError::Overflow)?;
        Ok((child_gas_limit, total_charge))
    }

    /// Surcharge for a CALL that brings a new account into the state.
    fn call_new_account_cost(&self, exists: bool, is_empty: bool, value: U256) -> u64 {
        let charged = if self.fork() >= Fork::SpuriousDragon {
            !value.is_zero() && is_empty
        } else {
            !exists
        };
        if charged { CALL_TO_EMPTY_ACCOUNT } else { 0 }
    }

    fn selfdestruct_cost(&self, beneficiary_exists: bool, beneficiary_empty: bool, balance: U256) -> u64 {
        let base = self.gas_table().selfdestruct;
        let new_account = match self.fork() {
            Fork::Frontier | Fork::Homestead => false,
            Fork::TangerineWhistle => !beneficiary_exists,
            Fork::SpuriousDragon | Fork::Byzantium => beneficiary_empty && !balance.is_zero(),
        };
        if new_account {
            base.saturating_add(SELFDESTRUCT_NEW_ACCOUNT)
        } else {
            base
        }
    }

    /// Gas handed to the init code of a CREATE out of `gas_left`.
    fn create_gas(&self, gas_left: u64) -> u64 {
        if self.fork() >= Fork::TangerineWhistle {
            gas_left.saturating_sub(gas_left / 64)
        } else {
            gas_left
        }
    }

    fn intrinsic_gas(&self, tx: &Transaction) -> Result<u64, VMError> {
        let mut gas = TX_BASE_COST;
        for byte in tx.data().iter() {
            let byte_cost = if *byte == 0 {
                TX_DATA_ZERO_COST
            } else {
                TX_DATA_NON_ZERO_COST
            };
            gas = gas.checked_add(byte_cost).ok_or(InternalError::Overflow)?;
        }
        if tx.is_contract_creation() && self.fork() >= Fork::Homestead {
            gas = gas.checked_add(TX_CREATE_COST).ok_or(InternalError::Overflow)?;
        }
        Ok(gas)
    }

    /// Gas to store `code` as a contract's code.
    fn deposit_code_gas(&self, code: &[u8]) -> Result<u64, VMError> {
        let len = u64::try_from(code.len()).map_err(|_| InternalError::TypeConversion)?;
        Ok(len
            .checked_mul(CODE_DEPOSIT_COST)
            .ok_or(ExceptionalHalt::OutOfGas)?)
    }

    /// EIP-170 limit on deployed code.
    fn max_code_size(&self) -> Option<usize> {
        (self.fork() >= Fork::SpuriousDragon).then_some(MAX_CODE_SIZE)
    }

    /// Whether running out of gas for the code deposit fails the creation.
    /// Frontier instead deploys an empty contract.
    fn code_deposit_oog_fails(&self) -> bool {
        self.fork() >= Fork::Homestead
    }

    /// EIP-161 starts contract nonces at 1.
    fn contract_initial_nonce(&self) -> u64 {
        if self.fork() >= Fork::SpuriousDragon { 1 } else { 0 }
    }

    /// EIP-161 deletion of touched empty accounts.
    fn clears_empty_accounts(&self) -> bool {
        self.fork() >= Fork::SpuriousDragon
    }

    /// EIP-155 chain id in signatures.
    fn replay_protection(&self) -> bool {
        self.fork() >= Fork::SpuriousDragon
    }

    /// EIP-658 status code instead of the intermediate state root.
    fn receipt_uses_status(&self) -> bool {
        self.fork() >= Fork::Byzantium
    }

    /// EIP-2 rejects transaction signatures with `s > n/2`.
    fn rejects_high_s(&self) -> bool {
        self.fork() >= Fork::Homestead
    }

    fn find_precompile(&self, address: &Address) -> Option<&'static Precompile> {
        precompiles::find_precompile(address, self.fork())
    }

    fn block_reward(&self) -> U256 {
        let ether = if self.fork() >= Fork::Byzantium { 3 } else { 5 };
        U256::from(WEI_PER_ETHER).saturating_mul(U256::from(ether))
    }

    /// Mining rewards of a block: the block reward plus 1/32 of it per
    /// included ommer to the coinbase, and `(8 + ommer.number - number) / 8`
    /// of it to each ommer's miner.
    #[allow(clippy::arithmetic_side_effects, reason = "divisions by non-zero constants")]
    fn mining_reward(&self, header: &BlockHeader, ommers: &[BlockHeader]) -> BTreeMap<Address, U256> {
        let block_reward = self.block_reward();
        let mut rewards = BTreeMap::new();

        let inclusion_reward = (block_reward / 32).saturating_mul(U256::from(ommers.len()));
        let coinbase = rewards.entry(header.coinbase).or_insert_with(U256::zero);
        *coinbase = coinbase.saturating_add(block_reward.saturating_add(inclusion_reward));

        for ommer in ommers {
            let numerator = 8u64
                .saturating_add(ommer.number)
                .saturating_sub(header.number);
            let reward = block_reward.saturating_mul(U256::from(numerator)) / 8;
            let miner = rewards.entry(ommer.coinbase).or_insert_with(U256::zero);
            *miner = miner.saturating_add(reward);
        }
        rewards
    }
}

macro_rules! fork_schedule {
    ($name:ident, $fork:expr, $table:ident) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl CostSchedule for $name {
            fn fork(&self) -> Fork {
                $fork
            }

            fn gas_table(&self) -> &'static GasTable {
                &$table
            }
        }
    };
}

fork_schedule!(Frontier, Fork::Frontier, FRONTIER_GAS_TABLE);
fork_schedule!(Homestead, Fork::Homestead, HOMESTEAD_GAS_TABLE);
fork_schedule!(TangerineWhistle, Fork::TangerineWhistle, TANGERINE_WHISTLE_GAS_TABLE);
fork_schedule!(SpuriousDragon, Fork::SpuriousDragon, SPURIOUS_DRAGON_GAS_TABLE);
fork_schedule!(Byzantium, Fork::Byzantium, BYZANTIUM_GAS_TABLE);

/// The schedule governing `fork`.
pub fn schedule_for(fork: Fork) -> &'static dyn CostSchedule {
    match fork {
        Fork::Frontier => &Frontier,
        Fork::Homestead => &Homestead,
        Fork::TangerineWhistle => &TangerineWhistle,
        Fork::SpuriousDragon => &SpuriousDragon,
        Fork::Byzantium => &Byzantium,
    }
}
