pub mod ferrum;
use ferrum::Ferrum;

use crate::errors::EvmError;
use crate::execution_result::ExecutionResult;
use ferrum_common::types::{
    AccountUpdate, Block, BlockHeader, Receipt, ReceiptOutcome, Transaction,
};
use ferrum_common::{Address, H256};
use ferrum_evm::db::{Database, gen_db::GeneralizedDatabase};
use ferrum_evm::errors::ContextResult;
use ferrum_evm::schedule::{CostSchedule, schedule_for};
use ferrum_evm::vm::{ExecutionMode, Message};
use std::sync::Arc;

pub struct Evm {
    pub db: GeneralizedDatabase,
    pub mode: ExecutionMode,
}

impl core::fmt::Debug for Evm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Ferrum")
    }
}

impl Evm {
    pub fn new(store: Arc<dyn Database>) -> Self {
        Evm {
            db: GeneralizedDatabase::new(store),
            mode: ExecutionMode::default(),
        }
    }

    /// Same as [`Evm::new`], returning failing frames' unused gas to their callers.
    pub fn new_keeping_gas(store: Arc<dyn Database>) -> Self {
        Evm {
            db: GeneralizedDatabase::new(store),
            mode: ExecutionMode::KeepGasOnException,
        }
    }

    /// Execute a block and return the execution result.
    pub fn execute_block(&mut self, block: &Block) -> Result<BlockExecutionResult, EvmError> {
        Ferrum::execute_block(block, &mut self.db, self.mode)
    }

    /// Wraps [Ferrum::execute_tx], for a transaction outside of a block body.
    ///
    /// Updates `cumulative_gas_used` and returns the receipt along with the result.
    pub fn execute_tx(
        &mut self,
        tx: &Transaction,
        block_header: &BlockHeader,
        cumulative_gas_used: &mut u64,
        sender: Address,
    ) -> Result<(Receipt, ExecutionResult), EvmError> {
        let chain_config = self.db.get_chain_config()?;
        let fork = chain_config.fork(block_header.number);
        let report = Ferrum::execute_tx(
            tx,
            sender,
            block_header,
            &mut self.db,
            self.mode,
            fork,
            chain_config.chain_id,
        )?;

        *cumulative_gas_used = cumulative_gas_used.saturating_add(report.gas_used);

        let state_root = self.db.state_root()?;
        let outcome = if schedule_for(fork).receipt_uses_status() {
            ReceiptOutcome::Status(report.is_success())
        } else {
            ReceiptOutcome::PostState(state_root)
        };
        let receipt = Receipt::new(outcome, *cumulative_gas_used, report.logs.clone());
        let result = ExecutionResult::from_report(report, state_root, tx.gas_price());
        Ok((receipt, result))
    }

    /// Wraps [Ferrum::execute_message].
    pub fn call(
        &mut self,
        message: Message,
        block_header: &BlockHeader,
    ) -> Result<ContextResult, EvmError> {
        Ferrum::execute_message(message, block_header, &mut self.db, self.mode)
    }

    /// Net account changes since this instance was created, ready to be
    /// persisted by the store.
    pub fn get_state_transitions(&self) -> Result<Vec<AccountUpdate>, EvmError> {
        Ok(self.db.get_state_transitions()?)
    }

    pub fn state_root(&self) -> Result<H256, EvmError> {
        Ok(self.db.state_root()?)
    }
}

#[derive(Clone, Debug)]
pub struct BlockExecutionResult {
    pub receipts: Vec<Receipt>,
    pub results: Vec<ExecutionResult>,
    pub block_gas_used: u64,
}
