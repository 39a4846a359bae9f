use super::BlockExecutionResult;
use crate::{EvmError, ExecutionResult};
use ferrum_common::{
    Address,
    types::{Block, BlockHeader, Fork, Receipt, ReceiptOutcome, Transaction},
};
use ferrum_evm::{
    EVMConfig, Environment,
    db::gen_db::GeneralizedDatabase,
    errors::{ContextResult, ExecutionReport},
    schedule::{CostSchedule, schedule_for},
    vm::{ExecutionMode, Message, VM},
};
use tracing::{debug, info, instrument, warn};

/// Block and transaction driver over a [`GeneralizedDatabase`].
///
/// [Ferrum::execute_block]
/// [Ferrum::execute_tx]
/// [Ferrum::apply_mining_reward]
#[derive(Debug)]
pub struct Ferrum;

/// Checks that adding `tx_gas_limit` to `block_gas_used` doesn't exceed `block_gas_limit`.
fn check_gas_limit(
    block_gas_used: u64,
    tx_gas_limit: u64,
    block_gas_limit: u64,
) -> Result<(), EvmError> {
    let exceeded = block_gas_used
        .checked_add(tx_gas_limit)
        .is_none_or(|total| total > block_gas_limit);
    if exceeded {
        return Err(EvmError::InvalidTransition(format!(
            "Gas allowance exceeded: used {block_gas_used} + tx limit {tx_gas_limit} > block limit {block_gas_limit}"
        )));
    }
    Ok(())
}

impl Ferrum {
    /// Executes every transaction of `block` in order, then pays the mining rewards.
    ///
    /// The block is rejected when a transaction is invalid, when a
    /// transaction does not fit in the remaining block gas, or when the gas
    /// used does not match the header.
    #[instrument(
        level = "trace",
        name = "Block execution",
        skip_all,
        fields(number = block.header.number)
    )]
    pub fn execute_block(
        block: &Block,
        db: &mut GeneralizedDatabase,
        mode: ExecutionMode,
    ) -> Result<BlockExecutionResult, EvmError> {
        let chain_config = db.get_chain_config()?;
        let fork = chain_config.fork(block.header.number);
        let schedule = schedule_for(fork);

        let mut receipts = Vec::with_capacity(block.body.transactions.len());
        let mut results = Vec::with_capacity(block.body.transactions.len());
        let mut block_gas_used = 0_u64;

        for (tx_idx, tx) in block.body.transactions.iter().enumerate() {
            let tx_sender = tx
                .sender_checked(schedule.rejects_high_s())
                .map_err(|error| {
                    EvmError::Transaction(format!(
                        "Couldn't recover sender of transaction {tx_idx}: {error}"
                    ))
                })?;
            check_gas_limit(block_gas_used, tx.gas_limit(), block.header.gas_limit)?;

            let report = Self::execute_tx(
                tx,
                tx_sender,
                &block.header,
                db,
                mode,
                fork,
                chain_config.chain_id,
            )
            .inspect_err(|error| warn!(tx_idx, %error, "Rejected transaction"))?;

            block_gas_used = block_gas_used
                .checked_add(report.gas_used)
                .ok_or_else(|| EvmError::Custom("Block gas used overflow".to_string()))?;

            let state_root = db.state_root()?;
            let outcome = if schedule.receipt_uses_status() {
                ReceiptOutcome::Status(report.is_success())
            } else {
                ReceiptOutcome::PostState(state_root)
            };
            receipts.push(Receipt::new(outcome, block_gas_used, report.logs.clone()));
            results.push(ExecutionResult::from_report(
                report,
                state_root,
                tx.gas_price(),
            ));
        }

        Self::apply_mining_reward(&block.header, &block.body.ommers, db, schedule)?;

        if block_gas_used != block.header.gas_used {
            warn!(
                number = block.header.number,
                expected = block.header.gas_used,
                actual = block_gas_used,
                "Block gas used mismatch"
            );
            return Err(EvmError::InvalidTransition(format!(
                "Block gas used mismatch: header {} != executed {block_gas_used}",
                block.header.gas_used
            )));
        }

        info!(
            number = block.header.number,
            ?fork,
            transactions = block.body.transactions.len(),
            gas_used = block_gas_used,
            "Executed block"
        );

        Ok(BlockExecutionResult {
            receipts,
            results,
            block_gas_used,
        })
    }

    /// Runs one transaction from an already recovered `tx_sender` and makes
    /// its changes final.
    pub fn execute_tx(
        tx: &Transaction,
        tx_sender: Address,
        block_header: &BlockHeader,
        db: &mut GeneralizedDatabase,
        mode: ExecutionMode,
        fork: Fork,
        chain_id: u64,
    ) -> Result<ExecutionReport, EvmError> {
        let env = Environment::from_transaction(
            block_header,
            tx,
            tx_sender,
            EVMConfig::new(fork),
            chain_id,
        );
        let report = VM::new(env, db, tx, mode).execute()?;
        db.clear_journal();
        Ok(report)
    }

    /// Runs `message` as a bare message call in the context of `block_header`,
    /// without any of the transaction-level charges.
    pub fn execute_message(
        message: Message,
        block_header: &BlockHeader,
        db: &mut GeneralizedDatabase,
        mode: ExecutionMode,
    ) -> Result<ContextResult, EvmError> {
        let chain_config = db.get_chain_config()?;
        let fork = chain_config.fork(block_header.number);
        let tx = Transaction::default();
        let env = Environment {
            origin: message.sender,
            gas_limit: message.gas_limit,
            config: EVMConfig::new(fork),
            block_number: block_header.number,
            coinbase: block_header.coinbase,
            timestamp: block_header.timestamp,
            difficulty: block_header.difficulty,
            chain_id: chain_config.chain_id,
            block_gas_limit: block_header.gas_limit,
            ..Default::default()
        };
        debug!(?fork, to = ?message.to, gas_limit = message.gas_limit, "Executing message");
        let result = VM::new(env, db, &tx, mode).call_message(message)?;
        db.clear_journal();
        Ok(result)
    }

    /// Credits the block and ommer rewards of the fork to their beneficiaries.
    pub fn apply_mining_reward(
        header: &BlockHeader,
        ommers: &[BlockHeader],
        db: &mut GeneralizedDatabase,
        schedule: &dyn CostSchedule,
    ) -> Result<(), EvmError> {
        for (address, reward) in schedule.mining_reward(header, ommers) {
            db.increase_account_balance(address, reward)?;
        }
        db.clear_journal();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_gas_limit() {
        assert!(check_gas_limit(0, 21_000, 21_000).is_ok());
        assert!(matches!(
            check_gas_limit(1, 21_000, 21_000),
            Err(EvmError::InvalidTransition(_))
        ));
        assert!(check_gas_limit(u64::MAX, 1, u64::MAX).is_err());
    }
}
