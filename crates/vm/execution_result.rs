use ferrum_common::{H256, U256, types::Log};
use ferrum_evm::errors::{ExecutionReport, TxResult};
use serde::{Deserialize, Serialize};

/// Outcome of one transaction inside a block, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// 1 on success, 0 when the top-level frame reverted or halted.
    pub status: u8,
    /// State commitment right after the transaction.
    pub state_root: H256,
    pub logs: Vec<Log>,
    /// Gas charged to the sender, after the refund.
    pub gas_used: u64,
    pub gas_price: U256,
    /// Why the top-level frame failed, if it did.
    pub exception: Option<String>,
}

impl ExecutionResult {
    pub fn from_report(report: ExecutionReport, state_root: H256, gas_price: U256) -> Self {
        let (status, exception) = match report.result {
            TxResult::Success => (1, None),
            TxResult::Revert(error) => (0, Some(error.to_string())),
        };
        Self {
            status,
            state_root,
            logs: report.logs,
            gas_used: report.gas_used,
            gas_price,
            exception,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use ferrum_evm::errors::{ExceptionalHalt, VMError};

    fn report(result: TxResult) -> ExecutionReport {
        ExecutionReport {
            result,
            gas_used: 21_000,
            gas_refunded: 0,
            output: Bytes::new(),
            logs: Vec::new(),
            created_address: None,
        }
    }

    #[test]
    fn test_status_and_exception() {
        let ok = ExecutionResult::from_report(report(TxResult::Success), H256::zero(), U256::one());
        assert!(ok.is_success());
        assert_eq!(ok.exception, None);

        let failed = ExecutionResult::from_report(
            report(TxResult::Revert(VMError::ExceptionalHalt(ExceptionalHalt::OutOfGas))),
            H256::zero(),
            U256::one(),
        );
        assert_eq!(failed.status, 0);
        assert_eq!(failed.exception.as_deref(), Some("Exceptional Halt: Out Of Gas"));
        assert_eq!(failed.gas_used, 21_000);
    }
}
