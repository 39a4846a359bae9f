use crate::{
    errors::{ContextResult, ExceptionalHalt, TxResult, VMError},
    vm::{ExecutionMode, VM},
};
use bytes::Bytes;
use ferrum_common::types::Code;
use std::mem;

impl<'a> VM<'a> {
    /// Result of the current frame after it halted normally (STOP, RETURN,
    /// SELFDESTRUCT or running off the end of its code).
    ///
    /// Creation frames still have to pay for their code here and may fail doing so.
    pub fn handle_opcode_result(&mut self) -> Result<ContextResult, VMError> {
        if self.current_call_frame.is_create {
            if let Err(error) = self.validate_contract_creation() {
                return self.handle_opcode_error(error);
            }
            let call_frame = &self.current_call_frame;
            return Ok(ContextResult {
                result: TxResult::Success,
                gas_used: call_frame.gas_used(),
                output: Bytes::new(),
                created_address: Some(call_frame.to),
            });
        }

        let call_frame = &mut self.current_call_frame;
        Ok(ContextResult {
            result: TxResult::Success,
            gas_used: call_frame.gas_used(),
            output: mem::take(&mut call_frame.output),
            created_address: None,
        })
    }

    /// Result of the current frame after `error` stopped it.
    ///
    /// REVERT keeps the remaining gas and the output. An exceptional halt
    /// drops the output and, unless the VM keeps gas on exceptions, all of
    /// the frame's remaining gas. Internal and database errors are returned.
    pub fn handle_opcode_error(&mut self, error: VMError) -> Result<ContextResult, VMError> {
        if error.should_propagate() {
            return Err(error);
        }

        let burn = self.mode == ExecutionMode::BurnGasOnException;
        let call_frame = &mut self.current_call_frame;
        match error {
            VMError::RevertOpcode => Ok(ContextResult {
                result: TxResult::Revert(error),
                gas_used: call_frame.gas_used(),
                output: mem::take(&mut call_frame.output),
                created_address: None,
            }),
            VMError::ExceptionalHalt(halt) => {
                if burn {
                    call_frame.gas_remaining = 0;
                }
                Ok(ContextResult {
                    result: TxResult::Revert(halt.into()),
                    gas_used: call_frame.gas_used(),
                    output: Bytes::new(),
                    created_address: None,
                })
            }
            other => Err(other),
        }
    }

    /// Stores the output of a finished creation frame as the new contract's
    /// code, charging the deposit cost.
    ///
    /// Code over the EIP-170 limit fails the creation. When the deposit cannot
    /// be paid, Homestead and later fail as out of gas, while Frontier leaves
    /// the account in place without code.
    pub fn validate_contract_creation(&mut self) -> Result<(), VMError> {
        let code = self.current_call_frame.output.clone();

        if let Some(max_code_size) = self.schedule.max_code_size()
            && code.len() > max_code_size
        {
            return Err(ExceptionalHalt::ContractSizeLimit.into());
        }

        let deposit_cost = self.schedule.deposit_code_gas(&code)?;
        if self
            .current_call_frame
            .increase_consumed_gas(deposit_cost)
            .is_err()
        {
            if self.schedule.code_deposit_oog_fails() {
                return Err(ExceptionalHalt::OutOfGas.into());
            }
            return Ok(());
        }

        let address = self.current_call_frame.to;
        self.db.set_account_code(address, Code::from_bytecode(code))?;
        Ok(())
    }
}
