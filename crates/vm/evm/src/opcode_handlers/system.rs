use crate::{
    call_frame::CallFrame,
    constants::{CALL_DEPTH_LIMIT, FAIL, SUCCESS},
    errors::{ContextResult, ExceptionalHalt, InternalError, OpcodeResult, TxResult, VMError},
    gas_cost,
    memory::calculate_memory_size,
    utils::{address_to_word, size_offset_to_usize, word_to_address},
    vm::{ExecutionMode, VM},
};
use bytes::Bytes;
use ferrum_common::{
    Address, U256,
    evm::calculate_create_address,
    types::Code,
};
use tracing::trace;

// System Operations (9)
// Opcodes: CREATE, CALL, CALLCODE, RETURN, DELEGATECALL, STATICCALL, REVERT, INVALID, SELFDESTRUCT

/// Memory regions of a CALL-family opcode.
#[derive(Debug, Clone, Copy)]
struct CallRegions {
    args_offset: usize,
    args_size: usize,
    ret_offset: usize,
    ret_size: usize,
}

impl CallRegions {
    fn from_stack(
        args_offset: U256,
        args_size: U256,
        ret_offset: U256,
        ret_size: U256,
    ) -> Result<Self, VMError> {
        let (args_size, args_offset) = size_offset_to_usize(args_size, args_offset)?;
        let (ret_size, ret_offset) = size_offset_to_usize(ret_size, ret_offset)?;
        Ok(Self {
            args_offset,
            args_size,
            ret_offset,
            ret_size,
        })
    }

    /// Memory needed to hold both the arguments and the return data.
    fn new_memory_size(&self) -> Result<usize, VMError> {
        let for_args = calculate_memory_size(self.args_offset, self.args_size)?;
        let for_return = calculate_memory_size(self.ret_offset, self.ret_size)?;
        Ok(for_args.max(for_return))
    }
}

impl<'a> VM<'a> {
    // CALL operation
    pub fn op_call(&mut self) -> Result<OpcodeResult, VMError> {
        let [gas, callee, value, args_offset, args_size, ret_offset, ret_size] =
            *self.current_call_frame.stack.pop()?;
        let callee = word_to_address(callee);
        let regions = CallRegions::from_stack(args_offset, args_size, ret_offset, ret_size)?;

        if self.current_call_frame.is_static && !value.is_zero() {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let (exists, is_empty) = {
            let account = self.db.get_account(callee)?;
            (account.exists, account.is_empty())
        };
        let new_account_cost = self
            .schedule
            .call_new_account_cost(exists, is_empty, value);

        let gas_limit = self.charge_call(gas, value, new_account_cost, &regions)?;

        let from = self.current_call_frame.to; // The new sender will be the current contract.
        let is_static = self.current_call_frame.is_static;
        let data = self.get_calldata(&regions)?;
        let bytecode = self.db.get_account_code(callee)?;

        self.generic_call(
            gas_limit, value, from, callee, callee, true, is_static, data, &regions, bytecode,
        )
    }

    // CALLCODE operation
    pub fn op_callcode(&mut self) -> Result<OpcodeResult, VMError> {
        let [gas, code_address, value, args_offset, args_size, ret_offset, ret_size] =
            *self.current_call_frame.stack.pop()?;
        let code_address = word_to_address(code_address);
        let regions = CallRegions::from_stack(args_offset, args_size, ret_offset, ret_size)?;

        // The value stays in the current account, so no account is ever created.
        let gas_limit = self.charge_call(gas, value, 0, &regions)?;

        // Sender and recipient are the same in this case. But the code executed is from another account.
        let from = self.current_call_frame.to;
        let to = self.current_call_frame.to;
        let is_static = self.current_call_frame.is_static;
        let data = self.get_calldata(&regions)?;
        let bytecode = self.db.get_account_code(code_address)?;

        self.generic_call(
            gas_limit,
            value,
            from,
            to,
            code_address,
            true,
            is_static,
            data,
            &regions,
            bytecode,
        )
    }

    // RETURN operation
    #[inline]
    pub fn op_return(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [offset, size] = *current_call_frame.stack.pop()?;

        if size.is_zero() {
            return Ok(OpcodeResult::Halt);
        }

        let (size, offset) = size_offset_to_usize(size, offset)?;
        let new_memory_size = calculate_memory_size(offset, size)?;
        let memory_expansion_cost = self
            .schedule
            .memory_expansion_cost(new_memory_size, current_call_frame.memory.len())?;

        current_call_frame.increase_consumed_gas(memory_expansion_cost)?;

        current_call_frame.memory.resize(new_memory_size)?;
        current_call_frame.output = current_call_frame.memory.load_range(offset, size)?;

        Ok(OpcodeResult::Halt)
    }

    // DELEGATECALL operation
    pub fn op_delegatecall(&mut self) -> Result<OpcodeResult, VMError> {
        let [gas, code_address, args_offset, args_size, ret_offset, ret_size] =
            *self.current_call_frame.stack.pop()?;
        let code_address = word_to_address(code_address);
        let regions = CallRegions::from_stack(args_offset, args_size, ret_offset, ret_size)?;

        // Nothing is transferred, so neither the value surcharge nor the stipend apply.
        let gas_limit = self.charge_call(gas, U256::zero(), 0, &regions)?;

        // The child keeps the sender, value and storage of the current context.
        let from = self.current_call_frame.msg_sender;
        let value = self.current_call_frame.msg_value;
        let to = self.current_call_frame.to;
        let is_static = self.current_call_frame.is_static;
        let data = self.get_calldata(&regions)?;
        let bytecode = self.db.get_account_code(code_address)?;

        self.generic_call(
            gas_limit,
            value,
            from,
            to,
            code_address,
            false,
            is_static,
            data,
            &regions,
            bytecode,
        )
    }

    // STATICCALL operation
    pub fn op_staticcall(&mut self) -> Result<OpcodeResult, VMError> {
        let [gas, callee, args_offset, args_size, ret_offset, ret_size] =
            *self.current_call_frame.stack.pop()?;
        let callee = word_to_address(callee);
        let regions = CallRegions::from_stack(args_offset, args_size, ret_offset, ret_size)?;

        let value = U256::zero();
        let (exists, is_empty) = {
            let account = self.db.get_account(callee)?;
            (account.exists, account.is_empty())
        };
        let new_account_cost = self
            .schedule
            .call_new_account_cost(exists, is_empty, value);

        let gas_limit = self.charge_call(gas, value, new_account_cost, &regions)?;

        let from = self.current_call_frame.to;
        let data = self.get_calldata(&regions)?;
        let bytecode = self.db.get_account_code(callee)?;

        self.generic_call(
            gas_limit, value, from, callee, callee, true, true, data, &regions, bytecode,
        )
    }

    // CREATE operation
    pub fn op_create(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [
            value_in_wei_to_send,
            code_offset_in_memory,
            code_size_in_memory,
        ] = *current_call_frame.stack.pop()?;
        let (code_size_in_memory, code_offset_in_memory) =
            size_offset_to_usize(code_size_in_memory, code_offset_in_memory)?;

        let new_size = calculate_memory_size(code_offset_in_memory, code_size_in_memory)?;

        let memory_expansion_cost = self
            .schedule
            .memory_expansion_cost(new_size, current_call_frame.memory.len())?;
        current_call_frame.increase_consumed_gas(gas_cost::create(memory_expansion_cost)?)?;
        current_call_frame.memory.resize(new_size)?;

        self.generic_create(
            value_in_wei_to_send,
            code_offset_in_memory,
            code_size_in_memory,
        )
    }

    // REVERT operation
    pub fn op_revert(&mut self) -> Result<OpcodeResult, VMError> {
        // Sets the output and stops the frame; the state is rolled back by the caller
        // of the interpreter loop, which keeps the remaining gas.
        let current_call_frame = &mut self.current_call_frame;

        let [offset, size] = *current_call_frame.stack.pop()?;

        let (size, offset) = size_offset_to_usize(size, offset)?;

        let new_memory_size = calculate_memory_size(offset, size)?;
        let memory_expansion_cost = self
            .schedule
            .memory_expansion_cost(new_memory_size, current_call_frame.memory.len())?;

        current_call_frame.increase_consumed_gas(memory_expansion_cost)?;

        current_call_frame.memory.resize(new_memory_size)?;
        current_call_frame.output = current_call_frame.memory.load_range(offset, size)?;

        Err(VMError::RevertOpcode)
    }

    /// ### INVALID operation
    /// Halts exceptionally, no return data.
    pub fn op_invalid(&mut self) -> Result<OpcodeResult, VMError> {
        Err(ExceptionalHalt::InvalidOpcode.into())
    }

    // SELFDESTRUCT operation
    pub fn op_selfdestruct(&mut self) -> Result<OpcodeResult, VMError> {
        // Sends all ether in the account to the beneficiary and registers the
        // account for deletion at the end of the transaction.
        let (beneficiary, to) = {
            let current_call_frame = &mut self.current_call_frame;
            if current_call_frame.is_static {
                return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
            }
            let beneficiary = word_to_address(current_call_frame.stack.pop1()?);
            (beneficiary, current_call_frame.to)
        };

        let (beneficiary_exists, beneficiary_is_empty) = {
            let account = self.db.get_account(beneficiary)?;
            (account.exists, account.is_empty())
        };
        let balance = self.db.get_account(to)?.info.balance;

        self.current_call_frame
            .increase_consumed_gas(self.schedule.selfdestruct_cost(
                beneficiary_exists,
                beneficiary_is_empty,
                balance,
            ))?;

        // The refund is granted once per account and transaction.
        if !self.substate.add_selfdestruct(to) {
            self.substate.refunded_gas = self
                .substate
                .refunded_gas
                .checked_add(gas_cost::SELFDESTRUCT_REFUND)
                .ok_or(InternalError::Overflow)?;
        }

        self.db.increase_account_balance(beneficiary, balance)?;
        // A contract naming itself as beneficiary burns its balance.
        self.db.update_account_info(to, |info| {
            info.balance = U256::zero();
            Ok(())
        })?;
        self.substate.touch(beneficiary);

        trace!(?to, ?beneficiary, %balance, "Selfdestruct");

        Ok(OpcodeResult::Halt)
    }

    /// Behavior of CREATE once its cost is paid and the init code is in memory.
    pub fn generic_create(
        &mut self,
        value: U256,
        code_offset_in_memory: usize,
        code_size_in_memory: usize,
    ) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        // CREATE can't be called in a static context
        if current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        // Clear callframe subreturn data
        current_call_frame.sub_return_data = Bytes::new();

        // Reserve gas for the init code
        let gas_limit = self.schedule.create_gas(current_call_frame.gas_remaining);
        current_call_frame.increase_consumed_gas(gas_limit)?;

        // Load code from memory
        let code = current_call_frame
            .memory
            .load_range(code_offset_in_memory, code_size_in_memory)?;

        // Get account info of deployer
        let deployer = current_call_frame.to;
        let (deployer_balance, deployer_nonce) = {
            let deployer_account = self.db.get_account(deployer)?;
            (deployer_account.info.balance, deployer_account.info.nonce)
        };

        let new_depth = self
            .current_call_frame
            .depth
            .checked_add(1)
            .ok_or(InternalError::Overflow)?;

        // Validations that push 0 (FAIL) to the stack and return reserved gas to deployer
        // 1. Sender doesn't have enough balance to send value.
        // 2. Depth limit has been reached
        // 3. Sender nonce is max.
        let checks = [
            (deployer_balance < value, "OutOfFund"),
            (new_depth > CALL_DEPTH_LIMIT, "MaxDepth"),
            (deployer_nonce == u64::MAX, "MaxNonce"),
        ];
        for (condition, reason) in checks {
            if condition {
                trace!(reason, "Create failed before running");
                self.early_revert_message_call(gas_limit)?;
                return Ok(OpcodeResult::Continue);
            }
        }

        // Increment sender nonce (irreversible change)
        let nonce = self.db.increment_account_nonce(deployer)?;
        let new_address = calculate_create_address(deployer, nonce);

        // Deployment fails if the contract already exists.
        if self.db.get_account(new_address)?.create_would_collide() {
            trace!(?new_address, "Create collision");
            if self.mode == ExecutionMode::KeepGasOnException {
                self.return_gas(gas_limit)?;
            }
            self.current_call_frame.stack.push(FAIL)?;
            return Ok(OpcodeResult::Continue);
        }

        trace!(depth = new_depth, ?new_address, gas_limit, "Entering contract creation");

        let snapshot = self.db.snapshot();
        let stack = self.take_stack();
        let new_call_frame = CallFrame::new(
            deployer,
            new_address,
            new_address,
            Code::from_bytecode(code),
            value,
            Bytes::new(),
            false,
            gas_limit,
            new_depth,
            true,
            true,
            0,
            0,
            snapshot,
            stack,
        );
        self.add_callframe(new_call_frame);

        // Changes that revert in case the Create fails.
        self.substate.push_backup();
        self.begin_creation(deployer, new_address, value)?;

        Ok(OpcodeResult::Continue)
    }

    /// Runs a message call from the current frame, shared by the CALL family.
    ///
    /// Failures before the child starts (insufficient balance, depth) push 0
    /// and hand the child's gas straight back. Precompiles run inline; any other
    /// target becomes the new current frame.
    #[allow(clippy::too_many_arguments)]
    #[inline(always)]
    fn generic_call(
        &mut self,
        gas_limit: u64,
        value: U256,
        msg_sender: Address,
        to: Address,
        code_address: Address,
        should_transfer_value: bool,
        is_static: bool,
        calldata: Bytes,
        regions: &CallRegions,
        bytecode: Code,
    ) -> Result<OpcodeResult, VMError> {
        // Clear callframe subreturn data
        self.current_call_frame.sub_return_data = Bytes::new();

        // Validate sender has enough value
        if should_transfer_value && !value.is_zero() {
            let sender_balance = self.db.get_account(msg_sender)?.info.balance;
            if sender_balance < value {
                trace!(?msg_sender, %value, "Call failed: insufficient balance");
                self.early_revert_message_call(gas_limit)?;
                return Ok(OpcodeResult::Continue);
            }
        }

        // Validate max depth has not been reached yet.
        let new_depth = self
            .current_call_frame
            .depth
            .checked_add(1)
            .ok_or(InternalError::Overflow)?;
        if new_depth > CALL_DEPTH_LIMIT {
            trace!(depth = new_depth, "Call failed: depth limit");
            self.early_revert_message_call(gas_limit)?;
            return Ok(OpcodeResult::Continue);
        }

        trace!(depth = new_depth, ?to, ?code_address, gas_limit, "Entering message call");

        let snapshot = self.db.snapshot();
        self.substate.push_backup();
        self.substate.touch(to);
        // Transfer value from caller to callee.
        if should_transfer_value {
            self.db.transfer(msg_sender, to, value)?;
        }

        if let Some(precompile) = self.schedule.find_precompile(&code_address) {
            let ctx_result = self.run_precompile(precompile, &calldata, gas_limit)?;
            self.handle_state_backup(&ctx_result, snapshot)?;
            self.finish_call(gas_limit, regions.ret_offset, regions.ret_size, &ctx_result)?;
            return Ok(OpcodeResult::Continue);
        }

        let stack = self.take_stack();
        let new_call_frame = CallFrame::new(
            msg_sender,
            to,
            code_address,
            bytecode,
            value,
            calldata,
            is_static,
            gas_limit,
            new_depth,
            should_transfer_value,
            false,
            regions.ret_offset,
            regions.ret_size,
            snapshot,
            stack,
        );
        self.add_callframe(new_call_frame);

        Ok(OpcodeResult::Continue)
    }

    /// Handles case in which callframe was initiated by another callframe (with CALL or CREATE family opcodes)
    pub fn handle_return(&mut self, ctx_result: &ContextResult) -> Result<(), VMError> {
        let executed_call_frame = self.pop_call_frame()?;
        self.handle_state_backup(ctx_result, executed_call_frame.snapshot)?;

        // Here happens the interaction between child (executed) and parent (caller) callframe.
        if executed_call_frame.is_create {
            self.handle_return_create(executed_call_frame, ctx_result)?;
        } else {
            self.handle_return_call(executed_call_frame, ctx_result)?;
        }

        Ok(())
    }

    pub fn handle_return_call(
        &mut self,
        executed_call_frame: CallFrame,
        ctx_result: &ContextResult,
    ) -> Result<(), VMError> {
        let CallFrame {
            gas_limit,
            ret_offset,
            ret_size,
            mut stack,
            ..
        } = executed_call_frame;

        self.finish_call(gas_limit, ret_offset, ret_size, ctx_result)?;

        stack.clear();
        self.stack_pool.push(stack);

        Ok(())
    }

    pub fn handle_return_create(
        &mut self,
        executed_call_frame: CallFrame,
        ctx_result: &ContextResult,
    ) -> Result<(), VMError> {
        let CallFrame {
            gas_limit,
            to,
            mut stack,
            ..
        } = executed_call_frame;

        // Return unused gas
        let unused_gas = gas_limit
            .checked_sub(ctx_result.gas_used)
            .ok_or(InternalError::Underflow)?;
        self.return_gas(unused_gas)?;

        let parent_call_frame = &mut self.current_call_frame;
        // What to do, depending on TxResult
        match &ctx_result.result {
            TxResult::Success => {
                parent_call_frame.stack.push(address_to_word(to))?;
            }
            TxResult::Revert(err) => {
                // If revert we have to copy the return_data
                if err.is_revert_opcode() {
                    parent_call_frame.sub_return_data = ctx_result.output.clone();
                }
                parent_call_frame.stack.push(FAIL)?;
            }
        };

        stack.clear();
        self.stack_pool.push(stack);

        Ok(())
    }

    /// Hands a finished message call's unused gas, output and status to the
    /// current frame.
    fn finish_call(
        &mut self,
        gas_limit: u64,
        ret_offset: usize,
        ret_size: usize,
        ctx_result: &ContextResult,
    ) -> Result<(), VMError> {
        // Return gas left from subcontext
        let child_unused_gas = gas_limit
            .checked_sub(ctx_result.gas_used)
            .ok_or(InternalError::Underflow)?;
        self.return_gas(child_unused_gas)?;

        let parent_call_frame = &mut self.current_call_frame;
        // Store return data of sub-context, never more than the caller asked for
        let copied = ctx_result
            .output
            .get(..ret_size.min(ctx_result.output.len()))
            .ok_or(InternalError::Slicing)?;
        parent_call_frame.memory.store_data(ret_offset, copied)?;
        parent_call_frame.sub_return_data = ctx_result.output.clone();

        // What to do, depending on TxResult
        parent_call_frame.stack.push(match &ctx_result.result {
            TxResult::Success => SUCCESS,
            TxResult::Revert(_) => FAIL,
        })?;

        Ok(())
    }

    /// Charges a CALL-family opcode, grows memory for its regions and returns
    /// the gas limit of the child.
    fn charge_call(
        &mut self,
        requested_gas: U256,
        value: U256,
        new_account_cost: u64,
        regions: &CallRegions,
    ) -> Result<u64, VMError> {
        let new_memory_size = regions.new_memory_size()?;
        let call_frame = &mut self.current_call_frame;

        let memory_expansion_cost = self
            .schedule
            .memory_expansion_cost(new_memory_size, call_frame.memory.len())?;
        let base_cost = gas_cost::call_base(
            memory_expansion_cost,
            self.schedule.gas_table().call,
            value,
            new_account_cost,
        )?;
        let (gas_limit, total_charge) = self.schedule.call_gas(
            requested_gas,
            call_frame.gas_remaining,
            base_cost,
            value,
        )?;

        call_frame.increase_consumed_gas(total_charge)?;
        call_frame.memory.resize(new_memory_size)?;

        Ok(gas_limit)
    }

    fn get_calldata(&mut self, regions: &CallRegions) -> Result<Bytes, VMError> {
        self.current_call_frame
            .memory
            .load_range(regions.args_offset, regions.args_size)
    }

    fn return_gas(&mut self, gas: u64) -> Result<(), VMError> {
        let callframe = &mut self.current_call_frame;
        callframe.gas_remaining = callframe
            .gas_remaining
            .checked_add(gas)
            .ok_or(InternalError::Overflow)?;
        Ok(())
    }

    fn early_revert_message_call(&mut self, gas_limit: u64) -> Result<(), VMError> {
        // Return gas_limit to callframe.
        self.return_gas(gas_limit)?;
        self.current_call_frame.stack.push(FAIL)?; // It's the same as revert for CREATE
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_regions_memory_is_larger_region() {
        let regions = CallRegions::from_stack(
            U256::from(0),
            U256::from(10),
            U256::from(64),
            U256::from(1),
        )
        .expect("regions");
        assert_eq!(regions.new_memory_size().expect("size"), 96);
    }

    #[test]
    fn test_call_regions_zero_size_ignores_offset() {
        let regions = CallRegions::from_stack(U256::MAX, U256::zero(), U256::MAX, U256::zero())
            .expect("regions");
        assert_eq!(regions.new_memory_size().expect("size"), 0);
    }
}
