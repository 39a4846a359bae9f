use crate::{
    constants::WORD_SIZE_IN_BYTES_USIZE,
    errors::{ExceptionalHalt, InternalError, OpcodeResult, VMError},
    gas_cost,
    memory::calculate_memory_size,
    utils::{u256_to_h256, u256_to_usize},
    vm::VM,
};
use ferrum_common::U256;

// Stack, Memory, Storage and Flow Operations (12)
// Opcodes: POP, MLOAD, MSTORE, MSTORE8, SLOAD, SSTORE, JUMP, JUMPI, PC, MSIZE, GAS, JUMPDEST

impl<'a> VM<'a> {
    // POP operation
    #[inline]
    pub fn op_pop(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.stack.pop1()?;
        current_call_frame.increase_consumed_gas(gas_cost::POP)?;

        Ok(OpcodeResult::Continue)
    }

    // MLOAD operation
    pub fn op_mload(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let offset = u256_to_usize(current_call_frame.stack.pop1()?)?;

        let new_memory_size = calculate_memory_size(offset, WORD_SIZE_IN_BYTES_USIZE)?;

        let memory_expansion_cost = self
            .schedule
            .memory_expansion_cost(new_memory_size, current_call_frame.memory.len())?;
        current_call_frame.increase_consumed_gas(gas_cost::mload(memory_expansion_cost)?)?;

        current_call_frame.memory.resize(new_memory_size)?;
        let word = current_call_frame.memory.load_word(offset)?;
        current_call_frame.stack.push(word)?;

        Ok(OpcodeResult::Continue)
    }

    // MSTORE operation
    pub fn op_mstore(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [offset, value] = *current_call_frame.stack.pop()?;
        let offset = u256_to_usize(offset)?;

        let new_memory_size = calculate_memory_size(offset, WORD_SIZE_IN_BYTES_USIZE)?;

        let memory_expansion_cost = self
            .schedule
            .memory_expansion_cost(new_memory_size, current_call_frame.memory.len())?;
        current_call_frame.increase_consumed_gas(gas_cost::mstore(memory_expansion_cost)?)?;

        current_call_frame.memory.store_word(offset, value)?;

        Ok(OpcodeResult::Continue)
    }

    // MSTORE8 operation
    pub fn op_mstore8(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [offset, value] = *current_call_frame.stack.pop()?;
        let offset = u256_to_usize(offset)?;

        let new_memory_size = calculate_memory_size(offset, 1)?;

        let memory_expansion_cost = self
            .schedule
            .memory_expansion_cost(new_memory_size, current_call_frame.memory.len())?;
        current_call_frame.increase_consumed_gas(gas_cost::mstore8(memory_expansion_cost)?)?;

        // Only the least significant byte is stored.
        current_call_frame
            .memory
            .store_data(offset, &[value.byte(0)])?;

        Ok(OpcodeResult::Continue)
    }

    // SLOAD operation
    pub fn op_sload(&mut self) -> Result<OpcodeResult, VMError> {
        let storage_slot_key = self.current_call_frame.stack.pop1()?;
        self.current_call_frame
            .increase_consumed_gas(self.schedule.gas_table().sload)?;

        let address = self.current_call_frame.to;
        let value = self
            .db
            .get_storage_value(address, u256_to_h256(storage_slot_key))?;

        self.current_call_frame.stack.push(value)?;

        Ok(OpcodeResult::Continue)
    }

    // SSTORE operation
    pub fn op_sstore(&mut self) -> Result<OpcodeResult, VMError> {
        if self.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let [storage_slot_key, new_storage_slot_value] = *self.current_call_frame.stack.pop()?;
        let key = u256_to_h256(storage_slot_key);
        let to = self.current_call_frame.to;

        let current_value = self.db.get_storage_value(to, key)?;
        let (gas_cost, refund) = self
            .schedule
            .sstore_cost(current_value, new_storage_slot_value);

        self.current_call_frame.increase_consumed_gas(gas_cost)?;

        self.substate.refunded_gas = self
            .substate
            .refunded_gas
            .checked_add(refund)
            .ok_or(InternalError::Overflow)?;

        if current_value != new_storage_slot_value {
            self.db
                .update_account_storage(to, key, new_storage_slot_value)?;
        }

        Ok(OpcodeResult::Continue)
    }

    // JUMP operation
    pub fn op_jump(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let target = current_call_frame.stack.pop1()?;
        current_call_frame.increase_consumed_gas(gas_cost::JUMP)?;

        current_call_frame.jump(target)?;

        Ok(OpcodeResult::Continue)
    }

    // JUMPI operation
    pub fn op_jumpi(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [target, condition] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::JUMPI)?;

        // The destination is only validated when the jump is taken.
        if !condition.is_zero() {
            current_call_frame.jump(target)?;
        }

        Ok(OpcodeResult::Continue)
    }

    // PC operation
    pub fn op_pc(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas_cost::PC)?;

        // The counter already points past this opcode.
        let pc = current_call_frame
            .pc
            .checked_sub(1)
            .ok_or(InternalError::Underflow)?;
        current_call_frame.stack.push(U256::from(pc))?;

        Ok(OpcodeResult::Continue)
    }

    // MSIZE operation
    pub fn op_msize(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas_cost::MSIZE)?;
        current_call_frame
            .stack
            .push(U256::from(current_call_frame.memory.len()))?;

        Ok(OpcodeResult::Continue)
    }

    // GAS operation
    pub fn op_gas(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas_cost::GAS)?;

        // Gas left after paying for this opcode.
        let remaining_gas = current_call_frame.gas_remaining;
        current_call_frame.stack.push(U256::from(remaining_gas))?;

        Ok(OpcodeResult::Continue)
    }

    // JUMPDEST operation
    pub fn op_jumpdest(&mut self) -> Result<OpcodeResult, VMError> {
        self.current_call_frame
            .increase_consumed_gas(gas_cost::JUMPDEST)?;

        Ok(OpcodeResult::Continue)
    }
}
