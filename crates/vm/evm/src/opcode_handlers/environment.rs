use crate::{
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost,
    memory::calculate_memory_size,
    utils::{address_to_word, size_offset_to_usize, u256_to_usize, word_to_address},
    vm::VM,
};
use ferrum_common::{U256, utils::u256_from_big_endian_const};

// Environmental Information (15)
// Opcodes: ADDRESS, BALANCE, ORIGIN, CALLER, CALLVALUE, CALLDATALOAD, CALLDATASIZE, CALLDATACOPY, CODESIZE, CODECOPY, GASPRICE, EXTCODESIZE, EXTCODECOPY, RETURNDATASIZE, RETURNDATACOPY

impl<'a> VM<'a> {
    // ADDRESS operation
    pub fn op_address(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas_cost::ADDRESS)?;

        let addr = current_call_frame.to; // The recipient of the current call.

        current_call_frame.stack.push(address_to_word(addr))?;

        Ok(OpcodeResult::Continue)
    }

    // BALANCE operation
    pub fn op_balance(&mut self) -> Result<OpcodeResult, VMError> {
        let address = word_to_address(self.current_call_frame.stack.pop1()?);

        self.current_call_frame
            .increase_consumed_gas(self.schedule.gas_table().balance)?;

        let account_balance = self.db.get_account(address)?.info.balance;

        self.current_call_frame.stack.push(account_balance)?;

        Ok(OpcodeResult::Continue)
    }

    // ORIGIN operation
    pub fn op_origin(&mut self) -> Result<OpcodeResult, VMError> {
        let origin = self.env.origin;
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas_cost::ORIGIN)?;

        current_call_frame.stack.push(address_to_word(origin))?;

        Ok(OpcodeResult::Continue)
    }

    // CALLER operation
    pub fn op_caller(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas_cost::CALLER)?;

        let caller = address_to_word(current_call_frame.msg_sender);
        current_call_frame.stack.push(caller)?;

        Ok(OpcodeResult::Continue)
    }

    // CALLVALUE operation
    pub fn op_callvalue(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas_cost::CALLVALUE)?;

        let callvalue = current_call_frame.msg_value;

        current_call_frame.stack.push(callvalue)?;

        Ok(OpcodeResult::Continue)
    }

    // CALLDATALOAD operation
    #[inline]
    pub fn op_calldataload(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let offset = current_call_frame.stack.pop1()?;
        current_call_frame.increase_consumed_gas(gas_cost::CALLDATALOAD)?;

        // All bytes after the end of the calldata are set to 0.
        let offset = u256_to_usize(offset).unwrap_or(usize::MAX);
        let mut data = [0u8; 32];
        data.copy_from_slice(&padded_slice(&current_call_frame.calldata, offset, 32));

        current_call_frame
            .stack
            .push(u256_from_big_endian_const(data))?;

        Ok(OpcodeResult::Continue)
    }

    // CALLDATASIZE operation
    pub fn op_calldatasize(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas_cost::CALLDATASIZE)?;

        current_call_frame
            .stack
            .push(U256::from(current_call_frame.calldata.len()))?;

        Ok(OpcodeResult::Continue)
    }

    // CALLDATACOPY operation
    pub fn op_calldatacopy(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [dest_offset, calldata_offset, size] = *current_call_frame.stack.pop()?;
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let calldata_offset = u256_to_usize(calldata_offset).unwrap_or(usize::MAX);

        let new_memory_size = calculate_memory_size(dest_offset, size)?;

        let memory_expansion_cost = self
            .schedule
            .memory_expansion_cost(new_memory_size, current_call_frame.memory.len())?;
        current_call_frame.increase_consumed_gas(gas_cost::calldatacopy(
            memory_expansion_cost,
            size,
        )?)?;

        if size == 0 {
            return Ok(OpcodeResult::Continue);
        }

        let src_slice = in_bounds(&current_call_frame.calldata, calldata_offset, size);
        current_call_frame
            .memory
            .store_data_zero_padded(dest_offset, src_slice, size)?;

        Ok(OpcodeResult::Continue)
    }

    // CODESIZE operation
    pub fn op_codesize(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas_cost::CODESIZE)?;

        current_call_frame
            .stack
            .push(U256::from(current_call_frame.bytecode.len()))?;

        Ok(OpcodeResult::Continue)
    }

    // CODECOPY operation
    pub fn op_codecopy(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;

        let [dest_offset, code_offset, size] = *current_call_frame.stack.pop()?;
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let code_offset = u256_to_usize(code_offset).unwrap_or(usize::MAX);

        let new_memory_size = calculate_memory_size(dest_offset, size)?;

        let memory_expansion_cost = self
            .schedule
            .memory_expansion_cost(new_memory_size, current_call_frame.memory.len())?;
        current_call_frame.increase_consumed_gas(gas_cost::codecopy(memory_expansion_cost, size)?)?;

        if size == 0 {
            return Ok(OpcodeResult::Continue);
        }

        let slice = in_bounds(&current_call_frame.bytecode.bytecode, code_offset, size);
        current_call_frame
            .memory
            .store_data_zero_padded(dest_offset, slice, size)?;

        Ok(OpcodeResult::Continue)
    }

    // GASPRICE operation
    pub fn op_gasprice(&mut self) -> Result<OpcodeResult, VMError> {
        let gas_price = self.env.gas_price;
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas_cost::GASPRICE)?;

        current_call_frame.stack.push(gas_price)?;

        Ok(OpcodeResult::Continue)
    }

    // EXTCODESIZE operation
    pub fn op_extcodesize(&mut self) -> Result<OpcodeResult, VMError> {
        let address = word_to_address(self.current_call_frame.stack.pop1()?);

        self.current_call_frame
            .increase_consumed_gas(self.schedule.gas_table().extcodesize)?;

        let account_code_length = self.db.get_account_code(address)?.len();

        self.current_call_frame
            .stack
            .push(U256::from(account_code_length))?;

        Ok(OpcodeResult::Continue)
    }

    // EXTCODECOPY operation
    pub fn op_extcodecopy(&mut self) -> Result<OpcodeResult, VMError> {
        let call_frame = &mut self.current_call_frame;
        let [address, dest_offset, offset, size] = *call_frame.stack.pop()?;

        let address = word_to_address(address);
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let offset = u256_to_usize(offset).unwrap_or(usize::MAX);

        let new_memory_size = calculate_memory_size(dest_offset, size)?;
        let memory_expansion_cost = self
            .schedule
            .memory_expansion_cost(new_memory_size, call_frame.memory.len())?;

        call_frame.increase_consumed_gas(gas_cost::extcodecopy(
            memory_expansion_cost,
            size,
            self.schedule.gas_table().extcodecopy,
        )?)?;

        if size == 0 {
            return Ok(OpcodeResult::Continue);
        }

        let bytecode = self.db.get_account_code(address)?;
        let slice = in_bounds(&bytecode.bytecode, offset, size);

        self.current_call_frame
            .memory
            .store_data_zero_padded(dest_offset, slice, size)?;

        Ok(OpcodeResult::Continue)
    }

    // RETURNDATASIZE operation
    pub fn op_returndatasize(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas_cost::RETURNDATASIZE)?;

        current_call_frame
            .stack
            .push(U256::from(current_call_frame.sub_return_data.len()))?;

        Ok(OpcodeResult::Continue)
    }

    // RETURNDATACOPY operation
    pub fn op_returndatacopy(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [dest_offset, returndata_offset, size] = *current_call_frame.stack.pop()?;

        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;

        let new_memory_size = calculate_memory_size(dest_offset, size)?;

        let memory_expansion_cost = self
            .schedule
            .memory_expansion_cost(new_memory_size, current_call_frame.memory.len())?;
        current_call_frame.increase_consumed_gas(gas_cost::returndatacopy(
            memory_expansion_cost,
            size,
        )?)?;

        // Reading past the return data is an error, even for zero bytes.
        let returndata_offset =
            u256_to_usize(returndata_offset).map_err(|_| ExceptionalHalt::OutOfBounds)?;
        let copy_limit = returndata_offset
            .checked_add(size)
            .ok_or(ExceptionalHalt::OutOfBounds)?;

        let slice = current_call_frame
            .sub_return_data
            .get(returndata_offset..copy_limit)
            .ok_or(ExceptionalHalt::OutOfBounds)?;

        if size == 0 {
            return Ok(OpcodeResult::Continue);
        }

        let slice = slice.to_vec();
        current_call_frame.memory.store_data(dest_offset, &slice)?;

        Ok(OpcodeResult::Continue)
    }
}

/// The part of `data[offset..offset + size]` that exists; callers zero-pad the rest.
fn in_bounds(data: &[u8], offset: usize, size: usize) -> &[u8] {
    let end = offset.saturating_add(size).min(data.len());
    data.get(offset..end).unwrap_or_default()
}

/// `size` bytes of `data` from `offset`, zero-padded past its end.
fn padded_slice(data: &[u8], offset: usize, size: usize) -> Vec<u8> {
    let mut padded = vec![0u8; size];
    for (dst, src) in padded.iter_mut().zip(in_bounds(data, offset, size)) {
        *dst = *src;
    }
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_bounds_clamps() {
        let data = [1u8, 2, 3];
        assert_eq!(in_bounds(&data, 1, 10), &[2, 3]);
        assert!(in_bounds(&data, 3, 1).is_empty());
        assert!(in_bounds(&data, usize::MAX, 32).is_empty());
    }

    #[test]
    fn test_padded_slice() {
        assert_eq!(padded_slice(&[0xaa, 0xbb], 1, 4), vec![0xbb, 0, 0, 0]);
    }
}
