use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost,
    memory::calculate_memory_size,
    utils::size_offset_to_usize,
    vm::VM,
};
use ferrum_common::{U256, utils::keccak};

// KECCAK256 (1)
// Opcodes: KECCAK256

impl<'a> VM<'a> {
    pub fn op_keccak256(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [offset, size] = *current_call_frame.stack.pop()?;
        let (size, offset) = size_offset_to_usize(size, offset)?;

        let new_memory_size = calculate_memory_size(offset, size)?;

        let memory_expansion_cost = self
            .schedule
            .memory_expansion_cost(new_memory_size, current_call_frame.memory.len())?;
        current_call_frame.increase_consumed_gas(gas_cost::keccak256(
            memory_expansion_cost,
            size,
        )?)?;

        current_call_frame.memory.resize(new_memory_size)?;
        let data = current_call_frame.memory.load_range(offset, size)?;
        let hash = keccak(&data);
        current_call_frame
            .stack
            .push(U256::from_big_endian(hash.as_bytes()))?;

        Ok(OpcodeResult::Continue)
    }
}
