use crate::{
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost,
    memory::calculate_memory_size,
    utils::{size_offset_to_usize, u256_to_h256},
    vm::VM,
};
use ferrum_common::types::Log;

// Logging Operations (5)
// Opcodes: LOG0 ... LOG4

impl<'a> VM<'a> {
    // LOG operation
    pub fn op_log<const N_TOPICS: usize>(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        if current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let [offset, size] = *current_call_frame.stack.pop()?;
        let (size, offset) = size_offset_to_usize(size, offset)?;
        let topics = (*current_call_frame.stack.pop::<N_TOPICS>()?).map(u256_to_h256);

        let new_memory_size = calculate_memory_size(offset, size)?;

        let memory_expansion_cost = self
            .schedule
            .memory_expansion_cost(new_memory_size, current_call_frame.memory.len())?;
        current_call_frame.increase_consumed_gas(gas_cost::log(
            memory_expansion_cost,
            size,
            N_TOPICS,
        )?)?;

        current_call_frame.memory.resize(new_memory_size)?;
        let log = Log {
            address: current_call_frame.to,
            topics: topics.to_vec(),
            data: current_call_frame.memory.load_range(offset, size)?,
        };

        self.substate.add_log(log);

        Ok(OpcodeResult::Continue)
    }
}
