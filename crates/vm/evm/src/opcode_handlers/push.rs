use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost,
    vm::VM,
};
use ferrum_common::utils::u256_from_big_endian_const;

// Push Operations
// Opcodes: PUSH1 ... PUSH32

impl<'a> VM<'a> {
    // Generic PUSH operation, optimized at compile time for the given N.
    #[inline]
    pub fn op_push<const N: usize>(&mut self) -> Result<OpcodeResult, VMError> {
        let call_frame = &mut self.current_call_frame;
        call_frame.increase_consumed_gas(gas_cost::PUSHN)?;

        // Immediate bytes missing at the end of the code read as zero.
        let value = u256_from_big_endian_const(call_frame.read_immediate::<N>());
        call_frame.stack.push(value)?;

        // Advance the PC by the number of bytes in this instruction's payload.
        call_frame.advance_pc(N)?;

        Ok(OpcodeResult::Continue)
    }
}
