use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost,
    vm::VM,
};

// Duplication Operation (16)
// Opcodes: DUP1 ... DUP16

impl<'a> VM<'a> {
    // DUP operation, N is the depth of the duplicated item (0 for DUP1)
    #[inline]
    pub fn op_dup<const N: usize>(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let value = current_call_frame.stack.peek(N)?;
        current_call_frame.increase_consumed_gas(gas_cost::DUPN)?;

        current_call_frame.stack.push(value)?;

        Ok(OpcodeResult::Continue)
    }
}
