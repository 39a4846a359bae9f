use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost,
    vm::VM,
};

// Exchange Operations (16)
// Opcodes: SWAP1 ... SWAP16

impl<'a> VM<'a> {
    // SWAP operation, exchanging the top with the item N below it
    #[inline]
    pub fn op_swap<const N: usize>(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.stack.swap::<N>()?;
        current_call_frame.increase_consumed_gas(gas_cost::SWAPN)?;

        Ok(OpcodeResult::Continue)
    }
}
