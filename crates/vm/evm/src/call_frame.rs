use crate::{
    constants::STACK_LIMIT,
    db::gen_db::Snapshot,
    errors::{ExceptionalHalt, InternalError, VMError},
    memory::Memory,
};
use bytes::Bytes;
use ferrum_common::{Address, U256, types::Code};
use std::fmt;

/// The operand stack: at most 1024 words.
///
/// Values grow downwards from the end of a fixed array, so `values[offset]`
/// is the top of the stack and popping `N` items hands back a contiguous
/// slice with the top first.
#[derive(Clone, PartialEq, Eq)]
pub struct Stack {
    values: Box<[U256; STACK_LIMIT]>,
    offset: usize,
}

impl Stack {
    /// Pops `N` values, top of the stack first.
    #[inline]
    pub fn pop<const N: usize>(&mut self) -> Result<&[U256; N], ExceptionalHalt> {
        let start = self.offset;
        let end = start.checked_add(N).ok_or(ExceptionalHalt::StackUnderflow)?;
        if end > STACK_LIMIT {
            return Err(ExceptionalHalt::StackUnderflow);
        }
        self.offset = end;
        self.values
            .get(start..end)
            .and_then(|values| <&[U256; N]>::try_from(values).ok())
            .ok_or(ExceptionalHalt::StackUnderflow)
    }

    #[inline]
    pub fn pop1(&mut self) -> Result<U256, ExceptionalHalt> {
        let [value] = *self.pop()?;
        Ok(value)
    }

    #[inline]
    pub fn push(&mut self, value: U256) -> Result<(), ExceptionalHalt> {
        let offset = self
            .offset
            .checked_sub(1)
            .ok_or(ExceptionalHalt::StackOverflow)?;
        *self
            .values
            .get_mut(offset)
            .ok_or(ExceptionalHalt::StackOverflow)? = value;
        self.offset = offset;
        Ok(())
    }

    #[inline]
    pub fn push_zero(&mut self) -> Result<(), ExceptionalHalt> {
        self.push(U256::zero())
    }

    /// Reads the value `depth` positions below the top without popping it.
    #[inline]
    pub fn peek(&self, depth: usize) -> Result<U256, ExceptionalHalt> {
        self.offset
            .checked_add(depth)
            .and_then(|index| self.values.get(index))
            .copied()
            .ok_or(ExceptionalHalt::StackUnderflow)
    }

    /// Pushes a copy of the value `N` positions below the top (`N = 0` is DUP1).
    #[inline]
    pub fn dup<const N: usize>(&mut self) -> Result<(), ExceptionalHalt> {
        let value = self.peek(N)?;
        self.push(value)
    }

    /// Exchanges the top with the value `N` positions below it (`N = 1` is SWAP1).
    #[inline]
    pub fn swap<const N: usize>(&mut self) -> Result<(), ExceptionalHalt> {
        let other = self
            .offset
            .checked_add(N)
            .filter(|index| *index < STACK_LIMIT)
            .ok_or(ExceptionalHalt::StackUnderflow)?;
        self.values.swap(self.offset, other);
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        STACK_LIMIT.wrapping_sub(self.offset)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offset == STACK_LIMIT
    }

    pub fn clear(&mut self) {
        self.offset = STACK_LIMIT;
    }

    /// Live values, top of the stack first.
    pub fn as_slice(&self) -> &[U256] {
        self.values.get(self.offset..).unwrap_or_default()
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self {
            values: Box::new([U256::zero(); STACK_LIMIT]),
            offset: STACK_LIMIT,
        }
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// A call frame, or execution environment, is the context in which
/// the EVM is currently executing.
/// One context can trigger another with opcodes like CALL or CREATE.
/// Call frames relationships can be thought of as a parent-child relation.
#[derive(Debug, Clone, Default)]
pub struct CallFrame {
    /// Max gas a callframe can use
    pub gas_limit: u64,
    /// Keeps track of the remaining gas in the current context.
    pub gas_remaining: u64,
    /// Program Counter
    pub pc: usize,
    /// Address of the account that sent the message
    pub msg_sender: Address,
    /// Address of the recipient of the message
    pub to: Address,
    /// Address of the code to execute. Usually the same as `to`, but can be different
    pub code_address: Address,
    pub bytecode: Code,
    /// Value sent along the transaction
    pub msg_value: U256,
    pub stack: Stack,
    pub memory: Memory,
    /// Data sent along the transaction. Empty in CREATE transactions.
    pub calldata: Bytes,
    /// Return data of the CURRENT CONTEXT (see docs for more details)
    pub output: Bytes,
    /// Return data of the SUB-CONTEXT (see docs for more details)
    pub sub_return_data: Bytes,
    /// Indicates if current context is static (if it is, it can't alter state)
    pub is_static: bool,
    /// Call stack current depth
    pub depth: usize,
    /// This is set to true if the function that created this callframe is CREATE or CREATE2
    pub is_create: bool,
    /// Where the parent wants the output of this frame copied (CALL family only).
    pub ret_offset: usize,
    pub ret_size: usize,
    /// If true then transfer value from caller to callee
    pub should_transfer_value: bool,
    /// State journal position when this frame started; reverting rolls back to it.
    pub snapshot: Snapshot,
}

impl CallFrame {
    #[expect(clippy::too_many_arguments)]
    pub fn new(
        msg_sender: Address,
        to: Address,
        code_address: Address,
        bytecode: Code,
        msg_value: U256,
        calldata: Bytes,
        is_static: bool,
        gas_limit: u64,
        depth: usize,
        should_transfer_value: bool,
        is_create: bool,
        ret_offset: usize,
        ret_size: usize,
        snapshot: Snapshot,
        stack: Stack,
    ) -> Self {
        Self {
            gas_limit,
            gas_remaining: gas_limit,
            msg_sender,
            to,
            code_address,
            bytecode,
            msg_value,
            calldata,
            is_static,
            depth,
            should_transfer_value,
            is_create,
            ret_offset,
            ret_size,
            snapshot,
            stack,
            ..Default::default()
        }
    }

    /// Opcode at the program counter. Running off the end of the code is a STOP.
    #[inline]
    pub fn next_opcode(&self) -> u8 {
        self.bytecode.bytecode.get(self.pc).copied().unwrap_or(0x00)
    }

    #[inline]
    pub fn advance_pc(&mut self, count: usize) -> Result<(), VMError> {
        self.pc = self
            .pc
            .checked_add(count)
            .ok_or(InternalError::Overflow)?;
        Ok(())
    }

    /// Charges `gas` to this frame, failing without charging if it cannot be paid.
    #[inline]
    pub fn increase_consumed_gas(&mut self, gas: u64) -> Result<(), ExceptionalHalt> {
        self.gas_remaining = self
            .gas_remaining
            .checked_sub(gas)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        Ok(())
    }

    /// Gas given to the frame that is no longer available to it.
    #[inline]
    pub fn gas_used(&self) -> u64 {
        self.gas_limit.saturating_sub(self.gas_remaining)
    }

    /// Moves the program counter to `target`, which must be a JUMPDEST.
    pub fn jump(&mut self, target: U256) -> Result<(), ExceptionalHalt> {
        let target = usize::try_from(target).map_err(|_| ExceptionalHalt::InvalidJump)?;
        if !self.bytecode.is_valid_jump_target(target) {
            return Err(ExceptionalHalt::InvalidJump);
        }
        self.pc = target;
        Ok(())
    }

    /// Immediate operand bytes following the opcode at `pc - 1`, zero-padded
    /// when the code ends early.
    pub fn read_immediate<const N: usize>(&self) -> [u8; N] {
        let mut value = [0u8; N];
        let code = &self.bytecode.bytecode;
        if let Some(available) = code.get(self.pc..self.pc.saturating_add(N).min(code.len())) {
            for (dst, src) in value.iter_mut().zip(available) {
                *dst = *src;
            }
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_returns_top_first() {
        let mut stack = Stack::default();
        stack.push(U256::from(1)).expect("push");
        stack.push(U256::from(2)).expect("push");
        let [top, below] = *stack.pop().expect("pop");
        assert_eq!((top, below), (U256::from(2), U256::from(1)));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_underflow_leaves_stack_untouched() {
        let mut stack = Stack::default();
        stack.push(U256::one()).expect("push");
        assert_eq!(stack.pop::<2>(), Err(ExceptionalHalt::StackUnderflow));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_overflow_at_limit() {
        let mut stack = Stack::default();
        for i in 0..STACK_LIMIT {
            stack.push(U256::from(i)).expect("push");
        }
        assert_eq!(stack.push(U256::zero()), Err(ExceptionalHalt::StackOverflow));
        assert_eq!(stack.len(), STACK_LIMIT);
    }

    #[test]
    fn test_dup_and_swap() {
        let mut stack = Stack::default();
        for i in 1..=3u64 {
            stack.push(U256::from(i)).expect("push");
        }
        stack.dup::<2>().expect("dup3");
        assert_eq!(stack.peek(0).expect("peek"), U256::from(1));
        stack.swap::<3>().expect("swap3");
        assert_eq!(
            stack.as_slice(),
            &[U256::from(3), U256::from(2), U256::from(1), U256::from(1)]
        );
        assert_eq!(stack.swap::<4>(), Err(ExceptionalHalt::StackUnderflow));
    }

    #[test]
    fn test_gas_charging() {
        let mut frame = CallFrame {
            gas_limit: 10,
            gas_remaining: 10,
            ..Default::default()
        };
        frame.increase_consumed_gas(4).expect("enough gas");
        assert_eq!(frame.gas_used(), 4);
        assert_eq!(frame.increase_consumed_gas(7), Err(ExceptionalHalt::OutOfGas));
        assert_eq!(frame.gas_remaining, 6);
    }

    #[test]
    fn test_next_opcode_past_end_is_stop() {
        let frame = CallFrame {
            pc: 5,
            ..Default::default()
        };
        assert_eq!(frame.next_opcode(), 0x00);
    }

    #[test]
    fn test_read_immediate_zero_padded() {
        let frame = CallFrame {
            bytecode: Code::from_bytecode(Bytes::from_static(&[0x61, 0xaa])),
            pc: 1,
            ..Default::default()
        };
        assert_eq!(frame.read_immediate::<2>(), [0xaa, 0x00]);
    }
}
