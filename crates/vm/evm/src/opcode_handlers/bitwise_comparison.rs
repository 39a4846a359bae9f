use crate::{
    constants::WORD_SIZE,
    errors::{InternalError, OpcodeResult, VMError},
    gas_cost,
    vm::VM,
};
use ferrum_common::U256;

// Comparison and Bitwise Logic Operations (11)
// Opcodes: LT, GT, SLT, SGT, EQ, ISZERO, AND, OR, XOR, NOT, BYTE

impl<'a> VM<'a> {
    // LT operation
    #[inline]
    pub fn op_lt(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [lho, rho] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::LT)?;
        let result = u256_from_bool(lho < rho);
        current_call_frame.stack.push(result)?;

        Ok(OpcodeResult::Continue)
    }

    // GT operation
    #[inline]
    pub fn op_gt(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [lho, rho] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::GT)?;
        let result = u256_from_bool(lho > rho);
        current_call_frame.stack.push(result)?;

        Ok(OpcodeResult::Continue)
    }

    // SLT operation (signed less than)
    pub fn op_slt(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [lho, rho] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::SLT)?;
        let lho_is_negative = lho.bit(255);
        let rho_is_negative = rho.bit(255);
        let result = if lho_is_negative == rho_is_negative {
            // Compare magnitudes if signs are the same
            u256_from_bool(lho < rho)
        } else {
            // Negative is smaller if signs differ
            u256_from_bool(lho_is_negative)
        };
        current_call_frame.stack.push(result)?;

        Ok(OpcodeResult::Continue)
    }

    // SGT operation (signed greater than)
    pub fn op_sgt(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [lho, rho] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::SGT)?;
        let lho_is_negative = lho.bit(255);
        let rho_is_negative = rho.bit(255);
        let result = if lho_is_negative == rho_is_negative {
            u256_from_bool(lho > rho)
        } else {
            // Positive is bigger if signs differ
            u256_from_bool(rho_is_negative)
        };
        current_call_frame.stack.push(result)?;

        Ok(OpcodeResult::Continue)
    }

    // EQ operation (equality check)
    #[inline]
    pub fn op_eq(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [lho, rho] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::EQ)?;
        let result = u256_from_bool(lho == rho);

        current_call_frame.stack.push(result)?;

        Ok(OpcodeResult::Continue)
    }

    // ISZERO operation (check if zero)
    #[inline]
    pub fn op_iszero(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let operand = current_call_frame.stack.pop1()?;
        current_call_frame.increase_consumed_gas(gas_cost::ISZERO)?;

        let result = u256_from_bool(operand.is_zero());

        current_call_frame.stack.push(result)?;

        Ok(OpcodeResult::Continue)
    }

    // AND operation
    #[inline]
    pub fn op_and(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [a, b] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::AND)?;
        current_call_frame.stack.push(a & b)?;

        Ok(OpcodeResult::Continue)
    }

    // OR operation
    #[inline]
    pub fn op_or(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [a, b] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::OR)?;
        current_call_frame.stack.push(a | b)?;

        Ok(OpcodeResult::Continue)
    }

    // XOR operation
    pub fn op_xor(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [a, b] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::XOR)?;
        current_call_frame.stack.push(a ^ b)?;

        Ok(OpcodeResult::Continue)
    }

    // NOT operation
    pub fn op_not(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let a = current_call_frame.stack.pop1()?;
        current_call_frame.increase_consumed_gas(gas_cost::NOT)?;
        current_call_frame.stack.push(!a)?;

        Ok(OpcodeResult::Continue)
    }

    // BYTE operation
    pub fn op_byte(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [op1, op2] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::BYTE)?;
        let byte_index: usize = match op1.try_into() {
            Ok(byte_index) => byte_index,
            Err(_) => {
                // Index is out of bounds, then push 0
                current_call_frame.stack.push_zero()?;
                return Ok(OpcodeResult::Continue);
            }
        };

        if byte_index < WORD_SIZE {
            // Index 0 is the most significant byte
            let byte_to_push = WORD_SIZE
                .checked_sub(byte_index)
                .and_then(|index| index.checked_sub(1))
                .ok_or(InternalError::Underflow)?;
            current_call_frame
                .stack
                .push(U256::from(op2.byte(byte_to_push)))?;
        } else {
            current_call_frame.stack.push_zero()?;
        }

        Ok(OpcodeResult::Continue)
    }
}

pub(crate) const fn u256_from_bool(value: bool) -> U256 {
    if value { U256::one() } else { U256::zero() }
}
