use crate::{
    errors::{InternalError, OpcodeResult, VMError},
    gas_cost,
    vm::VM,
};
use ferrum_common::{U256, U512};

// Arithmetic Operations (11)
// Opcodes: ADD, SUB, MUL, DIV, SDIV, MOD, SMOD, ADDMOD, MULMOD, EXP, SIGNEXTEND

impl<'a> VM<'a> {
    // ADD operation
    #[inline]
    pub fn op_add(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [augend, addend] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::ADD)?;

        let sum = augend.overflowing_add(addend).0;
        current_call_frame.stack.push(sum)?;

        Ok(OpcodeResult::Continue)
    }

    // SUB operation
    #[inline]
    pub fn op_sub(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [minuend, subtrahend] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::SUB)?;

        let difference = minuend.overflowing_sub(subtrahend).0;
        current_call_frame.stack.push(difference)?;

        Ok(OpcodeResult::Continue)
    }

    // MUL operation
    #[inline]
    pub fn op_mul(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [multiplicand, multiplier] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::MUL)?;

        let product = multiplicand.overflowing_mul(multiplier).0;
        current_call_frame.stack.push(product)?;

        Ok(OpcodeResult::Continue)
    }

    // DIV operation
    pub fn op_div(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [dividend, divisor] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::DIV)?;

        // x / 0 = 0
        let quotient = dividend.checked_div(divisor).unwrap_or_default();
        current_call_frame.stack.push(quotient)?;

        Ok(OpcodeResult::Continue)
    }

    // SDIV operation
    pub fn op_sdiv(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [dividend, divisor] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::SDIV)?;

        if divisor.is_zero() || dividend.is_zero() {
            current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        }

        // -2^255 / -1 negates back to -2^255
        let quotient = match abs(dividend).checked_div(abs(divisor)) {
            Some(quot) if is_negative(dividend) ^ is_negative(divisor) => negate(quot),
            Some(quot) => quot,
            None => U256::zero(),
        };

        current_call_frame.stack.push(quotient)?;

        Ok(OpcodeResult::Continue)
    }

    // MOD operation
    pub fn op_mod(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [dividend, divisor] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::MOD)?;

        let remainder = dividend.checked_rem(divisor).unwrap_or_default();

        current_call_frame.stack.push(remainder)?;

        Ok(OpcodeResult::Continue)
    }

    // SMOD operation
    pub fn op_smod(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [unchecked_dividend, unchecked_divisor] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::SMOD)?;

        if unchecked_divisor.is_zero() || unchecked_dividend.is_zero() {
            current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        }

        let Some(unchecked_remainder) =
            abs(unchecked_dividend).checked_rem(abs(unchecked_divisor))
        else {
            current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        };

        // The result takes the sign of the dividend
        let remainder = if is_negative(unchecked_dividend) {
            negate(unchecked_remainder)
        } else {
            unchecked_remainder
        };

        current_call_frame.stack.push(remainder)?;

        Ok(OpcodeResult::Continue)
    }

    // ADDMOD operation
    pub fn op_addmod(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [augend, addend, modulus] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::ADDMOD)?;

        if modulus.is_zero() {
            current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        }

        let new_augend: U512 = augend.into();
        let new_addend: U512 = addend.into();

        #[allow(
            clippy::arithmetic_side_effects,
            reason = "both values come from a u256, so the sum fits in a U512"
        )]
        let sum = new_augend + new_addend;
        #[allow(
            clippy::arithmetic_side_effects,
            reason = "can't trap because non-zero modulus"
        )]
        let sum_mod = sum % U512::from(modulus);

        let sum_mod: U256 = sum_mod
            .try_into()
            .map_err(|_| InternalError::TypeConversion)?;

        current_call_frame.stack.push(sum_mod)?;

        Ok(OpcodeResult::Continue)
    }

    // MULMOD operation
    pub fn op_mulmod(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [multiplicand, multiplier, modulus] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::MULMOD)?;

        if modulus.is_zero() || multiplicand.is_zero() || multiplier.is_zero() {
            current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        }

        let product = multiplicand.full_mul(multiplier);

        #[allow(clippy::arithmetic_side_effects, reason = "modulus isn't zero")]
        let product_mod = product % U512::from(modulus);

        let product_mod: U256 = product_mod
            .try_into()
            .map_err(|_| InternalError::TypeConversion)?;

        current_call_frame.stack.push(product_mod)?;

        Ok(OpcodeResult::Continue)
    }

    // EXP operation
    pub fn op_exp(&mut self) -> Result<OpcodeResult, VMError> {
        let exp_byte_cost = self.schedule.gas_table().exp_byte;
        let current_call_frame = &mut self.current_call_frame;
        let [base, exponent] = *current_call_frame.stack.pop()?;

        let gas_cost = gas_cost::exp(exponent, exp_byte_cost)?;

        current_call_frame.increase_consumed_gas(gas_cost)?;

        let power = base.overflowing_pow(exponent).0;
        current_call_frame.stack.push(power)?;

        Ok(OpcodeResult::Continue)
    }

    // SIGNEXTEND operation
    pub fn op_signextend(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [byte_size_minus_one, value_to_extend] = *current_call_frame.stack.pop()?;
        current_call_frame.increase_consumed_gas(gas_cost::SIGNEXTEND)?;

        if byte_size_minus_one > U256::from(31) {
            current_call_frame.stack.push(value_to_extend)?;
            return Ok(OpcodeResult::Continue);
        }

        #[allow(
            clippy::arithmetic_side_effects,
            reason = "Since byte_size_minus_one ≤ 31, overflow is impossible"
        )]
        let sign_bit_index = byte_size_minus_one * 8 + 7;

        #[expect(
            clippy::arithmetic_side_effects,
            reason = "sign_bit_index max value is 31 * 8 + 7 = 255, which can't overflow."
        )]
        {
            let sign_bit = (value_to_extend >> sign_bit_index) & U256::one();
            let mask = (U256::one() << sign_bit_index) - U256::one();

            let result = if sign_bit.is_zero() {
                value_to_extend & mask
            } else {
                value_to_extend | !mask
            };

            current_call_frame.stack.push(result)?;

            Ok(OpcodeResult::Continue)
        }
    }
}

/// Checks the most significant bit, the sign in two's complement.
fn is_negative(value: U256) -> bool {
    value.bit(255)
}

/// Negates a number in two's complement
fn negate(value: U256) -> U256 {
    let (negated, _overflowed) = (!value).overflowing_add(U256::one());
    negated
}

fn abs(value: U256) -> U256 {
    if is_negative(value) {
        negate(value)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minus(value: u64) -> U256 {
        negate(U256::from(value))
    }

    #[test]
    fn test_negate_roundtrip() {
        assert_eq!(negate(minus(5)), U256::from(5));
        assert_eq!(negate(U256::zero()), U256::zero());
        assert!(is_negative(minus(1)));
        assert_eq!(abs(minus(7)), U256::from(7));
    }

    #[test]
    fn test_min_value_is_its_own_negation() {
        let min = U256::one() << 255;
        assert_eq!(negate(min), min);
        assert_eq!(abs(min), min);
    }
}
