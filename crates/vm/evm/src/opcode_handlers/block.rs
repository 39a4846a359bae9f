use crate::{
    constants::LAST_AVAILABLE_BLOCK_LIMIT,
    errors::{OpcodeResult, VMError},
    gas_cost,
    utils::address_to_word,
    vm::VM,
};
use ferrum_common::U256;

// Block Information (6)
// Opcodes: BLOCKHASH, COINBASE, TIMESTAMP, NUMBER, DIFFICULTY, GASLIMIT

impl<'a> VM<'a> {
    // BLOCKHASH operation
    pub fn op_blockhash(&mut self) -> Result<OpcodeResult, VMError> {
        let current_block = self.env.block_number;
        let block_number = self.current_call_frame.stack.pop1()?;
        self.current_call_frame
            .increase_consumed_gas(gas_cost::BLOCKHASH)?;

        // Only the 256 most recent complete blocks are visible.
        let Ok(block_number) = u64::try_from(block_number) else {
            self.current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        };
        if !is_hash_available(current_block, block_number) {
            self.current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        }

        let block_hash = self.db.get_block_hash(block_number)?;
        self.current_call_frame
            .stack
            .push(U256::from_big_endian(block_hash.as_bytes()))?;

        Ok(OpcodeResult::Continue)
    }

    // COINBASE operation
    pub fn op_coinbase(&mut self) -> Result<OpcodeResult, VMError> {
        let coinbase = self.env.coinbase;
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas_cost::COINBASE)?;

        current_call_frame.stack.push(address_to_word(coinbase))?;

        Ok(OpcodeResult::Continue)
    }

    // TIMESTAMP operation
    pub fn op_timestamp(&mut self) -> Result<OpcodeResult, VMError> {
        let timestamp = self.env.timestamp;
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas_cost::TIMESTAMP)?;

        current_call_frame.stack.push(U256::from(timestamp))?;

        Ok(OpcodeResult::Continue)
    }

    // NUMBER operation
    pub fn op_number(&mut self) -> Result<OpcodeResult, VMError> {
        let block_number = self.env.block_number;
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas_cost::NUMBER)?;

        current_call_frame.stack.push(U256::from(block_number))?;

        Ok(OpcodeResult::Continue)
    }

    // DIFFICULTY operation
    pub fn op_difficulty(&mut self) -> Result<OpcodeResult, VMError> {
        let difficulty = self.env.difficulty;
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas_cost::DIFFICULTY)?;

        current_call_frame.stack.push(difficulty)?;

        Ok(OpcodeResult::Continue)
    }

    // GASLIMIT operation
    pub fn op_gaslimit(&mut self) -> Result<OpcodeResult, VMError> {
        let block_gas_limit = self.env.block_gas_limit;
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(gas_cost::GASLIMIT)?;

        current_call_frame.stack.push(U256::from(block_gas_limit))?;

        Ok(OpcodeResult::Continue)
    }
}

/// Whether BLOCKHASH may reveal the hash of `requested` while executing `current`.
fn is_hash_available(current: u64, requested: u64) -> bool {
    requested < current
        && current
            .checked_sub(requested)
            .is_some_and(|age| age <= LAST_AVAILABLE_BLOCK_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blockhash_window() {
        assert!(is_hash_available(300, 299));
        assert!(is_hash_available(300, 44));
        assert!(!is_hash_available(300, 43));
        assert!(!is_hash_available(300, 300));
        assert!(!is_hash_available(0, 0));
    }
}
