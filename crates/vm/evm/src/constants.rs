use ferrum_common::U256;

pub const WORD_SIZE_IN_BYTES_USIZE: usize = 32;
pub const WORD_SIZE: usize = 32;

pub const SUCCESS: U256 = U256::one();
pub const FAIL: U256 = U256::zero();

pub const STACK_LIMIT: usize = 1024;
/// Deepest call frame allowed; a frame at this depth cannot call or create.
pub const CALL_DEPTH_LIMIT: usize = 1024;

pub const MEMORY_EXPANSION_QUOTIENT: u64 = 512;

/// EIP-170 limit on deployed code, enforced from Spurious Dragon.
pub const MAX_CODE_SIZE: usize = 0x6000;

/// BLOCKHASH only answers for this many most recent ancestors.
pub const LAST_AVAILABLE_BLOCK_LIMIT: u64 = 256;

pub const TX_BASE_COST: u64 = 21000;
