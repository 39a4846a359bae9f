use ethereum_types::H256;
use hex_literal::hex;

/// keccak256 of the empty byte string; code hash of every account without code.
pub const EMPTY_KECCACK_HASH: H256 = H256(hex!(
    "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
));

/// keccak256(rlp([])); hash of an empty ommers list.
pub const DEFAULT_OMMERS_HASH: H256 = H256(hex!(
    "1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347"
));

pub const GWEI_TO_WEI: u64 = 1_000_000_000;
pub const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;
