/// Encoding of an empty byte string (and of the integer zero).
pub const RLP_NULL: u8 = 0x80;

/// Encoding of an empty list.
pub const RLP_EMPTY_LIST: u8 = 0xc0;

/// Payloads shorter than this are prefixed with a single byte.
pub(crate) const SHORT_PAYLOAD_LIMIT: usize = 56;
