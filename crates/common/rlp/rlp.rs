//! Recursive Length Prefix encoding.
//!
//! Only the encoding half lives here: the execution engine needs RLP to derive
//! contract addresses, to build transaction signing payloads and to commit to
//! account state. Decoding is the job of the networking/storage layers.

pub mod constants;
pub mod encode;
pub mod structs;

pub use encode::{RLPEncode, encode_length};
pub use structs::Encoder;
