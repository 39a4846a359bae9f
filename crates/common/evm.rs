use crate::utils::keccak;
use ethereum_types::Address;
use ferrum_rlp::{Encoder, RLPEncode};

/// Address of a contract created by `sender` with its account nonce at `nonce`:
/// the low 20 bytes of `keccak(rlp([sender, nonce]))`.
pub fn calculate_create_address(sender: Address, nonce: u64) -> Address {
    let mut encoded = Vec::new();
    Encoder::new(&mut encoded)
        .encode_field(&sender)
        .encode_field(&nonce)
        .finish();
    Address::from_slice(keccak(encoded).as_bytes().get(12..).unwrap_or_default())
}

/// keccak256 of the RLP encoding of `value`.
pub fn rlp_hash<T: RLPEncode + ?Sized>(value: &T) -> ethereum_types::H256 {
    keccak(value.encode_to_vec())
}
