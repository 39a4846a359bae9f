use crate::constants::{RLP_EMPTY_LIST, RLP_NULL, SHORT_PAYLOAD_LIMIT};
use bytes::{BufMut, Bytes};
use ethereum_types::{Bloom, H64, H160, H256, U256};

/// Types that can be serialized as RLP items.
pub trait RLPEncode {
    fn encode(&self, buf: &mut dyn BufMut);

    fn length(&self) -> usize {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf.len()
    }

    fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }
}

/// Writes the header of a list whose encoded payload is `payload_len` bytes long.
pub fn encode_length(payload_len: usize, buf: &mut dyn BufMut) {
    write_header(RLP_EMPTY_LIST, payload_len, buf);
}

fn write_header(offset: u8, payload_len: usize, buf: &mut dyn BufMut) {
    if payload_len < SHORT_PAYLOAD_LIMIT {
        // payload_len < 56 so the sum stays below 0xf8
        let len = u8::try_from(payload_len).unwrap_or_default();
        buf.put_u8(offset.wrapping_add(len));
    } else {
        let len_bytes = payload_len.to_be_bytes();
        let len_bytes = strip_leading_zeros(&len_bytes);
        let len_of_len = u8::try_from(len_bytes.len()).unwrap_or_default();
        // long form: 0xb7/0xf7 plus the length of the length
        buf.put_u8(offset.wrapping_add(55).wrapping_add(len_of_len));
        buf.put_slice(len_bytes);
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first_non_zero = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes.get(first_non_zero..).unwrap_or_default()
}

fn encode_bytes(bytes: &[u8], buf: &mut dyn BufMut) {
    match bytes {
        [single] if *single < RLP_NULL => buf.put_u8(*single),
        _ => {
            write_header(RLP_NULL, bytes.len(), buf);
            buf.put_slice(bytes);
        }
    }
}

/// Integers are encoded as their minimal big-endian byte string.
fn encode_uint(be_bytes: &[u8], buf: &mut dyn BufMut) {
    encode_bytes(strip_leading_zeros(be_bytes), buf);
}

impl RLPEncode for bool {
    fn encode(&self, buf: &mut dyn BufMut) {
        if *self {
            buf.put_u8(0x01);
        } else {
            buf.put_u8(RLP_NULL);
        }
    }
}

macro_rules! impl_encode_uint {
    ($($t:ty),*) => {
        $(
            impl RLPEncode for $t {
                fn encode(&self, buf: &mut dyn BufMut) {
                    encode_uint(&self.to_be_bytes(), buf);
                }
            }
        )*
    };
}

impl_encode_uint!(u8, u16, u32, u64, usize, u128);

impl RLPEncode for U256 {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_uint(&self.to_big_endian(), buf);
    }
}

impl RLPEncode for [u8] {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self, buf);
    }
}

impl<const N: usize> RLPEncode for [u8; N] {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self, buf);
    }
}

impl RLPEncode for Bytes {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self, buf);
    }
}

impl RLPEncode for H160 {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }
}

impl RLPEncode for H256 {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }
}

impl RLPEncode for H64 {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }
}

impl RLPEncode for Bloom {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }
}

impl RLPEncode for str {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_bytes(self.as_bytes(), buf);
    }
}

impl<T: RLPEncode> RLPEncode for Vec<T> {
    fn encode(&self, buf: &mut dyn BufMut) {
        let mut payload = Vec::new();
        for item in self {
            item.encode(&mut payload);
        }
        encode_length(payload.len(), buf);
        buf.put_slice(&payload);
    }
}

impl<T: RLPEncode + ?Sized> RLPEncode for &T {
    fn encode(&self, buf: &mut dyn BufMut) {
        (**self).encode(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_integers() {
        assert_eq!(0u64.encode_to_vec(), vec![0x80]);
        assert_eq!(15u8.encode_to_vec(), vec![0x0f]);
        assert_eq!(1024u64.encode_to_vec(), vec![0x82, 0x04, 0x00]);
        assert_eq!(U256::from(0x7f).encode_to_vec(), vec![0x7f]);
        assert_eq!(U256::from(0x80).encode_to_vec(), vec![0x81, 0x80]);
    }

    #[test]
    fn test_encode_strings() {
        assert_eq!("dog".encode_to_vec(), vec![0x83, b'd', b'o', b'g']);
        assert_eq!("".encode_to_vec(), vec![0x80]);
        let long = "Lorem ipsum dolor sit amet, consectetur adipisicing elit";
        let encoded = long.encode_to_vec();
        assert_eq!(&encoded[..2], &[0xb8, 0x38]);
        assert_eq!(encoded.len(), 58);
    }

    #[test]
    fn test_encode_nested_lists() {
        let value: Vec<Vec<u8>> = vec![vec![], vec![1u8]];
        assert_eq!(value.encode_to_vec(), vec![0xc3, 0xc0, 0xc1, 0x01]);
    }

    #[test]
    fn test_encode_bool() {
        assert_eq!(true.encode_to_vec(), vec![0x01]);
        assert_eq!(false.encode_to_vec(), vec![0x80]);
    }
}
