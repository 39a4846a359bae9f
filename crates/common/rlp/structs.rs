use crate::encode::{RLPEncode, encode_length};
use bytes::BufMut;

/// Builder for RLP lists.
///
/// Fields are buffered until [`Encoder::finish`] is called, at which point the
/// list header is written followed by the encoded fields.
///
/// ```
/// use ferrum_rlp::{Encoder, RLPEncode};
///
/// let mut buf = Vec::new();
/// Encoder::new(&mut buf)
///     .encode_field(&1u64)
///     .encode_field(&2u64)
///     .finish();
/// assert_eq!(buf, vec![0xc2, 0x01, 0x02]);
/// ```
#[must_use = "`Encoder` must be consumed with `finish` to write the list"]
pub struct Encoder<'a> {
    buf: &'a mut dyn BufMut,
    temp_buf: Vec<u8>,
}

impl<'a> Encoder<'a> {
    pub fn new(buf: &'a mut dyn BufMut) -> Self {
        Self {
            buf,
            temp_buf: Vec::new(),
        }
    }

    /// Appends a field to the list being built.
    pub fn encode_field<T: RLPEncode + ?Sized>(mut self, value: &T) -> Self {
        value.encode(&mut self.temp_buf);
        self
    }

    /// Appends an already encoded item verbatim.
    pub fn encode_raw(mut self, encoded: &[u8]) -> Self {
        self.temp_buf.put_slice(encoded);
        self
    }

    /// Writes the list header and the buffered fields into the output buffer.
    pub fn finish(self) {
        encode_length(self.temp_buf.len(), self.buf);
        self.buf.put_slice(&self.temp_buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_types::{Address, U256};
    use hex_literal::hex;

    #[test]
    fn test_encode_empty_list() {
        let mut buf = Vec::new();
        Encoder::new(&mut buf).finish();
        assert_eq!(buf, vec![0xc0]);
    }

    #[test]
    fn test_encode_address_nonce_pair() {
        // keccak(rlp([sender, 0])) is the basis for CREATE addresses.
        let sender = Address::from_slice(&hex!("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0"));
        let mut buf = Vec::new();
        Encoder::new(&mut buf)
            .encode_field(&sender)
            .encode_field(&0u64)
            .finish();
        let mut expected = vec![0xd6, 0x94];
        expected.extend_from_slice(sender.as_bytes());
        expected.push(0x80);
        assert_eq!(buf, expected);
    }

    #[test]
    fn test_encode_long_list() {
        let values: Vec<U256> = (0..30u64).map(|i| U256::from(i + 1000)).collect();
        let mut buf = Vec::new();
        Encoder::new(&mut buf).encode_field(&values).finish();
        // 30 items of 3 bytes each = 90 bytes inner list, wrapped once more.
        assert_eq!(buf[0], 0xf8);
        assert_eq!(buf[1], 92);
        assert_eq!(buf[2], 0xf8);
        assert_eq!(buf[3], 90);
    }
}
