use crate::{constants::DEFAULT_OMMERS_HASH, evm::rlp_hash, types::Transaction};
use bytes::Bytes;
use ethereum_types::{Address, Bloom, H64, H256, U256};
use ferrum_rlp::{Encoder, RLPEncode};
use serde::{Deserialize, Serialize};

/// Header fields of a pre-London block, in canonical RLP order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    #[serde(default)]
    pub parent_hash: H256,
    #[serde(default = "default_ommers_hash")]
    pub ommers_hash: H256,
    pub coinbase: Address,
    #[serde(default)]
    pub state_root: H256,
    #[serde(default)]
    pub transactions_root: H256,
    #[serde(default)]
    pub receipts_root: H256,
    #[serde(default)]
    pub logs_bloom: Bloom,
    #[serde(default)]
    pub difficulty: U256,
    #[serde(with = "crate::serde_utils::u64::hex_str")]
    pub number: u64,
    #[serde(with = "crate::serde_utils::u64::hex_str")]
    pub gas_limit: u64,
    #[serde(default, with = "crate::serde_utils::u64::hex_str")]
    pub gas_used: u64,
    #[serde(default, with = "crate::serde_utils::u64::hex_str")]
    pub timestamp: u64,
    #[serde(default, with = "crate::serde_utils::bytes")]
    pub extra_data: Bytes,
    #[serde(default)]
    pub mix_hash: H256,
    #[serde(default)]
    pub nonce: H64,
}

fn default_ommers_hash() -> H256 {
    DEFAULT_OMMERS_HASH
}

impl Default for BlockHeader {
    fn default() -> Self {
        Self {
            parent_hash: H256::zero(),
            ommers_hash: DEFAULT_OMMERS_HASH,
            coinbase: Address::zero(),
            state_root: H256::zero(),
            transactions_root: H256::zero(),
            receipts_root: H256::zero(),
            logs_bloom: Bloom::zero(),
            difficulty: U256::zero(),
            number: 0,
            gas_limit: 0,
            gas_used: 0,
            timestamp: 0,
            extra_data: Bytes::new(),
            mix_hash: H256::zero(),
            nonce: H64::zero(),
        }
    }
}

impl RLPEncode for BlockHeader {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.parent_hash)
            .encode_field(&self.ommers_hash)
            .encode_field(&self.coinbase)
            .encode_field(&self.state_root)
            .encode_field(&self.transactions_root)
            .encode_field(&self.receipts_root)
            .encode_field(&self.logs_bloom)
            .encode_field(&self.difficulty)
            .encode_field(&self.number)
            .encode_field(&self.gas_limit)
            .encode_field(&self.gas_used)
            .encode_field(&self.timestamp)
            .encode_field(&self.extra_data)
            .encode_field(&self.mix_hash)
            .encode_field(&self.nonce)
            .finish();
    }
}

impl BlockHeader {
    pub fn hash(&self) -> H256 {
        rlp_hash(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBody {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Headers of uncle blocks; only their `number` and `coinbase` affect
    /// execution, through mining rewards.
    #[serde(default)]
    pub ommers: Vec<BlockHeader>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    #[serde(flatten)]
    pub body: BlockBody,
}

impl Block {
    pub fn new(header: BlockHeader, body: BlockBody) -> Self {
        Self { header, body }
    }

    pub fn hash(&self) -> H256 {
        self.header.hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_hash_changes_with_fields() {
        let header = BlockHeader {
            number: 1,
            gas_limit: 5000,
            ..Default::default()
        };
        let mut other = header.clone();
        other.gas_used = 21_000;
        assert_ne!(header.hash(), other.hash());
        assert_eq!(header.hash(), header.clone().hash());
    }

    #[test]
    fn test_block_from_json() {
        let json = r#"{
            "header": {
                "coinbase": "0x2adc25665018aa1fe0e6bc666dac8fc2697ff9ba",
                "number": "0x1",
                "gasLimit": "0x989680",
                "timestamp": "0x3e8"
            },
            "transactions": [],
            "ommers": []
        }"#;
        let block: Block = serde_json::from_str(json).expect("valid block");
        assert_eq!(block.header.number, 1);
        assert_eq!(block.header.gas_limit, 10_000_000);
        assert_eq!(block.header.ommers_hash, DEFAULT_OMMERS_HASH);
        assert!(block.body.transactions.is_empty());
    }
}
