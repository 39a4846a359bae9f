use bytes::Bytes;
use ethereum_types::{Address, Bloom, BloomInput, H256};
use ferrum_rlp::{Encoder, RLPEncode};
use serde::{Deserialize, Serialize};

/// A log entry emitted by `LOG0`..`LOG4`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    #[serde(with = "crate::serde_utils::bytes")]
    pub data: Bytes,
}

impl RLPEncode for Log {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.address)
            .encode_field(&self.topics)
            .encode_field(&self.data)
            .finish();
    }
}

/// First receipt field: the intermediate state root before Byzantium, a
/// success flag from Byzantium on (EIP-658).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReceiptOutcome {
    PostState(H256),
    Status(bool),
}

impl RLPEncode for ReceiptOutcome {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        match self {
            ReceiptOutcome::PostState(root) => root.encode(buf),
            ReceiptOutcome::Status(succeeded) => succeeded.encode(buf),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub outcome: ReceiptOutcome,
    #[serde(with = "crate::serde_utils::u64::hex_str")]
    pub cumulative_gas_used: u64,
    pub bloom: Bloom,
    pub logs: Vec<Log>,
}

impl Receipt {
    pub fn new(outcome: ReceiptOutcome, cumulative_gas_used: u64, logs: Vec<Log>) -> Self {
        Self {
            outcome,
            cumulative_gas_used,
            bloom: bloom_from_logs(&logs),
            logs,
        }
    }

    pub fn succeeded(&self) -> Option<bool> {
        match self.outcome {
            ReceiptOutcome::Status(succeeded) => Some(succeeded),
            ReceiptOutcome::PostState(_) => None,
        }
    }
}

impl RLPEncode for Receipt {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.outcome)
            .encode_field(&self.cumulative_gas_used)
            .encode_field(&self.bloom)
            .encode_field(&self.logs)
            .finish();
    }
}

/// Accrues every log's address and topics into a 2048-bit bloom filter.
pub fn bloom_from_logs(logs: &[Log]) -> Bloom {
    let mut bloom = Bloom::zero();
    for log in logs {
        bloom.accrue(BloomInput::Raw(log.address.as_ref()));
        for topic in &log.topics {
            bloom.accrue(BloomInput::Raw(topic.as_ref()));
        }
    }
    bloom
}
