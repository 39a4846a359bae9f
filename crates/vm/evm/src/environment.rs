use ferrum_common::{
    Address, U256,
    types::{BlockHeader, Fork, Transaction},
};
use serde::{Deserialize, Serialize};

/// Protocol rules the VM executes under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EVMConfig {
    pub fork: Fork,
}

impl EVMConfig {
    pub fn new(fork: Fork) -> Self {
        Self { fork }
    }
}

/// Block and transaction context of one execution.
///
/// Built once per transaction by the block driver; opcodes such as ORIGIN,
/// GASPRICE, COINBASE or NUMBER read straight from here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// The sender address of the external transaction.
    pub origin: Address,
    /// Gas limit of the transaction.
    pub gas_limit: u64,
    pub config: EVMConfig,
    pub block_number: u64,
    pub coinbase: Address,
    pub timestamp: u64,
    pub difficulty: U256,
    pub chain_id: u64,
    pub gas_price: U256,
    pub block_gas_limit: u64,
    pub tx_nonce: u64,
}

impl Environment {
    /// Context for executing `tx`, sent by `origin`, inside the block described by `header`.
    pub fn from_transaction(
        header: &BlockHeader,
        tx: &Transaction,
        origin: Address,
        config: EVMConfig,
        chain_id: u64,
    ) -> Self {
        Self {
            origin,
            gas_limit: tx.gas_limit(),
            config,
            block_number: header.number,
            coinbase: header.coinbase,
            timestamp: header.timestamp,
            difficulty: header.difficulty,
            chain_id,
            gas_price: tx.gas_price(),
            block_gas_limit: header.gas_limit,
            tx_nonce: tx.nonce(),
        }
    }
}
