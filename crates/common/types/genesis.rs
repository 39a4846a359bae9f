use crate::types::{Account, Code};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pre-state entry for one account, as found in JSON fixtures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    #[serde(default, with = "crate::serde_utils::bytes")]
    pub code: Bytes,
    #[serde(default)]
    pub storage: BTreeMap<U256, U256>,
    #[serde(default)]
    pub balance: U256,
    #[serde(default, with = "crate::serde_utils::u64::hex_str")]
    pub nonce: u64,
}

/// Pre-state keyed by address.
pub type GenesisAlloc = BTreeMap<Address, GenesisAccount>;

impl From<GenesisAccount> for Account {
    fn from(genesis: GenesisAccount) -> Self {
        let storage: FxHashMap<H256, U256> = genesis
            .storage
            .into_iter()
            .filter(|(_, value)| !value.is_zero())
            .map(|(key, value)| (H256(key.to_big_endian()), value))
            .collect();
        Account::new(
            genesis.balance,
            Code::from_bytecode(genesis.code),
            genesis.nonce,
            storage,
        )
    }
}
