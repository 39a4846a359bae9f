use crate::errors::DatabaseError;
use ferrum_common::{
    Address, H256, U256,
    types::{AccountInfo, AccountUpdate, ChainConfig, Code},
};

pub mod gen_db;
pub mod in_memory;

pub use in_memory::InMemoryDatabase;

/// Read access to the world state the VM executes on top of.
///
/// Writes never go through this trait: the VM accumulates them in a
/// [`gen_db::GeneralizedDatabase`] and hands them back as [`AccountUpdate`]s.
pub trait Database: Send + Sync {
    /// Info of `address`; accounts that do not exist read as the default (empty) info.
    fn get_account_info(&self, address: Address) -> Result<AccountInfo, DatabaseError>;
    fn account_exists(&self, address: Address) -> Result<bool, DatabaseError>;
    fn get_storage_value(&self, address: Address, key: H256) -> Result<U256, DatabaseError>;
    fn get_block_hash(&self, block_number: u64) -> Result<H256, DatabaseError>;
    fn get_chain_config(&self) -> Result<ChainConfig, DatabaseError>;
    fn get_account_code(&self, code_hash: H256) -> Result<Code, DatabaseError>;
    /// State commitment of the store with `updates` applied on top, without persisting them.
    fn state_root(&self, updates: &[AccountUpdate]) -> Result<H256, DatabaseError>;
}
