use super::Database;
use crate::errors::DatabaseError;
use ferrum_common::{
    Address, H256, U256,
    types::{Account, AccountInfo, AccountUpdate, ChainConfig, Code, GenesisAlloc},
    utils::keccak,
};
use ferrum_rlp::Encoder;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// A world state held entirely in memory.
///
/// The state root it reports is a keccak commitment over the RLP of every
/// account, sorted by address, with storage committed the same way. It is
/// deterministic and changes with any account field, but it is not the
/// Merkle-Patricia trie root mainnet headers carry.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDatabase {
    accounts: BTreeMap<Address, Account>,
    codes: FxHashMap<H256, Code>,
    block_hashes: FxHashMap<u64, H256>,
    chain_config: ChainConfig,
}

impl InMemoryDatabase {
    pub fn new(chain_config: ChainConfig) -> Self {
        Self {
            chain_config,
            ..Default::default()
        }
    }

    pub fn from_genesis(chain_config: ChainConfig, alloc: GenesisAlloc) -> Self {
        let mut db = Self::new(chain_config);
        for (address, genesis) in alloc {
            db.add_account(address, Account::from(genesis));
        }
        db
    }

    pub fn add_account(&mut self, address: Address, account: Account) {
        self.codes.insert(account.code.hash, account.code.clone());
        self.accounts.insert(address, account);
    }

    pub fn add_block_hash(&mut self, block_number: u64, hash: H256) {
        self.block_hashes.insert(block_number, hash);
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Account)> {
        self.accounts.iter()
    }

    pub fn chain_config(&self) -> &ChainConfig {
        &self.chain_config
    }

    /// Persists `updates`, as produced by the VM, into the store.
    pub fn apply_account_updates(&mut self, updates: &[AccountUpdate]) {
        for update in updates {
            if let Some(code) = &update.code {
                self.codes.insert(code.hash, code.clone());
            }
            apply_update(&mut self.accounts, update);
        }
    }

    fn commitment(accounts: &BTreeMap<Address, Account>) -> H256 {
        let mut encoded = Vec::new();
        let mut encoder = Encoder::new(&mut encoded);
        for (address, account) in accounts {
            let mut leaf = Vec::new();
            Encoder::new(&mut leaf)
                .encode_field(address)
                .encode_field(&account.info.nonce)
                .encode_field(&account.info.balance)
                .encode_field(&storage_commitment(&account.storage))
                .encode_field(&account.info.code_hash)
                .finish();
            encoder = encoder.encode_raw(&leaf);
        }
        encoder.finish();
        keccak(encoded)
    }
}

fn storage_commitment(storage: &FxHashMap<H256, U256>) -> H256 {
    let sorted: BTreeMap<&H256, &U256> = storage.iter().collect();
    let mut encoded = Vec::new();
    let mut encoder = Encoder::new(&mut encoded);
    for (key, value) in sorted {
        let mut slot = Vec::new();
        Encoder::new(&mut slot)
            .encode_field(key)
            .encode_field(value)
            .finish();
        encoder = encoder.encode_raw(&slot);
    }
    encoder.finish();
    keccak(encoded)
}

fn apply_update(accounts: &mut BTreeMap<Address, Account>, update: &AccountUpdate) {
    if update.removed {
        accounts.remove(&update.address);
        if update.info.is_none() {
            return;
        }
    }
    let account = accounts.entry(update.address).or_default();
    if let Some(info) = &update.info {
        account.info = info.clone();
    }
    if let Some(code) = &update.code {
        account.code = code.clone();
        account.info.code_hash = code.hash;
    }
    for (key, value) in &update.added_storage {
        if value.is_zero() {
            account.storage.remove(key);
        } else {
            account.storage.insert(*key, *value);
        }
    }
}

impl Database for InMemoryDatabase {
    fn get_account_info(&self, address: Address) -> Result<AccountInfo, DatabaseError> {
        Ok(self
            .accounts
            .get(&address)
            .map(|account| account.info.clone())
            .unwrap_or_default())
    }

    fn account_exists(&self, address: Address) -> Result<bool, DatabaseError> {
        Ok(self.accounts.contains_key(&address))
    }

    fn get_storage_value(&self, address: Address, key: H256) -> Result<U256, DatabaseError> {
        Ok(self
            .accounts
            .get(&address)
            .and_then(|account| account.storage.get(&key))
            .copied()
            .unwrap_or_default())
    }

    fn get_block_hash(&self, block_number: u64) -> Result<H256, DatabaseError> {
        Ok(self
            .block_hashes
            .get(&block_number)
            .copied()
            .unwrap_or_default())
    }

    fn get_chain_config(&self) -> Result<ChainConfig, DatabaseError> {
        Ok(self.chain_config.clone())
    }

    fn get_account_code(&self, code_hash: H256) -> Result<Code, DatabaseError> {
        self.codes
            .get(&code_hash)
            .cloned()
            .ok_or_else(|| DatabaseError::Custom(format!("missing code {code_hash:#x}")))
    }

    fn state_root(&self, updates: &[AccountUpdate]) -> Result<H256, DatabaseError> {
        if updates.is_empty() {
            return Ok(Self::commitment(&self.accounts));
        }
        let mut accounts = self.accounts.clone();
        for update in updates {
            apply_update(&mut accounts, update);
        }
        Ok(Self::commitment(&accounts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    const ADDRESS: Address = Address::repeat_byte(0x42);

    #[test]
    fn test_state_root_follows_updates() {
        let mut db = InMemoryDatabase::default();
        let empty_root = db.state_root(&[]).expect("root");

        let mut update = AccountUpdate::new(ADDRESS);
        update.info = Some(AccountInfo {
            balance: U256::from(1),
            ..Default::default()
        });
        let pending_root = db.state_root(&[update.clone()]).expect("root");
        assert_ne!(pending_root, empty_root);
        // computing a pending root does not persist anything
        assert_eq!(db.state_root(&[]).expect("root"), empty_root);

        db.apply_account_updates(&[update]);
        assert_eq!(db.state_root(&[]).expect("root"), pending_root);
    }

    #[test]
    fn test_zero_storage_deletes_slot() {
        let mut db = InMemoryDatabase::default();
        let mut update = AccountUpdate::new(ADDRESS);
        update.info = Some(AccountInfo::default());
        update.added_storage.insert(H256::zero(), U256::from(9));
        db.apply_account_updates(&[update]);
        assert_eq!(db.get_storage_value(ADDRESS, H256::zero()).expect("load"), U256::from(9));

        let mut clear = AccountUpdate::new(ADDRESS);
        clear.added_storage.insert(H256::zero(), U256::zero());
        db.apply_account_updates(&[clear]);
        let account = db.account(&ADDRESS).expect("account");
        assert!(account.storage.is_empty());
    }

    #[test]
    fn test_removed_account_and_code() {
        let mut db = InMemoryDatabase::default();
        let code = Code::from_bytecode(Bytes::from_static(&[0x00]));
        let mut update = AccountUpdate::new(ADDRESS);
        update.info = Some(AccountInfo::default());
        update.code = Some(code.clone());
        db.apply_account_updates(&[update]);
        assert_eq!(db.get_account_code(code.hash).expect("code"), code);
        assert!(db.account_exists(ADDRESS).expect("exists"));

        db.apply_account_updates(&[AccountUpdate::removed(ADDRESS)]);
        assert!(!db.account_exists(ADDRESS).expect("exists"));
    }
}
