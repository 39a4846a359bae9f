use super::Database;
use crate::{
    account::CachedAccount,
    errors::{InternalError, VMError},
};
use ferrum_common::{
    Address, H256, U256,
    constants::EMPTY_KECCACK_HASH,
    types::{AccountInfo, AccountUpdate, ChainConfig, Code},
};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Position in the state journal. Reverting to it undoes every change made after it was taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Snapshot(usize);

/// One undoable state change, holding what was there before.
#[derive(Debug, Clone, PartialEq, Eq)]
enum JournalEntry {
    InfoChanged {
        address: Address,
        previous: AccountInfo,
        previous_exists: bool,
    },
    StorageChanged {
        address: Address,
        key: H256,
        previous: U256,
    },
    AccountDestroyed {
        address: Address,
        previous: Box<CachedAccount>,
    },
}

/// Journaled account cache layered over a [`Database`].
///
/// Accounts are loaded lazily on first access and every later mutation goes
/// through a method that records the previous value in the journal, so any
/// nested scope can be rolled back with [`GeneralizedDatabase::revert`].
/// The state at load time is kept aside to compute the net
/// [`AccountUpdate`]s once execution is over.
pub struct GeneralizedDatabase {
    pub store: Arc<dyn Database>,
    pub initial_accounts_state: FxHashMap<Address, CachedAccount>,
    pub current_accounts_state: FxHashMap<Address, CachedAccount>,
    pub codes: FxHashMap<H256, Code>,
    journal: Vec<JournalEntry>,
}

impl GeneralizedDatabase {
    pub fn new(store: Arc<dyn Database>) -> Self {
        Self {
            store,
            initial_accounts_state: FxHashMap::default(),
            current_accounts_state: FxHashMap::default(),
            codes: FxHashMap::default(),
            journal: Vec::new(),
        }
    }

    // ================== Journal =====================

    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.journal.len())
    }

    /// Undoes, newest first, every change made since `snapshot` was taken.
    pub fn revert(&mut self, snapshot: Snapshot) -> Result<(), VMError> {
        while self.journal.len() > snapshot.0 {
            let Some(entry) = self.journal.pop() else {
                break;
            };
            match entry {
                JournalEntry::InfoChanged {
                    address,
                    previous,
                    previous_exists,
                } => {
                    let account = self.cached_mut(address)?;
                    account.info = previous;
                    account.exists = previous_exists;
                }
                JournalEntry::StorageChanged {
                    address,
                    key,
                    previous,
                } => {
                    self.cached_mut(address)?.storage.insert(key, previous);
                }
                JournalEntry::AccountDestroyed { address, previous } => {
                    self.current_accounts_state.insert(address, *previous);
                }
            }
        }
        Ok(())
    }

    /// Accepts the changes made since `snapshot`.
    ///
    /// Their entries stay in the journal so an enclosing snapshot can still undo them.
    pub fn commit(&mut self, _snapshot: Snapshot) {}

    /// Forgets every journal entry, once a transaction is final.
    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    // ================== Reads =====================

    fn cached_mut(&mut self, address: Address) -> Result<&mut CachedAccount, VMError> {
        self.current_accounts_state
            .get_mut(&address)
            .ok_or(InternalError::AccountNotFound.into())
    }

    /// Brings `address` into the cache if needed.
    fn load_account(&mut self, address: Address) -> Result<&mut CachedAccount, VMError> {
        if !self.current_accounts_state.contains_key(&address) {
            let info = self.store.get_account_info(address)?;
            let exists = self.store.account_exists(address)?;
            let account = CachedAccount::new(info, exists);
            self.initial_accounts_state.insert(address, account.clone());
            self.current_accounts_state.insert(address, account);
        }
        self.cached_mut(address)
    }

    pub fn get_account(&mut self, address: Address) -> Result<&CachedAccount, VMError> {
        Ok(self.load_account(address)?)
    }

    pub fn account_exists(&mut self, address: Address) -> Result<bool, VMError> {
        Ok(self.load_account(address)?.exists)
    }

    pub fn get_code(&mut self, code_hash: H256) -> Result<Code, VMError> {
        if code_hash == EMPTY_KECCACK_HASH {
            return Ok(Code::default());
        }
        if let Some(code) = self.codes.get(&code_hash) {
            return Ok(code.clone());
        }
        let code = self.store.get_account_code(code_hash)?;
        self.codes.insert(code_hash, code.clone());
        Ok(code)
    }

    pub fn get_account_code(&mut self, address: Address) -> Result<Code, VMError> {
        let code_hash = self.load_account(address)?.info.code_hash;
        self.get_code(code_hash)
    }

    pub fn get_storage_value(&mut self, address: Address, key: H256) -> Result<U256, VMError> {
        let account = self.load_account(address)?;
        if let Some(value) = account.storage.get(&key) {
            return Ok(*value);
        }
        if account.storage_cleared {
            return Ok(U256::zero());
        }

        let value = self.store.get_storage_value(address, key)?;
        if let Some(initial) = self.initial_accounts_state.get_mut(&address) {
            initial.storage.entry(key).or_insert(value);
        }
        self.cached_mut(address)?.storage.insert(key, value);
        Ok(value)
    }

    pub fn get_block_hash(&self, block_number: u64) -> Result<H256, VMError> {
        Ok(self.store.get_block_hash(block_number)?)
    }

    pub fn get_chain_config(&self) -> Result<ChainConfig, VMError> {
        Ok(self.store.get_chain_config()?)
    }

    // ================== Writes =====================

    /// Applies `change` to the info of `address`, which from then on exists.
    pub fn update_account_info(
        &mut self,
        address: Address,
        change: impl FnOnce(&mut AccountInfo) -> Result<(), VMError>,
    ) -> Result<(), VMError> {
        let account = self.load_account(address)?;
        let previous = account.info.clone();
        let previous_exists = account.exists;
        change(&mut account.info)?;
        account.exists = true;
        self.journal.push(JournalEntry::InfoChanged {
            address,
            previous,
            previous_exists,
        });
        Ok(())
    }

    pub fn increase_account_balance(&mut self, address: Address, amount: U256) -> Result<(), VMError> {
        self.update_account_info(address, |info| {
            info.balance = info
                .balance
                .checked_add(amount)
                .ok_or(InternalError::Overflow)?;
            Ok(())
        })
    }

    pub fn decrease_account_balance(&mut self, address: Address, amount: U256) -> Result<(), VMError> {
        self.update_account_info(address, |info| {
            info.balance = info
                .balance
                .checked_sub(amount)
                .ok_or(InternalError::Underflow)?;
            Ok(())
        })
    }

    /// Moves `value` from `from` to `to`. The recipient exists afterwards even for a zero value.
    pub fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<(), VMError> {
        self.decrease_account_balance(from, value)?;
        self.increase_account_balance(to, value)
    }

    /// Increments the nonce and returns its previous value.
    pub fn increment_account_nonce(&mut self, address: Address) -> Result<u64, VMError> {
        let mut previous = 0;
        self.update_account_info(address, |info| {
            previous = info.nonce;
            info.nonce = info.nonce.checked_add(1).ok_or(InternalError::Overflow)?;
            Ok(())
        })?;
        Ok(previous)
    }

    pub fn set_account_nonce(&mut self, address: Address, nonce: u64) -> Result<(), VMError> {
        self.update_account_info(address, |info| {
            info.nonce = nonce;
            Ok(())
        })
    }

    pub fn set_account_code(&mut self, address: Address, code: Code) -> Result<(), VMError> {
        let code_hash = code.hash;
        self.codes.insert(code_hash, code);
        self.update_account_info(address, |info| {
            info.code_hash = code_hash;
            Ok(())
        })
    }

    pub fn update_account_storage(
        &mut self,
        address: Address,
        key: H256,
        value: U256,
    ) -> Result<(), VMError> {
        let previous = self.get_storage_value(address, key)?;
        self.cached_mut(address)?.storage.insert(key, value);
        self.journal.push(JournalEntry::StorageChanged {
            address,
            key,
            previous,
        });
        Ok(())
    }

    /// Removes `address` from the state, storage included.
    pub fn destroy_account(&mut self, address: Address) -> Result<(), VMError> {
        self.load_account(address)?;
        let previous = self
            .current_accounts_state
            .insert(address, CachedAccount::destroyed())
            .ok_or(InternalError::AccountNotFound)?;
        self.journal.push(JournalEntry::AccountDestroyed {
            address,
            previous: Box::new(previous),
        });
        Ok(())
    }

    // ================== Results =====================

    /// Net changes of the cached accounts against the state they were loaded with,
    /// sorted by address.
    pub fn get_state_transitions(&self) -> Result<Vec<AccountUpdate>, VMError> {
        let mut updates = Vec::new();
        for (address, current) in &self.current_accounts_state {
            let initial = self
                .initial_accounts_state
                .get(address)
                .ok_or(InternalError::AccountNotFound)?;

            if !current.exists {
                if initial.exists || current.storage_cleared {
                    updates.push(AccountUpdate::removed(*address));
                }
                continue;
            }

            let mut update = AccountUpdate::new(*address);
            update.removed = current.storage_cleared;

            if update.removed || !initial.exists || current.info != initial.info {
                update.info = Some(current.info.clone());
            }
            if current.info.code_hash != initial.info.code_hash || update.removed {
                let code = self
                    .codes
                    .get(&current.info.code_hash)
                    .cloned()
                    .unwrap_or_default();
                update.code = Some(code);
            }
            for (key, value) in &current.storage {
                let changed = if update.removed {
                    !value.is_zero()
                } else {
                    initial.storage.get(key) != Some(value)
                };
                if changed {
                    update.added_storage.insert(*key, *value);
                }
            }

            if update.removed
                || update.info.is_some()
                || update.code.is_some()
                || !update.added_storage.is_empty()
            {
                updates.push(update);
            }
        }
        updates.sort_by_key(|update| update.address);
        Ok(updates)
    }

    /// State commitment with every change made so far applied.
    pub fn state_root(&self) -> Result<H256, VMError> {
        Ok(self.store.state_root(&self.get_state_transitions()?)?)
    }
}
