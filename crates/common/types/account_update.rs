use super::{AccountInfo, Code};
use ethereum_types::{Address, H256, U256};
use rustc_hash::FxHashMap;

/// The net effect of executing one or more transactions on a single account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountUpdate {
    pub address: Address,
    /// The previous account (storage included) is wiped before `info`, `code`
    /// and `added_storage` are applied. Set by self-destruct and EIP-161 clearing.
    pub removed: bool,
    pub info: Option<AccountInfo>,
    pub code: Option<Code>,
    pub added_storage: FxHashMap<H256, U256>,
}

impl AccountUpdate {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    pub fn removed(address: Address) -> Self {
        Self {
            address,
            removed: true,
            ..Default::default()
        }
    }

    /// Layers `other` (a later update to the same account) on top of `self`.
    pub fn merge(&mut self, other: AccountUpdate) {
        if other.removed {
            self.added_storage.clear();
            self.info = None;
            self.code = None;
            self.removed = true;
        }
        if other.info.is_some() {
            self.info = other.info;
        }
        if other.code.is_some() {
            self.code = other.code;
        }
        self.added_storage.extend(other.added_storage);
    }
}
