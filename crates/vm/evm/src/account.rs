use ferrum_common::{H256, U256, types::AccountInfo};
use rustc_hash::FxHashMap;

/// An account as cached by the VM while executing.
///
/// Unlike [`AccountInfo`] this keeps track of whether the account is part of
/// the state at all, which pre-Spurious Dragon gas rules and EIP-161 clearing
/// need to tell apart from an existing but empty account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedAccount {
    pub info: AccountInfo,
    /// Storage slots read or written so far.
    pub storage: FxHashMap<H256, U256>,
    pub exists: bool,
    /// Set once the account was destroyed: slots missing from `storage` are
    /// zero instead of being read from the backing store.
    pub storage_cleared: bool,
}

impl CachedAccount {
    pub fn new(info: AccountInfo, exists: bool) -> Self {
        Self {
            info,
            storage: FxHashMap::default(),
            exists,
            storage_cleared: false,
        }
    }

    /// Empty as defined by EIP-161: no code, zero nonce and zero balance.
    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }

    pub fn has_code(&self) -> bool {
        self.info.has_code()
    }

    pub fn has_nonce(&self) -> bool {
        self.info.nonce != 0
    }

    /// Creating a contract at this address must fail.
    pub fn create_would_collide(&self) -> bool {
        self.has_code() || self.has_nonce()
    }

    /// What a destroyed account looks like until something recreates it.
    pub fn destroyed() -> Self {
        Self {
            storage_cleared: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrum_common::constants::EMPTY_KECCACK_HASH;

    #[test]
    fn test_collision_rules() {
        let mut account = CachedAccount::new(AccountInfo::default(), true);
        assert!(account.is_empty());
        assert!(!account.create_would_collide());

        account.info.balance = U256::from(10);
        assert!(!account.create_would_collide());

        account.info.nonce = 1;
        assert!(account.create_would_collide());

        account.info.nonce = 0;
        account.info.code_hash = H256::repeat_byte(1);
        assert_ne!(account.info.code_hash, EMPTY_KECCACK_HASH);
        assert!(account.create_would_collide());
    }

    #[test]
    fn test_destroyed_account_is_empty_and_absent() {
        let account = CachedAccount::destroyed();
        assert!(!account.exists);
        assert!(account.is_empty());
        assert!(account.storage_cleared);
    }
}
