use crate::{constants::EMPTY_KECCACK_HASH, utils::keccak};
use bytes::Bytes;
use ethereum_types::{H256, U256};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Contract bytecode together with its hash and the set of valid jump destinations.
///
/// Jump destinations are computed once when the code is loaded: a `JUMPDEST`
/// (`0x5b`) byte is a valid target only when it sits at an opcode position, so
/// the scan skips the immediate operand of every `PUSHn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    pub hash: H256,
    pub bytecode: Bytes,
    /// Sorted offsets of every valid `JUMPDEST`.
    pub jump_targets: Vec<u32>,
}

const JUMPDEST: u8 = 0x5b;
const PUSH1: u8 = 0x60;
const PUSH32: u8 = 0x7f;

impl Code {
    pub fn from_bytecode(bytecode: Bytes) -> Self {
        Self {
            hash: keccak(&bytecode),
            jump_targets: Self::compute_jump_targets(&bytecode),
            bytecode,
        }
    }

    fn compute_jump_targets(code: &[u8]) -> Vec<u32> {
        let mut targets = Vec::new();
        let mut pc = 0usize;
        while let Some(&opcode) = code.get(pc) {
            if opcode == JUMPDEST
                && let Ok(position) = u32::try_from(pc)
            {
                targets.push(position);
            }
            let immediate = if (PUSH1..=PUSH32).contains(&opcode) {
                usize::from(opcode.wrapping_sub(PUSH1)).saturating_add(1)
            } else {
                0
            };
            pc = pc.saturating_add(1).saturating_add(immediate);
        }
        targets
    }

    /// Whether `pc` is the position of a `JUMPDEST` opcode (not push data).
    pub fn is_valid_jump_target(&self, pc: usize) -> bool {
        u32::try_from(pc)
            .map(|pc| self.jump_targets.binary_search(&pc).is_ok())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.bytecode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytecode.is_empty()
    }
}

impl Default for Code {
    fn default() -> Self {
        Self {
            hash: EMPTY_KECCACK_HASH,
            bytecode: Bytes::new(),
            jump_targets: Vec::new(),
        }
    }
}

impl AsRef<[u8]> for Code {
    fn as_ref(&self) -> &[u8] {
        &self.bytecode
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub code_hash: H256,
    pub balance: U256,
    pub nonce: u64,
}

impl Default for AccountInfo {
    fn default() -> Self {
        Self {
            code_hash: EMPTY_KECCACK_HASH,
            balance: U256::zero(),
            nonce: 0,
        }
    }
}

impl AccountInfo {
    /// Empty in the EIP-161 sense: no code, zero nonce and zero balance.
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.nonce == 0 && self.code_hash == EMPTY_KECCACK_HASH
    }

    pub fn has_code(&self) -> bool {
        self.code_hash != EMPTY_KECCACK_HASH
    }
}

/// A fully materialized account, as held by a state store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub info: AccountInfo,
    pub code: Code,
    pub storage: FxHashMap<H256, U256>,
}

impl Account {
    pub fn new(balance: U256, code: Code, nonce: u64, storage: FxHashMap<H256, U256>) -> Self {
        Self {
            info: AccountInfo {
                code_hash: code.hash,
                balance,
                nonce,
            },
            code,
            storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jumpdest_after_push_immediate_is_valid() {
        let code = Code::from_bytecode(Bytes::from_static(&[0x60, 0x01, 0x5b]));
        assert!(!code.is_valid_jump_target(0));
        assert!(!code.is_valid_jump_target(1));
        assert!(code.is_valid_jump_target(2));
        assert!(!code.is_valid_jump_target(3));
    }

    #[test]
    fn test_jumpdest_inside_push_data_is_invalid() {
        let code = Code::from_bytecode(Bytes::from_static(&[0x60, 0x5b]));
        assert!(code.jump_targets.is_empty());

        // PUSH32 swallows the next 32 bytes, including any 0x5b.
        let mut raw = vec![0x7f];
        raw.extend_from_slice(&[0x5b; 32]);
        raw.push(0x5b);
        let code = Code::from_bytecode(Bytes::from(raw));
        assert_eq!(code.jump_targets, vec![33]);
    }

    #[test]
    fn test_truncated_push_at_end_of_code() {
        let code = Code::from_bytecode(Bytes::from_static(&[0x5b, 0x61, 0x5b]));
        assert_eq!(code.jump_targets, vec![0]);
    }

    #[test]
    fn test_empty_account_info() {
        let mut info = AccountInfo::default();
        assert!(info.is_empty());
        info.nonce = 1;
        assert!(!info.is_empty());
    }
}
