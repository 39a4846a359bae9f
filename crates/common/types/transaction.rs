use crate::{errors::EcdsaError, evm::rlp_hash, utils::keccak};
use bytes::Bytes;
use ethereum_types::{Address, H256, Signature, U256};
use ferrum_rlp::{Encoder, RLPEncode, constants::RLP_NULL};
use hex_literal::hex;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Destination of a transaction: a message call or a contract creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TxKind {
    Call(Address),
    #[default]
    Create,
}

impl RLPEncode for TxKind {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        match self {
            Self::Call(address) => address.encode(buf),
            Self::Create => buf.put_u8(RLP_NULL),
        }
    }
}

impl Serialize for TxKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TxKind::Call(address) => Some(address).serialize(serializer),
            TxKind::Create => None::<Address>.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for TxKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<Address>::deserialize(deserializer)?
            .map(TxKind::Call)
            .unwrap_or(TxKind::Create))
    }
}

/// A signed legacy (pre-typed-envelope) transaction.
///
/// Replay protection follows EIP-155: a `v` of `35 + 2 * chain_id` or
/// `36 + 2 * chain_id` binds the signature to a chain, `27`/`28` does not.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(with = "crate::serde_utils::u64::hex_str")]
    pub nonce: u64,
    pub gas_price: U256,
    #[serde(with = "crate::serde_utils::u64::hex_str")]
    pub gas: u64,
    #[serde(default)]
    pub to: TxKind,
    #[serde(default)]
    pub value: U256,
    #[serde(default, with = "crate::serde_utils::bytes")]
    pub data: Bytes,
    #[serde(default)]
    pub v: U256,
    #[serde(default)]
    pub r: U256,
    #[serde(default)]
    pub s: U256,
    #[serde(skip)]
    pub sender_cache: OnceCell<Address>,
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.nonce == other.nonce
            && self.gas_price == other.gas_price
            && self.gas == other.gas
            && self.to == other.to
            && self.value == other.value
            && self.data == other.data
            && self.v == other.v
            && self.r == other.r
            && self.s == other.s
    }
}

impl Eq for Transaction {}

impl RLPEncode for Transaction {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.nonce)
            .encode_field(&self.gas_price)
            .encode_field(&self.gas)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_field(&self.data)
            .encode_field(&self.v)
            .encode_field(&self.r)
            .encode_field(&self.s)
            .finish();
    }
}

impl Transaction {
    pub fn gas_limit(&self) -> u64 {
        self.gas
    }

    pub fn gas_price(&self) -> U256 {
        self.gas_price
    }

    pub fn to(&self) -> TxKind {
        self.to
    }

    pub fn value(&self) -> U256 {
        self.value
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn is_contract_creation(&self) -> bool {
        matches!(self.to, TxKind::Create)
    }

    pub fn hash(&self) -> H256 {
        rlp_hash(self)
    }

    /// Chain id bound by an EIP-155 signature, `None` for unprotected ones.
    pub fn chain_id(&self) -> Option<u64> {
        derive_legacy_chain_id(self.v)
    }

    /// The payload whose keccak hash is signed: the first six fields, plus
    /// `(chain_id, 0, 0)` for replay-protected transactions.
    pub fn signing_payload(&self, chain_id: Option<u64>) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = Encoder::new(&mut buf)
            .encode_field(&self.nonce)
            .encode_field(&self.gas_price)
            .encode_field(&self.gas)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_field(&self.data);
        match chain_id {
            Some(chain_id) => encoder
                .encode_field(&chain_id)
                .encode_field(&0u8)
                .encode_field(&0u8)
                .finish(),
            None => encoder.finish(),
        }
        buf
    }

    /// Recovers (and caches) the address that signed this transaction.
    pub fn sender(&self) -> Result<Address, EcdsaError> {
        self.sender_cache
            .get_or_try_init(|| self.compute_sender())
            .copied()
    }

    /// Like [`Transaction::sender`], additionally rejecting signatures whose
    /// `s` lies in the upper half of the curve order (EIP-2) when asked to.
    pub fn sender_checked(&self, reject_high_s: bool) -> Result<Address, EcdsaError> {
        if reject_high_s && self.has_high_s() {
            return Err(EcdsaError::HighS);
        }
        self.sender()
    }

    pub fn has_high_s(&self) -> bool {
        self.s.to_big_endian() > SECP256K1_N_HALF
    }

    fn compute_sender(&self) -> Result<Address, EcdsaError> {
        let chain_id = self.chain_id();
        let parity_base = match chain_id {
            Some(chain_id) => chain_id.saturating_mul(2).saturating_add(35),
            None => 27,
        };
        let v = u64::try_from(self.v).map_err(|_| EcdsaError::VOutOfRange(self.v))?;
        let y_parity = match v.checked_sub(parity_base) {
            Some(parity @ (0 | 1)) => parity,
            _ => return Err(EcdsaError::InvalidRecoveryId(v)),
        };

        let mut sig = [0u8; 65];
        sig[..32].copy_from_slice(&self.r.to_big_endian());
        sig[32..64].copy_from_slice(&self.s.to_big_endian());
        sig[64] = u8::try_from(y_parity).map_err(|_| EcdsaError::InvalidRecoveryId(v))?;

        let payload = keccak(self.signing_payload(chain_id));
        recover_address(Signature::from_slice(&sig), payload)
    }

    /// Signs the transaction in place, EIP-155 protected when `chain_id` is set.
    #[cfg(feature = "secp256k1")]
    pub fn sign_inplace(&mut self, secret_key: &secp256k1::SecretKey, chain_id: Option<u64>) {
        let payload = keccak(self.signing_payload(chain_id));
        let message = secp256k1::Message::from_digest(payload.to_fixed_bytes());
        let (recovery_id, signature) = secp256k1::SECP256K1
            .sign_ecdsa_recoverable(&message, secret_key)
            .serialize_compact();
        let parity = u64::from(i32::from(recovery_id) == 1);
        self.r = U256::from_big_endian(&signature[..32]);
        self.s = U256::from_big_endian(&signature[32..]);
        self.v = match chain_id {
            Some(chain_id) => U256::from(chain_id.saturating_mul(2).saturating_add(35 + parity)),
            None => U256::from(27 + parity),
        };
        self.sender_cache = OnceCell::new();
    }
}

fn derive_legacy_chain_id(v: U256) -> Option<u64> {
    let v = u64::try_from(v).ok()?;
    if v >= 35 {
        Some((v - 35) / 2)
    } else {
        None
    }
}

// Half the secp256k1 curve order (n/2), i.e. the upper bound for a valid `s` value per EIP-2.
const SECP256K1_N_HALF: [u8; 32] =
    hex!("7fffffffffffffffffffffffffffffff5d576e7357a4501ddfe92f46681b20a0");


#[cfg(feature = "secp256k1")]
pub fn recover_address(signature: Signature, payload: H256) -> Result<Address, EcdsaError> {
    let signature_bytes = signature.to_fixed_bytes();
    let recovery_id = secp256k1::ecdsa::RecoveryId::try_from(i32::from(signature_bytes[64]))?;
    let signature =
        secp256k1::ecdsa::RecoverableSignature::from_compact(&signature_bytes[..64], recovery_id)?;
    let public = secp256k1::SECP256K1.recover_ecdsa(
        &secp256k1::Message::from_digest(payload.to_fixed_bytes()),
        &signature,
    )?;
    let hash = keccak(&public.serialize_uncompressed()[1..]);
    Ok(Address::from_slice(&hash[12..]))
}

#[cfg(not(feature = "secp256k1"))]
pub fn recover_address(signature: Signature, payload: H256) -> Result<Address, EcdsaError> {
    let signature_bytes = signature.to_fixed_bytes();
    let signature = k256::ecdsa::Signature::from_slice(&signature_bytes[..64])?;
    let recovery_id = k256::ecdsa::RecoveryId::from_byte(signature_bytes[64])
        .ok_or(EcdsaError::InvalidRecoveryId(u64::from(signature_bytes[64])))?;
    // k256 only verifies low-s signatures; (r, n - s) with the flipped parity recovers the same key
    let (signature, recovery_id) = match signature.normalize_s() {
        Some(normalized) => (
            normalized,
            k256::ecdsa::RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
        ),
        None => (signature, recovery_id),
    };
    let public =
        k256::ecdsa::VerifyingKey::recover_from_prehash(payload.as_bytes(), &signature, recovery_id)?;
    let uncompressed = public.to_encoded_point(false);
    let hash = keccak(&uncompressed.as_bytes()[1..]);
    Ok(Address::from_slice(&hash[12..]))
}
