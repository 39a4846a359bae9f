use ethereum_types::U256;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EcdsaError {
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Signature has an s value above secp256k1n/2")]
    HighS,
    #[error("Invalid recovery id {0}")]
    InvalidRecoveryId(u64),
    #[error("Signature v value {0} does not fit in 64 bits")]
    VOutOfRange(U256),
}

#[cfg(feature = "secp256k1")]
impl From<secp256k1::Error> for EcdsaError {
    fn from(err: secp256k1::Error) -> Self {
        EcdsaError::InvalidSignature(err.to_string())
    }
}

impl From<k256::ecdsa::Error> for EcdsaError {
    fn from(err: k256::ecdsa::Error) -> Self {
        EcdsaError::InvalidSignature(err.to_string())
    }
}
