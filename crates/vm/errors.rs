use ferrum_evm::errors::{DatabaseError, VMError};
use thiserror::Error;

/// Reasons a block or transaction cannot be applied.
#[derive(Debug, Error)]
pub enum EvmError {
    /// The transaction itself is invalid: bad signature, nonce or funds.
    #[error("Invalid Transaction: {0}")]
    Transaction(String),
    /// The block disagrees with the result of executing it.
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),
    #[error("DB error: {0}")]
    DB(String),
    #[error("{0}")]
    Custom(String),
}

impl From<VMError> for EvmError {
    fn from(value: VMError) -> Self {
        match value {
            VMError::TxValidation(err) => EvmError::Transaction(err.to_string()),
            VMError::Database(err) => EvmError::DB(err.to_string()),
            other => EvmError::Custom(other.to_string()),
        }
    }
}

impl From<DatabaseError> for EvmError {
    fn from(value: DatabaseError) -> Self {
        EvmError::DB(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrum_evm::errors::{InternalError, TxValidationError};

    #[test]
    fn test_vm_errors_map_to_their_tier() {
        let invalid: EvmError = VMError::TxValidation(TxValidationError::NonceIsMax).into();
        assert!(matches!(invalid, EvmError::Transaction(_)));

        let db: EvmError = VMError::Database(DatabaseError::Custom("gone".into())).into();
        assert!(matches!(db, EvmError::DB(message) if message.contains("gone")));

        let internal: EvmError = VMError::Internal(InternalError::Overflow).into();
        assert!(matches!(internal, EvmError::Custom(_)));
    }
}
