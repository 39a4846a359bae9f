use bytes::Bytes;
use ferrum_common::{Address, types::Log};
use serde::{Deserialize, Serialize};

/// Errors that halt execution of a frame, a transaction, or the whole VM.
///
/// Only `ExceptionalHalt` and `RevertOpcode` are confined to the current
/// call frame. The rest are propagated out of the VM with `?`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum VMError {
    /// Errors that break execution, they shouldn't ever happen. Contains subcategory `InternalError`.
    #[error("Internal Error: {0}")]
    Internal(#[from] InternalError),
    /// Returned when a transaction is invalid and should be rejected before execution.
    #[error("Transaction validation error: {0}")]
    TxValidation(#[from] TxValidationError),
    /// Errors contemplated by the EVM, they revert and consume all gas of the current context.
    #[error("Exceptional Halt: {0}")]
    ExceptionalHalt(#[from] ExceptionalHalt),
    /// Revert Opcode called. It behaves like an exception, except it doesn't consume all gas left.
    #[error("Revert Opcode")]
    RevertOpcode,
    /// Errors coming from the backing store.
    #[error("Database Error: {0}")]
    Database(#[from] DatabaseError),
}

impl VMError {
    /// These errors are unexpected and indicate critical issues.
    /// They should not cause a transaction to revert silently but instead fail loudly, propagating the error.
    pub fn should_propagate(&self) -> bool {
        matches!(self, VMError::Internal(_) | VMError::Database(_))
    }

    pub fn is_revert_opcode(&self) -> bool {
        matches!(self, VMError::RevertOpcode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ExceptionalHalt {
    #[error("Stack Underflow")]
    StackUnderflow,
    #[error("Stack Overflow")]
    StackOverflow,
    #[error("Invalid Jump")]
    InvalidJump,
    #[error("Opcode Not Allowed In Static Context")]
    OpcodeNotAllowedInStaticContext,
    #[error("Invalid Opcode")]
    InvalidOpcode,
    #[error("Very Large Number")]
    VeryLargeNumber,
    #[error("Out Of Bounds")]
    OutOfBounds,
    #[error("Out Of Gas")]
    OutOfGas,
    #[error("Address Already Occupied")]
    AddressCollision,
    #[error("Contract Output Too Big")]
    ContractSizeLimit,
    #[error("Max call depth exceeded")]
    CallDepthExceeded,
    #[error("Insufficient balance for value transfer")]
    InsufficientBalance,
    #[error("Creator nonce is max")]
    NonceOverflow,
    #[error("Precompile execution error: {0}")]
    Precompile(#[from] PrecompileError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum PrecompileError {
    #[error("Not enough gas for precompile")]
    NotEnoughGas,
    #[error("Invalid signature")]
    InvalidSignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum TxValidationError {
    #[error("Sender account {0:#x} has insufficient funds for gas * price + value")]
    InsufficientAccountFunds(Address),
    #[error("Nonce mismatch: expected {expected}, got {actual}")]
    NonceMismatch { expected: u64, actual: u64 },
    #[error("Intrinsic gas {intrinsic} exceeds gas limit {gas_limit}")]
    IntrinsicGasTooLow { intrinsic: u64, gas_limit: u64 },
    #[error("Nonce is max (overflow)")]
    NonceIsMax,
    #[error("Gas limit price product overflow")]
    GasLimitPriceProductOverflow,
    #[error("Invalid chain id: {0}")]
    InvalidChainId(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum InternalError {
    #[error("Arithmetic operation overflowed")]
    Overflow,
    #[error("Arithmetic operation underflowed")]
    Underflow,
    #[error("Tried to slice non-existing data")]
    Slicing,
    #[error("Type conversion failed")]
    TypeConversion,
    #[error("Call frame not found")]
    CallFrame,
    #[error("Account should have been cached")]
    AccountNotFound,
    #[error("{0}")]
    Custom(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum DatabaseError {
    #[error("{0}")]
    Custom(String),
}

/// Outcome of a single opcode handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeResult {
    Continue,
    Halt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxResult {
    Success,
    Revert(VMError),
}

impl TxResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TxResult::Success)
    }
}

/// Result of running one message call or contract creation to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextResult {
    pub result: TxResult,
    /// Gas consumed by the message, out of the gas it was given.
    pub gas_used: u64,
    pub output: Bytes,
    /// Address of the deployed contract, only set for successful creations.
    pub created_address: Option<Address>,
}

impl ContextResult {
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }

    /// A failure that happened before any frame ran: nothing consumed, no output.
    pub fn early_failure(error: ExceptionalHalt) -> Self {
        Self {
            result: TxResult::Revert(error.into()),
            gas_used: 0,
            output: Bytes::new(),
            created_address: None,
        }
    }
}

/// What a whole transaction produced, after fees and refunds were settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub result: TxResult,
    /// Gas charged to the sender: intrinsic plus execution gas, minus the refund.
    pub gas_used: u64,
    pub gas_refunded: u64,
    pub output: Bytes,
    /// Logs of a successful transaction, empty when it failed.
    pub logs: Vec<Log>,
    pub created_address: Option<Address>,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}
