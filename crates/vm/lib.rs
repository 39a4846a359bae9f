mod errors;
mod execution_result;

pub mod backends;

pub use backends::{BlockExecutionResult, Evm};
pub use errors::EvmError;
pub use execution_result::ExecutionResult;
pub use ferrum_evm::db::{Database, InMemoryDatabase};
pub use ferrum_evm::vm::ExecutionMode;
