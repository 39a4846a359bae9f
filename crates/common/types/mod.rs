mod account;
mod account_update;
mod block;
mod fork;
mod genesis;
mod receipt;
mod transaction;

pub use account::*;
pub use account_update::*;
pub use block::*;
pub use fork::*;
pub use genesis::*;
pub use receipt::*;
pub use transaction::*;
