//! # ferrum-evm
//!
//! Interpreter for the Ethereum Virtual Machine covering the Frontier through
//! Byzantium protocol rules.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                           VM                                │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  CallFrame  │  │   Memory    │  │       Stack         │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! │                                                             │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  Substate   │  │ Precompiles │  │ CostSchedule (fork) │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    GeneralizedDatabase                      │
//! │        (journaled account cache over a `Database`)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Components
//!
//! - [`vm::VM`]: interpreter loop, message calls and contract creation
//! - [`call_frame::CallFrame`]: execution context of one call
//! - [`memory::Memory`]: word-aligned, metered frame memory
//! - [`schedule::CostSchedule`]: per-fork gas costs and feature switches
//! - [`precompiles`]: ECRECOVER, SHA256, RIPEMD160 and IDENTITY
//! - [`hooks`]: transaction validation, fee charging and settlement
//! - [`db::gen_db::GeneralizedDatabase`]: snapshot/revert/commit over state
//!
//! ## Usage
//!
//! ```ignore
//! use ferrum_evm::{Environment, vm::{ExecutionMode, VM}};
//!
//! let mut vm = VM::new(env, &mut db, &tx, ExecutionMode::default());
//! let report = vm.execute()?;
//! if report.is_success() {
//!     println!("Gas used: {}", report.gas_used);
//! }
//! ```

pub mod account;
pub mod call_frame;
pub mod constants;
pub mod db;
pub mod environment;
pub mod errors;
pub mod execution_handlers;
pub mod gas_cost;
pub mod hooks;
pub mod memory;
pub mod opcode_handlers;
pub mod opcodes;
pub mod precompiles;
pub mod schedule;
pub mod utils;
pub mod vm;
pub use environment::*;
