use crate::{
    call_frame::{CallFrame, Stack},
    constants::CALL_DEPTH_LIMIT,
    db::gen_db::{GeneralizedDatabase, Snapshot},
    environment::Environment,
    errors::{
        ContextResult, ExceptionalHalt, ExecutionReport, InternalError, OpcodeResult,
        PrecompileError, TxResult, VMError,
    },
    hooks::hook::{Hook, default_hooks},
    opcodes::OpCodeFn,
    precompiles::Precompile,
    schedule::{CostSchedule, schedule_for},
};
use bytes::Bytes;
use ferrum_common::{
    Address, U256,
    evm::calculate_create_address,
    types::{Code, Log, Transaction, TxKind},
};
use rustc_hash::FxHashSet;
use std::{cell::RefCell, mem, rc::Rc};
use tracing::{debug, trace};

/// Execution substate that tracks changes during transaction execution.
///
/// The substate holds everything that must be discarded when a call fails:
/// - Self-destructed accounts
/// - Created accounts
/// - Touched accounts (candidates for EIP-161 clearing)
/// - Gas refunds
/// - Event logs
///
/// # Backup Mechanism
///
/// The substate supports checkpointing via [`push_backup`] and restoration via
/// [`revert_backup`] or commitment via [`commit_backup`]. Nested calls push a
/// backup when they start and resolve it when they finish.
///
/// Data modifications must be append-only for the backups to work, which is
/// why most fields are private.
///
/// [`push_backup`]: Substate::push_backup
/// [`revert_backup`]: Substate::revert_backup
/// [`commit_backup`]: Substate::commit_backup
#[derive(Debug, Default)]
pub struct Substate {
    /// Parent checkpoint for reverting on failure.
    parent: Option<Box<Self>>,
    /// Accounts marked for self-destruction (deleted at end of transaction).
    selfdestruct_set: FxHashSet<Address>,
    /// Accounts referenced by a message call, a value transfer or a fee payment.
    touched_accounts: FxHashSet<Address>,
    /// Accumulated gas refund (storage clears and self-destructs).
    pub refunded_gas: u64,
    /// Event logs emitted during execution.
    logs: Vec<Log>,
}

/// Iterates an address set across the whole backup chain.
struct ChainIter<'a> {
    parent: Option<&'a Substate>,
    iter: std::collections::hash_set::Iter<'a, Address>,
    select: fn(&Substate) -> &FxHashSet<Address>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a Address;

    fn next(&mut self) -> Option<Self::Item> {
        let next_item = self.iter.next();
        if next_item.is_none()
            && let Some(parent) = self.parent
        {
            self.parent = parent.parent.as_deref();
            self.iter = (self.select)(parent).iter();

            return self.next();
        }

        next_item
    }
}

impl Substate {
    /// Push a checkpoint that can be either reverted or committed. All data up to this point is
    /// still accessible.
    pub fn push_backup(&mut self) {
        let parent = mem::take(self);
        self.refunded_gas = parent.refunded_gas;
        self.parent = Some(Box::new(parent));
    }

    /// Pop and merge with the last backup.
    ///
    /// Does nothing if the substate has no backup.
    pub fn commit_backup(&mut self) {
        if let Some(parent) = self.parent.as_mut() {
            let mut delta = mem::take(parent);
            mem::swap(self, &mut delta);

            self.selfdestruct_set.extend(delta.selfdestruct_set);
            self.touched_accounts.extend(delta.touched_accounts);
            self.refunded_gas = delta.refunded_gas;
            self.logs.extend(delta.logs);
        }
    }

    /// Discard current changes and revert to last backup.
    ///
    /// Does nothing if the substate has no backup.
    pub fn revert_backup(&mut self) {
        if let Some(parent) = self.parent.as_mut() {
            *self = mem::take(parent);
        }
    }

    fn iter_chain(&self, select: fn(&Substate) -> &FxHashSet<Address>) -> ChainIter<'_> {
        ChainIter {
            parent: self.parent.as_deref(),
            iter: select(self).iter(),
            select,
        }
    }

    /// Return an iterator over all selfdestruct addresses.
    pub fn iter_selfdestruct(&self) -> impl Iterator<Item = &Address> {
        self.iter_chain(|substate| &substate.selfdestruct_set)
    }

    /// Return an iterator over all touched addresses. An address touched in
    /// several frames may be yielded more than once.
    pub fn iter_touched(&self) -> impl Iterator<Item = &Address> {
        self.iter_chain(|substate| &substate.touched_accounts)
    }

    /// Mark an address as selfdestructed and return whether is was already marked.
    pub fn add_selfdestruct(&mut self, address: Address) -> bool {
        if self.selfdestruct_set.contains(&address) {
            return true;
        }

        let is_present = self
            .parent
            .as_ref()
            .map(|parent| parent.is_selfdestruct(&address))
            .unwrap_or(false);

        is_present || !self.selfdestruct_set.insert(address)
    }

    /// Return whether an address is already marked as selfdestructed.
    pub fn is_selfdestruct(&self, address: &Address) -> bool {
        self.selfdestruct_set.contains(address)
            || self
                .parent
                .as_ref()
                .map(|parent| parent.is_selfdestruct(address))
                .unwrap_or_default()
    }

    pub fn touch(&mut self, address: Address) {
        self.touched_accounts.insert(address);
    }

    /// Extract all logs in order.
    pub fn extract_logs(&self) -> Vec<Log> {
        fn inner(substrate: &Substate, target: &mut Vec<Log>) {
            if let Some(parent) = substrate.parent.as_deref() {
                inner(parent, target);
            }

            target.extend_from_slice(&substrate.logs);
        }

        let mut logs = Vec::new();
        inner(self, &mut logs);

        logs
    }

    /// Push a log record.
    pub fn add_log(&mut self, log: Log) {
        self.logs.push(log);
    }
}

/// What happens to a frame's remaining gas when it halts exceptionally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// The frame's remaining gas is consumed, as consensus requires.
    #[default]
    BurnGasOnException,
    /// The frame's remaining gas goes back to its caller. Useful for
    /// estimating what a failing call actually spent.
    KeepGasOnException,
}

/// A message call or contract creation run as the outermost frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub sender: Address,
    /// Account whose storage and balance the code acts on. Ignored for creations.
    pub to: Address,
    /// Account whose code runs. Ignored for creations.
    pub code_address: Address,
    pub value: U256,
    /// Calldata, or init code for creations.
    pub data: Bytes,
    pub gas_limit: u64,
    pub is_static: bool,
    pub depth: usize,
    /// Increment the sender nonce before running. Never rolled back.
    pub touch_nonce: bool,
    pub should_transfer_value: bool,
}

impl Message {
    /// The message a transaction sends, with `gas_limit` left for execution.
    pub fn from_transaction(tx: &Transaction, sender: Address, gas_limit: u64) -> Self {
        let to = match tx.to() {
            TxKind::Call(to) => to,
            TxKind::Create => Address::zero(),
        };
        Self {
            sender,
            to,
            code_address: to,
            value: tx.value(),
            data: tx.data().clone(),
            gas_limit,
            is_static: false,
            depth: 0,
            touch_nonce: true,
            should_transfer_value: true,
        }
    }
}

/// The Ferrum EVM execution engine.
///
/// The VM executes Ethereum transactions by processing EVM bytecode. It maintains
/// a call stack, memory, and tracks all state changes during execution.
///
/// # Execution Model
///
/// 1. Transaction is validated and the gas is paid up front (hooks)
/// 2. Initial call frame is created with transaction data
/// 3. Opcodes are executed sequentially until completion or error
/// 4. State changes are committed or reverted based on success
/// 5. Unused gas is refunded and the miner is paid (hooks)
///
/// # Call Stack
///
/// Nested calls (CALL, DELEGATECALL, etc.) push new frames onto `call_frames`.
/// Each frame has its own memory, stack, and execution context. The `current_call_frame`
/// is always the active frame being executed.
///
/// # Forks
///
/// The fork in `env.config` fixes both the opcode table and the
/// [`CostSchedule`] for the lifetime of the VM.
///
/// # Example
///
/// ```ignore
/// let mut vm = VM::new(env, &mut db, &tx, ExecutionMode::default());
/// let report = vm.execute()?;
/// if report.is_success() {
///     println!("Gas used: {}, Output: {:?}", report.gas_used, report.output);
/// } else {
///     println!("Transaction reverted");
/// }
/// ```
pub struct VM<'a> {
    /// Stack of parent call frames (for nested calls).
    pub call_frames: Vec<CallFrame>,
    /// The currently executing call frame.
    pub current_call_frame: CallFrame,
    /// Block and transaction environment.
    pub env: Environment,
    /// Execution substate (logs, refunds, self-destructs, touched accounts).
    pub substate: Substate,
    /// Database for reading/writing account state.
    pub db: &'a mut GeneralizedDatabase,
    /// The transaction being executed.
    pub tx: Transaction,
    /// Transaction validation and settlement.
    pub hooks: Vec<Rc<RefCell<dyn Hook>>>,
    /// Gas costs and protocol switches of the fork being executed.
    pub schedule: &'static dyn CostSchedule,
    pub mode: ExecutionMode,
    /// Intrinsic gas of the transaction, set while preparing execution.
    pub intrinsic_gas: u64,
    /// Pool of reusable stacks to reduce allocations.
    pub stack_pool: Vec<Stack>,
    /// Opcode dispatch table, built per fork.
    pub(crate) opcode_table: [OpCodeFn<'a>; 256],
}

impl<'a> VM<'a> {
    pub fn new(
        env: Environment,
        db: &'a mut GeneralizedDatabase,
        tx: &Transaction,
        mode: ExecutionMode,
    ) -> Self {
        let fork = env.config.fork;
        Self {
            call_frames: Vec::new(),
            current_call_frame: CallFrame::default(),
            env,
            substate: Substate::default(),
            db,
            tx: tx.clone(),
            hooks: default_hooks(),
            schedule: schedule_for(fork),
            mode,
            intrinsic_gas: 0,
            stack_pool: Vec::new(),
            opcode_table: VM::build_opcode_table(fork),
        }
    }

    /// Executes the whole transaction: validation and up-front payment,
    /// the message call or creation, then refunds and fees.
    ///
    /// A transaction that fails validation leaves the state untouched and is
    /// returned as a [`VMError::TxValidation`] error.
    pub fn execute(&mut self) -> Result<ExecutionReport, VMError> {
        debug!(
            sender = ?self.env.origin,
            nonce = self.tx.nonce(),
            gas_limit = self.env.gas_limit,
            create = self.tx.is_contract_creation(),
            "Executing transaction"
        );

        let snapshot = self.db.snapshot();
        if let Err(error) = self.prepare_execution() {
            self.db.revert(snapshot)?;
            return Err(error);
        }

        let gas_limit = self
            .env
            .gas_limit
            .checked_sub(self.intrinsic_gas)
            .ok_or(InternalError::Underflow)?;
        let message = Message::from_transaction(&self.tx, self.env.origin, gas_limit);

        let ctx_result = if self.tx.is_contract_creation() {
            self.create_contract(message)?
        } else {
            self.call_message(message)?
        };

        let report = self.finalize_execution(ctx_result)?;
        debug!(
            success = report.is_success(),
            gas_used = report.gas_used,
            gas_refunded = report.gas_refunded,
            "Transaction executed"
        );
        Ok(report)
    }

    fn prepare_execution(&mut self) -> Result<(), VMError> {
        for hook in self.hooks.clone() {
            hook.borrow_mut().prepare_execution(self)?;
        }

        Ok(())
    }

    fn finalize_execution(
        &mut self,
        mut ctx_result: ContextResult,
    ) -> Result<ExecutionReport, VMError> {
        for hook in self.hooks.clone() {
            hook.borrow_mut()
                .finalize_execution(self, &mut ctx_result)?;
        }

        // Failed transactions emit no logs.
        let logs = if ctx_result.is_success() {
            self.substate.extract_logs()
        } else {
            Vec::new()
        };

        let report = ExecutionReport {
            result: ctx_result.result.clone(),
            gas_used: ctx_result.gas_used,
            gas_refunded: self.substate.refunded_gas,
            output: mem::take(&mut ctx_result.output),
            logs,
            created_address: ctx_result.created_address,
        };

        Ok(report)
    }

    /// Runs `message` as the outermost frame and returns its outcome.
    ///
    /// Frame failures never surface as errors: they are reported through the
    /// result, with every state change since the message started rolled back
    /// except the sender nonce increment.
    pub fn call_message(&mut self, message: Message) -> Result<ContextResult, VMError> {
        let Message {
            sender,
            to,
            code_address,
            value,
            data,
            gas_limit,
            is_static,
            depth,
            touch_nonce,
            should_transfer_value,
        } = message;

        if depth > CALL_DEPTH_LIMIT {
            return Ok(ContextResult::early_failure(
                ExceptionalHalt::CallDepthExceeded,
            ));
        }
        if should_transfer_value && self.db.get_account(sender)?.info.balance < value {
            return Ok(ContextResult::early_failure(
                ExceptionalHalt::InsufficientBalance,
            ));
        }

        if touch_nonce {
            self.db.increment_account_nonce(sender)?;
        }

        let snapshot = self.db.snapshot();
        self.substate.push_backup();
        self.substate.touch(to);
        if should_transfer_value {
            self.db.transfer(sender, to, value)?;
        }

        trace!(depth, ?to, ?code_address, gas_limit, "Entering message call");

        if let Some(precompile) = self.schedule.find_precompile(&code_address) {
            let ctx_result = self.run_precompile(precompile, &data, gas_limit)?;
            self.handle_state_backup(&ctx_result, snapshot)?;
            return Ok(ctx_result);
        }

        let bytecode = self.db.get_account_code(code_address)?;
        let stack = self.take_stack();
        self.call_frames.clear();
        self.current_call_frame = CallFrame::new(
            sender,
            to,
            code_address,
            bytecode,
            value,
            data,
            is_static,
            gas_limit,
            depth,
            should_transfer_value,
            false,
            0,
            0,
            snapshot,
            stack,
        );

        self.run_execution()
    }

    /// Deploys a contract whose init code is `message.data`, as the
    /// outermost frame.
    ///
    /// On success the result carries the new contract's address.
    pub fn create_contract(&mut self, message: Message) -> Result<ContextResult, VMError> {
        let Message {
            sender,
            value,
            data,
            gas_limit,
            depth,
            ..
        } = message;

        if depth > CALL_DEPTH_LIMIT {
            return Ok(ContextResult::early_failure(
                ExceptionalHalt::CallDepthExceeded,
            ));
        }
        let (sender_balance, sender_nonce) = {
            let account = self.db.get_account(sender)?;
            (account.info.balance, account.info.nonce)
        };
        if sender_balance < value {
            return Ok(ContextResult::early_failure(
                ExceptionalHalt::InsufficientBalance,
            ));
        }
        if sender_nonce == u64::MAX {
            return Ok(ContextResult::early_failure(ExceptionalHalt::NonceOverflow));
        }

        let nonce = self.db.increment_account_nonce(sender)?;
        let new_address = calculate_create_address(sender, nonce);

        let snapshot = self.db.snapshot();
        self.substate.push_backup();

        trace!(depth, ?new_address, gas_limit, "Entering contract creation");

        if self.db.get_account(new_address)?.create_would_collide() {
            let ctx_result = self.failed_context(ExceptionalHalt::AddressCollision, gas_limit, 0);
            self.handle_state_backup(&ctx_result, snapshot)?;
            return Ok(ctx_result);
        }

        self.begin_creation(sender, new_address, value)?;

        let stack = self.take_stack();
        self.call_frames.clear();
        self.current_call_frame = CallFrame::new(
            sender,
            new_address,
            new_address,
            Code::from_bytecode(data),
            value,
            Bytes::new(),
            false,
            gas_limit,
            depth,
            true,
            true,
            0,
            0,
            snapshot,
            stack,
        );

        self.run_execution()
    }

    /// State changes every creation makes once its address is known. They
    /// belong to the new frame and are rolled back with it.
    pub(crate) fn begin_creation(
        &mut self,
        deployer: Address,
        new_address: Address,
        value: U256,
    ) -> Result<(), VMError> {
        self.substate.touch(new_address);
        let initial_nonce = self.schedule.contract_initial_nonce();
        if initial_nonce > 0 {
            self.db.set_account_nonce(new_address, initial_nonce)?;
        }
        self.db.transfer(deployer, new_address, value)
    }

    /// Main execution loop.
    pub fn run_execution(&mut self) -> Result<ContextResult, VMError> {
        self.interpreter_loop(0)
    }

    /// Executes opcodes until the call stack unwinds back to `stop_depth`
    /// parent frames, then returns the result of the frame that finished there.
    fn interpreter_loop(&mut self, stop_depth: usize) -> Result<ContextResult, VMError> {
        loop {
            let opcode = self.current_call_frame.next_opcode();
            self.current_call_frame.advance_pc(1)?;

            // Indexing will not panic as all the opcode values fit within the table.
            #[allow(clippy::indexing_slicing, clippy::as_conversions)]
            let op_result = self.opcode_table[opcode as usize].call(self);

            let result = match op_result {
                Ok(OpcodeResult::Continue) => continue,
                Ok(OpcodeResult::Halt) => self.handle_opcode_result()?,
                Err(error) => self.handle_opcode_error(error)?,
            };

            trace!(
                depth = self.current_call_frame.depth,
                success = result.is_success(),
                gas_used = result.gas_used,
                "Frame finished"
            );

            let snapshot = self.current_call_frame.snapshot;
            if self.call_frames.len() <= stop_depth {
                self.handle_state_backup(&result, snapshot)?;
                let mut stack = mem::take(&mut self.current_call_frame.stack);
                stack.clear();
                self.stack_pool.push(stack);
                return Ok(result);
            }

            // Handle interaction between child and parent callframe.
            self.handle_return(&result)?;
        }
    }

    /// Runs a precompile with `gas_limit` gas.
    ///
    /// An unrecoverable ECRECOVER signature fails the call keeping exactly the
    /// fixed cost it paid; any other failure is an exceptional halt.
    pub fn run_precompile(
        &mut self,
        precompile: &Precompile,
        calldata: &Bytes,
        gas_limit: u64,
    ) -> Result<ContextResult, VMError> {
        let mut gas_remaining = gas_limit;
        let result = precompile.execute(calldata, &mut gas_remaining);
        trace!(precompile = precompile.name, gas_limit, gas_remaining, ok = result.is_ok(), "Precompile");

        let gas_used = gas_limit
            .checked_sub(gas_remaining)
            .ok_or(InternalError::Underflow)?;
        match result {
            Ok(output) => Ok(ContextResult {
                result: TxResult::Success,
                gas_used,
                output,
                created_address: None,
            }),
            Err(error) if error.should_propagate() => Err(error),
            Err(VMError::ExceptionalHalt(ExceptionalHalt::Precompile(
                PrecompileError::InvalidSignature,
            ))) => Ok(ContextResult {
                result: TxResult::Revert(
                    ExceptionalHalt::Precompile(PrecompileError::InvalidSignature).into(),
                ),
                gas_used,
                output: Bytes::new(),
                created_address: None,
            }),
            Err(VMError::ExceptionalHalt(halt)) => {
                Ok(self.failed_context(halt, gas_limit, gas_used))
            }
            Err(error) => Err(error),
        }
    }

    /// Result of a frame given `gas_limit` that halted exceptionally after
    /// spending `gas_used`.
    pub(crate) fn failed_context(
        &self,
        halt: ExceptionalHalt,
        gas_limit: u64,
        gas_used: u64,
    ) -> ContextResult {
        let gas_used = match self.mode {
            ExecutionMode::BurnGasOnException => gas_limit,
            ExecutionMode::KeepGasOnException => gas_used,
        };
        ContextResult {
            result: TxResult::Revert(halt.into()),
            gas_used,
            output: Bytes::new(),
            created_address: None,
        }
    }

    /// Commits the state changes made since `snapshot` if the frame succeeded,
    /// reverts them otherwise. The substate backup follows the same fate.
    pub fn handle_state_backup(
        &mut self,
        ctx_result: &ContextResult,
        snapshot: Snapshot,
    ) -> Result<(), VMError> {
        if ctx_result.is_success() {
            self.substate.commit_backup();
            self.db.commit(snapshot);
        } else {
            self.substate.revert_backup();
            self.db.revert(snapshot)?;
        }

        Ok(())
    }

    /// Makes `new_call_frame` the running frame, keeping the caller below it.
    pub fn add_callframe(&mut self, new_call_frame: CallFrame) {
        let parent = mem::replace(&mut self.current_call_frame, new_call_frame);
        self.call_frames.push(parent);
    }

    /// Resumes the caller, returning the frame that just finished.
    pub fn pop_call_frame(&mut self) -> Result<CallFrame, VMError> {
        let parent = self.call_frames.pop().ok_or(InternalError::CallFrame)?;
        Ok(mem::replace(&mut self.current_call_frame, parent))
    }

    pub(crate) fn take_stack(&mut self) -> Stack {
        let mut stack = self.stack_pool.pop().unwrap_or_default();
        stack.clear();
        stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(byte: u8) -> Log {
        Log {
            address: Address::repeat_byte(byte),
            ..Default::default()
        }
    }

    #[test]
    fn test_commit_merges_into_parent() {
        let mut substate = Substate::default();
        substate.add_log(log(1));
        substate.push_backup();
        substate.add_log(log(2));
        substate.refunded_gas = 15000;
        assert!(!substate.add_selfdestruct(Address::repeat_byte(9)));
        substate.commit_backup();

        assert_eq!(substate.extract_logs(), vec![log(1), log(2)]);
        assert_eq!(substate.refunded_gas, 15000);
        assert!(substate.is_selfdestruct(&Address::repeat_byte(9)));
    }

    #[test]
    fn test_revert_discards_everything_since_backup() {
        let mut substate = Substate::default();
        substate.refunded_gas = 100;
        substate.touch(Address::repeat_byte(1));
        substate.push_backup();
        substate.add_log(log(2));
        substate.touch(Address::repeat_byte(2));
        substate.refunded_gas = 24100;
        substate.add_selfdestruct(Address::repeat_byte(3));
        substate.revert_backup();

        assert!(substate.extract_logs().is_empty());
        assert_eq!(substate.refunded_gas, 100);
        assert!(!substate.is_selfdestruct(&Address::repeat_byte(3)));
        assert_eq!(
            substate.iter_touched().copied().collect::<Vec<_>>(),
            vec![Address::repeat_byte(1)]
        );
    }

    #[test]
    fn test_selfdestruct_seen_through_backups() {
        let mut substate = Substate::default();
        assert!(!substate.add_selfdestruct(Address::repeat_byte(1)));
        substate.push_backup();
        substate.push_backup();
        // already marked by an ancestor
        assert!(substate.add_selfdestruct(Address::repeat_byte(1)));
        assert!(!substate.add_selfdestruct(Address::repeat_byte(2)));

        let mut destroyed: Vec<_> = substate.iter_selfdestruct().copied().collect();
        destroyed.sort();
        assert_eq!(
            destroyed,
            vec![Address::repeat_byte(1), Address::repeat_byte(2)]
        );
    }

    #[test]
    fn test_message_from_transaction() {
        let tx = Transaction {
            to: TxKind::Call(Address::repeat_byte(7)),
            value: U256::from(5),
            data: Bytes::from_static(&[1, 2]),
            ..Default::default()
        };
        let message = Message::from_transaction(&tx, Address::repeat_byte(1), 1000);
        assert_eq!(message.to, Address::repeat_byte(7));
        assert_eq!(message.code_address, Address::repeat_byte(7));
        assert_eq!(message.gas_limit, 1000);
        assert!(message.touch_nonce && message.should_transfer_value);
    }
}
