//! Execution frame and its state machine.
//!
//! ```text
//! NotStarted -> CodeExecuting -> CompletedSuccess | Revert | ExceptionalHalt
//!                   |    ^
//!                   v    |          (creation frames only)
//!             CodeSuspended         CodeExecuting -> CodeSuccess -> CompletedSuccess
//! ```
//!
//! Terminal states are final. `ExceptionalHalt` always carries a
//! [`HaltReason`] and forfeits the remaining gas.

use crate::error::{HaltReason, OpResult};
use crate::memory::{Memory, MemoryRange};
use crate::message::{CallScheme, Message};
use crate::opcode;
use crate::stack::Stack;
use crate::state::SnapshotId;
use crate::substate::Checkpoint;
use bytes::Bytes;
use keel_primitives::{Address, U256};

/// Kind of frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Runs existing code
    MessageCall,
    /// Runs init code and deposits the result
    ContractCreation,
}

/// Frame lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Built but not started by its processor
    NotStarted,
    /// The interpreter loop is running
    CodeExecuting,
    /// Waiting for a child frame
    CodeSuspended,
    /// Init code returned; awaiting code deposit
    CodeSuccess,
    /// Finished successfully
    CompletedSuccess,
    /// REVERT executed
    Revert,
    /// Stopped on a rule violation
    ExceptionalHalt,
}

impl FrameState {
    /// Whether no further work happens in this state
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FrameState::CompletedSuccess | FrameState::Revert | FrameState::ExceptionalHalt
        )
    }
}

/// Immutable code plus its JUMPDEST map
#[derive(Debug, Clone, Default)]
pub struct Code {
    bytes: Bytes,
    jump_dests: Vec<bool>,
}

impl Code {
    /// Analyze `bytes`, skipping PUSH immediates
    pub fn new(bytes: Bytes) -> Self {
        let mut jump_dests = vec![false; bytes.len()];
        let mut pc = 0;
        while pc < bytes.len() {
            let op = bytes[pc];
            if op == opcode::JUMPDEST {
                jump_dests[pc] = true;
            }
            pc += 1 + opcode::immediate_size(op);
        }
        Self { bytes, jump_dests }
    }

    /// Byte at `pc`; STOP past the end
    pub fn opcode_at(&self, pc: usize) -> u8 {
        self.bytes.get(pc).copied().unwrap_or(opcode::STOP)
    }

    /// Whether `dest` is a valid jump target
    pub fn is_jump_dest(&self, dest: usize) -> bool {
        self.jump_dests.get(dest).copied().unwrap_or(false)
    }

    /// Raw bytes
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether there is no code
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One call's execution context
#[derive(Debug)]
pub struct Frame {
    /// Call or creation
    pub kind: FrameKind,
    /// Issuing scheme
    pub scheme: CallScheme,
    /// Lifecycle state
    pub state: FrameState,
    /// Set exactly when `state` is `ExceptionalHalt`
    pub halt_reason: Option<HaltReason>,
    /// Gas given to the frame
    pub gas_limit: u64,
    /// Gas left
    pub gas_remaining: u64,
    /// Operand stack
    pub stack: Stack,
    /// Memory
    pub memory: Memory,
    /// Program counter
    pub pc: usize,
    /// Code being run
    pub code: Code,
    /// Call data
    pub input: Bytes,
    /// Output (RETURN data, REVERT data or created code)
    pub output: Bytes,
    /// Output of the last finished child
    pub return_data: Bytes,
    /// Call depth
    pub depth: usize,
    /// CALLER
    pub caller: Address,
    /// ADDRESS; also the created address for creations
    pub address: Address,
    /// Account the code came from
    pub code_address: Address,
    /// CALLVALUE
    pub value: U256,
    /// Whether `value` moves when the frame starts
    pub transfers_value: bool,
    /// State changes forbidden
    pub is_static: bool,
    /// Parent memory receiving this frame's output
    pub return_memory: Option<MemoryRange>,
    /// Snapshots opened by the processor
    pub(crate) checkpoint: Option<(SnapshotId, Checkpoint)>,
}

impl Frame {
    /// Build a frame for `message`
    pub fn new(message: Message) -> Self {
        Self {
            kind: message.kind,
            scheme: message.scheme,
            state: FrameState::NotStarted,
            halt_reason: None,
            gas_limit: message.gas_limit,
            gas_remaining: message.gas_limit,
            stack: Stack::new(),
            memory: Memory::new(),
            pc: 0,
            code: Code::new(message.code),
            input: message.input,
            output: Bytes::new(),
            return_data: Bytes::new(),
            depth: message.depth,
            caller: message.caller,
            address: message.recipient,
            code_address: message.code_address,
            value: message.value,
            transfers_value: message.transfers_value,
            is_static: message.is_static,
            return_memory: message.return_memory,
            checkpoint: None,
        }
    }

    /// Opcode at the program counter
    pub fn current_opcode(&self) -> u8 {
        self.code.opcode_at(self.pc)
    }

    /// Charge gas, all or nothing
    pub fn use_gas(&mut self, amount: u64) -> OpResult<()> {
        self.gas_remaining = self
            .gas_remaining
            .checked_sub(amount)
            .ok_or(HaltReason::InsufficientGas)?;
        Ok(())
    }

    /// Give back gas (unused child gas)
    pub fn return_gas(&mut self, amount: u64) {
        self.gas_remaining = self.gas_remaining.saturating_add(amount);
    }

    /// Gas consumed so far
    pub fn gas_used(&self) -> u64 {
        self.gas_limit - self.gas_remaining
    }

    /// Halt exceptionally, forfeiting all remaining gas
    pub fn halt(&mut self, reason: HaltReason) {
        self.state = FrameState::ExceptionalHalt;
        self.halt_reason = Some(reason);
        self.gas_remaining = 0;
        self.output = Bytes::new();
    }

    /// Whether the frame reached a terminal state
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
