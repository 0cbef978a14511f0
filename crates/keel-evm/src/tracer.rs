//! Execution observers.
//!
//! The engine calls a [`Tracer`] around every operation and frame
//! transition. Hooks only observe; nothing they do feeds back into
//! execution.

use crate::error::HaltReason;
use crate::frame::{Frame, FrameState};
use crate::operation::Operation;
use keel_primitives::Address;

/// Hooks invoked by the engine. Every method defaults to doing nothing.
pub trait Tracer {
    /// A frame was pushed and is about to start
    fn on_frame_enter(&mut self, _frame: &Frame) {}

    /// `operation` is about to run at `frame.pc`
    fn pre_operation(&mut self, _frame: &Frame, _operation: &Operation) {}

    /// `operation` ran, charging `gas_cost`; `halt` is set if it halted
    fn post_operation(
        &mut self,
        _frame: &Frame,
        _operation: &Operation,
        _gas_cost: u64,
        _halt: Option<HaltReason>,
    ) {
    }

    /// A CALL-family or CREATE-family operation was refused without a child frame
    fn on_call_rejected(&mut self, _frame: &Frame, _reason: HaltReason) {}

    /// A contract creation frame finished
    fn on_account_creation_result(&mut self, _frame: &Frame, _halt: Option<HaltReason>) {}

    /// A frame reached a terminal state and is about to be popped
    fn on_frame_exit(&mut self, _frame: &Frame) {}
}

/// Tracer that records nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// One executed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Frame depth
    pub depth: usize,
    /// Program counter
    pub pc: usize,
    /// Opcode byte
    pub opcode: u8,
    /// Mnemonic
    pub name: &'static str,
    /// Gas before the operation
    pub gas_before: u64,
    /// Gas charged
    pub gas_cost: u64,
    /// Stack depth before the operation
    pub stack_len: usize,
    /// Halt raised by the operation
    pub halt: Option<HaltReason>,
}

/// A finished frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameExit {
    /// Frame depth
    pub depth: usize,
    /// Executing account
    pub address: Address,
    /// Terminal state
    pub state: FrameState,
    /// Gas left at exit
    pub gas_remaining: u64,
}

/// Tracer that records one [`Step`] per executed operation
#[derive(Debug, Clone, Default)]
pub struct StepTracer {
    steps: Vec<Step>,
    exits: Vec<FrameExit>,
    pending: Option<Step>,
    created: Vec<(Address, Option<HaltReason>)>,
}

impl StepTracer {
    /// Empty tracer
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded steps, in execution order
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Finished frames, innermost first
    pub fn exits(&self) -> &[FrameExit] {
        &self.exits
    }

    /// Contract creation results
    pub fn creations(&self) -> &[(Address, Option<HaltReason>)] {
        &self.created
    }

    /// Mnemonics of the recorded steps
    pub fn opcode_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name).collect()
    }
}

impl Tracer for StepTracer {
    fn pre_operation(&mut self, frame: &Frame, operation: &Operation) {
        self.pending = Some(Step {
            depth: frame.depth,
            pc: frame.pc,
            opcode: operation.opcode,
            name: operation.name,
            gas_before: frame.gas_remaining,
            gas_cost: 0,
            stack_len: frame.stack.len(),
            halt: None,
        });
    }

    fn post_operation(
        &mut self,
        _frame: &Frame,
        _operation: &Operation,
        gas_cost: u64,
        halt: Option<HaltReason>,
    ) {
        if let Some(mut step) = self.pending.take() {
            step.gas_cost = gas_cost;
            step.halt = halt;
            self.steps.push(step);
        }
    }

    fn on_account_creation_result(&mut self, frame: &Frame, halt: Option<HaltReason>) {
        self.created.push((frame.address, halt));
    }

    fn on_frame_exit(&mut self, frame: &Frame) {
        self.exits.push(FrameExit {
            depth: frame.depth,
            address: frame.address,
            state: frame.state,
            gas_remaining: frame.gas_remaining,
        });
    }
}
