//! The fetch-dispatch loop for a single frame

use crate::error::{HaltReason, OpResult};
use crate::frame::{Frame, FrameKind, FrameState};
use crate::host::Host;
use crate::message::Message;
use crate::operation::{Control, Operation};
use crate::stack::STACK_LIMIT;
use crate::tracer::Tracer;
use tracing::trace;

/// Runs operations on a frame until it leaves `CodeExecuting`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Interpreter;

impl Interpreter {
    /// Execute the frame until it finishes or spawns a child.
    ///
    /// Returns the child message when a CALL or CREATE suspends the frame.
    pub fn run(frame: &mut Frame, host: &mut Host<'_>, tracer: &mut dyn Tracer) -> Option<Box<Message>> {
        while frame.state == FrameState::CodeExecuting {
            if let Some(message) = Self::step(frame, host, tracer) {
                return Some(message);
            }
        }
        None
    }

    /// Execute the operation at the program counter
    pub fn step(frame: &mut Frame, host: &mut Host<'_>, tracer: &mut dyn Tracer) -> Option<Box<Message>> {
        let operation = *host.config.operations().get(frame.current_opcode());
        tracer.pre_operation(frame, &operation);

        let gas_before = frame.gas_remaining;
        let (cost, result) = match Self::dispatch(frame, host, &operation) {
            Ok((cost, control)) => (cost, Ok(control)),
            Err(reason) => (gas_before.saturating_sub(frame.gas_remaining), Err(reason)),
        };

        let mut spawned = None;
        match result {
            Ok(Control::Continue) => frame.pc += 1,
            Ok(Control::Skip(immediate)) => frame.pc += 1 + immediate,
            Ok(Control::Jump(dest)) => frame.pc = dest,
            Ok(Control::Success) => {
                frame.state = match frame.kind {
                    FrameKind::ContractCreation => FrameState::CodeSuccess,
                    FrameKind::MessageCall => FrameState::CompletedSuccess,
                };
            }
            Ok(Control::Revert) => frame.state = FrameState::Revert,
            Ok(Control::Spawn(message)) => {
                frame.pc += 1;
                frame.state = FrameState::CodeSuspended;
                spawned = Some(message);
            }
            Ok(Control::Rejected(reason)) => {
                trace!(depth = frame.depth, pc = frame.pc, %reason, "call rejected");
                tracer.on_call_rejected(frame, reason);
                frame.pc += 1;
            }
            Err(reason) => {
                trace!(
                    depth = frame.depth,
                    pc = frame.pc,
                    op = operation.name,
                    %reason,
                    "exceptional halt"
                );
                frame.halt(reason);
            }
        }

        tracer.post_operation(frame, &operation, cost, frame.halt_reason);
        spawned
    }

    /// Arity checks, then gas, then the operation itself.
    fn dispatch(
        frame: &mut Frame,
        host: &mut Host<'_>,
        operation: &Operation,
    ) -> OpResult<(u64, Control)> {
        if operation.is_invalid() {
            return Err(HaltReason::InvalidOperation(operation.opcode));
        }
        let len = frame.stack.len();
        if len < operation.inputs {
            return Err(HaltReason::StackUnderflow);
        }
        if len - operation.inputs + operation.outputs > STACK_LIMIT {
            return Err(HaltReason::StackOverflow);
        }

        let cost = (operation.gas)(frame, host)?;
        frame.use_gas(cost)?;
        let control = (operation.execute)(frame, host)?;
        Ok((cost, control))
    }
}
