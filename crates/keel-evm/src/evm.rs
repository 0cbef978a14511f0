//! Engine driver.
//!
//! [`Evm::execute`] runs one top-level message on an explicit stack of
//! frames. The frame on top is advanced according to its state; when it
//! reaches a terminal state it is popped and its result is folded into the
//! frame below, or into the [`ExecutionOutcome`] if it was the last one.

use crate::config::EvmConfig;
use crate::context::Environment;
use crate::error::{EvmError, EvmResult, HaltReason};
use crate::frame::{Frame, FrameKind, FrameState};
use crate::host::Host;
use crate::interpreter::Interpreter;
use crate::message::Message;
use crate::state::WorldState;
use crate::substate::{Log, Substate};
use crate::tracer::Tracer;
use bytes::Bytes;
use keel_primitives::{Address, U256};
use tracing::{debug, trace};

/// Result of executing a top-level message
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// Terminal state of the outermost frame
    pub state: FrameState,
    /// Why it halted, for exceptional halts
    pub halt_reason: Option<HaltReason>,
    /// Return data, or revert data
    pub output: Bytes,
    /// Gas left to the caller
    pub gas_remaining: u64,
    /// Gas consumed, before refunds
    pub gas_used: u64,
    /// Refund granted, already capped against `gas_used`
    pub gas_refund: u64,
    /// Logs of a successful execution
    pub logs: Vec<Log>,
    /// Address of the deployed contract, for successful creations
    pub created_address: Option<Address>,
}

impl ExecutionOutcome {
    /// Whether the outermost frame completed successfully
    pub fn is_success(&self) -> bool {
        self.state == FrameState::CompletedSuccess
    }

    /// Whether the outermost frame reverted
    pub fn is_revert(&self) -> bool {
        self.state == FrameState::Revert
    }
}

/// Bytecode execution engine
#[derive(Debug, Clone, Default)]
pub struct Evm {
    config: EvmConfig,
}

impl Evm {
    /// Create an engine for `config`
    pub fn new(config: EvmConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &EvmConfig {
        &self.config
    }

    /// Execute `message` against `state`.
    ///
    /// All world-state changes of a frame that does not complete
    /// successfully are discarded. `EvmError` is reserved for broken
    /// engine invariants; bytecode failures are reported in the outcome.
    pub fn execute(
        &self,
        message: Message,
        state: &mut dyn WorldState,
        env: &Environment,
        tracer: &mut dyn Tracer,
    ) -> EvmResult<ExecutionOutcome> {
        let mut substate = Substate::new();
        self.warm_up(&message, env, &mut substate);

        let gas_limit = message.gas_limit;
        let mut root = Frame::new(message);
        if root.depth > self.config.max_call_depth() {
            debug!(depth = root.depth, "message exceeds the call depth limit");
            root.halt(HaltReason::CallDepthExceeded);
            return Ok(self.outcome(root, gas_limit, &mut substate, state));
        }

        let mut frames = vec![root];
        loop {
            let top = frames
                .last_mut()
                .ok_or(EvmError::Internal("frame stack emptied without an outcome"))?;

            if top.is_terminal() {
                let mut finished = frames
                    .pop()
                    .ok_or(EvmError::Internal("terminal frame vanished"))?;
                let mut host = self.host(&mut *state, &mut substate, env);
                Self::close(&mut finished, &mut host, tracer)?;
                match frames.last_mut() {
                    Some(parent) => Self::resume(parent, finished),
                    None => return Ok(self.outcome(finished, gas_limit, &mut substate, state)),
                }
                continue;
            }

            let mut host = self.host(&mut *state, &mut substate, env);
            let spawned = match top.state {
                FrameState::NotStarted => {
                    self.start(top, &mut host, tracer);
                    None
                }
                FrameState::CodeExecuting => Interpreter::run(top, &mut host, tracer),
                FrameState::CodeSuccess => {
                    self.config
                        .contract_creation_processor()
                        .code_success(top, &mut host);
                    tracer.on_account_creation_result(top, top.halt_reason);
                    None
                }
                FrameState::CodeSuspended => {
                    return Err(EvmError::Internal("suspended frame on top of the stack"));
                }
                FrameState::CompletedSuccess | FrameState::Revert | FrameState::ExceptionalHalt => {
                    return Err(EvmError::Internal("terminal frame not popped"));
                }
            };

            if let Some(message) = spawned {
                trace!(depth = message.depth, recipient = %message.recipient, "spawning child frame");
                frames.push(Frame::new(*message));
            }
        }
    }

    fn host<'a>(
        &'a self,
        state: &'a mut dyn WorldState,
        substate: &'a mut Substate,
        env: &'a Environment,
    ) -> Host<'a> {
        Host {
            state,
            substate,
            env,
            config: &self.config,
        }
    }

    /// Accounts warm from the start of a transaction (EIP-2929, EIP-3651)
    fn warm_up(&self, message: &Message, env: &Environment, substate: &mut Substate) {
        substate.warm_address(env.tx.origin);
        substate.warm_address(message.caller);
        substate.warm_address(message.recipient);
        for address in self.config.precompiles().addresses() {
            substate.warm_address(*address);
        }
        if self.config.warm_coinbase() {
            substate.warm_address(env.block.coinbase);
        }
    }

    fn start(&self, frame: &mut Frame, host: &mut Host<'_>, tracer: &mut dyn Tracer) {
        debug!(
            depth = frame.depth,
            kind = ?frame.kind,
            address = %frame.address,
            gas = frame.gas_limit,
            "entering frame"
        );
        tracer.on_frame_enter(frame);
        match frame.kind {
            FrameKind::MessageCall => self.config.message_call_processor().start(frame, host),
            FrameKind::ContractCreation => {
                self.config.contract_creation_processor().start(frame, host);
                if frame.is_terminal() {
                    tracer.on_account_creation_result(frame, frame.halt_reason);
                }
            }
        }
    }

    /// Commit or revert the frame's checkpoint
    fn close(frame: &mut Frame, host: &mut Host<'_>, tracer: &mut dyn Tracer) -> EvmResult<()> {
        // A frame halted before its processor ran has nothing to undo
        if let Some(checkpoint) = frame.checkpoint.take() {
            if frame.state == FrameState::CompletedSuccess {
                host.commit(checkpoint);
            } else {
                host.revert(checkpoint);
            }
        } else if frame.state == FrameState::CompletedSuccess {
            return Err(EvmError::Internal("successful frame without a checkpoint"));
        }
        debug!(
            depth = frame.depth,
            state = ?frame.state,
            halt = ?frame.halt_reason,
            gas_remaining = frame.gas_remaining,
            "leaving frame"
        );
        tracer.on_frame_exit(frame);
        Ok(())
    }

    /// Fold a finished child into its suspended parent
    fn resume(parent: &mut Frame, child: Frame) {
        parent.state = FrameState::CodeExecuting;

        let (success, keeps_gas) = match child.state {
            FrameState::CompletedSuccess => (true, true),
            FrameState::Revert => (false, true),
            _ => (false, false),
        };
        if keeps_gas {
            parent.return_gas(child.gas_remaining);
        }

        let result = match child.kind {
            FrameKind::MessageCall => {
                if keeps_gas {
                    if let Some(range) = child.return_memory {
                        let len = range.len.min(child.output.len());
                        parent.memory.write(range.offset, &child.output[..len]);
                    }
                    parent.return_data = child.output;
                } else {
                    parent.return_data = Bytes::new();
                }
                if success {
                    U256::one()
                } else {
                    U256::zero()
                }
            }
            FrameKind::ContractCreation => {
                parent.return_data = if child.state == FrameState::Revert {
                    child.output
                } else {
                    Bytes::new()
                };
                if success {
                    child.address.to_word()
                } else {
                    U256::zero()
                }
            }
        };

        if let Err(reason) = parent.stack.push(result) {
            parent.halt(reason);
        }
    }

    fn outcome(
        &self,
        frame: Frame,
        gas_limit: u64,
        substate: &mut Substate,
        state: &mut dyn WorldState,
    ) -> ExecutionOutcome {
        let success = frame.state == FrameState::CompletedSuccess;
        let gas_used = gas_limit.saturating_sub(frame.gas_remaining);

        let (gas_refund, logs) = if success {
            for address in substate.selfdestructs().to_vec() {
                state.delete_account(&address);
            }
            let cap = gas_used / self.config.gas_calculator().max_refund_quotient().max(1);
            let refund = u64::try_from(substate.refund().max(0)).unwrap_or(0);
            (refund.min(cap), substate.take_logs())
        } else {
            (0, Vec::new())
        };

        let created_address = (success && frame.kind == FrameKind::ContractCreation)
            .then_some(frame.address);

        debug!(
            state = ?frame.state,
            gas_used,
            gas_refund,
            logs = logs.len(),
            "execution finished"
        );
        ExecutionOutcome {
            state: frame.state,
            halt_reason: frame.halt_reason,
            output: frame.output,
            gas_remaining: frame.gas_remaining,
            gas_used,
            gas_refund,
            logs,
            created_address,
        }
    }
}
