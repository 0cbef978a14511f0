//! # keel-evm
//!
//! Bytecode execution engine for Keel.
//!
//! The engine interprets contract bytecode over an explicit stack of
//! [`Frame`]s. Every frame moves through the states of [`FrameState`]:
//! a processor hook starts it, the interpreter loop drives it, and the
//! outcome of a finished child is folded back into its parent.
//!
//! - [`word`]: 256-bit arithmetic with wraparound and zero-divisor rules
//! - [`gas`]: pluggable [`GasCalculator`] strategies per fork
//! - [`operation`]: the 256-entry dispatch table
//! - [`processor`]: message-call and contract-creation protocols
//! - [`precompile`]: address-routed native contracts, including MODEXP
//! - [`Evm`]: the driver tying frames, world state and tracer together

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod error;
pub mod evm;
pub mod frame;
pub mod gas;
pub mod host;
pub mod interpreter;
pub mod memory;
pub mod message;
pub mod opcode;
pub mod operation;
pub mod precompile;
pub mod processor;
pub mod stack;
pub mod state;
pub mod substate;
pub mod tracer;
pub mod word;

pub use config::{EvmConfig, EvmSettings, Fork};
pub use context::{BlockContext, Environment, TxContext};
pub use error::{EvmError, EvmResult, HaltReason, OpResult};
pub use evm::{Evm, ExecutionOutcome};
pub use frame::{Frame, FrameKind, FrameState};
pub use gas::{GasCalculator, NoopGasCalculator, StandardGasCalculator};
pub use interpreter::Interpreter;
pub use message::{CallScheme, Message};
pub use precompile::{ModExp, ModExpBackend, Precompile, PrecompileOutput, PrecompileRegistry};
pub use state::{Account, InMemoryWorldState, SnapshotId, WorldState};
pub use substate::{Log, Substate};
pub use tracer::{NoopTracer, Step, StepTracer, Tracer};

pub use keel_primitives::{Address, H256, U256};
