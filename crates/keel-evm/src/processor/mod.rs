//! Message processors.
//!
//! A processor owns the protocol around a frame: what happens when it
//! starts and, for creations, what happens once its init code succeeds.
//! Dispatch is by [`FrameKind`](crate::frame::FrameKind), not by trait
//! object.

mod contract_creation;
mod message_call;

pub use contract_creation::{
    create2_address, create_address, ContractCreationProcessor, ContractValidationRule,
};
pub use message_call::MessageCallProcessor;
