//! Messages: the invocation boundary of a frame

use crate::frame::FrameKind;
use crate::memory::MemoryRange;
use bytes::Bytes;
use keel_primitives::{Address, U256};

/// How a message was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallScheme {
    /// CALL or a top-level transaction call
    Call,
    /// CALLCODE
    CallCode,
    /// DELEGATECALL
    DelegateCall,
    /// STATICCALL
    StaticCall,
    /// CREATE or a top-level creation
    Create,
    /// CREATE2
    Create2,
}

/// Everything needed to start a frame
#[derive(Debug, Clone)]
pub struct Message {
    /// Call or creation
    pub kind: FrameKind,
    /// Issuing scheme
    pub scheme: CallScheme,
    /// Sender as seen by the callee (CALLER)
    pub caller: Address,
    /// Account whose storage and balance the frame acts on
    pub recipient: Address,
    /// Account whose code runs
    pub code_address: Address,
    /// Code to run (init code for creations)
    pub code: Bytes,
    /// Call data
    pub input: Bytes,
    /// Value (CALLVALUE)
    pub value: U256,
    /// Whether `value` actually moves; false for DELEGATECALL
    pub transfers_value: bool,
    /// Gas given to the frame
    pub gas_limit: u64,
    /// Call depth, 0 for the outermost frame
    pub depth: usize,
    /// Whether state changes are forbidden
    pub is_static: bool,
    /// Parent memory receiving the output of a call
    pub return_memory: Option<MemoryRange>,
}

impl Message {
    /// A message call
    pub fn call(
        caller: Address,
        recipient: Address,
        code: Bytes,
        input: Bytes,
        value: U256,
        gas_limit: u64,
    ) -> Self {
        Self {
            kind: FrameKind::MessageCall,
            scheme: CallScheme::Call,
            caller,
            recipient,
            code_address: recipient,
            code,
            input,
            value,
            transfers_value: true,
            gas_limit,
            depth: 0,
            is_static: false,
            return_memory: None,
        }
    }

    /// A contract creation at a precomputed address
    pub fn create(
        caller: Address,
        address: Address,
        init_code: Bytes,
        value: U256,
        gas_limit: u64,
    ) -> Self {
        Self {
            kind: FrameKind::ContractCreation,
            scheme: CallScheme::Create,
            caller,
            recipient: address,
            code_address: address,
            code: init_code,
            input: Bytes::new(),
            value,
            transfers_value: true,
            gas_limit,
            depth: 0,
            is_static: false,
            return_memory: None,
        }
    }

    /// Set the call depth
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Mark the message static
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }
}
