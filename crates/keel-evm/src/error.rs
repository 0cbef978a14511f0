//! EVM error types

use thiserror::Error;

/// Reason a frame stopped with `EXCEPTIONAL_HALT`.
///
/// Every kind is reported distinctly; a halt never collapses into a
/// generic failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum HaltReason {
    /// Gas cost exceeds remaining gas
    #[error("insufficient gas")]
    InsufficientGas,

    /// Operation needs more stack items than available
    #[error("stack underflow")]
    StackUnderflow,

    /// Operation would grow the stack past its limit
    #[error("stack overflow")]
    StackOverflow,

    /// Undefined or designated-invalid opcode
    #[error("invalid operation 0x{0:02x}")]
    InvalidOperation(u8),

    /// Jump target is not a JUMPDEST outside push data
    #[error("invalid jump destination: {0}")]
    InvalidJumpDestination(usize),

    /// Attempt to create over an existing account
    #[error("illegal state change")]
    IllegalStateChange,

    /// Malformed or oversized precompile input
    #[error("precompile error")]
    PrecompileError,

    /// Offset arithmetic overflowed
    #[error("out of bounds")]
    OutOfBounds,

    /// Read past the end of the return data buffer
    #[error("invalid return data buffer access")]
    InvalidReturnDataBufferAccess,

    /// Nested call or create beyond the maximum depth
    #[error("call depth exceeded")]
    CallDepthExceeded,

    /// Deployed code exceeds the size limit
    #[error("code too large")]
    CodeTooLarge,

    /// Deployed code starts with a reserved byte
    #[error("invalid code")]
    InvalidCode,

    /// Init code exceeds the size limit
    #[error("init code too large")]
    InitCodeTooLarge,

    /// State mutation inside a static call
    #[error("state change in static context")]
    StaticStateChange,

    /// Value transfer exceeds the sender balance
    #[error("insufficient balance")]
    InsufficientBalance,
}

/// Engine-level errors.
///
/// These signal a broken internal invariant and are never produced by
/// bytecode, however malformed.
#[derive(Debug, Error)]
pub enum EvmError {
    /// Internal invariant violated
    #[error("internal error: {0}")]
    Internal(&'static str),
}

/// Result type for engine entry points
pub type EvmResult<T> = Result<T, EvmError>;

/// Result type for operations that may halt the current frame
pub type OpResult<T> = Result<T, HaltReason>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halt_reason_display() {
        assert_eq!(HaltReason::InsufficientGas.to_string(), "insufficient gas");
        assert_eq!(
            HaltReason::InvalidOperation(0xfe).to_string(),
            "invalid operation 0xfe"
        );
        assert_eq!(
            HaltReason::InvalidJumpDestination(7).to_string(),
            "invalid jump destination: 7"
        );
    }

    #[test]
    fn test_evm_error_display() {
        let err = EvmError::Internal("frame stack empty");
        assert_eq!(err.to_string(), "internal error: frame stack empty");
    }
}
