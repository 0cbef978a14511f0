//! Gas model.
//!
//! A [`GasCalculator`] is a pure strategy object: every method is a function
//! of its arguments and the calculator's own constants. The engine charges
//! the returned cost before an operation mutates anything, so a frame that
//! cannot pay halts with no side effects from that operation.

mod noop;
mod standard;

pub use noop::NoopGasCalculator;
pub use standard::{GasSchedule, StandardGasCalculator};

use keel_primitives::U256;
use std::fmt;

/// Fixed costs shared by every schedule
pub mod cost {
    /// Zero tier
    pub const ZERO: u64 = 0;
    /// Base tier
    pub const BASE: u64 = 2;
    /// Very low tier
    pub const VERYLOW: u64 = 3;
    /// Low tier
    pub const LOW: u64 = 5;
    /// Mid tier
    pub const MID: u64 = 8;
    /// High tier
    pub const HIGH: u64 = 10;
    /// JUMPDEST
    pub const JUMPDEST: u64 = 1;
    /// BLOCKHASH
    pub const BLOCKHASH: u64 = 20;

    /// EXP base
    pub const EXP: u64 = 10;
    /// EXP per exponent byte
    pub const EXP_BYTE: u64 = 50;
    /// KECCAK256 base
    pub const KECCAK256: u64 = 30;
    /// KECCAK256 per word
    pub const KECCAK256_WORD: u64 = 6;
    /// Copy per word
    pub const COPY_WORD: u64 = 3;
    /// Memory per word (linear part)
    pub const MEMORY_WORD: u64 = 3;
    /// Quadratic memory divisor
    pub const MEMORY_QUAD_DIVISOR: u64 = 512;

    /// LOG base
    pub const LOG: u64 = 375;
    /// LOG per topic
    pub const LOG_TOPIC: u64 = 375;
    /// LOG per data byte
    pub const LOG_DATA: u64 = 8;

    /// Cold account access (EIP-2929)
    pub const COLD_ACCOUNT_ACCESS: u64 = 2600;
    /// Cold storage read (EIP-2929)
    pub const COLD_SLOAD: u64 = 2100;
    /// Warm storage read (EIP-2929)
    pub const WARM_STORAGE_READ: u64 = 100;
    /// SSTORE zero to nonzero
    pub const SSTORE_SET: u64 = 20_000;
    /// SSTORE nonzero to different value, minus the cold read
    pub const SSTORE_RESET: u64 = 2_900;
    /// Minimum gas that must remain for SSTORE (EIP-2200)
    pub const SSTORE_SENTRY: u64 = 2_300;

    /// CALL with value
    pub const CALL_VALUE: u64 = 9_000;
    /// CALL creating a new account
    pub const CALL_NEW_ACCOUNT: u64 = 25_000;
    /// Gas added to a value-bearing call
    pub const CALL_STIPEND: u64 = 2_300;

    /// CREATE/CREATE2 base
    pub const CREATE: u64 = 32_000;
    /// Per deposited code byte
    pub const CODE_DEPOSIT_BYTE: u64 = 200;
    /// SELFDESTRUCT base
    pub const SELFDESTRUCT: u64 = 5_000;

    /// SHA-256 precompile base and per word
    pub const SHA256: u64 = 60;
    /// SHA-256 precompile per word
    pub const SHA256_WORD: u64 = 12;
    /// Identity precompile base
    pub const IDENTITY: u64 = 15;
    /// Identity precompile per word
    pub const IDENTITY_WORD: u64 = 3;
    /// MODEXP floor
    pub const MODEXP_MIN: u64 = 200;
    /// MODEXP divisor
    pub const MODEXP_DIVISOR: u64 = 3;
}

/// Flat cost tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// STOP, RETURN, REVERT
    Zero,
    /// Environment reads
    Base,
    /// Arithmetic, comparison, PUSH/DUP/SWAP
    VeryLow,
    /// MUL, DIV, MOD family
    Low,
    /// ADDMOD, MULMOD, JUMP
    Mid,
    /// JUMPI
    High,
    /// JUMPDEST
    JumpDest,
    /// BLOCKHASH
    BlockHash,
}

/// Outcome of an SSTORE for gas purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotChange {
    /// Value at the start of the transaction
    pub original: U256,
    /// Value before this write
    pub current: U256,
    /// Value being written
    pub new: U256,
}

/// Per-fork gas strategy.
///
/// Implementations must be pure so a single calculator can be shared by
/// any number of engines running on different threads.
pub trait GasCalculator: Send + Sync + fmt::Debug {
    /// Flat tier cost
    fn tier_cost(&self, tier: Tier) -> u64;

    /// Cost of growing memory from `current_len` bytes to cover `new_end`.
    /// Zero when no growth is needed.
    fn memory_expansion_cost(&self, current_len: usize, new_end: usize) -> u64;

    /// Per-word copy cost for `len` bytes (CALLDATACOPY and friends)
    fn copy_cost(&self, len: usize) -> u64;

    /// EXP cost for the given exponent
    fn exp_cost(&self, exponent: U256) -> u64;

    /// KECCAK256 cost for `len` bytes
    fn keccak256_cost(&self, len: usize) -> u64;

    /// LOGn cost
    fn log_cost(&self, topics: usize, len: usize) -> u64;

    /// Account access (BALANCE, EXTCODE*, CALL target)
    fn account_access_cost(&self, warm: bool) -> u64;

    /// SLOAD
    fn sload_cost(&self, warm: bool) -> u64;

    /// SSTORE cost for a slot transition
    fn sstore_cost(&self, change: SlotChange, warm: bool) -> u64;

    /// SSTORE refund delta; negative when an earlier refund is taken back
    fn sstore_refund(&self, change: SlotChange) -> i64;

    /// Gas that must remain before SSTORE may run
    fn sstore_sentry(&self) -> u64;

    /// TLOAD/TSTORE
    fn transient_storage_cost(&self) -> u64;

    /// CALL family cost excluding memory and forwarded gas
    fn call_cost(&self, warm: bool, transfers_value: bool, creates_account: bool) -> u64;

    /// Gas added to the callee when value is transferred
    fn call_stipend(&self) -> u64;

    /// Gas the callee receives: the request, capped at all but one 64th
    /// of what remains.
    fn gas_available_for_child_call(&self, remaining: u64, requested: U256) -> u64;

    /// CREATE/CREATE2 flat cost
    fn create_cost(&self) -> u64;

    /// Per-word init code cost
    fn init_code_cost(&self, len: usize) -> u64;

    /// CREATE2 address hashing cost
    fn create2_hash_cost(&self, len: usize) -> u64;

    /// Deposit cost for `len` bytes of runtime code
    fn code_deposit_cost(&self, len: usize) -> u64;

    /// SELFDESTRUCT
    fn selfdestruct_cost(&self, warm: bool, creates_account: bool) -> u64;

    /// SELFDESTRUCT refund
    fn selfdestruct_refund(&self) -> u64;

    /// SHA-256 precompile
    fn sha256_cost(&self, len: usize) -> u64;

    /// Identity precompile
    fn identity_cost(&self, len: usize) -> u64;

    /// MODEXP precompile
    fn modexp_cost(&self, input: &[u8]) -> u64;

    /// Divisor capping the refund against gas used
    fn max_refund_quotient(&self) -> u64;
}

/// Word count of a byte length
pub(crate) fn word_count(len: usize) -> u64 {
    (len as u64).div_ceil(32)
}

/// Quadratic memory cost of holding `words` words
pub(crate) fn memory_cost(words: u64) -> u64 {
    cost::MEMORY_WORD
        .saturating_mul(words)
        .saturating_add(words.saturating_mul(words) / cost::MEMORY_QUAD_DIVISOR)
}
