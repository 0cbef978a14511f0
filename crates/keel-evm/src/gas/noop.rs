use super::{GasCalculator, SlotChange, Tier};
use keel_primitives::U256;

/// Charges nothing for anything.
///
/// Useful for benchmarks and for tests that care about semantics only.
/// Child calls receive no forwarded gas, which is enough because no
/// operation costs anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGasCalculator;

impl GasCalculator for NoopGasCalculator {
    fn tier_cost(&self, _tier: Tier) -> u64 {
        0
    }

    fn memory_expansion_cost(&self, _current_len: usize, _new_end: usize) -> u64 {
        0
    }

    fn copy_cost(&self, _len: usize) -> u64 {
        0
    }

    fn exp_cost(&self, _exponent: U256) -> u64 {
        0
    }

    fn keccak256_cost(&self, _len: usize) -> u64 {
        0
    }

    fn log_cost(&self, _topics: usize, _len: usize) -> u64 {
        0
    }

    fn account_access_cost(&self, _warm: bool) -> u64 {
        0
    }

    fn sload_cost(&self, _warm: bool) -> u64 {
        0
    }

    fn sstore_cost(&self, _change: SlotChange, _warm: bool) -> u64 {
        0
    }

    fn sstore_refund(&self, _change: SlotChange) -> i64 {
        0
    }

    fn sstore_sentry(&self) -> u64 {
        0
    }

    fn transient_storage_cost(&self) -> u64 {
        0
    }

    fn call_cost(&self, _warm: bool, _transfers_value: bool, _creates_account: bool) -> u64 {
        0
    }

    fn call_stipend(&self) -> u64 {
        0
    }

    fn gas_available_for_child_call(&self, _remaining: u64, _requested: U256) -> u64 {
        0
    }

    fn create_cost(&self) -> u64 {
        0
    }

    fn init_code_cost(&self, _len: usize) -> u64 {
        0
    }

    fn create2_hash_cost(&self, _len: usize) -> u64 {
        0
    }

    fn code_deposit_cost(&self, _len: usize) -> u64 {
        0
    }

    fn selfdestruct_cost(&self, _warm: bool, _creates_account: bool) -> u64 {
        0
    }

    fn selfdestruct_refund(&self) -> u64 {
        0
    }

    fn sha256_cost(&self, _len: usize) -> u64 {
        0
    }

    fn identity_cost(&self, _len: usize) -> u64 {
        0
    }

    fn modexp_cost(&self, _input: &[u8]) -> u64 {
        0
    }

    fn max_refund_quotient(&self) -> u64 {
        1
    }
}
