use super::{cost, memory_cost, word_count, GasCalculator, SlotChange, Tier};
use crate::precompile::modexp;
use crate::word::byte_length;
use keel_primitives::U256;

/// Constants that vary between forks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasSchedule {
    /// Refund for clearing a storage slot
    pub sstore_clears_refund: u64,
    /// Refund for SELFDESTRUCT
    pub selfdestruct_refund: u64,
    /// Refund cap is `gas_used / max_refund_quotient`
    pub max_refund_quotient: u64,
    /// Per-word init code cost (EIP-3860)
    pub init_code_word_cost: u64,
}

impl GasSchedule {
    /// Berlin (EIP-2929 access lists)
    pub const fn berlin() -> Self {
        Self {
            sstore_clears_refund: 15_000,
            selfdestruct_refund: 24_000,
            max_refund_quotient: 2,
            init_code_word_cost: 0,
        }
    }

    /// London (EIP-3529 reduced refunds)
    pub const fn london() -> Self {
        Self {
            sstore_clears_refund: 4_800,
            selfdestruct_refund: 0,
            max_refund_quotient: 5,
            init_code_word_cost: 0,
        }
    }

    /// Shanghai (EIP-3860 init code metering)
    pub const fn shanghai() -> Self {
        Self {
            init_code_word_cost: 2,
            ..Self::london()
        }
    }
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self::shanghai()
    }
}

/// Gas calculator driven by a [`GasSchedule`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardGasCalculator {
    schedule: GasSchedule,
}

impl StandardGasCalculator {
    /// Create a calculator for the given schedule
    pub const fn new(schedule: GasSchedule) -> Self {
        Self { schedule }
    }

    /// The schedule in use
    pub fn schedule(&self) -> &GasSchedule {
        &self.schedule
    }
}

impl GasCalculator for StandardGasCalculator {
    fn tier_cost(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Zero => cost::ZERO,
            Tier::Base => cost::BASE,
            Tier::VeryLow => cost::VERYLOW,
            Tier::Low => cost::LOW,
            Tier::Mid => cost::MID,
            Tier::High => cost::HIGH,
            Tier::JumpDest => cost::JUMPDEST,
            Tier::BlockHash => cost::BLOCKHASH,
        }
    }

    fn memory_expansion_cost(&self, current_len: usize, new_end: usize) -> u64 {
        if new_end <= current_len {
            return 0;
        }
        let current = memory_cost(word_count(current_len));
        let next = memory_cost(word_count(new_end));
        next.saturating_sub(current)
    }

    fn copy_cost(&self, len: usize) -> u64 {
        cost::COPY_WORD.saturating_mul(word_count(len))
    }

    fn exp_cost(&self, exponent: U256) -> u64 {
        cost::EXP + cost::EXP_BYTE * byte_length(exponent)
    }

    fn keccak256_cost(&self, len: usize) -> u64 {
        cost::KECCAK256.saturating_add(cost::KECCAK256_WORD.saturating_mul(word_count(len)))
    }

    fn log_cost(&self, topics: usize, len: usize) -> u64 {
        cost::LOG
            .saturating_add(cost::LOG_TOPIC * topics as u64)
            .saturating_add(cost::LOG_DATA.saturating_mul(len as u64))
    }

    fn account_access_cost(&self, warm: bool) -> u64 {
        if warm {
            cost::WARM_STORAGE_READ
        } else {
            cost::COLD_ACCOUNT_ACCESS
        }
    }

    fn sload_cost(&self, warm: bool) -> u64 {
        if warm {
            cost::WARM_STORAGE_READ
        } else {
            cost::COLD_SLOAD
        }
    }

    fn sstore_cost(&self, change: SlotChange, warm: bool) -> u64 {
        let cold = if warm { 0 } else { cost::COLD_SLOAD };
        let base = if change.current == change.new {
            cost::WARM_STORAGE_READ
        } else if change.original == change.current {
            if change.original.is_zero() {
                cost::SSTORE_SET
            } else {
                cost::SSTORE_RESET
            }
        } else {
            cost::WARM_STORAGE_READ
        };
        base + cold
    }

    fn sstore_refund(&self, change: SlotChange) -> i64 {
        let SlotChange {
            original,
            current,
            new,
        } = change;
        let clears = self.schedule.sstore_clears_refund as i64;
        if current == new {
            return 0;
        }
        if original == current {
            return if !original.is_zero() && new.is_zero() {
                clears
            } else {
                0
            };
        }
        let mut refund = 0;
        if !original.is_zero() {
            if current.is_zero() {
                refund -= clears;
            } else if new.is_zero() {
                refund += clears;
            }
        }
        if original == new {
            refund += if original.is_zero() {
                (cost::SSTORE_SET - cost::WARM_STORAGE_READ) as i64
            } else {
                (cost::SSTORE_RESET - cost::WARM_STORAGE_READ) as i64
            };
        }
        refund
    }

    fn sstore_sentry(&self) -> u64 {
        cost::SSTORE_SENTRY
    }

    fn transient_storage_cost(&self) -> u64 {
        cost::WARM_STORAGE_READ
    }

    fn call_cost(&self, warm: bool, transfers_value: bool, creates_account: bool) -> u64 {
        let mut total = self.account_access_cost(warm);
        if transfers_value {
            total += cost::CALL_VALUE;
            if creates_account {
                total += cost::CALL_NEW_ACCOUNT;
            }
        }
        total
    }

    fn call_stipend(&self) -> u64 {
        cost::CALL_STIPEND
    }

    fn gas_available_for_child_call(&self, remaining: u64, requested: U256) -> u64 {
        let cap = remaining - remaining / 64;
        if requested > U256::from(cap) {
            cap
        } else {
            requested.low_u64()
        }
    }

    fn create_cost(&self) -> u64 {
        cost::CREATE
    }

    fn init_code_cost(&self, len: usize) -> u64 {
        self.schedule
            .init_code_word_cost
            .saturating_mul(word_count(len))
    }

    fn create2_hash_cost(&self, len: usize) -> u64 {
        cost::KECCAK256_WORD.saturating_mul(word_count(len))
    }

    fn code_deposit_cost(&self, len: usize) -> u64 {
        cost::CODE_DEPOSIT_BYTE.saturating_mul(len as u64)
    }

    fn selfdestruct_cost(&self, warm: bool, creates_account: bool) -> u64 {
        let mut total = cost::SELFDESTRUCT;
        if !warm {
            total += cost::COLD_ACCOUNT_ACCESS;
        }
        if creates_account {
            total += cost::CALL_NEW_ACCOUNT;
        }
        total
    }

    fn selfdestruct_refund(&self) -> u64 {
        self.schedule.selfdestruct_refund
    }

    fn sha256_cost(&self, len: usize) -> u64 {
        cost::SHA256.saturating_add(cost::SHA256_WORD.saturating_mul(word_count(len)))
    }

    fn identity_cost(&self, len: usize) -> u64 {
        cost::IDENTITY.saturating_add(cost::IDENTITY_WORD.saturating_mul(word_count(len)))
    }

    fn modexp_cost(&self, input: &[u8]) -> u64 {
        let lengths = modexp::Lengths::parse(input);
        let complexity =
            modexp::multiplication_complexity(lengths.base.max(lengths.modulus));
        let iterations = modexp::iteration_count(input, &lengths).max(1);
        (complexity.saturating_mul(iterations) / cost::MODEXP_DIVISOR).max(cost::MODEXP_MIN)
    }

    fn max_refund_quotient(&self) -> u64 {
        self.schedule.max_refund_quotient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn london() -> StandardGasCalculator {
        StandardGasCalculator::new(GasSchedule::london())
    }

    fn change(original: u64, current: u64, new: u64) -> SlotChange {
        SlotChange {
            original: U256::from(original),
            current: U256::from(current),
            new: U256::from(new),
        }
    }

    #[test]
    fn test_memory_expansion_is_incremental() {
        let calc = london();
        assert_eq!(calc.memory_expansion_cost(0, 32), 3);
        assert_eq!(calc.memory_expansion_cost(32, 32), 0);
        assert_eq!(calc.memory_expansion_cost(64, 32), 0);
        assert_eq!(calc.memory_expansion_cost(0, 33), 6);
        assert_eq!(calc.memory_expansion_cost(32, 64), 3);
    }

    #[test]
    fn test_exp_cost_counts_exponent_bytes() {
        let calc = london();
        assert_eq!(calc.exp_cost(U256::zero()), 10);
        assert_eq!(calc.exp_cost(U256::from(0xff)), 60);
        assert_eq!(calc.exp_cost(U256::from(0x100)), 110);
        assert_eq!(calc.exp_cost(U256::MAX), 10 + 50 * 32);
    }

    #[test]
    fn test_sstore_transitions() {
        let calc = london();
        // no-op
        assert_eq!(calc.sstore_cost(change(1, 1, 1), true), 100);
        // fresh write
        assert_eq!(calc.sstore_cost(change(0, 0, 1), true), 20_000);
        // reset
        assert_eq!(calc.sstore_cost(change(1, 1, 2), true), 2_900);
        // clear
        assert_eq!(calc.sstore_cost(change(1, 1, 0), true), 2_900);
        // dirty slot
        assert_eq!(calc.sstore_cost(change(1, 2, 3), true), 100);
        // cold surcharge
        assert_eq!(calc.sstore_cost(change(0, 0, 1), false), 22_100);
    }

    #[test]
    fn test_sstore_refunds() {
        let calc = london();
        assert_eq!(calc.sstore_refund(change(1, 1, 0)), 4_800);
        assert_eq!(calc.sstore_refund(change(1, 0, 1)), -4_800 + 2_800);
        assert_eq!(calc.sstore_refund(change(0, 1, 0)), 19_900);
        assert_eq!(calc.sstore_refund(change(1, 2, 0)), 4_800);
        assert_eq!(calc.sstore_refund(change(1, 1, 1)), 0);

        let berlin = StandardGasCalculator::new(GasSchedule::berlin());
        assert_eq!(berlin.sstore_refund(change(1, 1, 0)), 15_000);
    }

    #[test]
    fn test_call_cost_components() {
        let calc = london();
        assert_eq!(calc.call_cost(true, false, false), 100);
        assert_eq!(calc.call_cost(false, false, true), 2_600);
        assert_eq!(calc.call_cost(true, true, false), 9_100);
        assert_eq!(calc.call_cost(false, true, true), 2_600 + 9_000 + 25_000);
    }

    #[test]
    fn test_child_gas_all_but_one_64th() {
        let calc = london();
        assert_eq!(calc.gas_available_for_child_call(6_400, U256::MAX), 6_300);
        assert_eq!(calc.gas_available_for_child_call(6_400, U256::from(1_000)), 1_000);
        assert_eq!(calc.gas_available_for_child_call(0, U256::MAX), 0);
    }

    #[test]
    fn test_init_code_cost_by_fork() {
        assert_eq!(london().init_code_cost(64), 0);
        let shanghai = StandardGasCalculator::new(GasSchedule::shanghai());
        assert_eq!(shanghai.init_code_cost(64), 4);
        assert_eq!(shanghai.init_code_cost(65), 6);
    }

    #[test]
    fn test_refund_quotient() {
        assert_eq!(StandardGasCalculator::new(GasSchedule::berlin()).max_refund_quotient(), 2);
        assert_eq!(london().max_refund_quotient(), 5);
    }

    #[test]
    fn test_modexp_floor() {
        let calc = london();
        let mut input = vec![0u8; 96];
        input[31] = 1;
        input[63] = 1;
        input[95] = 1;
        input.extend_from_slice(&[3, 5, 7]);
        assert_eq!(calc.modexp_cost(&input), 200);
    }
}
