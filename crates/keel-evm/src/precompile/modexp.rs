//! Modular exponentiation (EIP-198, upper bound per EIP-7823).
//!
//! Input layout: three 32-byte big-endian lengths (base, exponent,
//! modulus) followed by the operands. Missing trailing bytes read as zero.

use crate::error::{HaltReason, OpResult};
use crate::word::saturating_u64;
use keel_primitives::U256;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Offset of the base operand
pub const BASE_OFFSET: u64 = 96;

const LENGTH_FIELD: usize = 32;

/// Declared operand lengths, clamped to `u64`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lengths {
    /// Base length
    pub base: u64,
    /// Exponent length
    pub exponent: u64,
    /// Modulus length
    pub modulus: u64,
}

impl Lengths {
    /// Read the three length fields
    pub fn parse(input: &[u8]) -> Self {
        let field = |index: usize| {
            let bytes = padded_slice(input, (index * LENGTH_FIELD) as u64, LENGTH_FIELD);
            saturating_u64(U256::from_big_endian(&bytes))
        };
        Self {
            base: field(0),
            exponent: field(1),
            modulus: field(2),
        }
    }

    fn exponent_offset(&self) -> u64 {
        BASE_OFFSET.saturating_add(self.base)
    }

    fn modulus_offset(&self) -> u64 {
        self.exponent_offset().saturating_add(self.exponent)
    }
}

/// `len` bytes of `input` from `offset`, right-padded with zeros
fn padded_slice(input: &[u8], offset: u64, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    if let Ok(start) = usize::try_from(offset) {
        if start < input.len() {
            let available = (input.len() - start).min(len);
            out[..available].copy_from_slice(&input[start..start + available]);
        }
    }
    out
}

/// Multiplication complexity estimate for an operand of `x` bytes
pub fn multiplication_complexity(x: u64) -> u64 {
    let square = x.saturating_mul(x);
    if x <= 64 {
        square
    } else if x <= 1024 {
        (square / 4)
            .saturating_add(x.saturating_mul(96))
            .saturating_sub(3_072)
    } else {
        (square / 16)
            .saturating_add(x.saturating_mul(480))
            .saturating_sub(199_680)
    }
}

/// Bit length of the exponent as adjusted by EIP-198: the highest set bit
/// of its first 32 bytes, plus 8 per byte beyond those.
pub fn iteration_count(input: &[u8], lengths: &Lengths) -> u64 {
    let head_len = lengths.exponent.min(32) as usize;
    let head = padded_slice(input, lengths.exponent_offset(), head_len);
    let head_bits = (U256::from_big_endian(&head).bits() as u64).saturating_sub(1);
    if lengths.exponent <= 32 {
        head_bits
    } else {
        (lengths.exponent - 32)
            .saturating_mul(8)
            .saturating_add(head_bits)
    }
}

/// Numeric backend computing `base^exponent mod modulus`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModExpBackend {
    /// `num-bigint`; the reference path
    #[default]
    Portable,
    /// `malachite`
    Accelerated,
}

impl ModExpBackend {
    /// Minimal big-endian result; empty for zero and for a zero modulus.
    pub fn mod_exp(&self, base: &[u8], exponent: &[u8], modulus: &[u8]) -> Vec<u8> {
        match self {
            ModExpBackend::Portable => portable::mod_exp(base, exponent, modulus),
            ModExpBackend::Accelerated => accelerated::mod_exp(base, exponent, modulus),
        }
    }
}

mod portable {
    use num_bigint::BigUint;

    pub(super) fn mod_exp(base: &[u8], exponent: &[u8], modulus: &[u8]) -> Vec<u8> {
        let modulus = BigUint::from_bytes_be(modulus);
        if modulus.bits() == 0 {
            return Vec::new();
        }
        let base = BigUint::from_bytes_be(base);
        let exponent = BigUint::from_bytes_be(exponent);
        let result = base.modpow(&exponent, &modulus);
        if result.bits() == 0 {
            Vec::new()
        } else {
            result.to_bytes_be()
        }
    }
}

mod accelerated {
    use malachite::base::num::arithmetic::traits::ModPow;
    use malachite::base::num::basic::traits::Zero;
    use malachite::base::num::conversion::traits::PowerOf2Digits;
    use malachite::Natural;

    fn natural(bytes: &[u8]) -> Natural {
        Natural::from_power_of_2_digits_desc(8u64, bytes.iter().copied()).unwrap_or(Natural::ZERO)
    }

    pub(super) fn mod_exp(base: &[u8], exponent: &[u8], modulus: &[u8]) -> Vec<u8> {
        let modulus = natural(modulus);
        if modulus == Natural::ZERO {
            return Vec::new();
        }
        let exponent = natural(exponent);
        let result = if exponent == Natural::ZERO {
            Natural::from(1u8) % &modulus
        } else {
            (natural(base) % &modulus).mod_pow(&exponent, &modulus)
        };
        result.to_power_of_2_digits_desc(8)
    }
}

/// The MODEXP precompile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModExp {
    upper_bound: u64,
    backend: ModExpBackend,
}

impl ModExp {
    /// Declared lengths above `upper_bound` are rejected
    pub fn new(upper_bound: u64, backend: ModExpBackend) -> Self {
        Self {
            upper_bound,
            backend,
        }
    }

    /// Largest accepted declared length
    pub fn upper_bound(&self) -> u64 {
        self.upper_bound
    }

    /// Backend in use
    pub fn backend(&self) -> ModExpBackend {
        self.backend
    }

    /// Reject oversized declared lengths, whatever gas is available.
    pub fn check_bounds(&self, input: &[u8]) -> OpResult<()> {
        let lengths = Lengths::parse(input);
        if lengths.base > self.upper_bound
            || lengths.exponent > self.upper_bound
            || lengths.modulus > self.upper_bound
        {
            return Err(HaltReason::PrecompileError);
        }
        Ok(())
    }

    /// Compute the output. Lengths must already be within bounds.
    pub fn compute(&self, input: &[u8]) -> Vec<u8> {
        let lengths = Lengths::parse(input);
        if lengths.base == 0 && lengths.modulus == 0 {
            return Vec::new();
        }
        let modulus_len = lengths.modulus as usize;
        let mut output = vec![0u8; modulus_len];
        let modulus = operand(input, lengths.modulus_offset(), lengths.modulus);
        // A truncated exponent leaves the modulus all padding, so past this
        // point the exponent lies wholly inside the input.
        if modulus.iter().all(|byte| *byte == 0) {
            return output;
        }
        let base = operand(input, BASE_OFFSET, lengths.base);
        let exponent = operand(input, lengths.exponent_offset(), lengths.exponent);

        let result = self.backend.mod_exp(&base, &exponent, &modulus);
        let start = modulus_len.saturating_sub(result.len());
        output[start..].copy_from_slice(&result[result.len() - (modulus_len - start)..]);
        output
    }
}

/// Borrow `len` bytes of `input` from `offset`, padding only when the
/// input ends early.
fn operand(input: &[u8], offset: u64, len: u64) -> Cow<'_, [u8]> {
    let slice = usize::try_from(offset)
        .ok()
        .zip(usize::try_from(len).ok())
        .and_then(|(start, len)| input.get(start..start.checked_add(len)?));
    match slice {
        Some(bytes) => Cow::Borrowed(bytes),
        None => Cow::Owned(padded_slice(input, offset, len as usize)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(base: &[u8], exponent: &[u8], modulus: &[u8]) -> Vec<u8> {
        let mut input = Vec::new();
        for len in [base.len(), exponent.len(), modulus.len()] {
            let mut field = [0u8; 32];
            field[24..].copy_from_slice(&(len as u64).to_be_bytes());
            input.extend_from_slice(&field);
        }
        input.extend_from_slice(base);
        input.extend_from_slice(exponent);
        input.extend_from_slice(modulus);
        input
    }

    fn both(input: &[u8]) -> Vec<u8> {
        let portable = ModExp::new(u64::MAX, ModExpBackend::Portable).compute(input);
        let accelerated = ModExp::new(u64::MAX, ModExpBackend::Accelerated).compute(input);
        assert_eq!(portable, accelerated);
        portable
    }

    #[test]
    fn test_small_values() {
        assert_eq!(both(&encode(&[3], &[5], &[7])), vec![5]);
        assert_eq!(both(&encode(&[2], &[10], &[0x03, 0xe8])), vec![0x00, 0x18]);
    }

    #[test]
    fn test_empty_when_base_and_modulus_lengths_zero() {
        let input = encode(&[], &[0xff; 4], &[]);
        assert!(both(&input).is_empty());
    }

    #[test]
    fn test_truncated_exponent_reads_zero_modulus() {
        // declared exponent of 2^34 bytes, input ends right after the base
        let mut input = vec![0u8; 96];
        input[31] = 1;
        input[32 + 27] = 0x04;
        input[95] = 1;
        input.push(3);
        assert_eq!(both(&input), vec![0]);
    }

    #[test]
    fn test_zero_modulus_yields_zero_bytes() {
        assert_eq!(both(&encode(&[3], &[5], &[0, 0, 0])), vec![0, 0, 0]);
    }

    #[test]
    fn test_zero_exponent() {
        assert_eq!(both(&encode(&[9], &[], &[5])), vec![1]);
        assert_eq!(both(&encode(&[9], &[0], &[1])), vec![0]);
    }

    #[test]
    fn test_truncated_input_is_zero_padded() {
        // modulus declared 2 bytes, only 1 present: 0x05 -> 0x0500
        let mut input = encode(&[2], &[1], &[0x05, 0x00]);
        input.pop();
        assert_eq!(both(&input), vec![0x00, 0x02]);
    }

    #[test]
    fn test_upper_bound() {
        let modexp = ModExp::new(1024, ModExpBackend::Portable);
        let ok = encode(&[1; 1024], &[1], &[1]);
        assert_eq!(modexp.check_bounds(&ok), Ok(()));
        let too_big = encode(&[1; 1025], &[1], &[1]);
        assert_eq!(modexp.check_bounds(&too_big), Err(HaltReason::PrecompileError));
    }

    #[test]
    fn test_lengths_saturate() {
        let input = [0xffu8; 96];
        let lengths = Lengths::parse(&input);
        assert_eq!(lengths.base, u64::MAX);
        assert_eq!(lengths.modulus, u64::MAX);
    }

    #[test]
    fn test_multiplication_complexity_regimes() {
        assert_eq!(multiplication_complexity(0), 0);
        assert_eq!(multiplication_complexity(64), 4096);
        assert_eq!(multiplication_complexity(65), 65 * 65 / 4 + 65 * 96 - 3072);
        assert_eq!(multiplication_complexity(1024), 1024 * 1024 / 4 + 1024 * 96 - 3072);
        assert_eq!(multiplication_complexity(1025), 1025 * 1025 / 16 + 1025 * 480 - 199_680);
        assert_eq!(multiplication_complexity(u64::MAX), u64::MAX - 199_680);
    }

    #[test]
    fn test_iteration_count() {
        let input = encode(&[1], &[0x01, 0x00], &[1]);
        assert_eq!(iteration_count(&input, &Lengths::parse(&input)), 8);

        let mut long_exponent = vec![0u8; 33];
        long_exponent[0] = 0x80;
        let input = encode(&[1], &long_exponent, &[1]);
        assert_eq!(iteration_count(&input, &Lengths::parse(&input)), 8 + 255);

        let input = encode(&[1], &[0], &[1]);
        assert_eq!(iteration_count(&input, &Lengths::parse(&input)), 0);
    }
}
