//! 256-bit word arithmetic.
//!
//! All operations wrap modulo 2^256 unless stated otherwise. Division and
//! modulo by zero yield zero. Signed operations read words as two's
//! complement.

use keel_primitives::{U256, U512};

/// Number of bits in a word
pub const WORD_BITS: u32 = 256;

/// The word for `true`/`false`
pub fn from_bool(value: bool) -> U256 {
    if value {
        U256::one()
    } else {
        U256::zero()
    }
}

/// Saturating conversion to `u64`.
pub fn saturating_u64(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.low_u64()
    }
}

/// Saturating conversion to `usize`.
pub fn saturating_usize(value: U256) -> usize {
    usize::try_from(saturating_u64(value)).unwrap_or(usize::MAX)
}

/// Wrapping addition
pub fn add(a: U256, b: U256) -> U256 {
    a.overflowing_add(b).0
}

/// Wrapping subtraction
pub fn sub(a: U256, b: U256) -> U256 {
    a.overflowing_sub(b).0
}

/// Wrapping multiplication
pub fn mul(a: U256, b: U256) -> U256 {
    a.overflowing_mul(b).0
}

/// Unsigned division, zero when `b` is zero
pub fn div(a: U256, b: U256) -> U256 {
    a.checked_div(b).unwrap_or_default()
}

/// `a mod b`, zero when `b` is zero. The result is always below a
/// nonzero `b`.
pub fn modulo(a: U256, b: U256) -> U256 {
    a.checked_rem(b).unwrap_or_default()
}

/// Whether the sign bit is set
pub fn is_negative(value: U256) -> bool {
    value.bit(255)
}

/// Two's-complement negation
pub fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

fn abs(value: U256) -> U256 {
    if is_negative(value) {
        negate(value)
    } else {
        value
    }
}

/// Signed division, truncating toward zero.
///
/// `MIN / -1` wraps back to `MIN`.
pub fn sdiv(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let quotient = abs(a) / abs(b);
    if is_negative(a) != is_negative(b) {
        negate(quotient)
    } else {
        quotient
    }
}

/// Signed modulo; the result takes the sign of the dividend.
pub fn smod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let remainder = abs(a) % abs(b);
    if is_negative(a) {
        negate(remainder)
    } else {
        remainder
    }
}

fn low_half(value: U512) -> U256 {
    let mut buf = [0u8; 64];
    value.to_big_endian(&mut buf);
    U256::from_big_endian(&buf[32..])
}

/// `(a + b) mod n` without intermediate wraparound
pub fn addmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    low_half((U512::from(a) + U512::from(b)) % U512::from(n))
}

/// `(a * b) mod n` without intermediate wraparound
pub fn mulmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    low_half(a.full_mul(b) % U512::from(n))
}

/// `base^exponent mod 2^256` by square-and-multiply.
pub fn exp(base: U256, exponent: U256) -> U256 {
    let mut result = U256::one();
    let mut square = base;
    for i in 0..exponent.bits() {
        if exponent.bit(i) {
            result = mul(result, square);
        }
        square = mul(square, square);
    }
    result
}

/// Number of significant bytes in `value`; zero for zero.
pub fn byte_length(value: U256) -> u64 {
    (value.bits() as u64 + 7) / 8
}

/// Replicate the sign bit of byte `index` (counted from the least
/// significant end) into every higher byte.
///
/// For `index >= 31`, including any index wider than one byte, `value` is
/// returned unchanged.
pub fn sign_extend(index: U256, value: U256) -> U256 {
    if index >= U256::from(31u8) {
        return value;
    }
    let sign_bit = index.low_u64() as usize * 8 + 7;
    let mask = (U256::one() << (sign_bit + 1)) - U256::one();
    if value.bit(sign_bit) {
        value | !mask
    } else {
        value & mask
    }
}

/// Byte `index` of `value`, counting from the most significant end.
pub fn byte(index: U256, value: U256) -> U256 {
    if index >= U256::from(32u8) {
        return U256::zero();
    }
    let shift = (31 - index.low_u64() as usize) * 8;
    (value >> shift) & U256::from(0xffu8)
}

/// Logical left shift; zero for shifts of 256 or more
pub fn shl(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(WORD_BITS) {
        U256::zero()
    } else {
        value << shift.low_u64() as usize
    }
}

/// Logical right shift; zero for shifts of 256 or more
pub fn shr(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(WORD_BITS) {
        U256::zero()
    } else {
        value >> shift.low_u64() as usize
    }
}

/// Arithmetic right shift
pub fn sar(shift: U256, value: U256) -> U256 {
    let negative = is_negative(value);
    if shift >= U256::from(WORD_BITS) {
        return if negative { U256::MAX } else { U256::zero() };
    }
    let shift = shift.low_u64() as usize;
    if negative {
        !((!value) >> shift)
    } else {
        value >> shift
    }
}

/// Signed less-than
pub fn slt(a: U256, b: U256) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

/// Signed greater-than
pub fn sgt(a: U256, b: U256) -> bool {
    slt(b, a)
}

/// Leading zero bits by scanning the 64-bit limbs from the top.
pub fn leading_zeros_scan(value: U256) -> u32 {
    let mut count = 0;
    for limb in value.0.iter().rev() {
        if *limb != 0 {
            return count + limb.leading_zeros();
        }
        count += 64;
    }
    count
}

/// Leading zero bits by trimming leading zero bytes first, then scanning
/// the first significant byte.
pub fn leading_zeros_trimmed(value: U256) -> u32 {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    match bytes.iter().position(|b| *b != 0) {
        Some(first) => first as u32 * 8 + bytes[first].leading_zeros(),
        None => WORD_BITS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn min_signed() -> U256 {
        U256::one() << 255
    }

    fn minus(n: u64) -> U256 {
        negate(U256::from(n))
    }

    #[test]
    fn test_modulo_basic() {
        assert_eq!(modulo(U256::from(5), U256::from(3)), U256::from(2));
        assert_eq!(modulo(U256::from(5), U256::zero()), U256::zero());
    }

    #[test]
    fn test_modulo_operand_equal_to_modulus() {
        assert_eq!(modulo(U256::from(7), U256::from(7)), U256::zero());
        assert_eq!(modulo(U256::MAX, U256::MAX), U256::zero());
    }

    #[test]
    fn test_modulo_max_width() {
        assert_eq!(modulo(U256::MAX, U256::from(2)), U256::one());
        assert_eq!(modulo(U256::MAX - 1, U256::MAX), U256::MAX - 1);
        assert_eq!(modulo(U256::zero(), U256::MAX), U256::zero());
    }

    #[test]
    fn test_wrapping_arithmetic() {
        assert_eq!(add(U256::MAX, U256::one()), U256::zero());
        assert_eq!(sub(U256::zero(), U256::one()), U256::MAX);
        assert_eq!(mul(U256::MAX, U256::from(2)), U256::MAX - 1);
        assert_eq!(div(U256::from(10), U256::zero()), U256::zero());
    }

    #[test]
    fn test_signed_division() {
        assert_eq!(sdiv(minus(10), U256::from(3)), minus(3));
        assert_eq!(sdiv(minus(10), minus(3)), U256::from(3));
        assert_eq!(sdiv(min_signed(), U256::MAX), min_signed());
        assert_eq!(sdiv(U256::from(1), U256::zero()), U256::zero());
    }

    #[test]
    fn test_signed_modulo() {
        assert_eq!(smod(minus(10), U256::from(3)), minus(1));
        assert_eq!(smod(U256::from(10), minus(3)), U256::one());
        assert_eq!(smod(minus(8), U256::zero()), U256::zero());
    }

    #[test]
    fn test_addmod_mulmod_no_wrap() {
        assert_eq!(
            addmod(U256::MAX, U256::from(2), U256::from(2)),
            U256::one()
        );
        assert_eq!(mulmod(U256::MAX, U256::MAX, U256::from(12)), U256::from(9));
        assert_eq!(mulmod(U256::from(3), U256::from(4), U256::zero()), U256::zero());
        assert_eq!(addmod(U256::from(3), U256::from(4), U256::zero()), U256::zero());
    }

    #[test]
    fn test_exp() {
        assert_eq!(exp(U256::from(2), U256::from(10)), U256::from(1024));
        assert_eq!(exp(U256::from(2), U256::from(256)), U256::zero());
        assert_eq!(exp(U256::zero(), U256::zero()), U256::one());
        assert_eq!(exp(U256::MAX, U256::from(2)), U256::one());
        assert_eq!(exp(U256::from(3), U256::MAX), U256::from(3).overflowing_pow(U256::MAX).0);
    }

    #[test]
    fn test_byte_length() {
        assert_eq!(byte_length(U256::zero()), 0);
        assert_eq!(byte_length(U256::from(0xff)), 1);
        assert_eq!(byte_length(U256::from(0x100)), 2);
        assert_eq!(byte_length(U256::MAX), 32);
    }

    #[test]
    fn test_sign_extend_low_byte() {
        assert_eq!(sign_extend(U256::zero(), U256::from(0xff)), U256::MAX);
        assert_eq!(sign_extend(U256::zero(), U256::from(0x7f)), U256::from(0x7f));
        assert_eq!(sign_extend(U256::zero(), U256::from(0x1ff)), U256::MAX);
        assert_eq!(sign_extend(U256::one(), U256::from(0x80ff)), !U256::from(0x7f00));
    }

    #[test]
    fn test_sign_extend_wide_index_unchanged() {
        let value = U256::from(0x80u64) << 200;
        assert_eq!(sign_extend(U256::from(31), value), value);
        assert_eq!(sign_extend(U256::from(0x1_0000u64), value), value);
        assert_eq!(sign_extend(U256::MAX, value), value);
    }

    #[test]
    fn test_byte_and_shifts() {
        let value = U256::from(0xabcdu64);
        assert_eq!(byte(U256::from(31), value), U256::from(0xcd));
        assert_eq!(byte(U256::from(30), value), U256::from(0xab));
        assert_eq!(byte(U256::from(32), value), U256::zero());
        assert_eq!(shl(U256::from(4), U256::one()), U256::from(16));
        assert_eq!(shl(U256::from(256), U256::one()), U256::zero());
        assert_eq!(shr(U256::from(4), U256::from(16)), U256::one());
        assert_eq!(sar(U256::from(4), minus(16)), minus(1));
        assert_eq!(sar(U256::from(300), minus(16)), U256::MAX);
        assert_eq!(sar(U256::from(300), U256::from(16)), U256::zero());
    }

    #[test]
    fn test_signed_comparison() {
        assert!(slt(minus(1), U256::zero()));
        assert!(!slt(U256::zero(), minus(1)));
        assert!(sgt(U256::one(), minus(5)));
        assert!(slt(minus(5), minus(1)));
    }

    #[test]
    fn test_leading_zeros_edges() {
        assert_eq!(leading_zeros_scan(U256::zero()), 256);
        assert_eq!(leading_zeros_trimmed(U256::zero()), 256);
        assert_eq!(leading_zeros_scan(min_signed()), 0);
        assert_eq!(leading_zeros_trimmed(min_signed()), 0);
        assert_eq!(leading_zeros_scan(U256::one()), 255);
        assert_eq!(leading_zeros_trimmed(U256::one()), 255);
        assert_eq!(leading_zeros_scan(U256::from(u64::MAX)), 192);
        assert_eq!(leading_zeros_trimmed(U256::from(u64::MAX)), 192);
    }

    #[test]
    fn test_saturating_conversions() {
        assert_eq!(saturating_u64(U256::MAX), u64::MAX);
        assert_eq!(saturating_u64(U256::from(42)), 42);
        assert_eq!(saturating_usize(U256::from(7)), 7);
    }
}
