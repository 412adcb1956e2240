//! # Word Arithmetic
//!
//! 256-bit helpers for the instructions that are more than one `U256`
//! operator. Signed instructions read words as two's complement; every
//! result wraps modulo 2^256.

use crate::domain::value_objects::{U256, U512};

fn is_negative(value: U256) -> bool {
    value.bit(255)
}

fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

fn magnitude(value: U256) -> U256 {
    if is_negative(value) {
        negate(value)
    } else {
        value
    }
}

/// DIV; division by zero yields zero.
#[must_use]
pub fn div(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        U256::zero()
    } else {
        a / b
    }
}

/// MOD; modulo zero yields zero.
#[must_use]
pub fn rem(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        U256::zero()
    } else {
        a % b
    }
}

/// SDIV, truncating toward zero. `-2^255 / -1` wraps to `-2^255`.
#[must_use]
pub fn sdiv(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let quotient = magnitude(a) / magnitude(b);
    if is_negative(a) == is_negative(b) {
        quotient
    } else {
        negate(quotient)
    }
}

/// SMOD; the result takes the sign of the dividend.
#[must_use]
pub fn smod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let remainder = magnitude(a) % magnitude(b);
    if is_negative(a) {
        negate(remainder)
    } else {
        remainder
    }
}

/// ADDMOD computed without intermediate overflow.
#[must_use]
pub fn addmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    narrow((widen(a) + widen(b)) % widen(n))
}

/// MULMOD computed without intermediate overflow.
#[must_use]
pub fn mulmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    narrow((widen(a) * widen(b)) % widen(n))
}

/// EXP by squaring, wrapping.
#[must_use]
pub fn exp(base: U256, mut exponent: U256) -> U256 {
    let mut result = U256::one();
    let mut base = base;
    while !exponent.is_zero() {
        if exponent.bit(0) {
            result = result.overflowing_mul(base).0;
        }
        exponent >>= 1;
        base = base.overflowing_mul(base).0;
    }
    result
}

/// SIGNEXTEND from byte `index` (0 = least significant).
#[must_use]
pub fn signextend(index: U256, value: U256) -> U256 {
    if index >= U256::from(31) {
        return value;
    }
    let sign_bit = 8 * index.low_u64() as usize + 7;
    let mask = (U256::one() << (sign_bit + 1)) - U256::one();
    if value.bit(sign_bit) {
        value | !mask
    } else {
        value & mask
    }
}

/// SLT.
#[must_use]
pub fn slt(a: U256, b: U256) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

/// BYTE: byte `index` of `value` counted from the most significant end.
#[must_use]
pub fn byte(index: U256, value: U256) -> U256 {
    if index >= U256::from(32) {
        return U256::zero();
    }
    U256::from(value.byte(31 - index.low_u64() as usize))
}

/// SHL; shifts of 256 or more yield zero.
#[must_use]
pub fn shl(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256) {
        U256::zero()
    } else {
        value << shift.low_u64() as usize
    }
}

/// SHR; shifts of 256 or more yield zero.
#[must_use]
pub fn shr(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256) {
        U256::zero()
    } else {
        value >> shift.low_u64() as usize
    }
}

/// SAR, filling with the sign bit.
#[must_use]
pub fn sar(shift: U256, value: U256) -> U256 {
    let negative = is_negative(value);
    if shift >= U256::from(256) {
        return if negative { U256::MAX } else { U256::zero() };
    }
    let shift = shift.low_u64() as usize;
    let shifted = value >> shift;
    if negative && shift > 0 {
        shifted | (U256::MAX << (256 - shift))
    } else {
        shifted
    }
}

fn widen(value: U256) -> U512 {
    let mut bytes = [0u8; 64];
    value.to_big_endian(&mut bytes[32..]);
    U512::from_big_endian(&bytes)
}

fn narrow(value: U512) -> U256 {
    let mut bytes = [0u8; 64];
    value.to_big_endian(&mut bytes);
    U256::from_big_endian(&bytes[32..])
}
