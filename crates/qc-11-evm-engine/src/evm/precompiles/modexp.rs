//! # ModExp Precompile (0x05)
//!
//! Arbitrary-precision `base ^ exponent % modulus`.
//!
//! Input format:
//! - bytes 0-31: length of base (Bsize)
//! - bytes 32-63: length of exponent (Esize)
//! - bytes 64-95: length of modulus (Msize)
//! - then base, exponent and modulus, big-endian, zero-padded past the end
//!
//! Output is exactly Msize bytes. Pricing follows EIP-198 or, when the
//! revision enables it, EIP-2565.

use super::Precompile;
use crate::domain::services::precompiles;
use crate::domain::value_objects::{Address, Bytes, U256};
use crate::errors::PrecompileError;
use num_bigint::BigUint;

const EIP2565_MIN_GAS: u64 = 200;
const EIP198_DIVISOR: u128 = 20;
const EIP2565_DIVISOR: u128 = 3;

/// ModExp precompile.
pub struct ModExp {
    eip2565: bool,
}

impl ModExp {
    /// Creates the contract with EIP-2565 pricing on or off.
    #[must_use]
    pub const fn new(eip2565: bool) -> Self {
        Self { eip2565 }
    }
}

impl Precompile for ModExp {
    fn address(&self) -> Address {
        precompiles::MODEXP
    }

    fn required_gas(&self, input: &[u8]) -> u64 {
        let base_len = length_at(input, 0);
        let exp_len = length_at(input, 32);
        let mod_len = length_at(input, 64);

        let max_len = base_len.max(mod_len);
        let complexity = if self.eip2565 {
            let words = max_len.div_ceil(8);
            words.saturating_mul(words)
        } else {
            eip198_complexity(max_len)
        };
        let iterations = adjusted_exponent_length(input, base_len, exp_len).max(1);
        let divisor = if self.eip2565 {
            EIP2565_DIVISOR
        } else {
            EIP198_DIVISOR
        };

        let gas = complexity.saturating_mul(iterations) / divisor;
        let gas = u64::try_from(gas).unwrap_or(u64::MAX);
        if self.eip2565 {
            gas.max(EIP2565_MIN_GAS)
        } else {
            gas
        }
    }

    fn run(&self, input: &[u8]) -> Result<Bytes, PrecompileError> {
        let mod_len = usize_length(input, 64)?;
        if mod_len == 0 {
            return Ok(Bytes::new());
        }
        let base_len = usize_length(input, 0)?;
        let exp_len = usize_length(input, 32)?;

        let base_start = 96usize;
        let exp_start = base_start.saturating_add(base_len);
        let mod_start = exp_start.saturating_add(exp_len);

        let base = BigUint::from_bytes_be(&read_padded(input, base_start, base_len));
        let exponent = BigUint::from_bytes_be(&read_padded(input, exp_start, exp_len));
        let modulus = BigUint::from_bytes_be(&read_padded(input, mod_start, mod_len));

        let mut output = vec![0u8; mod_len];
        if modulus == BigUint::from(0u8) {
            return Ok(Bytes::from_vec(output));
        }
        let result = base.modpow(&exponent, &modulus).to_bytes_be();
        // result < modulus, so it always fits
        output[mod_len - result.len()..].copy_from_slice(&result);
        Ok(Bytes::from_vec(output))
    }
}

fn eip198_complexity(x: u128) -> u128 {
    if x <= 64 {
        x * x
    } else if x <= 1024 {
        x * x / 4 + 96 * x - 3072
    } else {
        x.saturating_mul(x) / 16 + x.saturating_mul(480) - 199_680
    }
}

/// Bit length of the exponent's leading word, minus one, plus eight per
/// byte beyond the first 32.
fn adjusted_exponent_length(input: &[u8], base_len: u128, exp_len: u128) -> u128 {
    let head_len = exp_len.min(32);
    let head = match usize::try_from(96u128.saturating_add(base_len)) {
        Ok(start) => {
            let bytes = read_padded(input, start, head_len as usize);
            let mut word = [0u8; 32];
            word[32 - bytes.len()..].copy_from_slice(&bytes);
            U256::from_big_endian(&word)
        }
        Err(_) => U256::zero(),
    };
    let head_bits = if head.is_zero() {
        0
    } else {
        u128::from(255 - head.leading_zeros())
    };
    let tail = exp_len.saturating_sub(32).saturating_mul(8);
    tail.saturating_add(head_bits)
}

fn length_at(input: &[u8], offset: usize) -> u128 {
    let mut word = [0u8; 32];
    word.copy_from_slice(&read_padded(input, offset, 32));
    let value = U256::from_big_endian(&word);
    if value > U256::from(u64::MAX) {
        u128::from(u64::MAX)
    } else {
        u128::from(value.low_u64())
    }
}

fn usize_length(input: &[u8], offset: usize) -> Result<usize, PrecompileError> {
    usize::try_from(length_at(input, offset))
        .map_err(|_| PrecompileError::InvalidInput("operand length out of range".to_string()))
}

fn read_padded(input: &[u8], offset: usize, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    if offset < input.len() {
        let available = (input.len() - offset).min(len);
        out[..available].copy_from_slice(&input[offset..offset + available]);
    }
    out
}
