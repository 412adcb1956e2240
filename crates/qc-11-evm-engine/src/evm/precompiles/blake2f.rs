//! # BLAKE2 F Precompile (0x09)
//!
//! The BLAKE2b compression function with a caller-chosen round count
//! (EIP-152).
//!
//! Input is exactly 213 bytes:
//! - bytes 0-3: rounds, big-endian u32
//! - bytes 4-67: state vector h, eight little-endian u64
//! - bytes 68-195: message block m, sixteen little-endian u64
//! - bytes 196-211: offset counters t, two little-endian u64
//! - byte 212: final block flag, 0 or 1

use super::Precompile;
use crate::domain::services::precompiles;
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::PrecompileError;

const INPUT_LENGTH: usize = 213;
const ROUND_COST: u64 = 1;

const IV: [u64; 8] = [
    0x6a09_e667_f3bc_c908,
    0xbb67_ae85_84ca_a73b,
    0x3c6e_f372_fe94_f82b,
    0xa54f_f53a_5f1d_36f1,
    0x510e_527f_ade6_82d1,
    0x9b05_688c_2b3e_6c1f,
    0x1f83_d9ab_fb41_bd6b,
    0x5be0_cd19_137e_2179,
];

const SIGMA: [[usize; 16]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
    [11, 8, 12, 0, 5, 2, 15, 13, 10, 14, 3, 6, 7, 1, 9, 4],
    [7, 9, 3, 1, 13, 12, 11, 14, 2, 6, 5, 10, 4, 0, 15, 8],
    [9, 0, 5, 7, 2, 4, 10, 15, 14, 1, 11, 12, 6, 8, 3, 13],
    [2, 12, 6, 10, 0, 11, 8, 3, 4, 13, 7, 5, 15, 14, 1, 9],
    [12, 5, 1, 15, 14, 13, 4, 10, 0, 7, 6, 3, 9, 2, 8, 11],
    [13, 11, 7, 14, 12, 1, 3, 9, 5, 0, 15, 4, 8, 6, 2, 10],
    [6, 15, 14, 9, 11, 3, 0, 8, 12, 2, 13, 7, 1, 4, 10, 5],
    [10, 2, 8, 4, 7, 6, 1, 5, 15, 11, 9, 14, 3, 12, 13, 0],
];

/// BLAKE2b F precompile.
pub struct Blake2f;

impl Precompile for Blake2f {
    fn address(&self) -> Address {
        precompiles::BLAKE2F
    }

    fn required_gas(&self, input: &[u8]) -> u64 {
        if input.len() < 4 {
            return 0;
        }
        let rounds = u32::from_be_bytes([input[0], input[1], input[2], input[3]]);
        u64::from(rounds) * ROUND_COST
    }

    fn run(&self, input: &[u8]) -> Result<Bytes, PrecompileError> {
        if input.len() != INPUT_LENGTH {
            return Err(PrecompileError::InvalidInputLength {
                expected: INPUT_LENGTH,
                actual: input.len(),
            });
        }
        let final_block = match input[212] {
            0 => false,
            1 => true,
            flag => {
                return Err(PrecompileError::InvalidInput(format!(
                    "final block flag must be 0 or 1, got {flag}"
                )))
            }
        };

        let rounds = u32::from_be_bytes([input[0], input[1], input[2], input[3]]);
        let mut h = [0u64; 8];
        for (i, word) in h.iter_mut().enumerate() {
            *word = le_u64(&input[4 + i * 8..]);
        }
        let mut m = [0u64; 16];
        for (i, word) in m.iter_mut().enumerate() {
            *word = le_u64(&input[68 + i * 8..]);
        }
        let t = [le_u64(&input[196..]), le_u64(&input[204..])];

        compress(&mut h, &m, t, final_block, rounds);

        let mut output = Vec::with_capacity(64);
        for word in h {
            output.extend_from_slice(&word.to_le_bytes());
        }
        Ok(Bytes::from_vec(output))
    }
}

fn le_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

/// BLAKE2b compression function F.
fn compress(h: &mut [u64; 8], m: &[u64; 16], t: [u64; 2], final_block: bool, rounds: u32) {
    let mut v = [0u64; 16];
    v[..8].copy_from_slice(h);
    v[8..].copy_from_slice(&IV);
    v[12] ^= t[0];
    v[13] ^= t[1];
    if final_block {
        v[14] = !v[14];
    }

    for round in 0..rounds as usize {
        let s = &SIGMA[round % 10];
        mix(&mut v, 0, 4, 8, 12, m[s[0]], m[s[1]]);
        mix(&mut v, 1, 5, 9, 13, m[s[2]], m[s[3]]);
        mix(&mut v, 2, 6, 10, 14, m[s[4]], m[s[5]]);
        mix(&mut v, 3, 7, 11, 15, m[s[6]], m[s[7]]);
        mix(&mut v, 0, 5, 10, 15, m[s[8]], m[s[9]]);
        mix(&mut v, 1, 6, 11, 12, m[s[10]], m[s[11]]);
        mix(&mut v, 2, 7, 8, 13, m[s[12]], m[s[13]]);
        mix(&mut v, 3, 4, 9, 14, m[s[14]], m[s[15]]);
    }

    for i in 0..8 {
        h[i] ^= v[i] ^ v[i + 8];
    }
}

#[allow(clippy::many_single_char_names)]
fn mix(v: &mut [u64; 16], a: usize, b: usize, c: usize, d: usize, x: u64, y: u64) {
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(x);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(24);
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(y);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(63);
}
