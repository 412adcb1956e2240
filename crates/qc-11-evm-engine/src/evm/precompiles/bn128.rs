//! # alt_bn128 Precompiles (0x06, 0x07, 0x08)
//!
//! Point addition, scalar multiplication and the optimal ate pairing check
//! on the BN254 curve (EIP-196, EIP-197), priced per EIP-1108.
//!
//! Field elements are 32-byte big-endian words and must be below the field
//! modulus. The point at infinity is encoded as all zeroes. Addition and
//! multiplication inputs are right-padded; pairing input must be a whole
//! number of 192-byte pairs.

use super::Precompile;
use crate::domain::services::precompiles;
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::PrecompileError;
use bn::{AffineG1, AffineG2, Fq, Fq2, Fr, Group, Gt, G1, G2};

const ADD_COST: u64 = 150;
const MUL_COST: u64 = 6_000;
const PAIRING_BASE_COST: u64 = 45_000;
const PAIRING_PER_PAIR_COST: u64 = 34_000;

const G1_LEN: usize = 64;
const PAIR_LEN: usize = 192;

/// G1 point addition.
pub struct Bn128Add;

/// G1 scalar multiplication.
pub struct Bn128Mul;

/// Pairing product check.
pub struct Bn128Pairing;

impl Precompile for Bn128Add {
    fn address(&self) -> Address {
        precompiles::BN128_ADD
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        ADD_COST
    }

    fn run(&self, input: &[u8]) -> Result<Bytes, PrecompileError> {
        let input = right_pad::<128>(input);
        let a = read_g1(&input[..G1_LEN])?;
        let b = read_g1(&input[G1_LEN..])?;
        encode_g1(a + b)
    }
}

impl Precompile for Bn128Mul {
    fn address(&self) -> Address {
        precompiles::BN128_MUL
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        MUL_COST
    }

    fn run(&self, input: &[u8]) -> Result<Bytes, PrecompileError> {
        let input = right_pad::<96>(input);
        let point = read_g1(&input[..G1_LEN])?;
        // Scalars are reduced modulo the group order
        let scalar = Fr::from_slice(&input[G1_LEN..])
            .map_err(|_| PrecompileError::InvalidInput("bad scalar".to_string()))?;
        encode_g1(point * scalar)
    }
}

impl Precompile for Bn128Pairing {
    fn address(&self) -> Address {
        precompiles::BN128_PAIRING
    }

    fn required_gas(&self, input: &[u8]) -> u64 {
        let pairs = (input.len() / PAIR_LEN) as u64;
        PAIRING_BASE_COST.saturating_add(PAIRING_PER_PAIR_COST.saturating_mul(pairs))
    }

    fn run(&self, input: &[u8]) -> Result<Bytes, PrecompileError> {
        if input.len() % PAIR_LEN != 0 {
            return Err(PrecompileError::InvalidInputLength {
                expected: (input.len() / PAIR_LEN + 1) * PAIR_LEN,
                actual: input.len(),
            });
        }

        let pairs = input
            .chunks_exact(PAIR_LEN)
            .map(|pair| Ok((read_g1(&pair[..G1_LEN])?, read_g2(&pair[G1_LEN..])?)))
            .collect::<Result<Vec<(G1, G2)>, PrecompileError>>()?;
        let holds = pairs.is_empty() || bn::pairing_batch(&pairs) == Gt::one();

        let mut word = vec![0u8; 32];
        word[31] = u8::from(holds);
        Ok(Bytes::from_vec(word))
    }
}

fn right_pad<const N: usize>(input: &[u8]) -> [u8; N] {
    let mut padded = [0u8; N];
    let len = input.len().min(N);
    padded[..len].copy_from_slice(&input[..len]);
    padded
}

fn read_fq(word: &[u8]) -> Result<Fq, PrecompileError> {
    Fq::from_slice(word)
        .map_err(|_| PrecompileError::InvalidInput("coordinate not in field".to_string()))
}

fn read_g1(bytes: &[u8]) -> Result<G1, PrecompileError> {
    let x = read_fq(&bytes[..32])?;
    let y = read_fq(&bytes[32..64])?;
    if x == Fq::zero() && y == Fq::zero() {
        return Ok(G1::zero());
    }
    AffineG1::new(x, y)
        .map(G1::from)
        .map_err(|_| PrecompileError::InvalidInput("G1 point not on curve".to_string()))
}

/// Reads a G2 point; each coordinate is encoded imaginary part first.
fn read_g2(bytes: &[u8]) -> Result<G2, PrecompileError> {
    let x = Fq2::new(read_fq(&bytes[32..64])?, read_fq(&bytes[..32])?);
    let y = Fq2::new(read_fq(&bytes[96..128])?, read_fq(&bytes[64..96])?);
    if x.is_zero() && y.is_zero() {
        return Ok(G2::zero());
    }
    AffineG2::new(x, y)
        .map(G2::from)
        .map_err(|_| PrecompileError::InvalidInput("G2 point not in subgroup".to_string()))
}

fn encode_g1(point: G1) -> Result<Bytes, PrecompileError> {
    let mut out = vec![0u8; G1_LEN];
    if let Some(affine) = AffineG1::from_jacobian(point) {
        affine
            .x()
            .to_big_endian(&mut out[..32])
            .and_then(|()| affine.y().to_big_endian(&mut out[32..]))
            .map_err(|_| PrecompileError::InvalidInput("point encoding".to_string()))?;
    }
    Ok(Bytes::from_vec(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_G_X: &str = "030644e72e131a029b85045b68181585d97816a916871ca8d3c208c16d87cfd3";
    const TWO_G_Y: &str = "15ed738c0e0a7c92e7845f96b2ae9c0a68a6a449e3538fc7ff3ebf7a5a18a2c4";

    // G2 generator as (x_im, x_re, y_im, y_re)
    const G2_GEN: &str = concat!(
        "198e9393920d483a7260bfb731fb5d25f1aa493335a9e71297e485b7aef312c2",
        "1800deef121f1e76426a00665e5c4479674322d4f75edadd46debd5cd992f6ed",
        "090689d0585ff075ec9e99ad690c3395bc4b313370b38ef355acdadcd122975b",
        "12c85ea5db8c6deb4aab71808dcb408fe3d1e7690c43d37b4ce6cc0166fa7daa",
    );
    const NEG_ONE_Y: &str = "30644e72e131a029b85045b68181585d97816a916871ca8d3c208c16d87cfd45";

    fn word(value: u8) -> String {
        format!("{value:064x}")
    }

    fn generator() -> String {
        format!("{}{}", word(1), word(2))
    }

    #[test]
    fn test_add_generator_to_itself() {
        let input = hex::decode(format!("{}{}", generator(), generator())).unwrap();
        let out = Bn128Add.run(&input).unwrap();
        assert_eq!(hex::encode(out.as_slice()), format!("{TWO_G_X}{TWO_G_Y}"));
        assert_eq!(Bn128Add.required_gas(&input), 150);
    }

    #[test]
    fn test_add_of_infinities_is_infinity() {
        let out = Bn128Add.run(&[0u8; 128]).unwrap();
        assert_eq!(out.as_slice(), &[0u8; 64]);
        assert_eq!(Bn128Add.run(&[]).unwrap().len(), 64);
    }

    #[test]
    fn test_mul_by_two_matches_doubling() {
        let input = hex::decode(format!("{}{}", generator(), word(2))).unwrap();
        let out = Bn128Mul.run(&input).unwrap();
        assert_eq!(hex::encode(out.as_slice()), format!("{TWO_G_X}{TWO_G_Y}"));
        assert_eq!(Bn128Mul.required_gas(&input), 6_000);
    }

    #[test]
    fn test_point_off_curve_rejected() {
        let input = hex::decode(format!("{}{}", word(1), word(3))).unwrap();
        assert!(matches!(
            Bn128Add.run(&input),
            Err(PrecompileError::InvalidInput(_))
        ));
        assert!(Bn128Mul.run(&input).is_err());
    }

    #[test]
    fn test_pairing_of_point_and_its_negation_holds() {
        let input = hex::decode(format!(
            "{}{G2_GEN}{}{NEG_ONE_Y}{G2_GEN}",
            generator(),
            word(1)
        ))
        .unwrap();
        let out = Bn128Pairing.run(&input).unwrap();
        assert_eq!(out.as_slice()[31], 1);
        assert_eq!(Bn128Pairing.required_gas(&input), 45_000 + 2 * 34_000);
    }

    #[test]
    fn test_single_generator_pairing_fails_check() {
        let input = hex::decode(format!("{}{G2_GEN}", generator())).unwrap();
        let out = Bn128Pairing.run(&input).unwrap();
        assert_eq!(out.as_slice(), &[0u8; 32]);
    }

    #[test]
    fn test_empty_pairing_holds() {
        let out = Bn128Pairing.run(&[]).unwrap();
        assert_eq!(out.as_slice()[31], 1);
        assert_eq!(Bn128Pairing.required_gas(&[]), 45_000);
    }

    #[test]
    fn test_pairing_rejects_partial_pair() {
        assert!(matches!(
            Bn128Pairing.run(&[0u8; 100]),
            Err(PrecompileError::InvalidInputLength { actual: 100, .. })
        ));
    }
}
