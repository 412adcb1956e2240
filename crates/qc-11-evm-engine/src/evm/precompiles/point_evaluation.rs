//! # KZG Point Evaluation Precompile (0x0a)
//!
//! Verifies that a blob commitment opens to `y` at point `z` (EIP-4844).
//!
//! Input is exactly 192 bytes:
//! - bytes 0-31: versioned hash of the commitment
//! - bytes 32-63: z
//! - bytes 64-95: y
//! - bytes 96-143: commitment (compressed G1)
//! - bytes 144-191: proof (compressed G1)
//!
//! On success the output is the blob size in field elements followed by the
//! BLS12-381 scalar modulus, both as 32-byte words.

use super::Precompile;
use crate::domain::services::precompiles;
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::PrecompileError;
use kzg_rs::{Bytes32, Bytes48, KzgProof, KzgSettings};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

const POINT_EVALUATION_COST: u64 = 50_000;
const INPUT_LEN: usize = 192;
const VERSIONED_HASH_VERSION_KZG: u8 = 0x01;

const FIELD_ELEMENTS_PER_BLOB: u64 = 4096;
const BLS_MODULUS: [u8; 32] = [
    0x73, 0xed, 0xa7, 0x53, 0x29, 0x9d, 0x7d, 0x48, 0x33, 0x39, 0xd8, 0x08, 0x09, 0xa1, 0xd8, 0x05,
    0x53, 0xbd, 0xa4, 0x02, 0xff, 0xfe, 0x5b, 0xfe, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x01,
];

/// Trusted setup, loaded on first use and shared by every engine.
fn trusted_setup() -> Option<&'static KzgSettings> {
    static SETTINGS: OnceLock<Option<KzgSettings>> = OnceLock::new();
    SETTINGS
        .get_or_init(|| match KzgSettings::load_trusted_setup_file() {
            Ok(settings) => Some(settings),
            Err(error) => {
                tracing::error!(?error, "failed to load KZG trusted setup");
                None
            }
        })
        .as_ref()
}

/// KZG point evaluation precompile.
pub struct PointEvaluation;

impl Precompile for PointEvaluation {
    fn address(&self) -> Address {
        precompiles::POINT_EVALUATION
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        POINT_EVALUATION_COST
    }

    fn run(&self, input: &[u8]) -> Result<Bytes, PrecompileError> {
        if input.len() != INPUT_LEN {
            return Err(PrecompileError::InvalidInputLength {
                expected: INPUT_LEN,
                actual: input.len(),
            });
        }

        let commitment = &input[96..144];
        if input[..32] != versioned_hash(commitment) {
            return Err(PrecompileError::InvalidInput(
                "versioned hash does not match commitment".to_string(),
            ));
        }

        if !verify(commitment, &input[32..64], &input[64..96], &input[144..])? {
            return Err(PrecompileError::InvalidInput(
                "KZG proof does not verify".to_string(),
            ));
        }

        let mut output = vec![0u8; 64];
        output[24..32].copy_from_slice(&FIELD_ELEMENTS_PER_BLOB.to_be_bytes());
        output[32..].copy_from_slice(&BLS_MODULUS);
        Ok(Bytes::from_vec(output))
    }
}

/// `0x01 ++ sha256(commitment)[1..]`.
fn versioned_hash(commitment: &[u8]) -> [u8; 32] {
    let mut hash: [u8; 32] = Sha256::digest(commitment).into();
    hash[0] = VERSIONED_HASH_VERSION_KZG;
    hash
}

fn verify(commitment: &[u8], z: &[u8], y: &[u8], proof: &[u8]) -> Result<bool, PrecompileError> {
    let settings = trusted_setup()
        .ok_or_else(|| PrecompileError::InvalidInput("trusted setup unavailable".to_string()))?;
    let malformed = |_| PrecompileError::InvalidInput("malformed KZG input".to_string());

    let commitment = Bytes48::from_slice(commitment).map_err(malformed)?;
    let z = Bytes32::from_slice(z).map_err(malformed)?;
    let y = Bytes32::from_slice(y).map_err(malformed)?;
    let proof = Bytes48::from_slice(proof).map_err(malformed)?;

    // Field elements at or above the modulus and invalid points fail verification
    Ok(KzgProof::verify_kzg_proof(&commitment, &z, &y, &proof, settings).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    // versioned hash | z | y | commitment | proof
    const VALID_INPUT: &str = concat!(
        "01e798154708fe7789429634053cbf9f99b619f9f084048927333fce637f549b",
        "564c0a11a0f704f4fc3e8acfe0f8245f0ad1347b378fbf96e206da11a5d36306",
        "24d25032e67a7e6a4910df5834b8fe70e6bcfeeac0352434196bdf4b2485d5a1",
        "8f59a8d2a1a625a17f3fea0fe5eb8c896db3764f3185481bc22f91b4aaffcca2",
        "5f26936857bc3a7c2539ea8ec3a952b7873033e038326e87ed3e1276fd140253",
        "fa08e9fc25fb2d9a98527fc22a2c9612fbeafdad446cbc7bcdbdcd780af2c16a",
    );

    #[test]
    fn test_valid_proof_returns_blob_parameters() {
        let input = hex::decode(VALID_INPUT).unwrap();
        let out = PointEvaluation.run(&input).unwrap();
        assert_eq!(
            hex::encode(out.as_slice()),
            concat!(
                "0000000000000000000000000000000000000000000000000000000000001000",
                "73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001",
            )
        );
        assert_eq!(PointEvaluation.required_gas(&input), 50_000);
    }

    #[test]
    fn test_versioned_hash_mismatch_rejected() {
        let mut input = hex::decode(VALID_INPUT).unwrap();
        input[5] ^= 0xff;
        assert!(matches!(
            PointEvaluation.run(&input),
            Err(PrecompileError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_wrong_opening_rejected() {
        let mut input = hex::decode(VALID_INPUT).unwrap();
        // Change y; the hash still matches, the proof no longer does
        input[95] ^= 0x01;
        assert!(PointEvaluation.run(&input).is_err());
    }

    #[test]
    fn test_input_length_must_be_exact() {
        assert_eq!(
            PointEvaluation.run(&[0u8; 191]),
            Err(PrecompileError::InvalidInputLength {
                expected: 192,
                actual: 191
            })
        );
    }
}
