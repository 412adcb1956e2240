//! # Ecrecover Precompile (0x01)
//!
//! Recovers the signer address from a secp256k1 signature.
//!
//! Input (right-padded to 128 bytes):
//! - bytes 0-31: message hash
//! - bytes 32-63: v, a full word that must equal 27 or 28
//! - bytes 64-95: r
//! - bytes 96-127: s
//!
//! Output is the address left-padded to 32 bytes, or empty when recovery
//! fails. A failed recovery is still a successful call.

use super::Precompile;
use crate::domain::services::{derive_address_from_pubkey, precompiles};
use crate::domain::value_objects::{Address, Bytes, EcdsaSignature};
use crate::errors::PrecompileError;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

const ECRECOVER_GAS: u64 = 3000;

/// Ecrecover precompile.
pub struct Ecrecover;

impl Precompile for Ecrecover {
    fn address(&self) -> Address {
        precompiles::ECRECOVER
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        ECRECOVER_GAS
    }

    fn run(&self, input: &[u8]) -> Result<Bytes, PrecompileError> {
        let mut padded = [0u8; 128];
        let len = input.len().min(128);
        padded[..len].copy_from_slice(&input[..len]);

        let output = recover(&padded).map_or_else(Bytes::new, |signer| {
            let mut word = vec![0u8; 32];
            word[12..].copy_from_slice(signer.as_bytes());
            Bytes::from_vec(word)
        });
        Ok(output)
    }
}

fn recover(input: &[u8; 128]) -> Option<Address> {
    let hash = &input[0..32];

    // v occupies a whole word; anything above the last byte is invalid
    if input[32..63].iter().any(|b| *b != 0) {
        return None;
    }
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&input[64..96]);
    s.copy_from_slice(&input[96..128]);
    let signature = EcdsaSignature::new(r, s, input[63]);

    let recovery_id = RecoveryId::from_byte(signature.recovery_id()?)?;
    let mut raw = [0u8; 64];
    raw[..32].copy_from_slice(&signature.r);
    raw[32..].copy_from_slice(&signature.s);
    let mut sig = Signature::from_slice(&raw).ok()?;

    // k256 only verifies low-s signatures; the flipped s recovers the same key
    // with the opposite y parity.
    let recovery_id = match sig.normalize_s() {
        Some(normalized) => {
            sig = normalized;
            RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced())
        }
        None => recovery_id,
    };

    let key = VerifyingKey::recover_from_prehash(hash, &sig, recovery_id).ok()?;
    let point = key.to_encoded_point(false);
    Some(derive_address_from_pubkey(&point.as_bytes()[1..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    fn signed_input(message_hash: [u8; 32]) -> ([u8; 128], Address) {
        let key = SigningKey::from_slice(&[0x11u8; 32]).unwrap();
        let (sig, recid) = key.sign_prehash_recoverable(&message_hash).unwrap();
        let point = key.verifying_key().to_encoded_point(false);
        let signer = derive_address_from_pubkey(&point.as_bytes()[1..]);

        let mut input = [0u8; 128];
        input[..32].copy_from_slice(&message_hash);
        input[63] = 27 + recid.to_byte();
        input[64..].copy_from_slice(&sig.to_bytes());
        (input, signer)
    }

    #[test]
    fn test_ecrecover_recovers_signer() {
        let (input, signer) = signed_input([0x42u8; 32]);
        let out = Ecrecover.run(&input).unwrap();
        assert_eq!(out.len(), 32);
        assert_eq!(&out.as_slice()[12..], signer.as_bytes());
        assert!(out.as_slice()[..12].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_ecrecover_invalid_v_returns_empty() {
        let (mut input, _) = signed_input([0x42u8; 32]);
        input[63] = 29;
        assert!(Ecrecover.run(&input).unwrap().is_empty());

        let (mut input, _) = signed_input([0x42u8; 32]);
        input[40] = 1;
        assert!(Ecrecover.run(&input).unwrap().is_empty());
    }

    #[test]
    fn test_ecrecover_zero_signature_returns_empty() {
        let mut input = [0u8; 128];
        input[63] = 27;
        assert!(Ecrecover.run(&input).unwrap().is_empty());
        assert!(Ecrecover.run(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_ecrecover_fixed_price() {
        assert_eq!(Ecrecover.required_gas(&[]), 3000);
        assert_eq!(Ecrecover.required_gas(&[0u8; 500]), 3000);
    }
}
