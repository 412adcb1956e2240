//! # Domain Services
//!
//! Pure functions used by the dispatcher and the precompiles: hashing,
//! contract address derivation and revert payload decoding. No I/O, no
//! async, no state.

use crate::domain::value_objects::{Address, Hash, U256};
use sha3::{Digest, Keccak256};

// =============================================================================
// KECCAK256 UTILITY
// =============================================================================

/// Computes keccak256 hash of data.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    let hash = Keccak256::digest(data);
    Hash::new(hash.into())
}

// =============================================================================
// CONTRACT ADDRESS COMPUTATION
// =============================================================================

/// Computes the contract address for CREATE.
///
/// Address = keccak256(rlp(\[sender, nonce\]))\[12:\]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn create_address(sender: Address, nonce: u64) -> Address {
    let mut content = Vec::with_capacity(30);

    // 20-byte string header is 0x80 + 20
    content.push(0x94);
    content.extend_from_slice(sender.as_bytes());

    if nonce == 0 {
        content.push(0x80);
    } else if nonce < 0x80 {
        content.push(nonce as u8);
    } else {
        let raw = nonce.to_be_bytes();
        let nonce_bytes = trim_leading_zeros(&raw);
        content.push(0x80 + nonce_bytes.len() as u8);
        content.extend_from_slice(nonce_bytes);
    }

    // At most 1 + 20 + 1 + 8 bytes, always a short list
    let mut rlp = Vec::with_capacity(content.len() + 1);
    rlp.push(0xc0 + content.len() as u8);
    rlp.extend_from_slice(&content);

    address_from_hash(&keccak256(&rlp))
}

/// Computes the contract address for CREATE2.
///
/// Address = keccak256(0xff ++ sender ++ salt ++ keccak256(init_code))\[12:\]
#[must_use]
pub fn create2_address(sender: Address, salt: Hash, init_code: &[u8]) -> Address {
    let code_hash = keccak256(init_code);

    let mut data = Vec::with_capacity(85);
    data.push(0xff);
    data.extend_from_slice(sender.as_bytes());
    data.extend_from_slice(salt.as_bytes());
    data.extend_from_slice(code_hash.as_bytes());

    address_from_hash(&keccak256(&data))
}

/// Derives an address from an uncompressed public key without the 0x04 prefix.
#[must_use]
pub fn derive_address_from_pubkey(public_key: &[u8]) -> Address {
    address_from_hash(&keccak256(public_key))
}

fn address_from_hash(hash: &Hash) -> Address {
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash.as_bytes()[12..]);
    Address::new(addr)
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

// =============================================================================
// REVERT REASON
// =============================================================================

/// Decodes the standard `Error(string)` revert payload.
///
/// Returns `None` for custom errors, panics (`Panic(uint256)`) and
/// malformed payloads.
#[must_use]
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    const SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

    if data.len() < 4 + 64 || data[..4] != SELECTOR {
        return None;
    }

    let body = &data[4..];
    let offset = word_to_usize(&body[..32])?;
    let len_end = offset.checked_add(32)?;
    let len = word_to_usize(body.get(offset..len_end)?)?;
    let text = body.get(len_end..len_end.checked_add(len)?)?;

    String::from_utf8(text.to_vec()).ok()
}

fn word_to_usize(word: &[u8]) -> Option<usize> {
    let value = U256::from_big_endian(word);
    if value > U256::from(u32::MAX) {
        None
    } else {
        usize::try_from(value.low_u64()).ok()
    }
}

// =============================================================================
// PRECOMPILE ADDRESSES
// =============================================================================

/// Well-known precompile addresses.
pub mod precompiles {
    use super::Address;

    /// ecrecover (0x01)
    pub const ECRECOVER: Address =
        Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);

    /// SHA256 (0x02)
    pub const SHA256: Address =
        Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2]);

    /// RIPEMD160 (0x03)
    pub const RIPEMD160: Address =
        Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3]);

    /// Identity / data copy (0x04)
    pub const IDENTITY: Address =
        Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 4]);

    /// Modexp (0x05)
    pub const MODEXP: Address =
        Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5]);

    /// alt_bn128 point addition (0x06)
    pub const BN128_ADD: Address =
        Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 6]);

    /// alt_bn128 scalar multiplication (0x07)
    pub const BN128_MUL: Address =
        Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 7]);

    /// alt_bn128 pairing check (0x08)
    pub const BN128_PAIRING: Address =
        Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 8]);

    /// Blake2f (0x09)
    pub const BLAKE2F: Address =
        Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 9]);

    /// KZG point evaluation (0x0a)
    pub const POINT_EVALUATION: Address =
        Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 10]);
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(hex_str: &str) -> Address {
        Address::from_slice(&hex::decode(hex_str).unwrap()).unwrap()
    }

    #[test]
    fn test_create_address_known_vectors() {
        let sender = addr("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0");
        assert_eq!(
            create_address(sender, 0),
            addr("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d")
        );
        assert_eq!(
            create_address(sender, 1),
            addr("343c43a37d37dff08ae8c4a11544c718abb4fcf8")
        );
    }

    #[test]
    fn test_create_address_multi_byte_nonce() {
        let sender = addr("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0");
        assert_eq!(
            create_address(sender, 0x80),
            addr("08e190dcb7b73f5fcdabb43e102215c83659a76d")
        );
        assert_eq!(
            create_address(sender, 1_000),
            addr("b9cdb7f5e62043c1e4eb7a6d76ef8ee246d364ec")
        );
        assert_eq!(
            create_address(sender, 1 << 32),
            addr("f4bf328880432064068338f915c49f817dc4ce18")
        );
    }

    #[test]
    fn test_create2_eip1014_vectors() {
        assert_eq!(
            create2_address(Address::ZERO, Hash::ZERO, &[0x00]),
            addr("4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38")
        );
        assert_eq!(
            create2_address(Address::ZERO, Hash::ZERO, &[]),
            addr("e33c0c7f7df4809055c3eba6c09cfe4baf1bd9e0")
        );
    }

    #[test]
    fn test_create2_different_salt() {
        let sender = Address::new([1u8; 20]);
        let a = create2_address(sender, Hash::new([1u8; 32]), &[0x00]);
        let b = create2_address(sender, Hash::new([2u8; 32]), &[0x00]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(
            keccak256(&[]),
            crate::domain::entities::AccountState::EMPTY_CODE_HASH
        );
    }

    #[test]
    fn test_decode_revert_reason_rejects_truncated_payload() {
        assert!(decode_revert_reason(&[0x08, 0xc3, 0x79, 0xa0]).is_none());

        let mut payload = vec![0x08, 0xc3, 0x79, 0xa0];
        payload.extend_from_slice(&[0u8; 31]);
        payload.push(0x20);
        payload.extend_from_slice(&[0u8; 31]);
        payload.push(0xff); // claims 255 bytes of text
        assert!(decode_revert_reason(&payload).is_none());
    }
}
