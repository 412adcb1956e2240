//! # Value Objects
//!
//! Immutable primitives shared by every layer of the engine: addresses,
//! hashes, storage words and byte buffers.
//!
//! The fixed-width types are generated by one macro so that they agree on
//! layout, hex formatting and conversions. Word-sized types additionally
//! convert to and from [`U256`] big-endian, which is how the interpreter
//! moves them on and off the operand stack.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

pub use primitive_types::{U256, U512};

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("0x")?;
    bytes.iter().try_for_each(|byte| write!(f, "{byte:02x}"))
}

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:literal) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// All bytes zero.
            pub const ZERO: Self = Self([0u8; $len]);

            /// Wraps a byte array.
            #[must_use]
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Copies an exactly-sized slice; `None` for any other length.
            #[must_use]
            pub fn from_slice(slice: &[u8]) -> Option<Self> {
                <[u8; $len]>::try_from(slice).ok().map(Self)
            }

            /// Borrow the raw bytes.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// True when every byte is zero.
            #[must_use]
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|byte| *byte == 0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write_hex(f, &self.0)
            }
        }

        impl fmt::Display for $name {
            /// Abbreviated form: first four and last two bytes.
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write_hex(f, &self.0[..4])?;
                f.write_str("..")?;
                self.0[$len - 2..]
                    .iter()
                    .try_for_each(|byte| write!(f, "{byte:02x}"))
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl From<$name> for [u8; $len] {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

macro_rules! word_conversions {
    ($($name:ident),+) => {$(
        impl $name {
            /// Big-endian bytes of a stack word.
            #[must_use]
            pub fn from_u256(value: U256) -> Self {
                let mut bytes = [0u8; 32];
                value.to_big_endian(&mut bytes);
                Self(bytes)
            }

            /// The bytes read back as a big-endian stack word.
            #[must_use]
            pub fn to_u256(&self) -> U256 {
                U256::from_big_endian(&self.0)
            }
        }

        impl From<U256> for $name {
            fn from(value: U256) -> Self {
                Self::from_u256(value)
            }
        }
    )+};
}

fixed_bytes!(
    /// A 20-byte account address.
    Address,
    20
);
fixed_bytes!(
    /// A 32-byte hash (Keccak-256 unless stated otherwise).
    Hash,
    32
);
fixed_bytes!(
    /// A 32-byte storage slot key.
    StorageKey,
    32
);
fixed_bytes!(
    /// A 32-byte storage slot value.
    StorageValue,
    32
);

word_conversions!(Hash, StorageKey, StorageValue);

impl Address {
    /// Address whose low eight bytes hold `value`, e.g. precompile `0x..01`.
    #[must_use]
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Low 20 bytes of a stack word; the high 12 bytes are dropped.
    #[must_use]
    pub fn from_word(word: U256) -> Self {
        let word = Hash::from_u256(word);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word.0[12..]);
        Self(bytes)
    }

    /// The address zero-extended to a stack word.
    #[must_use]
    pub fn to_word(&self) -> U256 {
        U256::from_big_endian(&self.0)
    }
}

// =============================================================================
// BYTES
// =============================================================================

/// Owned byte buffer for calldata, return data and code.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    /// Empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Takes ownership of `vec`.
    #[must_use]
    pub fn from_vec(vec: Vec<u8>) -> Self {
        Self(vec)
    }

    /// Copies `slice`.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Self {
        Self(slice.to_vec())
    }

    /// Gives the vector back.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Borrow as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for an empty buffer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(vec: Vec<u8>) -> Self {
        Self(vec)
    }
}

impl From<&[u8]> for Bytes {
    fn from(slice: &[u8]) -> Self {
        Self::from_slice(slice)
    }
}

impl fmt::Debug for Bytes {
    /// Short buffers print in full; longer ones print a prefix and length.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const SHOWN: usize = 8;
        if self.0.len() <= SHOWN {
            write_hex(f, &self.0)
        } else {
            write_hex(f, &self.0[..SHOWN / 2])?;
            write!(f, "..({} bytes)", self.0.len())
        }
    }
}

// =============================================================================
// ECDSA SIGNATURE
// =============================================================================

/// Signature in the `(r, s, v)` layout ecrecover reads from its input.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct EcdsaSignature {
    /// r component.
    pub r: [u8; 32],
    /// s component.
    pub s: [u8; 32],
    /// Legacy recovery byte, 27 or 28 when valid.
    pub v: u8,
}

impl EcdsaSignature {
    /// Assembles a signature from its parts.
    #[must_use]
    pub const fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        Self { r, s, v }
    }

    /// `v` mapped to 0 or 1; `None` for anything but 27 or 28.
    #[must_use]
    pub const fn recovery_id(&self) -> Option<u8> {
        match self.v {
            27 | 28 => Some(self.v - 27),
            _ => None,
        }
    }
}
