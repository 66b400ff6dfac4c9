//! Ed25519 transaction signatures.

use std::fmt;
use std::str::FromStr;

use crate::error::WireError;

/// Signature length in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// A 64-byte Ed25519 signature.
///
/// On the wire an unsigned slot is 64 zero bytes; in the model that slot is
/// `Option::<Signature>::None`. See [`Signature::from_slot`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    pub const fn new(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, WireError> {
        let arr: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|_| {
            WireError::InvalidSignatureEncoding(format!(
                "expected {SIGNATURE_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Interpret a raw signature slot: all zero bytes means "not signed yet".
    pub fn from_slot(slot: [u8; SIGNATURE_LEN]) -> Option<Self> {
        if slot.iter().all(|b| *b == 0) {
            None
        } else {
            Some(Self(slot))
        }
    }

    /// Inverse of [`Signature::from_slot`].
    pub fn to_slot(signature: Option<&Signature>) -> [u8; SIGNATURE_LEN] {
        signature.map(|s| s.0).unwrap_or([0u8; SIGNATURE_LEN])
    }

    pub fn to_bytes(self) -> [u8; SIGNATURE_LEN] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }
}

impl FromStr for Signature {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s).into_vec().map_err(|e| {
            WireError::InvalidSignatureEncoding(format!("base58 decode failed: {e}"))
        })?;
        Self::from_slice(&bytes)
    }
}

impl From<[u8; SIGNATURE_LEN]> for Signature {
    fn from(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_base58())
    }
}
