//! Ed25519 keypairs for signing transactions.

use std::fmt;

use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use sol_wire::{Address, Signature};
use zeroize::{Zeroize, Zeroizing};

use crate::error::TxError;

/// Length of a secret key in the common 64-byte form: seed followed by the
/// public key.
pub const SECRET_KEY_LEN: usize = 64;

/// A signing key and the address it controls. The key material is wiped on
/// drop by `ed25519-dalek`.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a fresh keypair from the OS random source.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Build a keypair from a 32-byte Ed25519 seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let mut seed = *seed;
        let signing_key = SigningKey::from_bytes(&seed);
        seed.zeroize();
        Self { signing_key }
    }

    /// Build a keypair from the 64-byte `seed || public key` form. The public
    /// half must match the seed.
    pub fn from_secret_key(secret_key: &[u8]) -> Result<Self, TxError> {
        let bytes: Zeroizing<[u8; SECRET_KEY_LEN]> =
            Zeroizing::new(secret_key.try_into().map_err(|_| {
                TxError::InvalidKeypair(format!(
                    "expected {SECRET_KEY_LEN} bytes, got {}",
                    secret_key.len()
                ))
            })?);
        let signing_key = SigningKey::from_keypair_bytes(&bytes)
            .map_err(|_| TxError::InvalidKeypair("public key does not match seed".into()))?;
        Ok(Self { signing_key })
    }

    pub fn address(&self) -> Address {
        Address::new(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign_message(&self, message: &[u8]) -> Signature {
        Signature::new(self.signing_key.sign(message).to_bytes())
    }

    /// The 64-byte `seed || public key` form.
    pub fn to_bytes(&self) -> Zeroizing<[u8; SECRET_KEY_LEN]> {
        Zeroizing::new(self.signing_key.to_keypair_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({})", self.address())
    }
}
