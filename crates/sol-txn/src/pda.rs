//! Program Derived Addresses.
//!
//! A PDA is `SHA-256(seed_0 || ... || seed_n || program_id || "ProgramDerivedAddress")`
//! with the extra requirement that the digest is NOT a valid Ed25519 point,
//! so no private key can exist for it.

use log::trace;
use sha2::{Digest, Sha256};
use sol_wire::Address;

use crate::error::TxError;

/// Longest allowed single seed.
pub const MAX_SEED_LEN: usize = 32;

/// Appended after the program id in every derivation.
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Derive the address for exactly these seeds.
///
/// Fails with `AddressOnCurve` when the digest happens to be a curve point;
/// callers that need a guaranteed result use [`find_program_address`].
pub fn create_program_address(seeds: &[&[u8]], program_id: &Address) -> Result<Address, TxError> {
    let mut hasher = Sha256::new();

    for (index, seed) in seeds.iter().enumerate() {
        if seed.len() > MAX_SEED_LEN {
            return Err(TxError::SeedTooLong {
                index,
                len: seed.len(),
            });
        }
        hasher.update(seed);
    }
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return Err(TxError::AddressOnCurve);
    }

    Ok(Address::new(hash))
}

/// Search bump seeds from 255 down to 1, appended as one extra trailing
/// seed, and return the first off-curve address with its bump.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<(Address, u8), TxError> {
    for bump in (1u8..=255).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
        with_bump.extend_from_slice(seeds);
        with_bump.push(&bump_seed);

        match create_program_address(&with_bump, program_id) {
            Ok(address) => return Ok((address, bump)),
            Err(TxError::AddressOnCurve) => trace!("bump {bump} lands on curve, trying next"),
            Err(e) => return Err(e),
        }
    }

    Err(TxError::NoViableBump)
}

/// Check if 32 bytes represent a valid Ed25519 curve point.
///
/// Uses `curve25519-dalek` to attempt decompression. If it succeeds, the
/// point is on the curve.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}
