//! Compact length prefixes.
//!
//! Every array in the transaction format is prefixed by its length encoded as
//! little-endian base-128 groups: the low 7 bits of each byte carry data and
//! the high bit means "another byte follows".
//!
//! ```text
//!   0x00..=0x7f        -> 1 byte
//!   0x80..=0x3fff      -> 2 bytes
//!   0x4000..=0x1fffff  -> 3 bytes
//! ```
//!
//! Solana itself caps these at `u16`, but the decoder here accepts any width
//! that fits a `usize`.

use crate::error::WireError;

const DATA_MASK: u8 = 0x7f;
const CONTINUE_BIT: u8 = 0x80;

/// Encode `value` as a compact length prefix.
pub fn encode_length(value: usize) -> Vec<u8> {
    let mut rem = value;
    let mut out = Vec::with_capacity(encoded_length_len(value));

    loop {
        let mut byte = (rem & DATA_MASK as usize) as u8;
        rem >>= 7;
        if rem > 0 {
            byte |= CONTINUE_BIT;
        }
        out.push(byte);
        if rem == 0 {
            break;
        }
    }

    out
}

/// Number of bytes `encode_length(value)` produces.
pub fn encoded_length_len(value: usize) -> usize {
    let bits = (usize::BITS - value.leading_zeros()) as usize;
    bits.div_ceil(7).max(1)
}

/// Decode a compact length prefix starting at `offset`.
///
/// Returns `(value, bytes_consumed)`.
pub fn decode_length(data: &[u8], offset: usize) -> Result<(usize, usize), WireError> {
    let mut value: usize = 0;
    let mut consumed = 0usize;

    loop {
        let byte = match data.get(offset + consumed) {
            Some(byte) => *byte,
            None => {
                return Err(WireError::TruncatedInput {
                    needed: consumed + 1,
                    remaining: data.len().saturating_sub(offset),
                })
            }
        };

        let group = (byte & DATA_MASK) as usize;
        let shift = 7 * consumed as u32;
        if shift >= usize::BITS {
            if group != 0 {
                return Err(WireError::MalformedMessage(
                    "compact length overflows usize".into(),
                ));
            }
        } else {
            let part = group << shift;
            if part >> shift != group {
                return Err(WireError::MalformedMessage(
                    "compact length overflows usize".into(),
                ));
            }
            value |= part;
        }

        consumed += 1;
        if byte & CONTINUE_BIT == 0 {
            break;
        }
    }

    Ok((value, consumed))
}
