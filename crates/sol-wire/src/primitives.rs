//! Field codecs used by account layouts rather than by transactions:
//! fixed-width strings, borsh strings, SPL `COption`s and Anchor
//! discriminators.

use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::cursor::{WireReader, WireWriter};
use crate::error::WireError;

/// Anchor discriminator length.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Read a UTF-8 string stored in exactly `width` bytes, dropping NUL padding.
pub fn read_fixed_utf8(reader: &mut WireReader<'_>, width: usize) -> Result<String, WireError> {
    let raw = reader.read_bytes(width)?;
    let text = std::str::from_utf8(raw)
        .map_err(|e| WireError::MalformedMessage(format!("fixed string is not utf-8: {e}")))?;
    Ok(text.trim_end_matches('\0').to_string())
}

/// Write `value` into exactly `width` bytes, zero padded or truncated.
pub fn write_fixed_utf8(writer: &mut WireWriter, value: &str, width: usize) {
    let bytes = value.as_bytes();
    let take = bytes.len().min(width);
    writer.put_bytes(&bytes[..take]);
    writer.put_bytes(&vec![0u8; width - take]);
}

/// Read a borsh string: `u32` LE byte length, then UTF-8 bytes.
pub fn read_borsh_string(reader: &mut WireReader<'_>) -> Result<String, WireError> {
    let len = reader.read_u32()? as usize;
    let raw = reader.read_bytes(len)?;
    String::from_utf8(raw.to_vec())
        .map_err(|e| WireError::MalformedMessage(format!("borsh string is not utf-8: {e}")))
}

pub fn write_borsh_string(writer: &mut WireWriter, value: &str) {
    writer.put_u32(value.len() as u32);
    writer.put_bytes(value.as_bytes());
}

/// Read an SPL `COption<Address>`: a `u32` tag followed by the payload, which
/// occupies its 32 bytes whether or not the tag is set.
pub fn read_coption_address(reader: &mut WireReader<'_>) -> Result<Option<Address>, WireError> {
    let present = read_coption_tag(reader)?;
    let address = reader.read_address()?;
    Ok(present.then_some(address))
}

/// `COption<u64>`, same convention as [`read_coption_address`].
pub fn read_coption_u64(reader: &mut WireReader<'_>) -> Result<Option<u64>, WireError> {
    let present = read_coption_tag(reader)?;
    let value = reader.read_u64()?;
    Ok(present.then_some(value))
}

fn read_coption_tag(reader: &mut WireReader<'_>) -> Result<bool, WireError> {
    match reader.read_u32()? {
        0 => Ok(false),
        1 => Ok(true),
        tag => Err(WireError::MalformedMessage(format!(
            "invalid COption tag {tag}"
        ))),
    }
}

pub fn write_coption_address(writer: &mut WireWriter, value: Option<&Address>) {
    writer.put_u32(value.is_some() as u32);
    writer.put_address(value.unwrap_or(&Address::NULL));
}

pub fn write_coption_u64(writer: &mut WireWriter, value: Option<u64>) {
    writer.put_u32(value.is_some() as u32);
    writer.put_u64(value.unwrap_or_default());
}

/// Anchor instruction discriminator: `sha256("global:<ix_name>")[..8]`.
/// `ix_name` is snake_case.
pub fn instruction_discriminator(ix_name: &str) -> [u8; DISCRIMINATOR_LEN] {
    sighash("global", ix_name)
}

/// Anchor account discriminator: `sha256("account:<AccountName>")[..8]`.
/// `account_name` is PascalCase.
pub fn account_discriminator(account_name: &str) -> [u8; DISCRIMINATOR_LEN] {
    sighash("account", account_name)
}

fn sighash(namespace: &str, name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

/// Consume a discriminator and check it matches `expected`.
pub fn read_discriminator(
    reader: &mut WireReader<'_>,
    expected: &[u8; DISCRIMINATOR_LEN],
) -> Result<(), WireError> {
    let found = reader.read_array::<DISCRIMINATOR_LEN>()?;
    if &found != expected {
        return Err(WireError::MalformedMessage(format!(
            "discriminator mismatch: expected {expected:02x?}, found {found:02x?}"
        )));
    }
    Ok(())
}

/// Consume a single-byte discriminator, as used by the SPL programs.
pub fn read_discriminator_u8(reader: &mut WireReader<'_>, expected: u8) -> Result<(), WireError> {
    let found = reader.read_u8()?;
    if found != expected {
        return Err(WireError::MalformedMessage(format!(
            "discriminator mismatch: expected {expected}, found {found}"
        )));
    }
    Ok(())
}
