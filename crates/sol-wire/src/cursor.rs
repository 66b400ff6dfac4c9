//! Byte cursor and writer shared by every codec in this crate.
//!
//! `WireReader` walks an immutable slice with an explicit `position`; each
//! `read_*` either advances past the field or returns an error and leaves the
//! position where the field started. `WireWriter` is append-only.

use crate::address::{Address, ADDRESS_LEN};
use crate::error::WireError;
use crate::signature::{Signature, SIGNATURE_LEN};
use crate::varint::{decode_length, encode_length};

#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Start reading at `position` instead of the beginning.
    pub fn at(data: &'a [u8], position: usize) -> Self {
        Self { data, position }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Everything from the current position to the end, without advancing.
    pub fn rest(&self) -> &'a [u8] {
        self.data.get(self.position..).unwrap_or(&[])
    }

    /// Look at the next byte without advancing.
    pub fn peek_u8(&self) -> Result<u8, WireError> {
        self.data
            .get(self.position)
            .copied()
            .ok_or(WireError::TruncatedInput {
                needed: 1,
                remaining: 0,
            })
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(WireError::TruncatedInput {
                needed: len,
                remaining,
            });
        }
        let start = self.position;
        self.position += len;
        Ok(&self.data[start..start + len])
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        match self.peek_u8()? {
            0 | 1 => Ok(self.read_u8()? == 1),
            other => Err(WireError::MalformedMessage(format!(
                "invalid bool byte 0x{other:02x}"
            ))),
        }
    }

    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read a compact length prefix.
    pub fn read_length(&mut self) -> Result<usize, WireError> {
        let (value, consumed) = decode_length(self.data, self.position)?;
        self.position += consumed;
        Ok(value)
    }

    pub fn read_address(&mut self) -> Result<Address, WireError> {
        Ok(Address::new(self.read_array::<ADDRESS_LEN>()?))
    }

    /// Read a signature that must be present.
    pub fn read_signature(&mut self) -> Result<Signature, WireError> {
        Ok(Signature::new(self.read_array::<SIGNATURE_LEN>()?))
    }

    /// Read a signature slot where 64 zero bytes means "unsigned".
    pub fn read_signature_slot(&mut self) -> Result<Option<Signature>, WireError> {
        Ok(Signature::from_slot(self.read_array::<SIGNATURE_LEN>()?))
    }

    /// Read a compact length followed by that many raw bytes.
    pub fn read_compact_bytes(&mut self) -> Result<&'a [u8], WireError> {
        let start = self.position;
        let len = self.read_length()?;
        self.read_bytes(len).inspect_err(|_| self.position = start)
    }

    /// Read a compact length followed by that many items decoded with `item`.
    pub fn read_compact_array<T, F>(&mut self, mut item: F) -> Result<Vec<T>, WireError>
    where
        F: FnMut(&mut Self) -> Result<T, WireError>,
    {
        let len = self.read_length()?;
        // Every item is at least one byte, so a hostile length cannot make us
        // allocate more than the input size.
        let mut out = Vec::with_capacity(len.min(self.remaining()));
        for _ in 0..len {
            out.push(item(self)?);
        }
        Ok(out)
    }

    /// Fail with `MalformedMessage` unless every byte has been consumed.
    pub fn expect_end(&self, what: &str) -> Result<(), WireError> {
        match self.remaining() {
            0 => Ok(()),
            extra => Err(WireError::MalformedMessage(format!(
                "{extra} trailing bytes after {what}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_bool(&mut self, value: bool) {
        self.buf.push(value as u8);
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_length(&mut self, len: usize) {
        self.buf.extend_from_slice(&encode_length(len));
    }

    pub fn put_address(&mut self, address: &Address) {
        self.buf.extend_from_slice(address.as_bytes());
    }

    pub fn put_signature(&mut self, signature: &Signature) {
        self.buf.extend_from_slice(signature.as_bytes());
    }

    pub fn put_signature_slot(&mut self, signature: Option<&Signature>) {
        self.buf.extend_from_slice(&Signature::to_slot(signature));
    }

    pub fn put_compact_bytes(&mut self, bytes: &[u8]) {
        self.put_length(bytes.len());
        self.put_bytes(bytes);
    }

    pub fn put_compact_array<T, F>(&mut self, items: &[T], mut item: F)
    where
        F: FnMut(&mut Self, &T),
    {
        self.put_length(items.len());
        for it in items {
            item(self, it);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_fixed_width_integers() {
        let mut data = vec![0x07];
        data.extend_from_slice(&0xdead_beefu32.to_le_bytes());
        data.extend_from_slice(&1_000_000_007u64.to_le_bytes());

        let mut reader = WireReader::new(&data);
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(reader.read_u32().unwrap(), 0xdead_beef);
        assert_eq!(reader.read_u64().unwrap(), 1_000_000_007);
        assert!(reader.is_empty());
        assert_eq!(reader.position(), 13);
    }

    #[test]
    fn truncated_read_reports_sizes_and_keeps_position() {
        let data = [1u8, 2, 3];
        let mut reader = WireReader::new(&data);
        reader.read_u8().unwrap();
        assert_eq!(
            reader.read_u64(),
            Err(WireError::TruncatedInput {
                needed: 8,
                remaining: 2
            })
        );
        assert_eq!(reader.position(), 1);
    }

    #[test]
    fn read_bool_rejects_other_bytes() {
        let mut reader = WireReader::new(&[1, 0, 2]);
        assert!(reader.read_bool().unwrap());
        assert!(!reader.read_bool().unwrap());
        assert!(matches!(
            reader.read_bool(),
            Err(WireError::MalformedMessage(_))
        ));
    }

    #[test]
    fn compact_bytes_roundtrip() {
        let payload = vec![0x5a; 200];
        let mut writer = WireWriter::new();
        writer.put_compact_bytes(&payload);
        // 200 needs a two byte prefix.
        assert_eq!(writer.len(), 202);

        let bytes = writer.into_bytes();
        let mut reader = WireReader::new(&bytes);
        assert_eq!(reader.read_compact_bytes().unwrap(), payload.as_slice());
        reader.expect_end("payload").unwrap();
    }

    #[test]
    fn compact_bytes_truncated_payload() {
        let mut reader = WireReader::new(&[0x05, 1, 2]);
        assert!(matches!(
            reader.read_compact_bytes(),
            Err(WireError::TruncatedInput {
                needed: 5,
                remaining: 2
            })
        ));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn compact_array_of_addresses() {
        let a = Address::new([1u8; 32]);
        let b = Address::new([2u8; 32]);
        let mut writer = WireWriter::new();
        writer.put_compact_array(&[a, b], |w, addr| w.put_address(addr));

        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), 1 + 64);
        let mut reader = WireReader::new(&bytes);
        let decoded = reader.read_compact_array(|r| r.read_address()).unwrap();
        assert_eq!(decoded, vec![a, b]);
    }

    #[test]
    fn hostile_array_length_fails_cleanly() {
        // Claims 16383 items but carries none.
        let mut reader = WireReader::new(&[0xff, 0x7f]);
        assert!(matches!(
            reader.read_compact_array(|r| r.read_u8()),
            Err(WireError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn signature_slots() {
        let sig = Signature::new([3u8; 64]);
        let mut writer = WireWriter::new();
        writer.put_signature_slot(None);
        writer.put_signature_slot(Some(&sig));

        let bytes = writer.into_bytes();
        let mut reader = WireReader::new(&bytes);
        assert_eq!(reader.read_signature_slot().unwrap(), None);
        assert_eq!(reader.read_signature_slot().unwrap(), Some(sig));
    }

    #[test]
    fn expect_end_flags_trailing_bytes() {
        let reader = WireReader::at(&[0, 0, 0], 1);
        let err = reader.expect_end("message").unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed message: 2 trailing bytes after message"
        );
    }
}
