//! Transaction version detection.
//!
//! ```text
//! Transaction:
//!   num_signatures          compact length
//!   signatures              64 bytes * num_signatures
//!   message                 (legacy, or 0x80 | version then body)
//! ```
//!
//! The signature section is read first; the byte right after it decides the
//! version. A legacy message starts with its signer count, which is always
//! below 0x80.

use sol_wire::{Signature, TransactionVersion, WireReader};

use crate::error::TxError;

/// A transaction split at its signature section, before the message itself
/// is decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedTransaction {
    pub version: TransactionVersion,
    pub signatures: Vec<Option<Signature>>,
    /// Everything after the signature section, version prefix included.
    /// These are the bytes signers sign.
    pub message_bytes: Vec<u8>,
    /// Offset of the message body inside `message_bytes`: 0 for legacy, 1
    /// for v0.
    pub body_offset: usize,
}

impl DetectedTransaction {
    /// The message without its version prefix.
    pub fn message_body(&self) -> &[u8] {
        &self.message_bytes[self.body_offset..]
    }
}

pub fn detect_version(bytes: &[u8]) -> Result<DetectedTransaction, TxError> {
    let mut reader = WireReader::new(bytes);
    let signatures = reader.read_compact_array(|r| r.read_signature_slot())?;

    let version = TransactionVersion::from_prefix(reader.peek_u8()?)?;
    let body_offset = match version {
        TransactionVersion::Legacy => 0,
        TransactionVersion::V0 => 1,
    };

    Ok(DetectedTransaction {
        version,
        signatures,
        message_bytes: reader.rest().to_vec(),
        body_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sol_wire::WireError;

    fn with_signatures(count: u8, message: &[u8]) -> Vec<u8> {
        let mut bytes = vec![count];
        bytes.extend(std::iter::repeat_n(0u8, 64 * count as usize));
        bytes.extend_from_slice(message);
        bytes
    }

    #[test]
    fn legacy_header_byte() {
        let detected = detect_version(&with_signatures(1, &[0x01, 0x00, 0x01])).unwrap();
        assert_eq!(detected.version, TransactionVersion::Legacy);
        assert_eq!(detected.signatures, vec![None]);
        assert_eq!(detected.body_offset, 0);
        assert_eq!(detected.message_body(), &[0x01, 0x00, 0x01]);
    }

    #[test]
    fn v0_prefix_is_excluded_from_body() {
        let detected = detect_version(&with_signatures(1, &[0x80, 0x01, 0x00])).unwrap();
        assert_eq!(detected.version, TransactionVersion::V0);
        assert_eq!(detected.message_bytes, vec![0x80, 0x01, 0x00]);
        assert_eq!(detected.message_body(), &[0x01, 0x00]);
    }

    #[test]
    fn unsupported_version() {
        assert_eq!(
            detect_version(&with_signatures(1, &[0x81, 0x01])),
            Err(TxError::Wire(WireError::UnsupportedVersion(1)))
        );
    }

    #[test]
    fn missing_message_is_truncated() {
        assert!(matches!(
            detect_version(&with_signatures(1, &[])),
            Err(TxError::Wire(WireError::TruncatedInput { .. }))
        ));
    }

    #[test]
    fn short_signature_section_is_truncated() {
        let mut bytes = with_signatures(2, &[]);
        bytes.truncate(100);
        assert!(matches!(
            detect_version(&bytes),
            Err(TxError::Wire(WireError::TruncatedInput { .. }))
        ));
    }
}
