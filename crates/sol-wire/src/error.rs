use thiserror::Error;

/// Wire format decoding and encoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput { needed: usize, remaining: usize },

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("unknown account index {index} (only {available} accounts resolvable)")]
    UnknownAccountIndex { index: usize, available: usize },

    #[error("missing lookup table data: {0}")]
    MissingLookupTableData(String),

    #[error("unsupported transaction version: {0}")]
    UnsupportedVersion(u8),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),
}
