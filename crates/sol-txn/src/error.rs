use sol_wire::WireError;
use thiserror::Error;

/// Transaction model, signing and address derivation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("invalid keypair: {0}")]
    InvalidKeypair(String),

    #[error("signer not in transaction: {0}")]
    SignerNotInTransaction(String),

    #[error("seed {index} is {len} bytes, max is 32")]
    SeedTooLong { index: usize, len: usize },

    #[error("derived address lies on the ed25519 curve")]
    AddressOnCurve,

    #[error("no viable bump seed found")]
    NoViableBump,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_wire_is_transparent() {
        let err: TxError = WireError::UnsupportedVersion(3).into();
        assert_eq!(err.to_string(), "unsupported transaction version: 3");
    }

    #[test]
    fn display_invalid_encoding() {
        let err = TxError::InvalidEncoding("bad base64".into());
        assert_eq!(err.to_string(), "invalid encoding: bad base64");
    }

    #[test]
    fn display_invalid_keypair() {
        let err = TxError::InvalidKeypair("public key mismatch".into());
        assert_eq!(err.to_string(), "invalid keypair: public key mismatch");
    }

    #[test]
    fn display_signer_not_in_transaction() {
        let err = TxError::SignerNotInTransaction("Abc".into());
        assert_eq!(err.to_string(), "signer not in transaction: Abc");
    }

    #[test]
    fn display_seed_too_long() {
        let err = TxError::SeedTooLong { index: 1, len: 33 };
        assert_eq!(err.to_string(), "seed 1 is 33 bytes, max is 32");
    }

    #[test]
    fn display_pda_errors() {
        assert_eq!(
            TxError::AddressOnCurve.to_string(),
            "derived address lies on the ed25519 curve"
        );
        assert_eq!(TxError::NoViableBump.to_string(), "no viable bump seed found");
    }

    #[test]
    fn error_trait_is_implemented() {
        let err: Box<dyn std::error::Error> = Box::new(TxError::NoViableBump);
        assert!(err.to_string().contains("bump"));
    }
}
