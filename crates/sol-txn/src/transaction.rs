//! Parsed and built transactions, and signing.
//!
//! A transaction keeps the exact message bytes it was parsed from (or built
//! with). Signing writes into signature slots and never re-encodes the
//! message, so an unsigned round trip is byte-identical and a signed one has
//! the same length.
//!
//! ```text
//! Transaction:
//!   num_signatures          compact length
//!   signatures              64 bytes * num_signatures  (zero = not signed)
//!   message                 verbatim
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Verifier, VerifyingKey};
use log::debug;
use sol_wire::{
    Address, Instruction, LegacyMessage, LoadedAddresses, Signature, TransactionAccount,
    TransactionVersion, V0Message, VersionedMessage, WireError, WireWriter, SIGNATURE_LEN,
};

use crate::error::TxError;
use crate::keypair::Keypair;
use crate::version::detect_version;

/// What `sign` does with a keypair that is not one of the transaction's
/// required signers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignerPolicy {
    /// Ignore it.
    #[default]
    SkipUnknown,
    /// Fail with `SignerNotInTransaction` before any slot is written.
    Reject,
}

/// One signature slot and the signer account it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEntry {
    pub address: Address,
    pub signature: Option<Signature>,
}

/// Behaviour shared by legacy and versioned transactions.
pub trait TransactionEnvelope {
    fn message(&self) -> &VersionedMessage;

    /// The verbatim message bytes, version prefix included. This is what
    /// every signer signs.
    fn message_data(&self) -> &[u8];

    fn signatures(&self) -> &[SignatureEntry];

    /// Addresses resolved from lookup tables, if the caller supplied them.
    fn loaded_addresses(&self) -> Option<&LoadedAddresses>;

    fn set_signer_policy(&mut self, policy: SignerPolicy);

    /// Sign with every keypair that matches a required signer.
    fn sign(&mut self, signers: &[&Keypair]) -> Result<&mut Self, TxError>;

    /// Place a signature produced elsewhere (a hardware or browser wallet)
    /// into `address`'s slot, replacing whatever was there. Fails with
    /// `SignerNotInTransaction` when `address` is not a required signer.
    fn add_signature(
        &mut self,
        address: &Address,
        signature: Signature,
    ) -> Result<&mut Self, TxError>;

    fn version(&self) -> TransactionVersion {
        self.message().version()
    }

    fn accounts(&self) -> Result<Vec<TransactionAccount>, TxError> {
        Ok(self.message().accounts(self.loaded_addresses())?)
    }

    /// The unified account list as plain addresses.
    fn addresses(&self) -> Result<Vec<Address>, TxError> {
        Ok(self.accounts()?.into_iter().map(|a| a.address).collect())
    }

    fn instructions(&self) -> Result<Vec<Instruction>, TxError> {
        Ok(self
            .message()
            .resolve_instructions(self.loaded_addresses())?)
    }

    fn num_required_signatures(&self) -> usize {
        self.message().header().num_required_signatures as usize
    }

    /// The fee payer's signature, which identifies the transaction.
    fn signature(&self) -> Option<&Signature> {
        self.signatures().first().and_then(|e| e.signature.as_ref())
    }

    fn fee_payer(&self) -> Option<&Address> {
        self.message().fee_payer()
    }

    fn recent_blockhash(&self) -> &Address {
        self.message().recent_blockhash()
    }

    fn to_bytes(&self) -> Vec<u8> {
        let message = self.message_data();
        let signatures = self.signatures();
        let mut writer =
            WireWriter::with_capacity(1 + signatures.len() * SIGNATURE_LEN + message.len());
        writer.put_compact_array(signatures, |w, e| {
            w.put_signature_slot(e.signature.as_ref())
        });
        writer.put_bytes(message);
        writer.into_bytes()
    }

    fn to_base64(&self) -> String {
        BASE64.encode(self.to_bytes())
    }

    fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// For each signature slot: `true` when a signature is present and
    /// verifies against the slot's address.
    fn verify_signatures(&self) -> Vec<bool> {
        let message = self.message_data();
        self.signatures()
            .iter()
            .map(|entry| {
                let Some(signature) = &entry.signature else {
                    return false;
                };
                let Ok(key) = VerifyingKey::from_bytes(entry.address.as_bytes()) else {
                    return false;
                };
                let signature = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
                key.verify(message, &signature).is_ok()
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct Envelope {
    message: VersionedMessage,
    message_bytes: Vec<u8>,
    signatures: Vec<SignatureEntry>,
    loaded: Option<LoadedAddresses>,
    policy: SignerPolicy,
}

impl Envelope {
    fn new(
        message: VersionedMessage,
        message_bytes: Vec<u8>,
        signatures: Vec<Option<Signature>>,
        loaded: Option<LoadedAddresses>,
    ) -> Result<Self, TxError> {
        let signer_keys = message.signer_keys();
        if signatures.len() != signer_keys.len() {
            return Err(WireError::MalformedMessage(format!(
                "{} signatures for {} required signers",
                signatures.len(),
                signer_keys.len()
            ))
            .into());
        }
        if let Some(loaded) = &loaded {
            message.accounts(Some(loaded))?;
        }

        let signatures = signer_keys
            .iter()
            .zip(signatures)
            .map(|(address, signature)| SignatureEntry {
                address: *address,
                signature,
            })
            .collect();

        Ok(Self {
            message,
            message_bytes,
            signatures,
            loaded,
            policy: SignerPolicy::default(),
        })
    }

    fn parse(bytes: &[u8], loaded: Option<LoadedAddresses>) -> Result<Self, TxError> {
        let detected = detect_version(bytes)?;
        let message = match detected.version {
            TransactionVersion::Legacy => {
                VersionedMessage::Legacy(LegacyMessage::decode(detected.message_body())?)
            }
            TransactionVersion::V0 => {
                VersionedMessage::V0(V0Message::decode(detected.message_body())?)
            }
        };

        debug!(
            "parsed {} transaction: {} signatures, {} static accounts, {} lookups",
            detected.version,
            detected.signatures.len(),
            message.static_account_keys().len(),
            message.address_table_lookups().len()
        );

        Self::new(message, detected.message_bytes, detected.signatures, loaded)
    }

    fn from_message(message: VersionedMessage) -> Result<Self, TxError> {
        message.validate()?;
        let message_bytes = message.serialize();
        let signatures = message
            .signer_keys()
            .iter()
            .map(|address| SignatureEntry {
                address: *address,
                signature: None,
            })
            .collect();
        Ok(Self {
            message,
            message_bytes,
            signatures,
            loaded: None,
            policy: SignerPolicy::default(),
        })
    }

    fn set_loaded(&mut self, loaded: LoadedAddresses) -> Result<(), TxError> {
        self.message.accounts(Some(&loaded))?;
        self.loaded = Some(loaded);
        Ok(())
    }

    fn sign(&mut self, signers: &[&Keypair]) -> Result<(), TxError> {
        let mut slots = Vec::with_capacity(signers.len());
        for keypair in signers {
            let address = keypair.address();
            match self.signatures.iter().position(|e| e.address == address) {
                Some(slot) => slots.push((slot, *keypair)),
                None if self.policy == SignerPolicy::Reject => {
                    return Err(TxError::SignerNotInTransaction(address.to_string()));
                }
                None => debug!("skipping {address}: not a required signer"),
            }
        }

        for (slot, keypair) in &slots {
            self.signatures[*slot].signature = Some(keypair.sign_message(&self.message_bytes));
        }
        debug!(
            "filled {} of {} signature slots",
            slots.len(),
            self.signatures.len()
        );
        Ok(())
    }

    fn add_signature(&mut self, address: &Address, signature: Signature) -> Result<(), TxError> {
        let entry = self
            .signatures
            .iter_mut()
            .find(|e| e.address == *address)
            .ok_or_else(|| TxError::SignerNotInTransaction(address.to_string()))?;
        entry.signature = Some(signature);
        debug!("attached external signature for {address}");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Legacy
// ---------------------------------------------------------------------------

/// A transaction whose message has no version prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    inner: Envelope,
}

impl LegacyTransaction {
    /// Parse a legacy transaction. A v0 transaction is `UnsupportedVersion(0)`.
    pub fn parse(bytes: &[u8]) -> Result<Self, TxError> {
        let inner = Envelope::parse(bytes, None)?;
        match inner.message.version() {
            TransactionVersion::Legacy => Ok(Self { inner }),
            TransactionVersion::V0 => Err(WireError::UnsupportedVersion(0).into()),
        }
    }

    /// Wrap a message; fails when it would not survive a re-parse.
    pub fn from_message(message: LegacyMessage) -> Result<Self, TxError> {
        Ok(Self {
            inner: Envelope::from_message(VersionedMessage::Legacy(message))?,
        })
    }
}

impl TransactionEnvelope for LegacyTransaction {
    fn message(&self) -> &VersionedMessage {
        &self.inner.message
    }

    fn message_data(&self) -> &[u8] {
        &self.inner.message_bytes
    }

    fn signatures(&self) -> &[SignatureEntry] {
        &self.inner.signatures
    }

    fn loaded_addresses(&self) -> Option<&LoadedAddresses> {
        None
    }

    fn set_signer_policy(&mut self, policy: SignerPolicy) {
        self.inner.policy = policy;
    }

    fn sign(&mut self, signers: &[&Keypair]) -> Result<&mut Self, TxError> {
        self.inner.sign(signers)?;
        Ok(self)
    }

    fn add_signature(
        &mut self,
        address: &Address,
        signature: Signature,
    ) -> Result<&mut Self, TxError> {
        self.inner.add_signature(address, signature)?;
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Versioned
// ---------------------------------------------------------------------------

/// A transaction of any supported version. Its v0 messages may reference
/// lookup tables, resolved through caller-supplied [`LoadedAddresses`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedTransaction {
    inner: Envelope,
}

impl VersionedTransaction {
    pub fn parse(bytes: &[u8], loaded: Option<LoadedAddresses>) -> Result<Self, TxError> {
        Ok(Self {
            inner: Envelope::parse(bytes, loaded)?,
        })
    }

    pub fn from_message(message: VersionedMessage) -> Result<Self, TxError> {
        Ok(Self {
            inner: Envelope::from_message(message)?,
        })
    }

    /// Attach lookup table addresses after parsing. Their counts must match
    /// the message's lookups.
    pub fn set_loaded_addresses(&mut self, loaded: LoadedAddresses) -> Result<(), TxError> {
        self.inner.set_loaded(loaded)
    }
}

impl TransactionEnvelope for VersionedTransaction {
    fn message(&self) -> &VersionedMessage {
        &self.inner.message
    }

    fn message_data(&self) -> &[u8] {
        &self.inner.message_bytes
    }

    fn signatures(&self) -> &[SignatureEntry] {
        &self.inner.signatures
    }

    fn loaded_addresses(&self) -> Option<&LoadedAddresses> {
        self.inner.loaded.as_ref()
    }

    fn set_signer_policy(&mut self, policy: SignerPolicy) {
        self.inner.policy = policy;
    }

    fn sign(&mut self, signers: &[&Keypair]) -> Result<&mut Self, TxError> {
        self.inner.sign(signers)?;
        Ok(self)
    }

    fn add_signature(
        &mut self,
        address: &Address,
        signature: Signature,
    ) -> Result<&mut Self, TxError> {
        self.inner.add_signature(address, signature)?;
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Either
// ---------------------------------------------------------------------------

/// A transaction of whichever version the bytes carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    Legacy(LegacyTransaction),
    Versioned(VersionedTransaction),
}

impl Transaction {
    /// Parse raw wire bytes. `loaded` is only consulted for v0 messages.
    pub fn parse(bytes: &[u8], loaded: Option<LoadedAddresses>) -> Result<Self, TxError> {
        let inner = Envelope::parse(bytes, loaded)?;
        Ok(match inner.message.version() {
            TransactionVersion::Legacy => Self::Legacy(LegacyTransaction { inner }),
            TransactionVersion::V0 => Self::Versioned(VersionedTransaction { inner }),
        })
    }

    pub fn from_base64(text: &str, loaded: Option<LoadedAddresses>) -> Result<Self, TxError> {
        let bytes = BASE64
            .decode(text.trim())
            .map_err(|e| TxError::InvalidEncoding(format!("base64 decode failed: {e}")))?;
        Self::parse(&bytes, loaded)
    }

    pub fn from_hex(text: &str, loaded: Option<LoadedAddresses>) -> Result<Self, TxError> {
        let bytes = hex::decode(text.trim())
            .map_err(|e| TxError::InvalidEncoding(format!("hex decode failed: {e}")))?;
        Self::parse(&bytes, loaded)
    }

    /// Wrap a built message; every signature slot starts empty. The message
    /// gets the same checks a decoded one does.
    pub fn from_message(message: VersionedMessage) -> Result<Self, TxError> {
        Ok(match message {
            VersionedMessage::Legacy(m) => Self::Legacy(LegacyTransaction::from_message(m)?),
            v0 @ VersionedMessage::V0(_) => {
                Self::Versioned(VersionedTransaction::from_message(v0)?)
            }
        })
    }

    pub fn with_signer_policy(mut self, policy: SignerPolicy) -> Self {
        self.set_signer_policy(policy);
        self
    }
}

impl TransactionEnvelope for Transaction {
    fn message(&self) -> &VersionedMessage {
        match self {
            Self::Legacy(tx) => tx.message(),
            Self::Versioned(tx) => tx.message(),
        }
    }

    fn message_data(&self) -> &[u8] {
        match self {
            Self::Legacy(tx) => tx.message_data(),
            Self::Versioned(tx) => tx.message_data(),
        }
    }

    fn signatures(&self) -> &[SignatureEntry] {
        match self {
            Self::Legacy(tx) => tx.signatures(),
            Self::Versioned(tx) => tx.signatures(),
        }
    }

    fn loaded_addresses(&self) -> Option<&LoadedAddresses> {
        match self {
            Self::Legacy(tx) => tx.loaded_addresses(),
            Self::Versioned(tx) => tx.loaded_addresses(),
        }
    }

    fn set_signer_policy(&mut self, policy: SignerPolicy) {
        match self {
            Self::Legacy(tx) => tx.set_signer_policy(policy),
            Self::Versioned(tx) => tx.set_signer_policy(policy),
        }
    }

    fn sign(&mut self, signers: &[&Keypair]) -> Result<&mut Self, TxError> {
        match self {
            Self::Legacy(tx) => {
                tx.sign(signers)?;
            }
            Self::Versioned(tx) => {
                tx.sign(signers)?;
            }
        }
        Ok(self)
    }

    fn add_signature(
        &mut self,
        address: &Address,
        signature: Signature,
    ) -> Result<&mut Self, TxError> {
        match self {
            Self::Legacy(tx) => {
                tx.add_signature(address, signature)?;
            }
            Self::Versioned(tx) => {
                tx.add_signature(address, signature)?;
            }
        }
        Ok(self)
    }
}
