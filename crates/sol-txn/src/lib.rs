//! Solana transactions on top of the `sol-wire` codec.
//!
//! Parses legacy and v0 transactions from raw bytes, base64 or hex, signs
//! them in place without re-encoding the message, compiles new messages from
//! instructions, resolves lookup tables and derives program addresses. All
//! without `solana-sdk`: signing uses `ed25519-dalek`, the PDA curve check
//! uses `curve25519-dalek`.

pub mod builder;
pub mod error;
pub mod keypair;
pub mod lookup;
pub mod pda;
pub mod spl_token;
pub mod transaction;
pub mod version;

// Re-export key public types for ergonomic imports.
pub use builder::{
    memo, system_transfer, AccountMeta, InstructionSpec, MessageBuilder, MEMO_PROGRAM_ID,
    SYSTEM_PROGRAM_ID,
};
pub use error::TxError;
pub use keypair::Keypair;
pub use lookup::LookupTableResolver;
pub use pda::{create_program_address, find_program_address, is_on_curve, MAX_SEED_LEN};
pub use spl_token::{
    derive_associated_token_address, AccountState, Mint, TokenAccount,
    ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_PROGRAM_ID,
};
pub use transaction::{
    LegacyTransaction, SignatureEntry, SignerPolicy, Transaction, TransactionEnvelope,
    VersionedTransaction,
};
pub use version::{detect_version, DetectedTransaction};

pub use sol_wire::{
    Address, Instruction, LoadedAddresses, Signature, TransactionAccount, TransactionVersion,
    VersionedMessage, WireError,
};
