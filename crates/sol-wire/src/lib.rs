//! Byte-level codec for Solana transactions.
//!
//! Compact length prefixes, addresses and signatures, instructions, legacy
//! and v0 messages, and lookup table account data. Everything here is pure
//! decoding and encoding; signing and version detection live in `sol-txn`.

pub mod address;
pub mod cursor;
pub mod error;
pub mod instruction;
pub mod lookup_table;
pub mod message;
pub mod primitives;
pub mod signature;
pub mod varint;

// Re-export key public types for ergonomic imports.
pub use address::{Address, ADDRESS_LEN};
pub use cursor::{WireReader, WireWriter};
pub use error::WireError;
pub use instruction::CompiledInstruction;
pub use lookup_table::{AddressLookupTableAccount, LOOKUP_TABLE_META_SIZE};
pub use message::{
    Instruction, LegacyMessage, LoadedAddresses, MessageAddressTableLookup, MessageHeader,
    TransactionAccount, TransactionVersion, V0Message, VersionedMessage,
    MESSAGE_VERSION_PREFIX, VERSION_PREFIX_MASK,
};
pub use signature::{Signature, SIGNATURE_LEN};
pub use varint::{decode_length, encode_length, encoded_length_len};
