//! Legacy and v0 transaction messages.
//!
//! ```text
//! Message (legacy):
//!   num_required_sigs       u8
//!   num_readonly_signed     u8
//!   num_readonly_unsigned   u8
//!   account_keys            compact<[u8; 32]>
//!   recent_blockhash        [u8; 32]
//!   instructions            compact<Instruction>
//!
//! Message (v0):
//!   version prefix          u8  (0x80 | version)
//!   ...legacy layout...
//!   address_table_lookups   compact<AddressTableLookup>
//!
//! AddressTableLookup:
//!   account_key             [u8; 32]
//!   writable_indexes        compact<u8>
//!   readonly_indexes        compact<u8>
//! ```
//!
//! The version prefix is its own byte. `V0Message` only models the body after
//! it; [`VersionedMessage`] reads and writes the prefix.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::cursor::{WireReader, WireWriter};
use crate::error::WireError;
use crate::instruction::CompiledInstruction;

/// Set on the first message byte of a versioned message.
pub const MESSAGE_VERSION_PREFIX: u8 = 0x80;

/// Masks the version number out of the prefix byte.
pub const VERSION_PREFIX_MASK: u8 = 0x7f;

/// Wire format version of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionVersion {
    Legacy,
    V0,
}

impl TransactionVersion {
    /// Classify a first message byte. A legacy message starts with a plain
    /// signer count, which never has the high bit set.
    pub fn from_prefix(prefix: u8) -> Result<Self, WireError> {
        let masked = prefix & VERSION_PREFIX_MASK;
        if masked == prefix {
            return Ok(Self::Legacy);
        }
        match masked {
            0 => Ok(Self::V0),
            other => Err(WireError::UnsupportedVersion(other)),
        }
    }
}

impl fmt::Display for TransactionVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::V0 => f.write_str("0"),
        }
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// The three counts that fix every static account's role by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

impl MessageHeader {
    pub fn read(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            num_required_signatures: reader.read_u8()?,
            num_readonly_signed_accounts: reader.read_u8()?,
            num_readonly_unsigned_accounts: reader.read_u8()?,
        })
    }

    pub fn write(&self, writer: &mut WireWriter) {
        writer.put_u8(self.num_required_signatures);
        writer.put_u8(self.num_readonly_signed_accounts);
        writer.put_u8(self.num_readonly_unsigned_accounts);
    }

    pub fn is_signer(&self, index: usize) -> bool {
        index < self.num_required_signatures as usize
    }

    /// Whether the static account at `index` is writable, given
    /// `num_static` static accounts in total.
    pub fn is_writable(&self, index: usize, num_static: usize) -> bool {
        let signers = self.num_required_signatures as usize;
        let readonly_signed = self.num_readonly_signed_accounts as usize;
        let readonly_unsigned = self.num_readonly_unsigned_accounts as usize;

        if index < signers {
            index < signers.saturating_sub(readonly_signed)
        } else {
            index < num_static.saturating_sub(readonly_unsigned)
        }
    }

    fn validate(&self, num_static: usize) -> Result<(), WireError> {
        let signers = self.num_required_signatures as usize;
        if signers > num_static {
            return Err(WireError::MalformedMessage(format!(
                "header requires {signers} signers but only {num_static} accounts are listed"
            )));
        }
        if self.num_readonly_signed_accounts > self.num_required_signatures {
            return Err(WireError::MalformedMessage(format!(
                "{} readonly signers exceed {} signers",
                self.num_readonly_signed_accounts, signers
            )));
        }
        if self.num_readonly_unsigned_accounts as usize > num_static - signers {
            return Err(WireError::MalformedMessage(format!(
                "{} readonly non-signers exceed {} non-signer accounts",
                self.num_readonly_unsigned_accounts,
                num_static - signers
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Resolved views
// ---------------------------------------------------------------------------

/// One entry of a message's unified account list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransactionAccount {
    pub address: Address,
    pub signer: bool,
    pub writable: bool,
    pub loaded_from_table: bool,
}

/// An instruction with every index replaced by the address it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program: Address,
    pub accounts: Vec<Address>,
    pub data: Vec<u8>,
}

/// Addresses a v0 message pulls in through its lookup tables, already
/// resolved by the caller. This mirrors the RPC `meta.loadedAddresses` shape.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoadedAddresses {
    pub writable: Vec<Address>,
    pub readonly: Vec<Address>,
}

impl LoadedAddresses {
    pub fn len(&self) -> usize {
        self.writable.len() + self.readonly.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writable.is_empty() && self.readonly.is_empty()
    }
}

/// Index space shared by static and lookup-loaded accounts.
struct AccountKeys<'a> {
    static_keys: &'a [Address],
    loaded: Option<&'a LoadedAddresses>,
    /// Number of lookup-table indexes the message declares.
    num_lookup: usize,
}

impl AccountKeys<'_> {
    fn get(&self, index: usize) -> Result<Address, WireError> {
        if let Some(address) = self.static_keys.get(index) {
            return Ok(*address);
        }

        let available = self.static_keys.len() + self.num_lookup;
        let Some(loaded) = self.loaded else {
            if index < available {
                return Err(WireError::MissingLookupTableData(format!(
                    "account index {index} points into a lookup table that was not supplied"
                )));
            }
            return Err(WireError::UnknownAccountIndex { index, available });
        };

        let lookup_index = index - self.static_keys.len();
        loaded
            .writable
            .get(lookup_index)
            .or_else(|| loaded.readonly.get(lookup_index - loaded.writable.len()))
            .copied()
            .ok_or(WireError::UnknownAccountIndex { index, available })
    }

    fn resolve(&self, ix: &CompiledInstruction) -> Result<Instruction, WireError> {
        let program = self.get(ix.program_id_index as usize)?;
        let accounts = ix
            .account_indexes
            .iter()
            .map(|i| self.get(*i as usize))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Instruction {
            program,
            accounts,
            data: ix.data.clone(),
        })
    }
}

fn static_accounts(header: &MessageHeader, keys: &[Address]) -> Vec<TransactionAccount> {
    keys.iter()
        .enumerate()
        .map(|(i, address)| TransactionAccount {
            address: *address,
            signer: header.is_signer(i),
            writable: header.is_writable(i, keys.len()),
            loaded_from_table: false,
        })
        .collect()
}

/// Header counts must fit the static keys, and no key may appear twice.
fn check_static_keys(header: &MessageHeader, keys: &[Address]) -> Result<(), WireError> {
    header.validate(keys.len())?;
    let mut seen = HashSet::with_capacity(keys.len());
    if let Some(duplicate) = keys.iter().find(|k| !seen.insert(*k)) {
        return Err(WireError::MalformedMessage(format!(
            "account {duplicate} is listed more than once"
        )));
    }
    Ok(())
}

fn check_instruction_indexes(
    instructions: &[CompiledInstruction],
    available: usize,
) -> Result<(), WireError> {
    for ix in instructions {
        if let Some(index) = ix
            .referenced_indexes()
            .map(usize::from)
            .find(|i| *i >= available)
        {
            return Err(WireError::UnknownAccountIndex { index, available });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Legacy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LegacyMessage {
    pub header: MessageHeader,
    pub account_keys: Vec<Address>,
    pub recent_blockhash: Address,
    pub instructions: Vec<CompiledInstruction>,
}

impl LegacyMessage {
    pub fn read(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        let header = MessageHeader::read(reader)?;
        let account_keys = reader.read_compact_array(|r| r.read_address())?;
        check_static_keys(&header, &account_keys)?;
        let recent_blockhash = reader.read_address()?;
        let instructions = reader.read_compact_array(CompiledInstruction::read)?;
        check_instruction_indexes(&instructions, account_keys.len())?;

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }

    /// Decode a complete legacy message; trailing bytes are an error.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let mut reader = WireReader::new(bytes);
        let message = Self::read(&mut reader)?;
        reader.expect_end("legacy message")?;
        Ok(message)
    }

    /// Run the checks `read` applies to a message assembled in memory.
    pub fn validate(&self) -> Result<(), WireError> {
        check_static_keys(&self.header, &self.account_keys)?;
        check_instruction_indexes(&self.instructions, self.account_keys.len())
    }

    pub fn write(&self, writer: &mut WireWriter) {
        self.header.write(writer);
        writer.put_compact_array(&self.account_keys, |w, a| w.put_address(a));
        writer.put_address(&self.recent_blockhash);
        writer.put_compact_array(&self.instructions, |w, ix| ix.write(w));
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut writer = WireWriter::with_capacity(256);
        self.write(&mut writer);
        writer.into_bytes()
    }

    pub fn accounts(&self) -> Vec<TransactionAccount> {
        static_accounts(&self.header, &self.account_keys)
    }

    pub fn resolve_instructions(&self) -> Result<Vec<Instruction>, WireError> {
        let keys = AccountKeys {
            static_keys: &self.account_keys,
            loaded: None,
            num_lookup: 0,
        };
        self.instructions.iter().map(|ix| keys.resolve(ix)).collect()
    }
}

// ---------------------------------------------------------------------------
// V0
// ---------------------------------------------------------------------------

/// A reference from a v0 message into one on-chain address lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageAddressTableLookup {
    pub account_key: Address,
    pub writable_indexes: Vec<u8>,
    pub readonly_indexes: Vec<u8>,
}

impl MessageAddressTableLookup {
    pub fn read(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            account_key: reader.read_address()?,
            writable_indexes: reader.read_compact_bytes()?.to_vec(),
            readonly_indexes: reader.read_compact_bytes()?.to_vec(),
        })
    }

    pub fn write(&self, writer: &mut WireWriter) {
        writer.put_address(&self.account_key);
        writer.put_compact_bytes(&self.writable_indexes);
        writer.put_compact_bytes(&self.readonly_indexes);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct V0Message {
    pub header: MessageHeader,
    pub account_keys: Vec<Address>,
    pub recent_blockhash: Address,
    pub instructions: Vec<CompiledInstruction>,
    pub address_table_lookups: Vec<MessageAddressTableLookup>,
}

impl V0Message {
    /// Read the body that follows the version prefix.
    pub fn read(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        let header = MessageHeader::read(reader)?;
        let account_keys = reader.read_compact_array(|r| r.read_address())?;
        check_static_keys(&header, &account_keys)?;
        let recent_blockhash = reader.read_address()?;
        let instructions = reader.read_compact_array(CompiledInstruction::read)?;
        let address_table_lookups = reader.read_compact_array(MessageAddressTableLookup::read)?;

        let message = Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
            address_table_lookups,
        };
        check_instruction_indexes(&message.instructions, message.total_account_count())?;
        Ok(message)
    }

    /// Decode a complete v0 body (prefix already stripped).
    pub fn decode(body: &[u8]) -> Result<Self, WireError> {
        let mut reader = WireReader::new(body);
        let message = Self::read(&mut reader)?;
        reader.expect_end("v0 message")?;
        Ok(message)
    }

    pub fn validate(&self) -> Result<(), WireError> {
        check_static_keys(&self.header, &self.account_keys)?;
        check_instruction_indexes(&self.instructions, self.total_account_count())
    }

    /// Write the body, without the version prefix.
    pub fn write(&self, writer: &mut WireWriter) {
        self.header.write(writer);
        writer.put_compact_array(&self.account_keys, |w, a| w.put_address(a));
        writer.put_address(&self.recent_blockhash);
        writer.put_compact_array(&self.instructions, |w, ix| ix.write(w));
        writer.put_compact_array(&self.address_table_lookups, |w, l| l.write(w));
    }

    pub fn num_lookup_writable(&self) -> usize {
        self.address_table_lookups
            .iter()
            .map(|l| l.writable_indexes.len())
            .sum()
    }

    pub fn num_lookup_readonly(&self) -> usize {
        self.address_table_lookups
            .iter()
            .map(|l| l.readonly_indexes.len())
            .sum()
    }

    /// Static accounts plus every lookup-table index.
    pub fn total_account_count(&self) -> usize {
        self.account_keys.len() + self.num_lookup_writable() + self.num_lookup_readonly()
    }

    fn check_loaded(&self, loaded: &LoadedAddresses) -> Result<(), WireError> {
        let (writable, readonly) = (self.num_lookup_writable(), self.num_lookup_readonly());
        if loaded.writable.len() != writable || loaded.readonly.len() != readonly {
            return Err(WireError::MalformedMessage(format!(
                "loaded addresses ({} writable, {} readonly) do not match lookups ({writable} writable, {readonly} readonly)",
                loaded.writable.len(),
                loaded.readonly.len()
            )));
        }
        Ok(())
    }

    /// Static accounts followed by loaded writable then loaded readonly
    /// accounts. Fails when the message uses lookup tables and `loaded` is
    /// `None`.
    pub fn accounts(
        &self,
        loaded: Option<&LoadedAddresses>,
    ) -> Result<Vec<TransactionAccount>, WireError> {
        let mut out = static_accounts(&self.header, &self.account_keys);

        let loaded = match loaded {
            Some(loaded) => loaded,
            None if self.address_table_lookups.is_empty() => return Ok(out),
            None => {
                return Err(WireError::MissingLookupTableData(format!(
                    "message references {} lookup tables",
                    self.address_table_lookups.len()
                )))
            }
        };
        self.check_loaded(loaded)?;

        out.extend(loaded.writable.iter().map(|address| TransactionAccount {
            address: *address,
            signer: false,
            writable: true,
            loaded_from_table: true,
        }));
        out.extend(loaded.readonly.iter().map(|address| TransactionAccount {
            address: *address,
            signer: false,
            writable: false,
            loaded_from_table: true,
        }));
        Ok(out)
    }

    /// Resolve every instruction. Instructions that only touch static
    /// accounts resolve without `loaded`.
    pub fn resolve_instructions(
        &self,
        loaded: Option<&LoadedAddresses>,
    ) -> Result<Vec<Instruction>, WireError> {
        if let Some(loaded) = loaded {
            self.check_loaded(loaded)?;
        }
        let keys = AccountKeys {
            static_keys: &self.account_keys,
            loaded,
            num_lookup: self.num_lookup_writable() + self.num_lookup_readonly(),
        };
        self.instructions.iter().map(|ix| keys.resolve(ix)).collect()
    }
}

// ---------------------------------------------------------------------------
// Either version
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionedMessage {
    Legacy(LegacyMessage),
    V0(V0Message),
}

impl VersionedMessage {
    /// Decode a message, prefix included, choosing the layout from its first
    /// byte.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let mut reader = WireReader::new(bytes);
        match TransactionVersion::from_prefix(reader.peek_u8()?)? {
            TransactionVersion::Legacy => LegacyMessage::decode(bytes).map(Self::Legacy),
            TransactionVersion::V0 => {
                reader.read_u8()?;
                V0Message::decode(reader.rest()).map(Self::V0)
            }
        }
    }

    /// Serialize the message exactly as it is signed.
    pub fn serialize(&self) -> Vec<u8> {
        let mut writer = WireWriter::with_capacity(256);
        match self {
            Self::Legacy(message) => message.write(&mut writer),
            Self::V0(message) => {
                writer.put_u8(MESSAGE_VERSION_PREFIX);
                message.write(&mut writer);
            }
        }
        writer.into_bytes()
    }

    pub fn validate(&self) -> Result<(), WireError> {
        match self {
            Self::Legacy(m) => m.validate(),
            Self::V0(m) => m.validate(),
        }
    }

    pub fn version(&self) -> TransactionVersion {
        match self {
            Self::Legacy(_) => TransactionVersion::Legacy,
            Self::V0(_) => TransactionVersion::V0,
        }
    }

    pub fn header(&self) -> &MessageHeader {
        match self {
            Self::Legacy(m) => &m.header,
            Self::V0(m) => &m.header,
        }
    }

    pub fn static_account_keys(&self) -> &[Address] {
        match self {
            Self::Legacy(m) => &m.account_keys,
            Self::V0(m) => &m.account_keys,
        }
    }

    pub fn recent_blockhash(&self) -> &Address {
        match self {
            Self::Legacy(m) => &m.recent_blockhash,
            Self::V0(m) => &m.recent_blockhash,
        }
    }

    pub fn compiled_instructions(&self) -> &[CompiledInstruction] {
        match self {
            Self::Legacy(m) => &m.instructions,
            Self::V0(m) => &m.instructions,
        }
    }

    pub fn address_table_lookups(&self) -> &[MessageAddressTableLookup] {
        match self {
            Self::Legacy(_) => &[],
            Self::V0(m) => &m.address_table_lookups,
        }
    }

    /// The first signer pays fees.
    pub fn fee_payer(&self) -> Option<&Address> {
        if self.header().num_required_signatures == 0 {
            return None;
        }
        self.static_account_keys().first()
    }

    /// Static signer accounts, in signature-slot order.
    pub fn signer_keys(&self) -> &[Address] {
        let signers = self.header().num_required_signatures as usize;
        let keys = self.static_account_keys();
        &keys[..signers.min(keys.len())]
    }

    /// Legacy messages ignore `loaded`.
    pub fn accounts(
        &self,
        loaded: Option<&LoadedAddresses>,
    ) -> Result<Vec<TransactionAccount>, WireError> {
        match self {
            Self::Legacy(m) => Ok(m.accounts()),
            Self::V0(m) => m.accounts(loaded),
        }
    }

    pub fn resolve_instructions(
        &self,
        loaded: Option<&LoadedAddresses>,
    ) -> Result<Vec<Instruction>, WireError> {
        match self {
            Self::Legacy(m) => m.resolve_instructions(),
            Self::V0(m) => m.resolve_instructions(loaded),
        }
    }
}
