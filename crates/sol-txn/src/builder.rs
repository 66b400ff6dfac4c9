//! Compiling instructions into a message.
//!
//! Accounts are unioned across instructions (flags OR-ed), the fee payer is
//! forced to signer + writable, and the result is sorted into the order the
//! header counts describe:
//!
//! ```text
//!   1. fee payer
//!   2. writable signers
//!   3. read-only signers
//!   4. writable non-signers
//!   5. read-only non-signers
//! ```
//!
//! Within a tier accounts are ordered by address bytes, so the same
//! instructions always compile to the same message.

use std::collections::HashMap;

use log::debug;
use sol_wire::{
    Address, CompiledInstruction, LegacyMessage, MessageHeader, TransactionVersion, V0Message,
    VersionedMessage, WireError,
};

use crate::error::TxError;

// ---------------------------------------------------------------------------
// Well-known programs
// ---------------------------------------------------------------------------

/// The Solana System Program public key: 32 zero bytes.
/// Base58: `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM_ID: Address = Address::NULL;

/// SPL Memo program: `MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr`
pub const MEMO_PROGRAM_ID: Address = Address::new([
    0x05, 0x4a, 0x53, 0x5a, 0x99, 0x29, 0x21, 0x06, 0x4d, 0x24, 0xe8, 0x71, 0x60, 0xda, 0x38, 0x7c,
    0x7c, 0x35, 0xb5, 0xdd, 0xbc, 0x92, 0xbb, 0x81, 0xe4, 0x1f, 0xa8, 0x40, 0x41, 0x05, 0x44, 0x8d,
]);

/// System Program `Transfer` instruction index (little-endian u32).
const SYSTEM_TRANSFER_IX_INDEX: u32 = 2;

/// Account indexes are a single byte.
const MAX_ACCOUNTS: usize = 256;

// ---------------------------------------------------------------------------
// Instruction description
// ---------------------------------------------------------------------------

/// An account referenced by an instruction, with the permissions it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    pub address: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn writable(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: false,
        }
    }
}

/// An instruction before compilation: accounts are addresses, not indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionSpec {
    pub program_id: Address,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// System Program transfer of `lamports` from `from` to `to`.
pub fn system_transfer(from: &Address, to: &Address, lamports: u64) -> InstructionSpec {
    // Instruction data: u32 LE instruction index (2 = Transfer) + u64 LE lamports.
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SYSTEM_TRANSFER_IX_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    InstructionSpec {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*from, true),
            AccountMeta::writable(*to, false),
        ],
        data,
    }
}

/// Memo instruction carrying `text` as UTF-8. Every address in `signers` must
/// sign the transaction.
pub fn memo(text: &str, signers: &[Address]) -> InstructionSpec {
    InstructionSpec {
        program_id: MEMO_PROGRAM_ID,
        accounts: signers
            .iter()
            .map(|a| AccountMeta::readonly(*a, true))
            .collect(),
        data: text.as_bytes().to_vec(),
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MessageBuilder {
    fee_payer: Option<Address>,
    recent_blockhash: Address,
    version: TransactionVersion,
    instructions: Vec<InstructionSpec>,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self {
            fee_payer: None,
            recent_blockhash: Address::NULL,
            version: TransactionVersion::Legacy,
            instructions: Vec::new(),
        }
    }
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Without an explicit fee payer the first signer account of the first
    /// instruction that has one pays.
    pub fn fee_payer(mut self, fee_payer: Address) -> Self {
        self.fee_payer = Some(fee_payer);
        self
    }

    pub fn recent_blockhash(mut self, blockhash: Address) -> Self {
        self.recent_blockhash = blockhash;
        self
    }

    pub fn version(mut self, version: TransactionVersion) -> Self {
        self.version = version;
        self
    }

    pub fn instruction(mut self, instruction: InstructionSpec) -> Self {
        self.instructions.push(instruction);
        self
    }

    pub fn instructions(mut self, instructions: impl IntoIterator<Item = InstructionSpec>) -> Self {
        self.instructions.extend(instructions);
        self
    }

    pub fn build(&self) -> Result<VersionedMessage, TxError> {
        struct AccountEntry {
            address: Address,
            is_signer: bool,
            is_writable: bool,
        }

        let mut entries: Vec<AccountEntry> = Vec::new();

        let mut upsert = |address: Address, signer: bool, writable: bool| {
            if let Some(entry) = entries.iter_mut().find(|e| e.address == address) {
                entry.is_signer |= signer;
                entry.is_writable |= writable;
            } else {
                entries.push(AccountEntry {
                    address,
                    is_signer: signer,
                    is_writable: writable,
                });
            }
        };

        for ix in &self.instructions {
            for meta in &ix.accounts {
                upsert(meta.address, meta.is_signer, meta.is_writable);
            }
            // Program IDs are non-signer, read-only accounts.
            upsert(ix.program_id, false, false);
        }

        let fee_payer = self
            .fee_payer
            .or_else(|| {
                self.instructions
                    .iter()
                    .flat_map(|ix| &ix.accounts)
                    .find(|meta| meta.is_signer)
                    .map(|meta| meta.address)
            })
            .ok_or_else(|| WireError::MalformedMessage("message has no signer".into()))?;

        // Fee payer is always signer + writable, whatever the instructions say.
        upsert(fee_payer, true, true);

        if entries.len() > MAX_ACCOUNTS {
            return Err(WireError::MalformedMessage(format!(
                "{} accounts exceed the limit of {MAX_ACCOUNTS}",
                entries.len()
            ))
            .into());
        }

        let rank = |e: &AccountEntry| -> u8 {
            if e.address == fee_payer {
                return 0;
            }
            match (e.is_signer, e.is_writable) {
                (true, true) => 1,
                (true, false) => 2,
                (false, true) => 3,
                (false, false) => 4,
            }
        };
        entries.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.address.cmp(&b.address)));

        // 256 accounts fit the index space, but each header count is a u8.
        let count = |keep: fn(&AccountEntry) -> bool, what: &str| -> Result<u8, WireError> {
            let n = entries.iter().filter(|e| keep(e)).count();
            u8::try_from(n).map_err(|_| {
                WireError::MalformedMessage(format!("{n} {what} exceed the limit of {}", u8::MAX))
            })
        };
        let header = MessageHeader {
            num_required_signatures: count(|e| e.is_signer, "signers")?,
            num_readonly_signed_accounts: count(
                |e| e.is_signer && !e.is_writable,
                "readonly signers",
            )?,
            num_readonly_unsigned_accounts: count(
                |e| !e.is_signer && !e.is_writable,
                "readonly non-signers",
            )?,
        };

        let account_keys: Vec<Address> = entries.iter().map(|e| e.address).collect();
        // At most 256 entries, so every position fits a u8.
        let positions: HashMap<Address, u8> = account_keys
            .iter()
            .enumerate()
            .map(|(i, a)| (*a, i as u8))
            .collect();

        let instructions: Vec<CompiledInstruction> = self
            .instructions
            .iter()
            .map(|ix| CompiledInstruction {
                program_id_index: positions[&ix.program_id],
                account_indexes: ix.accounts.iter().map(|m| positions[&m.address]).collect(),
                data: ix.data.clone(),
            })
            .collect();

        debug!(
            "compiled {} message: {} accounts, {} signers, {} instructions",
            self.version,
            account_keys.len(),
            header.num_required_signatures,
            instructions.len()
        );

        Ok(match self.version {
            TransactionVersion::Legacy => VersionedMessage::Legacy(LegacyMessage {
                header,
                account_keys,
                recent_blockhash: self.recent_blockhash,
                instructions,
            }),
            TransactionVersion::V0 => VersionedMessage::V0(V0Message {
                header,
                account_keys,
                recent_blockhash: self.recent_blockhash,
                instructions,
                address_table_lookups: Vec::new(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::new([n; 32])
    }

    // -- Helpers ---------------------------------------------------------------

    #[test]
    fn memo_program_id_roundtrip() {
        assert_eq!(
            MEMO_PROGRAM_ID.to_base58(),
            "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr"
        );
    }

    #[test]
    fn system_transfer_data() {
        let ix = system_transfer(&addr(1), &addr(2), 1_000_000);
        assert_eq!(ix.program_id, SYSTEM_PROGRAM_ID);
        assert_eq!(ix.data.len(), 12);
        assert_eq!(&ix.data[..4], &[2, 0, 0, 0]);
        assert_eq!(u64::from_le_bytes(ix.data[4..].try_into().unwrap()), 1_000_000);
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert!(!ix.accounts[1].is_signer && ix.accounts[1].is_writable);
    }

    #[test]
    fn memo_signers_are_readonly() {
        let ix = memo("gm", &[addr(4)]);
        assert_eq!(ix.data, b"gm");
        assert_eq!(ix.accounts, vec![AccountMeta::readonly(addr(4), true)]);
    }

    // -- Compilation -----------------------------------------------------------

    #[test]
    fn transfer_compiles_to_canonical_layout() {
        let message = MessageBuilder::new()
            .fee_payer(addr(1))
            .recent_blockhash(addr(9))
            .instruction(system_transfer(&addr(1), &addr(2), 5))
            .build()
            .unwrap();

        let VersionedMessage::Legacy(m) = &message else {
            panic!("expected legacy message");
        };
        assert_eq!(
            m.header,
            MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 1,
            }
        );
        assert_eq!(m.account_keys, vec![addr(1), addr(2), SYSTEM_PROGRAM_ID]);
        assert_eq!(m.instructions[0].program_id_index, 2);
        assert_eq!(m.instructions[0].account_indexes, vec![0, 1]);
        assert_eq!(m.recent_blockhash, addr(9));
    }

    #[test]
    fn tiers_then_address_order() {
        let spec = InstructionSpec {
            program_id: addr(50),
            accounts: vec![
                AccountMeta::readonly(addr(40), false),
                AccountMeta::writable(addr(31), false),
                AccountMeta::readonly(addr(21), true),
                AccountMeta::writable(addr(30), false),
                AccountMeta::writable(addr(11), true),
                AccountMeta::readonly(addr(20), true),
                AccountMeta::writable(addr(10), true),
            ],
            data: vec![],
        };
        let message = MessageBuilder::new()
            .fee_payer(addr(99))
            .instruction(spec)
            .build()
            .unwrap();

        assert_eq!(
            message.static_account_keys(),
            &[
                addr(99),
                addr(10),
                addr(11),
                addr(20),
                addr(21),
                addr(30),
                addr(31),
                addr(40),
                addr(50),
            ]
        );
        let header = message.header();
        assert_eq!(header.num_required_signatures, 5);
        assert_eq!(header.num_readonly_signed_accounts, 2);
        assert_eq!(header.num_readonly_unsigned_accounts, 2);
    }

    #[test]
    fn flags_are_unioned_and_fee_payer_forced() {
        // addr(2) is readonly in one instruction and writable in another;
        // the fee payer only ever appears as a readonly non-signer.
        let message = MessageBuilder::new()
            .fee_payer(addr(1))
            .instruction(InstructionSpec {
                program_id: addr(7),
                accounts: vec![
                    AccountMeta::readonly(addr(1), false),
                    AccountMeta::readonly(addr(2), false),
                ],
                data: vec![],
            })
            .instruction(InstructionSpec {
                program_id: addr(7),
                accounts: vec![AccountMeta::writable(addr(2), false)],
                data: vec![],
            })
            .build()
            .unwrap();

        let accounts = message.accounts(None).unwrap();
        assert_eq!(accounts[0].address, addr(1));
        assert!(accounts[0].signer && accounts[0].writable);
        assert_eq!(accounts[1].address, addr(2));
        assert!(accounts[1].writable);
        assert_eq!(message.static_account_keys().len(), 3);
    }

    #[test]
    fn fee_payer_defaults_to_first_signer() {
        let message = MessageBuilder::new()
            .instruction(memo("hi", &[addr(5), addr(3)]))
            .build()
            .unwrap();
        assert_eq!(message.fee_payer(), Some(&addr(5)));
        assert_eq!(message.recent_blockhash(), &Address::NULL);
    }

    #[test]
    fn no_signer_is_rejected() {
        let err = MessageBuilder::new()
            .instruction(memo("hi", &[]))
            .build()
            .unwrap_err();
        assert!(matches!(err, TxError::Wire(WireError::MalformedMessage(_))));
    }

    #[test]
    fn too_many_accounts_rejected() {
        // 256 distinct accounts plus the program.
        let accounts = (0..=255u8)
            .map(|n| AccountMeta::writable(addr(n), false))
            .collect();
        let err = MessageBuilder::new()
            .fee_payer(addr(0))
            .instruction(InstructionSpec {
                program_id: MEMO_PROGRAM_ID,
                accounts,
                data: vec![],
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, TxError::Wire(WireError::MalformedMessage(_))));
    }

    #[test]
    fn signer_count_limit() {
        // 255 signers plus the program: 256 accounts, header still fits.
        let signers: Vec<AccountMeta> = (0..=254u8)
            .map(|n| AccountMeta::writable(addr(n), true))
            .collect();
        let message = MessageBuilder::new()
            .instruction(InstructionSpec {
                program_id: MEMO_PROGRAM_ID,
                accounts: signers.clone(),
                data: vec![],
            })
            .build()
            .unwrap();
        assert_eq!(message.static_account_keys().len(), 256);
        assert_eq!(message.header().num_required_signatures, 255);
        assert_eq!(message.validate(), Ok(()));

        // Make the program a signer as well: 256 signers overflow the count.
        let mut accounts = signers;
        accounts.push(AccountMeta::readonly(MEMO_PROGRAM_ID, true));
        let err = MessageBuilder::new()
            .instruction(InstructionSpec {
                program_id: MEMO_PROGRAM_ID,
                accounts,
                data: vec![],
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, TxError::Wire(WireError::MalformedMessage(_))));
    }

    #[test]
    fn v0_build_has_prefix_and_no_lookups() {
        let message = MessageBuilder::new()
            .version(TransactionVersion::V0)
            .instruction(system_transfer(&addr(1), &addr(2), 5))
            .build()
            .unwrap();
        assert_eq!(message.version(), TransactionVersion::V0);
        assert!(message.address_table_lookups().is_empty());
        let bytes = message.serialize();
        assert_eq!(bytes[0], 0x80);
        assert_eq!(VersionedMessage::decode(&bytes).unwrap(), message);
    }
}
