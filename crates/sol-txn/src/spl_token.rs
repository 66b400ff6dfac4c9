//! SPL Token accounts: program ids, associated token account derivation and
//! the token account and mint layouts.
//!
//! ```text
//! Token account (165 bytes):          Mint (82 bytes):
//!   mint              [u8; 32]          mint_authority    COption<Address>
//!   owner             [u8; 32]          supply            u64
//!   amount            u64               decimals          u8
//!   delegate          COption<Address>  is_initialized    bool
//!   state             u8                freeze_authority  COption<Address>
//!   is_native         COption<u64>
//!   delegated_amount  u64
//!   close_authority   COption<Address>
//! ```
//!
//! `COption` uses a 4-byte tag and always stores its payload. Token-2022
//! accounts append extensions after these layouts; they are ignored.

use sol_wire::primitives::{read_coption_address, read_coption_u64};
use sol_wire::{Address, WireError, WireReader};

use crate::error::TxError;
use crate::pda::find_program_address;

// ---------------------------------------------------------------------------
// Well-known program IDs
// ---------------------------------------------------------------------------

/// SPL Token Program ID: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: Address = Address::new([
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79, 0xac,
    0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff, 0x00, 0xa9,
]);

/// Associated Token Account Program ID: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Address = Address::new([
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d, 0x83,
    0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9, 0xf8, 0x59,
]);

pub const TOKEN_ACCOUNT_LEN: usize = 165;
pub const MINT_LEN: usize = 82;

// ---------------------------------------------------------------------------
// Associated Token Account (PDA) derivation
// ---------------------------------------------------------------------------

/// Derive the associated token account address for a wallet + mint pair.
///
/// The ATA is a Program Derived Address with seeds
/// `[wallet_address, token_program_id, mint_address]` under the Associated
/// Token Account program.
pub fn derive_associated_token_address(
    wallet: &Address,
    mint: &Address,
) -> Result<Address, TxError> {
    find_program_address(
        &[
            wallet.as_bytes(),
            TOKEN_PROGRAM_ID.as_bytes(),
            mint.as_bytes(),
        ],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

// ---------------------------------------------------------------------------
// Account layouts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    Uninitialized,
    Initialized,
    Frozen,
}

impl TryFrom<u8> for AccountState {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Uninitialized),
            1 => Ok(Self::Initialized),
            2 => Ok(Self::Frozen),
            other => Err(WireError::MalformedMessage(format!(
                "invalid token account state {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccount {
    pub mint: Address,
    pub owner: Address,
    pub amount: u64,
    pub delegate: Option<Address>,
    pub state: AccountState,
    /// Rent-exempt reserve of a wrapped SOL account.
    pub is_native: Option<u64>,
    pub delegated_amount: u64,
    pub close_authority: Option<Address>,
}

impl TokenAccount {
    pub fn decode(data: &[u8]) -> Result<Self, TxError> {
        let mut reader = WireReader::new(data);
        Ok(Self {
            mint: reader.read_address()?,
            owner: reader.read_address()?,
            amount: reader.read_u64()?,
            delegate: read_coption_address(&mut reader)?,
            state: AccountState::try_from(reader.read_u8()?)?,
            is_native: read_coption_u64(&mut reader)?,
            delegated_amount: reader.read_u64()?,
            close_authority: read_coption_address(&mut reader)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mint {
    pub mint_authority: Option<Address>,
    pub supply: u64,
    pub decimals: u8,
    pub is_initialized: bool,
    pub freeze_authority: Option<Address>,
}

impl Mint {
    pub fn decode(data: &[u8]) -> Result<Self, TxError> {
        let mut reader = WireReader::new(data);
        Ok(Self {
            mint_authority: read_coption_address(&mut reader)?,
            supply: reader.read_u64()?,
            decimals: reader.read_u8()?,
            is_initialized: reader.read_bool()?,
            freeze_authority: read_coption_address(&mut reader)?,
        })
    }
}
