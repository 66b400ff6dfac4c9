//! Address lookup table account data.
//!
//! ```text
//! LookupTable account:
//!   type_index                  u32
//!   deactivation_slot           u64   (u64::MAX while active)
//!   last_extended_slot          u64
//!   last_extended_start_index   u8
//!   authority                   u8 tag, [u8; 32] when tag == 1
//!   padding                     up to offset 56
//!   addresses                   [u8; 32] * n, to the end of the account
//! ```
//!
//! The address count is not stored; it is whatever fits after the metadata.

use crate::address::{Address, ADDRESS_LEN};
use crate::cursor::WireReader;
use crate::error::WireError;

/// Offset of the first stored address.
pub const LOOKUP_TABLE_META_SIZE: usize = 56;

/// Deactivation slot of a table that has not been deactivated.
pub const ACTIVE_DEACTIVATION_SLOT: u64 = u64::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressLookupTableAccount {
    pub type_index: u32,
    pub deactivation_slot: u64,
    pub last_extended_slot: u64,
    pub last_extended_start_index: u8,
    pub authority: Option<Address>,
    pub addresses: Vec<Address>,
}

impl AddressLookupTableAccount {
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        let mut reader = WireReader::new(data);
        let type_index = reader.read_u32()?;
        let deactivation_slot = reader.read_u64()?;
        let last_extended_slot = reader.read_u64()?;
        let last_extended_start_index = reader.read_u8()?;
        let authority = match reader.read_u8()? {
            0 => None,
            1 => Some(reader.read_address()?),
            tag => {
                return Err(WireError::MalformedMessage(format!(
                    "invalid lookup table authority tag {tag}"
                )))
            }
        };

        if data.len() < LOOKUP_TABLE_META_SIZE {
            return Err(WireError::TruncatedInput {
                needed: LOOKUP_TABLE_META_SIZE,
                remaining: data.len(),
            });
        }
        let tail = &data[LOOKUP_TABLE_META_SIZE..];
        if tail.len() % ADDRESS_LEN != 0 {
            return Err(WireError::MalformedMessage(format!(
                "lookup table address section of {} bytes is not a multiple of {ADDRESS_LEN}",
                tail.len()
            )));
        }
        let addresses = tail
            .chunks_exact(ADDRESS_LEN)
            .map(Address::from_slice)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            type_index,
            deactivation_slot,
            last_extended_slot,
            last_extended_start_index,
            authority,
            addresses,
        })
    }

    pub fn is_active(&self) -> bool {
        self.deactivation_slot == ACTIVE_DEACTIVATION_SLOT
    }

    pub fn get(&self, index: u8) -> Option<&Address> {
        self.addresses.get(index as usize)
    }
}
