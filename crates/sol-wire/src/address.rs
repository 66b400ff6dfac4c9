//! Solana addresses.
//!
//! An address is the raw 32-byte Ed25519 public key, displayed as Base58.
//! There is no hashing step: the public key bytes ARE the address bytes.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::WireError;

/// Address length in bytes.
pub const ADDRESS_LEN: usize = 32;

/// A 32-byte Solana address.
///
/// Ordering compares the raw bytes, which is what the message builder uses to
/// break ties between accounts of the same role.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// 32 zero bytes, `11111111111111111111111111111111`. This is also the
    /// System Program id, and stands in for a blockhash that is not known yet.
    pub const NULL: Address = Address([0u8; ADDRESS_LEN]);

    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Build an address from a slice that must be exactly 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, WireError> {
        let arr: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| {
            WireError::InvalidAddress(format!(
                "expected {ADDRESS_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    pub fn to_bytes(self) -> [u8; ADDRESS_LEN] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }
}

impl FromStr for Address {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| WireError::InvalidAddress(format!("base58 decode failed: {e}")))?;
        Self::from_slice(&bytes)
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<Address> for [u8; ADDRESS_LEN] {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_base58())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AddressVisitor;

        impl Visitor<'_> for AddressVisitor {
            type Value = Address;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a base58 encoded 32-byte address")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Address, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(AddressVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_address_base58() {
        assert_eq!(Address::NULL.to_string(), "11111111111111111111111111111111");
        assert!(Address::NULL.is_null());
    }

    #[test]
    fn parse_null_address() {
        let address: Address = "11111111111111111111111111111111".parse().unwrap();
        assert_eq!(address, Address::NULL);
    }

    #[test]
    fn roundtrip_token_program() {
        let text = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
        let address: Address = text.parse().unwrap();
        assert_eq!(address.to_string(), text);
    }

    #[test]
    fn base58_matches_byte_form() {
        let mut bytes = [0u8; 32];
        bytes[0] = 3;
        let from_bytes = Address::new(bytes);
        let from_text: Address = "CiDwVBFgWV9E5MvXWoLgnEgn2hK7rJikbvfWavzAQz3".parse().unwrap();
        assert_eq!(from_bytes, from_text);
    }

    #[test]
    fn leading_zero_bytes_are_preserved() {
        let mut bytes = [0u8; 32];
        bytes[28..].copy_from_slice(&123_456_789u32.to_be_bytes());
        let address = Address::new(bytes);
        assert_eq!(address.to_string(), "1111111111111111111111111111BukQL");
        assert_eq!(
            "1111111111111111111111111111BukQL".parse::<Address>().unwrap(),
            address
        );
    }

    #[test]
    fn too_short_is_rejected() {
        // "1" decodes to a single zero byte.
        assert!(matches!(
            "1".parse::<Address>(),
            Err(WireError::InvalidAddress(_))
        ));
        assert!("12345".parse::<Address>().is_err());
    }

    #[test]
    fn too_long_is_rejected() {
        let text = bs58::encode([7u8; 33]).into_string();
        assert!(text.parse::<Address>().is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!("0x3000000000000000000000000000000000".parse::<Address>().is_err());
        assert!("not-a-valid-address!!!".parse::<Address>().is_err());
    }

    #[test]
    fn from_slice_checks_length() {
        assert!(Address::from_slice(&[1u8; 32]).is_ok());
        assert!(Address::from_slice(&[1u8; 31]).is_err());
    }

    #[test]
    fn ordering_is_bytewise() {
        let mut low = [0u8; 32];
        low[31] = 1;
        let mut high = [0u8; 32];
        high[0] = 1;
        assert!(Address::new(low) < Address::new(high));
    }

    #[test]
    fn serde_uses_base58_strings() {
        let address: Address = "CiDwVBFgWV9E5MvXWoLgnEgn2hK7rJikbvfWavzAQz3".parse().unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"CiDwVBFgWV9E5MvXWoLgnEgn2hK7rJikbvfWavzAQz3\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
        assert!(serde_json::from_str::<Address>("\"12345\"").is_err());
    }
}
