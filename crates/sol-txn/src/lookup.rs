//! Resolving v0 lookup table references from a snapshot of table contents.

use std::collections::HashMap;

use sol_wire::{
    Address, AddressLookupTableAccount, LoadedAddresses, MessageAddressTableLookup, WireError,
};

use crate::error::TxError;

/// Table address to stored addresses, captured by the caller (typically from
/// `getAccountInfo` results) and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct LookupTableResolver {
    tables: HashMap<Address, Vec<Address>>,
}

impl LookupTableResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table by its stored addresses.
    pub fn with_table(mut self, key: Address, addresses: Vec<Address>) -> Self {
        self.tables.insert(key, addresses);
        self
    }

    /// Register a table from its raw account data.
    pub fn with_account_data(self, key: Address, data: &[u8]) -> Result<Self, TxError> {
        let table = AddressLookupTableAccount::decode(data)?;
        Ok(self.with_table(key, table.addresses))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Resolve lookups in message order: every table's writable indexes in
    /// turn, then every table's readonly indexes.
    pub fn resolve(
        &self,
        lookups: &[MessageAddressTableLookup],
    ) -> Result<LoadedAddresses, TxError> {
        let mut loaded = LoadedAddresses::default();

        for lookup in lookups {
            let table = self.table(&lookup.account_key)?;
            loaded
                .writable
                .extend(Self::pick(table, &lookup.writable_indexes)?);
        }
        for lookup in lookups {
            let table = self.table(&lookup.account_key)?;
            loaded
                .readonly
                .extend(Self::pick(table, &lookup.readonly_indexes)?);
        }

        Ok(loaded)
    }

    fn table(&self, key: &Address) -> Result<&[Address], TxError> {
        self.tables.get(key).map(Vec::as_slice).ok_or_else(|| {
            TxError::from(WireError::MissingLookupTableData(format!(
                "lookup table {key} not supplied"
            )))
        })
    }

    fn pick(table: &[Address], indexes: &[u8]) -> Result<Vec<Address>, TxError> {
        indexes
            .iter()
            .map(|i| {
                table.get(*i as usize).copied().ok_or_else(|| {
                    TxError::from(WireError::UnknownAccountIndex {
                        index: *i as usize,
                        available: table.len(),
                    })
                })
            })
            .collect()
    }
}
