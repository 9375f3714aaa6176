//! Asset Storage - content-addressed record attachments
//!
//! Stores asset bytes in redb with their BLAKE3 hash as the key. Identical
//! payloads are stored once.

use crate::error::StoreError;
use redb::{ReadableTable, ReadableTableMetadata, TableDefinition, WriteTransaction};

use super::Storage;

/// Table for storing assets (key: BLAKE3 hash hex string, value: raw bytes)
pub(crate) const ASSETS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("assets");

/// Insert asset bytes inside an open write transaction unless already present
pub(super) fn put_asset(
    write_txn: &WriteTransaction,
    hash_hex: &str,
    data: &[u8],
) -> Result<(), StoreError> {
    let mut table = write_txn.open_table(ASSETS_TABLE)?;
    if table.get(hash_hex)?.is_none() {
        table.insert(hash_hex, data)?;
    }
    Ok(())
}

/// Remove an asset inside an open write transaction
pub(super) fn remove_asset(write_txn: &WriteTransaction, hash_hex: &str) -> Result<(), StoreError> {
    let mut table = write_txn.open_table(ASSETS_TABLE)?;
    table.remove(hash_hex)?;
    Ok(())
}

impl Storage {
    /// Load asset bytes by content hash
    ///
    /// Returns `None` if the asset doesn't exist.
    #[cfg(test)]
    pub(crate) fn load_asset(&self, hash_hex: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(ASSETS_TABLE)?;

        Ok(table.get(hash_hex)?.map(|data| data.value().to_vec()))
    }

    /// Check if an asset exists by hash
    pub fn asset_exists(&self, hash_hex: &str) -> Result<bool, StoreError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(ASSETS_TABLE)?;

        Ok(table.get(hash_hex)?.is_some())
    }

    /// Number of stored assets
    pub fn count_assets(&self) -> Result<u64, StoreError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(ASSETS_TABLE)?;

        Ok(table.len()?)
    }
}
