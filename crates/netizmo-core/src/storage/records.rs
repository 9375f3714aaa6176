//! Record Storage - per-account records
//!
//! Stores records in redb keyed by `<account>/<record name>`. Asset bytes live
//! in the assets table; the stored record only keeps the asset's hash.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::types::{AccountId, Asset, ProfileRecord};
use redb::{ReadableTable, TableDefinition};

use super::assets::{put_asset, remove_asset, ASSETS_TABLE};
use super::Storage;

/// Table for storing records (key: "<account>/<record name>", value: serialized StoredRecord)
pub(crate) const RECORDS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// On-disk form of a record
#[derive(Serialize, Deserialize)]
struct StoredRecord {
    /// Record with its asset stripped
    record: ProfileRecord,
    asset_hash: Option<String>,
}

impl Storage {
    /// Save a record for an account
    ///
    /// Replaces any existing record with the same name. If the replaced record
    /// carried an asset that nothing references anymore, the asset is removed.
    pub fn save_record(&self, account: &AccountId, record: &ProfileRecord) -> Result<(), StoreError> {
        let key = account.record_key(record.record_name());

        let mut stripped = record.clone();
        let asset = stripped.take_asset();
        let stored = StoredRecord {
            record: stripped,
            asset_hash: asset.as_ref().map(|a| a.content_hash.clone()),
        };
        let serialized =
            postcard::to_allocvec(&stored).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        {
            if let Some(asset) = &asset {
                put_asset(&write_txn, &asset.content_hash, &asset.data)?;
            }

            let mut table = write_txn.open_table(RECORDS_TABLE)?;
            let previous = table
                .insert(key.as_str(), serialized.as_slice())?
                .map(|old| decode_stored(old.value()))
                .transpose()?;

            let orphan = previous
                .and_then(|old| old.asset_hash)
                .filter(|old_hash| Some(old_hash) != stored.asset_hash.as_ref());
            if let Some(old_hash) = orphan {
                let mut still_used = false;
                for entry in table.iter()? {
                    let (_, value) = entry?;
                    if decode_stored(value.value())?.asset_hash.as_deref() == Some(old_hash.as_str()) {
                        still_used = true;
                        break;
                    }
                }
                drop(table);
                if !still_used {
                    remove_asset(&write_txn, &old_hash)?;
                }
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Load a record by account and name, with its asset attached
    ///
    /// Returns `None` if the account has no such record.
    pub fn load_record(
        &self,
        account: &AccountId,
        record_name: &str,
    ) -> Result<Option<ProfileRecord>, StoreError> {
        let key = account.record_key(record_name);

        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let records = read_txn.open_table(RECORDS_TABLE)?;

        let Some(data) = records.get(key.as_str())? else {
            return Ok(None);
        };
        let StoredRecord {
            mut record,
            asset_hash,
        } = decode_stored(data.value())?;

        if let Some(hash) = asset_hash {
            let assets = read_txn.open_table(ASSETS_TABLE)?;
            let bytes = assets
                .get(hash.as_str())?
                .ok_or_else(|| StoreError::MissingAsset(hash.clone()))?
                .value()
                .to_vec();
            record.set_asset(Some(Asset {
                content_hash: hash,
                data: bytes,
            }));
        }

        Ok(Some(record))
    }
}

fn decode_stored(bytes: &[u8]) -> Result<StoredRecord, StoreError> {
    postcard::from_bytes(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}
