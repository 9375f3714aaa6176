//! Persistent storage using redb.
//!
//! This module backs the private per-account store:
//! - The bound account (the ambient identity token)
//! - Records, keyed by `<account>/<record name>`
//! - Record assets (content-addressed by BLAKE3)

use crate::error::StoreError;
use crate::types::AccountId;
use parking_lot::RwLock;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

// Submodules
mod assets;
mod records;

use assets::ASSETS_TABLE;
use records::RECORDS_TABLE;

// Table definitions
const IDENTITY_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("identity");

/// Storage layer using redb for ACID-compliant persistence
#[derive(Clone)]
pub struct Storage {
    db: Arc<RwLock<Database>>,
}

impl Storage {
    /// Create a new storage instance at the given path.
    ///
    /// This will:
    /// - Create the database directory if it doesn't exist
    /// - Initialize the database file
    /// - Create all required tables
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(IDENTITY_TABLE)?;
            let _ = write_txn.open_table(RECORDS_TABLE)?;
            let _ = write_txn.open_table(ASSETS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
        })
    }

    /// Get a reference to the shared database handle
    pub(crate) fn db_handle(&self) -> Arc<RwLock<Database>> {
        self.db.clone()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Identity Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Identity storage key (there's only one bound account per device)
    const IDENTITY_KEY: &'static str = "bound_account";

    /// Bind an account to this device, replacing any previous binding.
    pub fn bind_account(&self, account: &AccountId) -> Result<(), StoreError> {
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(IDENTITY_TABLE)?;
            table.insert(Self::IDENTITY_KEY, account.as_str().as_bytes())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Remove the account binding. Records stay in place for the next login.
    pub fn unbind_account(&self) -> Result<(), StoreError> {
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(IDENTITY_TABLE)?;
            table.remove(Self::IDENTITY_KEY)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Load the bound account.
    ///
    /// Returns `None` if no account is bound.
    pub fn bound_account(&self) -> Result<Option<AccountId>, StoreError> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(IDENTITY_TABLE)?;

        match table.get(Self::IDENTITY_KEY)? {
            Some(v) => {
                let name = std::str::from_utf8(v.value())
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(AccountId::new(name))
            }
            None => Ok(None),
        }
    }

    /// Check if an account is bound.
    pub fn has_bound_account(&self) -> Result<bool, StoreError> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(IDENTITY_TABLE)?;

        Ok(table.get(Self::IDENTITY_KEY)?.is_some())
    }
}
