//! Profile store: the account's single profile record
//!
//! The store only ever addresses the fixed `"myProfile"` record of the bound
//! account, and exposes exactly two operations, so "one profile per account"
//! holds by construction.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::storage::Storage;
use crate::types::{ProfileRecord, MY_PROFILE_RECORD};

/// Narrow capability over the private per-account store
#[async_trait]
pub trait ProfileStore: Send + Sync + 'static {
    /// Fetch the account's profile record.
    ///
    /// `Ok(None)` means the record is confirmed absent (first run), which is
    /// distinct from an `Err` transport or storage failure.
    async fn fetch_mine(&self) -> StoreResult<Option<ProfileRecord>>;

    /// Upsert the account's profile record, replacing it entirely.
    ///
    /// Returns the record as stored.
    async fn save_mine(&self, record: ProfileRecord) -> StoreResult<ProfileRecord>;
}

/// Profile store backed by local redb storage.
///
/// The bound account is looked up on each call, so signing in or out between
/// calls takes effect immediately.
#[derive(Clone)]
pub struct LocalProfileStore {
    storage: Storage,
}

impl LocalProfileStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl ProfileStore for LocalProfileStore {
    async fn fetch_mine(&self) -> StoreResult<Option<ProfileRecord>> {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || {
            let account = storage
                .bound_account()?
                .ok_or(StoreError::NotAuthenticated)?;
            debug!(%account, "Fetching profile record");
            storage.load_record(&account, MY_PROFILE_RECORD)
        })
        .await
        .map_err(|e| StoreError::Transport(e.to_string()))?
    }

    async fn save_mine(&self, record: ProfileRecord) -> StoreResult<ProfileRecord> {
        if record.record_name() != MY_PROFILE_RECORD {
            return Err(StoreError::Storage(format!(
                "refusing to save record '{}', only '{}' is writable",
                record.record_name(),
                MY_PROFILE_RECORD
            )));
        }

        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || {
            let account = storage
                .bound_account()?
                .ok_or(StoreError::NotAuthenticated)?;
            debug!(%account, "Saving profile record");
            storage.save_record(&account, &record)?;
            Ok::<_, StoreError>(record)
        })
        .await
        .map_err(|e| StoreError::Transport(e.to_string()))?
    }
}
