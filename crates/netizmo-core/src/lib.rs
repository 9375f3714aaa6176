//! Netizmo Core Library
//!
//! Profile persistence and sync for a single user's profile in a private,
//! per-account record store.
//!
//! ## Overview
//!
//! Each account owns exactly one profile record, named `"myProfile"`. The
//! core fetches it, decodes it into a [`Profile`], routes the first-run case
//! (no record yet) to a creation flow, and persists edits back as a full
//! replacement of the record.
//!
//! ## Components
//!
//! - [`ProfileRecordCodec`]: record <-> profile conversion, no I/O
//! - [`AuthenticationGate`]: synchronous "is an account bound?" check
//! - [`ProfileStore`]: `fetch_mine` / `save_mine` on the account's record
//! - [`ProfileSyncController`]: the state machine tying them together
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use netizmo_core::{IdentityTokenGate, LocalProfileStore, ProfileSyncController, Storage};
//!
//! let storage = Storage::new("~/.netizmo/data/netizmo.redb")?;
//! let gate = IdentityTokenGate::new(storage.clone());
//! let store = Arc::new(LocalProfileStore::new(storage));
//!
//! let mut controller = ProfileSyncController::new(gate, store, my_presenter);
//! controller.start()?;
//! controller.settle().await;
//! ```

pub mod auth;
pub mod codec;
pub mod config;
pub mod controller;
pub mod error;
pub mod presenter;
pub mod storage;
pub mod store;
pub mod types;

// Re-exports
pub use auth::{AuthenticationGate, IdentityTokenGate};
pub use codec::ProfileRecordCodec;
pub use config::ProfileConfig;
pub use controller::{InvalidTransition, ProfileSyncController, SyncState};
pub use error::{DecodeFailure, ImageError, StoreError, StoreResult};
pub use presenter::{NoProfileReason, ProfilePresenter};
pub use storage::Storage;
pub use store::{LocalProfileStore, ProfileStore};
pub use types::{
    AccountId, Asset, FieldValue, Profile, ProfileImage, ProfileRecord, ProfileView,
    MY_PROFILE_RECORD,
};
