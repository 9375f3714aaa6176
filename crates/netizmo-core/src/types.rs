//! Core types for the Netizmo profile core

use serde::{Deserialize, Serialize};

pub mod profile_image;
pub mod profile;
pub mod record;

pub use profile_image::ProfileImage;
pub use profile::{Profile, ProfileView};
pub use record::{Asset, FieldValue, ProfileRecord};

/// Name of the single profile record every account owns.
pub const MY_PROFILE_RECORD: &str = "myProfile";

/// Identity of the account bound to the private store.
///
/// This is the ambient identity token: when one is bound the private store is
/// reachable, and every record key is scoped under it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create an account id, rejecting blank names and names containing `/`
    /// (which separates the account from the record name in storage keys).
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.contains('/') {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage key for a record owned by this account
    pub fn record_key(&self, record_name: &str) -> String {
        format!("{}/{}", self.0, record_name)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
