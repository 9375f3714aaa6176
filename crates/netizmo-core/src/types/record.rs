//! Durable record representation
//!
//! A record is a bag of named fields plus at most one binary asset, addressed
//! by a record name. This is the shape the private store persists; the codec
//! maps it to and from `Profile`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::MY_PROFILE_RECORD;

/// Value held by a record field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    String(String),
    StringList(Vec<String>),
    Integer(i64),
}

impl FieldValue {
    /// Short name of the value kind, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::String(_) => "string",
            FieldValue::StringList(_) => "list of strings",
            FieldValue::Integer(_) => "integer",
        }
    }
}

/// Binary payload attached to a record (e.g. the profile picture)
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// BLAKE3 hex hash of `data`
    pub content_hash: String,
    pub data: Vec<u8>,
}

impl Asset {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            content_hash: blake3::hash(&data).to_hex().to_string(),
            data,
        }
    }
}

impl std::fmt::Debug for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Asset")
            .field("content_hash", &self.content_hash)
            .field("len", &self.data.len())
            .finish()
    }
}

/// A durable record as stored in the private database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    record_name: String,
    fields: BTreeMap<String, FieldValue>,
    asset: Option<Asset>,
}

impl ProfileRecord {
    /// Empty record addressed as the account's profile record
    pub fn new() -> Self {
        Self {
            record_name: MY_PROFILE_RECORD.to_string(),
            fields: BTreeMap::new(),
            asset: None,
        }
    }

    pub fn record_name(&self) -> &str {
        &self.record_name
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.insert(key.into(), value);
    }

    pub fn remove_field(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn asset(&self) -> Option<&Asset> {
        self.asset.as_ref()
    }

    pub fn set_asset(&mut self, asset: Option<Asset>) {
        self.asset = asset;
    }

    pub fn take_asset(&mut self) -> Option<Asset> {
        self.asset.take()
    }
}

impl Default for ProfileRecord {
    fn default() -> Self {
        Self::new()
    }
}
