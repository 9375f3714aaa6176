//! Authentication gate
//!
//! A synchronous, local check of whether an account is bound to the private
//! store. The controller consults it before any store operation. A `true`
//! answer is advisory: the store can still fail afterwards.

use tracing::warn;

use crate::storage::Storage;

/// Decides whether the private store is reachable at all
pub trait AuthenticationGate: Send + Sync {
    /// True when an identity token is bound. Must not touch the network.
    fn is_authenticated(&self) -> bool;
}

/// Gate backed by the account binding in local storage
#[derive(Clone)]
pub struct IdentityTokenGate {
    storage: Storage,
}

impl IdentityTokenGate {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

impl AuthenticationGate for IdentityTokenGate {
    fn is_authenticated(&self) -> bool {
        match self.storage.has_bound_account() {
            Ok(bound) => bound,
            Err(e) => {
                warn!(error = %e, "Failed to read account binding, treating as signed out");
                false
            }
        }
    }
}
