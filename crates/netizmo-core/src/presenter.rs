//! Presentation and edit-flow boundary
//!
//! The controller calls into a `ProfilePresenter`; it never renders anything
//! itself. All calls happen on the context that owns the controller.

use crate::error::StoreError;
use crate::types::Profile;

/// Why no profile could be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoProfileReason {
    /// The account has no profile record yet
    Absent,
    /// A record exists but could not be decoded
    Unreadable,
}

/// Receiver of everything the profile screen needs to show
pub trait ProfilePresenter {
    /// A profile was loaded or saved and should be displayed
    fn on_profile_ready(&mut self, profile: &Profile);

    /// There is no usable profile; a creation flow follows
    fn on_no_profile(&mut self, reason: NoProfileReason);

    /// No account is bound; the user must sign in out of band, then retry
    fn on_auth_required(&mut self);

    /// The store failed. Nothing was changed; the user may retry
    fn on_store_error(&mut self, error: &StoreError);

    /// Open the create/edit flow, pre-filled with `existing` when editing
    fn on_edit_requested(&mut self, existing: Option<&Profile>);
}
