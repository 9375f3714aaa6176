//! ProfileSyncController - drives the profile screen
//!
//! Coordinates the authentication gate, the profile store and the codec:
//! - Gate check before any store operation
//! - Fetch, then decode or route to the creation flow
//! - Persist edits, then re-present the saved profile
//!
//! ```text
//! Idle ─start─> CheckingAuth ─┬─> Unauthenticated
//!                             └─> Fetching ─┬─> ProfileLoaded
//!                                           ├─> NoProfile ─> Editing
//!                                           └─> StoreFailed ─start─> CheckingAuth
//! ProfileLoaded ─begin_edit─> Editing ─on_saved─> Saving ─┬─> ProfileLoaded
//!                                                         └─> Editing (on error)
//! Editing ─cancel_edit─> ProfileLoaded | NoProfile
//! ```
//!
//! Store calls run on spawned tokio tasks. Their results come back over a
//! channel and are applied only by the owner of the controller (through
//! `next_completion`, `process_pending` or `settle`), so state, the cached
//! profile and presenter calls all stay on one context. Every request carries
//! a generation number; results for a superseded request are dropped. If the
//! controller is dropped while a request is in flight, the result is
//! discarded when its send fails.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::auth::AuthenticationGate;
use crate::codec::ProfileRecordCodec;
use crate::error::{StoreError, StoreResult};
use crate::presenter::{NoProfileReason, ProfilePresenter};
use crate::store::ProfileStore;
use crate::types::{Profile, ProfileRecord, ProfileView};

/// Where the controller is in the load/edit cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    CheckingAuth,
    Unauthenticated,
    Fetching,
    NoProfile(NoProfileReason),
    ProfileLoaded,
    Editing,
    Saving,
    /// The last store operation failed with this message
    StoreFailed(String),
}

/// An operation was requested in a state that does not allow it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot {action} while {state:?}")]
pub struct InvalidTransition {
    pub action: &'static str,
    pub state: SyncState,
}

/// Result of a background store call, sent back to the owning context
enum Completion {
    Fetched {
        generation: u64,
        result: StoreResult<Option<ProfileRecord>>,
    },
    Saved {
        generation: u64,
        profile: Profile,
        result: StoreResult<ProfileRecord>,
    },
}

impl Completion {
    fn generation(&self) -> u64 {
        match self {
            Completion::Fetched { generation, .. } | Completion::Saved { generation, .. } => {
                *generation
            }
        }
    }
}

pub struct ProfileSyncController<G, S, P> {
    gate: G,
    store: Arc<S>,
    presenter: P,
    state: SyncState,
    /// Last profile loaded or saved this session
    current: Option<Profile>,
    /// Why `current` is empty, restored when creation is cancelled
    no_profile_reason: NoProfileReason,
    /// Generation of the newest request issued
    generation: u64,
    /// Generation still awaiting its completion, if any
    pending: Option<u64>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
}

impl<G, S, P> ProfileSyncController<G, S, P>
where
    G: AuthenticationGate,
    S: ProfileStore,
    P: ProfilePresenter,
{
    pub fn new(gate: G, store: Arc<S>, presenter: P) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            gate,
            store,
            presenter,
            state: SyncState::Idle,
            current: None,
            no_profile_reason: NoProfileReason::Absent,
            generation: 0,
            pending: None,
            completion_tx,
            completion_rx,
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn current_profile(&self) -> Option<&Profile> {
        self.current.as_ref()
    }

    /// Display projection of the current profile
    pub fn current_view(&self) -> Option<ProfileView> {
        self.current.as_ref().map(ProfileView::from)
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// True while a store request is outstanding
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Check authentication and fetch the profile.
    ///
    /// Also the retry entry point after `Unauthenticated`, `StoreFailed` or a
    /// cancelled creation, and a refresh from `ProfileLoaded`. A fetch already in flight is
    /// superseded. Must be called inside a tokio runtime.
    pub fn start(&mut self) -> Result<(), InvalidTransition> {
        match self.state {
            SyncState::Idle
            | SyncState::Unauthenticated
            | SyncState::StoreFailed(_)
            | SyncState::ProfileLoaded
            | SyncState::NoProfile(_)
            | SyncState::Fetching => {}
            _ => return Err(self.invalid("start")),
        }

        // Any fetch still in flight is now stale
        self.pending = None;
        self.state = SyncState::CheckingAuth;
        if !self.gate.is_authenticated() {
            self.enter_unauthenticated();
            return Ok(());
        }

        let generation = self.next_generation();
        self.state = SyncState::Fetching;
        info!(generation, "Fetching profile");

        let store = Arc::clone(&self.store);
        let tx = self.completion_tx.clone();
        let handle = tokio::spawn(async move { store.fetch_mine().await });
        tokio::spawn(async move {
            // A panicking store call still completes the request, as a transport error
            let result = handle
                .await
                .unwrap_or_else(|e| Err(StoreError::Transport(e.to_string())));
            if tx.send(Completion::Fetched { generation, result }).is_err() {
                debug!(generation, "Controller gone, dropping fetch result");
            }
        });
        Ok(())
    }

    /// Open the edit flow for the current profile.
    ///
    /// Not allowed after a failed fetch: the stored profile is unknown then,
    /// and only `start` leads out of `StoreFailed`.
    pub fn begin_edit(&mut self) -> Result<(), InvalidTransition> {
        match self.state {
            SyncState::ProfileLoaded | SyncState::NoProfile(_) => {}
            _ => return Err(self.invalid("edit")),
        }

        self.state = SyncState::Editing;
        self.presenter.on_edit_requested(self.current.as_ref());
        Ok(())
    }

    /// Leave the edit flow without saving.
    pub fn cancel_edit(&mut self) -> Result<(), InvalidTransition> {
        if self.state != SyncState::Editing {
            return Err(self.invalid("cancel edit"));
        }

        match &self.current {
            Some(profile) => {
                self.state = SyncState::ProfileLoaded;
                self.presenter.on_profile_ready(profile);
            }
            None => {
                let reason = self.no_profile_reason;
                self.state = SyncState::NoProfile(reason);
                self.presenter.on_no_profile(reason);
            }
        }
        Ok(())
    }

    /// The edit flow finished with `profile`; persist it, then present it.
    ///
    /// The cached profile and the presenter are only updated once the store
    /// confirms the save.
    pub fn on_saved(&mut self, profile: Profile) -> Result<(), InvalidTransition> {
        if self.state != SyncState::Editing {
            return Err(self.invalid("save"));
        }

        if !self.gate.is_authenticated() {
            self.enter_unauthenticated();
            return Ok(());
        }

        let generation = self.next_generation();
        self.state = SyncState::Saving;
        info!(generation, "Saving profile");

        let record = ProfileRecordCodec::encode(&profile);
        let store = Arc::clone(&self.store);
        let tx = self.completion_tx.clone();
        let handle = tokio::spawn(async move { store.save_mine(record).await });
        tokio::spawn(async move {
            let result = handle
                .await
                .unwrap_or_else(|e| Err(StoreError::Transport(e.to_string())));
            let completion = Completion::Saved {
                generation,
                profile,
                result,
            };
            if tx.send(completion).is_err() {
                debug!(generation, "Controller gone, dropping save result");
            }
        });
        Ok(())
    }

    /// Wait for the next store result and apply it.
    ///
    /// Returns `false` immediately when nothing is in flight.
    pub async fn next_completion(&mut self) -> bool {
        if self.pending.is_none() {
            return false;
        }
        match self.completion_rx.recv().await {
            Some(completion) => {
                self.apply(completion);
                true
            }
            None => false,
        }
    }

    /// Apply every result that has already arrived, without waiting.
    ///
    /// Suited to a UI loop that polls once per frame. Returns how many
    /// results were processed, stale ones included.
    pub fn process_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(completion) = self.completion_rx.try_recv() {
            self.apply(completion);
            processed += 1;
        }
        processed
    }

    /// Apply results until no request is outstanding.
    pub async fn settle(&mut self) {
        while self.next_completion().await {}
    }

    fn apply(&mut self, completion: Completion) {
        let generation = completion.generation();
        if self.pending != Some(generation) {
            debug!(generation, current = self.generation, "Dropping stale completion");
            return;
        }
        self.pending = None;

        match completion {
            Completion::Fetched { result, .. } => self.apply_fetch(result),
            Completion::Saved {
                profile, result, ..
            } => self.apply_save(profile, result),
        }
    }

    fn apply_fetch(&mut self, result: StoreResult<Option<ProfileRecord>>) {
        match result {
            Ok(Some(record)) => match ProfileRecordCodec::decode(&record) {
                Ok(profile) => {
                    info!("Profile loaded");
                    self.state = SyncState::ProfileLoaded;
                    self.presenter.on_profile_ready(&profile);
                    self.current = Some(profile);
                }
                Err(failure) => {
                    warn!(%failure, "Stored profile is unreadable, starting creation flow");
                    self.enter_no_profile(NoProfileReason::Unreadable);
                }
            },
            Ok(None) => {
                info!("No profile yet, starting creation flow");
                self.enter_no_profile(NoProfileReason::Absent);
            }
            Err(StoreError::NotAuthenticated) => self.enter_unauthenticated(),
            Err(e) => {
                warn!(error = %e, "Profile fetch failed");
                self.enter_store_failed(&e);
            }
        }
    }

    fn apply_save(&mut self, profile: Profile, result: StoreResult<ProfileRecord>) {
        match result {
            Ok(_) => {
                info!("Profile saved");
                self.state = SyncState::ProfileLoaded;
                self.presenter.on_profile_ready(&profile);
                self.current = Some(profile);
            }
            Err(StoreError::NotAuthenticated) => self.enter_unauthenticated(),
            Err(e) => {
                warn!(error = %e, "Profile save failed, edit can be resubmitted");
                self.state = SyncState::Editing;
                self.presenter.on_store_error(&e);
            }
        }
    }

    fn enter_no_profile(&mut self, reason: NoProfileReason) {
        self.current = None;
        self.no_profile_reason = reason;
        self.state = SyncState::NoProfile(reason);
        self.presenter.on_no_profile(reason);

        self.state = SyncState::Editing;
        self.presenter.on_edit_requested(None);
    }

    fn enter_unauthenticated(&mut self) {
        info!("No account bound, sign-in required");
        self.state = SyncState::Unauthenticated;
        self.presenter.on_auth_required();
    }

    fn enter_store_failed(&mut self, error: &StoreError) {
        self.state = SyncState::StoreFailed(error.to_string());
        self.presenter.on_store_error(error);
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.pending = Some(self.generation);
        self.generation
    }

    fn invalid(&self, action: &'static str) -> InvalidTransition {
        InvalidTransition {
            action,
            state: self.state.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FIELD_NEED;
    use crate::types::FieldValue;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    // ========================================================================
    // Test doubles
    // ========================================================================

    #[derive(Clone, Default)]
    struct FakeGate(Arc<AtomicBool>);

    impl FakeGate {
        fn signed_in() -> Self {
            Self(Arc::new(AtomicBool::new(true)))
        }

        fn signed_out() -> Self {
            Self(Arc::new(AtomicBool::new(false)))
        }

        fn set(&self, value: bool) {
            self.0.store(value, Ordering::SeqCst);
        }
    }

    impl AuthenticationGate for FakeGate {
        fn is_authenticated(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct FakeStore {
        record: Mutex<Option<ProfileRecord>>,
        fail_fetch: AtomicBool,
        fail_save: AtomicBool,
        panic_fetch: AtomicBool,
        fetch_calls: AtomicUsize,
        save_calls: AtomicUsize,
        /// When set, fetches wait for a notification before answering
        hold: Option<Arc<Notify>>,
    }

    impl FakeStore {
        fn with_profile(profile: &Profile) -> Self {
            Self {
                record: Mutex::new(Some(ProfileRecordCodec::encode(profile))),
                ..Default::default()
            }
        }

        fn with_record(record: ProfileRecord) -> Self {
            Self {
                record: Mutex::new(Some(record)),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ProfileStore for FakeStore {
        async fn fetch_mine(&self) -> StoreResult<Option<ProfileRecord>> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(hold) = &self.hold {
                hold.notified().await;
            }
            if self.panic_fetch.load(Ordering::SeqCst) {
                panic!("store backend crashed");
            }
            if self.fail_fetch.load(Ordering::SeqCst) {
                return Err(StoreError::Transport("network unreachable".into()));
            }
            Ok(self.record.lock().clone())
        }

        async fn save_mine(&self, record: ProfileRecord) -> StoreResult<ProfileRecord> {
            self.save_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_save.load(Ordering::SeqCst) {
                return Err(StoreError::Transport("network unreachable".into()));
            }
            *self.record.lock() = Some(record.clone());
            Ok(record)
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Ready(Profile),
        NoProfile(NoProfileReason),
        AuthRequired,
        StoreError(String),
        EditRequested(Option<Profile>),
    }

    #[derive(Default)]
    struct RecordingPresenter {
        events: Vec<Event>,
    }

    impl RecordingPresenter {
        fn last_ready(&self) -> Option<&Profile> {
            self.events.iter().rev().find_map(|e| match e {
                Event::Ready(p) => Some(p),
                _ => None,
            })
        }
    }

    impl ProfilePresenter for RecordingPresenter {
        fn on_profile_ready(&mut self, profile: &Profile) {
            self.events.push(Event::Ready(profile.clone()));
        }

        fn on_no_profile(&mut self, reason: NoProfileReason) {
            self.events.push(Event::NoProfile(reason));
        }

        fn on_auth_required(&mut self) {
            self.events.push(Event::AuthRequired);
        }

        fn on_store_error(&mut self, error: &StoreError) {
            self.events.push(Event::StoreError(error.to_string()));
        }

        fn on_edit_requested(&mut self, existing: Option<&Profile>) {
            self.events.push(Event::EditRequested(existing.cloned()));
        }
    }

    type TestController = ProfileSyncController<FakeGate, FakeStore, RecordingPresenter>;

    fn controller(gate: FakeGate, store: FakeStore) -> (TestController, Arc<FakeStore>) {
        let store = Arc::new(store);
        let controller =
            ProfileSyncController::new(gate, Arc::clone(&store), RecordingPresenter::default());
        (controller, store)
    }

    fn sample_profile() -> Profile {
        Profile::new("Kyle", "Yoon", "A backend engineer").with_skills(["ios", "design"])
    }

    // ========================================================================
    // Authentication gate
    // ========================================================================

    #[tokio::test]
    async fn test_unauthenticated_never_touches_store() {
        let (mut ctl, store) = controller(FakeGate::signed_out(), FakeStore::default());

        ctl.start().unwrap();
        ctl.settle().await;

        assert_eq!(ctl.state(), &SyncState::Unauthenticated);
        assert_eq!(ctl.presenter().events, vec![Event::AuthRequired]);
        assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.save_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_save_blocked_when_signed_out_mid_edit() {
        let gate = FakeGate::signed_in();
        let (mut ctl, store) = controller(gate.clone(), FakeStore::default());

        ctl.start().unwrap();
        ctl.settle().await;
        assert_eq!(ctl.state(), &SyncState::Editing);

        gate.set(false);
        ctl.on_saved(sample_profile()).unwrap();
        ctl.settle().await;

        assert_eq!(ctl.state(), &SyncState::Unauthenticated);
        assert_eq!(store.save_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retry_after_sign_in() {
        let gate = FakeGate::signed_out();
        let (mut ctl, _store) =
            controller(gate.clone(), FakeStore::with_profile(&sample_profile()));

        ctl.start().unwrap();
        assert_eq!(ctl.state(), &SyncState::Unauthenticated);

        gate.set(true);
        ctl.start().unwrap();
        ctl.settle().await;

        assert_eq!(ctl.state(), &SyncState::ProfileLoaded);
        assert_eq!(ctl.current_profile(), Some(&sample_profile()));
    }

    // ========================================================================
    // Fetch outcomes
    // ========================================================================

    #[tokio::test]
    async fn test_existing_profile_is_loaded() {
        let (mut ctl, _store) =
            controller(FakeGate::signed_in(), FakeStore::with_profile(&sample_profile()));

        ctl.start().unwrap();
        assert_eq!(ctl.state(), &SyncState::Fetching);
        ctl.settle().await;

        assert_eq!(ctl.state(), &SyncState::ProfileLoaded);
        assert_eq!(ctl.current_profile(), Some(&sample_profile()));
        assert_eq!(
            ctl.presenter().events,
            vec![Event::Ready(sample_profile())]
        );
    }

    #[tokio::test]
    async fn test_absent_profile_routes_to_creation() {
        let (mut ctl, _store) = controller(FakeGate::signed_in(), FakeStore::default());

        ctl.start().unwrap();
        ctl.settle().await;

        assert_eq!(ctl.state(), &SyncState::Editing);
        assert!(ctl.current_profile().is_none());
        assert_eq!(
            ctl.presenter().events,
            vec![
                Event::NoProfile(NoProfileReason::Absent),
                Event::EditRequested(None)
            ]
        );
    }

    #[tokio::test]
    async fn test_unreadable_record_routes_to_creation() {
        let mut record = ProfileRecordCodec::encode(&sample_profile());
        record.remove_field(FIELD_NEED);
        let (mut ctl, _store) = controller(FakeGate::signed_in(), FakeStore::with_record(record));

        ctl.start().unwrap();
        ctl.settle().await;

        assert_eq!(ctl.state(), &SyncState::Editing);
        assert!(ctl.current_profile().is_none());
        assert_eq!(
            ctl.presenter().events[0],
            Event::NoProfile(NoProfileReason::Unreadable)
        );
    }

    #[tokio::test]
    async fn test_wrong_shape_record_routes_to_creation() {
        let mut record = ProfileRecordCodec::encode(&sample_profile());
        record.set_field(FIELD_NEED, FieldValue::StringList(vec!["x".into()]));
        let (mut ctl, _store) = controller(FakeGate::signed_in(), FakeStore::with_record(record));

        ctl.start().unwrap();
        ctl.settle().await;

        assert!(matches!(
            ctl.presenter().events[0],
            Event::NoProfile(NoProfileReason::Unreadable)
        ));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_route_to_creation() {
        let store = FakeStore::with_profile(&sample_profile());
        store.fail_fetch.store(true, Ordering::SeqCst);
        let (mut ctl, _store) = controller(FakeGate::signed_in(), store);

        ctl.start().unwrap();
        ctl.settle().await;

        assert!(matches!(ctl.state(), SyncState::StoreFailed(_)));
        assert_eq!(ctl.presenter().events.len(), 1);
        assert!(matches!(ctl.presenter().events[0], Event::StoreError(_)));

        let err = ctl.begin_edit().unwrap_err();
        assert_eq!(err.action, "edit");
        assert!(matches!(err.state, SyncState::StoreFailed(_)));
    }

    #[tokio::test]
    async fn test_panicking_fetch_becomes_store_failure() {
        let store = FakeStore::with_profile(&sample_profile());
        store.panic_fetch.store(true, Ordering::SeqCst);
        let (mut ctl, store) = controller(FakeGate::signed_in(), store);

        ctl.start().unwrap();
        ctl.settle().await;

        assert!(matches!(ctl.state(), SyncState::StoreFailed(_)));
        assert!(!ctl.is_busy());

        store.panic_fetch.store(false, Ordering::SeqCst);
        ctl.start().unwrap();
        ctl.settle().await;
        assert_eq!(ctl.state(), &SyncState::ProfileLoaded);
    }

    #[tokio::test]
    async fn test_failed_fetch_never_overwrites_stored_profile() {
        let store = FakeStore::with_profile(&sample_profile());
        store.fail_fetch.store(true, Ordering::SeqCst);
        let (mut ctl, store) = controller(FakeGate::signed_in(), store);

        ctl.start().unwrap();
        ctl.settle().await;

        assert!(ctl.begin_edit().is_err());
        assert!(ctl.on_saved(Profile::new("New", "Person", "Anything")).is_err());
        ctl.settle().await;

        assert!(!ctl
            .presenter()
            .events
            .iter()
            .any(|e| matches!(e, Event::EditRequested(_))));
        assert_eq!(store.save_calls.load(Ordering::SeqCst), 0);
        let stored = store.record.lock().clone().unwrap();
        assert_eq!(ProfileRecordCodec::decode(&stored).unwrap(), sample_profile());
    }

    #[tokio::test]
    async fn test_retry_after_store_error() {
        let store = FakeStore::with_profile(&sample_profile());
        store.fail_fetch.store(true, Ordering::SeqCst);
        let (mut ctl, store) = controller(FakeGate::signed_in(), store);

        ctl.start().unwrap();
        ctl.settle().await;

        store.fail_fetch.store(false, Ordering::SeqCst);
        ctl.start().unwrap();
        ctl.settle().await;

        assert_eq!(ctl.state(), &SyncState::ProfileLoaded);
        assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 2);
    }

    // ========================================================================
    // Edit / save round-trip
    // ========================================================================

    #[tokio::test]
    async fn test_first_run_creation_then_display() {
        let (mut ctl, store) = controller(FakeGate::signed_in(), FakeStore::default());

        ctl.start().unwrap();
        ctl.settle().await;
        assert_eq!(ctl.state(), &SyncState::Editing);

        let created = sample_profile();
        ctl.on_saved(created.clone()).unwrap();
        assert_eq!(ctl.state(), &SyncState::Saving);
        ctl.settle().await;

        assert_eq!(ctl.state(), &SyncState::ProfileLoaded);
        assert_eq!(ctl.current_profile(), Some(&created));
        assert_eq!(ctl.presenter().last_ready(), Some(&created));

        let stored = store.record.lock().clone().unwrap();
        assert_eq!(ProfileRecordCodec::decode(&stored).unwrap(), created);
    }

    #[tokio::test]
    async fn test_re_edit_replaces_profile() {
        let (mut ctl, _store) =
            controller(FakeGate::signed_in(), FakeStore::with_profile(&sample_profile()));
        ctl.start().unwrap();
        ctl.settle().await;

        ctl.begin_edit().unwrap();
        assert_eq!(
            ctl.presenter().events.last(),
            Some(&Event::EditRequested(Some(sample_profile())))
        );

        let edited = Profile::new("Kyle", "Yoon", "A designer").with_skills(["figma"]);
        ctl.on_saved(edited.clone()).unwrap();
        ctl.settle().await;

        assert_eq!(ctl.current_profile(), Some(&edited));
        assert_eq!(ctl.presenter().last_ready(), Some(&edited));
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_profile() {
        let (mut ctl, store) =
            controller(FakeGate::signed_in(), FakeStore::with_profile(&sample_profile()));
        ctl.start().unwrap();
        ctl.settle().await;

        store.fail_save.store(true, Ordering::SeqCst);
        ctl.begin_edit().unwrap();
        ctl.on_saved(Profile::new("X", "Y", "Z")).unwrap();
        ctl.settle().await;

        assert_eq!(ctl.state(), &SyncState::Editing);
        assert_eq!(ctl.current_profile(), Some(&sample_profile()));
        assert!(matches!(
            ctl.presenter().events.last(),
            Some(Event::StoreError(_))
        ));

        // The edit can be resubmitted once the store recovers
        store.fail_save.store(false, Ordering::SeqCst);
        ctl.on_saved(Profile::new("X", "Y", "Z")).unwrap();
        ctl.settle().await;
        assert_eq!(ctl.state(), &SyncState::ProfileLoaded);
    }

    #[tokio::test]
    async fn test_cancel_edit_restores_display() {
        let (mut ctl, _store) =
            controller(FakeGate::signed_in(), FakeStore::with_profile(&sample_profile()));
        ctl.start().unwrap();
        ctl.settle().await;

        ctl.begin_edit().unwrap();
        ctl.cancel_edit().unwrap();

        assert_eq!(ctl.state(), &SyncState::ProfileLoaded);
        assert_eq!(ctl.presenter().last_ready(), Some(&sample_profile()));
    }

    #[tokio::test]
    async fn test_cancelled_creation_can_refresh() {
        let (mut ctl, store) = controller(FakeGate::signed_in(), FakeStore::default());
        ctl.start().unwrap();
        ctl.settle().await;

        ctl.cancel_edit().unwrap();
        assert_eq!(ctl.state(), &SyncState::NoProfile(NoProfileReason::Absent));

        // Profile created elsewhere in the meantime
        *store.record.lock() = Some(ProfileRecordCodec::encode(&sample_profile()));
        ctl.start().unwrap();
        ctl.settle().await;

        assert_eq!(ctl.state(), &SyncState::ProfileLoaded);
        assert_eq!(ctl.current_profile(), Some(&sample_profile()));
    }

    #[tokio::test]
    async fn test_cancel_keeps_unreadable_reason() {
        let mut record = ProfileRecordCodec::encode(&sample_profile());
        record.remove_field(FIELD_NEED);
        let (mut ctl, _store) = controller(FakeGate::signed_in(), FakeStore::with_record(record));
        ctl.start().unwrap();
        ctl.settle().await;

        ctl.cancel_edit().unwrap();

        assert_eq!(
            ctl.state(),
            &SyncState::NoProfile(NoProfileReason::Unreadable)
        );
        assert_eq!(
            ctl.presenter().events.last(),
            Some(&Event::NoProfile(NoProfileReason::Unreadable))
        );
        assert!(ctl.start().is_ok());
    }

    #[tokio::test]
    async fn test_save_outside_edit_is_rejected() {
        let (mut ctl, store) =
            controller(FakeGate::signed_in(), FakeStore::with_profile(&sample_profile()));
        ctl.start().unwrap();
        ctl.settle().await;

        let err = ctl.on_saved(sample_profile()).unwrap_err();
        assert_eq!(err.action, "save");
        assert_eq!(err.state, SyncState::ProfileLoaded);
        assert_eq!(store.save_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_rejected_while_editing() {
        let (mut ctl, _store) = controller(FakeGate::signed_in(), FakeStore::default());
        ctl.start().unwrap();
        ctl.settle().await;

        assert!(ctl.start().is_err());
    }

    // ========================================================================
    // Presentation projection
    // ========================================================================

    #[tokio::test]
    async fn test_zero_skills_gives_zero_items() {
        let profile = Profile::new("A", "B", "C").with_skills(Vec::<String>::new());
        let (mut ctl, _store) =
            controller(FakeGate::signed_in(), FakeStore::with_profile(&profile));
        ctl.start().unwrap();
        ctl.settle().await;

        let view = ctl.current_view().unwrap();
        assert_eq!(view.item_count(), 0);
        assert_eq!(view.display_name, "A B");
    }

    // ========================================================================
    // Completion delivery
    // ========================================================================

    #[tokio::test]
    async fn test_superseded_fetch_is_dropped() {
        let hold = Arc::new(Notify::new());
        let store = FakeStore {
            hold: Some(Arc::clone(&hold)),
            ..FakeStore::with_profile(&sample_profile())
        };
        let (mut ctl, store) = controller(FakeGate::signed_in(), store);

        ctl.start().unwrap();
        ctl.start().unwrap();

        // Wait until both fetches are parked, then release them together
        while store.fetch_calls.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }
        hold.notify_waiters();
        ctl.settle().await;

        assert_eq!(ctl.state(), &SyncState::ProfileLoaded);
        // Only the newest fetch reached the presenter
        assert_eq!(
            ctl.presenter().events,
            vec![Event::Ready(sample_profile())]
        );
    }

    #[tokio::test]
    async fn test_completion_after_teardown_is_noop() {
        let hold = Arc::new(Notify::new());
        let store = FakeStore {
            hold: Some(Arc::clone(&hold)),
            ..FakeStore::with_profile(&sample_profile())
        };
        let (mut ctl, store) = controller(FakeGate::signed_in(), store);

        ctl.start().unwrap();
        while store.fetch_calls.load(Ordering::SeqCst) < 1 {
            tokio::task::yield_now().await;
        }
        drop(ctl);

        hold.notify_waiters();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_process_pending_without_results() {
        let (mut ctl, _store) = controller(FakeGate::signed_in(), FakeStore::default());
        assert_eq!(ctl.process_pending(), 0);
        assert!(!ctl.next_completion().await);
        assert!(!ctl.is_busy());
    }
}
