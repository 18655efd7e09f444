//! Testing utilities for ECM workspace
//!
//! Shared fixtures and scripted collaborators.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::Utc;
use ecm_core::{
    BulkEngine, CaseStore, EngineConfig, EventToken, IdentityError, IdentityResolver,
    InMemoryCaseStore, PropagationError, QueueReceipt, SearchCriteria, StoreError,
    UpdatePropagator,
};
use ecm_model::{AuthToken, CaseState, MultipleCase, SingleCase, UpdateDelta, UserProfile};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use ulid::Ulid;

pub const CASE_TYPE: &str = "Leeds";
pub const MULTIPLE_CASE_TYPE: &str = "Leeds_Multiple";
pub const MULTIPLE_REFERENCE: &str = "246000";

pub fn auth() -> AuthToken {
    AuthToken::new("Bearer test-token")
}

/// Case whose platform id is derived from its reference
pub fn case(reference: &str, state: CaseState) -> SingleCase {
    SingleCase::new(format!("id-{reference}"), reference, state)
        .with_parties(format!("Claimant{reference}"), "Acme Ltd")
}

pub fn accepted_case(reference: &str) -> SingleCase {
    case(reference, CaseState::Accepted)
}

pub fn multiple(references: &[&str]) -> MultipleCase {
    MultipleCase::new("multiple-1", MULTIPLE_REFERENCE, MULTIPLE_CASE_TYPE)
        .with_case_ids(references.iter().copied())
}

/// Store seeded with `cases` under the test case type
pub fn seeded_store(cases: impl IntoIterator<Item = SingleCase>) -> Arc<ScriptedStore> {
    let store = InMemoryCaseStore::new();
    for case in cases {
        store.insert_case(CASE_TYPE, case);
    }
    Arc::new(ScriptedStore::new(store))
}

/// In-memory store with switchable failures and call counters
#[derive(Debug, Default)]
pub struct ScriptedStore {
    inner: InMemoryCaseStore,
    fail_retrieval: Mutex<bool>,
    fail_multiple_lookup: Mutex<bool>,
    fail_submit_for: Mutex<HashSet<String>>,
    retrieval_calls: AtomicUsize,
    submit_calls: AtomicUsize,
}

impl ScriptedStore {
    pub fn new(inner: InMemoryCaseStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn inner(&self) -> &InMemoryCaseStore {
        &self.inner
    }

    /// Every case retrieval returns a transport failure
    pub fn fail_retrieval(&self, fail: bool) {
        *self.fail_retrieval.lock() = fail;
    }

    /// Multiple lookups return a transport failure
    pub fn fail_multiple_lookup(&self, fail: bool) {
        *self.fail_multiple_lookup.lock() = fail;
    }

    /// Submissions for this case reference are rejected
    pub fn fail_submit_for(&self, reference: &str) {
        self.fail_submit_for.lock().insert(reference.to_string());
    }

    pub fn retrieval_calls(&self) -> usize {
        self.retrieval_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn case(&self, reference: &str) -> Option<SingleCase> {
        self.inner.case_by_reference(reference)
    }

    fn check_retrieval(&self) -> Result<(), StoreError> {
        self.retrieval_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_retrieval.lock() {
            return Err(StoreError::Transport("search index unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CaseStore for ScriptedStore {
    async fn retrieve_by_ids(
        &self,
        auth: &AuthToken,
        case_type: &str,
        jurisdiction: &str,
        ids: &[String],
    ) -> Result<Vec<SingleCase>, StoreError> {
        self.check_retrieval()?;
        self.inner.retrieve_by_ids(auth, case_type, jurisdiction, ids).await
    }

    async fn retrieve_by_search_index(
        &self,
        auth: &AuthToken,
        case_type: &str,
        criteria: &SearchCriteria,
    ) -> Result<Vec<SingleCase>, StoreError> {
        self.check_retrieval()?;
        self.inner.retrieve_by_search_index(auth, case_type, criteria).await
    }

    async fn retrieve_multiple(
        &self,
        auth: &AuthToken,
        case_type: &str,
        multiple_reference: &str,
    ) -> Result<Option<MultipleCase>, StoreError> {
        if *self.fail_multiple_lookup.lock() {
            return Err(StoreError::Transport("multiple lookup unavailable".to_string()));
        }
        self.inner
            .retrieve_multiple(auth, case_type, multiple_reference)
            .await
    }

    async fn start_event(
        &self,
        auth: &AuthToken,
        case_type: &str,
        jurisdiction: &str,
        case_id: &str,
    ) -> Result<EventToken, StoreError> {
        self.inner.start_event(auth, case_type, jurisdiction, case_id).await
    }

    async fn submit_event(
        &self,
        auth: &AuthToken,
        token: EventToken,
        case_type: &str,
        jurisdiction: &str,
        data: &SingleCase,
        case_id: &str,
    ) -> Result<SingleCase, StoreError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_submit_for.lock().contains(&data.reference) {
            return Err(StoreError::Rejected {
                case_id: case_id.to_string(),
                reason: "case is locked".to_string(),
            });
        }
        self.inner
            .submit_event(auth, token, case_type, jurisdiction, data, case_id)
            .await
    }
}

/// Propagator that records hand-offs instead of delivering them
#[derive(Debug, Default)]
pub struct RecordingPropagator {
    sent: Mutex<Vec<(Vec<String>, UpdateDelta)>>,
    fail: Mutex<Option<PropagationError>>,
}

impl RecordingPropagator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every enqueue returns `error`
    pub fn fail_with(&self, error: PropagationError) {
        *self.fail.lock() = Some(error);
    }

    pub fn sent(&self) -> Vec<(Vec<String>, UpdateDelta)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl UpdatePropagator for RecordingPropagator {
    async fn enqueue(
        &self,
        case_ids: Vec<String>,
        delta: UpdateDelta,
    ) -> Result<QueueReceipt, PropagationError> {
        if let Some(error) = self.fail.lock().clone() {
            return Err(error);
        }
        let receipt = QueueReceipt {
            message_id: Ulid::new(),
            enqueued_at: Utc::now(),
            case_count: case_ids.len(),
        };
        self.sent.lock().push((case_ids, delta));
        Ok(receipt)
    }
}

/// Resolver returning a fixed profile, or failing when built with `failing`
#[derive(Debug)]
pub struct StaticIdentity {
    profile: Option<UserProfile>,
    calls: AtomicUsize,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self {
            profile: Some(UserProfile::new("user-1", "clerk@tribunal.example")),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            profile: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for StaticIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentity {
    async fn resolve(&self, _auth: &AuthToken) -> Result<UserProfile, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.profile
            .clone()
            .ok_or_else(|| IdentityError::Unavailable("idam down".to_string()))
    }
}

/// Engine plus handles on its collaborators
pub struct TestHarness {
    pub engine: BulkEngine,
    pub store: Arc<ScriptedStore>,
    pub propagator: Arc<RecordingPropagator>,
    pub identity: Arc<StaticIdentity>,
}

pub fn setup_engine(store: Arc<ScriptedStore>) -> TestHarness {
    setup_engine_with(store, EngineConfig::new(), StaticIdentity::new())
}

pub fn setup_engine_with(
    store: Arc<ScriptedStore>,
    config: EngineConfig,
    identity: StaticIdentity,
) -> TestHarness {
    let propagator = Arc::new(RecordingPropagator::new());
    let identity = Arc::new(identity);
    let engine = BulkEngine::new(config, store.clone(), propagator.clone(), identity.clone())
        .expect("valid test config");
    TestHarness {
        engine,
        store,
        propagator,
        identity,
    }
}
