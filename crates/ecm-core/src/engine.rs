//! Bulk Engine
//!
//! Wires the search, creation and update services over one set of
//! collaborators and exposes the workflows callers run:
//! - Creating a multiple from its requested case ids
//! - Pre-acceptance update of singles
//! - Steady-state reconciliation (replace-on-success)
//! - Staged bulk edits

use crate::config::EngineConfig;
use crate::creation::BulkCreationService;
use crate::error::EngineError;
use crate::identity::{CachedIdentityResolver, IdentityResolver};
use crate::propagator::UpdatePropagator;
use crate::search::BulkSearchService;
use crate::store::CaseStore;
use crate::update::BulkUpdateService;
use ecm_model::{
    AuthToken, BulkResult, CreationStep, MultipleCase, PassStatus,
    RetrievalStrategy, UpdateWorkflow,
};
use std::sync::Arc;

/// The bulk synchronization engine
#[derive(Debug, Clone)]
pub struct BulkEngine {
    /// Configuration
    config: EngineConfig,
    /// Candidate retrieval
    search: BulkSearchService,
    /// Formation workflow
    creation: BulkCreationService,
    /// Reconciliation and bulk edits
    update: BulkUpdateService,
}

impl BulkEngine {
    /// Create engine; identity lookups are cached per `config`
    ///
    /// # Errors
    /// - `EngineError::Config` if `config` fails validation
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn CaseStore>,
        propagator: Arc<dyn UpdatePropagator>,
        identity: Arc<dyn IdentityResolver>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let identity: Arc<dyn IdentityResolver> =
            Arc::new(CachedIdentityResolver::new(identity, &config));
        let search = BulkSearchService::new(store.clone(), &config);
        let creation = BulkCreationService::new(store.clone(), identity.clone(), &config);
        let update = BulkUpdateService::new(search.clone(), store, propagator, identity);

        Ok(Self {
            config,
            search,
            creation,
            update,
        })
    }

    /// Form `multiple` from its requested case ids.
    ///
    /// # Errors
    /// - `EngineError::CaseCreation` if candidate retrieval fails
    pub async fn create_multiple(
        &self,
        multiple: &mut MultipleCase,
        auth: &AuthToken,
        strategy: RetrievalStrategy,
    ) -> Result<BulkResult, EngineError> {
        let payload = self.search.retrieve(multiple, auth, strategy).await?;
        self.creation
            .bulk_creation_logic(multiple, payload, auth, CreationStep::BulkCreation)
            .await
    }

    /// Update singles ahead of acceptance.
    ///
    /// Cases owned by another multiple, and rejected or closed cases, are
    /// reported and left untouched.
    ///
    /// # Errors
    /// - `EngineError::CaseCreation` if candidate retrieval fails
    /// - `EngineError::Identity` if the PQ workflow cannot resolve the user
    pub async fn pre_accept(
        &self,
        multiple: &mut MultipleCase,
        auth: &AuthToken,
        workflow: UpdateWorkflow,
    ) -> Result<BulkResult, EngineError> {
        let payload = self.search.retrieve_for_pre_accept(multiple, auth).await?;
        let step = if workflow.resolves_identity() {
            CreationStep::UpdateSinglesPq
        } else {
            CreationStep::UpdateSingles
        };
        self.creation
            .bulk_creation_logic(multiple, payload, auth, step)
            .await
    }

    /// Reconcile `multiple` and replace its membership if the pass completed.
    pub async fn reconcile(
        &self,
        multiple: &mut MultipleCase,
        auth: &AuthToken,
        workflow: UpdateWorkflow,
    ) -> BulkResult {
        let result = self.update.update_bulk_request(multiple, auth, workflow).await;
        if result.status == PassStatus::Completed {
            multiple.replace_membership(result.membership.clone());
        } else {
            tracing::warn!(multiple = %multiple.reference, "Keeping previous membership after failed search");
        }
        result
    }

    /// Fan out the staged bulk edit on `multiple`.
    ///
    /// # Errors
    /// - `EngineError::BulkRetrieval` if target selection fails
    pub async fn bulk_update(
        &self,
        multiple: &mut MultipleCase,
        auth: &AuthToken,
    ) -> Result<BulkResult, EngineError> {
        self.update.bulk_update_logic(multiple, auth).await
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get search service
    #[inline]
    #[must_use]
    pub fn search(&self) -> &BulkSearchService {
        &self.search
    }

    /// Get creation service
    #[inline]
    #[must_use]
    pub fn creation(&self) -> &BulkCreationService {
        &self.creation
    }

    /// Get update service
    #[inline]
    #[must_use]
    pub fn update(&self) -> &BulkUpdateService {
        &self.update
    }
}
