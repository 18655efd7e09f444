//! Bulk search
//!
//! Retrieves the single cases a multiple asks for and classifies them.
//! Nothing here mutates a case.

use crate::config::EngineConfig;
use crate::error::{EngineError, StoreError};
use crate::matcher::CaseMatcher;
use crate::store::{CaseStore, SearchCriteria};
use ecm_model::{AuthToken, CasesPayload, MultipleCase, RetrievalStrategy, SingleCase};
use std::sync::Arc;

/// Candidate retrieval for multiples
#[derive(Clone)]
pub struct BulkSearchService {
    store: Arc<dyn CaseStore>,
    default_jurisdiction: String,
}

impl std::fmt::Debug for BulkSearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkSearchService")
            .field("default_jurisdiction", &self.default_jurisdiction)
            .finish_non_exhaustive()
    }
}

impl BulkSearchService {
    /// Create new search service
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn CaseStore>, config: &EngineConfig) -> Self {
        Self {
            store,
            default_jurisdiction: config.jurisdiction.clone(),
        }
    }

    /// Jurisdiction for store calls on behalf of `multiple`
    #[must_use]
    pub fn jurisdiction_of<'a>(&'a self, multiple: &'a MultipleCase) -> &'a str {
        ecm_model::non_empty(Some(multiple.jurisdiction.as_str())).unwrap_or(&self.default_jurisdiction)
    }

    /// Retrieve and classify the cases in `case_id_collection`.
    ///
    /// Cases failing the state or ownership check are excluded with one
    /// message each; survivors keep store order.
    ///
    /// # Errors
    /// - `EngineError::CaseCreation` if the lookup itself fails
    pub async fn retrieve(
        &self,
        multiple: &MultipleCase,
        auth: &AuthToken,
        strategy: RetrievalStrategy,
    ) -> Result<CasesPayload, EngineError> {
        let candidates = self.candidates(multiple, auth, strategy).await?;
        let classification = CaseMatcher::new(&multiple.reference).classify(candidates);

        tracing::info!(
            multiple = %multiple.reference,
            accepted = classification.accepted.len(),
            excluded = classification.errors.len(),
            "Retrieved candidate cases"
        );

        Ok(CasesPayload::new(classification.accepted, classification.errors))
    }

    /// Retrieve requested cases ahead of acceptance.
    ///
    /// Cases still awaiting acceptance are kept; rejected or closed cases
    /// and cases owned by another multiple are excluded with one message
    /// each.
    ///
    /// # Errors
    /// - `EngineError::CaseCreation` if the lookup fails
    pub async fn retrieve_for_pre_accept(
        &self,
        multiple: &MultipleCase,
        auth: &AuthToken,
    ) -> Result<CasesPayload, EngineError> {
        let candidates = self.candidates(multiple, auth, RetrievalStrategy::ByIds).await?;
        let classification = CaseMatcher::new(&multiple.reference).classify_pre_accept(candidates);
        Ok(CasesPayload::new(classification.accepted, classification.errors))
    }

    /// Raw candidates for `case_id_collection`, one round trip, never retried
    ///
    /// # Errors
    /// - `EngineError::CaseCreation` if the lookup fails
    pub async fn candidates(
        &self,
        multiple: &MultipleCase,
        auth: &AuthToken,
        strategy: RetrievalStrategy,
    ) -> Result<Vec<SingleCase>, EngineError> {
        if multiple.case_id_collection.is_empty() {
            tracing::debug!(multiple = %multiple.reference, "No case ids requested");
            return Ok(Vec::new());
        }

        let case_type = multiple.single_case_type();
        let ids = &multiple.case_id_collection;

        let result = match strategy {
            RetrievalStrategy::ByIds => {
                self.store
                    .retrieve_by_ids(auth, &case_type, self.jurisdiction_of(multiple), ids)
                    .await
            }
            RetrievalStrategy::BySearchIndex => {
                self.store
                    .retrieve_by_search_index(
                        auth,
                        &case_type,
                        &SearchCriteria::References(ids.clone()),
                    )
                    .await
            }
        };

        result.map_err(|e| {
            tracing::error!(multiple = %multiple.reference, ?strategy, "Candidate retrieval failed: {}", e);
            EngineError::CaseCreation(e)
        })
    }

    /// Reconciliation candidates: the requested cases followed by any other
    /// case that currently names `multiple` as its owner.
    ///
    /// Cases moved in from another multiple are only reachable through the
    /// ownership query, since they never appear in this multiple's
    /// `case_id_collection`.
    ///
    /// # Errors
    /// - `EngineError::CaseCreation` if either lookup fails
    pub async fn reconciliation_candidates(
        &self,
        multiple: &MultipleCase,
        auth: &AuthToken,
    ) -> Result<Vec<SingleCase>, EngineError> {
        let mut candidates = self
            .candidates(multiple, auth, RetrievalStrategy::BySearchIndex)
            .await?;

        let owned = self
            .store
            .retrieve_by_search_index(
                auth,
                &multiple.single_case_type(),
                &SearchCriteria::OwnedBy(multiple.reference.clone()),
            )
            .await
            .map_err(|e| {
                tracing::error!(multiple = %multiple.reference, "Ownership lookup failed: {}", e);
                EngineError::CaseCreation(e)
            })?;

        for case in owned {
            if !candidates.iter().any(|c| c.reference == case.reference) {
                tracing::debug!(multiple = %multiple.reference, reference = %case.reference, "Found case by ownership");
                candidates.push(case);
            }
        }
        Ok(candidates)
    }

    /// Cases selected for a bulk edit: current members, narrowed by
    /// `search_collection` when one is set
    ///
    /// # Errors
    /// - `EngineError::BulkRetrieval` if the lookup fails
    pub async fn retrieve_bulk_targets(
        &self,
        multiple: &MultipleCase,
        auth: &AuthToken,
    ) -> Result<Vec<SingleCase>, EngineError> {
        let members = multiple.member_references();
        if members.is_empty() {
            return Ok(Vec::new());
        }

        let criteria = match ecm_model::non_empty(multiple.search_collection.as_deref()) {
            Some(text) => SearchCriteria::FreeText(text.to_string()),
            None => SearchCriteria::References(members.clone()),
        };

        let found = self
            .store
            .retrieve_by_search_index(auth, &multiple.single_case_type(), &criteria)
            .await
            .map_err(EngineError::BulkRetrieval)?;

        Ok(found
            .into_iter()
            .filter(|c| members.contains(&c.reference))
            .collect())
    }

    /// Direct lookup of arbitrary references under `multiple`'s case type
    pub(crate) async fn retrieve_references(
        &self,
        multiple: &MultipleCase,
        auth: &AuthToken,
        references: &[String],
    ) -> Result<Vec<SingleCase>, StoreError> {
        if references.is_empty() {
            return Ok(Vec::new());
        }
        self.store
            .retrieve_by_ids(
                auth,
                &multiple.single_case_type(),
                self.jurisdiction_of(multiple),
                references,
            )
            .await
    }
}
