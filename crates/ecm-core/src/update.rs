//! Bulk update
//!
//! Steady-state reconciliation of an existing multiple against live case
//! state, and fan-out of staged bulk edits.
//!
//! Reconciliation recomputes the whole target membership and replaces the
//! previous collection; the previous collection is consulted only so row
//! ids stay stable for references present in both. Two concurrent passes
//! over the same multiple are not coordinated: last writer wins.

use crate::error::EngineError;
use crate::identity::IdentityResolver;
use crate::matcher::CaseMatcher;
use crate::propagator::UpdatePropagator;
use crate::search::BulkSearchService;
use crate::store::CaseStore;
use ecm_model::{
    AuthToken, BulkResult, MultipleCase, SingleCase, UpdateDelta, UpdateWorkflow,
};
use std::sync::Arc;

/// Reported when a move target is missing or is the multiple itself
pub const INVALID_MOVE_TARGET: &str =
    "Multiple reference does not exist or it is the same as the current multiple case";

/// Reconciles existing multiples
#[derive(Clone)]
pub struct BulkUpdateService {
    search: BulkSearchService,
    store: Arc<dyn CaseStore>,
    propagator: Arc<dyn UpdatePropagator>,
    identity: Arc<dyn IdentityResolver>,
}

impl std::fmt::Debug for BulkUpdateService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkUpdateService")
            .field("search", &self.search)
            .finish_non_exhaustive()
    }
}

impl BulkUpdateService {
    /// Create new update service
    #[must_use]
    pub fn new(
        search: BulkSearchService,
        store: Arc<dyn CaseStore>,
        propagator: Arc<dyn UpdatePropagator>,
        identity: Arc<dyn IdentityResolver>,
    ) -> Self {
        Self {
            search,
            store,
            propagator,
            identity,
        }
    }

    /// Recompute the membership of `multiple` from the search index.
    ///
    /// Never fails: a failed candidate search yields an empty membership,
    /// `PassStatus::SearchFailed` and the error text, and the caller must
    /// keep the previous collection and retry later.
    pub async fn update_bulk_request(
        &self,
        multiple: &MultipleCase,
        auth: &AuthToken,
        workflow: UpdateWorkflow,
    ) -> BulkResult {
        tracing::info!(multiple = %multiple.reference, ?workflow, "Reconciling multiple");

        let candidates = match self.search.reconciliation_candidates(multiple, auth).await {
            Ok(candidates) => candidates,
            Err(e) => return BulkResult::search_failed(vec![e.to_string()]),
        };

        let (membership, mut errors) = reconcile(multiple, candidates);

        let acting_user = if workflow.resolves_identity() {
            match self.identity.resolve(auth).await {
                Ok(profile) => Some(profile),
                Err(e) => {
                    errors.push(format!("Unable to resolve acting user: {e}"));
                    None
                }
            }
        } else {
            None
        };

        tracing::info!(
            multiple = %multiple.reference,
            members = membership.len(),
            errors = errors.len(),
            "Reconciliation finished"
        );

        let mut result = BulkResult::new(membership, errors);
        result.acting_user = acting_user;
        result
    }

    /// Fan the staged bulk edit on `multiple` out to its selected cases.
    ///
    /// An invalid move target is reported as a standalone error and nothing
    /// changes. A propagation failure is reported and the staged fields are
    /// kept so the edit can be retried; on success they are cleared.
    ///
    /// # Errors
    /// - `EngineError::BulkRetrieval` if selecting the target cases fails
    pub async fn bulk_update_logic(
        &self,
        multiple: &mut MultipleCase,
        auth: &AuthToken,
    ) -> Result<BulkResult, EngineError> {
        let changes = multiple.staged.to_changes();
        if changes.is_empty() {
            tracing::debug!(multiple = %multiple.reference, "No staged update");
            return Ok(BulkResult::new(multiple.membership.clone(), Vec::new()));
        }

        let move_target = multiple.staged.move_target().map(str::to_string);
        if let Some(target) = &move_target {
            if !self.move_target_exists(multiple, auth, target).await? {
                tracing::warn!(multiple = %multiple.reference, target = %target, "{}", INVALID_MOVE_TARGET);
                return Ok(BulkResult::new(
                    multiple.membership.clone(),
                    vec![INVALID_MOVE_TARGET.to_string()],
                ));
            }
        }

        let targets = self.search.retrieve_bulk_targets(multiple, auth).await?;
        let targets = self.with_ecc_links(multiple, auth, targets).await?;
        if targets.is_empty() {
            tracing::info!(multiple = %multiple.reference, "Bulk update selected no cases");
            return Ok(BulkResult::new(multiple.membership.clone(), Vec::new()));
        }

        let references: Vec<String> = targets.iter().map(|c| c.reference.clone()).collect();
        let delta = UpdateDelta::new(
            multiple.single_case_type(),
            self.search.jurisdiction_of(multiple),
            changes.clone(),
        );

        match self.propagator.enqueue(references.clone(), delta).await {
            Ok(receipt) => {
                tracing::info!(
                    multiple = %multiple.reference,
                    message_id = %receipt.message_id,
                    cases = receipt.case_count,
                    "Bulk update handed off"
                );
                if move_target.is_some() {
                    multiple.detach(&references);
                } else {
                    for record in multiple
                        .membership
                        .iter_mut()
                        .filter(|r| references.contains(&r.reference))
                    {
                        changes.apply_to_record(record);
                    }
                }
                Self::clear_up_fields(multiple);
                Ok(BulkResult::new(multiple.membership.clone(), Vec::new()))
            }
            Err(e) => {
                let message = format!(
                    "Unable to queue bulk update for {} cases: {}",
                    references.len(),
                    e
                );
                tracing::error!(multiple = %multiple.reference, "{}", message);
                Ok(BulkResult::new(multiple.membership.clone(), vec![message]))
            }
        }
    }

    /// Reset the staged bulk-edit fields. Idempotent.
    #[inline]
    pub fn clear_up_fields(multiple: &mut MultipleCase) {
        multiple.staged.clear();
    }

    async fn move_target_exists(
        &self,
        multiple: &MultipleCase,
        auth: &AuthToken,
        target: &str,
    ) -> Result<bool, EngineError> {
        if target == multiple.reference {
            return Ok(false);
        }
        let found = self
            .store
            .retrieve_multiple(auth, &multiple.case_type_id, target)
            .await
            .map_err(EngineError::BulkRetrieval)?;
        Ok(found.is_some())
    }

    /// Append the ECC cases linked from `targets`, skipping ones already present
    async fn with_ecc_links(
        &self,
        multiple: &MultipleCase,
        auth: &AuthToken,
        mut targets: Vec<SingleCase>,
    ) -> Result<Vec<SingleCase>, EngineError> {
        let mut linked: Vec<String> = Vec::new();
        for reference in targets.iter().flat_map(|c| c.ecc_cases.iter()) {
            let known = targets.iter().any(|c| &c.reference == reference);
            if !known && !linked.contains(reference) {
                linked.push(reference.clone());
            }
        }
        if linked.is_empty() {
            return Ok(targets);
        }

        tracing::debug!(multiple = %multiple.reference, linked = linked.len(), "Resolving ECC links");
        let ecc = self
            .search
            .retrieve_references(multiple, auth, &linked)
            .await
            .map_err(EngineError::BulkRetrieval)?;
        targets.extend(ecc);
        Ok(targets)
    }
}

/// Recompute membership from candidates, preserving row ids by reference
fn reconcile(
    multiple: &MultipleCase,
    candidates: Vec<SingleCase>,
) -> (Vec<ecm_model::MembershipRecord>, Vec<String>) {
    let matcher = CaseMatcher::new(&multiple.reference);
    let existing = multiple.row_ids();
    let mut membership = Vec::with_capacity(candidates.len());
    let mut errors = Vec::new();

    for case in candidates {
        let verdict = matcher.eligibility(&case);
        if let Some(message) = verdict.error_for(&case.reference) {
            tracing::warn!(reference = %case.reference, "{}", message);
            errors.push(message);
            continue;
        }
        if case.is_detached() {
            tracing::debug!(reference = %case.reference, "Skipping detached case");
            continue;
        }
        membership.push(CaseMatcher::to_record(&case, &existing));
    }

    (membership, errors)
}
