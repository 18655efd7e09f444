//! Bulk creation
//!
//! First-time formation of a multiple and the follow-on "update singles"
//! steps. Each [`CreationStep`] is entered explicitly by the caller.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::identity::IdentityResolver;
use crate::matcher::CaseMatcher;
use crate::pool::MutationPool;
use crate::store::{submit_case_update, CaseStore};
use ecm_model::{
    AuthToken, BulkResult, CasesPayload, CreationStep, MembershipRecord, MultipleCase, SingleCase,
};
use std::sync::Arc;

/// Orchestrates formation of a multiple
#[derive(Clone)]
pub struct BulkCreationService {
    store: Arc<dyn CaseStore>,
    identity: Arc<dyn IdentityResolver>,
    pool: MutationPool,
    default_jurisdiction: String,
}

impl std::fmt::Debug for BulkCreationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkCreationService")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl BulkCreationService {
    /// Create new creation service
    #[must_use]
    pub fn new(
        store: Arc<dyn CaseStore>,
        identity: Arc<dyn IdentityResolver>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            identity,
            pool: MutationPool::new(config.max_concurrent_mutations),
            default_jurisdiction: config.jurisdiction.clone(),
        }
    }

    /// Apply one creation step to `multiple` using an already retrieved payload.
    ///
    /// `payload.errors` are carried into the result unchanged. Per-case
    /// assignment failures are recorded and the batch continues; callers
    /// must not finalize while the result has errors.
    ///
    /// # Errors
    /// - `EngineError::Identity` if `UpdateSinglesPq` cannot resolve the acting user
    pub async fn bulk_creation_logic(
        &self,
        multiple: &mut MultipleCase,
        payload: CasesPayload,
        auth: &AuthToken,
        step: CreationStep,
    ) -> Result<BulkResult, EngineError> {
        tracing::info!(
            multiple = %multiple.reference,
            ?step,
            cases = payload.cases.len(),
            upstream_errors = payload.errors.len(),
            "Running bulk creation step"
        );

        let CasesPayload { cases, mut errors } = payload;

        let acting_user = if step.resolves_identity() {
            Some(self.identity.resolve(auth).await?)
        } else {
            None
        };

        let (membership, to_assign) = match step {
            CreationStep::BulkCreation => {
                let membership = build_membership(multiple, &cases);
                (membership, cases)
            }
            CreationStep::UpdateSingles | CreationStep::UpdateSinglesPq => {
                let mut membership = build_membership(multiple, &cases);
                let mut to_assign = Vec::new();
                for (record, case) in membership.iter_mut().zip(cases) {
                    if case.state.is_pre_acceptance() {
                        record.pending_acceptance = true;
                    } else if case.owner() != Some(multiple.reference.as_str()) {
                        to_assign.push(case);
                    }
                }
                multiple.staged.multiple_reference_v2 = None;
                (membership, to_assign)
            }
        };

        errors.extend(self.assign_all(multiple, to_assign, auth).await);
        multiple.replace_membership(membership.clone());

        tracing::info!(
            multiple = %multiple.reference,
            members = membership.len(),
            errors = errors.len(),
            "Bulk creation step finished"
        );

        let mut result = BulkResult::new(membership, errors);
        result.acting_user = acting_user;
        Ok(result)
    }

    /// Point every case's `multiple_reference` at `multiple`, best effort.
    /// Returns one message per failed case, in candidate order.
    async fn assign_all(
        &self,
        multiple: &MultipleCase,
        cases: Vec<SingleCase>,
        auth: &AuthToken,
    ) -> Vec<String> {
        if cases.is_empty() {
            return Vec::new();
        }

        let store = self.store.as_ref();
        let case_type = multiple.single_case_type();
        let jurisdiction = ecm_model::non_empty(Some(multiple.jurisdiction.as_str()))
            .unwrap_or(&self.default_jurisdiction);
        let multiple_reference = multiple.reference.as_str();

        let (results, stats) = self
            .pool
            .run(cases, |case| {
                let case_type = case_type.as_str();
                async move {
                    let mut data = case;
                    data.multiple_reference = Some(multiple_reference.to_string());
                    submit_case_update(store, auth, case_type, jurisdiction, &data)
                        .await
                        .map(|_| ())
                        .map_err(|e| {
                            let message = format!(
                                "Failed to assign case {} to multiple {}: {}",
                                data.reference, multiple_reference, e
                            );
                            tracing::warn!(reference = %data.reference, "{}", message);
                            message
                        })
                }
            })
            .await;

        tracing::debug!(?stats, "Assignment batch finished");
        results.into_iter().filter_map(Result::err).collect()
    }
}

fn build_membership(multiple: &MultipleCase, cases: &[SingleCase]) -> Vec<MembershipRecord> {
    let existing = multiple.row_ids();
    cases
        .iter()
        .map(|case| CaseMatcher::to_record(case, &existing))
        .collect()
}
