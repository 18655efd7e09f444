//! Workflow selectors passed explicitly by callers

use serde::{Deserialize, Serialize};

/// How candidate single cases are fetched from the case store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetrievalStrategy {
    /// Direct lookup by id list
    ByIds,
    /// Search-index query
    BySearchIndex,
}

/// Step of the creation workflow, entered explicitly by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreationStep {
    /// First formation: assign every eligible case to the multiple
    BulkCreation,
    /// Re-derive membership from an already retrieved payload
    UpdateSingles,
    /// As `UpdateSingles`, resolving the acting user first
    UpdateSinglesPq,
}

impl CreationStep {
    /// Whether this step resolves the acting user
    #[inline]
    #[must_use]
    pub fn resolves_identity(&self) -> bool {
        matches!(self, CreationStep::UpdateSinglesPq)
    }
}

/// Reconciliation variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UpdateWorkflow {
    /// Plain reconciliation
    #[default]
    Direct,
    /// Persistent-queue workflow; acting user attached for audit
    PersistentQueue,
}

impl UpdateWorkflow {
    /// Whether the acting user must be resolved
    #[inline]
    #[must_use]
    pub fn resolves_identity(&self) -> bool {
        matches!(self, UpdateWorkflow::PersistentQueue)
    }
}
