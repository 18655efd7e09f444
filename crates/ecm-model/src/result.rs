//! Payloads exchanged between services and returned to callers

use crate::case::SingleCase;
use crate::identity::UserProfile;
use crate::multiple::MembershipRecord;
use serde::{Deserialize, Serialize};

/// Output of a candidate search: eligible cases plus human-readable errors
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CasesPayload {
    /// Eligible cases in store order
    pub cases: Vec<SingleCase>,
    /// One message per excluded case
    pub errors: Vec<String>,
}

impl CasesPayload {
    /// Create new payload
    #[inline]
    #[must_use]
    pub fn new(cases: Vec<SingleCase>, errors: Vec<String>) -> Self {
        Self { cases, errors }
    }

    /// Empty payload
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Whether the pass got past candidate retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PassStatus {
    /// Membership was recomputed
    #[default]
    Completed,
    /// Candidate retrieval failed; membership must not be replaced
    SearchFailed,
}

/// Result handed back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BulkResult {
    /// Recomputed membership collection
    pub membership: Vec<MembershipRecord>,
    /// Human-readable errors, surfaced verbatim by the caller
    pub errors: Vec<String>,
    /// Acting user, for workflows that resolve one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acting_user: Option<UserProfile>,
    /// Pass outcome
    pub status: PassStatus,
}

impl BulkResult {
    /// Create new result
    #[inline]
    #[must_use]
    pub fn new(membership: Vec<MembershipRecord>, errors: Vec<String>) -> Self {
        Self {
            membership,
            errors,
            acting_user: None,
            status: PassStatus::Completed,
        }
    }

    /// Result of a pass whose candidate retrieval failed
    #[inline]
    #[must_use]
    pub fn search_failed(errors: Vec<String>) -> Self {
        Self {
            membership: Vec::new(),
            errors,
            acting_user: None,
            status: PassStatus::SearchFailed,
        }
    }

    /// Callers refuse to finalize the workflow step unless this holds
    #[inline]
    #[must_use]
    pub fn is_finalizable(&self) -> bool {
        self.errors.is_empty() && self.status == PassStatus::Completed
    }
}
