//! Multiple (bulk) cases and their membership collection

use crate::case::{CaseState, SingleCase};
use crate::update::StagedUpdate;
use crate::{DEFAULT_JURISDICTION, MULTIPLE_CASE_TYPE_SUFFIX};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Collection row identifier, assigned by the platform when the row is persisted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub String);

impl RowId {
    /// Wrap an existing row id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of a multiple's membership collection.
///
/// Display fields are copies taken at the last reconciliation pass and may
/// go stale until the next one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MembershipRecord {
    /// Row id; `None` until the platform persists the row
    pub id: Option<RowId>,
    /// Single case reference
    pub reference: String,
    /// Lead claimant flag
    pub lead_claimant: bool,
    /// Claimant surname
    pub claimant_surname: Option<String>,
    /// Respondent surname
    pub respondent_surname: Option<String>,
    /// Fee group reference
    pub fee_group_reference: Option<String>,
    /// Single case state at last sync
    pub state: CaseState,
    /// Sub-multiple
    pub sub_multiple: Option<String>,
    /// Clerk
    pub clerk: Option<String>,
    /// Set when the single case is still awaiting acceptance
    pub pending_acceptance: bool,
}

impl MembershipRecord {
    /// Build a fresh (unsaved) row from a single case
    #[must_use]
    pub fn from_case(case: &SingleCase) -> Self {
        Self {
            id: None,
            reference: case.reference.clone(),
            lead_claimant: case.lead_claimant,
            claimant_surname: case.claimant_surname.clone(),
            respondent_surname: case.respondent_surname.clone(),
            fee_group_reference: case.fee_group_reference.clone(),
            state: case.state,
            sub_multiple: case.sub_multiple.clone(),
            clerk: case.clerk.clone(),
            pending_acceptance: false,
        }
    }

    /// With row id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: Option<RowId>) -> Self {
        self.id = id;
        self
    }
}

/// The bulk container
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MultipleCase {
    /// Platform identifier
    pub case_id: String,
    /// Multiple reference; what owned single cases carry in `multiple_reference`
    pub reference: String,
    /// Display name
    pub name: Option<String>,
    /// Multiples case type, e.g. `Manchester_Multiple`
    pub case_type_id: String,
    /// Jurisdiction
    pub jurisdiction: String,
    /// Case references requested for membership, in request order
    pub case_id_collection: Vec<String>,
    /// Free-text criteria selecting members for a bulk edit
    pub search_collection: Option<String>,
    /// Membership collection in retrieval order
    pub membership: Vec<MembershipRecord>,
    /// Staged bulk edit awaiting fan-out
    pub staged: StagedUpdate,
}

impl MultipleCase {
    /// Create new multiple
    #[inline]
    #[must_use]
    pub fn new(
        case_id: impl Into<String>,
        reference: impl Into<String>,
        case_type_id: impl Into<String>,
    ) -> Self {
        Self {
            case_id: case_id.into(),
            reference: reference.into(),
            case_type_id: case_type_id.into(),
            jurisdiction: DEFAULT_JURISDICTION.to_string(),
            ..Self::default()
        }
    }

    /// With requested case references
    #[inline]
    #[must_use]
    pub fn with_case_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.case_id_collection = ids.into_iter().map(Into::into).collect();
        self
    }

    /// With membership collection
    #[inline]
    #[must_use]
    pub fn with_membership(mut self, membership: Vec<MembershipRecord>) -> Self {
        self.membership = membership;
        self
    }

    /// Case type of the single cases this multiple groups
    #[must_use]
    pub fn single_case_type(&self) -> String {
        self.case_type_id
            .strip_suffix(MULTIPLE_CASE_TYPE_SUFFIX)
            .unwrap_or(&self.case_type_id)
            .to_string()
    }

    /// Existing row ids keyed by case reference
    #[must_use]
    pub fn row_ids(&self) -> HashMap<&str, &RowId> {
        self.membership
            .iter()
            .filter_map(|r| r.id.as_ref().map(|id| (r.reference.as_str(), id)))
            .collect()
    }

    /// References currently in the membership collection
    #[must_use]
    pub fn member_references(&self) -> Vec<String> {
        self.membership.iter().map(|r| r.reference.clone()).collect()
    }

    /// Replace the membership collection wholesale
    #[inline]
    pub fn replace_membership(&mut self, membership: Vec<MembershipRecord>) {
        self.membership = membership;
    }

    /// Drop the given references from membership and the requested id list
    pub fn detach(&mut self, references: &[String]) {
        self.membership.retain(|r| !references.contains(&r.reference));
        self.case_id_collection.retain(|r| !references.contains(r));
    }
}
