//! Single tribunal cases
//!
//! Only the attributes the bulk engine reads or writes are modelled here;
//! the case platform carries many more.

use crate::{non_empty, DETACHED_MARKER};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a single case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CaseState {
    /// Received, not yet vetted
    #[default]
    Submitted,
    /// Vetted, awaiting acceptance
    Vetted,
    /// Accepted by the tribunal
    Accepted,
    /// Rejected at acceptance
    Rejected,
    /// Proceedings closed
    Closed,
}

impl CaseState {
    /// Whether the case is still waiting to be accepted
    #[inline]
    #[must_use]
    pub fn is_pre_acceptance(&self) -> bool {
        matches!(self, CaseState::Submitted | CaseState::Vetted)
    }

    /// Platform name of the state
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseState::Submitted => "Submitted",
            CaseState::Vetted => "Vetted",
            CaseState::Accepted => "Accepted",
            CaseState::Rejected => "Rejected",
            CaseState::Closed => "Closed",
        }
    }
}

impl std::fmt::Display for CaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One individual tribunal case
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleCase {
    /// Platform identifier used for events
    pub case_id: String,
    /// Tribunal case reference (what membership lists hold)
    pub reference: String,
    /// Lifecycle state
    pub state: CaseState,
    /// Reference of the multiple currently owning this case
    pub multiple_reference: Option<String>,
    /// Designated lead case of its multiple
    pub lead_claimant: bool,
    /// Claimant surname (display)
    pub claimant_surname: Option<String>,
    /// First respondent surname (display)
    pub respondent_surname: Option<String>,
    /// Fee group reference (display)
    pub fee_group_reference: Option<String>,
    /// Sub-multiple the case is filed under
    pub sub_multiple: Option<String>,
    /// Clerk responsible
    pub clerk: Option<String>,
    /// Position type
    pub position_type: Option<String>,
    /// Physical file location
    pub file_location: Option<String>,
    /// References of linked Employment Contract Claim cases
    pub ecc_cases: Vec<String>,
}

impl SingleCase {
    /// Create new case
    #[inline]
    #[must_use]
    pub fn new(case_id: impl Into<String>, reference: impl Into<String>, state: CaseState) -> Self {
        Self {
            case_id: case_id.into(),
            reference: reference.into(),
            state,
            ..Self::default()
        }
    }

    /// With owning multiple
    #[inline]
    #[must_use]
    pub fn with_multiple_reference(mut self, reference: impl Into<String>) -> Self {
        self.multiple_reference = Some(reference.into());
        self
    }

    /// Mark as lead claimant
    #[inline]
    #[must_use]
    pub fn as_lead(mut self) -> Self {
        self.lead_claimant = true;
        self
    }

    /// With claimant and respondent surnames
    #[inline]
    #[must_use]
    pub fn with_parties(mut self, claimant: impl Into<String>, respondent: impl Into<String>) -> Self {
        self.claimant_surname = Some(claimant.into());
        self.respondent_surname = Some(respondent.into());
        self
    }

    /// With fee group reference
    #[inline]
    #[must_use]
    pub fn with_fee_group(mut self, fee_group: impl Into<String>) -> Self {
        self.fee_group_reference = Some(fee_group.into());
        self
    }

    /// With sub-multiple
    #[inline]
    #[must_use]
    pub fn with_sub_multiple(mut self, sub_multiple: impl Into<String>) -> Self {
        self.sub_multiple = Some(sub_multiple.into());
        self
    }

    /// With clerk
    #[inline]
    #[must_use]
    pub fn with_clerk(mut self, clerk: impl Into<String>) -> Self {
        self.clerk = Some(clerk.into());
        self
    }

    /// With linked ECC case
    #[inline]
    #[must_use]
    pub fn with_ecc_case(mut self, reference: impl Into<String>) -> Self {
        self.ecc_cases.push(reference.into());
        self
    }

    /// Owning multiple; blank and the detached marker count as unset
    #[inline]
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        non_empty(self.multiple_reference.as_deref()).filter(|r| *r != DETACHED_MARKER)
    }

    /// Whether the case carries the detached marker
    #[inline]
    #[must_use]
    pub fn is_detached(&self) -> bool {
        non_empty(self.multiple_reference.as_deref()) == Some(DETACHED_MARKER)
    }

    /// Whether the case has been accepted
    #[inline]
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.state == CaseState::Accepted
    }

    /// Whether the case is already claimed by a multiple other than `multiple_reference`
    #[inline]
    #[must_use]
    pub fn is_owned_by_other(&self, multiple_reference: &str) -> bool {
        self.owner().is_some_and(|owner| owner != multiple_reference)
    }
}
