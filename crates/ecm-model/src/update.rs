//! Staged bulk edits and the payload fanned out to single cases

use crate::case::SingleCase;
use crate::multiple::MembershipRecord;
use crate::non_empty;
use serde::{Deserialize, Serialize};

/// Bulk edit staged on a multiple before fan-out (the "V2" fields)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StagedUpdate {
    /// Move the selected cases to this multiple
    pub multiple_reference_v2: Option<String>,
    /// New sub-multiple
    pub sub_multiple_v2: Option<String>,
    /// New clerk
    pub clerk_v2: Option<String>,
    /// New position type
    pub position_type_v2: Option<String>,
    /// New file location
    pub file_location_v2: Option<String>,
}

impl StagedUpdate {
    /// Whether nothing is staged
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_changes().is_empty()
    }

    /// Requested move target, if any
    #[inline]
    #[must_use]
    pub fn move_target(&self) -> Option<&str> {
        non_empty(self.multiple_reference_v2.as_deref())
    }

    /// Field changes described by the staged values
    #[must_use]
    pub fn to_changes(&self) -> FieldChanges {
        let owned = |v: &Option<String>| non_empty(v.as_deref()).map(str::to_string);
        FieldChanges {
            multiple_reference: owned(&self.multiple_reference_v2),
            sub_multiple: owned(&self.sub_multiple_v2),
            clerk: owned(&self.clerk_v2),
            position_type: owned(&self.position_type_v2),
            file_location: owned(&self.file_location_v2),
        }
    }

    /// Reset every staged field. Idempotent.
    #[inline]
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Field-level changes applied to each target single case
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldChanges {
    pub multiple_reference: Option<String>,
    pub sub_multiple: Option<String>,
    pub clerk: Option<String>,
    pub position_type: Option<String>,
    pub file_location: Option<String>,
}

impl FieldChanges {
    /// Whether no field changes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.multiple_reference.is_none()
            && self.sub_multiple.is_none()
            && self.clerk.is_none()
            && self.position_type.is_none()
            && self.file_location.is_none()
    }

    /// Apply to a single case
    pub fn apply_to(&self, case: &mut SingleCase) {
        if let Some(v) = &self.multiple_reference {
            case.multiple_reference = Some(v.clone());
        }
        if let Some(v) = &self.sub_multiple {
            case.sub_multiple = Some(v.clone());
        }
        if let Some(v) = &self.clerk {
            case.clerk = Some(v.clone());
        }
        if let Some(v) = &self.position_type {
            case.position_type = Some(v.clone());
        }
        if let Some(v) = &self.file_location {
            case.file_location = Some(v.clone());
        }
    }

    /// Refresh the denormalized copies held on a membership row
    pub fn apply_to_record(&self, record: &mut MembershipRecord) {
        if let Some(v) = &self.sub_multiple {
            record.sub_multiple = Some(v.clone());
        }
        if let Some(v) = &self.clerk {
            record.clerk = Some(v.clone());
        }
    }
}

/// Payload handed to the propagator: where the cases live and what changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDelta {
    /// Singles case type
    pub case_type_id: String,
    /// Jurisdiction
    pub jurisdiction: String,
    /// Changes to apply
    pub changes: FieldChanges,
}

impl UpdateDelta {
    /// Create new delta
    #[inline]
    #[must_use]
    pub fn new(
        case_type_id: impl Into<String>,
        jurisdiction: impl Into<String>,
        changes: FieldChanges,
    ) -> Self {
        Self {
            case_type_id: case_type_id.into(),
            jurisdiction: jurisdiction.into(),
            changes,
        }
    }
}
