//! ECM Model - case records for bulk synchronization
//!
//! Strongly-typed views of the records the engine reconciles:
//! - [`SingleCase`]: one tribunal claim and its lifecycle state
//! - [`MultipleCase`]: the bulk container and its membership collection
//! - [`MembershipRecord`]: one row linking a single case to a multiple
//! - [`StagedUpdate`] / [`UpdateDelta`]: staged bulk edits and their fan-out payload
//! - [`CasesPayload`] / [`BulkResult`]: what flows between the services and back to the caller

#![warn(unreachable_pub)]

pub mod case;
pub mod identity;
pub mod multiple;
pub mod result;
pub mod update;
pub mod workflow;

pub use case::{CaseState, SingleCase};
pub use identity::{AuthToken, UserProfile};
pub use multiple::{MembershipRecord, MultipleCase, RowId};
pub use result::{BulkResult, CasesPayload, PassStatus};
pub use update::{FieldChanges, StagedUpdate, UpdateDelta};
pub use workflow::{CreationStep, RetrievalStrategy, UpdateWorkflow};

/// Jurisdiction every employment case lives under unless configured otherwise
pub const DEFAULT_JURISDICTION: &str = "EMPLOYMENT";

/// Suffix distinguishing a multiples case type from its singles case type
pub const MULTIPLE_CASE_TYPE_SUFFIX: &str = "_Multiple";

/// `multiple_reference` value left on a single case once no multiple holds it
pub const DETACHED_MARKER: &str = "0";

/// Treat blank strings the way the case platform does: as unset
#[inline]
#[must_use]
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
