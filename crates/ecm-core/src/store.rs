//! Case store seam
//!
//! The case platform is consumed through [`CaseStore`]. Calls are never
//! retried here; retry is the adapter's concern.

use crate::error::StoreError;
use async_trait::async_trait;
use ecm_model::{AuthToken, MultipleCase, SingleCase};
use serde::{Deserialize, Serialize};

/// Search-index query criteria
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchCriteria {
    /// Cases whose reference is in the list
    References(Vec<String>),
    /// Free-text match over reference and display fields
    FreeText(String),
    /// Cases whose `multiple_reference` names this multiple
    OwnedBy(String),
}

/// Token returned by `start_event`, consumed by `submit_event`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventToken(pub String);

/// Remote case repository
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Direct lookup of single cases by reference, one round trip
    async fn retrieve_by_ids(
        &self,
        auth: &AuthToken,
        case_type: &str,
        jurisdiction: &str,
        ids: &[String],
    ) -> Result<Vec<SingleCase>, StoreError>;

    /// Search-index lookup of single cases
    async fn retrieve_by_search_index(
        &self,
        auth: &AuthToken,
        case_type: &str,
        criteria: &SearchCriteria,
    ) -> Result<Vec<SingleCase>, StoreError>;

    /// Look up a multiple by its reference
    async fn retrieve_multiple(
        &self,
        auth: &AuthToken,
        case_type: &str,
        multiple_reference: &str,
    ) -> Result<Option<MultipleCase>, StoreError>;

    /// Open an update event against a single case
    async fn start_event(
        &self,
        auth: &AuthToken,
        case_type: &str,
        jurisdiction: &str,
        case_id: &str,
    ) -> Result<EventToken, StoreError>;

    /// Submit new case data under a previously started event
    async fn submit_event(
        &self,
        auth: &AuthToken,
        token: EventToken,
        case_type: &str,
        jurisdiction: &str,
        data: &SingleCase,
        case_id: &str,
    ) -> Result<SingleCase, StoreError>;
}

/// Start and submit one event carrying `data`
pub(crate) async fn submit_case_update(
    store: &dyn CaseStore,
    auth: &AuthToken,
    case_type: &str,
    jurisdiction: &str,
    data: &SingleCase,
) -> Result<SingleCase, StoreError> {
    let token = store
        .start_event(auth, case_type, jurisdiction, &data.case_id)
        .await?;
    store
        .submit_event(auth, token, case_type, jurisdiction, data, &data.case_id)
        .await
}
