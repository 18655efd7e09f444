//! In-memory case store backed by a JSON snapshot
//!
//! Emulates the case platform closely enough to dry-run reconciliation:
//! event tokens are single-use, and saving a multiple assigns row ids to
//! unsaved membership rows the way platform persistence does.

use crate::error::{SnapshotError, StoreError};
use crate::store::{CaseStore, EventToken, SearchCriteria};
use async_trait::async_trait;
use dashmap::DashMap;
use ecm_model::{AuthToken, MultipleCase, RowId, SingleCase};
use serde::{Deserialize, Serialize};
use std::path::Path;
use ulid::Ulid;
use uuid::Uuid;

/// A single case together with the case type it is filed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCase {
    pub case_type: String,
    pub case: SingleCase,
}

/// Serializable store contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    pub singles: Vec<StoredCase>,
    pub multiples: Vec<MultipleCase>,
}

/// Snapshot-backed case store
#[derive(Debug, Default)]
pub struct InMemoryCaseStore {
    /// Single cases keyed by case id
    singles: DashMap<String, StoredCase>,
    /// Multiples keyed by reference
    multiples: DashMap<String, MultipleCase>,
    /// Open event tokens -> case id
    events: DashMap<String, String>,
}

impl InMemoryCaseStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a snapshot
    #[must_use]
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        for stored in snapshot.singles {
            store.insert_case(stored.case_type, stored.case);
        }
        for multiple in snapshot.multiples {
            store.save_multiple(multiple);
        }
        store
    }

    /// Load a JSON snapshot file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| SnapshotError::io_error(path, e))?;
        let snapshot: StoreSnapshot =
            serde_json::from_str(&content).map_err(|e| SnapshotError::json_error(path, e))?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write the current contents as a JSON snapshot file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| SnapshotError::json_error(path, e))?;
        std::fs::write(path, json).map_err(|e| SnapshotError::io_error(path, e))
    }

    /// Current contents, ordered by reference for stable output
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        let mut singles: Vec<StoredCase> = self.singles.iter().map(|e| e.value().clone()).collect();
        singles.sort_by(|a, b| a.case.reference.cmp(&b.case.reference));
        let mut multiples: Vec<MultipleCase> =
            self.multiples.iter().map(|e| e.value().clone()).collect();
        multiples.sort_by(|a, b| a.reference.cmp(&b.reference));
        StoreSnapshot { singles, multiples }
    }

    /// Insert or replace a single case
    pub fn insert_case(&self, case_type: impl Into<String>, case: SingleCase) {
        self.singles.insert(
            case.case_id.clone(),
            StoredCase {
                case_type: case_type.into(),
                case,
            },
        );
    }

    /// Single case by platform id
    #[must_use]
    pub fn case(&self, case_id: &str) -> Option<SingleCase> {
        self.singles.get(case_id).map(|e| e.case.clone())
    }

    /// Single case by reference
    #[must_use]
    pub fn case_by_reference(&self, reference: &str) -> Option<SingleCase> {
        self.singles
            .iter()
            .find(|e| e.case.reference == reference)
            .map(|e| e.case.clone())
    }

    /// Multiple by reference
    #[must_use]
    pub fn multiple(&self, reference: &str) -> Option<MultipleCase> {
        self.multiples.get(reference).map(|e| e.value().clone())
    }

    /// Persist a multiple, assigning row ids to unsaved membership rows
    pub fn save_multiple(&self, mut multiple: MultipleCase) -> MultipleCase {
        for record in &mut multiple.membership {
            if record.id.is_none() {
                record.id = Some(RowId::new(Uuid::new_v4().to_string()));
            }
        }
        self.multiples
            .insert(multiple.reference.clone(), multiple.clone());
        multiple
    }

    fn matching(&self, case_type: &str, predicate: impl Fn(&SingleCase) -> bool) -> Vec<SingleCase> {
        let mut cases: Vec<SingleCase> = self
            .singles
            .iter()
            .filter(|e| e.case_type == case_type && predicate(&e.case))
            .map(|e| e.case.clone())
            .collect();
        cases.sort_by(|a, b| a.reference.cmp(&b.reference));
        cases
    }

    fn by_references(&self, case_type: &str, ids: &[String]) -> Vec<SingleCase> {
        ids.iter()
            .filter_map(|id| {
                self.singles
                    .iter()
                    .find(|e| e.case_type == case_type && &e.case.reference == id)
                    .map(|e| e.case.clone())
            })
            .collect()
    }
}

fn matches_text(case: &SingleCase, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    std::iter::once(Some(case.reference.as_str()))
        .chain([
            case.claimant_surname.as_deref(),
            case.respondent_surname.as_deref(),
            case.sub_multiple.as_deref(),
            case.clerk.as_deref(),
        ])
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
}

#[async_trait]
impl CaseStore for InMemoryCaseStore {
    async fn retrieve_by_ids(
        &self,
        _auth: &AuthToken,
        case_type: &str,
        _jurisdiction: &str,
        ids: &[String],
    ) -> Result<Vec<SingleCase>, StoreError> {
        Ok(self.by_references(case_type, ids))
    }

    async fn retrieve_by_search_index(
        &self,
        _auth: &AuthToken,
        case_type: &str,
        criteria: &SearchCriteria,
    ) -> Result<Vec<SingleCase>, StoreError> {
        Ok(match criteria {
            SearchCriteria::References(ids) => self.by_references(case_type, ids),
            SearchCriteria::FreeText(text) => self.matching(case_type, |c| matches_text(c, text)),
            SearchCriteria::OwnedBy(reference) => {
                self.matching(case_type, |c| c.owner() == Some(reference.as_str()))
            }
        })
    }

    async fn retrieve_multiple(
        &self,
        _auth: &AuthToken,
        case_type: &str,
        multiple_reference: &str,
    ) -> Result<Option<MultipleCase>, StoreError> {
        Ok(self
            .multiple(multiple_reference)
            .filter(|m| m.case_type_id == case_type))
    }

    async fn start_event(
        &self,
        _auth: &AuthToken,
        case_type: &str,
        _jurisdiction: &str,
        case_id: &str,
    ) -> Result<EventToken, StoreError> {
        match self.singles.get(case_id) {
            Some(stored) if stored.case_type == case_type => {
                let token = Ulid::new().to_string();
                self.events.insert(token.clone(), case_id.to_string());
                Ok(EventToken(token))
            }
            _ => Err(StoreError::NotFound(case_id.to_string())),
        }
    }

    async fn submit_event(
        &self,
        _auth: &AuthToken,
        token: EventToken,
        case_type: &str,
        _jurisdiction: &str,
        data: &SingleCase,
        case_id: &str,
    ) -> Result<SingleCase, StoreError> {
        match self.events.remove(&token.0) {
            Some((_, opened_for)) if opened_for == case_id => {}
            _ => return Err(StoreError::InvalidEventToken(case_id.to_string())),
        }
        if data.case_id != case_id {
            return Err(StoreError::Rejected {
                case_id: case_id.to_string(),
                reason: format!("payload belongs to case {}", data.case_id),
            });
        }
        self.insert_case(case_type, data.clone());
        Ok(data.clone())
    }
}
