//! Case matching
//!
//! Pure mapping from a retrieved single case to membership eligibility and
//! to a membership row. Nothing here touches the store.

use ecm_model::{MembershipRecord, RowId, SingleCase};
use std::collections::HashMap;

/// Why a case may or may not join a multiple
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    /// Accepted and unclaimed (or already claimed by this multiple)
    Eligible,
    /// Not in the Accepted state
    NotAccepted,
    /// Claimed by a different multiple
    AlreadyAssigned { owner: String },
}

impl Eligibility {
    /// Human-readable error for an excluded case
    #[must_use]
    pub fn error_for(&self, reference: &str) -> Option<String> {
        match self {
            Eligibility::Eligible => None,
            Eligibility::NotAccepted => Some(not_accepted_message(reference)),
            Eligibility::AlreadyAssigned { .. } => Some(already_assigned_message(reference)),
        }
    }
}

/// Error for a case that has not been accepted
#[inline]
#[must_use]
pub fn not_accepted_message(reference: &str) -> String {
    format!("The state of these cases: [{reference}] have not been accepted")
}

/// Error for a case owned by another multiple
#[inline]
#[must_use]
pub fn already_assigned_message(reference: &str) -> String {
    format!("These cases are already assigned to a multiple case: [{reference}]")
}

/// Cases split by eligibility, each list in candidate order
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub accepted: Vec<SingleCase>,
    pub errored: Vec<SingleCase>,
    pub already_assigned: Vec<SingleCase>,
    /// One message per excluded case, in candidate order
    pub errors: Vec<String>,
}

/// Eligibility rules for one multiple
#[derive(Debug, Clone, Copy)]
pub struct CaseMatcher<'a> {
    multiple_reference: &'a str,
}

impl<'a> CaseMatcher<'a> {
    /// Matcher for the multiple with this reference
    #[inline]
    #[must_use]
    pub fn new(multiple_reference: &'a str) -> Self {
        Self { multiple_reference }
    }

    /// State is checked before ownership; a case gets at most one verdict
    #[must_use]
    pub fn eligibility(&self, case: &SingleCase) -> Eligibility {
        if !case.is_accepted() {
            return Eligibility::NotAccepted;
        }
        self.ownership(case)
    }

    /// Like [`Self::eligibility`] but also admits cases still awaiting
    /// acceptance; rejected and closed cases are still excluded
    #[must_use]
    pub fn pre_accept_eligibility(&self, case: &SingleCase) -> Eligibility {
        if !case.is_accepted() && !case.state.is_pre_acceptance() {
            return Eligibility::NotAccepted;
        }
        self.ownership(case)
    }

    fn ownership(&self, case: &SingleCase) -> Eligibility {
        match case.owner() {
            Some(owner) if owner != self.multiple_reference => Eligibility::AlreadyAssigned {
                owner: owner.to_string(),
            },
            _ => Eligibility::Eligible,
        }
    }

    /// Split candidates into accepted / errored / already-assigned
    #[must_use]
    pub fn classify(&self, cases: Vec<SingleCase>) -> Classification {
        self.classify_with(cases, |case| self.eligibility(case))
    }

    /// [`Self::classify`] using [`Self::pre_accept_eligibility`]
    #[must_use]
    pub fn classify_pre_accept(&self, cases: Vec<SingleCase>) -> Classification {
        self.classify_with(cases, |case| self.pre_accept_eligibility(case))
    }

    fn classify_with(
        &self,
        cases: Vec<SingleCase>,
        verdict_of: impl Fn(&SingleCase) -> Eligibility,
    ) -> Classification {
        let mut out = Classification::default();
        for case in cases {
            let verdict = verdict_of(&case);
            if let Some(message) = verdict.error_for(&case.reference) {
                tracing::warn!(reference = %case.reference, "{}", message);
                out.errors.push(message);
            }
            match verdict {
                Eligibility::Eligible => out.accepted.push(case),
                Eligibility::NotAccepted => out.errored.push(case),
                Eligibility::AlreadyAssigned { .. } => out.already_assigned.push(case),
            }
        }
        out
    }

    /// Membership row for a case, reusing the row id already held for its reference
    #[must_use]
    pub fn to_record(case: &SingleCase, existing: &HashMap<&str, &RowId>) -> MembershipRecord {
        let id = existing.get(case.reference.as_str()).map(|id| (*id).clone());
        MembershipRecord::from_case(case).with_id(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecm_model::CaseState;
    use proptest::prelude::*;

    #[test]
    fn accepted_unowned_case_is_eligible() {
        let matcher = CaseMatcher::new("246000");
        let case = SingleCase::new("1", "1111", CaseState::Accepted);
        assert_eq!(matcher.eligibility(&case), Eligibility::Eligible);
    }

    #[test]
    fn case_owned_by_this_multiple_is_eligible() {
        let matcher = CaseMatcher::new("246000");
        let case = SingleCase::new("1", "1111", CaseState::Accepted).with_multiple_reference("246000");
        assert_eq!(matcher.eligibility(&case), Eligibility::Eligible);
    }

    #[test]
    fn state_is_reported_before_ownership() {
        let matcher = CaseMatcher::new("246000");
        let case = SingleCase::new("1", "1111", CaseState::Submitted).with_multiple_reference("999");
        assert_eq!(matcher.eligibility(&case), Eligibility::NotAccepted);
    }

    #[test]
    fn classify_reports_one_message_per_excluded_case() {
        let matcher = CaseMatcher::new("246000");
        let cases = vec![
            SingleCase::new("1", "1111", CaseState::Accepted),
            SingleCase::new("2", "2222", CaseState::Submitted),
            SingleCase::new("3", "3333", CaseState::Accepted).with_multiple_reference("999"),
        ];

        let out = matcher.classify(cases);

        assert_eq!(out.accepted.len(), 1);
        assert_eq!(out.errored.len(), 1);
        assert_eq!(out.already_assigned.len(), 1);
        assert_eq!(
            out.errors,
            vec![
                "The state of these cases: [2222] have not been accepted".to_string(),
                "These cases are already assigned to a multiple case: [3333]".to_string(),
            ]
        );
    }

    #[test]
    fn pre_accept_admits_pending_but_not_rejected_or_foreign() {
        let matcher = CaseMatcher::new("246000");
        let pending = SingleCase::new("1", "1111", CaseState::Vetted);
        let rejected = SingleCase::new("2", "2222", CaseState::Rejected);
        let foreign = SingleCase::new("3", "3333", CaseState::Submitted).with_multiple_reference("999");

        assert_eq!(matcher.pre_accept_eligibility(&pending), Eligibility::Eligible);
        assert_eq!(matcher.pre_accept_eligibility(&rejected), Eligibility::NotAccepted);
        assert_eq!(
            matcher.pre_accept_eligibility(&foreign),
            Eligibility::AlreadyAssigned { owner: "999".into() }
        );
    }

    #[test]
    fn to_record_reuses_existing_row_id() {
        let row = RowId::new("row-7");
        let mut existing = HashMap::new();
        existing.insert("1111", &row);
        let case = SingleCase::new("1", "1111", CaseState::Accepted)
            .with_parties("Smith", "Acme")
            .as_lead();

        let record = CaseMatcher::to_record(&case, &existing);

        assert_eq!(record.id, Some(row.clone()));
        assert!(record.lead_claimant);
        assert_eq!(record.claimant_surname.as_deref(), Some("Smith"));
    }

    fn any_state() -> impl Strategy<Value = CaseState> {
        prop_oneof![
            Just(CaseState::Submitted),
            Just(CaseState::Vetted),
            Just(CaseState::Accepted),
            Just(CaseState::Rejected),
            Just(CaseState::Closed),
        ]
    }

    proptest! {
        #[test]
        fn never_admits_unaccepted_or_foreign_cases(
            states in proptest::collection::vec(any_state(), 0..20),
            owners in proptest::collection::vec(proptest::option::of("(246000|999|0|)"), 20),
        ) {
            let matcher = CaseMatcher::new("246000");
            let cases: Vec<SingleCase> = states
                .iter()
                .zip(owners.iter())
                .enumerate()
                .map(|(i, (state, owner))| {
                    let mut case = SingleCase::new(i.to_string(), format!("{i:04}"), *state);
                    case.multiple_reference = owner.clone();
                    case
                })
                .collect();
            let total = cases.len();

            let out = matcher.classify(cases);

            prop_assert!(out.accepted.iter().all(|c| c.is_accepted()));
            prop_assert!(out.accepted.iter().all(|c| !c.is_owned_by_other("246000")));
            prop_assert_eq!(out.errors.len(), out.errored.len() + out.already_assigned.len());
            prop_assert_eq!(out.accepted.len() + out.errors.len(), total);
        }
    }
}
