use ecm_core::prelude::*;
use ecm_model::{CaseState, PassStatus, DETACHED_MARKER};
use ecm_test_utils::*;
use proptest::prelude::*;

async fn formed(harness: &TestHarness, references: &[&str]) -> MultipleCase {
    let mut multiple = multiple(references);
    harness
        .engine
        .create_multiple(&mut multiple, &auth(), RetrievalStrategy::ByIds)
        .await
        .unwrap();
    harness.store.inner().save_multiple(multiple)
}

#[tokio::test]
async fn test_reconcile_keeps_owned_accepted_case() {
    let harness = setup_engine(seeded_store([accepted_case("1111")]));
    let mut multiple = formed(&harness, &["1111"]).await;

    let result = harness
        .engine
        .reconcile(&mut multiple, &auth(), UpdateWorkflow::Direct)
        .await;

    assert_eq!(result.status, PassStatus::Completed);
    assert!(result.errors.is_empty());
    assert_eq!(result.membership.len(), 1);
    assert_eq!(result.membership[0].reference, "1111");
}

#[tokio::test]
async fn test_row_ids_survive_reconciliation() {
    let harness = setup_engine(seeded_store([
        accepted_case("1111"),
        accepted_case("2222"),
    ]));
    let mut multiple = formed(&harness, &["1111", "2222"]).await;
    let before: Vec<_> = multiple.membership.iter().map(|r| r.id.clone()).collect();
    assert!(before.iter().all(Option::is_some));

    harness
        .engine
        .reconcile(&mut multiple, &auth(), UpdateWorkflow::Direct)
        .await;

    let after: Vec<_> = multiple.membership.iter().map(|r| r.id.clone()).collect();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_reconcile_drops_case_that_left_accepted() {
    let harness = setup_engine(seeded_store([accepted_case("1111"), accepted_case("2222")]));
    let mut multiple = formed(&harness, &["1111", "2222"]).await;

    let mut closed = harness.store.case("2222").unwrap();
    closed.state = CaseState::Closed;
    harness.store.inner().insert_case(CASE_TYPE, closed);

    let result = harness
        .engine
        .reconcile(&mut multiple, &auth(), UpdateWorkflow::Direct)
        .await;

    let refs: Vec<_> = multiple.membership.iter().map(|r| r.reference.as_str()).collect();
    assert_eq!(refs, vec!["1111"]);
    assert_eq!(
        result.errors,
        vec!["The state of these cases: [2222] have not been accepted".to_string()]
    );
}

#[tokio::test]
async fn test_reconcile_reports_case_moved_elsewhere() {
    let harness = setup_engine(seeded_store([accepted_case("1111")]));
    let mut multiple = formed(&harness, &["1111"]).await;

    let moved = harness
        .store
        .case("1111")
        .unwrap()
        .with_multiple_reference("888888");
    harness.store.inner().insert_case(CASE_TYPE, moved);

    let result = harness
        .engine
        .reconcile(&mut multiple, &auth(), UpdateWorkflow::Direct)
        .await;

    assert!(multiple.membership.is_empty());
    assert_eq!(
        result.errors,
        vec!["These cases are already assigned to a multiple case: [1111]".to_string()]
    );
}

#[tokio::test]
async fn test_detached_case_is_skipped_silently() {
    let harness = setup_engine(seeded_store([
        accepted_case("1111"),
        accepted_case("2222").with_multiple_reference(DETACHED_MARKER),
    ]));
    let mut multiple = multiple(&["1111", "2222"]);

    let result = harness
        .engine
        .reconcile(&mut multiple, &auth(), UpdateWorkflow::Direct)
        .await;

    assert!(result.errors.is_empty());
    let refs: Vec<_> = result.membership.iter().map(|r| r.reference.as_str()).collect();
    assert_eq!(refs, vec!["1111"]);
}

#[tokio::test]
async fn test_search_failure_keeps_previous_membership() {
    let harness = setup_engine(seeded_store([accepted_case("1111")]));
    let mut multiple = formed(&harness, &["1111"]).await;
    let before = multiple.membership.clone();
    harness.store.fail_retrieval(true);

    let result = harness
        .engine
        .reconcile(&mut multiple, &auth(), UpdateWorkflow::Direct)
        .await;

    assert_eq!(result.status, PassStatus::SearchFailed);
    assert!(result.membership.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert!(!result.is_finalizable());
    assert_eq!(multiple.membership, before);
}

#[tokio::test]
async fn test_raw_update_request_reports_failure_without_touching_multiple() {
    let harness = setup_engine(seeded_store([accepted_case("1111")]));
    let multiple = formed(&harness, &["1111"]).await;
    harness.store.fail_retrieval(true);

    let result = harness
        .engine
        .update()
        .update_bulk_request(&multiple, &auth(), UpdateWorkflow::Direct)
        .await;

    assert!(result.membership.is_empty());
    assert_eq!(result.status, PassStatus::SearchFailed);
    assert_eq!(multiple.membership.len(), 1);
}

#[tokio::test]
async fn test_pq_reconcile_resolves_user_once_per_pass() {
    let harness = setup_engine(seeded_store([accepted_case("1111"), accepted_case("2222")]));
    let mut multiple = formed(&harness, &["1111", "2222"]).await;

    for _ in 0..3 {
        let result = harness
            .engine
            .reconcile(&mut multiple, &auth(), UpdateWorkflow::PersistentQueue)
            .await;
        assert!(result.acting_user.is_some());
    }

    // cached after the first pass
    assert_eq!(harness.identity.calls(), 1);
}

#[tokio::test]
async fn test_pq_reconcile_without_user_is_not_finalizable() {
    let harness = setup_engine_with(
        seeded_store([accepted_case("1111")]),
        EngineConfig::new(),
        StaticIdentity::failing(),
    );
    let mut multiple = multiple(&["1111"]);

    let result = harness
        .engine
        .reconcile(&mut multiple, &auth(), UpdateWorkflow::PersistentQueue)
        .await;

    assert_eq!(result.membership.len(), 1);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("Unable to resolve acting user:"));
    assert!(!result.is_finalizable());
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

fn any_owner() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(MULTIPLE_REFERENCE.to_string())),
        Just(Some("888888".to_string())),
        Just(Some(DETACHED_MARKER.to_string())),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_reconciliation_is_idempotent(
        cases in proptest::collection::vec((any_state(), any_owner()), 0..12)
    ) {
        let references: Vec<String> = (0..cases.len()).map(|i| format!("{}", 5000 + i)).collect();
        let store = seeded_store(cases.iter().zip(&references).map(|((state, owner), r)| {
            let mut case = case(r, *state);
            case.multiple_reference = owner.clone();
            case
        }));
        let harness = setup_engine(store);
        let ids: Vec<&str> = references.iter().map(String::as_str).collect();

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (first, second, members) = runtime.block_on(async {
            let mut multiple = multiple(&ids);
            let first = harness.engine.reconcile(&mut multiple, &auth(), UpdateWorkflow::Direct).await;
            let mut multiple = harness.store.inner().save_multiple(multiple);
            let members = multiple.membership.clone();
            let second = harness.engine.reconcile(&mut multiple, &auth(), UpdateWorkflow::Direct).await;
            (first, second, members)
        });

        prop_assert_eq!(&first.errors, &second.errors);
        prop_assert_eq!(&members, &second.membership);
        for record in &second.membership {
            prop_assert_eq!(record.state, CaseState::Accepted);
        }
    }
}
