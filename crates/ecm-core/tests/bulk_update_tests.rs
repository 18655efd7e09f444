use ecm_core::prelude::*;
use ecm_core::{
    BulkUpdateService, ChannelPropagator, PropagationError, StoreError, INVALID_MOVE_TARGET,
};
use ecm_model::{CaseState, FieldChanges, StagedUpdate};
use ecm_test_utils::*;

async fn formed(harness: &TestHarness, references: &[&str]) -> MultipleCase {
    let mut multiple = multiple(references);
    harness
        .engine
        .create_multiple(&mut multiple, &auth(), RetrievalStrategy::ByIds)
        .await
        .unwrap();
    harness.store.inner().save_multiple(multiple)
}

fn three_cases() -> Arc<ScriptedStore> {
    seeded_store([accepted_case("1111"), accepted_case("2222"), accepted_case("3333")])
}

#[tokio::test]
async fn test_nothing_staged_is_a_no_op() {
    let harness = setup_engine(three_cases());
    let mut multiple = formed(&harness, &["1111", "2222"]).await;
    multiple.staged.clerk_v2 = Some("   ".into());

    let result = harness.engine.bulk_update(&mut multiple, &auth()).await.unwrap();

    assert!(result.errors.is_empty());
    assert_eq!(result.membership.len(), 2);
    assert!(harness.propagator.sent().is_empty());
}

#[tokio::test]
async fn test_field_update_fans_out_to_members() {
    let harness = setup_engine(three_cases());
    let mut multiple = formed(&harness, &["1111", "2222"]).await;
    multiple.staged.sub_multiple_v2 = Some("Sub A".into());
    multiple.staged.clerk_v2 = Some("Jane Clerk".into());

    let result = harness.engine.bulk_update(&mut multiple, &auth()).await.unwrap();

    assert!(result.is_finalizable());
    let sent = harness.propagator.sent();
    assert_eq!(sent.len(), 1);
    let (references, delta) = &sent[0];
    assert_eq!(references, &vec!["1111".to_string(), "2222".to_string()]);
    assert_eq!(delta.case_type_id, CASE_TYPE);
    assert_eq!(delta.jurisdiction, "EMPLOYMENT");
    assert_eq!(
        delta.changes,
        FieldChanges {
            sub_multiple: Some("Sub A".into()),
            clerk: Some("Jane Clerk".into()),
            ..FieldChanges::default()
        }
    );

    assert!(multiple
        .membership
        .iter()
        .all(|r| r.sub_multiple.as_deref() == Some("Sub A") && r.clerk.as_deref() == Some("Jane Clerk")));
    assert_eq!(multiple.staged, StagedUpdate::default());
}

#[tokio::test]
async fn test_search_collection_narrows_targets() {
    let harness = setup_engine(three_cases());
    let mut multiple = formed(&harness, &["1111", "2222"]).await;
    multiple.search_collection = Some("claimant2222".into());
    multiple.staged.position_type_v2 = Some("Listed".into());

    harness.engine.bulk_update(&mut multiple, &auth()).await.unwrap();

    let sent = harness.propagator.sent();
    assert_eq!(sent[0].0, vec!["2222".to_string()]);
}

#[tokio::test]
async fn test_search_collection_never_reaches_non_members() {
    let harness = setup_engine(three_cases());
    let mut multiple = formed(&harness, &["1111"]).await;
    multiple.search_collection = Some("claimant3333".into());
    multiple.staged.file_location_v2 = Some("Leeds office".into());

    let result = harness.engine.bulk_update(&mut multiple, &auth()).await.unwrap();

    assert!(result.errors.is_empty());
    assert!(harness.propagator.sent().is_empty());
    // nothing was sent, so the edit stays staged
    assert_eq!(multiple.staged.file_location_v2.as_deref(), Some("Leeds office"));
}

#[tokio::test]
async fn test_ecc_links_are_included() {
    let harness = setup_engine(seeded_store([
        accepted_case("1111").with_ecc_case("9999"),
        accepted_case("2222").with_ecc_case("1111"),
        case("9999", CaseState::Submitted),
    ]));
    let mut multiple = formed(&harness, &["1111", "2222"]).await;
    multiple.staged.clerk_v2 = Some("Jane Clerk".into());

    harness.engine.bulk_update(&mut multiple, &auth()).await.unwrap();

    let sent = harness.propagator.sent();
    assert_eq!(
        sent[0].0,
        vec!["1111".to_string(), "2222".to_string(), "9999".to_string()]
    );
}

#[tokio::test]
async fn test_move_to_self_is_rejected() {
    let harness = setup_engine(three_cases());
    let mut multiple = formed(&harness, &["1111"]).await;
    multiple.staged.multiple_reference_v2 = Some(MULTIPLE_REFERENCE.into());
    let before = multiple.clone();

    let result = harness.engine.bulk_update(&mut multiple, &auth()).await.unwrap();

    assert_eq!(result.errors, vec![INVALID_MOVE_TARGET.to_string()]);
    assert_eq!(multiple, before);
    assert!(harness.propagator.sent().is_empty());
}

#[tokio::test]
async fn test_move_to_unknown_multiple_is_rejected() {
    let harness = setup_engine(three_cases());
    let mut multiple = formed(&harness, &["1111"]).await;
    multiple.staged.multiple_reference_v2 = Some("777777".into());

    let result = harness.engine.bulk_update(&mut multiple, &auth()).await.unwrap();

    assert_eq!(result.errors, vec![INVALID_MOVE_TARGET.to_string()]);
    assert_eq!(multiple.staged.move_target(), Some("777777"));
    assert_eq!(multiple.membership.len(), 1);
}

#[tokio::test]
async fn test_move_detaches_cases_from_source() {
    let harness = setup_engine(three_cases());
    harness.store.inner().save_multiple(MultipleCase::new(
        "multiple-2",
        "777777",
        MULTIPLE_CASE_TYPE,
    ));
    let mut multiple = formed(&harness, &["1111", "2222"]).await;
    multiple.search_collection = Some("1111".into());
    multiple.staged.multiple_reference_v2 = Some("777777".into());

    let result = harness.engine.bulk_update(&mut multiple, &auth()).await.unwrap();

    assert!(result.errors.is_empty());
    let sent = harness.propagator.sent();
    assert_eq!(sent[0].0, vec!["1111".to_string()]);
    assert_eq!(sent[0].1.changes.multiple_reference.as_deref(), Some("777777"));

    let refs: Vec<_> = multiple.membership.iter().map(|r| r.reference.as_str()).collect();
    assert_eq!(refs, vec!["2222"]);
    assert_eq!(multiple.case_id_collection, vec!["2222".to_string()]);
    assert!(multiple.staged.is_empty());
}

#[tokio::test]
async fn test_move_target_lookup_failure_is_fatal() {
    let harness = setup_engine(three_cases());
    let mut multiple = formed(&harness, &["1111"]).await;
    multiple.staged.multiple_reference_v2 = Some("777777".into());
    harness.store.fail_multiple_lookup(true);

    let result = harness.engine.bulk_update(&mut multiple, &auth()).await;

    assert!(matches!(
        result,
        Err(EngineError::BulkRetrieval(StoreError::Transport(_)))
    ));
}

#[tokio::test]
async fn test_target_retrieval_failure_is_fatal() {
    let harness = setup_engine(three_cases());
    let mut multiple = formed(&harness, &["1111"]).await;
    multiple.staged.clerk_v2 = Some("Jane Clerk".into());
    harness.store.fail_retrieval(true);

    let result = harness.engine.bulk_update(&mut multiple, &auth()).await;

    assert!(matches!(result, Err(EngineError::BulkRetrieval(_))));
    assert_eq!(multiple.staged.clerk_v2.as_deref(), Some("Jane Clerk"));
}

#[tokio::test]
async fn test_propagation_failure_keeps_staged_fields() {
    let harness = setup_engine(three_cases());
    let mut multiple = formed(&harness, &["1111", "2222"]).await;
    multiple.staged.clerk_v2 = Some("Jane Clerk".into());
    harness.propagator.fail_with(PropagationError::QueueFull(256));

    let result = harness.engine.bulk_update(&mut multiple, &auth()).await.unwrap();

    assert_eq!(
        result.errors,
        vec!["Unable to queue bulk update for 2 cases: propagation queue full (capacity: 256)".to_string()]
    );
    assert_eq!(multiple.staged.clerk_v2.as_deref(), Some("Jane Clerk"));
    assert!(multiple.membership.iter().all(|r| r.clerk.is_none()));
}

#[test]
fn test_clear_up_fields_is_idempotent() {
    let mut multiple = multiple(&["1111"]);
    multiple.staged.sub_multiple_v2 = Some("Sub A".into());

    BulkUpdateService::clear_up_fields(&mut multiple);
    let once = multiple.clone();
    BulkUpdateService::clear_up_fields(&mut multiple);

    assert_eq!(multiple, once);
    assert!(multiple.staged.is_empty());
}

#[tokio::test]
async fn test_channel_propagator_applies_edit_to_singles() {
    let store = three_cases();
    let (propagator, worker) = ChannelPropagator::spawn(store.clone(), auth(), 8);
    let identity = Arc::new(StaticIdentity::new());
    let engine = BulkEngine::new(EngineConfig::new(), store.clone(), Arc::new(propagator), identity)
        .unwrap();

    let mut multiple = multiple(&["1111", "2222"]);
    engine
        .create_multiple(&mut multiple, &auth(), RetrievalStrategy::ByIds)
        .await
        .unwrap();
    multiple.staged.clerk_v2 = Some("Jane Clerk".into());
    engine.bulk_update(&mut multiple, &auth()).await.unwrap();

    drop(engine);
    let stats = worker.await.unwrap();

    assert_eq!(stats.messages, 1);
    assert_eq!(stats.applied, 2);
    assert_eq!(stats.failed, 0);
    assert_eq!(store.case("1111").unwrap().clerk.as_deref(), Some("Jane Clerk"));
    assert_eq!(store.case("2222").unwrap().clerk.as_deref(), Some("Jane Clerk"));
    assert!(store.case("3333").unwrap().clerk.is_none());
}

#[tokio::test]
async fn test_moved_cases_are_reconciled_into_target() {
    let store = three_cases();
    store.inner().save_multiple(MultipleCase::new(
        "multiple-2",
        "777777",
        MULTIPLE_CASE_TYPE,
    ));

    let (propagator, worker) = ChannelPropagator::spawn(store.clone(), auth(), 8);
    let engine = BulkEngine::new(
        EngineConfig::new(),
        store.clone(),
        Arc::new(propagator),
        Arc::new(StaticIdentity::new()),
    )
    .unwrap();

    let mut source = multiple(&["1111", "2222"]);
    engine
        .create_multiple(&mut source, &auth(), RetrievalStrategy::ByIds)
        .await
        .unwrap();
    let mut source = store.inner().save_multiple(source);
    source.search_collection = Some("1111".into());
    source.staged.multiple_reference_v2 = Some("777777".into());
    let result = engine.bulk_update(&mut source, &auth()).await.unwrap();
    assert!(result.errors.is_empty());

    drop(engine);
    let stats = worker.await.unwrap();
    assert_eq!(stats.applied, 1);
    assert_eq!(store.case("1111").unwrap().owner(), Some("777777"));

    let harness = setup_engine(store.clone());
    let mut target = store.inner().multiple("777777").unwrap();
    let result = harness
        .engine
        .reconcile(&mut target, &auth(), UpdateWorkflow::Direct)
        .await;

    assert!(result.is_finalizable());
    let refs: Vec<_> = target.membership.iter().map(|r| r.reference.as_str()).collect();
    assert_eq!(refs, vec!["1111"]);

    source.search_collection = None;
    let result = harness
        .engine
        .reconcile(&mut source, &auth(), UpdateWorkflow::Direct)
        .await;
    assert!(result.is_finalizable());
    let refs: Vec<_> = source.membership.iter().map(|r| r.reference.as_str()).collect();
    assert_eq!(refs, vec!["2222"]);
}
