use alarm_core::{DispatchError, ErrorClass};
use alarm_dispatcher::{DispatchStateStore, DispositionOutcome, ReplaceOutcome};
use alarm_domain::{DispositionAction, DispositionEvent, ResourceViewItem};
use alarm_testing_utils::CatalogResourceBuilder;

fn item(id: &str, can_dispatch: bool) -> ResourceViewItem {
    ResourceViewItem::new(CatalogResourceBuilder::new(id).build(), can_dispatch)
}

fn event(operation_id: i64, resource_id: &str, action: DispositionAction) -> DispositionEvent {
    DispositionEvent {
        operation_id,
        resource_id: resource_id.to_string(),
        action,
    }
}

async fn loaded_store() -> DispatchStateStore {
    let store = DispatchStateStore::new();
    store
        .replace(7, vec![item("A", true), item("B", true), item("L", false)])
        .await;
    store
}

#[tokio::test]
async fn test_replace_and_clear() {
    let store = DispatchStateStore::new();
    assert_eq!(store.current_operation().await, None);

    let outcome = store.replace(7, vec![item("A", true)]).await;
    assert_eq!(outcome, ReplaceOutcome::Replaced { unresolved: vec![] });
    assert_eq!(store.current_operation().await, Some(7));
    assert_eq!(store.snapshot().resources.len(), 1);

    assert_eq!(store.clear().await, Some(7));
    let snapshot = store.snapshot();
    assert_eq!(snapshot.operation_id, None);
    assert!(snapshot.resources.is_empty());

    // Clearing an empty store publishes nothing
    let revision = store.snapshot().revision;
    assert_eq!(store.clear().await, None);
    assert_eq!(store.snapshot().revision, revision);
}

#[tokio::test]
async fn test_upsert_and_remove_on_absent_items_are_noops() {
    let store = loaded_store().await;
    let revision = store.snapshot().revision;

    assert!(!store.upsert_dispatched("missing", true).await);
    assert!(!store.remove("missing").await);
    assert_eq!(store.snapshot().revision, revision);

    assert!(store.upsert_dispatched("A", true).await);
    assert!(store.item("A").await.unwrap().dispatched);
    assert!(store.remove("B").await);
    assert!(store.item("B").await.is_none());
}

#[tokio::test]
async fn test_insert_alarmed_appends_dispatched_item() {
    let store = loaded_store().await;

    let inserted = store
        .insert_alarmed(7, CatalogResourceBuilder::new("C").build())
        .await;
    assert!(inserted);

    let c = store.item("C").await.unwrap();
    assert!(c.can_dispatch);
    assert!(c.dispatched);
    assert_eq!(store.snapshot().resources.last().unwrap().resource_id(), "C");

    // The operation changed while the catalog was being queried
    let inserted = store
        .insert_alarmed(8, CatalogResourceBuilder::new("D").build())
        .await;
    assert!(!inserted);
    assert!(store.item("D").await.is_none());
}

#[tokio::test]
async fn test_disposition_outcomes() {
    let store = loaded_store().await;

    assert_eq!(
        store.apply_disposition(&event(7, "A", DispositionAction::Dispatch)).await,
        DispositionOutcome::Applied
    );
    assert_eq!(
        store.apply_disposition(&event(7, "C", DispositionAction::Dispatch)).await,
        DispositionOutcome::NeedsCatalogEntry
    );
    assert_eq!(
        store.apply_disposition(&event(7, "C", DispositionAction::Recall)).await,
        DispositionOutcome::Ignored
    );
    assert_eq!(
        store.apply_disposition(&event(9, "A", DispositionAction::Recall)).await,
        DispositionOutcome::Ignored
    );
    assert_eq!(
        store.apply_disposition(&event(7, "A", DispositionAction::Recall)).await,
        DispositionOutcome::Applied
    );
    assert!(store.item("A").await.is_none());
}

#[tokio::test]
async fn test_events_during_load_are_replayed() {
    let store = loaded_store().await;
    store.begin_load(8).await;

    assert_eq!(
        store.apply_disposition(&event(8, "B", DispositionAction::Dispatch)).await,
        DispositionOutcome::Buffered
    );
    assert_eq!(
        store.apply_disposition(&event(8, "A", DispositionAction::Recall)).await,
        DispositionOutcome::Buffered
    );

    let outcome = store
        .replace(8, vec![item("A", true), item("B", true)])
        .await;
    assert_eq!(outcome, ReplaceOutcome::Replaced { unresolved: vec![] });
    assert!(store.item("A").await.is_none());
    assert!(store.item("B").await.unwrap().dispatched);
}

#[tokio::test]
async fn test_dispatch_of_absent_resource_during_load_is_handed_back() {
    let store = DispatchStateStore::new();
    store.begin_load(7).await;

    assert_eq!(
        store.apply_disposition(&event(7, "C", DispositionAction::Dispatch)).await,
        DispositionOutcome::Buffered
    );
    // Recalled again before the load finished, so nothing is left to insert
    store.apply_disposition(&event(7, "D", DispositionAction::Dispatch)).await;
    store.apply_disposition(&event(7, "D", DispositionAction::Recall)).await;

    let outcome = store
        .replace(7, vec![item("A", true), item("B", true)])
        .await;
    assert_eq!(
        outcome,
        ReplaceOutcome::Replaced {
            unresolved: vec![event(7, "C", DispositionAction::Dispatch)]
        }
    );
    assert!(store.item("C").await.is_none());

    // Resolving through the catalog inserts it as dispatched
    assert!(store.insert_alarmed(7, CatalogResourceBuilder::new("C").build()).await);
    let c = store.item("C").await.unwrap();
    assert!(c.dispatched);
}

#[tokio::test]
async fn test_acknowledge_during_load_turns_replace_into_clear() {
    let store = loaded_store().await;
    store.begin_load(8).await;

    assert!(store.acknowledge(8).await);
    // The loaded operation 7 is untouched by the acknowledgement of 8
    assert_eq!(store.current_operation().await, Some(7));

    let outcome = store.replace(8, vec![item("A", true)]).await;
    assert_eq!(outcome, ReplaceOutcome::Acknowledged);
    assert_eq!(store.current_operation().await, None);
    assert!(store.snapshot().resources.is_empty());
}

#[tokio::test]
async fn test_aborted_load_drops_buffered_events() {
    let store = loaded_store().await;
    store.begin_load(8).await;
    store
        .apply_disposition(&event(8, "B", DispositionAction::Dispatch))
        .await;
    store.abort_load(8).await;

    store.replace(8, vec![item("B", true)]).await;
    assert!(!store.item("B").await.unwrap().dispatched);
}

#[tokio::test]
async fn test_acknowledge_of_other_operation_leaves_store_untouched() {
    let store = loaded_store().await;
    let before = store.snapshot();

    assert!(!store.acknowledge(99).await);

    let after = store.snapshot();
    assert_eq!(after.operation_id, Some(7));
    assert_eq!(after.resources, before.resources);
    assert_eq!(after.revision, before.revision);
}

#[tokio::test]
async fn test_command_ticket_preconditions() {
    let store = DispatchStateStore::new();
    let err = store.command_ticket(7, "A").await.unwrap_err();
    assert!(matches!(err, DispatchError::NoCurrentOperation));

    let store = loaded_store().await;
    let err = store.command_ticket(6, "A").await.unwrap_err();
    assert!(matches!(
        err,
        DispatchError::StaleOperation {
            requested: 6,
            current: Some(7)
        }
    ));

    let err = store.command_ticket(7, "missing").await.unwrap_err();
    assert!(matches!(err, DispatchError::ResourceNotInView { .. }));

    let err = store.command_ticket(7, "L").await.unwrap_err();
    assert!(matches!(err, DispatchError::ResourceAlarmed { .. }));
    assert_eq!(err.class(), ErrorClass::StaleReference);

    let ticket = store.command_ticket(7, "A").await.unwrap();
    assert_eq!(ticket.operation_id, 7);
    assert_eq!(ticket.revision, store.snapshot().revision);
}

#[tokio::test]
async fn test_push_event_wins_over_optimistic_write() {
    let store = loaded_store().await;
    let ticket = store.command_ticket(7, "A").await.unwrap();

    // Authoritative write lands while the command is in flight
    store
        .apply_disposition(&event(7, "A", DispositionAction::Dispatch))
        .await;

    assert!(!store.apply_optimistic(&ticket, false).await);
    assert!(store.item("A").await.unwrap().dispatched);
}

#[tokio::test]
async fn test_optimistic_write_applies_without_interference() {
    let store = loaded_store().await;
    let ticket = store.command_ticket(7, "A").await.unwrap();

    // Writes to other resources do not block the optimistic update
    store.upsert_dispatched("B", true).await;

    assert!(store.apply_optimistic(&ticket, true).await);
    assert!(store.item("A").await.unwrap().dispatched);

    store.clear().await;
    assert!(!store.apply_optimistic(&ticket, false).await);
}

#[tokio::test]
async fn test_subscribers_observe_every_mutation() {
    let store = DispatchStateStore::new();
    let mut rx = store.subscribe();

    store.replace(7, vec![item("A", true)]).await;
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().operation_id, Some(7));

    store.upsert_dispatched("A", true).await;
    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().resources[0].dispatched);
}
