// SPDX-License-Identifier: MIT
//! Task history integration tests.
//!
//! Every applied transition appends one event in the same transaction as the
//! task update: per-task sequence numbers are gapless from 1, failed or no-op
//! transitions record nothing, and `[history] enabled = false` switches the
//! trail off entirely.

use std::sync::Arc;

use taskgate::{
    EngineConfig, FixedIdentity, Storage, Task, TaskService, TaskState, WorkbasketAccessItem,
    WorkbasketPermission, WorkbasketSummary,
};

// ─── Helpers ─────────────────────────────────────────────────────────────────

async fn bootstrap(users: &[&str]) -> (Storage, WorkbasketSummary) {
    let storage = Storage::in_memory().await.unwrap();
    let workbasket = WorkbasketSummary::new("TEAM-D", "DOMAIN_A", "Team D inbox");
    storage
        .workbaskets()
        .insert_workbasket(&workbasket)
        .await
        .unwrap();
    for user in users {
        let item = WorkbasketAccessItem::new(
            &workbasket.id,
            *user,
            vec![WorkbasketPermission::Read],
        );
        storage
            .workbaskets()
            .insert_access_item(&item)
            .await
            .unwrap();
    }
    (storage, workbasket)
}

fn service_with(storage: &Storage, user: &str, config: EngineConfig) -> TaskService {
    TaskService::new(
        storage.clone(),
        Arc::new(FixedIdentity::user(user)),
        config,
    )
}

async fn seed_task(
    storage: &Storage,
    workbasket: &WorkbasketSummary,
    state: TaskState,
    owner: Option<&str>,
) -> Task {
    let mut builder = Task::builder()
        .name("process return shipment")
        .workbasket(workbasket.clone())
        .state(state);
    if let Some(owner) = owner {
        builder = builder.owner(owner);
    }
    let task = builder.build();
    storage.tasks().insert(&task).await.unwrap();
    task
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_transition_records_full_event() {
    let (storage, workbasket) = bootstrap(&["user-5-1"]).await;
    let task = seed_task(&storage, &workbasket, TaskState::Ready, None).await;

    let service = service_with(&storage, "user-5-1", EngineConfig::default());
    let claimed = service.claim(&task.id).await.unwrap();

    let events = storage.history().events_for_task(&task.id).await.unwrap();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.task_id, task.id);
    assert_eq!(event.seq, 1);
    assert_eq!(event.event_type, "task.claimed");
    assert_eq!(event.actor, "user-5-1");
    assert_eq!(event.old_state, TaskState::Ready);
    assert_eq!(event.new_state, TaskState::Claimed);
    assert_eq!(event.old_owner, None);
    assert_eq!(event.new_owner.as_deref(), Some("user-5-1"));
    assert_eq!(event.created, claimed.modified);
}

#[tokio::test]
async fn test_sequence_is_gapless_and_per_task() {
    let (storage, workbasket) = bootstrap(&["user-5-1"]).await;
    let first = seed_task(&storage, &workbasket, TaskState::Ready, None).await;
    let second = seed_task(&storage, &workbasket, TaskState::Ready, None).await;

    let service = service_with(&storage, "user-5-1", EngineConfig::default());

    // Interleave transitions across the two tasks.
    service.claim(&first.id).await.unwrap();
    service.claim(&second.id).await.unwrap();
    service.request_review(&first.id).await.unwrap();
    service.cancel(&second.id).await.unwrap();
    service.force_claim(&first.id).await.unwrap();

    let first_events = storage.history().events_for_task(&first.id).await.unwrap();
    let second_events = storage
        .history()
        .events_for_task(&second.id)
        .await
        .unwrap();

    assert_eq!(
        first_events.iter().map(|e| e.seq).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(
        first_events
            .iter()
            .map(|e| e.event_type.as_str())
            .collect::<Vec<_>>(),
        vec!["task.claimed", "task.review_requested", "task.force_claimed"]
    );
    assert_eq!(
        second_events.iter().map(|e| e.seq).collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert_eq!(second_events[1].event_type, "task.cancelled");
}

#[tokio::test]
async fn test_failed_transition_records_nothing() {
    let (storage, workbasket) = bootstrap(&["user-5-1"]).await;
    let task = seed_task(&storage, &workbasket, TaskState::InReview, Some("user-5-2")).await;

    let service = service_with(&storage, "user-5-1", EngineConfig::default());
    service.request_changes(&task.id).await.unwrap_err();

    let events = storage.history().events_for_task(&task.id).await.unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_idempotent_complete_records_once() {
    let (storage, workbasket) = bootstrap(&["user-5-1"]).await;
    let task = seed_task(&storage, &workbasket, TaskState::Claimed, Some("user-5-1")).await;

    let service = service_with(&storage, "user-5-1", EngineConfig::default());
    service.complete(&task.id).await.unwrap();
    service.complete(&task.id).await.unwrap();
    service.complete(&task.id).await.unwrap();

    let events = storage.history().events_for_task(&task.id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "task.completed");
}

#[tokio::test]
async fn test_history_can_be_disabled() {
    let (storage, workbasket) = bootstrap(&["user-5-1"]).await;
    let task = seed_task(&storage, &workbasket, TaskState::Ready, None).await;

    let config: EngineConfig = toml::from_str("[history]\nenabled = false").unwrap();
    let service = service_with(&storage, "user-5-1", config);

    service.claim(&task.id).await.unwrap();
    service.request_review(&task.id).await.unwrap();

    // Transitions applied, trail stayed empty.
    let stored = storage.tasks().get(&task.id).await.unwrap().unwrap();
    assert_eq!(stored.state, TaskState::ReadyForReview);
    assert!(storage
        .history()
        .events_for_task(&task.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_force_event_types_are_distinct() {
    let (storage, workbasket) = bootstrap(&["user-5-1"]).await;
    let task = seed_task(&storage, &workbasket, TaskState::Claimed, Some("user-5-2")).await;

    let service = service_with(&storage, "user-5-1", EngineConfig::default());
    service.force_cancel_claim(&task.id).await.unwrap();
    service.force_claim(&task.id).await.unwrap();
    service.force_request_review(&task.id).await.unwrap();
    service.force_request_changes(&task.id).await.unwrap();
    service.force_complete(&task.id).await.unwrap();

    let events = storage.history().events_for_task(&task.id).await.unwrap();
    assert_eq!(
        events
            .iter()
            .map(|e| e.event_type.as_str())
            .collect::<Vec<_>>(),
        vec![
            "task.force_claim_cancelled",
            "task.force_claimed",
            "task.force_review_requested",
            "task.force_changes_requested",
            "task.force_completed",
        ]
    );
}
