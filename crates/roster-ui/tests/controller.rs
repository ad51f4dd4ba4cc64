use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use roster_api_models::{Record, ResourceId, SortOrder};
use roster_client::{
    ApiError, MemoryTokenStore, RequestClient, SessionExpired, TokenGateway, TokenStore,
};
use roster_config::{ClientConfig, ControllerConfig};
use roster_test_support::fixtures::{TEST_TOKEN, bearer, bulk_json, list_json, record_json};
use roster_ui::{
    ActionKey, ApplyOutcome, ConfirmedOutcome, FilterCriteria, FilterPatch, GateError,
    ManualScheduler, ResourceController, RestResource, RunOutcome, ToastKind,
};
use serde_json::json;

struct Harness {
    server: MockServer,
    scheduler: Arc<ManualScheduler>,
    controller: ResourceController<Record>,
}

async fn harness_with(store: Arc<dyn TokenStore>) -> anyhow::Result<Harness> {
    let server = MockServer::start_async().await;
    let client_config = ClientConfig {
        base_url: format!("{}/api/", server.base_url()).parse()?,
        request_timeout: Duration::from_secs(5),
        ..ClientConfig::default()
    };
    let client = RequestClient::from_config(&client_config, TokenGateway::new(store))?;
    let scheduler = Arc::new(ManualScheduler::new());
    let config = ControllerConfig {
        per_page: 2,
        debounce: Duration::from_millis(500),
        toast_duration: Duration::from_millis(5000),
        toast_capacity: 5,
    };
    let controller = ResourceController::rest(
        RestResource::new(client, "users", "users"),
        &config,
        scheduler.clone(),
    );
    Ok(Harness {
        server,
        scheduler,
        controller,
    })
}

async fn harness() -> anyhow::Result<Harness> {
    harness_with(Arc::new(MemoryTokenStore::with_token(TEST_TOKEN))).await
}

async fn load_first_page(harness: &Harness, ids: &[i64]) -> anyhow::Result<()> {
    harness
        .server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/users")
                .query_param("page", "1")
                .query_param("sort_by", "created_at");
            then.status(200).json_body(list_json("users", ids, 1, 1, ids.len() as u64));
        })
        .await;
    anyhow::ensure!(harness.controller.fetch(1).await == ApplyOutcome::Applied);
    Ok(())
}

#[tokio::test]
async fn debounced_search_commits_once_and_resets_to_first_page() -> anyhow::Result<()> {
    let h = harness().await?;
    h.server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/users")
                .query_param("page", "2")
                .header("authorization", bearer(TEST_TOKEN));
            then.status(200).json_body(list_json("users", &[3, 4], 2, 3, 6));
        })
        .await;
    let searched = h
        .server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/users")
                .query_param("page", "1")
                .query_param("search", "abc");
            then.status(200).json_body(list_json("users", &[9], 1, 1, 1));
        })
        .await;

    assert_eq!(h.controller.fetch(2).await, ApplyOutcome::Applied);
    assert_eq!(h.controller.pagination().current_page, 2);

    for text in ["a", "ab", "abc"] {
        h.controller.update_filters(FilterPatch::search(text));
        h.scheduler.advance(Duration::from_millis(100));
    }
    h.scheduler.advance(Duration::from_millis(399));
    assert!(h.controller.wait_idle().await.is_none());
    assert!(h.controller.snapshot().filters_dirty());

    h.scheduler.advance(Duration::from_millis(1));
    assert_eq!(h.controller.wait_idle().await, Some(ApplyOutcome::Applied));

    searched.assert_calls_async(1).await;
    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.filters.search, "abc");
    assert_eq!(snapshot.page.pagination.current_page, 1);
    assert_eq!(snapshot.page.items.len(), 1);
    assert!(!snapshot.filters_dirty());
    Ok(())
}

#[tokio::test]
async fn sort_only_change_keeps_current_page() -> anyhow::Result<()> {
    let h = harness().await?;
    h.server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/users")
                .query_param("page", "2")
                .query_param("sort_by", "created_at");
            then.status(200).json_body(list_json("users", &[3, 4], 2, 3, 6));
        })
        .await;
    let sorted = h
        .server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/users")
                .query_param("page", "2")
                .query_param("sort_by", "name")
                .query_param("sort_order", "asc");
            then.status(200).json_body(list_json("users", &[4, 3], 2, 3, 6));
        })
        .await;

    h.controller.fetch(2).await;
    h.controller
        .update_filters(FilterPatch::default().with_sort("name", SortOrder::Asc));
    h.scheduler.advance(Duration::from_millis(500));
    assert_eq!(h.controller.wait_idle().await, Some(ApplyOutcome::Applied));

    sorted.assert_calls_async(1).await;
    assert_eq!(h.controller.pagination().current_page, 2);
    Ok(())
}

#[tokio::test]
async fn switch_view_fetches_first_page_immediately() -> anyhow::Result<()> {
    let h = harness().await?;
    let archived = h
        .server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/users")
                .query_param("page", "1")
                .query_param("status", "archived");
            then.status(200).json_body(list_json("users", &[5], 1, 1, 1));
        })
        .await;

    h.controller.update_filters(FilterPatch::search("pending edit"));
    h.controller.switch_view(FilterCriteria {
        status: Some("archived".into()),
        ..FilterCriteria::default()
    });
    assert_eq!(h.controller.wait_idle().await, Some(ApplyOutcome::Applied));
    h.scheduler.advance(Duration::from_secs(1));
    assert!(h.controller.wait_idle().await.is_none());

    archived.assert_calls_async(1).await;
    assert_eq!(h.controller.snapshot().filters.search, "");
    Ok(())
}

#[tokio::test]
async fn slower_older_fetch_never_overwrites_newer_page() -> anyhow::Result<()> {
    let h = harness().await?;
    h.server
        .mock_async(|when, then| {
            when.method(GET).path("/api/users").query_param("page", "1");
            then.status(200)
                .delay(Duration::from_millis(300))
                .json_body(list_json("users", &[1, 2], 1, 2, 4));
        })
        .await;
    h.server
        .mock_async(|when, then| {
            when.method(GET).path("/api/users").query_param("page", "2");
            then.status(200).json_body(list_json("users", &[3, 4], 2, 2, 4));
        })
        .await;

    let (older, newer) = tokio::join!(h.controller.fetch(1), h.controller.fetch(2));
    assert_eq!(older, ApplyOutcome::Stale);
    assert_eq!(newer, ApplyOutcome::Applied);

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.page.pagination.current_page, 2);
    let ids: Vec<ResourceId> = snapshot.page.items.iter().map(|item| item.id.clone()).collect();
    assert_eq!(ids, vec![ResourceId::Int(3), ResourceId::Int(4)]);
    assert!(!snapshot.loading);
    Ok(())
}

#[tokio::test]
async fn failed_fetch_keeps_previous_page_visible() -> anyhow::Result<()> {
    let h = harness().await?;
    load_first_page(&h, &[1, 2]).await?;
    h.server
        .mock_async(|when, then| {
            when.method(GET).path("/api/users").query_param("page", "2");
            then.status(503);
        })
        .await;

    let outcome = h.controller.fetch(2).await;
    assert!(matches!(outcome, ApplyOutcome::Failed(ApiError::Server { status: 503, .. })));
    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.page.items.len(), 2);
    assert_eq!(snapshot.page.pagination.current_page, 1);
    assert!(snapshot.last_error.is_some());
    Ok(())
}

#[tokio::test]
async fn double_delete_issues_one_request() -> anyhow::Result<()> {
    let h = harness().await?;
    load_first_page(&h, &[1, 2]).await?;
    let delete = h
        .server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/users/1");
            then.status(204).delay(Duration::from_millis(50));
        })
        .await;

    let id = ResourceId::Int(1);
    let (first, second) = tokio::join!(
        h.controller.delete(id.clone()),
        h.controller.delete(id.clone())
    );
    assert_eq!(first, RunOutcome::Done(()));
    assert!(second.is_skipped());
    delete.assert_calls_async(1).await;

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.page.items.len(), 1);
    assert_eq!(snapshot.page.pagination.total, 1);
    assert_eq!(snapshot.toasts.len(), 1);
    assert_eq!(snapshot.toasts[0].kind, ToastKind::Success);
    assert_eq!(snapshot.toasts[0].message, "Deleted item 1");
    assert!(!snapshot.is_loading(&ActionKey::item("delete", &id)));
    Ok(())
}

#[tokio::test]
async fn unauthorized_signals_session_once_without_toast() -> anyhow::Result<()> {
    let h = harness().await?;
    let mut events = h.controller.session_events().expect("rest controller has a gateway");
    h.server
        .mock_async(|when, then| {
            when.method(PATCH).path("/api/users/1");
            then.status(401).json_body(json!({ "message": "token expired" }));
        })
        .await;

    let outcome = h
        .controller
        .patch(ResourceId::Int(1), json!({ "status": "archived" }))
        .await;
    assert!(matches!(outcome, RunOutcome::Failed(ApiError::Unauthorized { .. })));
    assert_eq!(
        events.try_recv()?,
        SessionExpired::Rejected {
            message: "token expired".into()
        }
    );
    assert!(events.try_recv().is_err());
    assert!(h.controller.snapshot().toasts.is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_token_never_reaches_the_server() -> anyhow::Result<()> {
    let h = harness_with(Arc::new(MemoryTokenStore::default())).await?;
    let mut events = h.controller.session_events().expect("rest controller has a gateway");
    let delete = h
        .server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/users/1");
            then.status(204);
        })
        .await;

    let outcome = h.controller.delete(ResourceId::Int(1)).await;
    assert_eq!(outcome, RunOutcome::Failed(ApiError::NoSession));
    assert_eq!(events.try_recv()?, SessionExpired::MissingToken);
    delete.assert_calls_async(0).await;
    assert!(h.controller.snapshot().toasts.is_empty());
    Ok(())
}

#[tokio::test]
async fn validation_error_is_toasted_verbatim_and_kept_on_key() -> anyhow::Result<()> {
    let h = harness().await?;
    load_first_page(&h, &[1]).await?;
    h.server
        .mock_async(|when, then| {
            when.method(PUT).path("/api/users/1");
            then.status(422).json_body(json!({ "message": "Name is required" }));
        })
        .await;

    let id = ResourceId::Int(1);
    let outcome = h.controller.update(id.clone(), json!({ "name": "" })).await;
    assert!(matches!(outcome, RunOutcome::Failed(ApiError::Validation { status: 422, .. })));

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.toasts.len(), 1);
    assert_eq!(snapshot.toasts[0].kind, ToastKind::Error);
    assert_eq!(snapshot.toasts[0].message, "Name is required");
    let key = ActionKey::item("update", &id);
    assert_eq!(
        snapshot.actions.get(&key).and_then(|state| state.error.as_deref()),
        Some("Name is required")
    );

    h.controller.clear_action_error(&key);
    assert!(h.controller.snapshot().actions.is_empty());
    Ok(())
}

#[tokio::test]
async fn patch_with_message_ack_merges_sent_fields() -> anyhow::Result<()> {
    let h = harness().await?;
    load_first_page(&h, &[1, 2]).await?;
    h.server
        .mock_async(|when, then| {
            when.method(PATCH).path("/api/users/1");
            then.status(200).json_body(json!({ "message": "updated" }));
        })
        .await;

    let outcome = h
        .controller
        .patch(ResourceId::Int(1), json!({ "status": "archived" }))
        .await;
    assert_eq!(outcome, RunOutcome::Done(None));
    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.page.items[0].field("status"), Some(&json!("archived")));
    assert_eq!(snapshot.toasts[0].message, "Updated item 1");
    Ok(())
}

#[tokio::test]
async fn create_inserts_returned_record_at_head() -> anyhow::Result<()> {
    let h = harness().await?;
    load_first_page(&h, &[1]).await?;
    h.server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/users")
                .json_body(json!({ "name": "new" }));
            then.status(201).json_body(record_json(10, "new"));
        })
        .await;

    let outcome = h.controller.create(json!({ "name": "new" })).await;
    let RunOutcome::Done(Some(created)) = outcome else {
        anyhow::bail!("expected created record, got {outcome:?}");
    };
    assert_eq!(created.id, ResourceId::Int(10));
    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.page.items[0].id, ResourceId::Int(10));
    assert_eq!(snapshot.page.pagination.total, 2);
    assert_eq!(snapshot.toasts[0].message, "Created item");
    Ok(())
}

#[tokio::test]
async fn bulk_action_reports_partial_failure_in_one_toast() -> anyhow::Result<()> {
    let h = harness().await?;
    load_first_page(&h, &[1, 2, 3]).await?;
    let bulk = h
        .server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/users/bulk-action")
                .json_body(json!({ "ids": [1, 2, 3], "action": "archive" }));
            then.status(200).json_body(bulk_json(&[1, 3], &[(2, "locked")]));
        })
        .await;

    h.controller.select_all_or_clear();
    let ids = h.controller.selected_ids();
    let outcome = h.controller.bulk_action("archive", ids).await;
    let RunOutcome::Done(report) = outcome else {
        anyhow::bail!("expected bulk report, got {outcome:?}");
    };
    bulk.assert_calls_async(1).await;
    assert_eq!(report.succeeded, vec![ResourceId::Int(1), ResourceId::Int(3)]);
    assert_eq!(report.failed[0].error, "locked");

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.toasts.len(), 1);
    assert_eq!(snapshot.toasts[0].message, "2 succeeded, 1 failed");
    assert_eq!(snapshot.toasts[0].kind, ToastKind::Warning);
    assert_eq!(snapshot.selection, vec![ResourceId::Int(2)]);
    Ok(())
}

#[tokio::test]
async fn bulk_endpoint_failure_counts_every_item_failed() -> anyhow::Result<()> {
    let h = harness().await?;
    h.server
        .mock_async(|when, then| {
            when.method(POST).path("/api/users/bulk-action");
            then.status(500);
        })
        .await;

    let ids = vec![ResourceId::Int(1), ResourceId::Int(2), ResourceId::Int(3)];
    let outcome = h.controller.bulk_action("activate", ids).await;
    let RunOutcome::Done(report) = outcome else {
        anyhow::bail!("expected bulk report, got {outcome:?}");
    };
    assert_eq!(report.summary(), "0 succeeded, 3 failed");
    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.toasts.len(), 1);
    assert_eq!(snapshot.toasts[0].kind, ToastKind::Error);
    Ok(())
}

#[tokio::test]
async fn bulk_delete_fans_out_and_isolates_failures() -> anyhow::Result<()> {
    let h = harness().await?;
    load_first_page(&h, &[1, 2]).await?;
    h.server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/users/1");
            then.status(204);
        })
        .await;
    h.server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/users/2");
            then.status(500).json_body(json!({ "message": "boom" }));
        })
        .await;

    let outcome = h
        .controller
        .bulk_delete(vec![ResourceId::Int(1), ResourceId::Int(2)])
        .await;
    let RunOutcome::Done(report) = outcome else {
        anyhow::bail!("expected bulk report, got {outcome:?}");
    };
    assert_eq!(report.succeeded, vec![ResourceId::Int(1)]);
    assert_eq!(report.failed.len(), 1);

    let snapshot = h.controller.snapshot();
    let remaining: Vec<ResourceId> = snapshot.page.items.iter().map(|item| item.id.clone()).collect();
    assert_eq!(remaining, vec![ResourceId::Int(2)]);
    assert_eq!(snapshot.toasts.len(), 1);
    assert_eq!(snapshot.toasts[0].message, "1 succeeded, 1 failed");
    Ok(())
}

#[tokio::test]
async fn delete_waits_for_confirmation() -> anyhow::Result<()> {
    let h = harness().await?;
    load_first_page(&h, &[1, 2]).await?;
    let delete = h
        .server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/users/1");
            then.status(204);
        })
        .await;

    h.controller.request_delete(ResourceId::Int(1))?;
    assert_eq!(
        h.controller.request_delete(ResourceId::Int(2)),
        Err(GateError::Busy)
    );
    assert!(h.controller.snapshot().confirmation.is_some());
    h.controller.cancel()?;
    delete.assert_calls_async(0).await;
    assert_eq!(h.controller.cancel(), Err(GateError::Idle));

    h.controller.request_delete(ResourceId::Int(1))?;
    let outcome = h.controller.confirm().await?;
    assert_eq!(outcome, ConfirmedOutcome::Deleted(RunOutcome::Done(())));
    delete.assert_calls_async(1).await;
    assert!(h.controller.snapshot().confirmation.is_none());
    assert!(matches!(h.controller.confirm().await, Err(GateError::Idle)));
    Ok(())
}

#[tokio::test]
async fn export_renders_visible_page() -> anyhow::Result<()> {
    let h = harness().await?;
    load_first_page(&h, &[1, 2]).await?;
    let csv = h.controller.export_csv(&["id", "name"])?;
    assert_eq!(csv, "id,name\r\n1,item-1\r\n2,item-2\r\n");
    Ok(())
}

#[tokio::test]
async fn toasts_expire_on_the_controller_clock() -> anyhow::Result<()> {
    let h = harness().await?;
    load_first_page(&h, &[1]).await?;
    h.server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/users/1");
            then.status(204);
        })
        .await;

    let mut changes = h.controller.changes();
    h.controller.delete(ResourceId::Int(1)).await;
    assert_eq!(h.controller.snapshot().toasts.len(), 1);
    changes.borrow_and_update();

    h.scheduler.advance(Duration::from_millis(5000));
    assert!(h.controller.snapshot().toasts.is_empty());
    assert!(changes.has_changed()?);
    Ok(())
}

#[tokio::test]
async fn set_filters_is_silent_until_the_next_fetch() -> anyhow::Result<()> {
    let h = harness().await?;
    let mock = h
        .server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/users")
                .query_param("page", "3")
                .query_param("status", "archived")
                .query_param("sort_order", "asc");
            then.status(200).json_body(list_json("users", &[5, 6], 3, 3, 6));
        })
        .await;

    h.controller.set_filters(FilterCriteria {
        status: Some("archived".into()),
        sort_order: SortOrder::Asc,
        ..FilterCriteria::default()
    });
    h.scheduler.advance(Duration::from_secs(1));
    assert!(h.controller.wait_idle().await.is_none());
    assert_eq!(mock.calls_async().await, 0);

    assert_eq!(h.controller.fetch(3).await, ApplyOutcome::Applied);
    mock.assert_async().await;
    assert_eq!(h.controller.snapshot().page.pagination.current_page, 3);
    Ok(())
}
