//! Offline write and replay scenarios across all crates.

use offkit_http::{is_read_only_method, HttpRequest, HttpResponse};
use offkit_sync::{SyncError, SyncOptions};
use offkit_testkit::prelude::*;
use proptest::prelude::*;
use serde_json::json;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

#[tokio::test]
async fn put_replays_first_and_log_drains() {
    let stack = TestStack::new();
    stack.queue_at(50, &HttpRequest::get("https://api.test/items")).await;
    stack
        .queue_at(100, &HttpRequest::new("PUT", "https://api.test/items/1"))
        .await;

    let report = stack.sync.sync(SyncOptions::new()).await.unwrap();
    assert_eq!(report.replayed, 2);
    assert_eq!(
        stack.transport.sent_lines(),
        vec!["PUT https://api.test/items/1", "GET https://api.test/items"]
    );
    assert!(stack.sync.log().is_empty().await.unwrap());
}

#[tokio::test]
async fn rejected_write_can_be_rolled_back() {
    let stack = TestStack::new();
    let cache = stack.cache("api").await;
    let items = stack.stores.open_store("items").await.unwrap();
    items
        .upsert("1", json!({}), json!({"id": 1, "name": "server"}), None)
        .await
        .unwrap();

    let mut request = HttpRequest::new("PUT", "https://api.test/items/1");
    let _guard = stack.shred_into(&mut request, "items");
    let optimistic = json_response(&json!({"id": 1, "name": "local"}));
    stack.clock.set(500);
    let write = offline_write(&stack, &cache, &request, &optimistic).await.unwrap();
    assert_eq!(stack.row("items", "1").await.unwrap()["name"], "local");

    stack.transport.set_response(
        "PUT",
        "https://api.test/items/1",
        HttpResponse::new(409).with_status_text("Conflict"),
    );
    let err = stack.sync.sync(SyncOptions::new()).await.unwrap_err();
    let SyncError::RequestFailed { request_id, .. } = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(request_id, &write.request_id);

    let entry = stack
        .sync
        .log()
        .get_sync_log()
        .await
        .unwrap()
        .into_iter()
        .find(|e| e.request_id() == write.request_id)
        .unwrap();
    assert!(entry.undo().await.unwrap());
    assert_eq!(stack.row("items", "1").await.unwrap()["name"], "server");

    stack.sync.log().remove_request(&write.request_id).await.unwrap();
    assert_eq!(stack.sync.log().undo_redo_data(&write.request_id).await.unwrap(), None);
}

#[tokio::test]
async fn accepted_write_keeps_local_rows() {
    let stack = TestStack::new();
    let cache = stack.cache("api").await;
    let mut request = HttpRequest::new("POST", "https://api.test/items");
    let _guard = stack.shred_into(&mut request, "items");

    offline_write(&stack, &cache, &request, &json_response(&items_payload(2)))
        .await
        .unwrap();
    stack.sync.sync(SyncOptions::new()).await.unwrap();

    assert!(stack.sync.log().is_empty().await.unwrap());
    assert_eq!(stack.row("items", "2").await.unwrap()["name"], "item-2");
}

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn writes_replay_before_reads_in_time_order(methods in prop::collection::vec(method_strategy(), 1..10)) {
        let sent = runtime().block_on(async {
            let stack = TestStack::new();
            for (i, method) in methods.iter().enumerate() {
                let request = HttpRequest::new(method, format!("https://api.test/r/{i}"));
                stack.queue_at(10 * (i as u64 + 1), &request).await;
            }
            stack.sync.sync(SyncOptions::new()).await.unwrap();
            stack.transport.sent_lines()
        });

        let lines = |reads: bool| {
            methods
                .iter()
                .enumerate()
                .filter(move |(_, m)| is_read_only_method(m) == reads)
                .map(|(i, m)| format!("{m} https://api.test/r/{i}"))
        };
        let expected: Vec<String> = lines(false).chain(lines(true)).collect();
        prop_assert_eq!(sent, expected);
    }

    #[test]
    fn undo_and_redo_are_symmetric(prior in prop::collection::vec(any::<bool>(), 3)) {
        runtime().block_on(async {
            let stack = TestStack::new();
            let items = stack.stores.open_store("items").await.unwrap();
            for (n, exists) in prior.iter().enumerate() {
                if *exists {
                    items
                        .upsert(&(n + 1).to_string(), json!({}), json!({"id": n + 1, "name": "before"}), None)
                        .await
                        .unwrap();
                }
            }

            let cache = stack.cache("api").await;
            let mut request = HttpRequest::new("PUT", "https://api.test/items");
            let _guard = stack.shred_into(&mut request, "items");
            offline_write(&stack, &cache, &request, &json_response(&items_payload(3)))
                .await
                .unwrap();
            let entry = stack.sync.log().get_sync_log().await.unwrap().remove(0);

            entry.undo().await.unwrap();
            for (n, exists) in prior.iter().enumerate() {
                let row = stack.row("items", &(n + 1).to_string()).await;
                assert_eq!(row.is_some(), *exists);
                if let Some(row) = row {
                    assert_eq!(row["name"], "before");
                }
            }

            entry.redo().await.unwrap();
            for n in 1..=3 {
                let row = stack.row("items", &n.to_string()).await.unwrap();
                assert_eq!(row["name"], format!("item-{n}"));
            }
        });
    }
}
