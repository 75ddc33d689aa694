//! Backend parity tests against DynamoDB Local started through testcontainers.
//!
//! Run (requires Docker):
//!   cargo test -p saasconsole-db --test dynamo_local -- --ignored --nocapture

#![cfg(feature = "store-dynamodb")]

use saasconsole_db::store::{
    FilterOp, IndexName, Item, ItemKey, ItemStore, Query, SortCondition, UpdateRequest,
    WriteRequest,
};
use saasconsole_db::{DynamoStore, DynamoStoreConfig, MemoryStore, StoreError};
use serde_json::json;
use testcontainers::core::IntoContainerPort;
use testcontainers::{runners::AsyncRunner, GenericImage};

const DYNAMODB_LOCAL_PORT: u16 = 8000;
const REGION: &str = "us-east-1";

fn row(value: serde_json::Value) -> Item {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {}", other),
    }
}

fn log_row(company: &str, id: u32, action: &str) -> Item {
    row(json!({
        "PK": format!("LOG#{:04}", id),
        "SK": format!("COMPANY#{}", company),
        "Type": "LOG",
        "CompanyID": company,
        "CreatedAt": format!("2024-01-01T00:00:{:02}.000Z", id),
        "LogAction": action,
    }))
}

async fn seed(store: &dyn ItemStore) {
    let writes = (0..30)
        .map(|i| {
            let action = if i % 3 == 0 { "ADD_ROLE" } else { "UPDATE_COMPANY" };
            WriteRequest::Put(log_row("c1", i, action))
        })
        .collect();
    store.batch_write(writes).await.unwrap();
    store
        .put(row(json!({
            "PK": "COMPANY#c1",
            "SK": "USER#u1",
            "Type": "COMPANYMEMBER",
            "GSI_SK": "USER#ada lovelace",
            "Status": "ACTIVE",
            "Tags": ["a", "b"],
            "Count": 3,
        })))
        .await
        .unwrap();
}

/// Walk every page of `query` and return the `PK`s seen.
async fn collect_pks(store: &dyn ItemStore, query: Query, page_size: usize) -> Vec<String> {
    let mut pks = Vec::new();
    let mut start = None;
    loop {
        let page = store
            .query(query.clone().limit(page_size).start_after(start))
            .await
            .unwrap();
        pks.extend(page.items.iter().map(|i| i["PK"].as_str().unwrap().to_string()));
        match page.last_evaluated_key {
            Some(key) => start = Some(key),
            None => break,
        }
    }
    pks
}

async fn exercise(store: &dyn ItemStore) -> Vec<Vec<String>> {
    seed(store).await;
    let logs = Query::index(IndexName::GetLogs, "c1")
        .filter("Type", FilterOp::Eq(json!("LOG")))
        .descending();
    let added = logs
        .clone()
        .filter("LogAction", FilterOp::Eq(json!("ADD_ROLE")));
    let early = Query::index(IndexName::GetLogs, "c1")
        .sort(SortCondition::LessOrEqual("2024-01-01T00:00:04.000Z".into()));

    vec![
        collect_pks(store, logs, 7).await,
        collect_pks(store, added, 4).await,
        collect_pks(store, early, 2).await,
    ]
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn dynamo_local_matches_memory_store() {
    let image = GenericImage::new("amazon/dynamodb-local", "latest")
        .with_exposed_port(DYNAMODB_LOCAL_PORT.tcp());
    let container = image
        .start()
        .await
        .expect("Failed to start DynamoDB Local; is Docker running?");
    let port = container
        .get_host_port_ipv4(DYNAMODB_LOCAL_PORT)
        .await
        .expect("DynamoDB Local port mapped");

    std::env::set_var("AWS_ACCESS_KEY_ID", "test");
    std::env::set_var("AWS_SECRET_ACCESS_KEY", "test");
    std::env::set_var("AWS_EC2_METADATA_DISABLED", "true");
    let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(REGION))
        .load()
        .await;

    let dynamo = DynamoStore::new(
        &sdk_config,
        DynamoStoreConfig {
            table_name: "saasconsole-test".into(),
            region: Some(REGION.into()),
            endpoint: Some(format!("http://127.0.0.1:{}", port)),
            timeout_ms: Some(5_000),
        },
    );
    let mut ready = false;
    for _ in 0..40 {
        if dynamo.ensure_table().await.is_ok() {
            ready = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    }
    assert!(ready, "DynamoDB Local did not become ready in time");

    let memory = MemoryStore::new();
    assert_eq!(exercise(&dynamo).await, exercise(&memory).await);

    // Lists and numbers survive the attribute conversion
    let member = ItemKey::new("COMPANY#c1", "USER#u1");
    let stored = dynamo.get(&member).await.unwrap().unwrap();
    assert_eq!(stored["Tags"], json!(["a", "b"]));
    assert_eq!(stored["Count"], json!(3));

    // Conditional writes and updates behave alike
    let duplicate = log_row("c1", 0, "ADD_ROLE");
    assert!(matches!(
        dynamo.put_if_absent(duplicate).await,
        Err(StoreError::ConditionFailed(_))
    ));
    let missing = ItemKey::new("COMPANY#c1", "USER#nobody");
    assert!(dynamo
        .update(&missing, UpdateRequest::new().set("Status", "DELETED"))
        .await
        .unwrap()
        .is_none());
    let updated = dynamo
        .update(
            &member,
            UpdateRequest::new().set("Status", "DELETED").remove("Count"),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated["Status"], json!("DELETED"));
    assert!(!updated.contains_key("Count"));
}
