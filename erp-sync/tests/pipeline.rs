mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use common::{Gateway, PASSWORD, USERNAME};
use erp_sync::api::{ClientOptions, Credentials, FetchOptions, LegacyClient, MemorySessionStore};
use erp_sync::sync::{
    LookupStrategy, MemoryLoader, RecordTransformer, SyncOptions, SyncRun, UnresolvedReason,
};

fn catalog() -> Vec<Value> {
    vec![
        json!({"ID": 2, "ParentID": 1, "ArticleNo": "SHIRT-RED", "Description": "Shirt red",
               "Prices": [{"type": "retail", "amount": "19.995", "packaging_unit": "pcs"}]}),
        json!({"ID": 1, "ParentID": 0, "ArticleNo": "SHIRT", "Description": "Shirt",
               "CreatedOn": "15!1!2023", "Active": "no"}),
        json!({"ID": 3, "ParentID": 1, "ArticleNo": "SHIRT-BLUE", "Description": "Shirt blue"}),
        json!({"ID": 4, "ParentID": 99, "ArticleNo": "HAT-RED", "Description": "Hat red"}),
        json!({"ID": 5, "Description": "Row without article number"}),
        json!({"ID": 6, "ArticleNo": "CAP", "Description": "Cap"}),
        json!({"ID": 7, "ArticleNo": "CAP", "Description": "Cap (duplicate)"}),
        json!({"ID": 8, "ParentID": 50, "ArticleNo": "CAP-X", "Description": "Cap X"}),
    ]
}

fn options() -> SyncOptions {
    SyncOptions {
        fetch: FetchOptions::default().page_size(3),
        max_attempts: 3,
        backoff: Duration::ZERO,
    }
}

async fn client(gateway: Arc<Gateway>) -> LegacyClient {
    let base_url = common::spawn(gateway).await;
    LegacyClient::new(
        &base_url,
        Some(Credentials::new(USERNAME, PASSWORD)),
        Arc::new(MemorySessionStore::new()),
        ClientOptions::default(),
    )
    .unwrap()
}

fn by_sku<'a>(records: &'a [serde_json::Map<String, Value>], sku: &str) -> &'a serde_json::Map<String, Value> {
    records
        .iter()
        .find(|r| r.get("sku") == Some(&json!(sku)))
        .unwrap_or_else(|| panic!("{} not loaded", sku))
}

#[tokio::test]
async fn test_full_sync_run() {
    let gateway = Gateway::new(catalog());
    let client = client(gateway.clone()).await;
    let transformer = RecordTransformer::default();
    let loader = MemoryLoader::new();

    let report = SyncRun::new(&client, &transformer, &loader)
        .options(options())
        .run("Products")
        .await
        .unwrap();

    assert_eq!(report.table, "Products");
    assert_eq!(report.fetched, 8);
    assert_eq!(report.resolved_parents, 3);
    assert_eq!(report.resolved_variants, 2);
    assert_eq!(report.created, 5);
    assert_eq!(report.updated, 0);
    assert!(!report.is_clean());

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].position, Some(4));
    assert_eq!(report.skipped[0].identity.as_deref(), Some("5"));

    assert_eq!(report.rejected.len(), 1);
    assert!(report.rejected[0].reason.contains("ambiguous parent"));

    assert_eq!(report.unresolved.len(), 1);
    let orphan = &report.unresolved[0];
    assert_eq!(orphan.variant.transformed.sku, "HAT-RED");
    assert_eq!(orphan.variant.attempts, 3);
    assert_eq!(orphan.reason, UnresolvedReason::RetriesExhausted);
    assert_eq!(orphan.failures[0].strategy, LookupStrategy::ParentId);
    assert_eq!(orphan.failures[1].strategy, LookupStrategy::BaseSku);

    // 8 rows in pages of 3
    assert_eq!(gateway.table_requests().len(), 3);

    let records = loader.records();
    assert_eq!(records.len(), 5);

    let parent = by_sku(&records, "SHIRT");
    assert_eq!(parent.get("is_active"), Some(&json!(false)));
    assert_eq!(parent.get("created_on"), Some(&json!("2023-01-15")));

    let red = by_sku(&records, "SHIRT-RED");
    assert_eq!(red.get("base_sku"), Some(&json!("SHIRT")));
    assert_eq!(red.get("variant_code"), Some(&json!("RED")));
    assert_eq!(red.get("retail_price"), Some(&json!("20.00")));
    assert_eq!(red.get("parent_ref"), Some(&json!({"legacy_id": "1", "sku": "SHIRT"})));

    let blue = by_sku(&records, "SHIRT-BLUE");
    assert_eq!(blue.get("parent_ref"), Some(&json!({"legacy_id": "1", "sku": "SHIRT"})));
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let gateway = Gateway::new(catalog());
    let client = client(gateway.clone()).await;
    let transformer = RecordTransformer::default();
    let loader = MemoryLoader::new();
    let run = SyncRun::new(&client, &transformer, &loader).options(options());

    let first = run.run("Products").await.unwrap();
    let snapshot = loader.records();
    let second = run.run("Products").await.unwrap();

    assert_eq!(first.created, 5);
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 5);
    assert_eq!(loader.records(), snapshot);
    assert_eq!(gateway.logins(), 1);
}

#[tokio::test]
async fn test_clean_run() {
    let gateway = Gateway::new(vec![
        json!({"ID": 1, "ArticleNo": "MUG", "Description": "Mug"}),
        json!({"ID": 2, "ParentID": 1, "ArticleNo": "MUG-L", "Description": "Mug large"}),
    ]);
    let client = client(gateway).await;
    let transformer = RecordTransformer::default();
    let loader = MemoryLoader::new();

    let report = SyncRun::new(&client, &transformer, &loader)
        .options(options())
        .run("Products")
        .await
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.loaded(), 2);
}

#[tokio::test]
async fn test_failed_page_aborts_run() {
    let gateway = Gateway::new(catalog());
    *gateway.table_status.lock().unwrap() = Some(axum::http::StatusCode::SERVICE_UNAVAILABLE);
    let client = client(gateway).await;
    let transformer = RecordTransformer::default();
    let loader = MemoryLoader::new();

    let result = SyncRun::new(&client, &transformer, &loader)
        .options(options())
        .run("Products")
        .await;

    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains("server unavailable"), "{:#}", err);
    assert!(loader.is_empty());
}
