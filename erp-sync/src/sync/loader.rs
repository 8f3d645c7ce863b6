//! Storage side of the pipeline
//!
//! The pipeline only needs upsert-by-key from whatever persists products.
//! [`MemoryLoader`] keeps everything in process; it backs the CLI and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::lookup::{LookupOutcome, ParentLookup};
use super::types::ParentRef;

/// Persists transformed records
#[async_trait]
pub trait Loader: Send + Sync {
    type Entity: Send;

    /// Create or update the single entity matching `lookup_keys`
    ///
    /// Returns the stored entity and whether it was created. Applying the
    /// same fields twice must leave storage unchanged.
    async fn upsert(
        &self,
        lookup_keys: &Map<String, Value>,
        fields: &Map<String, Value>,
    ) -> anyhow::Result<(Self::Entity, bool)>;
}

#[derive(Debug, Default)]
struct Entities {
    rows: Vec<Map<String, Value>>,
    by_key: HashMap<String, usize>,
}

/// In-memory loader keyed by canonical lookup key, in insertion order
#[derive(Debug, Default)]
pub struct MemoryLoader {
    entities: Mutex<Entities>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored entity
    pub fn records(&self) -> Vec<Map<String, Value>> {
        match self.entities.lock() {
            Ok(entities) => entities.rows.clone(),
            Err(poisoned) => poisoned.into_inner().rows.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.with_entities(|e| e.rows.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_entities<T>(&self, f: impl FnOnce(&mut Entities) -> T) -> T {
        let mut guard = match self.entities.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    fn find_parents(&self, field: &str, key: &str) -> LookupOutcome {
        let matches: Vec<ParentRef> = self.with_entities(|e| {
            e.rows
                .iter()
                .filter(|row| row.get("parent_legacy_id").is_none_or(Value::is_null))
                .filter(|row| row.get(field).and_then(Value::as_str) == Some(key))
                .map(|row| ParentRef {
                    legacy_id: row.get("legacy_id").and_then(Value::as_str).map(str::to_string),
                    sku: row.get("sku").and_then(Value::as_str).unwrap_or_default().to_string(),
                })
                .collect()
        });

        match matches.as_slice() {
            [] => LookupOutcome::NotFound,
            [only] => LookupOutcome::Found(only.clone()),
            many => LookupOutcome::Ambiguous(many.len()),
        }
    }
}

fn storage_key(lookup_keys: &Map<String, Value>) -> String {
    let mut parts: Vec<String> = lookup_keys
        .iter()
        .map(|(k, v)| match v {
            Value::String(s) => format!("{}={}", k, s),
            other => format!("{}={}", k, other),
        })
        .collect();
    parts.sort();
    parts.join("&")
}

#[async_trait]
impl Loader for MemoryLoader {
    type Entity = Map<String, Value>;

    async fn upsert(
        &self,
        lookup_keys: &Map<String, Value>,
        fields: &Map<String, Value>,
    ) -> anyhow::Result<(Self::Entity, bool)> {
        if lookup_keys.is_empty() {
            anyhow::bail!("upsert needs at least one lookup key");
        }
        let key = storage_key(lookup_keys);

        Ok(self.with_entities(|e| match e.by_key.get(&key) {
            Some(&idx) => {
                let row = &mut e.rows[idx];
                for (field, value) in fields {
                    row.insert(field.clone(), value.clone());
                }
                (row.clone(), false)
            }
            None => {
                let mut row = lookup_keys.clone();
                for (field, value) in fields {
                    row.insert(field.clone(), value.clone());
                }
                e.by_key.insert(key, e.rows.len());
                e.rows.push(row.clone());
                (row, true)
            }
        }))
    }
}

#[async_trait]
impl ParentLookup for MemoryLoader {
    async fn by_legacy_id(&self, legacy_id: &str) -> LookupOutcome {
        self.find_parents("legacy_id", legacy_id)
    }

    async fn by_base_sku(&self, base_sku: &str) -> LookupOutcome {
        self.find_parents("sku", base_sku)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let loader = MemoryLoader::new();
        let keys = object(json!({"legacy_id": "1"}));
        let fields = object(json!({"legacy_id": "1", "sku": "SHIRT", "name": "Shirt"}));

        let (_, created) = loader.upsert(&keys, &fields).await.unwrap();
        assert!(created);
        let (entity, created) = loader.upsert(&keys, &fields).await.unwrap();
        assert!(!created);
        assert_eq!(entity.get("name"), Some(&json!("Shirt")));
        assert_eq!(loader.len(), 1);
    }

    #[tokio::test]
    async fn test_update_overwrites_fields() {
        let loader = MemoryLoader::new();
        let keys = object(json!({"sku": "A"}));
        loader.upsert(&keys, &object(json!({"name": "old"}))).await.unwrap();
        loader.upsert(&keys, &object(json!({"name": "new"}))).await.unwrap();

        let records = loader.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("name"), Some(&json!("new")));
        assert_eq!(records[0].get("sku"), Some(&json!("A")));
    }

    #[tokio::test]
    async fn test_empty_keys_rejected() {
        let loader = MemoryLoader::new();
        assert!(loader.upsert(&Map::new(), &Map::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_parent_lookup_ignores_variants() {
        let loader = MemoryLoader::new();
        loader
            .upsert(
                &object(json!({"legacy_id": "1"})),
                &object(json!({"legacy_id": "1", "sku": "SHIRT", "parent_legacy_id": null})),
            )
            .await
            .unwrap();
        loader
            .upsert(
                &object(json!({"legacy_id": "2"})),
                &object(json!({"legacy_id": "2", "sku": "SHIRT", "parent_legacy_id": "1"})),
            )
            .await
            .unwrap();

        assert_eq!(
            loader.by_base_sku("SHIRT").await,
            LookupOutcome::Found(ParentRef {
                legacy_id: Some("1".to_string()),
                sku: "SHIRT".to_string()
            })
        );
        assert_eq!(loader.by_legacy_id("2").await, LookupOutcome::NotFound);
    }
}
