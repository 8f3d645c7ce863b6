//! Canonical product records

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifies a resolved parent product
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentRef {
    pub legacy_id: Option<String>,
    pub sku: String,
}

impl std::fmt::Display for ParentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.legacy_id {
            Some(id) => write!(f, "{} (#{})", self.sku, id),
            None => write!(f, "{}", self.sku),
        }
    }
}

/// A product row mapped onto canonical fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedRecord {
    pub sku: String,
    pub base_sku: String,
    pub variant_code: String,
    pub legacy_id: Option<String>,
    pub name: String,
    pub retail_price: Option<Decimal>,
    pub retail_unit: Option<String>,
    pub wholesale_price: Option<Decimal>,
    pub wholesale_unit: Option<String>,
    pub is_active: bool,
    pub is_sellable: bool,
    pub is_discontinued: bool,
    pub created_on: Option<NaiveDate>,
    pub modified_on: Option<NaiveDate>,
    /// Parent reference as delivered by the legacy system
    pub parent_legacy_id: Option<String>,
    /// Linked parent, once resolved
    pub parent_ref: Option<ParentRef>,
}

impl TransformedRecord {
    /// Minimal record with defaults for everything but identity
    pub fn new(sku: impl Into<String>, name: impl Into<String>) -> Self {
        let sku = sku.into();
        let (base_sku, variant_code) = crate::sync::transform::decompose_sku(Some(&sku));
        Self {
            sku,
            base_sku,
            variant_code,
            legacy_id: None,
            name: name.into(),
            retail_price: None,
            retail_unit: None,
            wholesale_price: None,
            wholesale_unit: None,
            is_active: true,
            is_sellable: true,
            is_discontinued: false,
            created_on: None,
            modified_on: None,
            parent_legacy_id: None,
            parent_ref: None,
        }
    }

    /// Top-level product: it does not reference a parent
    pub fn is_parent(&self) -> bool {
        self.parent_legacy_id.is_none()
    }

    /// Parent-less, or linked to its parent
    pub fn is_resolved(&self) -> bool {
        self.is_parent() || self.parent_ref.is_some()
    }

    /// This record as a parent reference
    pub fn as_parent_ref(&self) -> ParentRef {
        ParentRef {
            legacy_id: self.legacy_id.clone(),
            sku: self.sku.clone(),
        }
    }

    /// Human-readable identity for logs and reports
    pub fn label(&self) -> String {
        match &self.legacy_id {
            Some(id) => format!("{} (#{})", self.sku, id),
            None => self.sku.clone(),
        }
    }

    /// Keys identifying this record in storage: legacy id, else sku
    pub fn lookup_keys(&self) -> Map<String, Value> {
        let mut keys = Map::new();
        match &self.legacy_id {
            Some(id) => keys.insert("legacy_id".to_string(), Value::String(id.clone())),
            None => keys.insert("sku".to_string(), Value::String(self.sku.clone())),
        };
        keys
    }

    /// All fields as a JSON object for the loader
    pub fn to_fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}
