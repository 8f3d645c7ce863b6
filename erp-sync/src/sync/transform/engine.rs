//! Record transformer - maps legacy rows onto canonical product records

use crate::api::RawRecord;
use crate::sync::lookup::{LinkOutcome, ParentIndex};
use crate::sync::resolver::PendingRelationshipResolver;
use crate::sync::types::{LookupFailure, TransformedRecord};

use super::boolean::normalize_bool;
use super::mapping::FieldMap;
use super::price::parse_prices;
use super::sku::decompose_sku;

/// Why a row did not become a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// A required field is absent or blank
    MissingField { field: String },
    /// Several parents match the variant
    AmbiguousParent { record: String, failure: LookupFailure },
}

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformError::MissingField { field } => write!(f, "missing required field '{}'", field),
            TransformError::AmbiguousParent { record, failure } => {
                write!(f, "{}: ambiguous parent, {}", record, failure)
            }
        }
    }
}

impl std::error::Error for TransformError {}

/// What happened to one row
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOutcome {
    /// Parent-less, or linked to a known parent
    Resolved(TransformedRecord),
    /// Handed to the resolver; nothing to load for this pass
    Deferred,
    /// Failed validation; logged and dropped
    Skipped(TransformError),
    /// Integrity error; reported, never retried
    Rejected(TransformError),
}

/// Maps legacy rows using a [`FieldMap`]
#[derive(Debug, Clone, Default)]
pub struct RecordTransformer {
    field_map: FieldMap,
}

impl RecordTransformer {
    pub fn new(field_map: FieldMap) -> Self {
        Self { field_map }
    }

    pub fn field_map(&self) -> &FieldMap {
        &self.field_map
    }

    /// Map a row onto canonical fields without touching parent links
    pub fn map_record(&self, raw: &RawRecord) -> Result<TransformedRecord, TransformError> {
        let map = &self.field_map;

        let sku = raw.text(&map.sku).ok_or_else(|| TransformError::MissingField {
            field: map.sku.clone(),
        })?;
        let name = raw.text(&map.name).ok_or_else(|| TransformError::MissingField {
            field: map.name.clone(),
        })?;

        let (base_sku, variant_code) = decompose_sku(Some(&sku));
        let legacy_id = raw.text(&map.legacy_id);
        let parent_legacy_id = raw
            .text(&map.parent_id)
            .filter(|p| p != "0" && Some(p) != legacy_id.as_ref());

        let label = match &legacy_id {
            Some(id) => format!("{} (#{})", sku, id),
            None => sku.clone(),
        };
        let prices = parse_prices(raw.get(&map.prices), map, &label);

        Ok(TransformedRecord {
            sku,
            base_sku,
            variant_code,
            legacy_id,
            name,
            retail_price: prices.retail_price,
            retail_unit: prices.retail_unit,
            wholesale_price: prices.wholesale_price,
            wholesale_unit: prices.wholesale_unit,
            is_active: normalize_bool(raw.get(&map.active), true),
            is_sellable: normalize_bool(raw.get(&map.sellable), true),
            is_discontinued: normalize_bool(raw.get(&map.discontinued), false),
            created_on: raw.date(&map.created_on),
            modified_on: raw.date(&map.modified_on),
            parent_legacy_id,
            parent_ref: None,
        })
    }

    /// Map a row and try to link it to its parent
    ///
    /// Variants whose parent is not in `index` yet are queued on `resolver`.
    pub fn transform(
        &self,
        raw: &RawRecord,
        index: &ParentIndex,
        resolver: &mut PendingRelationshipResolver,
    ) -> TransformOutcome {
        let mut record = match self.map_record(raw) {
            Ok(record) => record,
            Err(err) => {
                log::warn!("Skipping row: {}", err);
                return TransformOutcome::Skipped(err);
            }
        };

        if record.is_parent() {
            return TransformOutcome::Resolved(record);
        }

        match index.link(&record) {
            LinkOutcome::Linked(parent) => {
                record.parent_ref = Some(parent);
                TransformOutcome::Resolved(record)
            }
            LinkOutcome::Missing(_) => {
                resolver.enqueue(record, raw.clone());
                TransformOutcome::Deferred
            }
            LinkOutcome::Ambiguous(failure) => {
                let err = TransformError::AmbiguousParent {
                    record: record.label(),
                    failure,
                };
                log::warn!("Rejecting row: {}", err);
                TransformOutcome::Rejected(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawRecord {
        RawRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_maps_full_row() {
        let row = raw(json!({
            "ID": 12,
            "ArticleNo": "SHIRT-RED",
            "Description": "Shirt, red",
            "ParentID": "0",
            "Active": "y",
            "Sellable": 0,
            "CreatedOn": "2023-01-15",
            "ModifiedOn": null,
            "Prices": [{"type": "retail", "amount": "99.995", "packaging_unit": "pcs"}]
        }));

        let record = RecordTransformer::default().map_record(&row).unwrap();

        assert_eq!(record.sku, "SHIRT-RED");
        assert_eq!(record.base_sku, "SHIRT");
        assert_eq!(record.variant_code, "RED");
        assert_eq!(record.legacy_id.as_deref(), Some("12"));
        assert_eq!(record.retail_price, Some(Decimal::new(10000, 2)));
        assert!(record.is_active);
        assert!(!record.is_sellable);
        assert!(!record.is_discontinued);
        assert_eq!(record.created_on, NaiveDate::from_ymd_opt(2023, 1, 15));
        assert_eq!(record.modified_on, None);
        assert!(record.is_parent());
    }

    #[test]
    fn test_missing_sku_or_name_is_skipped() {
        let transformer = RecordTransformer::default();
        let mut resolver = PendingRelationshipResolver::new();
        let index = ParentIndex::new();

        let outcome = transformer.transform(&raw(json!({"Description": "x"})), &index, &mut resolver);
        assert_eq!(
            outcome,
            TransformOutcome::Skipped(TransformError::MissingField {
                field: "ArticleNo".to_string()
            })
        );

        let outcome = transformer.transform(
            &raw(json!({"ArticleNo": "A", "Description": "  "})),
            &index,
            &mut resolver,
        );
        assert!(matches!(outcome, TransformOutcome::Skipped(_)));
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_self_reference_means_no_parent() {
        let row = raw(json!({"ID": "5", "ParentID": "5", "ArticleNo": "A", "Description": "A"}));
        let record = RecordTransformer::default().map_record(&row).unwrap();
        assert!(record.is_parent());
    }

    #[test]
    fn test_links_known_parent() {
        let transformer = RecordTransformer::default();
        let mut resolver = PendingRelationshipResolver::new();
        let mut index = ParentIndex::new();

        let parent = raw(json!({"ID": 1, "ArticleNo": "SHIRT", "Description": "Shirt"}));
        match transformer.transform(&parent, &index, &mut resolver) {
            TransformOutcome::Resolved(record) => index.insert(&record),
            other => panic!("expected parent, got {:?}", other),
        }

        let child = raw(json!({"ID": 2, "ParentID": 1, "ArticleNo": "SHIRT-RED", "Description": "Red"}));
        match transformer.transform(&child, &index, &mut resolver) {
            TransformOutcome::Resolved(record) => {
                assert_eq!(record.parent_ref.map(|p| p.sku), Some("SHIRT".to_string()));
            }
            other => panic!("expected link, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_parent_is_deferred() {
        let transformer = RecordTransformer::default();
        let mut resolver = PendingRelationshipResolver::new();
        let index = ParentIndex::new();

        let child = raw(json!({"ID": 2, "ParentID": 1, "ArticleNo": "SHIRT-RED", "Description": "Red"}));
        assert_eq!(
            transformer.transform(&child, &index, &mut resolver),
            TransformOutcome::Deferred
        );
        assert_eq!(resolver.len(), 1);
        assert_eq!(resolver.pending()[0].raw, child);
    }

    #[test]
    fn test_custom_field_map() {
        let map = FieldMap {
            sku: "Artikel".to_string(),
            name: "Bezeichnung".to_string(),
            ..FieldMap::default()
        };
        let row = raw(json!({"Artikel": "X-1", "Bezeichnung": "Ding"}));
        let record = RecordTransformer::new(map).map_record(&row).unwrap();
        assert_eq!(record.name, "Ding");
        assert_eq!(record.variant_code, "1");
    }
}
