//! Legacy field names for product rows

use serde::{Deserialize, Serialize};

/// Where each canonical field comes from in a legacy row
///
/// Defaults match the stock product table; any entry can be overridden in
/// the `[mapping]` section of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    pub sku: String,
    pub name: String,
    pub legacy_id: String,
    pub parent_id: String,
    pub prices: String,
    pub price_type: String,
    pub price_amount: String,
    pub price_unit: String,
    pub retail_type: String,
    pub wholesale_type: String,
    pub active: String,
    pub sellable: String,
    pub discontinued: String,
    pub created_on: String,
    pub modified_on: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            sku: "ArticleNo".to_string(),
            name: "Description".to_string(),
            legacy_id: "ID".to_string(),
            parent_id: "ParentID".to_string(),
            prices: "Prices".to_string(),
            price_type: "type".to_string(),
            price_amount: "amount".to_string(),
            price_unit: "packaging_unit".to_string(),
            retail_type: "retail".to_string(),
            wholesale_type: "wholesale".to_string(),
            active: "Active".to_string(),
            sellable: "Sellable".to_string(),
            discontinued: "Discontinued".to_string(),
            created_on: "CreatedOn".to_string(),
            modified_on: "ModifiedOn".to_string(),
        }
    }
}
