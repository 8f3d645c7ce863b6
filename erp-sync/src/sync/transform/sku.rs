//! Composite SKU handling

/// Split a composite SKU on its last hyphen into `(base_sku, variant_code)`
///
/// Without a hyphen the whole SKU is the base; `None` yields two empty
/// strings.
pub fn decompose_sku(sku: Option<&str>) -> (String, String) {
    let Some(sku) = sku.map(str::trim) else {
        return (String::new(), String::new());
    };

    match sku.rsplit_once('-') {
        Some((base, variant)) => (base.to_string(), variant.to_string()),
        None => (sku.to_string(), String::new()),
    }
}
