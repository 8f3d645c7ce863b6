//! Price list parsing with fixed-point rounding

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

use super::mapping::FieldMap;

/// Parse a legacy amount and round it to two places, half-up
///
/// Accepts JSON numbers and numeric strings (comma decimal separators
/// included). Anything else is `None`; never zero.
pub fn parse_price(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }

    let normalized = if text.contains(',') && !text.contains('.') {
        text.replace(',', ".")
    } else {
        text
    };

    let amount = Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()?;
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    Some(rounded)
}

/// Retail and wholesale price fields extracted from a price list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prices {
    pub retail_price: Option<Decimal>,
    pub retail_unit: Option<String>,
    pub wholesale_price: Option<Decimal>,
    pub wholesale_unit: Option<String>,
}

/// Parse a `[{type, amount, packaging_unit}, ...]` price list
///
/// The list may also arrive JSON-encoded in a string. The first usable entry
/// of each type wins. Entries with malformed amounts are logged and leave
/// their fields unset.
pub fn parse_prices(value: Option<&Value>, map: &FieldMap, record_label: &str) -> Prices {
    let mut prices = Prices::default();

    let entries = match value {
        Some(Value::Array(entries)) => entries.clone(),
        Some(Value::String(s)) if !s.trim().is_empty() => {
            match serde_json::from_str::<Value>(s) {
                Ok(Value::Array(entries)) => entries,
                _ => {
                    log::warn!("{}: price list is not a list: {:?}", record_label, s);
                    return prices;
                }
            }
        }
        Some(Value::Object(_)) => vec![value.cloned().unwrap_or(Value::Null)],
        _ => return prices,
    };

    for entry in &entries {
        let Some(kind) = entry.get(&map.price_type).and_then(|t| t.as_str()) else {
            log::debug!("{}: price entry without type: {}", record_label, entry);
            continue;
        };
        let kind = kind.trim();
        let is_retail = kind.eq_ignore_ascii_case(&map.retail_type);
        let is_wholesale = kind.eq_ignore_ascii_case(&map.wholesale_type);
        if !is_retail && !is_wholesale {
            continue;
        }

        let raw_amount = entry.get(&map.price_amount).unwrap_or(&Value::Null);
        let Some(amount) = parse_price(raw_amount) else {
            log::warn!(
                "{}: malformed {} price amount {}, leaving it unset",
                record_label,
                kind,
                raw_amount
            );
            continue;
        };
        let unit = entry
            .get(&map.price_unit)
            .and_then(|u| match u {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|u| !u.is_empty());

        if is_retail && prices.retail_price.is_none() {
            prices.retail_price = Some(amount);
            prices.retail_unit = unit;
        } else if is_wholesale && prices.wholesale_price.is_none() {
            prices.wholesale_price = Some(amount);
            prices.wholesale_unit = unit;
        }
    }

    prices
}
