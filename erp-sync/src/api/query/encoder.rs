//! `$filter` encoding
//!
//! Triples on the same field are OR-ed together, groups for different fields
//! are AND-ed. The rendered expression is percent-encoded here, escaping
//! every reserved character, and must be appended to the URL verbatim: the
//! HTTP library's own query encoder mangles the legacy operator syntax.

use super::filters::{Filter, FilterExpression, FilterTerm};
use crate::api::error::ApiError;

/// Turns filter expressions into `$filter` parameter values
#[derive(Debug, Clone, Copy)]
pub struct FilterEncoder {
    /// Fail instead of issuing an unfiltered request when no term is usable
    pub fail_on_filter_error: bool,
}

impl Default for FilterEncoder {
    fn default() -> Self {
        Self {
            fail_on_filter_error: true,
        }
    }
}

impl FilterEncoder {
    pub fn new(fail_on_filter_error: bool) -> Self {
        Self {
            fail_on_filter_error,
        }
    }

    /// Render the expression without percent-encoding
    ///
    /// Returns `Ok(None)` when there is nothing to filter on.
    pub fn render(&self, expr: &FilterExpression) -> Result<Option<String>, ApiError> {
        if expr.is_empty() {
            return Ok(None);
        }

        let mut valid: Vec<&Filter> = Vec::new();
        for term in expr.terms() {
            match term {
                FilterTerm::Valid(filter) => valid.push(filter),
                FilterTerm::Malformed { raw, reason } => {
                    log::warn!("Skipping malformed filter term {}: {}", raw, reason);
                }
            }
        }

        if valid.is_empty() {
            if self.fail_on_filter_error {
                return Err(ApiError::Filter(format!(
                    "all {} filter terms are malformed",
                    expr.terms().len()
                )));
            }
            log::warn!("All filter terms are malformed, requesting unfiltered data");
            return Ok(None);
        }

        Ok(Some(group_clauses(&valid)))
    }

    /// Render and percent-encode the expression
    pub fn encode(&self, expr: &FilterExpression) -> Result<Option<String>, ApiError> {
        Ok(self
            .render(expr)?
            .map(|rendered| urlencoding::encode(&rendered).into_owned()))
    }
}

/// Partition by field (first appearance order) and join
fn group_clauses(filters: &[&Filter]) -> String {
    let mut groups: Vec<(&str, Vec<String>)> = Vec::new();
    for filter in filters {
        match groups.iter_mut().find(|(field, _)| *field == filter.field) {
            Some((_, clauses)) => clauses.push(filter.to_clause()),
            None => groups.push((filter.field.as_str(), vec![filter.to_clause()])),
        }
    }

    groups
        .into_iter()
        .map(|(_, clauses)| {
            if clauses.len() == 1 {
                clauses.into_iter().next().unwrap_or_default()
            } else {
                format!("({})", clauses.join(" OR "))
            }
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(expr: &FilterExpression) -> String {
        FilterEncoder::default().render(expr).unwrap().unwrap()
    }

    #[test]
    fn test_same_field_joined_with_or() {
        let expr: FilterExpression = vec![
            Filter::eq("Status", "active"),
            Filter::eq("Status", "pending"),
            Filter::eq("Status", "new"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            render(&expr),
            "(Status='active' OR Status='pending' OR Status='new')"
        );
    }

    #[test]
    fn test_different_fields_joined_with_and() {
        let expr = FilterExpression::new()
            .with(Filter::eq("Status", "active"))
            .with(Filter::gt("Stock", 0))
            .with(Filter::eq("Web", true));

        assert_eq!(render(&expr), "Status='active' AND Stock>0 AND Web=true");
    }

    #[test]
    fn test_mixed_fields_partition_before_grouping() {
        let expr = FilterExpression::new()
            .with(Filter::eq("Group", "A"))
            .with(Filter::gt("Stock", 5))
            .with(Filter::eq("Group", "B"))
            .with(Filter::lt("Stock", 50));

        assert_eq!(
            render(&expr),
            "(Group='A' OR Group='B') AND (Stock>5 OR Stock<50)"
        );
    }

    #[test]
    fn test_encode_escapes_everything() {
        let expr = FilterExpression::new()
            .with(Filter::eq("Name", "A&B/C"))
            .with(Filter::ge("Price", 10));

        let encoded = FilterEncoder::default().encode(&expr).unwrap().unwrap();
        assert_eq!(
            encoded,
            "Name%3D%27A%26B%2FC%27%20AND%20Price%3E%3D10"
        );
        assert!(!encoded.contains(['=', '&', '/', '\'', ' ', '>']));
    }

    #[test]
    fn test_empty_expression_means_no_filter() {
        assert_eq!(FilterEncoder::default().encode(&FilterExpression::new()).unwrap(), None);
    }

    #[test]
    fn test_malformed_terms_are_skipped() {
        let expr = FilterExpression::from_json(&json!([
            ["Status", "=", "active"],
            ["Stock", ">"]
        ]));
        assert_eq!(render(&expr), "Status='active'");
    }

    #[test]
    fn test_all_malformed_fails_loudly() {
        let expr = FilterExpression::from_json(&json!([["Stock", ">"], ["", "=", 1]]));
        let err = FilterEncoder::new(true).encode(&expr).unwrap_err();
        assert!(matches!(err, ApiError::Filter(_)));
    }

    #[test]
    fn test_all_malformed_lenient_is_unfiltered() {
        let expr = FilterExpression::from_json(&json!([["Stock", ">"]]));
        assert_eq!(FilterEncoder::new(false).encode(&expr).unwrap(), None);
    }
}
