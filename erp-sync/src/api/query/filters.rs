//! Filter expressions for the legacy `$filter` dialect

use chrono::NaiveDate;
use serde_json::Value;

/// Comparison operators understood by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    /// Prefix match
    Begin,
}

impl Operator {
    /// Parse an operator from its symbol or mnemonic
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "=" | "==" | "eq" => Some(Operator::Eq),
            "!=" | "<>" | "ne" => Some(Operator::Ne),
            ">" | "gt" => Some(Operator::Gt),
            ">=" | "ge" => Some(Operator::Ge),
            "<" | "lt" => Some(Operator::Lt),
            "<=" | "le" => Some(Operator::Le),
            "begin" | "begins" => Some(Operator::Begin),
            _ => None,
        }
    }

    /// Wire representation, including surrounding spaces where required
    pub fn as_wire(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Begin => " begin ",
        }
    }
}

/// A literal on the right-hand side of a filter
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

impl FilterValue {
    /// Render the value as a legacy query literal
    pub fn to_literal(&self) -> String {
        match self {
            FilterValue::String(s) => format!("'{}'", s.replace('\'', "''")),
            FilterValue::Int(i) => i.to_string(),
            FilterValue::Float(f) => f.to_string(),
            FilterValue::Bool(b) => b.to_string(),
            FilterValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            FilterValue::Null => "null".to_string(),
        }
    }

    /// Convert a scalar JSON value; arrays and objects are rejected
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(FilterValue::Null),
            Value::Bool(b) => Some(FilterValue::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(FilterValue::Int)
                .or_else(|| n.as_f64().map(FilterValue::Float)),
            Value::String(s) => Some(FilterValue::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Interpret a free-text CLI value
    ///
    /// Quoted text stays a string; otherwise booleans, integers, floats and
    /// ISO dates are recognized before falling back to a string.
    pub fn infer(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.len() >= 2
            && ((trimmed.starts_with('\'') && trimmed.ends_with('\''))
                || (trimmed.starts_with('"') && trimmed.ends_with('"')))
        {
            return FilterValue::String(trimmed[1..trimmed.len() - 1].to_string());
        }
        match trimmed.to_lowercase().as_str() {
            "true" => return FilterValue::Bool(true),
            "false" => return FilterValue::Bool(false),
            "null" => return FilterValue::Null,
            _ => {}
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return FilterValue::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return FilterValue::Float(f);
        }
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return FilterValue::Date(d);
        }
        FilterValue::String(trimmed.to_string())
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Int(value as i64)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Float(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(value: NaiveDate) -> Self {
        FilterValue::Date(value)
    }
}

/// One `(field, operator, value)` triple
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub operator: Operator,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<FilterValue>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, Operator::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, Operator::Gt, value)
    }

    pub fn ge(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, Operator::Ge, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, Operator::Lt, value)
    }

    pub fn le(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, Operator::Le, value)
    }

    pub fn begins_with(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, Operator::Begin, value)
    }

    /// Unencoded clause, e.g. `Status='active'`
    pub fn to_clause(&self) -> String {
        format!(
            "{}{}{}",
            self.field,
            self.operator.as_wire(),
            self.value.to_literal()
        )
    }
}

/// A filter term as supplied by the caller, possibly malformed
#[derive(Debug, Clone, PartialEq)]
pub enum FilterTerm {
    Valid(Filter),
    Malformed { raw: String, reason: String },
}

/// Ordered list of filter terms
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterExpression {
    terms: Vec<FilterTerm>,
}

impl FilterExpression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a triple (builder style)
    pub fn with(mut self, filter: Filter) -> Self {
        self.terms.push(FilterTerm::Valid(filter));
        self
    }

    pub fn push(&mut self, filter: Filter) {
        self.terms.push(FilterTerm::Valid(filter));
    }

    pub fn push_term(&mut self, term: FilterTerm) {
        self.terms.push(term);
    }

    pub fn terms(&self) -> &[FilterTerm] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Parse a JSON array of `[field, operator, value]` arrays
    ///
    /// Entries with the wrong arity, an empty field or an unknown operator
    /// are kept as malformed terms so the encoder can report them.
    pub fn from_json(value: &Value) -> Self {
        let mut expr = Self::new();
        let Some(items) = value.as_array() else {
            expr.push_term(FilterTerm::Malformed {
                raw: value.to_string(),
                reason: "filter expression must be an array".to_string(),
            });
            return expr;
        };

        for item in items {
            expr.push_term(Self::term_from_json(item));
        }
        expr
    }

    fn term_from_json(item: &Value) -> FilterTerm {
        let malformed = |reason: &str| FilterTerm::Malformed {
            raw: item.to_string(),
            reason: reason.to_string(),
        };

        let Some(parts) = item.as_array() else {
            return malformed("term must be an array");
        };
        if parts.len() != 3 {
            return malformed(&format!("expected 3 elements, got {}", parts.len()));
        }
        let Some(field) = parts[0].as_str().map(str::trim).filter(|f| !f.is_empty()) else {
            return malformed("field must be a non-empty string");
        };
        let Some(operator) = parts[1].as_str().and_then(Operator::parse) else {
            return malformed("unknown operator");
        };
        let Some(value) = FilterValue::from_json(&parts[2]) else {
            return malformed("value must be a scalar");
        };

        FilterTerm::Valid(Filter::new(field, operator, value))
    }

    /// Parse CLI strings of the form `field op value`
    pub fn from_cli(args: &[String]) -> Self {
        let mut expr = Self::new();
        for arg in args {
            expr.push_term(Self::term_from_cli(arg));
        }
        expr
    }

    fn term_from_cli(arg: &str) -> FilterTerm {
        let malformed = || FilterTerm::Malformed {
            raw: arg.to_string(),
            reason: "expected 'field operator value'".to_string(),
        };
        let Some((field, rest)) = arg.trim().split_once(char::is_whitespace) else {
            return malformed();
        };
        let Some((op, value)) = rest.trim_start().split_once(char::is_whitespace) else {
            return malformed();
        };
        let value = value.trim();
        if value.is_empty() {
            return malformed();
        }
        match Operator::parse(op) {
            Some(operator) => FilterTerm::Valid(Filter::new(field, operator, FilterValue::infer(value))),
            None => FilterTerm::Malformed {
                raw: arg.to_string(),
                reason: format!("unknown operator '{}'", op),
            },
        }
    }
}

impl FromIterator<Filter> for FilterExpression {
    fn from_iter<T: IntoIterator<Item = Filter>>(iter: T) -> Self {
        Self {
            terms: iter.into_iter().map(FilterTerm::Valid).collect(),
        }
    }
}
