use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ReconError;

type JsonMap = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A single scalar cell value.
///
/// Records from the service are flat JSON objects. Nested arrays or objects
/// are not expected, and are carried as their compact JSON text if they show up.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Declared kind of a column, used to pick a comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Bool,
    Number,
    Text,
}

impl Value {
    /// Kind of a present value; `None` for `Null`.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueKind::Bool),
            Self::Number(_) => Some(ValueKind::Number),
            Self::Text(_) => Some(ValueKind::Text),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text form used by search and CSV export. `Null` has none.
    ///
    /// Integral numbers print without a fractional part (`100`, not `100.0`).
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number).unwrap_or(Self::Null),
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => {
                // Keep integers integral on the way back out (max safe integer in f64).
                if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
                    serde_json::Value::from(n as i64)
                } else {
                    serde_json::Number::from_f64(n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Value::Text(s) => serde_json::Value::String(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One transaction row: column name → scalar value, in source key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "JsonMap", into = "JsonMap")]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a field. New keys go to the end.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Literal boolean field. Anything else (missing, null, "false") is `None`.
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Literal string field.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

impl From<JsonMap> for Record {
    fn from(map: JsonMap) -> Self {
        Self {
            fields: map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
        }
    }
}

impl From<Record> for JsonMap {
    fn from(record: Record) -> Self {
        record
            .fields
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::from(v)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Matched,
    InternalOnly,
    ProviderOnly,
}

impl Category {
    /// Display order used everywhere: matched, internal-only, provider-only.
    pub const ALL: [Category; 3] = [Self::Matched, Self::InternalOnly, Self::ProviderOnly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::InternalOnly => "internal_only",
            Self::ProviderOnly => "provider_only",
        }
    }

    pub fn default_title(&self) -> &'static str {
        match self {
            Self::Matched => "Matched Transactions",
            Self::InternalOnly => "Internal Only Transactions",
            Self::ProviderOnly => "Provider Only Transactions",
        }
    }

    pub fn default_accent(&self) -> Accent {
        match self {
            Self::Matched => Accent::Green,
            Self::InternalOnly => Accent::Yellow,
            Self::ProviderOnly => Accent::Red,
        }
    }

    /// `<category>_transactions.csv`
    pub fn export_file_name(&self) -> String {
        format!("{}_transactions.csv", self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "matched" => Ok(Self::Matched),
            "internal_only" => Ok(Self::InternalOnly),
            "provider_only" => Ok(Self::ProviderOnly),
            other => Err(ReconError::UnknownCategory(other.to_string())),
        }
    }
}

/// Highlight color attached to a table instance (title accent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accent {
    Green,
    Yellow,
    Red,
}

impl Accent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }
}

impl FromStr for Accent {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "green" => Ok(Self::Green),
            "yellow" => Ok(Self::Yellow),
            "red" => Ok(Self::Red),
            _ => Err(ReconError::UnknownAccent(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Summary + payload
// ---------------------------------------------------------------------------

/// Category counts and quality counters reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub matched: u64,
    pub internal_only: u64,
    pub provider_only: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub anomalies: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub high_risk: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub amount_mismatches: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub status_mismatches: u64,
}

impl Summary {
    pub fn count(&self, category: Category) -> u64 {
        match category {
            Category::Matched => self.matched,
            Category::InternalOnly => self.internal_only,
            Category::ProviderOnly => self.provider_only,
        }
    }

    /// Sum of the three category counts, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.matched
            .saturating_add(self.internal_only)
            .saturating_add(self.provider_only)
    }
}

fn zero_if_null<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

/// Standardized field name → original source column, per side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMappings {
    #[serde(default)]
    pub internal: BTreeMap<String, String>,
    #[serde(default)]
    pub provider: BTreeMap<String, String>,
}

/// Response of the reconciliation service, consumed as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconPayload {
    #[serde(default)]
    pub matched: Vec<Record>,
    #[serde(default)]
    pub internal_only: Vec<Record>,
    #[serde(default)]
    pub provider_only: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_mappings: Option<ColumnMappings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ReconPayload {
    pub fn from_json(json: &str) -> Result<Self, ReconError> {
        serde_json::from_str(json).map_err(|e| ReconError::PayloadParse(e.to_string()))
    }

    pub fn records(&self, category: Category) -> &[Record] {
        match category {
            Category::Matched => &self.matched,
            Category::InternalOnly => &self.internal_only,
            Category::ProviderOnly => &self.provider_only,
        }
    }

    /// Session id, treating the empty string as absent.
    pub fn session(&self) -> Option<&str> {
        self.session_id.as_deref().filter(|s| !s.is_empty())
    }
}
