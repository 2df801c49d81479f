use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::ops::{Add, AddAssign};

/// Identifier of an advertising platform as enumerated by the upstream API
/// (e.g. `meta`, `ga4`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformId(String);

impl PlatformId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PlatformId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlatformId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PlatformId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<str> for PlatformId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Platform descriptor from `/platforms`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Platform {
    pub id: PlatformId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Opaque account identifier. Upstream sends either a string or a number;
/// both are kept as their textual form since the id is only ever echoed
/// back in query strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAccountId {
    Text(String),
    Number(Number),
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawAccountId::deserialize(deserializer)? {
            RawAccountId::Text(text) => Self(text),
            RawAccountId::Number(number) => Self(number.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    #[serde(default)]
    pub name: String,
}

/// Ordered list of metric names valid for one platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldSet(Vec<String>);

impl FieldSet {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl FromIterator<String> for FieldSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for FieldSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(str::to_string).collect())
    }
}

/// One reporting record for one account, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Insight(Map<String, Value>);

impl Insight {
    pub fn new(values: Map<String, Value>) -> Self {
        Self(values)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Numeric value of `field`, or `None` when missing or not a number.
    pub fn metric(&self, field: &str) -> Option<Metric> {
        self.0.get(field).and_then(Metric::from_json)
    }
}

/// A summed metric value. Integers stay integers until a float (or an
/// overflow) joins the sum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Int(i64),
    Float(f64),
}

impl Metric {
    pub const ZERO: Metric = Metric::Int(0);

    /// Only JSON numbers count; strings, bools and nulls are not metrics.
    pub fn from_json(value: &Value) -> Option<Metric> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Metric::Int)
                .or_else(|| n.as_f64().map(Metric::Float)),
            _ => None,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Metric::Int(v) => v as f64,
            Metric::Float(v) => v,
        }
    }
}

impl Default for Metric {
    fn default() -> Self {
        Metric::ZERO
    }
}

impl Add for Metric {
    type Output = Metric;

    fn add(self, rhs: Metric) -> Metric {
        match (self, rhs) {
            (Metric::Int(a), Metric::Int(b)) => a
                .checked_add(b)
                .map(Metric::Int)
                .unwrap_or(Metric::Float(a as f64 + b as f64)),
            (a, b) => Metric::Float(a.as_f64() + b.as_f64()),
        }
    }
}

impl AddAssign for Metric {
    fn add_assign(&mut self, rhs: Metric) {
        *self = *self + rhs;
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Int(v) => write!(f, "{v}"),
            // Integral floats keep a trailing `.0` so they read as floats.
            Metric::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            Metric::Float(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Int(v) => serializer.serialize_i64(*v),
            Metric::Float(v) => serializer.serialize_f64(*v),
        }
    }
}
