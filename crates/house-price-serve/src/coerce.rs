use crate::schema::{FieldKind, HouseFeatures};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// A user-supplied value that failed to parse. Recoverable: the caller
/// reports it and asks again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("Invalid value for {field}")]
    InvalidValue { field: String },

    #[error("Unknown field {field}")]
    UnknownField { field: String },
}

impl CoercionError {
    pub fn field(&self) -> &str {
        match self {
            CoercionError::InvalidValue { field } | CoercionError::UnknownField { field } => field,
        }
    }

    fn invalid(field: &str) -> Self {
        CoercionError::InvalidValue {
            field: field.to_string(),
        }
    }
}

/// A parsed feature value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FeatureValue {
    /// Numeric view; text is parsed if it looks like a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Integer(i) => Some(*i as f64),
            FeatureValue::Float(f) => Some(*f),
            FeatureValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    /// Text view, as a category label.
    pub fn to_text(&self) -> String {
        match self {
            FeatureValue::Integer(i) => i.to_string(),
            FeatureValue::Float(f) => f.to_string(),
            FeatureValue::Text(s) => s.clone(),
        }
    }
}

/// Parse `raw` according to the kind of `field`.
pub fn coerce(field: &str, raw: &str) -> Result<FeatureValue, CoercionError> {
    let spec = HouseFeatures::field(field).ok_or_else(|| CoercionError::UnknownField {
        field: field.to_string(),
    })?;
    let trimmed = raw.trim();
    match spec.kind {
        FieldKind::Integer => parse_integer(trimmed)
            .map(FeatureValue::Integer)
            .ok_or_else(|| CoercionError::invalid(field)),
        FieldKind::Float => trimmed
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(FeatureValue::Float)
            .ok_or_else(|| CoercionError::invalid(field)),
        FieldKind::Text => Ok(FeatureValue::Text(raw.to_string())),
    }
}

/// Plain integers, plus floats with no fractional part ("2.0").
fn parse_integer(s: &str) -> Option<i64> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(i);
    }
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Field name to parsed value for one house.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureRecord {
    values: BTreeMap<String, FeatureValue>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coerce and store `raw`, replacing an earlier value for the same field.
    pub fn set(&mut self, field: &str, raw: &str) -> Result<(), CoercionError> {
        let value = coerce(field, raw)?;
        self.values.insert(field.to_string(), value);
        Ok(())
    }

    pub fn get(&self, field: &str) -> Option<&FeatureValue> {
        self.values.get(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build a record from a JSON object. `null` means absent; strings and
    /// numbers are coerced like form input; anything else is invalid.
    pub fn from_json(object: &serde_json::Map<String, Value>) -> Result<Self, CoercionError> {
        let mut record = FeatureRecord::new();
        for (field, value) in object {
            match value {
                Value::Null => {
                    if HouseFeatures::field(field).is_none() {
                        return Err(CoercionError::UnknownField { field: field.clone() });
                    }
                }
                Value::String(s) => record.set(field, s)?,
                Value::Number(n) => record.set(field, &n.to_string())?,
                Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
                    if HouseFeatures::field(field).is_none() {
                        return Err(CoercionError::UnknownField { field: field.clone() });
                    }
                    return Err(CoercionError::invalid(field));
                }
            }
        }
        Ok(record)
    }
}
