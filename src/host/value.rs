use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Handle;

/// A value crossing the boundary in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum HostValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Handle(Handle),
    List(Vec<HostValue>),
}

#[derive(Debug, Error)]
#[error("cannot convert {0} to a string")]
pub struct CoercionError(pub &'static str);

impl HostValue {
    pub fn kind(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Bool(_) => "a boolean",
            HostValue::Number(_) => "a number",
            HostValue::String(_) => "a string",
            HostValue::Handle(_) => "a node handle",
            HostValue::List(_) => "a list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    /// String coercion applied before markup crosses the boundary.
    ///
    /// Follows script semantics for primitives: `null` becomes `"null"`,
    /// integral numbers print without a fraction, magnitudes outside
    /// `[1e-6, 1e21)` use exponent form, and list items are joined with
    /// commas (null items render empty). Handles have no string form.
    pub fn coerce_to_string(&self) -> Result<String, CoercionError> {
        match self {
            HostValue::Null => Ok("null".to_string()),
            HostValue::Bool(value) => Ok(value.to_string()),
            HostValue::Number(value) => Ok(format_number(*value)),
            HostValue::String(value) => Ok(value.clone()),
            HostValue::Handle(_) => Err(CoercionError(self.kind())),
            HostValue::List(items) => {
                let parts = items
                    .iter()
                    .map(|item| match item {
                        HostValue::Null => Ok(String::new()),
                        other => other.coerce_to_string(),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(parts.join(","))
            }
        }
    }
}

fn format_number(value: f64) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        // negative zero prints unsigned
        return "0".to_string();
    }
    let magnitude = value.abs();
    if !(1e-6..1e21).contains(&magnitude) {
        let formatted = format!("{value:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => formatted,
        };
    }
    value.to_string()
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::String(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::String(value)
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Number(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        HostValue::Number(f64::from(value))
    }
}

impl From<Handle> for HostValue {
    fn from(value: Handle) -> Self {
        HostValue::Handle(value)
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(HostValue::Null, Into::into)
    }
}

impl<T: Into<HostValue>> From<Vec<T>> for HostValue {
    fn from(values: Vec<T>) -> Self {
        HostValue::List(values.into_iter().map(Into::into).collect())
    }
}
