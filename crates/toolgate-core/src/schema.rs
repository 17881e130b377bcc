//! Tool parameter declarations and argument binding
//!
//! Tools declare an ordered list of [`ParamSpec`]s. Before a tool runs, the
//! caller's argument map is bound against those declarations: undeclared
//! names, missing required values and values of the wrong kind are a
//! mismatch, defaults fill the gaps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::ToolError;

/// Semantic type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Float,
    Boolean,
    Object,
}

impl ParamKind {
    /// JSON Schema type name
    pub fn json_type(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Float => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Object => "object",
        }
    }

    /// Coerce a value to this kind. Strings holding numbers or booleans are
    /// accepted so query-string arguments bind like JSON ones.
    fn coerce(&self, value: Value) -> Option<Value> {
        match (self, value) {
            (ParamKind::String, Value::String(s)) => Some(Value::String(s)),
            (ParamKind::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (ParamKind::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

            (ParamKind::Integer, Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::from(i))
                } else {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| Value::from(f as i64))
                }
            }
            (ParamKind::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),

            (ParamKind::Float, Value::Number(n)) => {
                n.as_f64().and_then(Number::from_f64).map(Value::Number)
            }
            (ParamKind::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),

            (ParamKind::Boolean, Value::Bool(b)) => Some(Value::Bool(b)),
            (ParamKind::Boolean, Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => Some(Value::Bool(true)),
                "false" | "0" | "no" => Some(Value::Bool(false)),
                _ => None,
            },

            (ParamKind::Object, Value::Object(o)) => Some(Value::Object(o)),

            _ => None,
        }
    }
}

/// One declared tool parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl ParamSpec {
    /// A parameter the caller must supply
    pub fn required(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default: None,
            description: description.to_string(),
        }
    }

    /// A parameter that falls back to `default` when omitted
    pub fn optional(
        name: &str,
        kind: ParamKind,
        default: impl Into<Value>,
        description: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default: Some(default.into()),
            description: description.to_string(),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Arguments bound against a tool's declared parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.as_str())
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(|v| v.as_i64())
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(|v| v.as_f64())
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(|v| v.as_bool())
    }

    /// Fetch a string argument or report an argument mismatch
    pub fn require_str(&self, name: &str) -> Result<&str, ToolError> {
        self.get_str(name).ok_or_else(|| {
            ToolError::InvalidArguments(format!("missing required argument: {}", name))
        })
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ToolArgs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Bind `args` against `params`
pub fn bind(params: &[ParamSpec], mut args: Map<String, Value>) -> Result<ToolArgs, ToolError> {
    if let Some(unknown) = args.keys().find(|k| !params.iter().any(|p| &p.name == *k)) {
        return Err(ToolError::InvalidArguments(format!(
            "unexpected argument '{}'",
            unknown
        )));
    }

    let mut bound = Map::new();
    for param in params {
        let supplied = args.remove(&param.name).filter(|v| !v.is_null());
        match (supplied, &param.default) {
            (Some(value), _) => {
                let rendered = value.to_string();
                let coerced = param.kind.coerce(value).ok_or_else(|| {
                    ToolError::InvalidArguments(format!(
                        "argument '{}' expects {}, got {}",
                        param.name,
                        param.kind.json_type(),
                        rendered
                    ))
                })?;
                bound.insert(param.name.clone(), coerced);
            }
            (None, Some(default)) => {
                bound.insert(param.name.clone(), default.clone());
            }
            (None, None) => {
                return Err(ToolError::InvalidArguments(format!(
                    "missing required argument '{}'",
                    param.name
                )));
            }
        }
    }

    Ok(ToolArgs(bound))
}
