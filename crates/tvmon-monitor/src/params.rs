//! Schema-driven validation of tunable monitor parameters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tvmon_common::types::EntityKind;

pub const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("parameter '{name}' must be {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("parameter '{name}' = {value} is below minimum {min}")]
    BelowMinimum { name: String, value: f64, min: f64 },

    #[error("parameter '{name}' = {value} is above maximum {max}")]
    AboveMaximum { name: String, value: f64, max: f64 },

    #[error("invalid monitor name '{0}': expected 1-64 characters of [A-Za-z0-9._-]")]
    InvalidName(String),
}

/// Schema default; its variant also fixes the expected type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault {
    Float(f64),
    Integer(i64),
    Bool(bool),
}

impl ParamDefault {
    fn expected(&self) -> &'static str {
        match self {
            ParamDefault::Float(_) => "a number",
            ParamDefault::Integer(_) => "an integer",
            ParamDefault::Bool(_) => "a boolean",
        }
    }

    fn to_value(self) -> Value {
        match self {
            ParamDefault::Float(v) => Value::from(v),
            ParamDefault::Integer(v) => Value::from(v),
            ParamDefault::Bool(v) => Value::from(v),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: ParamDefault,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug)]
pub struct Schema {
    pub specs: &'static [ParamSpec],
}

pub const RATE: &str = "rate";
pub const TIME_CHECK: &str = "time_check";
pub const METHOD_COMPARISON: &str = "method_comparison";
pub const ANALYZE: &str = "analyze";

pub static CHANNEL_SCHEMA: Schema = Schema {
    specs: &[
        ParamSpec {
            name: RATE,
            default: ParamDefault::Float(0.035),
            min: Some(0.001),
            max: Some(0.3),
        },
        ParamSpec {
            name: TIME_CHECK,
            default: ParamDefault::Integer(0),
            min: Some(0.0),
            max: Some(300.0),
        },
        ParamSpec {
            name: METHOD_COMPARISON,
            default: ParamDefault::Integer(3),
            min: Some(1.0),
            max: Some(4.0),
        },
        ParamSpec {
            name: ANALYZE,
            default: ParamDefault::Bool(false),
            min: None,
            max: None,
        },
    ],
};

pub static TUNER_SCHEMA: Schema = Schema {
    specs: &[
        ParamSpec {
            name: RATE,
            default: ParamDefault::Float(0.015),
            min: Some(0.001),
            max: Some(1.0),
        },
        ParamSpec {
            name: TIME_CHECK,
            default: ParamDefault::Integer(10),
            min: Some(0.0),
            max: Some(300.0),
        },
        ParamSpec {
            name: METHOD_COMPARISON,
            default: ParamDefault::Integer(3),
            min: Some(1.0),
            max: Some(3.0),
        },
    ],
};

pub fn schema_for(kind: EntityKind) -> &'static Schema {
    match kind {
        EntityKind::Channel => &CHANNEL_SCHEMA,
        EntityKind::Tuner => &TUNER_SCHEMA,
    }
}

impl Schema {
    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Validates `value` against the named parameter.
    ///
    /// An absent value yields the schema default; a present value is
    /// returned unchanged if it has the right type and lies within the
    /// bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use tvmon_monitor::params::CHANNEL_SCHEMA;
    ///
    /// assert_eq!(CHANNEL_SCHEMA.validate("rate", None).unwrap(), json!(0.035));
    /// assert_eq!(CHANNEL_SCHEMA.validate("rate", Some(&json!(0.1))).unwrap(), json!(0.1));
    /// assert!(CHANNEL_SCHEMA.validate("rate", Some(&json!(0.5))).is_err());
    /// ```
    pub fn validate(&self, name: &str, value: Option<&Value>) -> Result<Value, ValidationError> {
        let spec = self
            .get(name)
            .ok_or_else(|| ValidationError::UnknownParameter(name.to_string()))?;
        let Some(value) = value else {
            return Ok(spec.default.to_value());
        };

        let numeric = match spec.default {
            ParamDefault::Float(_) => value.as_f64(),
            ParamDefault::Integer(_) => value
                .as_i64()
                .map(|v| v as f64)
                .or_else(|| value.as_u64().map(|v| v as f64)),
            ParamDefault::Bool(_) => {
                return if value.is_boolean() {
                    Ok(value.clone())
                } else {
                    Err(type_mismatch(spec))
                };
            }
        };
        let number = numeric.ok_or_else(|| type_mismatch(spec))?;

        if let Some(min) = spec.min {
            if number < min {
                return Err(ValidationError::BelowMinimum {
                    name: spec.name.to_string(),
                    value: number,
                    min,
                });
            }
        }
        if let Some(max) = spec.max {
            if number > max {
                return Err(ValidationError::AboveMaximum {
                    name: spec.name.to_string(),
                    value: number,
                    max,
                });
            }
        }
        Ok(value.clone())
    }
}

fn type_mismatch(spec: &ParamSpec) -> ValidationError {
    ValidationError::TypeMismatch {
        name: spec.name.to_string(),
        expected: spec.default.expected(),
    }
}

/// Checks a monitor name: 1 to 64 characters, ASCII alphanumerics plus
/// `.`, `_` and `-`.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidName(name.to_string()))
    }
}

/// Validated tunables of one monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub name: String,
    pub rate: f64,
    pub time_check: u32,
    pub method_comparison: u8,
    /// Push per-PID error detail on the `analyze` feed (channels only).
    pub analyze: bool,
}

impl MonitorConfig {
    /// A config with every tunable at its schema default.
    pub fn with_defaults(kind: EntityKind, name: &str) -> Result<Self, ValidationError> {
        Self::from_params(kind, name, &Map::new())
    }

    /// Builds a config from a (possibly partial) parameter map. Missing
    /// parameters take their schema defaults; keys outside the schema are
    /// ignored.
    pub fn from_params(
        kind: EntityKind,
        name: &str,
        params: &Map<String, Value>,
    ) -> Result<Self, ValidationError> {
        validate_name(name)?;
        let base = Self {
            name: name.to_string(),
            rate: 0.0,
            time_check: 0,
            method_comparison: 0,
            analyze: false,
        };
        let schema = schema_for(kind);
        let mut full = Map::new();
        for spec in schema.specs {
            full.insert(
                spec.name.to_string(),
                schema.validate(spec.name, params.get(spec.name))?,
            );
        }
        base.apply(schema, &full)
    }

    /// Returns a copy with the recognised keys of `params` applied. The
    /// first invalid key fails the whole update and `self` is untouched.
    pub fn with_updates(
        &self,
        kind: EntityKind,
        params: &Map<String, Value>,
    ) -> Result<Self, ValidationError> {
        let schema = schema_for(kind);
        let mut present = Map::new();
        for (key, value) in params {
            if schema.get(key).is_none() {
                tracing::debug!(monitor = %self.name, key = %key, "Ignoring unrecognised parameter");
                continue;
            }
            present.insert(key.clone(), schema.validate(key, Some(value))?);
        }
        self.clone().apply(schema, &present)
    }

    fn apply(mut self, schema: &Schema, values: &Map<String, Value>) -> Result<Self, ValidationError> {
        for (key, value) in values {
            let mismatch = || match schema.get(key) {
                Some(spec) => type_mismatch(spec),
                None => ValidationError::UnknownParameter(key.clone()),
            };
            match key.as_str() {
                RATE => self.rate = value.as_f64().ok_or_else(mismatch)?,
                TIME_CHECK => {
                    self.time_check = value
                        .as_u64()
                        .and_then(|v| u32::try_from(v).ok())
                        .ok_or_else(mismatch)?
                }
                METHOD_COMPARISON => {
                    self.method_comparison = value
                        .as_u64()
                        .and_then(|v| u8::try_from(v).ok())
                        .ok_or_else(mismatch)?
                }
                ANALYZE => self.analyze = value.as_bool().ok_or_else(mismatch)?,
                _ => return Err(mismatch()),
            }
        }
        Ok(self)
    }
}
