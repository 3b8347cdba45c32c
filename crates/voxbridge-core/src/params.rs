//! Filter parameter declarations and host string parsing.
//!
//! Hosts deliver parameter values as raw strings. Each filter declares
//! its parameters as [`ParamSpec`]s (name, kind, default); the bridge
//! parses the strings against those declarations into a
//! [`ParameterMap`] before any processing starts. Range validation is
//! the host configuration layer's job; the bridge only guarantees the
//! values are well-formed and that every declared parameter has a
//! value, falling back to the declared default when the host sends
//! nothing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PluginError, PluginResult};

/// Kind of a declared filter parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Int,
    Float,
    Bool,
}

impl ParamKind {
    fn word(self) -> &'static str {
        match self {
            ParamKind::Int => "int",
            ParamKind::Float => "float",
            ParamKind::Bool => "bool",
        }
    }
}

/// A parsed parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// Declaration of one filter parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Name the host uses when sending a value.
    pub name: String,
    /// Kind the raw string is parsed as.
    pub kind: ParamKind,
    /// Value used when the host sends nothing for this parameter.
    pub default: ParamValue,
}

impl ParamSpec {
    /// Declares an integer parameter.
    pub fn int(name: impl Into<String>, default: i64) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Int,
            default: ParamValue::Int(default),
        }
    }

    /// Declares a floating-point parameter.
    pub fn float(name: impl Into<String>, default: f64) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Float,
            default: ParamValue::Float(default),
        }
    }

    /// Declares a boolean parameter.
    pub fn flag(name: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Bool,
            default: ParamValue::Bool(default),
        }
    }
}

/// Parameter values for one invocation, keyed by declared name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterMap {
    values: BTreeMap<String, ParamValue>,
}

impl ParameterMap {
    /// Parses raw host strings against the declared specs.
    ///
    /// Every declared parameter starts at its default; a raw entry
    /// overrides it. An empty or whitespace-only raw string keeps the
    /// default (hosts send empty values before a control has been
    /// touched). Raw names the filter never declared are rejected.
    pub fn from_raw(specs: &[ParamSpec], raw: &[(String, String)]) -> PluginResult<Self> {
        let mut values: BTreeMap<String, ParamValue> = specs
            .iter()
            .map(|s| (s.name.clone(), s.default))
            .collect();
        for (name, text) in raw {
            let spec = specs
                .iter()
                .find(|s| s.name == *name)
                .ok_or_else(|| PluginError::UnknownParameter { name: name.clone() })?;
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            let value =
                parse_value(spec.kind, text).ok_or_else(|| PluginError::ParameterParse {
                    name: name.clone(),
                    value: text.to_string(),
                    expected: spec.kind.word(),
                })?;
            values.insert(name.clone(), value);
        }
        Ok(Self { values })
    }

    /// Builds a map holding only the declared defaults.
    pub fn from_defaults(specs: &[ParamSpec]) -> Self {
        Self {
            values: specs
                .iter()
                .map(|s| (s.name.clone(), s.default))
                .collect(),
        }
    }

    /// Sets a value directly, bypassing string parsing.
    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    /// Raw lookup without kind checking.
    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.values.get(name).copied()
    }

    /// Reads an integer parameter.
    pub fn int(&self, name: &str) -> PluginResult<i64> {
        match self.get(name) {
            Some(ParamValue::Int(v)) => Ok(v),
            Some(_) => Err(kind_misuse(name, ParamKind::Int)),
            None => Err(PluginError::UnknownParameter { name: name.into() }),
        }
    }

    /// Reads a float parameter; integer values widen losslessly.
    pub fn float(&self, name: &str) -> PluginResult<f64> {
        match self.get(name) {
            Some(ParamValue::Float(v)) => Ok(v),
            Some(ParamValue::Int(v)) => Ok(v as f64),
            Some(_) => Err(kind_misuse(name, ParamKind::Float)),
            None => Err(PluginError::UnknownParameter { name: name.into() }),
        }
    }

    /// Reads a boolean parameter.
    pub fn flag(&self, name: &str) -> PluginResult<bool> {
        match self.get(name) {
            Some(ParamValue::Bool(v)) => Ok(v),
            Some(_) => Err(kind_misuse(name, ParamKind::Bool)),
            None => Err(PluginError::UnknownParameter { name: name.into() }),
        }
    }
}

fn kind_misuse(name: &str, asked: ParamKind) -> PluginError {
    PluginError::fault(format!(
        "parameter '{}' was read as {} but holds another kind",
        name,
        asked.word()
    ))
}

fn parse_value(kind: ParamKind, text: &str) -> Option<ParamValue> {
    match kind {
        ParamKind::Int => {
            // Hosts hand slider values through as float-formatted
            // strings ("100.0"); truncate toward zero like strtol
            // stopping at the decimal point.
            if let Ok(v) = text.parse::<i64>() {
                return Some(ParamValue::Int(v));
            }
            text.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| ParamValue::Int(v.trunc() as i64))
        }
        ParamKind::Float => text
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(ParamValue::Float),
        ParamKind::Bool => match text {
            "1" | "true" | "on" => Some(ParamValue::Bool(true)),
            "0" | "false" | "off" => Some(ParamValue::Bool(false)),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn specs() -> Vec<ParamSpec> {
        vec![
            ParamSpec::int("iterations", 5),
            ParamSpec::float("time_step", 0.05),
            ParamSpec::flag("composite", false),
        ]
    }

    fn raw(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_fill_missing_values() {
        let map = ParameterMap::from_raw(&specs(), &[]).unwrap();
        assert_eq!(map.int("iterations").unwrap(), 5);
        assert_eq!(map.float("time_step").unwrap(), 0.05);
        assert!(!map.flag("composite").unwrap());
    }

    #[test]
    fn test_raw_values_override_defaults() {
        let map = ParameterMap::from_raw(
            &specs(),
            &raw(&[
                ("iterations", "12"),
                ("time_step", "0.125"),
                ("composite", "1"),
            ]),
        )
        .unwrap();
        assert_eq!(map.int("iterations").unwrap(), 12);
        assert_eq!(map.float("time_step").unwrap(), 0.125);
        assert!(map.flag("composite").unwrap());
    }

    #[test]
    fn test_int_accepts_float_formatted_strings() {
        let map =
            ParameterMap::from_raw(&specs(), &raw(&[("iterations", "100.0")])).unwrap();
        assert_eq!(map.int("iterations").unwrap(), 100);
        let map =
            ParameterMap::from_raw(&specs(), &raw(&[("iterations", "-2.7")])).unwrap();
        assert_eq!(map.int("iterations").unwrap(), -2);
    }

    #[test]
    fn test_empty_string_keeps_default() {
        let map = ParameterMap::from_raw(&specs(), &raw(&[("time_step", "  ")])).unwrap();
        assert_eq!(map.float("time_step").unwrap(), 0.05);
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let err = ParameterMap::from_raw(&specs(), &raw(&[("sigma", "1.0")]))
            .err()
            .unwrap();
        assert_eq!(
            err,
            PluginError::UnknownParameter {
                name: "sigma".into()
            }
        );
    }

    #[test]
    fn test_unparseable_value_is_rejected() {
        let err = ParameterMap::from_raw(&specs(), &raw(&[("time_step", "fast")]))
            .err()
            .unwrap();
        assert_eq!(err.code(), "VB_008");
        let err = ParameterMap::from_raw(&specs(), &raw(&[("composite", "maybe")]))
            .err()
            .unwrap();
        assert_eq!(err.code(), "VB_008");
    }

    #[test]
    fn test_float_reads_int_values() {
        let mut map = ParameterMap::default();
        map.set("radius", ParamValue::Int(3));
        assert_eq!(map.float("radius").unwrap(), 3.0);
        assert_eq!(map.int("radius").unwrap(), 3);
        assert!(map.flag("radius").is_err());
    }
}
