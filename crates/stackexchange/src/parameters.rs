//! Query parameter whitelist for Stack Exchange endpoints.
//!
//! Every endpoint registers the parameters it accepts with [`Parameters::allow`].
//! Overrides for names that were never allowed, and empty values, are dropped
//! silently so a bad config entry falls back to the default instead of
//! breaking the request.

use std::collections::BTreeMap;
use std::fmt;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl ParamValue {
    /// Empty strings count as "no value".
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Str(s) if s.is_empty())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Registration of an accepted parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedParam {
    /// Value applied by [`Parameters::apply_defaults`] when not overridden.
    pub default: ParamValue,
    /// Human readable documentation, shown in debug query tables.
    pub description: String,
}

/// Allowed and applied parameters of one endpoint.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    allowed: BTreeMap<String, AllowedParam>,
    applied: BTreeMap<String, ParamValue>,
}

impl Parameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` as acceptable for this endpoint.
    pub fn allow(
        &mut self,
        name: &str,
        default: impl Into<ParamValue>,
        description: &str,
    ) -> &mut Self {
        self.allowed.insert(
            name.to_string(),
            AllowedParam {
                default: default.into(),
                description: description.to_string(),
            },
        );
        self
    }

    /// Override `name`. No-op when the name is not allowed or the value is empty.
    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) {
        let value = value.into();
        if !self.is_allowed(name) || value.is_empty() {
            tracing::trace!(name, "Ignoring parameter override");
            return;
        }
        self.applied.insert(name.to_string(), value);
    }

    /// Fill every allowed parameter that has not been set with its default.
    pub fn apply_defaults(&mut self) {
        let defaults: Vec<(String, ParamValue)> = self
            .allowed
            .iter()
            .filter(|(name, _)| !self.applied.contains_key(*name))
            .map(|(name, allowed)| (name.clone(), allowed.default.clone()))
            .collect();

        for (name, value) in defaults {
            self.set(&name, value);
        }
    }

    /// Applied value of `name`, or an empty string.
    #[must_use]
    pub fn value_of(&self, name: &str) -> String {
        self.applied
            .get(name)
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.applied.contains_key(name)
    }

    #[must_use]
    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowed.contains_key(name)
    }

    pub fn delete(&mut self, name: &str) {
        self.applied.remove(name);
    }

    #[must_use]
    pub fn allowed(&self) -> &BTreeMap<String, AllowedParam> {
        &self.allowed
    }

    #[must_use]
    pub fn applied(&self) -> &BTreeMap<String, ParamValue> {
        &self.applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Parameters {
        let mut params = Parameters::new();
        params
            .allow("site", "stackoverflow", "site to query")
            .allow("pagesize", 100_i64, "items per page")
            .allow("tagged", "", "tag filter");
        params
    }

    #[test]
    fn test_set_requires_allowed_name() {
        let mut params = sample();
        params.set("bogus", "x");
        assert!(!params.is_set("bogus"));

        params.apply_defaults();
        assert_eq!(params.value_of("bogus"), "");
    }

    #[test]
    fn test_rejected_override_falls_back_to_default() {
        let mut params = sample();
        params.set("site", "");
        params.apply_defaults();
        assert_eq!(params.value_of("site"), "stackoverflow");
    }

    #[test]
    fn test_override_wins_over_default() {
        let mut params = sample();
        params.set("site", "superuser");
        params.set("tagged", "aframe");
        params.apply_defaults();

        assert_eq!(params.value_of("site"), "superuser");
        assert_eq!(params.value_of("tagged"), "aframe");
        assert_eq!(params.value_of("pagesize"), "100");
    }

    #[test]
    fn test_empty_default_is_not_applied() {
        let mut params = sample();
        params.apply_defaults();
        assert!(!params.is_set("tagged"));
        assert_eq!(params.applied().len(), 2);
    }

    #[test]
    fn test_applied_is_sorted() {
        let mut params = sample();
        params.set("tagged", "webvr");
        params.apply_defaults();

        let keys: Vec<_> = params.applied().keys().cloned().collect();
        assert_eq!(keys, vec!["pagesize", "site", "tagged"]);
    }

    #[test]
    fn test_delete() {
        let mut params = sample();
        params.set("site", "superuser");
        params.delete("site");
        assert!(!params.is_set("site"));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(ParamValue::from(true).to_string(), "true");
        assert_eq!(ParamValue::from(42_u32).to_string(), "42");
        assert!(ParamValue::from("").is_empty());
        assert!(!ParamValue::from(0_i64).is_empty());
    }
}
