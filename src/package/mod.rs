// src/package/mod.rs

//! Test package description handed to launchers.
//!
//! A [`TestPackage`] is the primary file to run plus an ordered map of typed
//! settings. Launchers only ever read settings, by name, with a default.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub mod loader;

pub use loader::{load_from_path, load_package};

/// Well-known setting names. These strings are shared with agencies.
pub mod settings {
    pub const TARGET_RUNTIME_FRAMEWORK: &str = "TargetRuntimeFramework";
    pub const RUN_AS_X86: &str = "RunAsX86";
    pub const DEBUG_TESTS: &str = "DebugTests";
    pub const DEBUG_AGENT: &str = "DebugAgent";
    pub const INTERNAL_TRACE_LEVEL: &str = "InternalTraceLevel";
    pub const LOAD_USER_PROFILE: &str = "LoadUserProfile";
    pub const WORK_DIRECTORY: &str = "WorkDirectory";
}

/// A single typed setting value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        SettingValue::Int(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::Str(v.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        SettingValue::Str(v)
    }
}

/// Read-only, name-ordered package settings.
///
/// Lookups of a missing name, or of a name holding a value of another
/// type, return the supplied default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageSettings {
    values: BTreeMap<String, SettingValue>,
}

impl PackageSettings {
    pub fn new(values: BTreeMap<String, SettingValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&SettingValue> {
        self.values.get(name)
    }

    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.values.get(name) {
            Some(SettingValue::Bool(v)) => *v,
            _ => default,
        }
    }

    pub fn get_int(&self, name: &str, default: i64) -> i64 {
        match self.values.get(name) {
            Some(SettingValue::Int(v)) => *v,
            _ => default,
        }
    }

    pub fn get_str<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        match self.values.get(name) {
            Some(SettingValue::Str(v)) => v.as_str(),
            _ => default,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for PackageSettings
where
    K: Into<String>,
    V: Into<SettingValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A test package: the primary file plus its settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPackage {
    full_name: PathBuf,
    settings: PackageSettings,
}

impl TestPackage {
    pub fn new(full_name: impl Into<PathBuf>) -> Self {
        Self {
            full_name: full_name.into(),
            settings: PackageSettings::default(),
        }
    }

    pub fn with_settings(full_name: impl Into<PathBuf>, settings: PackageSettings) -> Self {
        Self {
            full_name: full_name.into(),
            settings,
        }
    }

    /// Path of the package's primary file.
    pub fn full_name(&self) -> &Path {
        &self.full_name
    }

    pub fn settings(&self) -> &PackageSettings {
        &self.settings
    }

    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        self.settings.get_bool(name, default)
    }

    pub fn get_str<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.settings.get_str(name, default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PackageSettings {
        [
            (settings::TARGET_RUNTIME_FRAMEWORK, SettingValue::from("netcore-6.0")),
            (settings::DEBUG_AGENT, SettingValue::from(true)),
            ("Retries", SettingValue::from(3i64)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn typed_lookups_use_defaults_for_missing_names() {
        let s = sample();
        assert_eq!(s.get_str(settings::WORK_DIRECTORY, ""), "");
        assert!(!s.get_bool(settings::LOAD_USER_PROFILE, false));
        assert_eq!(s.get_int("Timeout", 30), 30);
    }

    #[test]
    fn typed_lookups_use_defaults_for_mismatched_types() {
        let s = sample();
        assert_eq!(s.get_str(settings::DEBUG_AGENT, "Off"), "Off");
        assert!(s.get_bool("Retries", true));
        assert_eq!(s.get_int(settings::TARGET_RUNTIME_FRAMEWORK, -1), -1);
    }

    #[test]
    fn typed_lookups_return_stored_values() {
        let s = sample();
        assert_eq!(s.get_str(settings::TARGET_RUNTIME_FRAMEWORK, ""), "netcore-6.0");
        assert!(s.get_bool(settings::DEBUG_AGENT, false));
        assert_eq!(s.get_int("Retries", 0), 3);
    }

    #[test]
    fn settings_iterate_in_name_order() {
        let names: Vec<_> = sample().iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(names, vec!["DebugAgent", "Retries", "TargetRuntimeFramework"]);
    }
}
