// src/package/loader.rs

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::errors::{AgentError, Result};
use crate::package::{PackageSettings, SettingValue, TestPackage};

/// On-disk package description, before validation.
///
/// ```toml
/// path = "bin/unit-tests"
///
/// [settings]
/// TargetRuntimeFramework = "netcore-6.0"
/// InternalTraceLevel = "Info"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawPackageFile {
    pub path: String,

    #[serde(default)]
    pub settings: BTreeMap<String, SettingValue>,
}

/// Load a package file and return the raw [`RawPackageFile`].
///
/// This only performs TOML deserialization. Use [`load_package`] for the
/// validated form.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPackageFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawPackageFile = toml::from_str(&contents)?;
    Ok(raw)
}

/// Load and validate a package file.
///
/// A relative `path` is resolved against the directory holding the package
/// file, so the description can be moved together with the tests.
pub fn load_package(path: impl AsRef<Path>) -> Result<TestPackage> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;

    if raw.path.trim().is_empty() {
        return Err(AgentError::ConfigError(format!(
            "package file {:?} must name a non-empty `path`",
            path
        )));
    }

    let primary = Path::new(&raw.path);
    let full_name = match path.parent() {
        Some(parent) if primary.is_relative() && !parent.as_os_str().is_empty() => {
            parent.join(primary)
        }
        _ => primary.to_path_buf(),
    };

    Ok(TestPackage::with_settings(
        full_name,
        PackageSettings::new(raw.settings),
    ))
}
