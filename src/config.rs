//! Configuration loading
//!
//! Layers, later wins:
//! 1. Built-in defaults
//! 2. YAML files, in the order given (missing files are skipped)
//! 3. `DRIFTPROOF__` environment variables, `__` separating path segments,
//!    e.g. `DRIFTPROOF__POLICY__MIN_THRESHOLD=0.5`
//!
//! Layers are merged as JSON values and deserialized once at the end, so a
//! policy that fails validation is rejected at load time.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use element_relocator::{ExtractorConfig, RelocationPolicy};
use fingerprint_store::StoreConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::session::SessionOptions;

const ENV_PREFIX: &str = "DRIFTPROOF__";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftproofConfig {
    pub policy: RelocationPolicy,
    pub extractor: ExtractorConfig,
    pub store: StoreConfig,
    pub session: SessionOptions,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Default)]
pub struct LoadOptions {
    pub paths: Vec<PathBuf>,
    pub include_env: bool,
}

impl LoadOptions {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: vec![path.into()],
            include_env: true,
        }
    }
}

/// `<config dir>/driftproof/driftproof.yaml`, when the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("driftproof").join("driftproof.yaml"))
}

pub fn load_config(path: Option<&Path>) -> Result<DriftproofConfig, ConfigError> {
    let mut options = LoadOptions {
        include_env: true,
        ..LoadOptions::default()
    };
    if let Some(p) = path {
        options.paths.push(p.to_path_buf());
    }
    load_config_with_options(&options)
}

pub fn load_config_with_options(options: &LoadOptions) -> Result<DriftproofConfig, ConfigError> {
    let mut merged = serde_json::to_value(DriftproofConfig::default())
        .map_err(|err| ConfigError::Invalid(err.to_string()))?;

    for path in &options.paths {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, skipping");
            continue;
        }
        let layer = value_from_file(path)?;
        merge(&mut merged, layer);
    }

    if options.include_env {
        apply_env_overrides(&mut merged, env::vars())?;
    }

    serde_json::from_value(merged).map_err(|err| ConfigError::Invalid(err.to_string()))
}

fn value_from_file(path: &Path) -> Result<Value, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if raw.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let yaml: serde_yaml::Value = serde_yaml::from_str(&raw)
        .map_err(|err| ConfigError::Invalid(format!("{}: {}", path.display(), err)))?;
    let value =
        serde_json::to_value(yaml).map_err(|err| ConfigError::Invalid(err.to_string()))?;
    if !value.is_object() {
        return Err(ConfigError::Invalid(format!(
            "{}: top level must be a mapping",
            path.display()
        )));
    }
    Ok(value)
}

fn apply_env_overrides(
    target: &mut Value,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<(), ConfigError> {
    let mut overrides: Vec<(String, String)> = vars
        .into_iter()
        .filter(|(key, _)| key.starts_with(ENV_PREFIX))
        .collect();
    // deterministic application when two variables touch the same path
    overrides.sort();

    for (key, raw) in overrides {
        let segments: Vec<String> = key[ENV_PREFIX.len()..]
            .split("__")
            .map(|segment| segment.trim().to_ascii_lowercase())
            .collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(ConfigError::Invalid(format!("malformed override variable {key}")));
        }
        debug!(variable = %key, "applying environment override");
        set_path(target, &segments, parse_env_value(&raw));
    }
    Ok(())
}

fn parse_env_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn set_path(target: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        let slot = map.entry(head.clone()).or_insert(Value::Null);
        set_path(slot, rest, value);
    }
}

fn merge(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
