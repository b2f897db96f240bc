//! Layered YAML configuration for the order service.
//!
//! Files are overlaid in order, so later files override single keys of earlier
//! ones. The merged tree is refused if any string in it is an inline
//! credential, then rendered as canonical JSON and hashed. The status endpoint
//! reports that hash so two daemons can be compared by config.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};

mod secrets;
mod service;

pub use secrets::{resolve_secrets, ResolvedSecrets};
pub use service::{
    CacheConfig, HttpServerConfig, IngestConfig, KafkaConfig, PostgresConfig, ServiceConfig,
};

/// Env var holding a comma-separated list of config paths in merge order.
pub const ENV_CONFIG_PATHS: &str = "ORDS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/base.yaml";

/// Credential prefixes that must never appear as config values. Postgres URLs
/// carry passwords; the rest are common token formats.
const CREDENTIAL_PREFIXES: &[&str] = &[
    "postgres://",
    "postgresql://",
    "sk-",
    "AKIA",
    "-----BEGIN",
    "ghp_",
    "glpat-",
    "xoxb-",
];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    pub fn service(&self) -> Result<ServiceConfig> {
        ServiceConfig::from_json(&self.config_json)
    }
}

/// Config paths from `ORDS_CONFIG`, falling back to [`DEFAULT_CONFIG_PATH`].
pub fn config_paths_from_env() -> Vec<String> {
    match std::env::var(ENV_CONFIG_PATHS) {
        Ok(v) if !v.trim().is_empty() => v
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect(),
        _ => vec![DEFAULT_CONFIG_PATH.to_string()],
    }
}

/// Read every file in `paths` and merge them as layers.
pub fn load_config_files(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| {
            std::fs::read_to_string(p).with_context(|| format!("cannot read config file {p}"))
        })
        .collect::<Result<Vec<String>>>()?;

    let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    merge_config_docs(&doc_refs)
}

/// Merge YAML documents given as text (base first).
pub fn merge_config_docs(docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());
    for (i, raw) in docs.iter().enumerate() {
        let layer: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("config layer {i} is not valid YAML"))?;
        let layer = serde_json::to_value(layer)
            .with_context(|| format!("config layer {i} has no JSON form"))?;
        overlay(&mut merged, layer);
    }

    if let Some(path) = find_inline_credential(&merged) {
        bail!(
            "CONFIG_SECRET_DETECTED at {path}: config holds env var names, \
             not credentials (value withheld)"
        );
    }

    // Object keys are sorted by serde_json's default map, so this is canonical.
    let canonical_json = serde_json::to_string(&merged).context("config to JSON failed")?;
    Ok(LoadedConfig {
        config_hash: hex::encode(Sha256::digest(canonical_json.as_bytes())),
        canonical_json,
        config_json: merged,
    })
}

/// Load and type the config in one step (what the daemon and CLI do at boot).
pub fn load_service_config(paths: &[&str]) -> Result<(LoadedConfig, ServiceConfig)> {
    let loaded = load_config_files(paths)?;
    let service = loaded.service()?;
    Ok((loaded, service))
}

/// Apply `top` onto `base`. Maps merge key by key; any other value in `top`
/// replaces what was there, including arrays.
fn overlay(base: &mut Value, top: Value) {
    match (base, top) {
        (Value::Object(base_map), Value::Object(top_map)) => {
            for (key, top_val) in top_map {
                match base_map.get_mut(&key) {
                    Some(slot) => overlay(slot, top_val),
                    None => {
                        base_map.insert(key, top_val);
                    }
                }
            }
        }
        (slot, top_val) => *slot = top_val,
    }
}

/// Dotted path (`postgres.url_env`, `kafka.brokers[0]`) of the first string
/// value that looks like a credential.
fn find_inline_credential(root: &Value) -> Option<String> {
    let mut pending: Vec<(String, &Value)> = vec![(String::new(), root)];
    while let Some((path, v)) = pending.pop() {
        match v {
            Value::Object(map) => {
                for (key, child) in map {
                    let child_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{path}.{key}")
                    };
                    pending.push((child_path, child));
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    pending.push((format!("{path}[{i}]"), child));
                }
            }
            Value::String(s) if is_credential(s) => return Some(path),
            _ => {}
        }
    }
    None
}

fn is_credential(s: &str) -> bool {
    let s = s.trim();
    s.len() >= 8 && CREDENTIAL_PREFIXES.iter().any(|p| s.starts_with(p))
}
