//! Runtime secret resolution.
//!
//! Config YAML stores only env var NAMES. `resolve_secrets` is called once at
//! startup and the result is passed into constructors; `Debug` redacts values
//! and error messages mention the NAME only.

use anyhow::{bail, Result};

use crate::ServiceConfig;

#[derive(Clone)]
pub struct ResolvedSecrets {
    pub database_url: String,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("database_url", &"<REDACTED>")
            .finish()
    }
}

pub fn resolve_secrets(cfg: &ServiceConfig) -> Result<ResolvedSecrets> {
    let var = cfg.postgres.url_env.trim();
    let Some(database_url) = resolve_env(var) else {
        bail!(
            "SECRETS_MISSING: required env var '{}' (postgres url) is not set or empty",
            var
        );
    };
    Ok(ResolvedSecrets { database_url })
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}
