//! Command handler modules for ords-cli.

pub mod order;

use anyhow::{Context, Result};
use ords_db::PgPool;
use std::fs;

/// Open a pool the same way the daemon does: layered config, then the URL
/// from the env var named by `postgres.url_env`.
pub async fn connect_db(config_paths: &[String]) -> Result<PgPool> {
    let paths = if config_paths.is_empty() {
        ords_config::config_paths_from_env()
    } else {
        config_paths.to_vec()
    };
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let (_loaded, cfg) = ords_config::load_service_config(&path_refs)?;
    let secrets = ords_config::resolve_secrets(&cfg)?;
    ords_db::connect(&secrets.database_url, cfg.postgres.max_connections).await
}

/// Read a UTF-8 text file, tolerating a leading byte-order mark.
pub fn read_text_file(path: &str) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("read file failed: {path}"))?;
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
    let raw = String::from_utf8(bytes.to_vec()).with_context(|| format!("{path} must be UTF-8 text"))?;
    Ok(raw)
}
