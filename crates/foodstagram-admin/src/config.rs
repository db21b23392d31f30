//! Configuration for the foodstagram-admin CLI.

use serde::Deserialize;

use foodstagram_store::StoreConfig;

use crate::error::Result;

/// Top-level admin configuration.
///
/// Loaded from `foodstagram.toml` or `FOODSTAGRAM__` environment variables,
/// e.g. `FOODSTAGRAM__STORE__DATABASE_PATH=/var/lib/foodstagram.db`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// Database settings (`[store]` section).
    #[serde(default)]
    pub store: StoreConfig,

    /// How JSON output is laid out (`[output]` section).
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Pretty-print JSON (default: true). Set false for line-oriented tooling.
    #[serde(default = "default_true")]
    pub pretty: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty: default_true(),
        }
    }
}

/// Load configuration from `<file_prefix>.{toml,json,...}` (optional) and
/// the environment. Missing sections fall back to defaults.
pub fn load_admin_config(file_prefix: &str) -> Result<AdminConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("FOODSTAGRAM")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(cfg.try_deserialize()?)
}
