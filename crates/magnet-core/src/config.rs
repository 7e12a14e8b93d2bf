//! Gateway configuration loaded from `.env`.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | MAGNET_BIND_ADDR | 127.0.0.1:8000 | Gateway listen address. |
//! | MAGNET_DB_PATH | ./data | Base directory for the SQLite database. |
//! | OPENROUTER_API_KEY | (unset) | Hosted-model key; unset means fallback ideas only. |
//! | MAGNET_IDEA_MODEL | openai/gpt-4o-mini | Model id for the idea bridge. |

use std::path::PathBuf;

use crate::storage::Storage;

/// Gateway settings loaded from environment. Unset values take the defaults
/// in the table above.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub openrouter_api_key: Option<String>,
    pub idea_model: Option<String>,
}

impl GatewayConfig {
    /// Load settings from environment.
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_string("MAGNET_BIND_ADDR", "127.0.0.1:8000"),
            db_path: Storage::default_path(),
            openrouter_api_key: env_opt_string("OPENROUTER_API_KEY"),
            idea_model: env_opt_string("MAGNET_IDEA_MODEL"),
        }
    }
}

fn env_string(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
