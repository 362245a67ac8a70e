use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::diagram;
use crate::snapshot::EntityId;

/// Complete bt-live configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BtLiveConfig {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Live client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Status stream endpoint
    #[serde(default = "default_url")]
    pub url: String,
    /// No-progress window before the link is declared stale; also the retry delay
    #[serde(default = "default_watchdog_timeout_ms")]
    pub watchdog_timeout_ms: u64,
    /// Entities to track, used when no diagram is given
    #[serde(default)]
    pub entities: Vec<EntityId>,
    /// Rendered diagram (SVG) to derive the tracked entities from
    #[serde(default)]
    pub diagram: Option<PathBuf>,
    /// Samples shown per entity in the console history strip
    #[serde(default = "default_history_width")]
    pub history_width: usize,
}

fn default_url() -> String {
    "http://127.0.0.1:8000/msg".to_string()
}

fn default_watchdog_timeout_ms() -> u64 {
    100
}

fn default_history_width() -> usize {
    40
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            watchdog_timeout_ms: default_watchdog_timeout_ms(),
            entities: Vec::new(),
            diagram: None,
            history_width: default_history_width(),
        }
    }
}

impl ClientConfig {
    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }

    /// Entities to track: from the diagram if one is configured, else the list
    pub fn resolve_entities(&self) -> Result<Vec<EntityId>> {
        let ids = match &self.diagram {
            Some(path) => diagram::load_entity_ids(path)?,
            None => self.entities.clone(),
        };
        if ids.is_empty() {
            bail!("No entities to track: set client.entities or point client.diagram at an SVG with nodes");
        }
        Ok(ids)
    }
}

/// Status stream server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// How often the latest snapshot is written to each open stream
    #[serde(default = "default_emit_interval_ms")]
    pub emit_interval_ms: u64,
    /// Rendered diagram (SVG) served on the index page
    #[serde(default)]
    pub diagram: Option<PathBuf>,
    /// Publish random node states for the diagram's entities
    #[serde(default)]
    pub demo: bool,
    #[serde(default = "default_demo_interval_ms")]
    pub demo_interval_ms: u64,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_emit_interval_ms() -> u64 {
    10
}

fn default_demo_interval_ms() -> u64 {
    500
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            emit_interval_ms: default_emit_interval_ms(),
            diagram: None,
            demo: false,
            demo_interval_ms: default_demo_interval_ms(),
        }
    }
}

impl BtLiveConfig {
    /// Override fields from env vars, ignoring unparsable values.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("BT_LIVE_URL") {
            self.client.url = v;
        }
        if let Ok(v) = std::env::var("BT_LIVE_WATCHDOG_TIMEOUT_MS") {
            if let Ok(n) = v.parse::<u64>() {
                self.client.watchdog_timeout_ms = n;
            }
        }
        if let Ok(v) = std::env::var("BT_LIVE_BIND") {
            self.server.bind = v;
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &Path) -> Result<BtLiveConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: BtLiveConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    Ok(config)
}
