//! Server configuration loaded from a JSON file
//!
//! The file shares its format with the desktop client, so client-side keys
//! may be present and are ignored here.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use shared::{DEFAULT_ADDRESS, DEFAULT_PORT};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServerConfig {
    pub server_ip_address: String,
    pub server_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_ip_address: DEFAULT_ADDRESS.to_string(),
            server_port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Loads `path`, falling back to defaults when it is missing or invalid
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Config file '{}' not found, using defaults",
                    path.display()
                );
                Self::default()
            }
            Err(e) => {
                warn!("{} ({}), using defaults", e, path.display());
                Self::default()
            }
        }
    }

    /// `host:port`, bracketing IPv6 literals
    pub fn bind_address(&self) -> String {
        if self.server_ip_address.contains(':') {
            format!("[{}]:{}", self.server_ip_address, self.server_port)
        } else {
            format!("{}:{}", self.server_ip_address, self.server_port)
        }
    }

    fn normalized(mut self) -> Self {
        if self.server_ip_address.trim().is_empty() {
            self.server_ip_address = DEFAULT_ADDRESS.to_string();
        }
        if self.server_port == 0 {
            self.server_port = DEFAULT_PORT;
        }
        self
    }
}
