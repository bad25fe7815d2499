//! Registry resolver configuration

use std::path::Path;
use std::time::Duration;

use oci_client::client::{ClientConfig, ClientProtocol};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Transport used to reach registries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    #[default]
    Https,
}

/// Settings for the OCI client used to resolve digests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Protocol for every registry not listed in `insecure_registries`
    #[serde(default)]
    pub protocol: Protocol,

    /// Registries reached over plain HTTP even when `protocol` is https
    #[serde(default)]
    pub insecure_registries: Vec<String>,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Read timeout in seconds
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    #[serde(default)]
    pub accept_invalid_certificates: bool,
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_read_timeout_secs() -> u64 {
    300
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::default(),
            insecure_registries: Vec::new(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            accept_invalid_certificates: false,
        }
    }
}

impl ResolverConfig {
    /// Load configuration from a YAML file.
    ///
    /// A missing file yields the default configuration.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "resolver config not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build the `oci_client` configuration for these settings
    pub fn client_config(&self) -> ClientConfig {
        let protocol = match self.protocol {
            Protocol::Http => ClientProtocol::Http,
            Protocol::Https if self.insecure_registries.is_empty() => ClientProtocol::Https,
            Protocol::Https => ClientProtocol::HttpsExcept(self.insecure_registries.clone()),
        };

        ClientConfig {
            protocol,
            accept_invalid_certificates: self.accept_invalid_certificates,
            connect_timeout: Some(Duration::from_secs(self.connect_timeout_secs)),
            read_timeout: Some(Duration::from_secs(self.read_timeout_secs)),
            ..Default::default()
        }
    }
}
