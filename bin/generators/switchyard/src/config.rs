//! Configuration for switchyard.

use std::{num::NonZeroUsize, path::Path};

use anyhow::{Context as _, Error as GenericError};
use serde::Deserialize;
use sha3::{Digest, Sha3_256};
use switchyard_topology::{config::TopologyConfig, Flag};

/// A seed value that can be deserialized from an arbitrary string.
///
/// The string is hashed using SHA3-256 to produce a 32-byte seed for the RNG.
#[derive(Clone, Debug)]
pub struct Seed(pub [u8; 32]);

impl<'de> Deserialize<'de> for Seed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Seed(Sha3_256::digest(s.as_bytes()).into()))
    }
}

/// Configuration file format.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Format {
    /// YAML document.
    Yaml,

    /// JSON document.
    Json,
}

impl Format {
    /// Picks the format based on the file extension, defaulting to YAML.
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Preview settings.
#[derive(Clone, Debug, Deserialize)]
pub struct PreviewConfig {
    /// Number of simulated calls made to every active route.
    #[serde(default = "default_iterations")]
    pub iterations: NonZeroUsize,
}

const DEFAULT_ITERATIONS: NonZeroUsize = NonZeroUsize::new(1000).unwrap();

const fn default_iterations() -> NonZeroUsize {
    DEFAULT_ITERATIONS
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
        }
    }
}

/// Root configuration for switchyard.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Seed string for deterministic generation.
    ///
    /// When the same configuration is used multiple times, with an identical seed, the same per-service random sources
    /// are derived and the same preview is produced.
    pub seed: Seed,

    /// Feature flags that routes and resource attribute sets can be gated on.
    #[serde(default)]
    pub flags: Vec<Flag>,

    /// The service topology.
    pub topology: TopologyConfig,

    /// Preview settings.
    #[serde(default)]
    pub preview: PreviewConfig,
}

impl Config {
    /// Attempts to load a serialized `Config` from the given file path.
    ///
    /// Files with a `.json` extension are parsed as JSON, and everything else as YAML.
    ///
    /// # Errors
    ///
    /// If an error occurs while reading the file, or deserializing the configuration data, it will be returned.
    pub fn try_from_file<P>(config_path: P) -> Result<Self, GenericError>
    where
        P: AsRef<Path>,
    {
        let config_path = config_path.as_ref();
        let config_file_raw = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read configuration file '{}'.", config_path.display()))?;

        Self::try_from_str(&config_file_raw, Format::from_path(config_path))
    }

    fn try_from_str(raw: &str, format: Format) -> Result<Self, GenericError> {
        let config = match format {
            Format::Yaml => serde_yaml::from_str(raw).context("Failed to parse configuration file as YAML.")?,
            Format::Json => serde_json::from_str(raw).context("Failed to parse configuration file as JSON.")?,
        };

        Ok(config)
    }
}
