//! # Flodvakt Configuration System
//!
//! Hierarchical configuration for the capture agent.
//!
//! ## Features
//! - **Layered sources**: defaults → `config/flodvakt.yaml` → `FLODVAKT_*`
//!   environment variables
//! - **Validation**: every loaded configuration is validated before use;
//!   a missing or invalid value is a startup-fatal condition
//! - **Required keys**: the sink address and the primary adapter fragment
//!   carry no defaults; an agent without them is useless

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod capture;
mod error;
mod queue;
mod sink;
mod validation;

pub use capture::CaptureConfig;
pub use error::ConfigError;
pub use queue::QueueConfig;
pub use sink::SinkConfig;

/// Top-level configuration container for the agent.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct FlodvaktConfig {
    /// Stream-store sink parameters.
    #[validate(nested)]
    pub sink: SinkConfig,

    /// Adapter selection, filters and sampling cadence.
    #[validate(nested)]
    pub capture: CaptureConfig,

    /// Queue capacity and periodic flush cadence.
    #[serde(default)]
    #[validate(nested)]
    pub queue: QueueConfig,
}

impl FlodvaktConfig {
    /// Load configuration from the default file and environment.
    ///
    /// Hierarchy:
    /// 1. `config/flodvakt.yaml` - base settings.
    /// 2. `FLODVAKT_*` environment variables (`__` separates nesting).
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::new();
        if Path::new("config/flodvakt.yaml").exists() {
            figment = figment.merge(Yaml::file("config/flodvakt.yaml"));
        }

        figment
            .merge(Env::prefixed("FLODVAKT_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }

    /// Load configuration from a specific path.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("FLODVAKT_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::{Format, Yaml};

    const MINIMAL: &str = r#"
sink:
  address: "127.0.0.1:9300"
capture:
  primary_adapter: "Ethernet"
"#;

    fn from_yaml(yaml: &str) -> Result<FlodvaktConfig, ConfigError> {
        Figment::new()
            .merge(Yaml::string(yaml))
            .extract::<FlodvaktConfig>()
            .map_err(ConfigError::from)
            .and_then(|config| {
                config.validate()?;
                Ok(config)
            })
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let config = from_yaml(MINIMAL).unwrap();
        assert_eq!(config.sink.retry_delay_secs, 10);
        assert_eq!(config.queue.max_queue_size, 10000);
        assert_eq!(config.capture.filters, vec!["tcp", "udp"]);
    }

    #[test]
    fn missing_sink_address_is_fatal() {
        let yaml = r#"
capture:
  primary_adapter: "Ethernet"
"#;
        assert!(from_yaml(yaml).is_err());
    }

    #[test]
    fn out_of_range_queue_size_is_fatal() {
        let yaml = r#"
sink:
  address: "127.0.0.1:9300"
capture:
  primary_adapter: "Ethernet"
queue:
  max_queue_size: 0
"#;
        assert!(from_yaml(yaml).is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        assert!(matches!(
            FlodvaktConfig::load_from_path("does/not/exist.yaml"),
            Err(ConfigError::FileNotFound(_))
        ));
    }
}
