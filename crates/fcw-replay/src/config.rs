//! Replay configuration

use anyhow::Context;
use fcw_tracker::GuardConfig;
use fcw_vision::{CameraConfig, ProjectorConfig};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable naming an optional configuration file
pub const CONFIG_FILE_VAR: &str = "FCW_CONFIG";

/// Prefix of environment overrides, e.g. `FCW__GUARD__SAFETY_RADIUS=30`
pub const ENV_PREFIX: &str = "FCW";

/// Replay configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub guard: GuardConfig,
    pub camera: CameraConfig,
    pub projector: ProjectorConfig,
    /// Detection log; stdin when unset
    pub input: Option<PathBuf>,
    /// Whether boxes come from rectified frames, unless a frame says otherwise
    pub rectified: bool,
    /// Print Prometheus metrics to stderr when the replay ends
    pub metrics: bool,
}

impl ReplayConfig {
    /// Load configuration from `.env`, the optional config file and the
    /// environment, later sources winning
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();
        if let Ok(path) = std::env::var(CONFIG_FILE_VAR) {
            builder = builder.add_source(config::File::with_name(&path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build().context("Failed to read configuration")?;
        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    #[test]
    fn test_empty_sources_give_defaults() {
        let config: ReplayConfig = Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.guard, GuardConfig::default());
        assert!(config.input.is_none());
        assert!(!config.metrics);
    }

    #[test]
    fn test_file_source() {
        let json = r#"{
            "guard": {"safety_radius": 30.0, "prediction_length": 2.0},
            "camera": {
                "k": [[800.0, 0.0, 320.0], [0.0, 800.0, 240.0], [0.0, 0.0, 1.0]],
                "extrinsic": {"type": "mount", "height": 1.2}
            },
            "rectified": true
        }"#;
        let config: ReplayConfig = Config::builder()
            .add_source(File::from_str(json, FileFormat::Json))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.guard.safety_radius, 30.0);
        assert_eq!(config.guard.prediction_step, 0.1);
        assert!(config.rectified);
        assert!(config.camera.build().is_ok());
    }
}
