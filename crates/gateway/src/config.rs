use common::{Environment, LogLevel};
use inference::DetectorConfig;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub log_level: LogLevel,
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    /// Detections must score strictly above this to be returned.
    pub confidence_threshold: f32,
    pub max_upload_bytes: usize,
    /// When set, every upload is written here before decoding.
    pub debug_upload_path: Option<PathBuf>,
    pub otel_endpoint: Option<String>,
    #[serde(default)]
    pub detector: DetectorConfig,
}

impl Config {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(config::ConfigError::Message(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        self.detector
            .validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))
    }
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let config = config::Config::builder()
        .set_default("log_level", "info")?
        .set_default("environment", "development")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 5000_i64)?
        .set_default("confidence_threshold", 0.10_f64)?
        .set_default("max_upload_bytes", 16_i64 * 1024 * 1024)?
        .add_source(
            config::Environment::with_prefix("GATEWAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: Config = config.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}
