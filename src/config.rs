//! Floor-plan analysis service configuration

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub inference: InferenceConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub environment: String,
    /// Empty list permits any origin.
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    pub device: String,
    pub confidence_threshold: f32,
    /// Side length of the square model input.
    pub input_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub weights_path: PathBuf,
    pub weights_url: String,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default_path() -> &'static str {
        "config.toml"
    }

    /// Apply `PORT` and `ENV` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::var("PORT").ok(), std::env::var("ENV").ok());
    }

    fn apply_overrides(&mut self, port: Option<String>, environment: Option<String>) {
        if let Some(port) = port.and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(environment) = environment.filter(|e| !e.is_empty()) {
            self.server.environment = environment;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: 5000,
                environment: "local".to_string(),
                allowed_origins: Vec::new(),
            },
            inference: InferenceConfig {
                device: "CPU".to_string(),
                confidence_threshold: 0.7,
                input_size: 1024,
            },
            model: ModelConfig {
                weights_path: PathBuf::from("weights/floorplan_maskrcnn.onnx"),
                weights_url:
                    "https://storage.googleapis.com/planscan-models/floorplan_maskrcnn.onnx"
                        .to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.environment, "local");
        assert!(config.server.allowed_origins.is_empty());
        assert_eq!(config.inference.input_size, 1024);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = Config::default();
        config.apply_overrides(Some("8080".to_string()), Some("production".to_string()));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, "production");
    }

    #[test]
    fn test_invalid_or_missing_overrides_keep_file_values() {
        let mut config = Config::default();
        config.apply_overrides(Some("not-a-port".to_string()), None);
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.environment, "local");
    }
}
