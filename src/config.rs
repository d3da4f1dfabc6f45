use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub processors: ProcessorsConfig,
    #[serde(default)]
    pub dispatch: DispatchSettings,
    #[serde(default)]
    pub health: HealthSettings,
    #[serde(default)]
    pub breaker: BreakerSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProcessorsConfig {
    pub default_url: String,
    pub fallback_url: String,
    pub connect_timeout_ms: u64,
}

impl Default for ProcessorsConfig {
    fn default() -> Self {
        Self {
            default_url: "http://payment-processor-default:8080".to_string(),
            fallback_url: "http://payment-processor-fallback:8080".to_string(),
            connect_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DispatchSettings {
    pub workers: usize,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub call_timeout_ms: u64,
    pub backoff_base_ms: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            batch_size: 16,
            max_attempts: 3,
            call_timeout_ms: 3000,
            backoff_base_ms: 1000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthSettings {
    /// At most one downstream probe per processor per interval.
    pub probe_interval_ms: u64,
    pub probe_timeout_ms: u64,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            probe_interval_ms: 5000,
            probe_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub cooldown_ms: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_ms: 5000,
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        serde_yaml::from_str(&content).expect("Failed to parse config yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let yaml = r#"
log_level: info
log_dir: ./logs
log_file: payrelay.log
use_json: false
rotation: daily
gateway:
  host: 0.0.0.0
  port: 9999
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.gateway.port, 9999);
        assert_eq!(config.dispatch.workers, 4);
        assert_eq!(config.health.probe_interval_ms, 5000);
        assert_eq!(config.breaker.failure_threshold, 5);
        assert!(config.processors.default_url.contains("default"));
    }
}
