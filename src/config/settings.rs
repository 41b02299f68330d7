use serde::Deserialize;

/// ================================
/// Global service-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct SettingsConfig {
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub server: ServerConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_path")]
    pub path: String,
    #[serde(default)]
    pub is_enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            path: default_metrics_path(),
            is_enabled: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: String,
    /// forward-auth route
    #[serde(default = "default_validate_path")]
    pub validate_path: String,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new("info".to_owned(), LogFormat::Compact)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_validate_path() -> String {
    "/validate".to_string()
}
