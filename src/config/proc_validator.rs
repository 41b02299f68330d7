//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - endpoint / issuer exclusivity and URL shape
//! - timeout and cache ttl bounds
//! - server, metrics and logging invariants

use tracing::info;
use url::Url;

use crate::config::introspection::{IntrospectionSettings, ServiceConfig};
use crate::config::settings::SettingsConfig;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_introspection(&cfg.introspection, &mut errors);

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        Err(errors)
    }
}

/// SETTINGS VALIDATION
fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if settings.server.host.is_empty() {
        errors.push("settings.server.host must not be empty".to_string());
    }
    if settings.server.port.parse::<u16>().is_err() {
        errors.push(format!(
            "settings.server.port '{}' must be an integer in range 0-65535",
            settings.server.port
        ));
    }
    if !settings.server.validate_path.starts_with('/') {
        errors.push(format!(
            "settings.server.validate_path '{}' must start with '/'",
            settings.server.validate_path
        ));
    }

    // metrics endpoint start with '/'
    let metrics = &settings.metrics;
    if !metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            metrics.path
        ));
    }
    if metrics.is_enabled && metrics.path == settings.server.validate_path {
        errors.push(format!(
            "settings.metrics.path and settings.server.validate_path both use '{}'",
            metrics.path
        ));
    }

    // logging level
    if let Some(logging) = &settings.logging {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' invalid; allowed: {:?}",
                logging.level, valid
            ));
        }
    }
}

/// INTROSPECTION AUTHORITY
fn validate_introspection(cfg: &IntrospectionSettings, errors: &mut Vec<String>) {
    match (&cfg.endpoint, &cfg.issuer) {
        (Some(_), Some(_)) => {
            errors.push("introspection: set either 'endpoint' or 'issuer', not both".to_string())
        }
        (None, None) => {
            errors.push("introspection: one of 'endpoint' or 'issuer' is required".to_string())
        }
        (Some(endpoint), None) => validate_http_url("introspection.endpoint", endpoint, errors),
        (None, Some(issuer)) => validate_http_url("introspection.issuer", issuer, errors),
    }

    if cfg.timeout_ms == 0 {
        errors.push("introspection.timeout_ms must be > 0".to_string());
    }

    if let Some(cache) = &cfg.cache {
        if cache.ttl_seconds == 0 {
            errors.push("introspection.cache.ttl_seconds must be > 0".to_string());
        }
    }

    if let Some(client_auth) = &cfg.client_auth {
        if client_auth.client_id.is_empty() {
            errors.push("introspection.client_auth.client_id must not be empty".to_string());
        }
        if client_auth.client_id.contains(':') {
            errors.push("introspection.client_auth.client_id must not contain ':'".to_string());
        }
    }

    for name in cfg.body.keys() {
        if name.is_empty() {
            errors.push("introspection.body contains an empty field name".to_string());
        }
    }
}

fn validate_http_url(path: &str, value: &str, errors: &mut Vec<String>) {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(format!(
            "{} '{}' must use http or https, got '{}'",
            path,
            value,
            url.scheme()
        )),
        Err(e) => errors.push(format!("{} '{}' is not an absolute URL: {}", path, value, e)),
    }
}
