//! Configuration loading, defaulting and validation.
//!
//! Mirrors the original's `config.toml` / `config.<env>.toml` resolution:
//! [`load`] reads the file named by `--env`, applies the same defaults the
//! original hardcodes, and runs the same startup-fatal checks (path
//! collisions, TLS cert/key presence, internal-suffix normalization)
//! before the supervisor is allowed to start a single listener.

use serde::Deserialize;
use std::path::Path;

use crate::error::app::{AppError, ConfigErrorStruct};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Not read from the file; forces the log level to `debug` regardless
    /// of `logger.level` when set, matching the original's always-on flag.
    #[serde(skip, default = "default_debug")]
    pub debug: bool,
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub logger: LoggerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            debug: true,
            service: ServiceConfig::default(),
            storage: StorageConfig::default(),
            logger: LoggerConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceConfig {
    pub upstream: UpstreamConfig,
    pub tls: TlsConfig,
    pub internal_suffix: Vec<String>,
    pub ip: String,
    pub quit_wait_timeout: u64,
    pub http: HttpConfig,
    pub udp: PortConfig,
    pub tcp: PortConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct UpstreamConfig {
    pub addrs: Vec<String>,
    pub http_proxy: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct TlsConfig {
    pub port: u16,
    pub cert_file: String,
    pub key_file: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpConfig {
    pub cert_file: String,
    pub key_file: String,
    pub authorization: String,
    pub dns_query_path: String,
    pub json_query_path: String,
    pub register_path: String,
    pub delete_path: String,
    pub port: u16,
    pub ssl_port: u16,
    pub dns_query_auth: bool,
    pub json_query_auth: bool,
    pub register_auth: bool,
    pub delete_auth: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct PortConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageConfig {
    pub use_expire: bool,
    #[serde(rename = "type")]
    pub type_: String,
    pub config: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerConfig {
    pub level: String,
    pub output: String,
    pub encode: String,
    pub time_format: String,
    pub no_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            level: "debug".to_string(),
            output: String::new(),
            encode: "console".to_string(),
            time_format: "y-m-d h:i:s".to_string(),
            no_color: false,
        }
    }
}

fn default_debug() -> bool {
    true
}

impl Config {
    /// Number of configured upstreams; external forwarding is enabled iff
    /// this is nonzero.
    pub fn upstream_count(&self) -> usize {
        self.service.upstream.addrs.len()
    }

    /// True iff at least one internal suffix is configured; the record
    /// store and its management endpoints are only meaningful then.
    pub fn has_internal_zone(&self) -> bool {
        !self.service.internal_suffix.is_empty()
    }

    fn validate(&mut self) -> Result<(), AppError> {
        let http = &self.service.http;
        if !http.dns_query_path.is_empty() && http.dns_query_path == http.json_query_path {
            return Err(AppError::Config(ConfigErrorStruct::new(
                "service.http.dnsQueryPath and service.http.jsonQueryPath must differ",
            )));
        }

        if self.service.tls.port > 0 {
            if self.service.tls.cert_file.is_empty() {
                return Err(AppError::Config(ConfigErrorStruct::new(
                    "service.tls.certFile is required when service.tls.port is set",
                )));
            }
            if self.service.tls.key_file.is_empty() {
                return Err(AppError::Config(ConfigErrorStruct::new(
                    "service.tls.keyFile is required when service.tls.port is set",
                )));
            }
        }

        if self.service.http.ssl_port > 0 {
            if self.service.http.cert_file.is_empty() {
                return Err(AppError::Config(ConfigErrorStruct::new(
                    "service.http.certFile is required when service.http.sslPort is set",
                )));
            }
            if self.service.http.key_file.is_empty() {
                return Err(AppError::Config(ConfigErrorStruct::new(
                    "service.http.keyFile is required when service.http.sslPort is set",
                )));
            }
        }

        if (self.service.http.port > 0 || self.service.http.ssl_port > 0)
            && http.dns_query_path.is_empty()
            && http.json_query_path.is_empty()
            && http.register_path.is_empty()
            && http.delete_path.is_empty()
        {
            return Err(AppError::Config(ConfigErrorStruct::new(
                "service.http is enabled but none of its four paths are configured",
            )));
        }

        for suffix in &mut self.service.internal_suffix {
            if !suffix.ends_with('.') {
                suffix.push('.');
            }
        }

        if self.has_internal_zone() {
            if self.storage.type_.is_empty() {
                self.storage.type_ = "memory".to_string();
            } else if self.storage.type_ != "memory" {
                return Err(AppError::Config(ConfigErrorStruct::new(format!(
                    "unsupported storage.type {:?}; only \"memory\" is built in",
                    self.storage.type_
                ))));
            }
        }

        if self.debug {
            self.logger.level = "debug".to_string();
        }

        Ok(())
    }
}

/// True iff `name` (trailing-dot normalized) falls under one of
/// `internal_suffix`.
pub fn is_internal(internal_suffix: &[String], name: &str) -> bool {
    internal_suffix.iter().any(|suffix| name.ends_with(suffix.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_internal_matches_suffix_with_trailing_dot() {
        let suffixes = vec!["dxvgef.test.".to_string()];
        assert!(is_internal(&suffixes, "dxvgef.test."));
        assert!(is_internal(&suffixes, "www.dxvgef.test."));
        assert!(!is_internal(&suffixes, "163.com."));
    }

    #[test]
    fn validate_rejects_clashing_http_paths() {
        let mut config = Config::default();
        config.service.http.dns_query_path = "/dns-query".to_string();
        config.service.http.json_query_path = "/dns-query".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_tls_port_without_cert() {
        let mut config = Config::default();
        config.service.tls.port = 853;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_normalizes_internal_suffix_trailing_dot() {
        let mut config = Config::default();
        config.service.internal_suffix = vec!["dxvgef.test".to_string()];
        config.validate().unwrap();
        assert_eq!(config.service.internal_suffix, vec!["dxvgef.test.".to_string()]);
    }

    #[test]
    fn validate_defaults_storage_type_when_internal_zone_present() {
        let mut config = Config::default();
        config.service.internal_suffix = vec!["dxvgef.test.".to_string()];
        config.validate().unwrap();
        assert_eq!(config.storage.type_, "memory");
    }

    #[test]
    fn validate_rejects_unsupported_storage_type() {
        let mut config = Config::default();
        config.service.internal_suffix = vec!["dxvgef.test.".to_string()];
        config.storage.type_ = "redis".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_flag_forces_debug_log_level() {
        let mut config = Config::default();
        config.debug = true;
        config.logger.level = "error".to_string();
        config.validate().unwrap();
        assert_eq!(config.logger.level, "debug");
    }
}

/// Resolve `./config.toml` (no env) or `./config.<env>.toml`, parse and
/// validate it. Any failure here is startup-fatal.
pub fn load(env: &str) -> Result<Config, AppError> {
    let env = env.to_lowercase();
    let path = if env.is_empty() {
        "./config.toml".to_string()
    } else {
        format!("./config.{env}.toml")
    };

    let text = std::fs::read_to_string(Path::new(&path)).map_err(|e| {
        AppError::Config(ConfigErrorStruct::new(format!(
            "could not read config file {path}: {e}"
        )))
    })?;

    let mut config: Config = toml::from_str(&text)?;
    config.validate()?;
    Ok(config)
}
