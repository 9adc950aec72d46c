use std::{
    env, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use reqwest::Url;
use serde::Deserialize;
use tracing::warn;

use crate::{
    error::{ConfigError, FieldIssue},
    schema::is_canonical_uuid,
};

pub const PRODUCTION_BASE_URL: &str = "https://api.bluum.finance/v1";
pub const SANDBOX_BASE_URL: &str = "https://sandbox.api.bluum.finance/v1";
const DEFAULT_CONFIG_PATH: &str = "config/bluum.config.json";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Sandbox,
    Production,
}

impl Environment {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sandbox" => Some(Self::Sandbox),
            "production" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Stdio,
    Http,
}

impl TransportMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "stdio" => Some(Self::Stdio),
            "http" => Some(Self::Http),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub environment: Option<String>,
    pub base_url: Option<String>,
    pub default_account_id: Option<String>,
    pub transport: Option<String>,
    pub bind_addr: Option<String>,
    pub http_api_key: Option<String>,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_secret: String,
    pub environment: Environment,
    pub base_url_override: Option<String>,
    pub default_account_id: Option<String>,
    pub transport: TransportMode,
    pub bind_addr: SocketAddr,
    pub http_api_key: Option<String>,
    pub request_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let lookup = |key: &str| env::var(key).ok();
        let path = non_blank(lookup("BLUUM_CONFIG_PATH"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let file = read_file_config(&path);
        Self::resolve(file, lookup)
    }

    // Precedence per field: config file, then environment, then default.
    pub fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let pick = |from_file: Option<String>, key: &str| non_blank(from_file).or_else(|| non_blank(env(key)));
        let mut issues = Vec::new();

        let api_key = pick(file.api_key, "BLUUM_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            issues.push(FieldIssue::new("apiKey", "API key is required"));
        }

        let api_secret = pick(file.api_secret, "BLUUM_API_SECRET").unwrap_or_default();
        if api_secret.is_empty() {
            issues.push(FieldIssue::new("apiSecret", "API secret is required"));
        }

        let environment = match pick(file.environment, "BLUUM_ENV") {
            None => Environment::Sandbox,
            Some(raw) => Environment::parse(&raw).unwrap_or_else(|| {
                issues.push(FieldIssue::new(
                    "environment",
                    format!("Invalid enum value. Expected 'sandbox' | 'production', received '{raw}'"),
                ));
                Environment::Sandbox
            }),
        };

        let base_url_override = pick(file.base_url, "BLUUM_BASE_URL");
        if let Some(url) = &base_url_override {
            if !is_http_url(url) {
                issues.push(FieldIssue::new("baseUrl", "Invalid url"));
            }
        }

        let default_account_id = pick(file.default_account_id, "BLUUM_DEFAULT_ACCOUNT_ID");
        if let Some(id) = &default_account_id {
            if !is_canonical_uuid(id) {
                issues.push(FieldIssue::new("defaultAccountId", "Invalid uuid"));
            }
        }

        let transport = match pick(file.transport, "BLUUM_TRANSPORT") {
            None => TransportMode::Stdio,
            Some(raw) => TransportMode::parse(&raw).unwrap_or_else(|| {
                issues.push(FieldIssue::new(
                    "transport",
                    format!("Invalid enum value. Expected 'stdio' | 'http', received '{raw}'"),
                ));
                TransportMode::Stdio
            }),
        };

        let bind_raw = pick(file.bind_addr, "BLUUM_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_normalized = bind_raw.trim_matches('"').trim_matches('\'');
        let bind_addr = bind_normalized.parse::<SocketAddr>().unwrap_or_else(|_| {
            issues.push(FieldIssue::new(
                "bindAddr",
                format!("Invalid socket address: {bind_normalized}"),
            ));
            SocketAddr::from(([127, 0, 0, 1], 8080))
        });

        let http_api_key = pick(file.http_api_key, "BLUUM_HTTP_API_KEY");
        if transport == TransportMode::Http && http_api_key.is_none() {
            issues.push(FieldIssue::new(
                "httpApiKey",
                "HTTP transport requires an API key",
            ));
        }

        let timeout_seconds = match file.request_timeout_seconds {
            Some(seconds) => seconds,
            None => match non_blank(env("BLUUM_REQUEST_TIMEOUT_SECONDS")) {
                None => DEFAULT_TIMEOUT_SECONDS,
                Some(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
                    issues.push(FieldIssue::new(
                        "requestTimeoutSeconds",
                        format!("Expected a whole number of seconds, received '{raw}'"),
                    ));
                    DEFAULT_TIMEOUT_SECONDS
                }),
            },
        };
        if timeout_seconds == 0 {
            issues.push(FieldIssue::new(
                "requestTimeoutSeconds",
                "Number must be greater than or equal to 1",
            ));
        }

        if !issues.is_empty() {
            return Err(ConfigError { issues });
        }

        Ok(Self {
            api_key,
            api_secret,
            environment,
            base_url_override,
            default_account_id,
            transport,
            bind_addr,
            http_api_key,
            request_timeout: Duration::from_secs(timeout_seconds),
        })
    }

    pub fn base_url(&self) -> String {
        if let Some(url) = &self.base_url_override {
            return url.trim_end_matches('/').to_string();
        }
        match self.environment {
            Environment::Production => PRODUCTION_BASE_URL.to_string(),
            Environment::Sandbox => SANDBOX_BASE_URL.to_string(),
        }
    }
}

pub fn read_file_config(path: &Path) -> FileConfig {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(
                "Could not load config from {}: {err}. Falling back to environment variables.",
                path.display()
            );
            return FileConfig::default();
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!(
            "Config file {} is not valid JSON: {err}. Falling back to environment variables.",
            path.display()
        );
        FileConfig::default()
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, io::Write};

    use super::*;

    const ACCOUNT: &str = "11111111-1111-1111-1111-111111111111";

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn credentials() -> Vec<(&'static str, &'static str)> {
        vec![("BLUUM_API_KEY", "env-key"), ("BLUUM_API_SECRET", "env-secret")]
    }

    #[test]
    fn environment_only_config_uses_sandbox_defaults() {
        let config = Config::resolve(FileConfig::default(), env_of(&credentials())).unwrap();
        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.environment, Environment::Sandbox);
        assert_eq!(config.base_url(), SANDBOX_BASE_URL);
        assert_eq!(config.transport, TransportMode::Stdio);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.default_account_id, None);
    }

    #[test]
    fn file_values_win_over_environment() {
        let file = FileConfig {
            api_key: Some("file-key".to_string()),
            environment: Some("production".to_string()),
            ..FileConfig::default()
        };
        let mut env = credentials();
        env.push(("BLUUM_ENV", "sandbox"));
        let config = Config::resolve(file, env_of(&env)).unwrap();
        assert_eq!(config.api_key, "file-key");
        assert_eq!(config.api_secret, "env-secret");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.base_url(), PRODUCTION_BASE_URL);
    }

    #[test]
    fn blank_file_values_fall_through() {
        let file = FileConfig {
            api_key: Some("   ".to_string()),
            ..FileConfig::default()
        };
        let config = Config::resolve(file, env_of(&credentials())).unwrap();
        assert_eq!(config.api_key, "env-key");
    }

    #[test]
    fn base_url_override_beats_environment() {
        let mut env = credentials();
        env.push(("BLUUM_ENV", "production"));
        env.push(("BLUUM_BASE_URL", "http://localhost:4010/v1/"));
        let config = Config::resolve(FileConfig::default(), env_of(&env)).unwrap();
        assert_eq!(config.base_url(), "http://localhost:4010/v1");
    }

    #[test]
    fn missing_credentials_report_every_field() {
        let err = Config::resolve(FileConfig::default(), env_of(&[])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: apiKey: API key is required, apiSecret: API secret is required"
        );
    }

    #[test]
    fn malformed_values_are_rejected() {
        let mut env = credentials();
        env.extend([
            ("BLUUM_ENV", "staging"),
            ("BLUUM_BASE_URL", "ftp://example.com"),
            ("BLUUM_DEFAULT_ACCOUNT_ID", "acct-1"),
            ("BLUUM_REQUEST_TIMEOUT_SECONDS", "soon"),
        ]);
        let err = Config::resolve(FileConfig::default(), env_of(&env)).unwrap_err();
        let fields: Vec<&str> = err.issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            fields,
            vec!["environment", "baseUrl", "defaultAccountId", "requestTimeoutSeconds"]
        );
    }

    #[test]
    fn http_transport_needs_its_own_key() {
        let mut env = credentials();
        env.push(("BLUUM_TRANSPORT", "http"));
        let err = Config::resolve(FileConfig::default(), env_of(&env)).unwrap_err();
        assert_eq!(err.issues[0].path, "httpApiKey");

        env.push(("BLUUM_HTTP_API_KEY", "local-token"));
        env.push(("BLUUM_BIND_ADDR", "\"0.0.0.0:9000\""));
        let config = Config::resolve(FileConfig::default(), env_of(&env)).unwrap();
        assert_eq!(config.transport, TransportMode::Http);
        assert_eq!(config.bind_addr, SocketAddr::from(([0, 0, 0, 0], 9000)));
    }

    #[test]
    fn default_account_id_must_be_uuid() {
        let mut env = credentials();
        env.push(("BLUUM_DEFAULT_ACCOUNT_ID", ACCOUNT));
        let config = Config::resolve(FileConfig::default(), env_of(&env)).unwrap();
        assert_eq!(config.default_account_id.as_deref(), Some(ACCOUNT));
    }

    #[test]
    fn reads_camel_case_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"apiKey":"k","apiSecret":"s","environment":"production","defaultAccountId":"{ACCOUNT}","requestTimeoutSeconds":5}}"#
        )
        .unwrap();

        let parsed = read_file_config(file.path());
        assert_eq!(parsed.api_key.as_deref(), Some("k"));
        assert_eq!(parsed.request_timeout_seconds, Some(5));

        let config = Config::resolve(parsed, env_of(&[])).unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn unreadable_or_invalid_file_falls_back_to_defaults() {
        let missing = read_file_config(Path::new("/definitely/not/here.json"));
        assert!(missing.api_key.is_none());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let invalid = read_file_config(file.path());
        assert!(invalid.api_secret.is_none());
    }
}
