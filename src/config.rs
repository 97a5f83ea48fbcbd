use serde::Deserialize;
use std::env;
use std::fs;
use std::net::IpAddr;
use std::path::Path;

/// Upper bound accepted for `max_input_bytes`.
pub const MAX_INPUT_BYTES_CEILING: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_true")]
    pub health: bool,
    #[serde(default = "default_true")]
    pub metrics: bool,
    #[serde(default = "default_true")]
    pub example_json: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            health: true,
            metrics: true,
            example_json: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_input_bytes() -> usize {
    64 * 1024
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub max_input_bytes: usize,
    pub tls_cert: Option<String>,
    pub tls_key: Option<String>,
    pub endpoints: EndpointConfig,
    pub config_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            max_input_bytes: default_max_input_bytes(),
            tls_cert: None,
            tls_key: None,
            endpoints: EndpointConfig::default(),
            config_path: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    host: Option<String>,
    port: Option<u16>,
    log_level: Option<String>,
    max_input_bytes: Option<usize>,
    tls_cert: Option<String>,
    tls_key: Option<String>,
    #[serde(default)]
    endpoints: Option<EndpointConfig>,
}

struct YamlConfigWithPath {
    config: YamlConfig,
    path: Option<String>,
}

#[derive(Debug)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v.parse().unwrap_or(default))
        .unwrap_or(default)
}

impl Config {
    pub fn load() -> Self {
        let yaml_result = Self::load_yaml();
        let yaml_config = yaml_result.config;
        let config_path = yaml_result.path;

        let host = env::var("CSR_PARSER_HOST")
            .ok()
            .or(yaml_config.host)
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_host);

        let port = env::var("CSR_PARSER_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(yaml_config.port)
            .unwrap_or_else(default_port);

        let log_level = env::var("CSR_PARSER_LOG_LEVEL")
            .ok()
            .or(yaml_config.log_level)
            .unwrap_or_else(default_log_level);

        let max_input_bytes = env::var("CSR_PARSER_MAX_INPUT_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(yaml_config.max_input_bytes)
            .unwrap_or_else(default_max_input_bytes);

        let tls_cert = env::var("CSR_PARSER_TLS_CERT").ok().or(yaml_config.tls_cert);
        let tls_key = env::var("CSR_PARSER_TLS_KEY").ok().or(yaml_config.tls_key);

        let base = yaml_config.endpoints.unwrap_or_default();
        let endpoints = EndpointConfig {
            health: env_flag("CSR_PARSER_HEALTH_ENABLED", base.health),
            metrics: env_flag("CSR_PARSER_METRICS_ENABLED", base.metrics),
            example_json: env_flag("CSR_PARSER_EXAMPLE_JSON_ENABLED", base.example_json),
        };

        Self {
            host,
            port,
            log_level,
            max_input_bytes,
            tls_cert,
            tls_key,
            endpoints,
            config_path,
        }
    }

    pub fn validate(&self) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push(ConfigValidationError {
                field: "port".to_string(),
                message: "Port must be greater than 0".to_string(),
            });
        }

        if self.max_input_bytes == 0 {
            errors.push(ConfigValidationError {
                field: "max_input_bytes".to_string(),
                message: "Input size limit must be greater than 0".to_string(),
            });
        } else if self.max_input_bytes > MAX_INPUT_BYTES_CEILING {
            errors.push(ConfigValidationError {
                field: "max_input_bytes".to_string(),
                message: format!(
                    "Input size limit cannot exceed {} bytes",
                    MAX_INPUT_BYTES_CEILING
                ),
            });
        }

        if self.tls_cert.is_some() != self.tls_key.is_some() {
            errors.push(ConfigValidationError {
                field: "tls".to_string(),
                message: "tls_cert and tls_key must be set together".to_string(),
            });
        }

        if self.has_tls() {
            if let Some(ref cert) = self.tls_cert {
                if !Path::new(cert).exists() {
                    errors.push(ConfigValidationError {
                        field: "tls_cert".to_string(),
                        message: format!("TLS certificate file not found: {}", cert),
                    });
                }
            }
            if let Some(ref key) = self.tls_key {
                if !Path::new(key).exists() {
                    errors.push(ConfigValidationError {
                        field: "tls_key".to_string(),
                        message: format!("TLS key file not found: {}", key),
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn load_yaml() -> YamlConfigWithPath {
        let config_paths = [
            env::var("CSR_PARSER_CONFIG").ok(),
            Some("config.yaml".to_string()),
            Some("config.yml".to_string()),
            Some("/etc/csr-parser/config.yaml".to_string()),
        ];

        for path in config_paths.into_iter().flatten() {
            if Path::new(&path).exists() {
                if let Ok(content) = fs::read_to_string(&path) {
                    if let Ok(config) = serde_yaml::from_str::<YamlConfig>(&content) {
                        return YamlConfigWithPath {
                            config,
                            path: Some(path),
                        };
                    }
                }
            }
        }

        YamlConfigWithPath {
            config: YamlConfig::default(),
            path: None,
        }
    }

    pub fn has_tls(&self) -> bool {
        self.tls_cert.is_some() && self.tls_key.is_some()
    }
}
