use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Process configuration, sourced from defaults, an optional TOML file and
/// unprefixed environment variables (in that order of precedence)
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Deployment environment tag (development, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Debug mode; exposes `/docs` and disables host-trust enforcement
    #[serde(default)]
    pub debug: bool,

    /// Origins accepted by the CORS layer
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Host header values accepted when host trust is enforced ("*" accepts all)
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,

    /// Proxy addresses whose X-Forwarded-For / X-Real-IP headers are believed
    #[serde(default)]
    pub trusted_proxies: Vec<String>,

    /// Address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable per-request tracing spans
    #[serde(default)]
    pub enable_tracing: bool,

    /// Requests admitted per key within one rate limit window
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: u32,

    /// Rate limit window length in seconds
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    /// Largest accepted request body, in bytes
    #[serde(default = "default_max_request_size")]
    pub max_request_size: u64,

    /// Per-probe timeout for health checks, in milliseconds
    #[serde(default = "default_health_probe_timeout_ms")]
    pub health_probe_timeout_ms: u64,

    /// Upper bound on a single service initializer, in seconds
    #[serde(default = "default_service_init_timeout_secs")]
    pub service_init_timeout_secs: u64,

    /// Time allowed for in-flight requests to drain before services stop
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Directory holding the single-page application build
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// What to do with requests that carry no tenant context
    #[serde(default)]
    pub tenant_policy: TenantPolicy,

    /// Tenant assigned under the fallback policy
    #[serde(default = "default_tenant")]
    pub default_tenant: String,

    /// Primary database connection string
    #[serde(default)]
    pub database_url: Option<String>,

    /// Cache connection string
    #[serde(default)]
    pub redis_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TenantPolicy {
    /// Assign the default tenant
    #[default]
    Fallback,
    /// Reject with 400
    Reject,
}

impl AppConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("chatbot.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("environment", default_environment())?
            .set_default("debug", false)?
            .set_default("allowed_origins", default_allowed_origins())?
            .set_default("allowed_hosts", default_allowed_hosts())?
            .set_default("trusted_proxies", Vec::<String>::new())?
            .set_default("host", default_host())?
            .set_default("port", default_port())?
            .set_default("log_level", default_log_level())?
            .set_default("enable_tracing", false)?
            .set_default("rate_limit_requests", default_rate_limit_requests())?
            .set_default("rate_limit_window_secs", default_rate_limit_window_secs())?
            .set_default("max_request_size", default_max_request_size())?
            .set_default("health_probe_timeout_ms", default_health_probe_timeout_ms())?
            .set_default(
                "service_init_timeout_secs",
                default_service_init_timeout_secs(),
            )?
            .set_default("shutdown_grace_secs", default_shutdown_grace_secs())?
            .set_default("static_dir", default_static_dir())?
            .set_default("tenant_policy", "fallback")?
            .set_default("default_tenant", default_tenant())?
            .add_source(File::with_name(&path_str).required(false))
            // Unprefixed variables: ENVIRONMENT, DEBUG, ALLOWED_ORIGINS, PORT, ...
            .add_source(
                Environment::default()
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_origins")
                    .with_list_parse_key("allowed_hosts")
                    .with_list_parse_key("trusted_proxies"),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Message(
                "Port must be greater than 0".to_string(),
            ));
        }

        if self.host.parse::<IpAddr>().is_err() {
            return Err(ConfigError::Message(format!(
                "Host '{}' is not a valid IP address",
                self.host
            )));
        }

        if self.rate_limit_requests == 0 {
            return Err(ConfigError::Message(
                "rate_limit_requests must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit_window_secs == 0 {
            return Err(ConfigError::Message(
                "rate_limit_window_secs must be greater than 0".to_string(),
            ));
        }

        if self.health_probe_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "health_probe_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.service_init_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "service_init_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.default_tenant.trim().is_empty() {
            return Err(ConfigError::Message(
                "default_tenant must not be empty".to_string(),
            ));
        }

        if let Some(proxy) = self
            .trusted_proxies
            .iter()
            .find(|p| p.trim().parse::<IpAddr>().is_err())
        {
            return Err(ConfigError::Message(format!(
                "Trusted proxy '{}' is not a valid IP address",
                proxy
            )));
        }

        if self.allowed_hosts.is_empty() {
            return Err(ConfigError::Message(
                "allowed_hosts must list at least one host (use \"*\" to accept any)"
                    .to_string(),
            ));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Host header checks apply outside debug mode unless every host is allowed
    pub fn enforces_trusted_hosts(&self) -> bool {
        !self.debug && !self.allowed_hosts.iter().any(|h| h == "*")
    }

    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.trim().parse().map_err(|e| {
            ConfigError::Message(format!("Invalid bind address '{}': {}", self.host, e))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Parsed `trusted_proxies`; entries that are not IP addresses are skipped
    pub fn trusted_proxy_addrs(&self) -> Vec<IpAddr> {
        self.trusted_proxies
            .iter()
            .filter_map(|p| p.trim().parse().ok())
            .collect()
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn health_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.health_probe_timeout_ms)
    }

    pub fn service_init_timeout(&self) -> Duration {
        Duration::from_secs(self.service_init_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn static_path(&self) -> PathBuf {
        PathBuf::from(&self.static_dir)
    }

    /// Render the configuration as a TOML document
    pub fn to_toml(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            debug: false,
            allowed_origins: default_allowed_origins(),
            allowed_hosts: default_allowed_hosts(),
            trusted_proxies: Vec::new(),
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            enable_tracing: false,
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            max_request_size: default_max_request_size(),
            health_probe_timeout_ms: default_health_probe_timeout_ms(),
            service_init_timeout_secs: default_service_init_timeout_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            static_dir: default_static_dir(),
            tenant_policy: TenantPolicy::default(),
            default_tenant: default_tenant(),
            database_url: None,
            redis_url: None,
        }
    }
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

fn default_allowed_hosts() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rate_limit_requests() -> u32 {
    60
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_max_request_size() -> u64 {
    100 * 1024 * 1024
}

fn default_health_probe_timeout_ms() -> u64 {
    3000
}

fn default_service_init_timeout_secs() -> u64 {
    30
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

fn default_static_dir() -> String {
    "./static".to_string()
}

fn default_tenant() -> String {
    "default".to_string()
}
