use crate::error::ServiceError;
use crate::registry::{CapabilityUnavailable, ManagedService, ServiceResult};
use async_trait::async_trait;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};
use url::Url;

/// External dependency reached over TCP, configured by a connection URL
pub struct NetworkDependency {
    name: &'static str,
    setting: &'static str,
    url: Option<String>,
    connect_timeout: Duration,
    endpoint: OnceLock<(String, u16)>,
}

impl NetworkDependency {
    /// `setting` names the configuration key in unavailability reasons
    pub fn new(
        name: &'static str,
        setting: &'static str,
        url: Option<String>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            name,
            setting,
            url,
            connect_timeout,
            endpoint: OnceLock::new(),
        }
    }

    pub fn endpoint(&self) -> Option<(&str, u16)> {
        self.endpoint.get().map(|(host, port)| (host.as_str(), *port))
    }

    async fn connect(&self) -> ServiceResult<Duration> {
        let (host, port) = self
            .endpoint()
            .ok_or_else(|| ServiceError::new(format!("{} endpoint not resolved", self.name)))?;

        let started = Instant::now();
        match timeout(self.connect_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => Ok(started.elapsed()),
            Ok(Err(e)) => Err(ServiceError::new(format!(
                "{}:{} unreachable: {}",
                host, port, e
            ))),
            Err(_) => Err(ServiceError::new(format!(
                "{}:{} did not accept a connection within {:?}",
                host, port, self.connect_timeout
            ))),
        }
    }
}

/// Port used when the URL carries none
fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "postgres" | "postgresql" => Some(5432),
        "mysql" => Some(3306),
        "redis" => Some(6379),
        "rediss" => Some(6380),
        "mongodb" => Some(27017),
        _ => None,
    }
}

pub(crate) fn parse_endpoint(raw: &str) -> Result<(String, u16), String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid URL: {}", e))?;
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| "URL has no host".to_string())?;
    let port = url
        .port_or_known_default()
        .or_else(|| default_port(url.scheme()))
        .ok_or_else(|| format!("no port for scheme '{}'", url.scheme()))?;

    Ok((host.trim_matches(|c| c == '[' || c == ']').to_string(), port))
}

#[async_trait]
impl ManagedService for NetworkDependency {
    fn name(&self) -> &str {
        self.name
    }

    async fn probe(&self) -> Result<(), CapabilityUnavailable> {
        let raw = self
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| CapabilityUnavailable::new(format!("{} not configured", self.setting)))?;

        let endpoint = parse_endpoint(raw)
            .map_err(|e| CapabilityUnavailable::new(format!("{}: {}", self.setting, e)))?;
        debug!("{} endpoint resolved to {}:{}", self.name, endpoint.0, endpoint.1);
        let _ = self.endpoint.set(endpoint);
        Ok(())
    }

    async fn initialize(&self) -> ServiceResult<()> {
        let elapsed = self.connect().await?;
        info!("{} reachable in {}ms", self.name, elapsed.as_millis());
        Ok(())
    }

    async fn shutdown(&self) -> ServiceResult<()> {
        debug!("{} released", self.name);
        Ok(())
    }

    async fn health_check(&self) -> ServiceResult<Option<String>> {
        let elapsed = self.connect().await?;
        Ok(Some(format!("reachable in {}ms", elapsed.as_millis())))
    }
}
