//! Configuration for the bridge
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::registry::RegistryConfig;

/// fabric-bridge - HTTP front door for per-caller fabric clients
#[derive(Parser, Debug, Clone)]
#[command(name = "fabric-bridge")]
#[command(about = "Bridges HTTP requests to signer-bound content fabric clients")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// URL of the network configuration document
    #[arg(long, env = "CONFIG_URL")]
    pub config_url: String,

    /// Region hint for fabric node selection (sent as the `elvgeo` query parameter)
    #[arg(long, env = "CONFIG_REGION")]
    pub config_region: Option<String>,

    /// Log level for this crate
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// How long a request waits for the fabric callback
    #[arg(long, env = "INVOCATION_TIMEOUT_MS", default_value = "30000")]
    pub invocation_timeout_ms: u64,

    /// Per-request timeout of the HTTP fabric transport
    #[arg(long, env = "FABRIC_REQUEST_TIMEOUT_MS", default_value = "20000")]
    pub fabric_request_timeout_ms: u64,

    /// Maximum cached clients; the least recently used is evicted beyond this
    #[arg(long, env = "MAX_CLIENTS", default_value = "10000")]
    pub max_clients: usize,

    /// Idle time before a cached client is reaped (0 = never)
    #[arg(long, env = "CLIENT_IDLE_TTL_SECS", default_value = "3600")]
    pub client_idle_ttl_secs: u64,

    /// How often idle clients are reaped
    #[arg(long, env = "CLIENT_CLEANUP_INTERVAL_SECS", default_value = "60")]
    pub client_cleanup_interval_secs: u64,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let url = self.config_url.trim();
        if url.is_empty() {
            return Err("CONFIG_URL is required".to_string());
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!("CONFIG_URL must be an http(s) URL, got {url}"));
        }

        if self.invocation_timeout_ms == 0 {
            return Err("INVOCATION_TIMEOUT_MS must be greater than zero".to_string());
        }

        if self.fabric_request_timeout_ms == 0 {
            return Err("FABRIC_REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        if self.max_clients == 0 {
            return Err("MAX_CLIENTS must be greater than zero".to_string());
        }

        if self.client_cleanup_interval_secs == 0 {
            return Err("CLIENT_CLEANUP_INTERVAL_SECS must be greater than zero".to_string());
        }

        Ok(())
    }

    pub fn invocation_timeout(&self) -> Duration {
        Duration::from_millis(self.invocation_timeout_ms)
    }

    pub fn fabric_request_timeout(&self) -> Duration {
        Duration::from_millis(self.fabric_request_timeout_ms)
    }

    /// Registry sizing and eviction settings
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            max_clients: self.max_clients,
            idle_ttl: Duration::from_secs(self.client_idle_ttl_secs),
            cleanup_interval: Duration::from_secs(self.client_cleanup_interval_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["fabric-bridge", "--config-url", "https://config.test/config"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.listen, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(args.config_region, None);
        assert_eq!(args.invocation_timeout(), Duration::from_secs(30));
        assert_eq!(args.fabric_request_timeout(), Duration::from_secs(20));

        let registry = args.registry_config();
        assert_eq!(registry.max_clients, 10_000);
        assert_eq!(registry.idle_ttl, Duration::from_secs(3600));
        assert_eq!(registry.cleanup_interval, Duration::from_secs(60));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "--config-region",
            "eu-west",
            "--invocation-timeout-ms",
            "250",
            "--client-idle-ttl-secs",
            "0",
        ]);
        assert_eq!(args.config_region.as_deref(), Some("eu-west"));
        assert_eq!(args.invocation_timeout(), Duration::from_millis(250));
        assert!(args.registry_config().idle_ttl.is_zero());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut args = parse(&[]);
        args.config_url = "ftp://config.test".to_string();
        assert!(args.validate().unwrap_err().contains("CONFIG_URL"));

        args.config_url = "  ".to_string();
        assert!(args.validate().is_err());

        let args = parse(&["--invocation-timeout-ms", "0"]);
        assert!(args.validate().unwrap_err().contains("INVOCATION_TIMEOUT_MS"));

        let args = parse(&["--max-clients", "0"]);
        assert!(args.validate().unwrap_err().contains("MAX_CLIENTS"));

        let args = parse(&["--client-cleanup-interval-secs", "0"]);
        assert!(args.validate().is_err());
    }
}
