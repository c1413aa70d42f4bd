//! Exporter configuration.
//!
//! Settings come from three layers, highest precedence first: command-line
//! flags, `PVE_*` environment variables, and an optional TOML file. Anything
//! left unset falls back to a built-in default. The merged result is
//! validated once at startup and never changes afterwards.
//!
//! A variable that is set but empty counts as unset, so `PVE_PATH=` in a
//! compose file keeps the default path.

use crate::metrics::MetricsServerConfig;
use crate::upstream::{ApiToken, UpstreamConfig};
use clap::builder::{BoolishValueParser, TypedValueParser};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::net::{Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Command-line interface.
///
/// Every setting is optional here so that unset flags fall through to the
/// config file and then to the defaults.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "pve-exporter", version, about = "Prometheus exporter for Proxmox VE")]
pub struct CliArgs {
    /// TOML configuration file.
    #[arg(long, env = "PVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// PVE endpoint, e.g. https://pve.example.com:8006
    #[arg(long, env = "PVE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// PVE API token (user@realm!name)
    #[arg(long = "apitoken", env = "PVE_API_TOKEN")]
    pub api_token: Option<String>,

    /// PVE API secret
    #[arg(long = "apisecret", env = "PVE_API_SECRET", hide_env_values = true)]
    pub api_secret: Option<String>,

    /// Address on which to expose metrics (`:port` listens on IPv6 and IPv4)
    #[arg(long, env = "PVE_ADDRESS")]
    pub address: Option<String>,

    /// Metrics path (/path)
    #[arg(long, env = "PVE_PATH")]
    pub path: Option<String>,

    /// Node whose VMs and storage are exported
    #[arg(long, env = "PVE_NODE")]
    pub node: Option<String>,

    /// Upstream request timeout in seconds
    #[arg(long = "timeout", env = "PVE_TIMEOUT")]
    pub timeout_secs: Option<String>,

    /// Skip TLS certificate verification for the PVE endpoint
    #[arg(
        long,
        env = "PVE_INSECURE",
        action = clap::ArgAction::SetTrue,
        value_parser = SwitchValueParser
    )]
    pub insecure: bool,
}

/// Boolean switch accepting `1`/`0`, `yes`/`no`, `on`/`off` and
/// `true`/`false`. An empty value reads as off.
#[derive(Debug, Clone, Copy)]
struct SwitchValueParser;

impl TypedValueParser for SwitchValueParser {
    type Value = bool;

    fn parse_ref(
        &self,
        cmd: &clap::Command,
        arg: Option<&clap::Arg>,
        value: &OsStr,
    ) -> Result<bool, clap::Error> {
        if value.is_empty() {
            return Ok(false);
        }
        BoolishValueParser::new().parse_ref(cmd, arg, value)
    }
}

impl CliArgs {
    /// Loads the config file (if any), applies flags and environment on top
    /// of it, and validates the result.
    pub fn load(&self) -> Result<ExporterConfig, ConfigError> {
        let config_path = self
            .config
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty());
        let file = match config_path {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        file.merge(self)?.into_exporter_config()
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("missing upstream endpoint (set --endpoint or PVE_ENDPOINT)")]
    MissingEndpoint,
    #[error("invalid upstream endpoint {0:?}: {1}")]
    InvalidEndpoint(String, String),
    #[error("invalid listen address {0:?}")]
    InvalidAddress(String),
    #[error("metrics path must start with '/': {0:?}")]
    InvalidPath(String),
    #[error("invalid upstream timeout {0:?}: expected whole seconds, at least 1")]
    InvalidTimeout(String),
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub upstream: UpstreamSection,
    #[serde(default)]
    pub server: ServerSection,
}

/// `[upstream]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSection {
    /// Base URL of the PVE API.
    pub endpoint: String,
    /// Token id (`user@realm!name`).
    pub api_token: String,
    /// Token secret.
    pub api_secret: String,
    /// Node to query.
    pub node: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Accept any server certificate.
    pub insecure_skip_verify: bool,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_token: String::new(),
            api_secret: String::new(),
            node: "localhost".to_string(),
            timeout_secs: 10,
            insecure_skip_verify: false,
        }
    }
}

/// `[server]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Listen address; `:port` binds every interface, IPv6 and IPv4.
    pub address: String,
    /// Metrics path.
    pub path: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            address: ":8000".to_string(),
            path: "/metrics".to_string(),
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Overrides file values with whatever was given on the command line or
    /// in the environment. Empty values are skipped.
    pub fn merge(mut self, cli: &CliArgs) -> Result<Self, ConfigError> {
        let upstream = &mut self.upstream;
        override_with(&mut upstream.endpoint, &cli.endpoint);
        override_with(&mut upstream.api_token, &cli.api_token);
        override_with(&mut upstream.api_secret, &cli.api_secret);
        override_with(&mut upstream.node, &cli.node);
        if let Some(timeout) = non_empty(&cli.timeout_secs) {
            upstream.timeout_secs = timeout
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(timeout.to_string()))?;
        }
        upstream.insecure_skip_verify |= cli.insecure;

        override_with(&mut self.server.address, &cli.address);
        override_with(&mut self.server.path, &cli.path);
        Ok(self)
    }

    /// Validates the settings and converts them to runtime configuration.
    pub fn into_exporter_config(self) -> Result<ExporterConfig, ConfigError> {
        let upstream = self.upstream;

        if upstream.endpoint.is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }
        let url = reqwest::Url::parse(&upstream.endpoint)
            .map_err(|e| ConfigError::InvalidEndpoint(upstream.endpoint.clone(), e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEndpoint(
                upstream.endpoint,
                "scheme must be http or https".to_string(),
            ));
        }
        if upstream.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(upstream.timeout_secs.to_string()));
        }
        if !self.server.path.starts_with('/') {
            return Err(ConfigError::InvalidPath(self.server.path));
        }

        Ok(ExporterConfig {
            upstream: UpstreamConfig {
                endpoint: upstream.endpoint,
                token: ApiToken::new(upstream.api_token, upstream.api_secret),
                node: upstream.node,
                timeout: Duration::from_secs(upstream.timeout_secs),
                insecure_skip_verify: upstream.insecure_skip_verify,
            },
            server: MetricsServerConfig {
                bind_addr: parse_listen_address(&self.server.address)?,
                path: self.server.path,
            },
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn override_with(target: &mut String, value: &Option<String>) {
    if let Some(value) = non_empty(value) {
        value.clone_into(target);
    }
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub upstream: UpstreamConfig,
    pub server: MetricsServerConfig,
}

/// Parses a listen address, accepting the `:port` shorthand for the IPv6
/// wildcard.
pub fn parse_listen_address(address: &str) -> Result<SocketAddr, ConfigError> {
    let invalid = || ConfigError::InvalidAddress(address.to_string());
    match address.strip_prefix(':') {
        Some(port) => {
            let port = port.parse::<u16>().map_err(|_| invalid())?;
            Ok((Ipv6Addr::UNSPECIFIED, port).into())
        }
        None => address.parse().map_err(|_| invalid()),
    }
}
