//! Configuration for the resolver
//!
//! CLI arguments and environment variable handling using clap, plus loading
//! of the two static tables (endpoint registry and gateway chain) from disk.
//! Both tables are read once at start-up; changing them requires a restart.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::services::gateway::{ContentGateway, GatewayChain};
use crate::services::registry::{EndpointRegistry, NetworkEntry};

/// Universal Location resolver
///
/// Resolves `GlobalConsensus(..)/Parachain(..)/PalletInstance(..)/AccountKey20(..)/GeneralKey(..)`
/// paths into token metadata.
#[derive(Parser, Debug, Clone)]
#[command(name = "ul-resolver")]
#[command(about = "Resolves Universal Location paths into token metadata")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Endpoint registry and primary gateway list (TOML or JSON)
    #[arg(long, env = "RESOLVER_CONFIG", default_value = "config.toml")]
    pub config: PathBuf,

    /// Optional secondary gateway list, appended after the primary gateways
    #[arg(long, env = "EXTRA_GATEWAYS_FILE")]
    pub extra_gateways: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Timeout for every outbound request in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,

    /// Delay between remote-read attempts in milliseconds
    #[arg(long, env = "RPC_BACKOFF_MS", default_value = "1000")]
    pub rpc_backoff_ms: u64,

    /// What to do with token URIs that are neither ipfs:// nor http(s)://
    #[arg(long, env = "UNRECOGNIZED_POINTER", value_enum, default_value_t = UnrecognizedPointerPolicy::PassThrough)]
    pub unrecognized_pointer: UnrecognizedPointerPolicy,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn rpc_backoff(&self) -> Duration {
        Duration::from_millis(self.rpc_backoff_ms)
    }
}

/// Policy for token URIs with an unrecognized scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnrecognizedPointerPolicy {
    /// Return `{"token_uri": "<pointer>"}` with status 200
    PassThrough,
    /// Fail the request with 400
    Reject,
}

impl std::fmt::Display for UnrecognizedPointerPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PassThrough => write!(f, "pass-through"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Errors raised while loading static configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {message}")]
    Toml { path: PathBuf, message: String },

    #[error("Invalid JSON in {path}: {message}")]
    Json { path: PathBuf, message: String },

    #[error("Network entry {network}/{sub_network}/{registry_instance} has no RPC URLs")]
    EmptyEndpoints {
        network: String,
        sub_network: String,
        registry_instance: String,
    },
}

/// On-disk shape of the configuration files
///
/// The primary file carries `[[networks]]` and `[[gateways]]`; the secondary
/// gateway file only carries `[[gateways]]`.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub networks: Vec<NetworkEntry>,
    #[serde(default)]
    pub gateways: Vec<ContentGateway>,
}

impl ConfigFile {
    /// Load a configuration file, choosing the format by extension
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &raw)
    }

    fn parse(path: &Path, raw: &str) -> Result<Self, ConfigError> {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            serde_json::from_str(raw).map_err(|e| ConfigError::Json {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        } else {
            toml::from_str(raw).map_err(|e| ConfigError::Toml {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    }
}

/// Everything the resolver needs, built once at start-up
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub registry: EndpointRegistry,
    pub gateways: GatewayChain,
    pub unrecognized_pointer: UnrecognizedPointerPolicy,
    pub rpc_backoff: Duration,
    pub request_timeout: Duration,
}

impl ResolverConfig {
    /// Load the registry and gateway chain described by `args`
    ///
    /// A missing secondary gateway file is not an error; the chain is simply
    /// shorter.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let primary = ConfigFile::load(&args.config)?;
        let registry = EndpointRegistry::new(primary.networks)?;
        let mut gateways = GatewayChain::new(primary.gateways);

        if let Some(ref extra) = args.extra_gateways {
            if extra.exists() {
                let secondary = ConfigFile::load(extra)?;
                info!(
                    path = %extra.display(),
                    count = secondary.gateways.len(),
                    "Secondary gateway list loaded"
                );
                gateways.extend(secondary.gateways);
            } else {
                debug!(path = %extra.display(), "Secondary gateway list absent, skipping");
            }
        }

        Ok(Self {
            registry,
            gateways,
            unrecognized_pointer: args.unrecognized_pointer,
            rpc_backoff: args.rpc_backoff(),
            request_timeout: args.request_timeout(),
        })
    }
}
