//! Endpoint Registry
//!
//! Static table mapping a (network, sub-network, registry instance) triple to
//! the ordered JSON-RPC endpoints that serve it and the chain id behind them.
//! Loaded once at start-up and never mutated.

use serde::{Deserialize, Deserializer};

use crate::config::ConfigError;

/// One `[[networks]]` record of the configuration file
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NetworkEntry {
    /// `GlobalConsensus` value
    pub network: String,
    /// `Parachain` value
    pub sub_network: String,
    /// `PalletInstance` value
    pub registry_instance: String,
    /// Ordered endpoint list; the invoker tries them front to back
    pub rpc_urls: Vec<String>,
    /// Chain id, accepted as string or integer
    #[serde(deserialize_with = "string_or_number")]
    pub chain_id: String,
}

/// Endpoints and chain id for one registry triple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointSet<'a> {
    pub endpoints: &'a [String],
    pub chain_id: &'a str,
}

/// Immutable registry of network entries
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    entries: Vec<NetworkEntry>,
}

impl EndpointRegistry {
    /// Build the registry, rejecting entries without endpoints
    pub fn new(entries: Vec<NetworkEntry>) -> Result<Self, ConfigError> {
        if let Some(empty) = entries.iter().find(|e| e.rpc_urls.is_empty()) {
            return Err(ConfigError::EmptyEndpoints {
                network: empty.network.clone(),
                sub_network: empty.sub_network.clone(),
                registry_instance: empty.registry_instance.clone(),
            });
        }
        Ok(Self { entries })
    }

    /// Exact-match lookup; `None` when no entry carries this triple
    pub fn lookup(
        &self,
        network: &str,
        sub_network: &str,
        registry_instance: &str,
    ) -> Option<EndpointSet<'_>> {
        self.entries
            .iter()
            .find(|e| {
                e.network == network
                    && e.sub_network == sub_network
                    && e.registry_instance == registry_instance
            })
            .map(|e| EndpointSet {
                endpoints: &e.rpc_urls,
                chain_id: &e.chain_id,
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
