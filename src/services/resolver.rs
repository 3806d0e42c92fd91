//! Resolution Orchestrator
//!
//! Runs one request through the pipeline:
//!
//! ```text
//! ParsingIdentifier → LookingUpEndpoints → InvokingRemoteRead
//!     → ClassifyingPointer → DereferencingContent → Done
//! ```
//!
//! Any stage may fail; the failure is mapped to a `ResolverError` here and
//! nowhere else. No stage is retried at this level; the only retries are the
//! endpoint failover inside the invoker and the gateway chain.

use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{ResolverConfig, UnrecognizedPointerPolicy};
use crate::services::gateway::ContentFetcher;
use crate::services::identifier::{self, LocationIdentifier};
use crate::services::pointer::{self, PointerKind};
use crate::services::rpc::{self, RemoteReader};
use crate::types::{ResolverError, Result};

/// Pipeline states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStage {
    ParsingIdentifier,
    LookingUpEndpoints,
    InvokingRemoteRead,
    ClassifyingPointer,
    DereferencingContent,
    Done,
}

impl ResolutionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParsingIdentifier => "parsing_identifier",
            Self::LookingUpEndpoints => "looking_up_endpoints",
            Self::InvokingRemoteRead => "invoking_remote_read",
            Self::ClassifyingPointer => "classifying_pointer",
            Self::DereferencingContent => "dereferencing_content",
            Self::Done => "done",
        }
    }
}

/// Successful resolution output
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// JSON document (IPFS metadata, or the pass-through `token_uri` object)
    Json(serde_json::Value),
    /// Raw body of a directly fetched web URI
    Text {
        body: String,
        content_type: Option<String>,
    },
}

/// A failed resolution, tagged with the stage that failed
#[derive(Debug)]
pub struct ResolutionFailure {
    pub stage: ResolutionStage,
    pub error: ResolverError,
}

/// Resolves location paths into token content
pub struct Resolver {
    config: Arc<ResolverConfig>,
    reader: Arc<dyn RemoteReader>,
    fetcher: Arc<dyn ContentFetcher>,
}

impl Resolver {
    pub fn new(
        config: Arc<ResolverConfig>,
        reader: Arc<dyn RemoteReader>,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> Self {
        Self {
            config,
            reader,
            fetcher,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a path (without its leading `/`)
    pub async fn resolve(&self, path: &str) -> Result<Resolved> {
        let start = Instant::now();
        match self.run(path).await {
            Ok(resolved) => {
                info!(
                    path = %path,
                    stage = ResolutionStage::Done.as_str(),
                    time_ms = start.elapsed().as_millis() as u64,
                    "Resolution completed"
                );
                Ok(resolved)
            }
            Err(failure) => {
                warn!(
                    path = %path,
                    stage = failure.stage.as_str(),
                    status = failure.error.status_code().as_u16(),
                    error = %failure.error,
                    time_ms = start.elapsed().as_millis() as u64,
                    "Resolution failed"
                );
                Err(failure.error)
            }
        }
    }

    async fn run(&self, path: &str) -> std::result::Result<Resolved, ResolutionFailure> {
        let mut stage = ResolutionStage::ParsingIdentifier;
        let fail = |stage: ResolutionStage, error: ResolverError| ResolutionFailure { stage, error };

        let id: LocationIdentifier = identifier::parse(path).map_err(|e| {
            fail(
                stage,
                ResolverError::Validation {
                    field: e.field().to_string(),
                },
            )
        })?;

        stage = advance(stage, ResolutionStage::LookingUpEndpoints);
        let set = self
            .config
            .registry
            .lookup(&id.network, &id.sub_network, &id.registry_instance)
            .ok_or_else(|| fail(stage, ResolverError::RpcUrlsNotFound))?;
        debug!(
            chain_id = %set.chain_id,
            endpoints = set.endpoints.len(),
            "Registry entry found"
        );

        stage = advance(stage, ResolutionStage::InvokingRemoteRead);
        let token_uri = rpc::invoke_with_failover(
            self.reader.as_ref(),
            set.endpoints,
            &id.holder_address,
            &id.asset_id,
            self.config.rpc_backoff,
        )
        .await
        .map_err(|_| fail(stage, ResolverError::TokenUriNotFound))?;

        stage = advance(stage, ResolutionStage::ClassifyingPointer);
        let kind = pointer::classify(&token_uri);
        debug!(token_uri = %token_uri, kind = kind.as_str(), "Token URI classified");

        stage = advance(stage, ResolutionStage::DereferencingContent);
        let resolved = match kind {
            PointerKind::ContentAddressed => self
                .config
                .gateways
                .fetch(self.fetcher.as_ref(), &token_uri)
                .await
                .map(Resolved::Json)
                .map_err(|_| fail(stage, ResolverError::GatewayExhausted))?,
            PointerKind::SecureWeb | PointerKind::PlainWeb => {
                let text = self
                    .fetcher
                    .get_text(&token_uri)
                    .await
                    .map_err(|e| fail(stage, ResolverError::Upstream(e.to_string())))?;
                Resolved::Text {
                    body: text.body,
                    content_type: text.content_type,
                }
            }
            PointerKind::Unrecognized => match self.config.unrecognized_pointer {
                UnrecognizedPointerPolicy::PassThrough => {
                    Resolved::Json(json!({ "token_uri": token_uri }))
                }
                UnrecognizedPointerPolicy::Reject => {
                    return Err(fail(
                        stage,
                        ResolverError::UnsupportedPointerStandard(token_uri),
                    ));
                }
            },
        };

        advance(stage, ResolutionStage::Done);
        Ok(resolved)
    }
}

fn advance(from: ResolutionStage, to: ResolutionStage) -> ResolutionStage {
    debug!(from = from.as_str(), to = to.as_str(), "Stage transition");
    to
}
