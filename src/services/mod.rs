//! Services layer
//!
//! Pipeline components, leaves first:
//!
//! - **Identifier**: parses `Keyword(value)` location paths
//! - **Registry**: maps network triples to JSON-RPC endpoints
//! - **Rpc**: `tokenURI` remote read with endpoint failover
//! - **Pointer**: classifies token URIs by scheme
//! - **Gateway**: IPFS gateway chain with per-gateway access tokens
//! - **Resolver**: sequences the above for one request

pub mod gateway;
pub mod identifier;
pub mod pointer;
pub mod registry;
pub mod resolver;
pub mod rpc;

#[cfg(test)]
pub(crate) mod log_capture;

pub use gateway::{ContentFetcher, ContentGateway, FetchError, GatewayChain, HttpFetcher, TextBody};
pub use identifier::{parse, LocationIdentifier, ParseError, FIELD_ORDER};
pub use pointer::{classify, PointerKind};
pub use registry::{EndpointRegistry, EndpointSet, NetworkEntry};
pub use resolver::{ResolutionStage, Resolved, Resolver};
pub use rpc::{checksum_address, invoke_with_failover, JsonRpcReader, ReadError, RemoteReader};
