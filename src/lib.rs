//! ul-resolver - Universal Location resolver
//!
//! Turns a location path such as
//! `GlobalConsensus(3)/Parachain(3336)/PalletInstance(51)/AccountKey20(0x..)/GeneralKey(789)`
//! into the metadata the token points at.
//!
//! ## Pipeline
//!
//! - **Parse**: the five location fields, strictly in order
//! - **Lookup**: JSON-RPC endpoints for (network, parachain, pallet)
//! - **Read**: `tokenURI(id)` on the contract, failing over across endpoints
//! - **Dereference**: `ipfs://` through the gateway chain, `http(s)://` directly

pub mod config;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::{Args, ResolverConfig};
pub use server::{run, AppState};
pub use services::Resolver;
pub use types::{ResolverError, Result};
