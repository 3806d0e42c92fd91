//! Shared types for the resolver

pub mod error;

pub use error::{ErrorBody, ResolverError, Result};
