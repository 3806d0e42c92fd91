//! HTTP routes for the resolver

pub mod health;
pub mod resolve;

pub use health::handle_health;
pub use resolve::handle_resolve;
