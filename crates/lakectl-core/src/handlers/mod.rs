//! The operation catalog.
//!
//! Each module registers its operations on the router builder; the scopes
//! declared here decide which client a dispatch resolves.

pub mod account;
pub mod compute;
pub mod jobs;
pub mod sql;
pub mod workspace;

use crate::config::ResilienceConfig;
use crate::registry::ClientRegistry;
use crate::router::{Router, RouterBuilder};
use std::sync::Arc;

/// Register the full catalog.
pub fn register_all(builder: RouterBuilder) -> RouterBuilder {
    let builder = compute::register(builder);
    let builder = jobs::register(builder);
    let builder = sql::register(builder);
    let builder = workspace::register(builder);
    account::register(builder)
}

/// Build the production router over a client registry.
pub fn build_router(registry: Arc<ClientRegistry>, resilience: ResilienceConfig) -> Router {
    register_all(Router::builder()).build(registry, resilience)
}
