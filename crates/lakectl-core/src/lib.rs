//! # lakectl-core
//!
//! Resilient execution layer over the lakehouse platform's workspace and
//! account APIs. The pieces compose in one direction:
//!
//! - [`error`] classifies arbitrary remote failures into a fixed
//!   retryable/non-retryable taxonomy.
//! - [`retry`] re-runs retryable failures with bounded exponential backoff.
//! - [`chunks`] assembles a chunked statement result into one row set.
//! - [`batch`] fans independent calls across a bounded worker pool.
//! - [`wait`] polls long-running runs to a terminal state.
//! - [`registry`] lazily constructs one API client per backend scope.
//! - [`router`] maps operation names to handlers and scopes.
//! - [`handlers`] is the operation catalog itself.
//!
//! The CLI crate layers profile resolution and output rendering on top.

pub mod batch;
pub mod chunks;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod retry;
pub mod router;
pub mod wait;

pub use batch::{BatchItemResult, BatchOutcome, BatchReport, run_batch};
pub use chunks::{Assembled, ChunkedResponse, assemble};
pub use client::{AccountClient, ApiClient, ApiError, WorkspaceClient};
pub use config::{Config, ConfigError, Profile, ResilienceConfig, Settings};
pub use error::{ClassifiedError, ErrorKind};
pub use handlers::build_router;
pub use registry::{ClientFactory, ClientRegistry, Scope, SettingsFactory};
pub use retry::{RetryPolicy, run_with_retry};
pub use router::{CallContext, DispatchError, Router, RouterBuilder};
pub use wait::{PollState, WaitOptions, wait_for_terminal};
