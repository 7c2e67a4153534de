//! Operation routing.
//!
//! The router owns a static `{operation name -> (scope, handler)}` table
//! built once at startup. Dispatch resolves the scope's client through the
//! registry, then invokes the handler with a [`CallContext`]. Handlers are
//! plain async fns over JSON arguments; they parse their own typed input
//! with [`parse_args`].

use crate::client::ApiClient;
use crate::config::ResilienceConfig;
use crate::error::{ClassifiedError, ErrorKind};
use crate::registry::{ClientRegistry, Scope};
use crate::retry::RetryPolicy;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Everything a handler needs for one dispatch.
#[derive(Clone)]
pub struct CallContext {
    pub client: ApiClient,
    pub retry: RetryPolicy,
    /// Worker pool ceiling for batch operations.
    pub max_workers: usize,
}

pub type HandlerResult = Result<Value, ClassifiedError>;

type HandlerFn =
    Arc<dyn Fn(CallContext, Value) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

struct Operation {
    scope: Scope,
    handler: HandlerFn,
}

/// Dispatch failure: either the operation name is not in the table (a local
/// error, raised before any client work) or the handler / client
/// construction failed remotely.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error(transparent)]
    Operation(#[from] ClassifiedError),
}

/// Parse a handler's typed input from the raw dispatch arguments. Missing
/// arguments (`null`) are treated as an empty object so inputs whose fields
/// all default parse cleanly.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ClassifiedError> {
    let args = if args.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| {
        ClassifiedError::new(ErrorKind::BadRequest, format!("invalid arguments: {e}"))
    })
}

pub struct Router {
    table: HashMap<&'static str, Operation>,
    registry: Arc<ClientRegistry>,
    resilience: ResilienceConfig,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder {
            table: HashMap::new(),
        }
    }

    /// All registered operations with their scopes, sorted by name.
    pub fn operations(&self) -> Vec<(&'static str, Scope)> {
        let mut ops: Vec<_> = self
            .table
            .iter()
            .map(|(name, op)| (*name, op.scope))
            .collect();
        ops.sort_by_key(|(name, _)| *name);
        ops
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Route one operation call.
    pub async fn dispatch(&self, name: &str, args: Value) -> Result<Value, DispatchError> {
        let op = self
            .table
            .get(name)
            .ok_or_else(|| DispatchError::UnknownOperation(name.to_string()))?;

        info!(operation = name, scope = %op.scope, "dispatching");
        let client = self.registry.get_or_init(op.scope).await?;
        let ctx = CallContext {
            client,
            retry: self.resilience.retry_policy(),
            max_workers: self.resilience.max_workers,
        };
        Ok((op.handler)(ctx, args).await?)
    }
}

pub struct RouterBuilder {
    table: HashMap<&'static str, Operation>,
}

impl RouterBuilder {
    /// Register a handler under a unique operation name.
    pub fn operation<F, Fut>(mut self, name: &'static str, scope: Scope, handler: F) -> Self
    where
        F: Fn(CallContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let handler: HandlerFn = Arc::new(move |ctx, args| Box::pin(handler(ctx, args)));
        let previous = self.table.insert(name, Operation { scope, handler });
        assert!(previous.is_none(), "duplicate operation '{name}'");
        self
    }

    pub fn build(self, registry: Arc<ClientRegistry>, resilience: ResilienceConfig) -> Router {
        Router {
            table: self.table,
            registry,
            resilience,
        }
    }
}
