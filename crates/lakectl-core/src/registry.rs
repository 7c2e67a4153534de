//! Lazily-constructed, process-lifetime API clients, one per scope.
//!
//! A scope's client is built on first use and then cloned out on every
//! later dispatch. The slot mutex is held across construction, so
//! concurrent first-callers serialize: one constructs, the rest wait and
//! find the cached client. A failed construction leaves the slot empty,
//! so the next dispatch attempts construction again instead of replaying
//! a stale failure.

use crate::client::ApiClient;
use crate::error::{ClassifiedError, ErrorKind};
use crate::retry::{RetryPolicy, run_with_retry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Which backend a client (and an operation) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Workspace,
    Account,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Workspace => f.write_str("workspace"),
            Scope::Account => f.write_str("account"),
        }
    }
}

/// Builds the client for a scope. One call is one construction attempt;
/// the registry handles retry. The production impl is [`SettingsFactory`];
/// tests inject counting doubles.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn build(&self, scope: Scope) -> Result<ApiClient, ClassifiedError>;
}

/// Production factory: builds clients from resolved settings and verifies
/// them with a `ping` handshake before handing them out.
pub struct SettingsFactory {
    settings: crate::config::Settings,
}

impl SettingsFactory {
    pub fn new(settings: crate::config::Settings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ClientFactory for SettingsFactory {
    async fn build(&self, scope: Scope) -> Result<ApiClient, ClassifiedError> {
        match scope {
            Scope::Workspace => {
                let (host, token) = self
                    .settings
                    .workspace()
                    .map_err(|e| ClassifiedError::new(ErrorKind::BadRequest, e.to_string()))?;
                let client = crate::client::WorkspaceClient::builder()
                    .base_url(host)
                    .token(token)
                    .build()?;
                client.ping().await?;
                Ok(ApiClient::Workspace(client))
            }
            Scope::Account => {
                let (host, token, account_id) = self
                    .settings
                    .account()
                    .map_err(|e| ClassifiedError::new(ErrorKind::BadRequest, e.to_string()))?;
                let client = crate::client::AccountClient::builder()
                    .base_url(host)
                    .token(token)
                    .account_id(account_id)
                    .build()?;
                client.ping().await?;
                Ok(ApiClient::Account(client))
            }
        }
    }
}

/// Per-scope client cache.
pub struct ClientRegistry {
    factory: Arc<dyn ClientFactory>,
    policy: RetryPolicy,
    workspace: Mutex<Option<ApiClient>>,
    account: Mutex<Option<ApiClient>>,
}

impl ClientRegistry {
    pub fn new(factory: Arc<dyn ClientFactory>, policy: RetryPolicy) -> Self {
        Self {
            factory,
            policy,
            workspace: Mutex::new(None),
            account: Mutex::new(None),
        }
    }

    /// The scope's client, constructing it (under retry) on first use.
    pub async fn get_or_init(&self, scope: Scope) -> Result<ApiClient, ClassifiedError> {
        let slot = match scope {
            Scope::Workspace => &self.workspace,
            Scope::Account => &self.account,
        };

        let mut guard = slot.lock().await;
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }

        info!(%scope, "constructing API client");
        let op_name = format!("init-{scope}-client");
        let client = run_with_retry(&self.policy, &op_name, || self.factory.build(scope)).await?;
        *guard = Some(client.clone());
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::WorkspaceClient;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn stub_client() -> ApiClient {
        ApiClient::Workspace(
            WorkspaceClient::builder()
                .base_url("https://ws.example.com")
                .token("t")
                .build()
                .unwrap(),
        )
    }

    /// Factory that fails its first `fail_first` builds, then succeeds.
    struct CountingFactory {
        builds: AtomicU32,
        fail_first: u32,
        delay: Duration,
    }

    impl CountingFactory {
        fn new(fail_first: u32, delay: Duration) -> Self {
            Self {
                builds: AtomicU32::new(0),
                fail_first,
                delay,
            }
        }
    }

    #[async_trait]
    impl ClientFactory for CountingFactory {
        async fn build(&self, _scope: Scope) -> Result<ApiClient, ClassifiedError> {
            let n = self.builds.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if n < self.fail_first {
                Err(ClassifiedError::new(ErrorKind::Auth, "unauthorized"))
            } else {
                Ok(stub_client())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_first_dispatches_construct_once() {
        let factory = Arc::new(CountingFactory::new(0, Duration::from_millis(50)));
        let registry = ClientRegistry::new(factory.clone(), RetryPolicy::default());

        let (a, b, c) = tokio::join!(
            registry.get_or_init(Scope::Workspace),
            registry.get_or_init(Scope::Workspace),
            registry.get_or_init(Scope::Workspace),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(factory.builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_construction_is_not_cached() {
        let factory = Arc::new(CountingFactory::new(1, Duration::ZERO));
        let registry = ClientRegistry::new(factory.clone(), RetryPolicy::default());

        // Auth failures are non-retryable, so the first dispatch fails after
        // one build attempt.
        let err = registry.get_or_init(Scope::Workspace).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Auth);
        assert_eq!(factory.builds.load(Ordering::SeqCst), 1);

        // The slot stayed empty; the next dispatch constructs again.
        assert!(registry.get_or_init(Scope::Workspace).await.is_ok());
        assert_eq!(factory.builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_construction_failures_go_through_the_executor() {
        let failing = Arc::new(FlakyFactory {
            builds: AtomicU32::new(0),
        });
        let registry = ClientRegistry::new(failing.clone(), RetryPolicy::default());
        assert!(registry.get_or_init(Scope::Workspace).await.is_ok());
        // Two network failures, success on the third attempt.
        assert_eq!(failing.builds.load(Ordering::SeqCst), 3);
    }

    struct FlakyFactory {
        builds: AtomicU32,
    }

    #[async_trait]
    impl ClientFactory for FlakyFactory {
        async fn build(&self, _scope: Scope) -> Result<ApiClient, ClassifiedError> {
            let n = self.builds.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(ClassifiedError::new(ErrorKind::Network, "connection refused"))
            } else {
                Ok(stub_client())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scopes_have_independent_slots() {
        let factory = Arc::new(CountingFactory::new(0, Duration::ZERO));
        let registry = ClientRegistry::new(factory.clone(), RetryPolicy::default());
        registry.get_or_init(Scope::Workspace).await.unwrap();
        registry.get_or_init(Scope::Account).await.unwrap();
        registry.get_or_init(Scope::Workspace).await.unwrap();
        assert_eq!(factory.builds.load(Ordering::SeqCst), 2);
    }
}
