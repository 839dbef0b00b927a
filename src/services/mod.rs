//! Named, versioned services and the registry that resolves them.
//!
//! The registry is the explicit context threaded through the language entry
//! point, the interpreter and every service handler. Cloning it is cheap and
//! every clone sees the same registrations.

pub mod version;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::{ErrorCode, ServiceError};
pub use version::compare_versions;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A request handler reachable through the registry.
///
/// Every request shape defaults to an `UNSUPPORTED` failure; implementors
/// override the shapes they answer.
pub trait Service: Send + Sync {
    /// Opaque text in, one text reply out.
    fn handle_string<'a>(
        &'a self,
        _ctx: &'a ServiceRegistry,
        _request: &'a str,
    ) -> BoxFuture<'a, Result<String, ServiceError>> {
        Box::pin(async { Err(ServiceError::unsupported("string requests are not supported")) })
    }

    /// Structured document in, document reply out.
    fn handle_json<'a>(
        &'a self,
        _ctx: &'a ServiceRegistry,
        _request: serde_json::Value,
    ) -> BoxFuture<'a, Result<serde_json::Value, ServiceError>> {
        Box::pin(async { Err(ServiceError::unsupported("document requests are not supported")) })
    }

    /// Opaque text in, any number of text replies pushed into `replies`.
    fn handle_subscription(
        &self,
        _ctx: &ServiceRegistry,
        _request: &str,
        _replies: UnboundedSender<String>,
    ) -> Result<(), ServiceError> {
        Err(ServiceError::unsupported(
            "subscription requests are not supported",
        ))
    }
}

#[derive(Clone)]
struct Registration {
    version: String,
    service: Arc<dyn Service>,
}

struct ServiceVersions {
    latest: Registration,
    by_version: HashMap<String, Registration>,
}

#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: Arc<RwLock<HashMap<String, ServiceVersions>>>,
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let services = self.services.read();
        let mut names: Vec<&String> = services.keys().collect();
        names.sort();
        f.debug_struct("ServiceRegistry")
            .field("services", &names)
            .finish()
    }
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the tokenizer and the language services registered.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(
            crate::scanner::SERVICE_NAME,
            crate::scanner::SERVICE_VERSION,
            Arc::new(crate::scanner::TokenizerService),
        );
        registry.register(
            crate::language::SERVICE_NAME,
            crate::language::SERVICE_VERSION,
            Arc::new(crate::language::LanguageService),
        );
        registry.register(
            crate::language::PARSE_SERVICE_NAME,
            crate::language::SERVICE_VERSION,
            Arc::new(crate::language::ParseService),
        );
        registry.register(
            crate::language::RUNTIME_SERVICE_NAME,
            crate::language::SERVICE_VERSION,
            Arc::new(crate::language::RuntimeService),
        );
        registry
    }

    /// Register `service` under `name` and `version`. The latest slot moves
    /// only when `version` compares greater than the current latest.
    pub fn register(
        &self,
        name: impl Into<String>,
        version: impl Into<String>,
        service: Arc<dyn Service>,
    ) {
        let name = name.into();
        let registration = Registration {
            version: version.into(),
            service,
        };
        let mut services = self.services.write();
        match services.get_mut(&name) {
            Some(versions) => {
                if compare_versions(&registration.version, &versions.latest.version)
                    == Ordering::Greater
                {
                    versions.latest = registration.clone();
                }
                versions
                    .by_version
                    .insert(registration.version.clone(), registration);
            }
            None => {
                let mut by_version = HashMap::new();
                by_version.insert(registration.version.clone(), registration.clone());
                services.insert(
                    name.clone(),
                    ServiceVersions {
                        latest: registration,
                        by_version,
                    },
                );
            }
        }
        tracing::debug!(service = %name, "registered service");
    }

    /// Version the latest slot of `name` currently points at.
    pub fn latest_version(&self, name: &str) -> Option<String> {
        self.services
            .read()
            .get(name)
            .map(|versions| versions.latest.version.clone())
    }

    /// Resolve `name` at `version`, or at the latest version when `None`.
    pub fn resolve(&self, name: &str, version: Option<&str>) -> Result<ServiceClient, ServiceError> {
        let services = self.services.read();
        let registration = services.get(name).and_then(|versions| match version {
            Some(v) => versions.by_version.get(v),
            None => Some(&versions.latest),
        });
        match registration {
            Some(r) => Ok(ServiceClient {
                name: name.to_string(),
                version: r.version.clone(),
                service: Arc::clone(&r.service),
                registry: self.clone(),
            }),
            None => Err(ServiceError::not_found(name, version)),
        }
    }
}

/// A resolved service, ready to take requests.
#[derive(Clone)]
pub struct ServiceClient {
    name: String,
    version: String,
    service: Arc<dyn Service>,
    registry: ServiceRegistry,
}

impl fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceClient")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl ServiceClient {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub async fn send_string(&self, request: &str) -> Result<String, ServiceError> {
        tracing::trace!(service = %self.name, "string request");
        self.service.handle_string(&self.registry, request).await
    }

    pub async fn send_json<Req, Resp>(&self, request: &Req) -> Result<Resp, ServiceError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        tracing::trace!(service = %self.name, "document request");
        let request = serde_json::to_value(request)
            .map_err(|e| ServiceError::new(ErrorCode::BadRequest, e.to_string()))?;
        let reply = self.service.handle_json(&self.registry, request).await?;
        serde_json::from_value(reply)
            .map_err(|e| ServiceError::new(ErrorCode::BadRequest, e.to_string()))
    }

    /// Open a subscription; replies arrive on the returned channel until the
    /// service drops its sender.
    pub fn subscribe_string(&self, request: &str) -> Result<UnboundedReceiver<String>, ServiceError> {
        tracing::trace!(service = %self.name, "subscription request");
        let (tx, rx) = mpsc::unbounded_channel();
        self.service.handle_subscription(&self.registry, request, tx)?;
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replies with its own tag so tests can tell versions apart.
    struct Tagged(&'static str);

    impl Service for Tagged {
        fn handle_string<'a>(
            &'a self,
            _ctx: &'a ServiceRegistry,
            request: &'a str,
        ) -> BoxFuture<'a, Result<String, ServiceError>> {
            Box::pin(async move { Ok(format!("{}:{request}", self.0)) })
        }

        fn handle_subscription(
            &self,
            _ctx: &ServiceRegistry,
            request: &str,
            replies: UnboundedSender<String>,
        ) -> Result<(), ServiceError> {
            for i in 0..3 {
                let _ = replies.send(format!("{}:{request}:{i}", self.0));
            }
            Ok(())
        }
    }

    struct Silent;

    impl Service for Silent {}

    #[tokio::test]
    async fn latest_tracks_highest_version() {
        let registry = ServiceRegistry::new();
        registry.register("echo", "1.9", Arc::new(Tagged("old")));
        registry.register("echo", "1.10", Arc::new(Tagged("new")));
        registry.register("echo", "1.2", Arc::new(Tagged("older")));

        assert_eq!(registry.latest_version("echo").as_deref(), Some("1.10"));
        let client = registry.resolve("echo", None).expect("resolves");
        assert_eq!(client.send_string("hi").await.expect("reply"), "new:hi");

        let pinned = registry.resolve("echo", Some("1.2")).expect("resolves");
        assert_eq!(pinned.version(), "1.2");
        assert_eq!(pinned.send_string("hi").await.expect("reply"), "older:hi");
    }

    #[test]
    fn equal_version_does_not_move_latest() {
        let registry = ServiceRegistry::new();
        registry.register("echo", "1.0", Arc::new(Tagged("a")));
        registry.register("echo", "1", Arc::new(Tagged("b")));
        assert_eq!(registry.latest_version("echo").as_deref(), Some("1.0"));
    }

    #[test]
    fn unknown_service_or_version_is_not_found() {
        let registry = ServiceRegistry::new();
        registry.register("echo", "1.0", Arc::new(Tagged("a")));

        let err = registry.resolve("missing", None).unwrap_err();
        assert_eq!(err.code, ErrorCode::ServiceNotFound);
        assert_eq!(err.message, "service not found: missing");

        let err = registry.resolve("echo", Some("2.0")).unwrap_err();
        assert_eq!(err.message, "service not found: echo (2.0)");
    }

    #[tokio::test]
    async fn subscription_delivers_every_reply() {
        let registry = ServiceRegistry::new();
        registry.register("ticker", "0.1.0", Arc::new(Tagged("t")));
        let client = registry.resolve("ticker", None).expect("resolves");
        let mut rx = client.subscribe_string("go").expect("subscribed");
        let mut replies = Vec::new();
        while let Some(reply) = rx.recv().await {
            replies.push(reply);
        }
        assert_eq!(replies, vec!["t:go:0", "t:go:1", "t:go:2"]);
    }

    #[tokio::test]
    async fn unimplemented_shapes_are_unsupported() {
        let registry = ServiceRegistry::new();
        registry.register("silent", "1", Arc::new(Silent));
        let client = registry.resolve("silent", None).expect("resolves");

        let err = client.send_string("x").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unsupported);
        let err = client
            .send_json::<_, serde_json::Value>(&serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unsupported);
        assert!(client.subscribe_string("x").is_err());
    }

    #[test]
    fn clones_share_registrations() {
        let registry = ServiceRegistry::new();
        let other = registry.clone();
        other.register("echo", "1", Arc::new(Tagged("a")));
        assert!(registry.resolve("echo", None).is_ok());
    }
}
