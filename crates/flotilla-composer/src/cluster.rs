use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::error::ComposerError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClusterError {
    /// The control plane answered with a failure status.
    #[error("{reason} ({code}): {message}")]
    Api {
        code: u16,
        reason: String,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(String),
}

impl ClusterError {
    pub fn already_exists(kind: &str, name: &str) -> Self {
        ClusterError::Api {
            code: 409,
            reason: "AlreadyExists".to_string(),
            message: format!("{kind} \"{name}\" already exists"),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ClusterError::Api { code: 409, .. })
    }
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(resp) => ClusterError::Api {
                code: resp.code,
                reason: resp.reason,
                message: resp.message,
            },
            other => ClusterError::Transport(other.to_string()),
        }
    }
}

/// Create operations the composer needs from a cluster control plane.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn create_config_map(
        &self,
        namespace: &str,
        config_map: &ConfigMap,
    ) -> Result<(), ClusterError>;

    async fn create_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<(), ClusterError>;

    async fn create_service(&self, namespace: &str, service: &Service) -> Result<(), ClusterError>;
}

/// `ClusterClient` backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    /// Credentials from the pod's service account.
    pub fn in_cluster() -> Result<Self, ComposerError> {
        let config = Config::incluster()
            .map_err(|e| ComposerError::ClientUnavailable(format!("in-cluster config: {e}")))?;
        Self::from_config(config)
    }

    /// Credentials from a kubeconfig file, using its current context.
    pub async fn from_kubeconfig(path: &Path) -> Result<Self, ComposerError> {
        let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
            ComposerError::ClientUnavailable(format!("reading {}: {e}", path.display()))
        })?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| {
                ComposerError::ClientUnavailable(format!("loading {}: {e}", path.display()))
            })?;
        Self::from_config(config)
    }

    /// Whatever the environment provides: `KUBECONFIG`, `~/.kube/config`, or
    /// in-cluster credentials.
    pub async fn infer() -> Result<Self, ComposerError> {
        let config = Config::infer()
            .await
            .map_err(|e| ComposerError::ClientUnavailable(format!("inferring config: {e}")))?;
        Self::from_config(config)
    }

    /// An explicit kubeconfig wins; otherwise in-cluster credentials, then
    /// whatever can be inferred.
    pub async fn acquire(kubeconfig: Option<&Path>) -> Result<Self, ComposerError> {
        if let Some(path) = kubeconfig {
            return Self::from_kubeconfig(path).await;
        }
        match Self::in_cluster() {
            Ok(client) => Ok(client),
            Err(err) => {
                tracing::debug!(error=%err, "not running in-cluster, inferring config");
                Self::infer().await
            }
        }
    }

    fn from_config(config: Config) -> Result<Self, ComposerError> {
        Client::try_from(config)
            .map(|client| Self { client })
            .map_err(|e| ComposerError::ClientUnavailable(format!("building client: {e}")))
    }

    async fn create<K>(&self, namespace: &str, object: &K) -> Result<(), ClusterError>
    where
        K: Resource<Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Serialize
            + fmt::Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), object).await?;
        Ok(())
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn create_config_map(
        &self,
        namespace: &str,
        config_map: &ConfigMap,
    ) -> Result<(), ClusterError> {
        self.create(namespace, config_map).await
    }

    async fn create_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<(), ClusterError> {
        self.create(namespace, deployment).await
    }

    async fn create_service(&self, namespace: &str, service: &Service) -> Result<(), ClusterError> {
        self.create(namespace, service).await
    }
}

/// Process-wide cluster capability.
///
/// Acquired once at startup and shared read-only. When acquisition failed the
/// reason is kept so every provisioning request can report it.
#[derive(Clone)]
pub enum ClusterAccess {
    Ready(Arc<dyn ClusterClient>),
    Unavailable(String),
}

impl ClusterAccess {
    pub fn ready<C: ClusterClient + 'static>(client: C) -> Self {
        ClusterAccess::Ready(Arc::new(client))
    }

    pub fn from_result<C: ClusterClient + 'static>(result: Result<C, ComposerError>) -> Self {
        match result {
            Ok(client) => ClusterAccess::ready(client),
            Err(ComposerError::ClientUnavailable(reason)) => ClusterAccess::Unavailable(reason),
            Err(other) => ClusterAccess::Unavailable(other.to_string()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ClusterAccess::Ready(_))
    }

    pub fn client(&self) -> Result<&dyn ClusterClient, ComposerError> {
        match self {
            ClusterAccess::Ready(client) => Ok(client.as_ref()),
            ClusterAccess::Unavailable(reason) => {
                Err(ComposerError::ClientUnavailable(reason.clone()))
            }
        }
    }
}

impl fmt::Debug for ClusterAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterAccess::Ready(_) => f.write_str("ClusterAccess::Ready"),
            ClusterAccess::Unavailable(reason) => {
                f.debug_tuple("ClusterAccess::Unavailable").field(reason).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::memory::RecordingCluster;

    #[test]
    fn conflict_detection() {
        assert!(ClusterError::already_exists("configmap", "worker-1-configmap").is_conflict());
        assert!(!ClusterError::Transport("reset".to_string()).is_conflict());
        assert!(!ClusterError::Api {
            code: 403,
            reason: "Forbidden".to_string(),
            message: "quota".to_string(),
        }
        .is_conflict());
    }

    #[test]
    fn api_error_display() {
        let err = ClusterError::already_exists("service", "worker-1-service");
        assert_eq!(
            err.to_string(),
            "AlreadyExists (409): service \"worker-1-service\" already exists"
        );
    }

    #[test]
    fn unavailable_access_reports_reason() {
        let access = ClusterAccess::from_result::<RecordingCluster>(Err(
            ComposerError::ClientUnavailable("no service account token".to_string()),
        ));
        assert!(!access.is_ready());
        match access.client() {
            Err(ComposerError::ClientUnavailable(reason)) => {
                assert_eq!(reason, "no service account token")
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected unavailable access"),
        }
    }

    #[test]
    fn ready_access_hands_out_client() {
        let access = ClusterAccess::ready(RecordingCluster::new());
        assert!(access.is_ready());
        assert!(access.client().is_ok());
    }
}
