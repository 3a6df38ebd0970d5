use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::Metadata;
use serde::Serialize;
use tokio::sync::Mutex;

use flotilla_common::ResourceKind;

use crate::cluster::{ClusterClient, ClusterError};

/// One create call as seen by the recording cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedObject {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
    pub object: serde_json::Value,
    pub accepted: bool,
}

/// In-memory cluster that records every create call in order.
///
/// Names are unique per (kind, namespace); a second create of the same object
/// fails with `AlreadyExists` like the real API server. Individual objects can
/// be made to fail with `fail_on`.
#[derive(Debug, Clone, Default)]
pub struct RecordingCluster {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    calls: Vec<SubmittedObject>,
    existing: HashSet<(ResourceKind, String, String)>,
    failures: HashMap<(ResourceKind, String), ClusterError>,
}

impl RecordingCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every create of `kind` named `name` fails with `error` from now on.
    pub async fn fail_on(&self, kind: ResourceKind, name: &str, error: ClusterError) {
        let mut inner = self.inner.lock().await;
        inner.failures.insert((kind, name.to_string()), error);
    }

    /// All create calls in the order they arrived, failed ones included.
    pub async fn calls(&self) -> Vec<SubmittedObject> {
        self.inner.lock().await.calls.clone()
    }

    /// Objects the cluster accepted.
    pub async fn created(&self) -> Vec<SubmittedObject> {
        let inner = self.inner.lock().await;
        inner.calls.iter().filter(|c| c.accepted).cloned().collect()
    }

    async fn record<K>(
        &self,
        kind: ResourceKind,
        namespace: &str,
        object: &K,
    ) -> Result<(), ClusterError>
    where
        K: Metadata<Ty = ObjectMeta> + Serialize,
    {
        let name = object.metadata().name.clone().unwrap_or_default();
        let value =
            serde_json::to_value(object).map_err(|e| ClusterError::Transport(e.to_string()))?;

        let mut inner = self.inner.lock().await;
        let key = (kind, namespace.to_string(), name.clone());
        let injected = inner.failures.get(&(kind, name.clone())).cloned();
        let result = if let Some(err) = injected {
            Err(err)
        } else if inner.existing.contains(&key) {
            Err(ClusterError::already_exists(kind.as_str(), &name))
        } else {
            inner.existing.insert(key);
            Ok(())
        };

        inner.calls.push(SubmittedObject {
            kind,
            namespace: namespace.to_string(),
            name,
            object: value,
            accepted: result.is_ok(),
        });
        result
    }
}

#[async_trait]
impl ClusterClient for RecordingCluster {
    async fn create_config_map(
        &self,
        namespace: &str,
        config_map: &ConfigMap,
    ) -> Result<(), ClusterError> {
        self.record(ResourceKind::ConfigMap, namespace, config_map).await
    }

    async fn create_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<(), ClusterError> {
        self.record(ResourceKind::Deployment, namespace, deployment).await
    }

    async fn create_service(&self, namespace: &str, service: &Service) -> Result<(), ClusterError> {
        self.record(ResourceKind::Service, namespace, service).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cm(name: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn records_in_order() {
        let cluster = RecordingCluster::new();
        cluster.create_config_map("default", &cm("a")).await.unwrap();
        cluster.create_config_map("default", &cm("b")).await.unwrap();

        let calls = cluster.calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "a");
        assert_eq!(calls[1].name, "b");
        assert_eq!(calls[0].object["metadata"]["name"], "a");
        assert!(calls.iter().all(|c| c.accepted));
    }

    #[tokio::test]
    async fn duplicate_names_conflict() {
        let cluster = RecordingCluster::new();
        cluster.create_config_map("default", &cm("a")).await.unwrap();
        let err = cluster.create_config_map("default", &cm("a")).await.unwrap_err();
        assert!(err.is_conflict());

        // Same name in another namespace is a different object.
        cluster.create_config_map("other", &cm("a")).await.unwrap();
        assert_eq!(cluster.created().await.len(), 2);
        assert_eq!(cluster.calls().await.len(), 3);
    }

    #[tokio::test]
    async fn injected_failure() {
        let cluster = RecordingCluster::new();
        cluster
            .fail_on(
                ResourceKind::ConfigMap,
                "a",
                ClusterError::Transport("connection refused".to_string()),
            )
            .await;
        let err = cluster.create_config_map("default", &cm("a")).await.unwrap_err();
        assert_eq!(err, ClusterError::Transport("connection refused".to_string()));
        assert!(cluster.created().await.is_empty());
        assert!(!cluster.calls().await[0].accepted);
    }
}
