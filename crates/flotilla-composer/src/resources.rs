use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, HostPathVolumeSource, KeyToPath, PodSpec,
    PodTemplateSpec, Service, ServicePort, ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::Serialize;

use flotilla_common::WorkerIdentity;

use crate::error::ComposerError;
use crate::naming::{config_map_name, deployment_name, service_name};

// On-disk contract every worker image honors.
pub const CONFIG_FILE_KEY: &str = "config.json";
pub const CONFIG_VOLUME: &str = "config";
pub const CONFIG_MOUNT_PATH: &str = "/etc/config";
pub const DATA_VOLUME: &str = "data";
pub const DATA_MOUNT_PATH: &str = "/data";
pub const DATA_HOST_PATH: &str = "/data";

pub const CONTAINER_NAME: &str = "worker";
pub const WORKER_COMMAND: [&str; 2] = ["python3", "api.py"];
pub const APP_LABEL: &str = "app";
pub const IMAGE_PULL_POLICY: &str = "IfNotPresent";
pub const RESTART_POLICY: &str = "Always";
pub const SERVICE_PROTOCOL: &str = "TCP";

/// The three cluster objects for one worker.
///
/// The Deployment mounts the ConfigMap by name; the Service finds the
/// Deployment's pods through the `app` label. Both links rely on the same
/// worker name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResources {
    pub config_map: ConfigMap,
    pub deployment: Deployment,
    pub service: Service,
}

pub fn build(identity: &WorkerIdentity) -> Result<WorkerResources, ComposerError> {
    let payload = serde_json::to_string(&identity.config_payload()).map_err(|source| {
        ComposerError::Serialization {
            worker: identity.name.clone(),
            source,
        }
    })?;

    Ok(WorkerResources {
        config_map: config_map(identity, payload),
        deployment: deployment(identity),
        service: service(identity),
    })
}

fn metadata(name: String, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

fn app_labels(worker: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), worker.to_string())])
}

fn config_map(identity: &WorkerIdentity, payload: String) -> ConfigMap {
    ConfigMap {
        metadata: metadata(config_map_name(&identity.name), &identity.namespace),
        data: Some(BTreeMap::from([(CONFIG_FILE_KEY.to_string(), payload)])),
        ..Default::default()
    }
}

fn deployment(identity: &WorkerIdentity) -> Deployment {
    let labels = app_labels(&identity.name);

    let container = Container {
        name: CONTAINER_NAME.to_string(),
        image: Some(identity.image.clone()),
        image_pull_policy: Some(IMAGE_PULL_POLICY.to_string()),
        command: Some(WORKER_COMMAND.iter().map(|s| s.to_string()).collect()),
        volume_mounts: Some(vec![
            VolumeMount {
                name: CONFIG_VOLUME.to_string(),
                mount_path: CONFIG_MOUNT_PATH.to_string(),
                read_only: Some(true),
                ..Default::default()
            },
            VolumeMount {
                name: DATA_VOLUME.to_string(),
                mount_path: DATA_MOUNT_PATH.to_string(),
                ..Default::default()
            },
        ]),
        ..Default::default()
    };

    let volumes = vec![
        Volume {
            name: CONFIG_VOLUME.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: config_map_name(&identity.name).into(),
                items: Some(vec![KeyToPath {
                    key: CONFIG_FILE_KEY.to_string(),
                    path: CONFIG_FILE_KEY.to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        },
        Volume {
            name: DATA_VOLUME.to_string(),
            host_path: Some(HostPathVolumeSource {
                path: DATA_HOST_PATH.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        },
    ];

    Deployment {
        metadata: metadata(deployment_name(&identity.name), &identity.namespace),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    restart_policy: Some(RESTART_POLICY.to_string()),
                    volumes: Some(volumes),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn service(identity: &WorkerIdentity) -> Service {
    let port = i32::from(identity.port);
    Service {
        metadata: metadata(service_name(&identity.name), &identity.namespace),
        spec: Some(ServiceSpec {
            selector: Some(app_labels(&identity.name)),
            ports: Some(vec![ServicePort {
                protocol: Some(SERVICE_PROTOCOL.to_string()),
                port,
                target_port: Some(IntOrString::Int(port)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
