use flotilla_common::{ResolvedFleetConfig, ResourceKind, WorkerIdentity};

pub const WORKER_NAME_PREFIX: &str = "worker";

/// Name of the worker at the 1-based `index`, e.g. `worker-3`.
pub fn worker_name(index: u32) -> String {
    format!("{WORKER_NAME_PREFIX}-{index}")
}

/// Name of one of the worker's cluster objects, e.g. `worker-3-service`.
pub fn resource_name(worker: &str, kind: ResourceKind) -> String {
    format!("{worker}-{}", kind.as_str())
}

pub fn config_map_name(worker: &str) -> String {
    resource_name(worker, ResourceKind::ConfigMap)
}

pub fn deployment_name(worker: &str) -> String {
    resource_name(worker, ResourceKind::Deployment)
}

pub fn service_name(worker: &str) -> String {
    resource_name(worker, ResourceKind::Service)
}

/// Identity of the worker at `index` within the fleet.
pub fn identity(config: &ResolvedFleetConfig, index: u32) -> WorkerIdentity {
    WorkerIdentity {
        index,
        name: worker_name(index),
        namespace: config.namespace.clone(),
        image: config.image.clone(),
        port: config.port_for(index),
        upload_folder: config.upload_folder.clone(),
        dataset_path: config.dataset_path.clone(),
    }
}
