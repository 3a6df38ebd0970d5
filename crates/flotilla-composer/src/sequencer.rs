use tracing::{error, info, warn};

use flotilla_common::{
    ProvisioningReport, ResourceKind, ResourceOutcome, ResourceStatus, WorkerIdentity,
    WorkerOutcome, WorkerRequest,
};

use crate::cluster::{ClusterAccess, ClusterClient, ClusterError};
use crate::defaults::resolve;
use crate::error::ComposerError;
use crate::naming::{identity, resource_name};
use crate::resources::{build, WorkerResources};

/// Provisions worker fleets through a shared cluster capability.
#[derive(Debug, Clone)]
pub struct Composer {
    access: ClusterAccess,
}

impl Composer {
    pub fn new(access: ClusterAccess) -> Self {
        Self { access }
    }

    /// Create a ConfigMap, Deployment and Service for workers `1..=N`.
    ///
    /// Workers are handled one at a time in index order and their objects are
    /// submitted ConfigMap first, then Deployment, then Service. A failed
    /// submission is recorded and the run moves on to the next object. Only a
    /// missing cluster capability or an invalid request stops the run, and
    /// both do so before anything is submitted.
    pub async fn provision(
        &self,
        request: &WorkerRequest,
    ) -> Result<ProvisioningReport, ComposerError> {
        let client = self.access.client()?;
        let config = resolve(request)?;

        info!(
            workers = config.workers_count,
            namespace = %config.namespace,
            image = %config.image,
            port = config.base_port,
            "provisioning worker fleet"
        );

        let mut report = ProvisioningReport::new(config.namespace.clone(), config.workers_count);
        for index in 1..=config.workers_count {
            let worker = identity(&config, index);
            report.push(provision_worker(client, &worker).await);
        }
        report.finish();

        if report.is_complete() {
            info!(
                workers = config.workers_count,
                created = report.created_count(),
                "worker fleet provisioned"
            );
        } else {
            warn!(
                workers = config.workers_count,
                created = report.created_count(),
                failed = report.failure_count(),
                failed_workers = report.failed_workers().len(),
                skipped_workers = report.workers.iter().filter(|w| w.was_skipped()).count(),
                "worker fleet partially provisioned"
            );
        }
        Ok(report)
    }
}

async fn provision_worker(client: &dyn ClusterClient, worker: &WorkerIdentity) -> WorkerOutcome {
    let resources = match build(worker) {
        Ok(r) => r,
        Err(err) => {
            error!(worker = %worker.name, error = %err, "skipping worker");
            return skipped(worker, &err);
        }
    };

    let mut outcomes = Vec::with_capacity(ResourceKind::SUBMISSION_ORDER.len());
    for kind in ResourceKind::SUBMISSION_ORDER {
        let name = resource_name(&worker.name, kind);
        let status = match submit(client, &worker.namespace, &resources, kind).await {
            Ok(()) => {
                info!(worker = %worker.name, %kind, %name, "created");
                ResourceStatus::Created
            }
            Err(source) => {
                let conflict = source.is_conflict();
                let err = ComposerError::Submission {
                    kind,
                    name: name.clone(),
                    source,
                };
                if conflict {
                    warn!(worker = %worker.name, %kind, %name, error = %err, "object already exists");
                } else {
                    warn!(worker = %worker.name, %kind, %name, error = %err, "submission failed");
                }
                ResourceStatus::Failed {
                    reason: err.to_string(),
                }
            }
        };
        outcomes.push(ResourceOutcome { kind, name, status });
    }

    WorkerOutcome {
        index: worker.index,
        worker: worker.name.clone(),
        resources: outcomes,
    }
}

async fn submit(
    client: &dyn ClusterClient,
    namespace: &str,
    resources: &WorkerResources,
    kind: ResourceKind,
) -> Result<(), ClusterError> {
    match kind {
        ResourceKind::ConfigMap => client.create_config_map(namespace, &resources.config_map).await,
        ResourceKind::Deployment => client.create_deployment(namespace, &resources.deployment).await,
        ResourceKind::Service => client.create_service(namespace, &resources.service).await,
    }
}

fn skipped(worker: &WorkerIdentity, err: &ComposerError) -> WorkerOutcome {
    WorkerOutcome {
        index: worker.index,
        worker: worker.name.clone(),
        resources: ResourceKind::SUBMISSION_ORDER
            .iter()
            .map(|&kind| ResourceOutcome {
                kind,
                name: resource_name(&worker.name, kind),
                status: ResourceStatus::Skipped {
                    reason: err.to_string(),
                },
            })
            .collect(),
    }
}
