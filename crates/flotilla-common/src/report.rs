use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three cluster objects created for every worker, in submission order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    ConfigMap,
    Deployment,
    Service,
}

impl ResourceKind {
    pub const SUBMISSION_ORDER: [ResourceKind; 3] =
        [ResourceKind::ConfigMap, ResourceKind::Deployment, ResourceKind::Service];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ConfigMap => "configmap",
            ResourceKind::Deployment => "deployment",
            ResourceKind::Service => "service",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ResourceStatus {
    Created,
    /// The cluster rejected the create call or could not be reached.
    Failed { reason: String },
    /// Never submitted because the worker could not be built.
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOutcome {
    pub kind: ResourceKind,
    pub name: String,
    pub status: ResourceStatus,
}

impl ResourceOutcome {
    pub fn is_created(&self) -> bool {
        self.status == ResourceStatus::Created
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerOutcome {
    pub index: u32,
    pub worker: String,
    pub resources: Vec<ResourceOutcome>,
}

impl WorkerOutcome {
    pub fn is_complete(&self) -> bool {
        self.resources.iter().all(ResourceOutcome::is_created)
    }

    /// True when the worker never reached the cluster at all.
    pub fn was_skipped(&self) -> bool {
        !self.resources.is_empty()
            && self
                .resources
                .iter()
                .all(|r| matches!(r.status, ResourceStatus::Skipped { .. }))
    }
}

/// Per-(worker, resource) result of one provisioning run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningReport {
    pub namespace: String,
    pub requested: u32,
    pub workers: Vec<WorkerOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ProvisioningReport {
    pub fn new(namespace: impl Into<String>, requested: u32) -> Self {
        Self {
            namespace: namespace.into(),
            requested,
            workers: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn push(&mut self, outcome: WorkerOutcome) {
        self.workers.push(outcome);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Every requested worker has all of its resources created.
    pub fn is_complete(&self) -> bool {
        self.workers.len() == self.requested as usize
            && self.workers.iter().all(WorkerOutcome::is_complete)
    }

    pub fn failed_workers(&self) -> Vec<&WorkerOutcome> {
        self.workers.iter().filter(|w| !w.is_complete()).collect()
    }

    pub fn created_count(&self) -> usize {
        self.resources().filter(|(_, r)| r.is_created()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.resources().filter(|(_, r)| !r.is_created()).count()
    }

    /// All failures come from workers that could not be built; none reached
    /// the cluster and failed there.
    pub fn only_build_failures(&self) -> bool {
        let mut any = false;
        for (_, r) in self.resources() {
            match r.status {
                ResourceStatus::Created => {}
                ResourceStatus::Skipped { .. } => any = true,
                ResourceStatus::Failed { .. } => return false,
            }
        }
        any
    }

    /// First failing resource in submission order, with its worker name.
    pub fn first_failure(&self) -> Option<(&str, &ResourceOutcome)> {
        self.resources().find(|(_, r)| !r.is_created())
    }

    fn resources(&self) -> impl Iterator<Item = (&str, &ResourceOutcome)> {
        self.workers
            .iter()
            .flat_map(|w| w.resources.iter().map(move |r| (w.worker.as_str(), r)))
    }
}
