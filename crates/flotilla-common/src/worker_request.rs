use serde::{Deserialize, Serialize};

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_IMAGE: &str = "ofl-worker:latest";
pub const DEFAULT_WORKER_PORT: u16 = 9000;
pub const DEFAULT_UPLOAD_FOLDER: &str = "/data";

/// How each worker's port is derived from the fleet base port.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PortAssignment {
    /// Every worker listens on the base port.
    #[default]
    Fixed,
    /// Worker `i` listens on `base + i`.
    OffsetByIndex,
}

/// Declarative request for a fleet of homogeneous workers.
///
/// Decoded from the body of `POST /worker-manager/create-workers`. Optional
/// fields left out, empty strings and a zero port all fall back to the fleet
/// defaults during resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRequest {
    /// Signed so that zero and negative counts reach validation.
    #[serde(default, alias = "workersNo")]
    pub workers_count: i64,

    #[serde(default)]
    pub dataset_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_port: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_folder: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_assignment: Option<PortAssignment>,
}

/// A `WorkerRequest` with every default applied and every field validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFleetConfig {
    pub workers_count: u32,
    pub namespace: String,
    pub image: String,
    pub base_port: u16,
    pub upload_folder: String,
    pub dataset_path: String,
    pub port_assignment: PortAssignment,
}

impl ResolvedFleetConfig {
    /// Port used by the worker at the 1-based `index`.
    pub fn port_for(&self, index: u32) -> u16 {
        match self.port_assignment {
            PortAssignment::Fixed => self.base_port,
            PortAssignment::OffsetByIndex => {
                let offset = u16::try_from(index).unwrap_or(u16::MAX);
                self.base_port.saturating_add(offset)
            }
        }
    }

    /// Fully specified request that resolves back to this configuration.
    pub fn to_request(&self) -> WorkerRequest {
        WorkerRequest {
            workers_count: i64::from(self.workers_count),
            dataset_path: self.dataset_path.clone(),
            namespace: Some(self.namespace.clone()),
            image: Some(self.image.clone()),
            worker_port: Some(u32::from(self.base_port)),
            upload_folder: Some(self.upload_folder.clone()),
            port_assignment: Some(self.port_assignment),
        }
    }
}
