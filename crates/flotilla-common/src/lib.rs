pub mod report;
pub mod worker_identity;
pub mod worker_request;

pub use report::{ProvisioningReport, ResourceKind, ResourceOutcome, ResourceStatus, WorkerOutcome};
pub use worker_identity::{WorkerConfigPayload, WorkerIdentity};
pub use worker_request::{
    PortAssignment, ResolvedFleetConfig, WorkerRequest, DEFAULT_IMAGE, DEFAULT_NAMESPACE,
    DEFAULT_UPLOAD_FOLDER, DEFAULT_WORKER_PORT,
};

pub mod telemetry;
