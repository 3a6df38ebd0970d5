//! Turns a `WorkerRequest` into per-worker ConfigMap, Deployment and Service
//! objects and submits them to a cluster.

pub mod cluster;
pub mod defaults;
pub mod error;
pub mod memory;
pub mod naming;
pub mod resources;
pub mod sequencer;

pub use cluster::{ClusterAccess, ClusterClient, ClusterError, KubeClusterClient};
pub use defaults::{resolve, MAX_WORKERS};
pub use error::ComposerError;
pub use memory::{RecordingCluster, SubmittedObject};
pub use resources::WorkerResources;
pub use sequencer::Composer;
