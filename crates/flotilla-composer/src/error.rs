use flotilla_common::ResourceKind;
use thiserror::Error;

use crate::cluster::ClusterError;

#[derive(Debug, Error)]
pub enum ComposerError {
    /// Malformed or out-of-range input. Nothing was submitted.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No cluster capability. Nothing was submitted.
    #[error("cluster client unavailable: {0}")]
    ClientUnavailable(String),

    /// Worker configuration could not be encoded; the worker is skipped.
    #[error("cannot encode configuration for {worker}: {source}")]
    Serialization {
        worker: String,
        #[source]
        source: serde_json::Error,
    },

    /// The cluster rejected or never received a create call.
    #[error("failed to create {kind} {name}: {source}")]
    Submission {
        kind: ResourceKind,
        name: String,
        #[source]
        source: ClusterError,
    },
}
