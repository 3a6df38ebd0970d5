use serde::{Deserialize, Serialize};

/// Per-worker identity derived from a resolved fleet configuration.
///
/// Built fresh for each worker index and dropped once its resources have been
/// submitted. The cluster is the system of record; nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerIdentity {
    /// 1-based position in the fleet.
    pub index: u32,
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub port: u16,
    pub upload_folder: String,
    pub dataset_path: String,
}

impl WorkerIdentity {
    pub fn config_payload(&self) -> WorkerConfigPayload {
        WorkerConfigPayload {
            worker_id: self.name.clone(),
            port: self.port,
            upload_folder: self.upload_folder.clone(),
            dataset_path: self.dataset_path.clone(),
        }
    }
}

/// Contents of `config.json` inside the worker's ConfigMap.
///
/// Worker images read this file from `/etc/config/config.json` at start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerConfigPayload {
    #[serde(rename = "workerID", alias = "workerId")]
    pub worker_id: String,
    pub port: u16,
    pub upload_folder: String,
    pub dataset_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_wire_keys() {
        let payload = WorkerConfigPayload {
            worker_id: "worker-1".to_string(),
            port: 9000,
            upload_folder: "/data".to_string(),
            dataset_path: "setA".to_string(),
        };
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "workerID": "worker-1",
                "port": 9000,
                "uploadFolder": "/data",
                "datasetPath": "setA"
            })
        );
    }

    #[test]
    fn payload_accepts_camel_case_worker_id() {
        let payload: WorkerConfigPayload = serde_json::from_str(
            r#"{"workerId":"worker-2","port":9100,"uploadFolder":"/up","datasetPath":"d"}"#,
        )
        .unwrap();
        assert_eq!(payload.worker_id, "worker-2");
        assert_eq!(payload.port, 9100);
    }
}
