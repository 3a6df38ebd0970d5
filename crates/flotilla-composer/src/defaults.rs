use flotilla_common::{
    PortAssignment, ResolvedFleetConfig, WorkerRequest, DEFAULT_IMAGE, DEFAULT_NAMESPACE,
    DEFAULT_UPLOAD_FOLDER, DEFAULT_WORKER_PORT,
};

use crate::error::ComposerError;

/// Largest fleet a single request may ask for. Workers are created one at a
/// time, so larger fleets are split across requests.
pub const MAX_WORKERS: u32 = 10_000;

/// Validate `request` and fill every omitted field with the fleet default.
///
/// Fails when the worker count is not in `1..=MAX_WORKERS`, the dataset path is empty, or
/// a port does not fit in 1..=65535. Supplied values pass through unchanged.
pub fn resolve(request: &WorkerRequest) -> Result<ResolvedFleetConfig, ComposerError> {
    if request.workers_count <= 0 {
        return Err(ComposerError::InvalidRequest(format!(
            "workersCount must be greater than zero, got {}",
            request.workers_count
        )));
    }
    let workers_count = u32::try_from(request.workers_count).map_err(|_| {
        ComposerError::InvalidRequest(format!(
            "workersCount {} is out of range",
            request.workers_count
        ))
    })?;
    if workers_count > MAX_WORKERS {
        return Err(ComposerError::InvalidRequest(format!(
            "workersCount {workers_count} exceeds the limit of {MAX_WORKERS}"
        )));
    }

    if request.dataset_path.trim().is_empty() {
        return Err(ComposerError::InvalidRequest(
            "datasetPath must not be empty".to_string(),
        ));
    }

    let base_port = match request.worker_port {
        None | Some(0) => DEFAULT_WORKER_PORT,
        Some(p) => u16::try_from(p).map_err(|_| {
            ComposerError::InvalidRequest(format!("workerPort {p} is not a valid TCP port"))
        })?,
    };

    let port_assignment = request.port_assignment.unwrap_or_default();
    if port_assignment == PortAssignment::OffsetByIndex
        && u32::from(base_port) + workers_count > u32::from(u16::MAX)
    {
        return Err(ComposerError::InvalidRequest(format!(
            "workerPort {base_port} offset by {workers_count} workers exceeds {}",
            u16::MAX
        )));
    }

    Ok(ResolvedFleetConfig {
        workers_count,
        namespace: or_default(request.namespace.as_deref(), DEFAULT_NAMESPACE),
        image: or_default(request.image.as_deref(), DEFAULT_IMAGE),
        base_port,
        upload_folder: or_default(request.upload_folder.as_deref(), DEFAULT_UPLOAD_FOLDER),
        dataset_path: request.dataset_path.clone(),
        port_assignment,
    })
}

fn or_default(value: Option<&str>, default: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(count: i64, dataset: &str) -> WorkerRequest {
        WorkerRequest {
            workers_count: count,
            dataset_path: dataset.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn applies_defaults() {
        let cfg = resolve(&request(2, "setA")).unwrap();
        assert_eq!(cfg.workers_count, 2);
        assert_eq!(cfg.namespace, "default");
        assert_eq!(cfg.image, "ofl-worker:latest");
        assert_eq!(cfg.base_port, 9000);
        assert_eq!(cfg.upload_folder, "/data");
        assert_eq!(cfg.dataset_path, "setA");
        assert_eq!(cfg.port_assignment, PortAssignment::Fixed);
    }

    #[test]
    fn supplied_values_pass_through() {
        let req = WorkerRequest {
            workers_count: 1,
            dataset_path: "setA".to_string(),
            namespace: Some("ml".to_string()),
            image: Some("ofl-worker:v3".to_string()),
            worker_port: Some(9100),
            upload_folder: Some("/uploads".to_string()),
            port_assignment: Some(PortAssignment::OffsetByIndex),
        };
        let cfg = resolve(&req).unwrap();
        assert_eq!(cfg.namespace, "ml");
        assert_eq!(cfg.image, "ofl-worker:v3");
        assert_eq!(cfg.base_port, 9100);
        assert_eq!(cfg.upload_folder, "/uploads");
        assert_eq!(cfg.port_assignment, PortAssignment::OffsetByIndex);
    }

    #[test]
    fn empty_and_zero_values_count_as_absent() {
        let req = WorkerRequest {
            workers_count: 1,
            dataset_path: "setA".to_string(),
            namespace: Some(String::new()),
            image: Some("  ".to_string()),
            worker_port: Some(0),
            upload_folder: Some(String::new()),
            port_assignment: None,
        };
        let cfg = resolve(&req).unwrap();
        assert_eq!(cfg.namespace, DEFAULT_NAMESPACE);
        assert_eq!(cfg.image, DEFAULT_IMAGE);
        assert_eq!(cfg.base_port, DEFAULT_WORKER_PORT);
        assert_eq!(cfg.upload_folder, DEFAULT_UPLOAD_FOLDER);
    }

    #[test]
    fn resolution_is_idempotent() {
        let first = resolve(&request(3, "setB")).unwrap();
        let second = resolve(&first.to_request()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn every_optional_combination_resolves() {
        for mask in 0u8..16 {
            let req = WorkerRequest {
                workers_count: 1,
                dataset_path: "setA".to_string(),
                namespace: (mask & 1 != 0).then(|| "ns".to_string()),
                image: (mask & 2 != 0).then(|| "img:1".to_string()),
                worker_port: (mask & 4 != 0).then_some(9300),
                upload_folder: (mask & 8 != 0).then(|| "/up".to_string()),
                port_assignment: None,
            };
            let cfg = resolve(&req).unwrap();
            assert!(!cfg.namespace.is_empty());
            assert!(!cfg.image.is_empty());
            assert!(cfg.base_port > 0);
            assert!(!cfg.upload_folder.is_empty());
        }
    }

    #[test]
    fn rejects_non_positive_count() {
        for count in [0, -1, -100] {
            match resolve(&request(count, "setA")) {
                Err(ComposerError::InvalidRequest(msg)) => assert!(msg.contains("workersCount")),
                other => panic!("expected InvalidRequest, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_oversized_count() {
        for count in [
            i64::from(MAX_WORKERS) + 1,
            4_000_000_000,
            i64::from(u32::MAX) + 1,
        ] {
            match resolve(&request(count, "setA")) {
                Err(ComposerError::InvalidRequest(msg)) => assert!(msg.contains("workersCount")),
                other => panic!("expected InvalidRequest for {count}, got {other:?}"),
            }
        }
    }

    #[test]
    fn accepts_count_at_limit() {
        let cfg = resolve(&request(i64::from(MAX_WORKERS), "setA")).unwrap();
        assert_eq!(cfg.workers_count, MAX_WORKERS);
    }

    #[test]
    fn rejects_empty_dataset_path() {
        for dataset in ["", "   "] {
            match resolve(&request(1, dataset)) {
                Err(ComposerError::InvalidRequest(msg)) => assert!(msg.contains("datasetPath")),
                other => panic!("expected InvalidRequest, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_port_out_of_range() {
        let mut req = request(1, "setA");
        req.worker_port = Some(70_000);
        assert!(matches!(resolve(&req), Err(ComposerError::InvalidRequest(_))));
    }

    #[test]
    fn rejects_offset_overflow() {
        let mut req = request(10, "setA");
        req.worker_port = Some(65_530);
        req.port_assignment = Some(PortAssignment::OffsetByIndex);
        assert!(matches!(resolve(&req), Err(ComposerError::InvalidRequest(_))));

        req.port_assignment = Some(PortAssignment::Fixed);
        assert_eq!(resolve(&req).unwrap().base_port, 65_530);
    }
}
