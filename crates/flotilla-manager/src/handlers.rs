use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use flotilla_common::{ProvisioningReport, WorkerRequest};
use flotilla_composer::ComposerError;

use crate::state::AppState;

fn new_request_id() -> String {
    format!("req_{}", Uuid::new_v4())
}

fn error_response(status: StatusCode, kind: &str, message: String, request_id: &str) -> Response {
    let body = json!({
        "error": {
            "message": message,
            "type": kind,
            "request_id": request_id
        }
    });
    (status, Json(body)).into_response()
}

fn report_status(report: &ProvisioningReport) -> StatusCode {
    if report.is_complete() {
        StatusCode::OK
    } else if report.only_build_failures() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::BAD_GATEWAY
    }
}

pub async fn create_workers(State(st): State<AppState>, body: Bytes) -> Response {
    let request_id = new_request_id();
    let span = tracing::info_span!("create_workers", request_id = %request_id);

    async move {
        let req: WorkerRequest = match serde_json::from_slice(&body) {
            Ok(r) => r,
            Err(e) => {
                warn!(error=%e, "cannot decode worker request");
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "invalid_body",
                    format!("cannot decode request body: {e}"),
                    &request_id,
                );
            }
        };
        info!(
            workers = req.workers_count,
            dataset = %req.dataset_path,
            "create workers request"
        );

        match st.composer.provision(&req).await {
            Ok(report) => {
                st.metrics.record_report(&report);
                (report_status(&report), Json(report)).into_response()
            }
            Err(err @ ComposerError::InvalidRequest(_)) => {
                warn!(error=%err, "rejected worker request");
                error_response(
                    StatusCode::BAD_REQUEST,
                    "invalid_request",
                    err.to_string(),
                    &request_id,
                )
            }
            Err(err @ ComposerError::ClientUnavailable(_)) => {
                warn!(error=%err, "cannot provision workers");
                error_response(
                    StatusCode::BAD_GATEWAY,
                    "client_unavailable",
                    err.to_string(),
                    &request_id,
                )
            }
            Err(err) => {
                warn!(error=%err, "provisioning failed");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "provisioning_failed",
                    err.to_string(),
                    &request_id,
                )
            }
        }
    }
    .instrument(span)
    .await
}

pub async fn delete_workers() -> Response {
    error_response(
        StatusCode::NOT_IMPLEMENTED,
        "not_implemented",
        "deleting workers is not supported".to_string(),
        &new_request_id(),
    )
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use axum::Router;
    use tower::ServiceExt;

    use flotilla_common::ResourceKind;
    use flotilla_composer::{ClusterAccess, ClusterError, Composer, RecordingCluster};

    use super::*;
    use crate::build_app;
    use crate::metrics::Metrics;

    fn app(access: ClusterAccess) -> Router {
        build_app(AppState {
            composer: Arc::new(Composer::new(access)),
            metrics: Arc::new(Metrics::default()),
        })
    }

    async fn post(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/worker-manager/create-workers")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn creates_workers() {
        let cluster = RecordingCluster::new();
        let (status, body) = post(
            app(ClusterAccess::ready(cluster.clone())),
            r#"{"workersCount": 2, "datasetPath": "setA"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["namespace"], "default");
        assert_eq!(body["requested"], 2);
        assert_eq!(body["workers"][1]["worker"], "worker-2");
        assert_eq!(body["workers"][1]["resources"][2]["status"]["state"], "created");
        assert_eq!(cluster.created().await.len(), 6);
    }

    #[tokio::test]
    async fn undecodable_body_is_bad_request() {
        let cluster = RecordingCluster::new();
        let (status, body) = post(app(ClusterAccess::ready(cluster.clone())), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_body");
        assert!(body["error"]["request_id"].as_str().unwrap().starts_with("req_"));
        assert!(cluster.calls().await.is_empty());
    }

    #[tokio::test]
    async fn invalid_request_is_bad_request() {
        let cluster = RecordingCluster::new();
        let (status, body) = post(
            app(ClusterAccess::ready(cluster.clone())),
            r#"{"workersCount": 0, "datasetPath": "setA"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request");
        assert!(cluster.calls().await.is_empty());
    }

    #[tokio::test]
    async fn oversized_fleet_is_bad_request() {
        let cluster = RecordingCluster::new();
        let (status, body) = post(
            app(ClusterAccess::ready(cluster.clone())),
            r#"{"workersCount": 4000000000, "datasetPath": "x"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("exceeds the limit"));
        assert!(cluster.calls().await.is_empty());
    }

    #[tokio::test]
    async fn empty_dataset_is_bad_request() {
        let cluster = RecordingCluster::new();
        let (status, _) = post(
            app(ClusterAccess::ready(cluster.clone())),
            r#"{"workersCount": 2, "datasetPath": ""}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(cluster.calls().await.is_empty());
    }

    #[tokio::test]
    async fn unavailable_cluster_is_bad_gateway() {
        let (status, body) = post(
            app(ClusterAccess::Unavailable("no credentials".to_string())),
            r#"{"workersCount": 1, "datasetPath": "setA"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["type"], "client_unavailable");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("no credentials"));
    }

    #[tokio::test]
    async fn partial_failure_returns_report() {
        let cluster = RecordingCluster::new();
        cluster
            .fail_on(
                ResourceKind::Service,
                "worker-1-service",
                ClusterError::Api {
                    code: 403,
                    reason: "Forbidden".to_string(),
                    message: "exceeded quota".to_string(),
                },
            )
            .await;
        let (status, body) = post(
            app(ClusterAccess::ready(cluster.clone())),
            r#"{"workersCount": 2, "datasetPath": "setA"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["workers"][0]["resources"][2]["status"]["state"], "failed");
        assert_eq!(body["workers"][1]["resources"][2]["status"]["state"], "created");
        assert_eq!(cluster.created().await.len(), 5);
    }

    #[tokio::test]
    async fn delete_is_not_implemented() {
        let resp = app(ClusterAccess::ready(RecordingCluster::new()))
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/worker-manager/delete-workers")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn metrics_count_requests() {
        let st = AppState {
            composer: Arc::new(Composer::new(ClusterAccess::ready(RecordingCluster::new()))),
            metrics: Arc::new(Metrics::default()),
        };
        let metrics = st.metrics.clone();
        let app = build_app(st);

        let (status, _) = post(app.clone(), r#"{"workersCount": 3, "datasetPath": "setA"}"#).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = post(app, r#"{"workersCount": -1, "datasetPath": "setA"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        use std::sync::atomic::Ordering;
        assert_eq!(metrics.requests_total.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.status_2xx.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.status_4xx.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.workers_requested.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.resources_created.load(Ordering::Relaxed), 9);
    }
}
