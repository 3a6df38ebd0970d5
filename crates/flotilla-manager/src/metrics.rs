use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use flotilla_common::ProvisioningReport;

use crate::state::AppState;

#[derive(Debug, Default)]
pub struct Metrics {
    pub requests_total: AtomicU64,
    pub requests_inflight: AtomicU64,
    pub status_2xx: AtomicU64,
    pub status_4xx: AtomicU64,
    pub status_5xx: AtomicU64,
    pub workers_requested: AtomicU64,
    pub resources_created: AtomicU64,
    pub resources_failed: AtomicU64,
}

impl Metrics {
    pub fn record_report(&self, report: &ProvisioningReport) {
        self.workers_requested
            .fetch_add(u64::from(report.requested), Ordering::Relaxed);
        self.resources_created
            .fetch_add(report.created_count() as u64, Ordering::Relaxed);
        self.resources_failed
            .fetch_add(report.failure_count() as u64, Ordering::Relaxed);
    }
}

pub fn render_metrics(metrics: &Metrics) -> String {
    let series: [(&str, &str, &str, &AtomicU64); 8] = [
        ("requests_total", "counter", "Total requests handled.", &metrics.requests_total),
        ("requests_inflight", "gauge", "Currently in-flight requests.", &metrics.requests_inflight),
        ("responses_2xx", "counter", "Total 2xx responses.", &metrics.status_2xx),
        ("responses_4xx", "counter", "Total 4xx responses.", &metrics.status_4xx),
        ("responses_5xx", "counter", "Total 5xx responses.", &metrics.status_5xx),
        ("workers_requested", "counter", "Workers asked for across all requests.", &metrics.workers_requested),
        ("resources_created", "counter", "Cluster objects created.", &metrics.resources_created),
        ("resources_failed", "counter", "Cluster objects that failed or were skipped.", &metrics.resources_failed),
    ];

    let mut body = String::with_capacity(1024);
    for (name, kind, help, value) in series {
        let _ = writeln!(body, "# HELP flotilla_manager_{name} {help}");
        let _ = writeln!(body, "# TYPE flotilla_manager_{name} {kind}");
        let _ = writeln!(body, "flotilla_manager_{name} {}", value.load(Ordering::Relaxed));
    }
    body
}

pub async fn metrics_handler(State(st): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        render_metrics(&st.metrics),
    )
}

/// Counts a request as in flight until dropped, so a handler that panics or
/// is cancelled still releases the gauge.
struct InflightGuard<'a>(&'a AtomicU64);

impl<'a> InflightGuard<'a> {
    fn enter(gauge: &'a AtomicU64) -> Self {
        gauge.fetch_add(1, Ordering::Relaxed);
        Self(gauge)
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

impl Metrics {
    fn status_counter(&self, status: StatusCode) -> Option<&AtomicU64> {
        if status.is_server_error() {
            Some(&self.status_5xx)
        } else if status.is_client_error() {
            Some(&self.status_4xx)
        } else if status.is_success() {
            Some(&self.status_2xx)
        } else {
            None
        }
    }
}

pub async fn track_requests(State(st): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let resp = {
        let _inflight = InflightGuard::enter(&st.metrics.requests_inflight);
        next.run(req).await
    };
    st.metrics.requests_total.fetch_add(1, Ordering::Relaxed);
    if let Some(counter) = st.metrics.status_counter(resp.status()) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
    resp
}
