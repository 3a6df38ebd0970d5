mod args;
mod output;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Client;
use tracing_subscriber::EnvFilter;

use flotilla_common::{ProvisioningReport, WorkerRequest};
use flotilla_composer::{
    naming, resources, ClusterAccess, Composer, KubeClusterClient, RecordingCluster,
    WorkerResources,
};

use crate::args::{Args, Command};
use crate::output::print_report;

fn create_url(manager_url: &str) -> String {
    format!(
        "{}/worker-manager/create-workers",
        manager_url.trim_end_matches('/')
    )
}

fn exit_for(report: &ProvisioningReport) -> ExitCode {
    if report.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn create(client: &Client, manager_url: &str, req: &WorkerRequest) -> Result<ExitCode> {
    let url = create_url(manager_url);
    let resp = client
        .post(&url)
        .json(req)
        .send()
        .await
        .with_context(|| format!("failed to reach worker manager at {url}"))?;
    let status = resp.status();
    let body = resp.text().await?;

    if let Ok(report) = serde_json::from_str::<ProvisioningReport>(&body) {
        print_report(&report);
        return Ok(exit_for(&report));
    }

    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(body);
    eprintln!("✗ Failed to create workers ({status}): {message}");
    Ok(ExitCode::FAILURE)
}

async fn apply(
    kubeconfig: Option<&std::path::Path>,
    dry_run: bool,
    req: &WorkerRequest,
) -> Result<ProvisioningReport> {
    let access = if dry_run {
        tracing::warn!("dry run: objects are recorded in memory only");
        ClusterAccess::ready(RecordingCluster::new())
    } else {
        ClusterAccess::from_result(KubeClusterClient::acquire(kubeconfig).await)
    };
    Ok(Composer::new(access).provision(req).await?)
}

fn render(req: &WorkerRequest) -> Result<Vec<WorkerResources>> {
    let config = flotilla_composer::resolve(req)?;
    let objects = (1..=config.workers_count)
        .map(|index| resources::build(&naming::identity(&config, index)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(objects)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Create { manager_url, fleet } => {
            let client = Client::new();
            create(&client, &manager_url, &fleet.to_request()).await
        }
        Command::Apply {
            kubeconfig,
            dry_run,
            fleet,
        } => {
            let report = apply(kubeconfig.as_deref(), dry_run, &fleet.to_request()).await?;
            print_report(&report);
            Ok(exit_for(&report))
        }
        Command::Render { fleet } => {
            let objects = render(&fleet.to_request())?;
            println!("{}", serde_json::to_string_pretty(&objects)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(count: i64) -> WorkerRequest {
        WorkerRequest {
            workers_count: count,
            dataset_path: "setA".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn url_joins_without_double_slash() {
        assert_eq!(
            create_url("http://mgr:8080/"),
            "http://mgr:8080/worker-manager/create-workers"
        );
    }

    #[test]
    fn render_builds_one_set_per_worker() {
        let objects = render(&request(3)).unwrap();
        assert_eq!(objects.len(), 3);
        assert_eq!(
            objects[2].service.metadata.name.as_deref(),
            Some("worker-3-service")
        );
    }

    #[tokio::test]
    async fn apply_rejects_invalid_request() {
        let err = apply(None, true, &request(-1)).await.unwrap_err();
        assert!(err.to_string().contains("workersCount"));
    }

    #[test]
    fn render_rejects_invalid_request() {
        let err = render(&request(0)).unwrap_err();
        assert!(err.to_string().contains("workersCount"));
    }

    #[tokio::test]
    async fn dry_run_apply_succeeds() {
        let report = apply(None, true, &request(2)).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.created_count(), 6);
    }
}
