use std::fmt::Write;

use flotilla_common::{ProvisioningReport, ResourceStatus};

fn status_label(status: &ResourceStatus) -> (&'static str, &str) {
    match status {
        ResourceStatus::Created => ("CREATED", ""),
        ResourceStatus::Failed { reason } => ("FAILED", reason),
        ResourceStatus::Skipped { reason } => ("SKIPPED", reason),
    }
}

pub fn format_report(report: &ProvisioningReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "\n=== Workers in namespace {} ({} requested) ===\n",
        report.namespace, report.requested
    );
    let _ = writeln!(
        out,
        "{:<12} {:<12} {:<28} {:<10} {}",
        "Worker", "Kind", "Name", "Status", "Detail"
    );
    let _ = writeln!(out, "{:-<90}", "");
    for worker in &report.workers {
        for res in &worker.resources {
            let (label, detail) = status_label(&res.status);
            let _ = writeln!(
                out,
                "{:<12} {:<12} {:<28} {:<10} {}",
                worker.worker, res.kind.as_str(), res.name, label, detail
            );
        }
    }
    let _ = writeln!(
        out,
        "\n{} created, {} failed",
        report.created_count(),
        report.failure_count()
    );
    if let Some((worker, res)) = report.first_failure() {
        let (_, detail) = status_label(&res.status);
        let _ = writeln!(out, "first failure: {worker} {} {}: {detail}", res.kind, res.name);
    }
    out
}

pub fn print_report(report: &ProvisioningReport) {
    print!("{}", format_report(report));
}
