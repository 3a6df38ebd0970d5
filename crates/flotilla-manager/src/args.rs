use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about = "HTTP service that provisions worker fleets on Kubernetes")]
pub struct Args {
    /// JSON file holding `managerPort`.
    #[arg(long, env = "FLOTILLA_CONFIG", default_value = "/etc/config/config.json")]
    pub config: PathBuf,

    #[arg(long, env = "FLOTILLA_LISTEN_HOST", default_value = "0.0.0.0")]
    pub listen_host: String,

    /// Listen port; skips the config file when set.
    #[arg(long, env = "FLOTILLA_PORT")]
    pub port: Option<u16>,

    /// Use this kubeconfig instead of in-cluster credentials.
    #[arg(long, env = "FLOTILLA_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Record objects in memory instead of creating them in a cluster.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// OTLP/HTTP base URL for trace export.
    #[arg(long, env = "FLOTILLA_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    #[arg(long, env = "FLOTILLA_OTLP_TOKEN")]
    pub otlp_token: Option<String>,
}
