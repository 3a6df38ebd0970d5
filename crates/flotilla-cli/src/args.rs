use std::path::PathBuf;

use clap::{Parser, Subcommand};

use flotilla_common::{PortAssignment, WorkerRequest};

#[derive(Debug, Parser)]
#[command(name = "flotilla")]
#[command(about = "Provision worker fleets on Kubernetes", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask a running worker manager to create the fleet
    Create {
        /// Worker manager base URL
        #[arg(
            long,
            env = "FLOTILLA_MANAGER_URL",
            default_value = "http://127.0.0.1:8080"
        )]
        manager_url: String,

        #[command(flatten)]
        fleet: FleetArgs,
    },
    /// Create the fleet directly from this machine
    Apply {
        /// Kubeconfig to use; falls back to in-cluster or inferred credentials
        #[arg(long, env = "FLOTILLA_KUBECONFIG")]
        kubeconfig: Option<PathBuf>,

        /// Record objects in memory instead of creating them
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        #[command(flatten)]
        fleet: FleetArgs,
    },
    /// Print the objects each worker would get, as JSON
    Render {
        #[command(flatten)]
        fleet: FleetArgs,
    },
}

#[derive(Debug, Clone, clap::Args)]
pub struct FleetArgs {
    /// Number of workers
    #[arg(long, allow_negative_numbers = true)]
    pub workers: i64,

    /// Dataset each worker should load
    #[arg(long)]
    pub dataset_path: String,

    #[arg(long)]
    pub namespace: Option<String>,

    /// Worker container image
    #[arg(long)]
    pub image: Option<String>,

    /// Container and service port
    #[arg(long)]
    pub port: Option<u32>,

    #[arg(long)]
    pub upload_folder: Option<String>,

    /// Give worker i the port base + i instead of sharing one port
    #[arg(long, default_value_t = false)]
    pub offset_ports: bool,
}

impl FleetArgs {
    pub fn to_request(&self) -> WorkerRequest {
        WorkerRequest {
            workers_count: self.workers,
            dataset_path: self.dataset_path.clone(),
            namespace: self.namespace.clone(),
            image: self.image.clone(),
            worker_port: self.port,
            upload_folder: self.upload_folder.clone(),
            port_assignment: self.offset_ports.then_some(PortAssignment::OffsetByIndex),
        }
    }
}
