//! portpub - host port publishing CLI
//!
//! Keeps published state in a JSON state file between invocations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::Level;
use uuid::Uuid;

use portpub_core::{
    ExposedPort, LoggingBinder, PublishRequest, PublisherConfig, PublishingCoordinator, StateStore,
};

#[derive(Parser)]
#[command(name = "portpub")]
#[command(version)]
#[command(about = "Host port publishing engine", long_about = None)]
struct Cli {
    /// Publisher config file (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// State file, overrides the config's stateFile
    #[arg(long, global = true)]
    state: Option<PathBuf>,
    /// Enable verbose logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish ports for a new container and print its id
    Run {
        /// Container id (random when omitted)
        #[arg(long)]
        name: Option<String>,
        /// Publish spec, [hostIP:]hostPort[-end]:containerPort[-end][/protocol]
        #[arg(short = 'p', long = "publish")]
        publish: Vec<String>,
        /// Expose a container port without publishing it (port[-end][/protocol])
        #[arg(long)]
        expose: Vec<String>,
        /// Publish every exposed port to a host port from the ephemeral range
        #[arg(short = 'P', long = "publish-all")]
        publish_all: bool,
    },
    /// List port bindings of a container
    Port {
        /// Container id
        container: String,
        /// Only this container port (e.g., 80 or 53/udp)
        port: Option<String>,
    },
    /// Release every published port of the given containers
    Rm {
        /// Container ids
        #[arg(required = true)]
        containers: Vec<String>,
    },
    /// List containers with their ports
    Ps,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let config = PublisherConfig::load_or_default(cli.config.as_deref())
        .context("failed to load publisher config")?;

    let state_path = cli
        .state
        .or_else(|| config.spec.state_file.clone())
        .unwrap_or_else(default_state_path);
    let store = StateStore::new(&state_path);

    let coordinator = PublishingCoordinator::from_config(&config, Arc::new(LoggingBinder));
    let snapshot = store
        .load()
        .with_context(|| format!("failed to read state file {}", state_path.display()))?;
    coordinator
        .restore(&snapshot)
        .context("state file holds conflicting bindings")?;

    match cli.command {
        Commands::Run {
            name,
            publish,
            expose,
            publish_all,
        } => {
            let container_id = name.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
            if coordinator.table().contains(&container_id) {
                bail!("container {} already exists", container_id);
            }

            let request = PublishRequest {
                specs: publish,
                exposed: expose,
                publish_all,
            };
            coordinator.publish_request(&container_id, &request)?;
            store.save(&coordinator.snapshot())?;
            println!("{}", container_id);
        }
        Commands::Port { container, port } => {
            let filter = port
                .map(|p| p.parse::<ExposedPort>())
                .transpose()?;
            for line in coordinator.query(&container, filter)? {
                println!("{}", line);
            }
        }
        Commands::Rm { containers } => {
            let mut missing = Vec::new();
            for container_id in containers {
                if !coordinator.table().contains(&container_id) {
                    missing.push(container_id);
                    continue;
                }
                coordinator.teardown(&container_id);
                println!("{}", container_id);
            }
            store.save(&coordinator.snapshot())?;

            if !missing.is_empty() {
                bail!("No such container: {}", missing.join(", "));
            }
        }
        Commands::Ps => {
            println!("{:<34} PORTS", "CONTAINER ID");
            for container_id in coordinator.containers() {
                println!("{:<34} {}", container_id, coordinator.summary(&container_id)?);
            }
        }
    }

    Ok(())
}

/// ~/.config/portpub/state.json, or ./.portpub-state.json without HOME
fn default_state_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home)
            .join(".config")
            .join("portpub")
            .join("state.json"),
        None => PathBuf::from(".portpub-state.json"),
    }
}
