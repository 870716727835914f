mod commands;
mod error;
mod gateway;
mod models;
mod prompt;
mod resolver;
mod session;
mod tunnel;
pub mod utils;

use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::forward::ForwardArgs;
use crate::commands::log::LogFilter;
use crate::gateway::KubeGateway;
use crate::models::EnvironmentTag;
use crate::session::SessionOptions;

#[derive(Parser)]
#[command(name = "kport", about = "Port-forward to services by name and environment", author, version, long_about = None)]
struct Cli {
    /// kubectl binary used to run port-forward
    #[arg(long, global = true, env = "KPORT_KUBECTL", default_value = "kubectl")]
    kubectl: String,
    /// Remote port offered when the service ports can't be detected
    #[arg(long, global = true, env = "KPORT_DEFAULT_PORT", default_value_t = 8080)]
    default_port: u16,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TargetArgs {
    /// Target namespace.
    /// If -n is passed without a value, uses current context.
    /// If -n is missing, shows interactive menu.
    #[arg(short, long, num_args = 0..=1, default_missing_value = None)]
    namespace: Option<Option<String>>,
    /// Logical service name (environment and namespace prefixes stripped)
    #[arg(short, long)]
    service: Option<String>,
    /// Deployment environment of the service
    #[arg(short, long, value_enum)]
    env: Option<EnvironmentTag>,
}

#[derive(Args)]
struct LogArgs {
    /// Only show lines matching this regex
    #[arg(short, long)]
    filter: Option<String>,
    /// Hide lines matching this regex (e.g. -x "healthz")
    #[arg(short = 'x', long)]
    exclude: Option<String>,
    /// Lines of history to show before following
    #[arg(long, default_value_t = 10)]
    tail_lines: i64,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a port-forward to a service instance, optionally following its logs
    Forward {
        #[command(flatten)]
        target: TargetArgs,
        /// Local port (prompted if missing)
        #[arg(short, long)]
        local_port: Option<u16>,
        /// Remote port (prompted if missing)
        #[arg(short, long)]
        remote_port: Option<u16>,
        /// Follow logs without asking
        #[arg(long, conflicts_with = "no_logs")]
        logs: bool,
        /// Don't follow logs and don't ask
        #[arg(long)]
        no_logs: bool,
        /// Exit after the first session instead of offering another
        #[arg(long, default_value_t = false)]
        once: bool,
        #[command(flatten)]
        log: LogArgs,
    },
    /// Follow logs from a service instance
    Logs {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        log: LogArgs,
    },
    /// List running services by environment
    Services {
        /// Target namespace.
        /// If -n is passed without a value, uses current context.
        /// If -n is missing, shows interactive menu.
        #[arg(short, long, num_args = 0..=1, default_missing_value = None)]
        namespace: Option<Option<String>>,
        /// Only show this environment
        #[arg(short, long, value_enum)]
        env: Option<EnvironmentTag>,
    },
}

impl TargetArgs {
    fn into_options(self, default_port: u16) -> SessionOptions {
        SessionOptions {
            namespace: self.namespace,
            service: self.service,
            environment: self.env,
            default_port,
            ..SessionOptions::default()
        }
    }
}

impl LogArgs {
    fn filter(&self) -> error::Result<LogFilter> {
        LogFilter::new(self.filter.as_deref(), self.exclude.as_deref())
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("KPORT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // 1. Initialize Crypto
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        debug!("rustls crypto provider already installed");
    }

    // 2. Connect once, behind a spinner
    let pb = utils::create_spinner("Initializing Kubernetes client...");
    let gateway = KubeGateway::connect().await;
    pb.finish_and_clear();
    let gateway = gateway?;

    let result = match cli.command {
        Commands::Forward { target, local_port, remote_port, logs, no_logs, once, log } => {
            let follow_logs = match (logs, no_logs) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let args = ForwardArgs {
                options: SessionOptions {
                    local_port,
                    remote_port,
                    follow_logs,
                    ..target.into_options(cli.default_port)
                },
                filter: log.filter()?,
                tail_lines: log.tail_lines,
                kubectl: cli.kubectl,
                once,
            };
            commands::forward::run(&gateway, args).await
        }
        Commands::Logs { target, log } => {
            let filter = log.filter()?;
            commands::log::run(&gateway, target.into_options(cli.default_port), filter, log.tail_lines).await
        }
        Commands::Services { namespace, env } => commands::services::run(&gateway, namespace, env).await,
    };

    match result {
        Err(err) if err.is_cancelled() => Ok(()),
        other => Ok(other?),
    }
}
