use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

mod commands;

use commands::{SendOptions, run_agents, run_send, run_serve};

#[derive(Parser, Debug)]
#[command(name = "conductor", version)]
#[command(about = "Conductor - task-oriented multi-agent orchestration")]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

/// Flags shared by every command that needs a configuration
#[derive(clap::Args, Debug, Default)]
pub struct ConfigArgs {
    /// JSON file of agent descriptors (default: built-in agents)
    #[arg(long)]
    pub registry: Option<PathBuf>,
    /// Base URL agents use to reach each other
    #[arg(long)]
    pub public_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the configured agents on one listener
    Serve {
        #[command(flatten)]
        config: ConfigArgs,
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to bind
        #[arg(long)]
        port: Option<u16>,
        /// Agents to load (comma-separated names)
        #[arg(long, value_delimiter = ',')]
        agents: Vec<String>,
        /// Keep tasks as JSON files under this directory
        #[arg(long)]
        store_dir: Option<PathBuf>,
        /// Upper bound on one domain function call, e.g. `30s`
        #[arg(long, value_parser = humantime::parse_duration)]
        task_timeout: Option<Duration>,
    },
    /// Print the agent registry as JSON
    Agents {
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Submit text to an agent and print the resulting task
    Send {
        #[command(flatten)]
        config: ConfigArgs,
        /// Agent name from the registry, or an endpoint URL
        #[arg(long)]
        agent: String,
        /// Return the submitted task without waiting for a result
        #[arg(long)]
        no_wait: bool,
        /// Delay between polls
        #[arg(long, value_parser = humantime::parse_duration, default_value = "300ms")]
        poll_interval: Duration,
        /// Give up waiting after this long
        #[arg(long, value_parser = humantime::parse_duration, default_value = "30s")]
        timeout: Duration,
        /// Text to send
        text: String,
    },
}

fn init_logging(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let result = match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            agents,
            store_dir,
            task_timeout,
        } => run_serve(config, host, port, agents, store_dir, task_timeout).await,
        Commands::Agents { config } => run_agents(config),
        Commands::Send {
            config,
            agent,
            no_wait,
            poll_interval,
            timeout,
            text,
        } => {
            run_send(
                config,
                SendOptions {
                    agent,
                    text,
                    wait: !no_wait,
                    poll_interval,
                    timeout,
                },
            )
            .await
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        std::process::exit(1);
    }
}
