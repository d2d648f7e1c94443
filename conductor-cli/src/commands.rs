use conductor_a2a::A2aClient;
use conductor_agent::{
    AgentHost, ConductorConfig, ConductorConfigBuilder, ConductorResult, load_registry,
    shutdown_signal,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::ConfigArgs;

/// Environment first, then flags
fn configure(args: ConfigArgs) -> ConductorResult<ConductorConfigBuilder> {
    let mut builder = ConductorConfigBuilder::from_env()?;
    if let Some(path) = args.registry {
        builder = builder.registry_path(path);
    }
    if let Some(url) = args.public_url {
        builder = builder.public_url(url);
    }
    Ok(builder)
}

pub async fn run_serve(
    args: ConfigArgs,
    host: Option<String>,
    port: Option<u16>,
    agents: Vec<String>,
    store_dir: Option<PathBuf>,
    task_timeout: Option<Duration>,
) -> ConductorResult<()> {
    let mut builder = configure(args)?;
    if let Some(host) = host {
        builder = builder.host(host);
    }
    if let Some(port) = port {
        builder = builder.port(port);
    }
    if !agents.is_empty() {
        builder = builder.agents(agents);
    }
    if let Some(dir) = store_dir {
        builder = builder.store_dir(dir);
    }
    if let Some(timeout) = task_timeout {
        builder = builder.task_timeout(timeout);
    }
    let config = builder.build()?;

    let registry = load_registry(&config)?;
    let listener = AgentHost::bind(&config).await?;
    let host = AgentHost::build(&config, &registry)?;
    info!(public_url = %config.public_url(), "Starting Conductor");

    host.serve(listener, shutdown_signal()).await
}

pub fn run_agents(args: ConfigArgs) -> ConductorResult<()> {
    let config = configure(args)?.build()?;
    let registry = load_registry(&config)?;
    let agents: Vec<_> = registry.iter().collect();
    println!("{}", serde_json::to_string_pretty(&agents)?);
    Ok(())
}

pub struct SendOptions {
    pub agent: String,
    pub text: String,
    pub wait: bool,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

/// Registry name or literal endpoint
fn endpoint_for(config: &ConductorConfig, agent: &str) -> ConductorResult<String> {
    if agent.starts_with("http://") || agent.starts_with("https://") {
        return Ok(agent.to_string());
    }
    let registry = load_registry(config)?;
    Ok(registry.resolve(agent)?.to_string())
}

pub async fn run_send(args: ConfigArgs, options: SendOptions) -> ConductorResult<()> {
    let config = configure(args)?.build()?;
    let endpoint = endpoint_for(&config, &options.agent)?;
    let client = A2aClient::with_timeout(&endpoint, config.poll.request_timeout)?;

    let mut task = client.send_text(&options.text).await?;
    info!(task_id = %task.id, endpoint = %endpoint, "Task submitted");

    if options.wait {
        task = client
            .wait_for_task(&task.id, options.poll_interval, options.timeout)
            .await?;
    }
    println!("{}", serde_json::to_string_pretty(&task)?);
    Ok(())
}
