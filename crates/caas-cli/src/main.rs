use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use caas_store::domain::statements::Consistency;
use caas_store::store::memory::InMemoryCluster;
use caas_store::store::scylla::ScyllaConnector;
use caas_store::store::traits::Connector;
use caas_store::{Config, CounterService, CounterStore, resolve_nodes};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Parser)]
#[command(name = "caas", about = "Counter service over a replicated CQL cluster")]
struct Cli {
    /// Cluster contact address; every address it resolves to is used.
    #[arg(long, env = "CASSANDRA_ADDRESS")]
    address: Option<String>,
    /// Identity of this service instance, reported in every counter.
    #[arg(long, env = "HOSTNAME")]
    host: Option<String>,
    #[arg(long, default_value = caas_store::config::DEFAULT_KEYSPACE)]
    keyspace: String,
    #[arg(long, default_value_t = 3)]
    replication_factor: u32,
    #[arg(long, default_value_t = caas_store::retry::DEFAULT_MAX_RETRIES)]
    max_retries: u32,
    #[arg(long, default_value = "quorum")]
    write_consistency: Consistency,
    #[arg(long, default_value = "one")]
    read_consistency: Consistency,
    /// Deadline per sub-operation in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Run against a process-local cluster instead of a real one.
    #[arg(long)]
    in_memory: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Ensure the keyspace and counter table exist, then exit.
    Bootstrap,
    /// Increment a counter and print the result as JSON.
    Increment {
        name: String,
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config {
        keyspace: cli.keyspace.clone(),
        replication_factor: cli.replication_factor,
        max_retries: cli.max_retries,
        write_consistency: cli.write_consistency,
        read_consistency: cli.read_consistency,
        request_timeout: cli.timeout_ms.map(Duration::from_millis),
    };
    let host = service_host(cli.host.as_deref())?;

    if cli.in_memory {
        let nodes = match cli.address.as_deref() {
            Some(address) => vec![address.to_string()],
            None => vec!["127.0.0.1:9042".to_string()],
        };
        return run(&InMemoryCluster::new(), &nodes, host, config, cli.command).await;
    }

    let Some(address) = cli.address.as_deref() else {
        bail!("CASSANDRA_ADDRESS must be set (or pass --address)");
    };
    let nodes = resolve_nodes(address)
        .await
        .with_context(|| format!("resolving {address}"))?;
    run(&ScyllaConnector, &nodes, host, config, cli.command).await
}

async fn run<C: Connector>(
    connector: &C,
    nodes: &[String],
    host: String,
    config: Config,
    command: Command,
) -> Result<()> {
    let store = CounterStore::bootstrap(connector, nodes, host, config)
        .await
        .context("schema bootstrap failed")?;

    if let Command::Increment { name, count } = command {
        for _ in 0..count {
            let counter = store
                .increment_and_get(&name)
                .await
                .with_context(|| format!("increment_and_get({name:?})"))?;
            println!("{}", serde_json::to_string(&counter)?);
        }
    }

    store.close();
    Ok(())
}

fn service_host(explicit: Option<&str>) -> Result<String> {
    if let Some(host) = explicit.map(str::trim).filter(|h| !h.is_empty()) {
        return Ok(host.to_string());
    }
    let host = gethostname::gethostname()
        .into_string()
        .map_err(|raw| anyhow!("hostname {raw:?} is not valid UTF-8; set --host or HOSTNAME"))?;
    let host = host.trim();
    if host.is_empty() {
        bail!("system hostname is empty; set --host or HOSTNAME");
    }
    Ok(host.to_string())
}
