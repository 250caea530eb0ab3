use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr};

use crate::config::{Config, DEFAULT_CQL_PORT};
use crate::domain::statements::SchemaStatement;
use crate::error::{Error, Result};
use crate::store::counter::CounterStore;
use crate::store::traits::{Connector, CounterSession};

/// Resolves every address behind `address`; a missing port defaults to 9042.
pub async fn resolve_nodes(address: &str) -> Result<Vec<String>> {
    let address = address.trim();
    if address.is_empty() {
        return Err(Error::Configuration(
            "cluster address must be set".to_string(),
        ));
    }

    let target = if let Ok(ip) = address.parse::<IpAddr>() {
        SocketAddr::new(ip, DEFAULT_CQL_PORT).to_string()
    } else if address.parse::<SocketAddr>().is_ok() || has_port(address) {
        address.to_string()
    } else {
        format!("{address}:{DEFAULT_CQL_PORT}")
    };

    let resolved: BTreeSet<SocketAddr> = tokio::net::lookup_host(&target)
        .await
        .map_err(|e| Error::Configuration(format!("cannot resolve {address}: {e}")))?
        .collect();
    if resolved.is_empty() {
        return Err(Error::Configuration(format!(
            "{address} resolved to no addresses"
        )));
    }

    let nodes: Vec<String> = resolved.iter().map(SocketAddr::to_string).collect();
    tracing::info!(address, ?nodes, "resolved cluster address");
    Ok(nodes)
}

fn has_port(address: &str) -> bool {
    address
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.contains(':') && port.parse::<u16>().is_ok())
}

/// Ensures keyspace and counter table exist, then returns the long-lived
/// session bound to the keyspace. Nothing here is retried.
pub async fn bootstrap<C: Connector>(
    connector: &C,
    nodes: &[String],
    config: &Config,
) -> Result<C::Session> {
    config.validate()?;
    if nodes.is_empty() {
        return Err(Error::Configuration(
            "no cluster addresses to connect to".to_string(),
        ));
    }

    create_keyspace(connector, nodes, config).await?;

    let session = connector
        .connect(nodes, Some(&config.keyspace))
        .await
        .map_err(Error::Connection)?;
    execute_schema(&session, SchemaStatement::CreateCounterTable).await?;
    Ok(session)
}

async fn create_keyspace<C: Connector>(connector: &C, nodes: &[String], config: &Config) -> Result<()> {
    let session = connector
        .connect(nodes, None)
        .await
        .map_err(Error::Connection)?;
    execute_schema(
        &session,
        SchemaStatement::CreateKeyspace {
            keyspace: &config.keyspace,
            replication_factor: config.replication_factor,
        },
    )
    .await
}

async fn execute_schema<S: CounterSession>(session: &S, statement: SchemaStatement<'_>) -> Result<()> {
    let op = statement.op();
    if let Err(source) = session.execute_schema(&statement).await {
        tracing::error!(op, error = %source, "schema bootstrap failed");
        return Err(Error::Schema { op, source });
    }
    tracing::info!(op, "schema ready");
    Ok(())
}

impl<S: CounterSession> CounterStore<S> {
    /// Bootstraps the schema and wraps the resulting session.
    pub async fn bootstrap<C>(
        connector: &C,
        nodes: &[String],
        host: impl Into<String>,
        config: Config,
    ) -> Result<Self>
    where
        C: Connector<Session = S>,
    {
        let session = bootstrap(connector, nodes, &config).await?;
        Ok(Self::new(session, host, config))
    }
}
