//! ScyllaDB connection for conversation history

use scylla::{Session, SessionBuilder};
use std::sync::Arc;
use std::time::Duration;
use voice_orchestrator_config::PersistenceConfig;
use voice_orchestrator_core::PersistenceError;

use crate::schema;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where history lives in the cluster
#[derive(Debug, Clone)]
pub struct ScyllaConfig {
    pub hosts: Vec<String>,
    pub keyspace: String,
    pub replication_factor: u8,
    pub connect_timeout: Duration,
}

impl Default for ScyllaConfig {
    fn default() -> Self {
        Self::from(&PersistenceConfig::default())
    }
}

impl From<&PersistenceConfig> for ScyllaConfig {
    fn from(config: &PersistenceConfig) -> Self {
        Self {
            hosts: config.scylla_hosts.clone(),
            keyspace: config.keyspace.clone(),
            replication_factor: config.replication_factor,
            connect_timeout: CONNECT_TIMEOUT,
        }
    }
}

/// Shared session plus the keyspace every query is qualified with
#[derive(Clone)]
pub struct ScyllaClient {
    session: Arc<Session>,
    keyspace: String,
}

impl ScyllaClient {
    pub async fn connect(config: &ScyllaConfig) -> Result<Self, PersistenceError> {
        tracing::info!(
            hosts = ?config.hosts,
            keyspace = %config.keyspace,
            "Connecting to ScyllaDB"
        );

        let session = SessionBuilder::new()
            .known_nodes(&config.hosts)
            .connection_timeout(config.connect_timeout)
            .build()
            .await
            .map_err(|e| PersistenceError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            session: Arc::new(session),
            keyspace: config.keyspace.clone(),
        })
    }

    /// Connect and create the keyspace and history table when missing
    pub async fn connect_with_schema(config: &ScyllaConfig) -> Result<Self, PersistenceError> {
        let client = Self::connect(config).await?;
        schema::create_keyspace(&client.session, &client.keyspace, config.replication_factor)
            .await?;
        schema::create_tables(&client.session, &client.keyspace).await?;
        tracing::info!(keyspace = %client.keyspace, "History schema ready");
        Ok(client)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// `keyspace.table`
    pub fn table(&self, name: &str) -> String {
        qualified(&self.keyspace, name)
    }
}

fn qualified(keyspace: &str, table: &str) -> String {
    format!("{}.{}", keyspace, table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_follows_persistence_settings() {
        let settings = PersistenceConfig {
            scylla_hosts: vec!["10.0.0.5:9042".to_string()],
            keyspace: "hearth_history".to_string(),
            replication_factor: 3,
            ..Default::default()
        };
        let config = ScyllaConfig::from(&settings);
        assert_eq!(config.hosts, vec!["10.0.0.5:9042"]);
        assert_eq!(config.keyspace, "hearth_history");
        assert_eq!(config.replication_factor, 3);
        assert_eq!(config.connect_timeout, CONNECT_TIMEOUT);
    }

    #[test]
    fn test_table_names_are_qualified() {
        assert_eq!(
            qualified("voice_orchestrator", "conversation_messages"),
            "voice_orchestrator.conversation_messages"
        );
    }
}
