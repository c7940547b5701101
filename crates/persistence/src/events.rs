//! Structured session event logs

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use voice_orchestrator_core::{PersistenceError, SessionEventLog, SessionId, SessionLogRecord};

/// Emits every record as a tracing event on the `session_events` target
#[derive(Debug, Default, Clone)]
pub struct TracingEventLog;

impl TracingEventLog {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionEventLog for TracingEventLog {
    async fn record(&self, record: &SessionLogRecord) -> Result<(), PersistenceError> {
        tracing::info!(
            target: "session_events",
            session_id = %record.session_id,
            kind = record.kind.as_str(),
            at = %record.at.to_rfc3339(),
            detail = %record.detail,
            "session event"
        );
        Ok(())
    }
}

/// Append-only JSON-lines file, one record per line
pub struct JsonLinesEventLog {
    path: PathBuf,
    file: tokio::sync::Mutex<File>,
}

impl JsonLinesEventLog {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        tracing::info!(path = %path.display(), "Session event log opened");
        Ok(Self {
            path,
            file: tokio::sync::Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionEventLog for JsonLinesEventLog {
    async fn record(&self, record: &SessionLogRecord) -> Result<(), PersistenceError> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
        line.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Keeps records in memory; handy for tests and debugging
#[derive(Default)]
pub struct InMemoryEventLog {
    records: Mutex<Vec<SessionLogRecord>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SessionLogRecord> {
        self.records.lock().clone()
    }

    pub fn records_for(&self, session_id: &SessionId) -> Vec<SessionLogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| &r.session_id == session_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SessionEventLog for InMemoryEventLog {
    async fn record(&self, record: &SessionLogRecord) -> Result<(), PersistenceError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// Writes each record to every inner log
///
/// All logs are attempted; the first failure is returned afterwards.
pub struct MultiEventLog {
    logs: Vec<Arc<dyn SessionEventLog>>,
}

impl MultiEventLog {
    pub fn new(logs: Vec<Arc<dyn SessionEventLog>>) -> Self {
        Self { logs }
    }
}

#[async_trait]
impl SessionEventLog for MultiEventLog {
    async fn record(&self, record: &SessionLogRecord) -> Result<(), PersistenceError> {
        let mut first_error = None;
        for log in &self.logs {
            if let Err(e) = log.record(record).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use voice_orchestrator_core::SessionLogKind;

    fn record(session: &str, kind: SessionLogKind) -> SessionLogRecord {
        SessionLogRecord::new(SessionId::from(session), kind, json!({"n": 1}))
    }

    #[tokio::test]
    async fn test_json_lines_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("events.jsonl");

        let log = JsonLinesEventLog::open(&path).await.unwrap();
        log.record(&record("a", SessionLogKind::SessionStarted))
            .await
            .unwrap();
        log.record(&record("a", SessionLogKind::SessionEnded))
            .await
            .unwrap();
        drop(log);

        // Reopening appends instead of truncating
        let log = JsonLinesEventLog::open(&path).await.unwrap();
        log.record(&record("b", SessionLogKind::Notice)).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: Vec<SessionLogRecord> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].kind, SessionLogKind::SessionStarted);
        assert_eq!(parsed[2].session_id, SessionId::from("b"));
    }

    struct FailingLog;

    #[async_trait]
    impl SessionEventLog for FailingLog {
        async fn record(&self, _record: &SessionLogRecord) -> Result<(), PersistenceError> {
            Err(PersistenceError::Io("disk full".into()))
        }
    }

    #[tokio::test]
    async fn test_multi_log_attempts_every_log() {
        let memory = Arc::new(InMemoryEventLog::new());
        let logs: Vec<Arc<dyn SessionEventLog>> = vec![Arc::new(FailingLog), memory.clone()];
        let multi = MultiEventLog::new(logs);

        let result = multi.record(&record("a", SessionLogKind::BargeIn)).await;

        assert_eq!(result, Err(PersistenceError::Io("disk full".into())));
        assert_eq!(memory.records().len(), 1);
    }

    #[tokio::test]
    async fn test_records_for_session() {
        let log = InMemoryEventLog::new();
        log.record(&record("a", SessionLogKind::Message)).await.unwrap();
        log.record(&record("b", SessionLogKind::Message)).await.unwrap();
        assert_eq!(log.records_for(&SessionId::from("a")).len(), 1);
    }
}
