//! Ordered, fire-and-forget transcript persistence
//!
//! One background task drains a queue, so writes land in arrival order per
//! session while the state machine never waits on the stores. Store and log
//! failures are logged and dropped.

use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use voice_orchestrator_core::{
    ConversationStore, MessageSource, SessionEventLog, SessionId, SessionLogKind,
    SessionLogRecord,
};

enum HistoryItem {
    Message {
        session_id: SessionId,
        source: MessageSource,
        text: String,
    },
    Event(SessionLogRecord),
    EndSession(SessionId),
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle to the writer task
#[derive(Clone)]
pub struct HistoryWriter {
    tx: mpsc::UnboundedSender<HistoryItem>,
}

impl HistoryWriter {
    /// Spawn the writer task; it ends once every handle is dropped
    pub fn spawn(
        store: Arc<dyn ConversationStore>,
        events: Arc<dyn SessionEventLog>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(drain(rx, store, events));
        (Self { tx }, handle)
    }

    /// Persist a transcript line and mirror it into the event log
    pub fn message(&self, session_id: &SessionId, source: MessageSource, text: &str) {
        self.push(HistoryItem::Message {
            session_id: session_id.clone(),
            source,
            text: text.to_string(),
        });
    }

    /// Record a structured session event
    pub fn event(&self, session_id: &SessionId, kind: SessionLogKind, detail: Value) {
        self.push(HistoryItem::Event(SessionLogRecord::new(
            session_id.clone(),
            kind,
            detail,
        )));
    }

    /// Release per-session store state once earlier writes are done
    pub fn end_session(&self, session_id: &SessionId) {
        self.push(HistoryItem::EndSession(session_id.clone()));
    }

    /// Wait until everything queued so far has been written
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        self.push(HistoryItem::Flush(tx));
        let _ = rx.await;
    }

    fn push(&self, item: HistoryItem) {
        if self.tx.send(item).is_err() {
            tracing::debug!("History writer stopped, dropping item");
        }
    }
}

async fn drain(
    mut rx: mpsc::UnboundedReceiver<HistoryItem>,
    store: Arc<dyn ConversationStore>,
    events: Arc<dyn SessionEventLog>,
) {
    while let Some(item) = rx.recv().await {
        match item {
            HistoryItem::Message {
                session_id,
                source,
                text,
            } => {
                if let Err(e) = store.append_message(&session_id, source, &text).await {
                    tracing::warn!(session_id = %session_id, error = %e, "Failed to persist message");
                }
                let record = SessionLogRecord::new(
                    session_id,
                    SessionLogKind::Message,
                    json!({ "source": source.as_str(), "text": text }),
                );
                write_event(events.as_ref(), &record).await;
            }
            HistoryItem::Event(record) => write_event(events.as_ref(), &record).await,
            HistoryItem::EndSession(session_id) => store.end_session(&session_id).await,
            HistoryItem::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("History writer finished");
}

async fn write_event(events: &dyn SessionEventLog, record: &SessionLogRecord) {
    if let Err(e) = events.record(record).await {
        tracing::warn!(
            session_id = %record.session_id,
            kind = record.kind.as_str(),
            error = %e,
            "Failed to record session event"
        );
    }
}
