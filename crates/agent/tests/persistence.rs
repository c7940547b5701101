//! Orchestrator wired to the configured persistence layer

mod common;

use common::{FakeAudio, FakeRecognizer, FakeTransport};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use voice_orchestrator_agent::{Collaborators, SessionOrchestrator};
use voice_orchestrator_config::{PersistenceConfig, Settings};
use voice_orchestrator_core::{MessageSource, TransportEvent};
use voice_orchestrator_tools::ToolRegistry;

#[tokio::test]
async fn test_session_events_land_in_json_lines_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events").join("sessions.jsonl");
    let config = PersistenceConfig {
        event_log_path: Some(path.to_string_lossy().into_owned()),
        ..Default::default()
    };
    let layer = voice_orchestrator_persistence::init(&config).await.unwrap();

    let transport = Arc::new(FakeTransport::default());
    let collaborators = Collaborators::new(
        transport.clone(),
        Arc::new(FakeRecognizer::default()),
        Arc::new(FakeAudio::default()),
    )
    .with_persistence(layer);
    let orchestrator =
        SessionOrchestrator::spawn(&Settings::default(), collaborators, ToolRegistry::new());

    let outcome = orchestrator.start_conversation().await.unwrap();
    transport.emit(TransportEvent::Message {
        source: MessageSource::User,
        text: "is there any milk left?".into(),
    });
    for _ in 0..100 {
        if !orchestrator.transcript().await.unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    orchestrator.end_conversation().await.unwrap();
    orchestrator.shutdown().await;

    let contents = tokio::fs::read_to_string(&path).await.unwrap();
    let records: Vec<Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert!(records
        .iter()
        .all(|r| r["session_id"] == outcome.session_id().as_str()));
    let kinds: Vec<&str> = records.iter().filter_map(|r| r["kind"].as_str()).collect();
    assert_eq!(kinds.first(), Some(&"session_started"));
    assert_eq!(kinds.last(), Some(&"session_ended"));
    let message = records
        .iter()
        .find(|r| r["kind"] == "message")
        .expect("message mirrored to the event log");
    assert_eq!(message["detail"]["text"], "is there any milk left?");
    assert_eq!(message["detail"]["source"], "user");
}
