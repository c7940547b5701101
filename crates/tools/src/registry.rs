//! Tool Registry
//!
//! Manages tool registration, discovery, and dispatch.

use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use voice_orchestrator_core::{
    Tool, ToolCallRequest, ToolCallResult, ToolError, ToolParameters, ToolSchema,
};

/// Default timeout for tool execution (30 seconds)
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Tool already registered: {0}")]
    Duplicate(String),

    #[error("Invalid tool name: '{0}'")]
    InvalidName(String),
}

/// Tool registry
///
/// Cloning is cheap (tools are shared), so a snapshot can be moved into
/// each in-flight call. Calls are not serialized: the same tool may run
/// several times concurrently.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    default_timeout_secs: u64,
    metrics_enabled: bool,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            default_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            metrics_enabled: true,
        }
    }

    pub fn with_default_timeout(mut self, secs: u64) -> Self {
        self.default_timeout_secs = secs.max(1);
        self
    }

    /// Toggle the per-call counter and duration histogram
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    pub fn metrics_enabled(&self) -> bool {
        self.metrics_enabled
    }

    /// Register a tool; names must be unique
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(RegistryError::InvalidName(name));
        }
        if self.tools.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        tracing::debug!(tool = %name, "Registered tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get tool by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Check if tool exists
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get all tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Schemas handed to the remote agent at handshake, sorted by name
    pub fn list_tools(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Run a tool call and always produce a string result
    ///
    /// Unknown tools, invalid parameters, handler errors, timeouts and
    /// panics all become `ERROR:` results.
    pub async fn dispatch(&self, request: ToolCallRequest) -> ToolCallResult {
        let started = Instant::now();
        let name = request.tool_name;

        let outcome = match self.tools.get(&name) {
            Some(tool) => {
                let timeout_secs = tool.timeout_secs().unwrap_or(self.default_timeout_secs);
                run_guarded(tool.as_ref(), &name, request.parameters, timeout_secs).await
            }
            None => Err(ToolError::not_found(name.clone())),
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let label = match &outcome {
            Ok(_) => "ok",
            Err(ToolError::NotFound(_)) => "not_found",
            Err(ToolError::InvalidParams(_)) => "invalid_params",
            Err(ToolError::Timeout { .. }) => "timeout",
            Err(ToolError::Internal(_)) => "error",
        };
        if self.metrics_enabled {
            metrics::counter!(
                "voice_orchestrator_tool_calls_total",
                "tool" => name.clone(),
                "outcome" => label
            )
            .increment(1);
            metrics::histogram!("voice_orchestrator_tool_call_duration_ms").record(elapsed_ms);
        }

        match outcome {
            Ok(text) => {
                tracing::debug!(tool = %name, elapsed_ms, "Tool call succeeded");
                ToolCallResult::success(text)
            }
            Err(e) => {
                tracing::warn!(tool = %name, outcome = label, error = %e, "Tool call failed");
                ToolCallResult::error(e)
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .field("default_timeout_secs", &self.default_timeout_secs)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

async fn run_guarded(
    tool: &dyn Tool,
    name: &str,
    params: ToolParameters,
    timeout_secs: u64,
) -> Result<String, ToolError> {
    let call = async {
        tool.validate(&params)?;
        tool.execute(params).await
    };

    let guarded = AssertUnwindSafe(call).catch_unwind();
    match tokio::time::timeout(Duration::from_secs(timeout_secs), guarded).await {
        Ok(Ok(result)) => result,
        Ok(Err(panic)) => Err(ToolError::internal(format!(
            "{} failed unexpectedly: {}",
            name,
            panic_message(panic.as_ref())
        ))),
        Err(_elapsed) => Err(ToolError::timeout(name, timeout_secs)),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use voice_orchestrator_core::{InputSchema, PropertySchema};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Repeat the text"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: self.name().to_string(),
                description: self.description().to_string(),
                parameters: InputSchema::object().property(
                    "text",
                    PropertySchema::string("Text to repeat"),
                    true,
                ),
            }
        }

        async fn execute(&self, params: ToolParameters) -> Result<String, ToolError> {
            let text = params.get("text").and_then(|v| v.as_str()).unwrap_or("");
            Ok(format!("You said: {}", text))
        }
    }

    /// Fails in a configurable way
    struct FaultyTool {
        mode: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Tool for FaultyTool {
        fn name(&self) -> &str {
            self.mode
        }

        fn description(&self) -> &str {
            "Misbehaves"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: self.name().to_string(),
                description: self.description().to_string(),
                parameters: InputSchema::object(),
            }
        }

        async fn execute(&self, _params: ToolParameters) -> Result<String, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.mode {
                "panics" => panic!("inventory index corrupted"),
                "hangs" => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok("never".into())
                }
                _ => Err(ToolError::internal("store offline")),
            }
        }

        fn timeout_secs(&self) -> Option<u64> {
            (self.mode == "hangs").then_some(2)
        }
    }

    fn faulty(mode: &'static str) -> FaultyTool {
        FaultyTool {
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();
        assert_eq!(
            registry.register(EchoTool),
            Err(RegistryError::Duplicate("echo".into()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_list_tools_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(faulty("fails")).unwrap();
        registry.register(EchoTool).unwrap();
        let names: Vec<String> = registry.list_tools().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["echo".to_string(), "fails".to_string()]);
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();
        let result = registry
            .dispatch(ToolCallRequest::new("echo", json!({"text": "hi"})))
            .await;
        assert_eq!(result.as_str(), "You said: hi");
    }

    #[tokio::test]
    async fn test_metrics_toggle_survives_clone() {
        let mut registry = ToolRegistry::new();
        assert!(registry.metrics_enabled());
        registry.register(EchoTool).unwrap();

        let quiet = registry.clone().with_metrics(false);
        assert!(!quiet.metrics_enabled());
        assert!(!quiet.clone().with_default_timeout(5).metrics_enabled());
        let result = quiet
            .dispatch(ToolCallRequest::new("echo", json!({"text": "quiet"})))
            .await;
        assert_eq!(result.as_str(), "You said: quiet");
        assert!(registry.metrics_enabled());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_string() {
        let registry = ToolRegistry::new();
        let result = registry
            .dispatch(ToolCallRequest::new("teleport", json!({})))
            .await;
        assert!(result.as_str().starts_with("ERROR:"));
        assert!(result.as_str().contains("teleport"));
    }

    #[tokio::test]
    async fn test_invalid_params_is_error_string() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();
        let result = registry
            .dispatch(ToolCallRequest::new("echo", json!({"text": 5})))
            .await;
        assert_eq!(
            result.as_str(),
            "ERROR: Invalid parameters: text must be a string"
        );
    }

    #[tokio::test]
    async fn test_handler_failures_never_escape() {
        let mut registry = ToolRegistry::new();
        registry.register(faulty("fails")).unwrap();
        registry.register(faulty("panics")).unwrap();

        let failed = registry
            .dispatch(ToolCallRequest::new("fails", json!({})))
            .await;
        assert_eq!(failed.as_str(), "ERROR: store offline");

        let panicked = registry
            .dispatch(ToolCallRequest::new("panics", json!({})))
            .await;
        assert!(panicked.is_error());
        assert!(panicked.as_str().contains("inventory index corrupted"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_error_string() {
        let mut registry = ToolRegistry::new();
        registry.register(faulty("hangs")).unwrap();
        let result = registry
            .dispatch(ToolCallRequest::new("hangs", json!({})))
            .await;
        assert_eq!(result.as_str(), "ERROR: Tool 'hangs' timed out after 2s");
    }

    #[tokio::test]
    async fn test_concurrent_calls_not_serialized() {
        struct SlowTool(Arc<AtomicUsize>);

        #[async_trait]
        impl Tool for SlowTool {
            fn name(&self) -> &str {
                "slow"
            }
            fn description(&self) -> &str {
                "Takes a while"
            }
            fn schema(&self) -> ToolSchema {
                ToolSchema {
                    name: "slow".into(),
                    description: "Takes a while".into(),
                    parameters: InputSchema::object(),
                }
            }
            async fn execute(&self, _params: ToolParameters) -> Result<String, ToolError> {
                let in_flight = self.0.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(Duration::from_millis(50)).await;
                self.0.fetch_sub(1, Ordering::SeqCst);
                Ok(in_flight.to_string())
            }
        }

        let mut registry = ToolRegistry::new();
        registry
            .register(SlowTool(Arc::new(AtomicUsize::new(0))))
            .unwrap();

        let (a, b) = tokio::join!(
            registry.dispatch(ToolCallRequest::new("slow", json!({}))),
            registry.dispatch(ToolCallRequest::new("slow", json!({}))),
        );
        let max_in_flight = a.as_str().max(b.as_str());
        assert_eq!(max_in_flight, "2");
    }
}
