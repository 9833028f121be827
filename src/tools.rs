//! Tool implementations available to the model
//!
//! Tools are stateless singletons; everything a call needs arrives through
//! [`ToolContext`]. Failures never escape the dispatch boundary: whatever
//! goes wrong inside a handler comes back as the error side of a
//! [`ToolOutput`].

mod calculator;
mod clock;
mod session_stats;

pub use calculator::{evaluate, CalculatorTool, EvalError, Paren};
pub use clock::{ClockError, ClockFormat, ClockReading, ClockTool};
pub use session_stats::SessionStatsTool;

use crate::llm::ToolDefinition;
use crate::store::SessionStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Result from tool execution. Exactly one side is populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub result: Option<String>,
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn ok(result: impl Into<String>) -> Self {
        Self {
            result: Some(result.into()),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// All context needed for a tool invocation.
///
/// Capabilities are injected explicitly; tools never reach into ambient
/// process state. A tool that needs the store and does not get one reports
/// that as its own error.
#[derive(Clone)]
pub struct ToolContext {
    /// The session this tool call executes within.
    pub session_id: String,
    /// Session store handle, absent when persistence is not configured.
    pub store: Option<SessionStore>,
}

impl ToolContext {
    pub fn new(session_id: impl Into<String>, store: Option<SessionStore>) -> Self {
        Self {
            session_id: session_id.into(),
            store,
        }
    }
}

/// Trait for tools the model can invoke
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as advertised to the model
    fn name(&self) -> &str;

    /// Tool description for the model
    fn description(&self) -> String;

    /// JSON schema for tool arguments
    fn parameters(&self) -> Value;

    /// Execute the tool with all context provided via `ToolContext`
    async fn run(&self, args: Value, ctx: ToolContext) -> ToolOutput;
}

/// Collection of tools available to a turn
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// The standard tool set: calculator, clock, session stats.
    pub fn standard() -> Self {
        Self {
            tools: vec![
                Arc::new(CalculatorTool),
                Arc::new(ClockTool),
                Arc::new(SessionStatsTool),
            ],
        }
    }

    /// Get all tool definitions for the model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                parameters: t.parameters(),
            })
            .collect()
    }

    /// Execute a tool by name. Total: an unknown name folds into the error
    /// side instead of surfacing as a fault.
    pub async fn dispatch(&self, name: &str, args: Value, ctx: ToolContext) -> ToolOutput {
        for tool in &self.tools {
            if tool.name() == name {
                return tool.run(args, ctx).await;
            }
        }
        ToolOutput::error(format!("UnknownTool: {name}"))
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_context() -> ToolContext {
        ToolContext::new("test-session", None)
    }

    #[test]
    fn test_standard_tool_set() {
        let registry = ToolRegistry::standard();
        let names: Vec<_> = registry
            .definitions()
            .iter()
            .map(|d| d.name.clone())
            .collect();

        assert_eq!(
            names,
            vec!["calculator", "getCurrentDateTime", "getSessionStats"]
        );
    }

    #[test]
    fn test_definitions_carry_object_schemas() {
        for def in ToolRegistry::standard().definitions() {
            assert_eq!(def.parameters["type"], "object", "{}", def.name);
            assert!(!def.description.is_empty());
        }
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let registry = ToolRegistry::standard();
        let output = registry
            .dispatch("nonexistent", json!({}), test_context())
            .await;

        assert!(output.result.is_none());
        assert_eq!(output.error.as_deref(), Some("UnknownTool: nonexistent"));
    }

    #[tokio::test]
    async fn test_dispatch_calculator() {
        let registry = ToolRegistry::standard();
        let output = registry
            .dispatch(
                "calculator",
                json!({"expression": "2 + 2"}),
                test_context(),
            )
            .await;

        assert_eq!(output.result.as_deref(), Some("4"));
        assert!(!output.is_error());
    }

    #[tokio::test]
    async fn test_dispatch_bad_arguments_is_an_error_not_a_fault() {
        let registry = ToolRegistry::standard();
        let output = registry
            .dispatch("calculator", json!({"expression": 7}), test_context())
            .await;

        assert!(output.is_error());
        assert!(output.result.is_none());
    }

    #[test]
    fn test_tool_output_sides() {
        let ok = ToolOutput::ok("fine");
        assert_eq!(ok.result.as_deref(), Some("fine"));
        assert!(ok.error.is_none());

        let err = ToolOutput::error("broken");
        assert!(err.result.is_none());
        assert!(err.is_error());
    }
}
