//! # Agent (orientation)
//!
//! An `Agent` is a named persona: instructions sent as the system directive,
//! a model identifier, an opaque inference configuration passed straight to
//! the backend, and an ordered set of tools. Agents are built once and then
//! only referenced; a handoff swaps which agent is active, it never edits one.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Result, SwarmError};
use crate::schema::CallSpecification;
use crate::tool::Tool;

/// Default agent name
pub const DEFAULT_NAME: &str = "Agent";
/// Default persona directive
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful agent";
/// Default model identifier
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Backend-specific sampling parameters (e.g. `temperature`), forwarded untouched.
pub type InferenceConfig = Map<String, Value>;

/// Defines the complete configuration for an [`Agent`].
#[derive(Clone)]
pub struct AgentConfig {
    /// The name of the agent, used for identification and in logs.
    pub name: String,

    /// The persona directive sent to the backend as the system prompt.
    pub instructions: String,

    /// Opaque model identifier understood by the backend.
    pub model: String,

    /// Sampling parameters passed through to the backend.
    pub inference_config: InferenceConfig,

    /// Tools in the order they are advertised. Names must be unique.
    pub tools: Vec<Arc<dyn Tool>>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            model: DEFAULT_MODEL.to_string(),
            inference_config: InferenceConfig::new(),
            tools: Vec::new(),
        }
    }
}

/// A named persona with instructions, model settings and tools.
///
/// ```rust
/// use agent_swarm::Agent;
///
/// let triage = Agent::simple("Triage Agent", "You are a customer service bot for ACME Inc.")
///     .with_model("gpt-4o-mini")
///     .with_temperature(0.0);
///
/// assert_eq!(triage.name(), "Triage Agent");
/// assert_eq!(triage.model(), "gpt-4o-mini");
/// assert_eq!(triage.inference_config()["temperature"], 0.0);
/// assert!(!triage.has_tools());
/// ```
#[derive(Clone)]
pub struct Agent {
    config: AgentConfig,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    /// Creates an agent with just a name and instructions; everything else is default.
    pub fn simple(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self::new(AgentConfig {
            name: name.into(),
            instructions: instructions.into(),
            ..Default::default()
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Sets one inference parameter, replacing any previous value for `key`.
    pub fn with_inference_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.inference_config.insert(key.into(), value.into());
        self
    }

    pub fn with_inference_config(mut self, config: InferenceConfig) -> Self {
        self.config.inference_config = config;
        self
    }

    pub fn with_temperature(self, temperature: f32) -> Self {
        self.with_inference_param("temperature", temperature)
    }

    /// Adds a tool to the agent.
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.config.tools.push(Arc::new(tool));
        self
    }

    /// Adds several already-shared tools.
    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.config.tools.extend(tools);
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn instructions(&self) -> &str {
        &self.config.instructions
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn inference_config(&self) -> &InferenceConfig {
        &self.config.inference_config
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.config.tools
    }

    pub fn has_tools(&self) -> bool {
        !self.config.tools.is_empty()
    }

    /// Call specifications of all tools, in registration order.
    pub fn tool_specs(&self) -> Vec<CallSpecification> {
        self.config.tools.iter().map(|t| t.spec().clone()).collect()
    }

    /// Checks that tool names are unique within this agent.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for tool in &self.config.tools {
            if !seen.insert(tool.name()) {
                return Err(SwarmError::DuplicateTool {
                    agent: self.config.name.clone(),
                    tool: tool.name().to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self::new(AgentConfig::default())
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tools: Vec<&str> = self.config.tools.iter().map(|t| t.name()).collect();
        f.debug_struct("Agent")
            .field("name", &self.config.name)
            .field("model", &self.config.model)
            .field("inference_config", &self.config.inference_config)
            .field("tools", &tools)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{FunctionTool, NoArgs, ToolOutcome};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ping(name: &str) -> FunctionTool {
        FunctionTool::new(name, |_: NoArgs| Ok(ToolOutcome::json("pong"))).unwrap()
    }

    #[test]
    fn test_defaults() {
        let agent = Agent::default();
        assert_eq!(agent.name(), "Agent");
        assert_eq!(agent.instructions(), "You are a helpful agent");
        assert_eq!(agent.model(), DEFAULT_MODEL);
        assert!(agent.inference_config().is_empty());
        assert!(agent.tools().is_empty());
    }

    #[test]
    fn test_builder_keeps_tool_order() {
        let agent = Agent::simple("Sales Agent", "Sell things.")
            .with_tool(ping("execute_order"))
            .with_tool(ping("transfer_back_to_triage"))
            .with_inference_param("maxTokens", 256);

        let names: Vec<String> = agent.tool_specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["execute_order", "transfer_back_to_triage"]);
        assert_eq!(agent.inference_config().get("maxTokens"), Some(&json!(256)));
        assert!(agent.validate().is_ok());
    }

    #[test]
    fn test_duplicate_tool_names_rejected() {
        let agent = Agent::simple("Dup", "x")
            .with_tool(ping("lookup"))
            .with_tool(ping("lookup"));
        let err = agent.validate().unwrap_err();
        assert!(matches!(err, SwarmError::DuplicateTool { ref tool, .. } if tool == "lookup"));
    }

    #[test]
    fn test_clone_is_independent_value() {
        let base = Agent::simple("A", "x").with_temperature(0.5);
        let other = base.clone().with_model("other-model");
        assert_eq!(base.model(), DEFAULT_MODEL);
        assert_eq!(other.model(), "other-model");
    }
}
