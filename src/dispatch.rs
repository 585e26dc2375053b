//! Tool dispatch: name lookup, invocation and handoff detection.
//!
//! A [`ToolRouter`] is built from the active agent at the start of every
//! backend round-trip. It maps each tool's declared name to the tool and
//! keeps the call specifications in registration order.

use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;
use tracing::{debug, info};

use crate::agent::Agent;
use crate::error::{Result, SwarmError};
use crate::handoff::transfer_confirmation;
use crate::items::ToolUse;
use crate::model::ToolConfig;
use crate::schema::CallSpecification;
use crate::tool::{Tool, ToolError, ToolOutcome};

/// Uniform tool invocation handed to the router.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub id: String,   // tool_use_id
    pub name: String, // requested tool name
    pub arguments: Value,
}

impl From<&ToolUse> for ToolInvocation {
    fn from(tool_use: &ToolUse) -> Self {
        Self {
            id: tool_use.tool_use_id.clone(),
            name: tool_use.name.clone(),
            arguments: tool_use.input.clone(),
        }
    }
}

/// What a dispatched call produced.
#[derive(Debug, Clone)]
pub enum DispatchResult {
    /// The tool returned an ordinary value, used verbatim as the result payload.
    Value(Value),
    /// The tool handed control to `agent`; `confirmation` is the payload the backend sees.
    Handoff { agent: Agent, confirmation: Value },
}

impl DispatchResult {
    /// The tool-result payload to send back for this call.
    pub fn payload(&self) -> &Value {
        match self {
            DispatchResult::Value(v) => v,
            DispatchResult::Handoff { confirmation, .. } => confirmation,
        }
    }

    pub fn into_parts(self) -> (Value, Option<Agent>) {
        match self {
            DispatchResult::Value(v) => (v, None),
            DispatchResult::Handoff {
                agent,
                confirmation,
            } => (confirmation, Some(agent)),
        }
    }
}

/// Name → tool table for one agent.
#[derive(Clone)]
pub struct ToolRouter {
    agent_name: Arc<str>,
    by_name: HashMap<String, Arc<dyn Tool>>,
    specs: Vec<CallSpecification>,
}

impl ToolRouter {
    /// Builds the table for `agent`, rejecting duplicate tool names.
    pub fn new(agent: &Agent) -> Result<Self> {
        agent.validate()?;
        let by_name = agent
            .tools()
            .iter()
            .map(|t| (t.name().to_string(), t.clone()))
            .collect();
        Ok(Self {
            agent_name: Arc::from(agent.name()),
            by_name,
            specs: agent.tool_specs(),
        })
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn specs(&self) -> &[CallSpecification] {
        &self.specs
    }

    /// Tool configuration for the backend; `None` when the agent has no tools.
    pub fn tool_config(&self) -> Option<ToolConfig> {
        ToolConfig::new(self.specs.clone())
    }

    /// Looks up and runs the requested tool.
    ///
    /// Unknown names, tool failures and abort requests are all surfaced as
    /// errors; nothing is skipped or converted into a result payload.
    pub async fn dispatch(&self, invocation: &ToolInvocation) -> Result<DispatchResult> {
        let tool = self
            .by_name
            .get(&invocation.name)
            .ok_or_else(|| SwarmError::UnknownTool {
                agent: self.agent_name.to_string(),
                tool: invocation.name.clone(),
            })?;

        info!(
            target: "agent_swarm::trace",
            "{}: {}({})",
            self.agent_name,
            invocation.name,
            invocation.arguments
        );

        let outcome = tool
            .call(invocation.arguments.clone())
            .await
            .map_err(|e| match e {
                ToolError::Failed(source) => SwarmError::ToolExecution {
                    agent: self.agent_name.to_string(),
                    tool: invocation.name.clone(),
                    source,
                },
                ToolError::Abort { reason } => SwarmError::SessionAborted {
                    agent: self.agent_name.to_string(),
                    tool: invocation.name.clone(),
                    reason,
                },
            })?;

        Ok(match outcome {
            ToolOutcome::Value(value) => {
                debug!(tool = %invocation.name, tool_use_id = %invocation.id, "Tool returned value");
                DispatchResult::Value(value)
            }
            ToolOutcome::Handoff(agent) => {
                debug!(from = %self.agent_name, to = %agent.name(), "Tool returned handoff");
                let confirmation = transfer_confirmation(agent.name());
                DispatchResult::Handoff {
                    agent,
                    confirmation,
                }
            }
        })
    }
}

impl std::fmt::Debug for ToolRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.by_name.keys().collect();
        names.sort();
        f.debug_struct("ToolRouter")
            .field("agent", &self.agent_name)
            .field("tools", &names)
            .finish()
    }
}

/// The router as a Tower service, for callers that want to layer it.
impl Service<ToolInvocation> for ToolRouter {
    type Response = DispatchResult;
    type Error = SwarmError;
    type Future = Pin<Box<dyn Future<Output = Result<DispatchResult>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ToolInvocation) -> Self::Future {
        let router = self.clone();
        Box::pin(async move { router.dispatch(&req).await })
    }
}
