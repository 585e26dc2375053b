//! # Agent Handoff
//!
//! A handoff is a tool whose outcome is [`ToolOutcome::Handoff`]: instead of
//! a value for the backend, it names the agent that takes over. The
//! dispatcher never forwards the agent itself; the backend sees a generic
//! confirmation produced by [`transfer_confirmation`].
//!
//! Personas usually point at each other (triage sends to sales, sales sends
//! back to triage), so a transfer tool cannot capture its target by value
//! at construction time. [`AgentRef`] is a write-once slot that is shared
//! first and bound once every agent exists.
//!
//! ```rust
//! use agent_swarm::{handoff::{transfer_tool, AgentRef}, Agent};
//!
//! let sales_ref = AgentRef::new();
//! let triage = Agent::simple("Triage Agent", "Route the customer.")
//!     .with_tool(transfer_tool("transfer_to_sales_agent", "User for anything sales or buying related.", &sales_ref).unwrap());
//!
//! let sales = Agent::simple("Sales Agent", "Sell.");
//! sales_ref.bind(sales).unwrap();
//!
//! assert_eq!(sales_ref.get().map(|a| a.name().to_string()), Some("Sales Agent".to_string()));
//! assert_eq!(triage.tools()[0].name(), "transfer_to_sales_agent");
//! ```

use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};

use crate::agent::Agent;
use crate::error::{Result, SwarmError};
use crate::tool::{FunctionTool, NoArgs, ToolError, ToolOutcome};

/// Write-once, shareable reference to an agent used as a handoff target.
#[derive(Clone, Default)]
pub struct AgentRef(Arc<OnceLock<Agent>>);

impl AgentRef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the target. Fails if the slot was already bound.
    pub fn bind(&self, agent: Agent) -> Result<()> {
        self.0.set(agent).map_err(|rejected| {
            SwarmError::Config(format!(
                "handoff target already bound; cannot rebind to `{}`",
                rejected.name()
            ))
        })
    }

    pub fn get(&self) -> Option<&Agent> {
        self.0.get()
    }
}

impl From<Agent> for AgentRef {
    fn from(agent: Agent) -> Self {
        let slot = OnceLock::new();
        let _ = slot.set(agent);
        Self(Arc::new(slot))
    }
}

impl std::fmt::Debug for AgentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AgentRef")
            .field(&self.get().map(|a| a.name()))
            .finish()
    }
}

/// Builds a zero-parameter tool that hands the conversation to `target`.
///
/// Calling it before `target` is bound fails the tool.
pub fn transfer_tool(
    name: impl Into<String>,
    description: impl AsRef<str>,
    target: &AgentRef,
) -> Result<FunctionTool> {
    let name = name.into();
    let target = target.clone();
    let tool_name = name.clone();
    let tool = FunctionTool::new(name, move |_: NoArgs| match target.get() {
        Some(agent) => Ok(ToolOutcome::Handoff(agent.clone())),
        None => Err(ToolError::failed(format!(
            "handoff target of `{}` is not bound",
            tool_name
        ))),
    })?;
    Ok(tool.with_description(description))
}

/// Result payload reported to the backend when control moves to `new_agent`.
pub fn transfer_confirmation(new_agent: &str) -> Value {
    json!({
        "message": format!("Transferred to {}. Adopt persona immediately.", new_agent)
    })
}
