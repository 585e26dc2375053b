//! # agent-swarm
//!
//! A small multi-agent orchestration core. Agents are personas with
//! instructions, a model and a set of tools; the backend decides which tools
//! to call; a tool may hand the conversation to another agent.
//!
//! ## Core Concepts
//!
//! - **Agent**: an immutable persona record ([`Agent`])
//! - **Tools**: typed callables whose call specification is generated from
//!   the `JsonSchema` of their argument struct ([`FunctionTool`], [`schema`])
//! - **Handoff**: a tool outcome that names the next active agent ([`handoff`])
//! - **Turn**: one run of the orchestration loop ([`Swarm::run_turn`])
//! - **Backend**: anything that answers a converse request ([`Backend`])
//!
//! ## Getting Started
//!
//! ```rust
//! use agent_swarm::{Agent, FunctionTool, MockBackend, Swarm, ToolOutcome};
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! /// Use to find item ID. Search query can be a description or keywords.
//! #[derive(Deserialize, JsonSchema)]
//! struct LookUpItem {
//!     search_query: String,
//! }
//!
//! # async fn example() -> agent_swarm::Result<()> {
//! let repairs = Agent::simple("Issues and Repairs Agent", "Help the customer with their issue.")
//!     .with_tool(FunctionTool::new("look_up_item", |args: LookUpItem| {
//!         Ok(ToolOutcome::json(json!({ "item_id": "item_132612938", "query": args.search_query })))
//!     })?);
//!
//! let backend = MockBackend::new()
//!     .with_tool_use("look_up_item", json!({ "search_query": "blue kettle" }))
//!     .with_text("I found your kettle.");
//!
//! let swarm = Swarm::new(backend);
//! let result = swarm.run(&repairs, "My kettle broke").await?;
//! assert_eq!(result.messages.len(), 3);
//! # Ok(())
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(example()).unwrap();
//! ```

pub mod agent;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handoff;
pub mod items;
pub mod model;
pub mod runner;
pub mod schema;
pub mod tool;
pub mod usage;

pub use agent::{Agent, AgentConfig, InferenceConfig};
pub use config::{ConfigBuilder, SwarmConfig};
pub use dispatch::{DispatchResult, ToolInvocation, ToolRouter};
pub use error::{Result, SwarmError};
pub use handoff::{transfer_confirmation, transfer_tool, AgentRef};
pub use items::{ContentBlock, Message, Role, ToolResult, ToolResultContent, ToolUse};
pub use model::{
    Backend, BackendResponse, ConverseRequest, MockBackend, OpenAIBackend, StopReason, ToolConfig,
};
pub use runner::{LogObserver, RunConfig, Swarm, TurnObserver, TurnResult};
pub use schema::{CallSpecification, ParamType, Parameter};
pub use tool::{FunctionTool, NoArgs, Tool, ToolError, ToolOutcome};
pub use usage::Usage;
