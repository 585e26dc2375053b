//! # Runner (orientation)
//!
//! [`Swarm::run_turn`] drives one turn of a conversation: call the backend
//! with the active agent, append its reply, dispatch every tool use it asks
//! for (in order, one at a time), append one tool-result message per call,
//! and repeat until the backend stops asking for tools. A handoff changes
//! the active agent for every following backend call of the same turn.
//!
//! The loop never runs two tool calls at once: tools may depend on each
//! other through external state, so each call is awaited before the next
//! starts.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::config::SwarmConfig;
use crate::dispatch::{ToolInvocation, ToolRouter};
use crate::error::{Result, SwarmError};
use crate::items::{Message, Role, ToolUse};
use crate::model::{Backend, ConverseRequest};
use crate::usage::Usage;

/// Orchestrator settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// Maximum backend calls in one turn. `None` (the default) keeps going
    /// for as long as the backend requests tools.
    pub max_iterations: Option<usize>,
}

impl RunConfig {
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }
}

impl From<&SwarmConfig> for RunConfig {
    fn from(config: &SwarmConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
        }
    }
}

/// Side-channel notifications emitted while a turn runs.
///
/// Nothing in the loop depends on what an observer does.
pub trait TurnObserver: Send + Sync {
    /// A text block from the backend, attributed to the agent that was active.
    fn on_text(&self, _agent: &Agent, _text: &str) {}

    /// Control moved from `from` to `to`; takes effect on the next backend call.
    fn on_handoff(&self, _from: &Agent, _to: &Agent) {}
}

/// Default observer: agent replies and handoffs become `info!` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl TurnObserver for LogObserver {
    fn on_text(&self, agent: &Agent, text: &str) {
        info!(agent = %agent.name(), "{}: {}", agent.name(), text);
    }

    fn on_handoff(&self, from: &Agent, to: &Agent) {
        info!(from = %from.name(), to = %to.name(), "Handoff");
    }
}

/// Outcome of one turn.
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// The agent active when the turn ended
    pub agent: Agent,

    /// Messages appended during the turn, excluding the caller's prefix
    pub messages: Vec<Message>,

    /// Summed usage of every backend call in the turn
    pub usage: Usage,

    /// Number of backend calls made
    pub iterations: usize,
}

impl TurnResult {
    /// Text of the last assistant message that carried any.
    pub fn final_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.texts().collect::<Vec<_>>().join("\n"))
            .find(|t| !t.is_empty())
    }
}

/// The orchestrator: a backend plus settings, shared across turns.
#[derive(Clone)]
pub struct Swarm {
    backend: Arc<dyn Backend>,
    config: RunConfig,
    observer: Arc<dyn TurnObserver>,
}

impl Swarm {
    pub fn new(backend: impl Backend + 'static) -> Self {
        Self::with_backend(Arc::new(backend))
    }

    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            config: RunConfig::default(),
            observer: Arc::new(LogObserver),
        }
    }

    pub fn from_config(backend: impl Backend + 'static, config: &SwarmConfig) -> Self {
        Self::new(backend).with_config(RunConfig::from(config))
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_observer(mut self, observer: impl TurnObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs one turn starting from a single user input.
    pub async fn run(&self, agent: &Agent, input: impl Into<String>) -> Result<TurnResult> {
        self.run_turn(agent, &[Message::user(input)]).await
    }

    /// Runs one turn for `agent` on top of `messages`.
    ///
    /// Unknown tools, tool failures, backend failures and session aborts all
    /// end the turn with an error; the caller's history is never modified.
    pub async fn run_turn(&self, agent: &Agent, messages: &[Message]) -> Result<TurnResult> {
        let mut current = agent.clone();
        let mut history = messages.to_vec();
        let prefix_len = history.len();
        let mut usage = Usage::empty();
        let mut iterations = 0usize;

        info!(agent = %current.name(), messages = prefix_len, "Starting turn");

        loop {
            if let Some(max) = self.config.max_iterations {
                if iterations >= max {
                    warn!(agent = %current.name(), max_iterations = max, "Iteration limit reached");
                    return Err(SwarmError::MaxIterationsExceeded {
                        max_iterations: max,
                    });
                }
            }
            iterations += 1;

            // Rebuilt every round: a handoff may have changed the agent.
            let router = ToolRouter::new(&current)?;
            let request = ConverseRequest {
                model_id: current.model().to_string(),
                system: current.instructions().to_string(),
                messages: history.clone(),
                inference_config: current.inference_config().clone(),
                tool_config: router.tool_config(),
            };
            debug!(
                agent = %current.name(),
                iteration = iterations,
                messages = request.messages.len(),
                tools = router.specs().len(),
                "Calling backend"
            );

            let response = self.backend.converse(request).await?;
            usage += response.usage;

            for text in response.output.texts() {
                self.observer.on_text(&current, text);
            }
            let tool_uses: Vec<ToolUse> = response.output.tool_uses().cloned().collect();
            history.push(response.output);

            if !response.stop_reason.is_tool_use() {
                debug!(
                    agent = %current.name(),
                    stop_reason = response.stop_reason.as_str(),
                    "Backend finished"
                );
                break;
            }
            if tool_uses.is_empty() {
                warn!(
                    agent = %current.name(),
                    iteration = iterations,
                    "Backend requested tool use without any tool-use blocks; ending turn"
                );
                break;
            }

            let mut next_agent: Option<Agent> = None;
            for tool_use in &tool_uses {
                debug!(
                    agent = %router.agent_name(),
                    tool = %tool_use.name,
                    tool_use_id = %tool_use.tool_use_id,
                    "Dispatching tool"
                );
                let (payload, handoff) = router
                    .dispatch(&ToolInvocation::from(tool_use))
                    .await?
                    .into_parts();
                history.push(Message::tool_result(tool_use.tool_use_id.clone(), payload));
                if handoff.is_some() {
                    next_agent = handoff;
                }
            }

            if let Some(next) = next_agent {
                self.observer.on_handoff(&current, &next);
                current = next;
            }
        }

        let appended = history.split_off(prefix_len);
        info!(
            agent = %current.name(),
            iterations,
            appended = appended.len(),
            total_tokens = usage.total_tokens,
            "Turn complete"
        );

        Ok(TurnResult {
            agent: current,
            messages: appended,
            usage,
            iterations,
        })
    }
}

impl std::fmt::Debug for Swarm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Swarm").field("config", &self.config).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::{transfer_tool, AgentRef};
    use crate::items::ContentBlock;
    use crate::model::{BackendResponse, MockBackend, StopReason};
    use crate::tool::{FunctionTool, NoArgs, ToolOutcome};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl TurnObserver for Arc<Recorder> {
        fn on_text(&self, agent: &Agent, text: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}: {}", agent.name(), text));
        }

        fn on_handoff(&self, from: &Agent, to: &Agent) {
            self.events
                .lock()
                .unwrap()
                .push(format!("{} -> {}", from.name(), to.name()));
        }
    }

    fn echo_agent() -> Agent {
        Agent::simple("A", "agent a").with_tool(
            FunctionTool::new("ping", |_: NoArgs| Ok(ToolOutcome::json("pong"))).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_single_round_trip() {
        let backend = MockBackend::new().with_response(
            BackendResponse::text("Hello there").with_usage(Usage::new(10, 3)),
        );
        let swarm = Swarm::new(backend.clone());

        let result = swarm.run(&echo_agent(), "hi").await.unwrap();
        assert_eq!(result.agent.name(), "A");
        assert_eq!(result.messages, vec![Message::assistant("Hello there")]);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.usage.total_tokens, 13);
        assert_eq!(result.final_text().as_deref(), Some("Hello there"));
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_observer_sees_text_and_handoff() {
        let target = AgentRef::from(Agent::simple("B", "agent b"));
        let agent = Agent::simple("A", "agent a")
            .with_tool(transfer_tool("handoff", "Hand off.", &target).unwrap());
        let backend = MockBackend::new()
            .with_response(BackendResponse::new(
                Message::new(
                    Role::Assistant,
                    vec![
                        ContentBlock::Text("Passing you along".to_string()),
                        ContentBlock::ToolUse(ToolUse::new("t1", "handoff", json!({}))),
                    ],
                ),
                StopReason::ToolUse,
            ))
            .with_text("B here");

        let recorder = Arc::new(Recorder::default());
        let swarm = Swarm::new(backend).with_observer(recorder.clone());
        let result = swarm.run(&agent, "help").await.unwrap();

        assert_eq!(result.agent.name(), "B");
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec![
                "A: Passing you along".to_string(),
                "A -> B".to_string(),
                "B: B here".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let backend = MockBackend::new()
            .with_tool_use("ping", json!({}))
            .with_tool_use("ping", json!({}))
            .with_text("done");
        let swarm = Swarm::new(backend).with_config(RunConfig::default().with_max_iterations(2));

        let err = swarm.run(&echo_agent(), "go").await.unwrap_err();
        assert!(matches!(
            err,
            SwarmError::MaxIterationsExceeded { max_iterations: 2 }
        ));
    }

    #[tokio::test]
    async fn test_tool_use_stop_without_blocks_ends_turn() {
        let backend = MockBackend::new()
            .with_response(BackendResponse::new(
                Message::new(Role::Assistant, vec![]),
                StopReason::ToolUse,
            ))
            .with_text("never reached");
        let swarm = Swarm::new(backend.clone());

        let result = swarm.run(&echo_agent(), "go").await.unwrap();
        assert_eq!(result.messages.len(), 1);
        assert!(result.messages[0].content.is_empty());
        assert_eq!(backend.remaining(), 1);
    }

    #[tokio::test]
    async fn test_run_config_from_swarm_config() {
        let config = crate::config::ConfigBuilder::new().max_iterations(3).build();
        let swarm = Swarm::from_config(MockBackend::new(), &config);
        assert_eq!(swarm.config().max_iterations, Some(3));
    }
}
