//! Tool system for agents
//!
//! A tool is a named callable with a precomputed [`CallSpecification`].
//! Invoking it yields either an ordinary JSON value or a handoff directive
//! naming the agent that should take over the conversation.

use async_trait::async_trait;
use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tower::BoxError;

use crate::agent::Agent;
use crate::error::Result;
use crate::schema::{self, CallSpecification};

/// What a tool hands back on success.
#[derive(Clone)]
pub enum ToolOutcome {
    /// A JSON-serializable result forwarded to the backend as-is
    Value(Value),
    /// Control passes to another agent
    Handoff(Agent),
}

impl ToolOutcome {
    pub fn json(value: impl Into<Value>) -> Self {
        ToolOutcome::Value(value.into())
    }

    /// Serialize any value into an ordinary outcome.
    pub fn serialize<T: Serialize>(value: &T) -> std::result::Result<Self, ToolError> {
        serde_json::to_value(value)
            .map(ToolOutcome::Value)
            .map_err(ToolError::failed)
    }

    pub fn is_handoff(&self) -> bool {
        matches!(self, ToolOutcome::Handoff(_))
    }
}

impl std::fmt::Debug for ToolOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolOutcome::Value(v) => f.debug_tuple("Value").field(v).finish(),
            ToolOutcome::Handoff(a) => f.debug_tuple("Handoff").field(&a.name()).finish(),
        }
    }
}

/// Why a tool did not produce an outcome.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool failed; the turn is aborted with the original error attached
    #[error("{0}")]
    Failed(#[from] BoxError),

    /// The tool asks to end the whole session (e.g. escalation to a human).
    /// Not an error condition: embedders decide how to terminate.
    #[error("session abort requested: {reason}")]
    Abort { reason: String },
}

impl ToolError {
    pub fn failed(err: impl Into<BoxError>) -> Self {
        ToolError::Failed(err.into())
    }

    pub fn abort(reason: impl Into<String>) -> Self {
        ToolError::Abort {
            reason: reason.into(),
        }
    }
}

/// Argument type for tools that take no parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize, JsonSchema)]
pub struct NoArgs {}

/// Trait for all tools that can be used by agents
#[async_trait]
pub trait Tool: Send + Sync {
    /// The call specification advertised to the backend
    fn spec(&self) -> &CallSpecification;

    /// Get the name of the tool
    fn name(&self) -> &str {
        &self.spec().name
    }

    /// Execute the tool with the given arguments
    async fn call(&self, arguments: Value) -> std::result::Result<ToolOutcome, ToolError>;
}

type Handler =
    Arc<dyn Fn(Value) -> BoxFuture<'static, std::result::Result<ToolOutcome, ToolError>> + Send + Sync>;

/// A tool backed by a closure over a typed argument struct.
///
/// The call specification is generated once, when the tool is built.
#[derive(Clone)]
pub struct FunctionTool {
    spec: CallSpecification,
    handler: Handler,
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("spec", &self.spec)
            .finish()
    }
}

impl FunctionTool {
    /// Create a tool from a synchronous handler.
    ///
    /// ```rust
    /// use agent_swarm::tool::{FunctionTool, Tool, ToolOutcome};
    /// use schemars::JsonSchema;
    /// use serde::Deserialize;
    /// use serde_json::json;
    ///
    /// /// Use to find item ID.
    /// #[derive(Deserialize, JsonSchema)]
    /// struct LookUpItem {
    ///     search_query: String,
    /// }
    ///
    /// let tool = FunctionTool::new("look_up_item", |args: LookUpItem| {
    ///     Ok(ToolOutcome::json(json!({"item": format!("item_for_{}", args.search_query)})))
    /// })
    /// .unwrap();
    ///
    /// assert_eq!(tool.name(), "look_up_item");
    /// assert_eq!(tool.spec().description, "Use to find item ID.");
    /// ```
    pub fn new<A, F>(name: impl Into<String>, function: F) -> Result<Self>
    where
        A: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(A) -> std::result::Result<ToolOutcome, ToolError> + Send + Sync + 'static,
    {
        let function = Arc::new(function);
        Self::new_async(name, move |args: A| {
            let function = function.clone();
            async move { (function.as_ref())(args) }
        })
    }

    /// Create a tool from an async handler.
    pub fn new_async<A, H, Fut>(name: impl Into<String>, handler: H) -> Result<Self>
    where
        A: DeserializeOwned + JsonSchema + Send + 'static,
        H: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<ToolOutcome, ToolError>> + Send + 'static,
    {
        let spec = schema::generate::<A>(name)?;
        let handler = Arc::new(handler);
        let erased: Handler = Arc::new(move |raw: Value| -> BoxFuture<
            'static,
            std::result::Result<ToolOutcome, ToolError>,
        > {
            let handler = handler.clone();
            Box::pin(async move {
                // Zero-argument calls may arrive as `null`.
                let raw = if raw.is_null() {
                    Value::Object(Default::default())
                } else {
                    raw
                };
                let args: A = serde_json::from_value(raw).map_err(ToolError::failed)?;
                (handler.as_ref())(args).await
            })
        });
        Ok(Self {
            spec,
            handler: erased,
        })
    }

    /// Override the description taken from the argument struct's docs.
    pub fn with_description(mut self, description: impl AsRef<str>) -> Self {
        self.spec = self.spec.with_description(description);
        self
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn spec(&self) -> &CallSpecification {
        &self.spec
    }

    async fn call(&self, arguments: Value) -> std::result::Result<ToolOutcome, ToolError> {
        (self.handler)(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParamType;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Request a refund on behalf of the customer.
    #[derive(Deserialize, JsonSchema)]
    struct ExecuteRefund {
        item_id: String,
        #[serde(default = "not_provided")]
        reason: String,
    }

    fn not_provided() -> String {
        "not provided".to_string()
    }

    fn refund_tool() -> FunctionTool {
        FunctionTool::new("execute_refund", |args: ExecuteRefund| {
            Ok(ToolOutcome::json(json!({
                "item": args.item_id,
                "reason": args.reason,
            })))
        })
        .unwrap()
    }

    #[test]
    fn test_spec_generated_at_construction() {
        let tool = refund_tool();
        assert_eq!(tool.name(), "execute_refund");
        assert_eq!(
            tool.spec().description,
            "Request a refund on behalf of the customer."
        );
        assert_eq!(tool.spec().parameter("reason"), Some(ParamType::String));
        assert_eq!(tool.spec().required, vec!["item_id".to_string()]);
    }

    #[tokio::test]
    async fn test_defaults_apply_when_argument_missing() {
        let tool = refund_tool();
        let out = tool.call(json!({"item_id": "item_1"})).await.unwrap();
        match out {
            ToolOutcome::Value(v) => {
                assert_eq!(v, json!({"item": "item_1", "reason": "not provided"}))
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bad_arguments_fail() {
        let tool = refund_tool();
        let err = tool.call(json!({"reason": "broken"})).await.unwrap_err();
        assert!(matches!(err, ToolError::Failed(_)));
    }

    #[tokio::test]
    async fn test_no_args_accepts_null_and_empty_object() {
        let tool = FunctionTool::new("ping", |_: NoArgs| Ok(ToolOutcome::json("pong"))).unwrap();
        assert!(tool.spec().parameters.is_empty());
        assert!(tool.call(Value::Null).await.is_ok());
        assert!(tool.call(json!({})).await.is_ok());
    }

    #[tokio::test]
    async fn test_async_handler_and_abort() {
        let tool = FunctionTool::new_async("escalate", |_: NoArgs| async move {
            Err::<ToolOutcome, _>(ToolError::abort("customer wants a human"))
        })
        .unwrap()
        .with_description("Only call this if explicitly asked to.");

        assert_eq!(tool.spec().description, "Only call this if explicitly asked to.");
        let err = tool.call(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::Abort { ref reason } if reason == "customer wants a human"));
    }

    #[test]
    fn test_non_struct_arguments_rejected() {
        let err = FunctionTool::new("raw", |_: String| Ok(ToolOutcome::json(1))).unwrap_err();
        assert!(matches!(err, crate::error::SwarmError::Introspection { .. }));
    }
}
