//! Items representing messages, content blocks, tool uses and tool results
//!
//! Messages follow the converse wire shape: a role plus an ordered list of
//! content blocks, each of which is plain text, a tool-use request or a
//! tool result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A tool invocation requested by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUse {
    pub tool_use_id: String,
    pub name: String,
    pub input: Value,
}

impl ToolUse {
    pub fn new(tool_use_id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            name: name.into(),
            input,
        }
    }
}

/// One piece of a tool result's content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolResultContent {
    Json(Value),
    Text(String),
}

/// The answer to a [`ToolUse`], correlated by `tool_use_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub tool_use_id: String,
    pub content: Vec<ToolResultContent>,
}

impl ToolResult {
    pub fn json(tool_use_id: impl Into<String>, payload: Value) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            content: vec![ToolResultContent::Json(payload)],
        }
    }

    /// The first JSON payload of this result, if any.
    pub fn payload(&self) -> Option<&Value> {
        self.content.iter().find_map(|c| match c {
            ToolResultContent::Json(v) => Some(v),
            ToolResultContent::Text(_) => None,
        })
    }
}

/// A single block of message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentBlock {
    Text(String),
    ToolUse(ToolUse),
    ToolResult(ToolResult),
}

/// A message in the conversation. Immutable once appended to a history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn new(role: Role, content: Vec<ContentBlock>) -> Self {
        Self { role, content }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentBlock::Text(text.into())])
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![ContentBlock::Text(text.into())])
    }

    /// Tool results travel back to the backend on the user side.
    pub fn tool_result(tool_use_id: impl Into<String>, payload: Value) -> Self {
        Self::new(
            Role::User,
            vec![ContentBlock::ToolResult(ToolResult::json(tool_use_id, payload))],
        )
    }

    /// All text blocks, in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|b| match b {
            ContentBlock::Text(t) => Some(t.as_str()),
            _ => None,
        })
    }

    /// All tool-use requests, in the order they appear.
    pub fn tool_uses(&self) -> impl Iterator<Item = &ToolUse> {
        self.content.iter().filter_map(|b| match b {
            ContentBlock::ToolUse(u) => Some(u),
            _ => None,
        })
    }

    pub fn tool_results(&self) -> impl Iterator<Item = &ToolResult> {
        self.content.iter().filter_map(|b| match b {
            ContentBlock::ToolResult(r) => Some(r),
            _ => None,
        })
    }

    pub fn has_tool_uses(&self) -> bool {
        self.tool_uses().next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let msg = Message::new(
            Role::Assistant,
            vec![
                ContentBlock::Text("Looking that up".to_string()),
                ContentBlock::ToolUse(ToolUse {
                    tool_use_id: "tu_1".to_string(),
                    name: "lookup".to_string(),
                    input: json!({"id": "x1"}),
                }),
            ],
        );

        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "role": "assistant",
                "content": [
                    {"text": "Looking that up"},
                    {"toolUse": {"toolUseId": "tu_1", "name": "lookup", "input": {"id": "x1"}}}
                ]
            })
        );
    }

    #[test]
    fn test_tool_result_message() {
        let msg = Message::tool_result("tu_9", json!({"item": "item_1"}));
        assert_eq!(msg.role, Role::User);
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "role": "user",
                "content": [
                    {"toolResult": {"toolUseId": "tu_9", "content": [{"json": {"item": "item_1"}}]}}
                ]
            })
        );

        let result = msg.tool_results().next().unwrap();
        assert_eq!(result.payload(), Some(&json!({"item": "item_1"})));
    }

    #[test]
    fn test_accessors_preserve_order() {
        let msg = Message::new(
            Role::Assistant,
            vec![
                ContentBlock::ToolUse(ToolUse {
                    tool_use_id: "a".to_string(),
                    name: "first".to_string(),
                    input: json!({}),
                }),
                ContentBlock::Text("middle".to_string()),
                ContentBlock::ToolUse(ToolUse {
                    tool_use_id: "b".to_string(),
                    name: "second".to_string(),
                    input: json!({}),
                }),
            ],
        );

        let names: Vec<&str> = msg.tool_uses().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(msg.texts().collect::<Vec<_>>(), vec!["middle"]);
        assert!(msg.has_tool_uses());
        assert!(!Message::user("hi").has_tool_uses());
    }

    #[test]
    fn test_deserialize_user_text() {
        let msg: Message =
            serde_json::from_value(json!({"role": "user", "content": [{"text": "hello"}]})).unwrap();
        assert_eq!(msg, Message::user("hello"));
    }
}
