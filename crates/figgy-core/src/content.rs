//! Flattening of gateway message content into a single display string.

use serde::Deserialize;
use serde_json::Value;

/// A content block inside a gateway history message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text {
        #[serde(default)]
        text: Option<String>,
    },
    #[serde(rename = "toolCall")]
    ToolCall {
        #[serde(default)]
        name: Option<String>,
    },
    #[serde(rename = "toolResult")]
    ToolResult {},
    #[serde(other)]
    Other,
}

/// Result of flattening one message's content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenedContent {
    pub text: String,
    /// Name of the last `toolCall` block, if any.
    pub tool_name: Option<String>,
}

impl FlattenedContent {
    /// Whitespace-only content carries nothing worth showing.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Flatten a message `content` field.
///
/// A string is used as-is. An array is read block by block: `text` blocks
/// contribute their text, `toolCall` blocks `[Tool: <name>]`, `toolResult`
/// blocks `[Tool Result]`. Anything else contributes nothing.
pub fn flatten_content(content: Option<&Value>) -> FlattenedContent {
    match content {
        Some(Value::String(s)) => FlattenedContent {
            text: s.clone(),
            tool_name: None,
        },
        Some(Value::Array(blocks)) => flatten_blocks(blocks),
        _ => FlattenedContent::default(),
    }
}

fn flatten_blocks(blocks: &[Value]) -> FlattenedContent {
    let mut out = FlattenedContent::default();
    for block in blocks {
        let Ok(block) = ContentBlock::deserialize(block) else {
            continue;
        };
        match block {
            ContentBlock::Text { text } => {
                if let Some(text) = text {
                    out.text.push_str(&text);
                }
            }
            ContentBlock::ToolCall { name } => {
                out.text.push_str("[Tool: ");
                out.text.push_str(name.as_deref().unwrap_or("unknown"));
                out.text.push(']');
                out.tool_name = name;
            }
            ContentBlock::ToolResult {} => out.text.push_str("[Tool Result]"),
            ContentBlock::Other => {}
        }
    }
    out
}

/// Keep at most `max` Unicode scalar values of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
