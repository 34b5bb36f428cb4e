use serde::{Deserialize, Deserializer, Serialize};

// Protocol constants shared between the widget and the terminal client
pub mod protocol;

// Endpoint URL construction
pub mod endpoints;
pub use endpoints::{health_url, ws_endpoint, EndpointError};

// Persistent client identifier
pub mod client_id;
pub use client_id::ClientId;

// Outbound slash commands
pub mod commands;
pub use commands::ChatCommand;

// Inbound frame parsing and text cleanup
pub mod inbound;
pub use inbound::{normalize_newlines, parse_inbound, strip_bot_prefix, Inbound};

/// Who authored a chat message.
///
/// The server only distinguishes `"user"` from everything else, so any other
/// role string (`"assistant"`, `"system"`, ...) is treated as the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "assistant",
        }
    }

    pub fn is_bot(&self) -> bool {
        matches!(self, Role::Bot)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        if value == "user" {
            Role::User
        } else {
            Role::Bot
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// A single stored message as replayed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Structured frames the chat backend sends over the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Conversation replay sent right after the socket is accepted
    History { messages: Vec<ChatMessage> },

    /// Incremental fragment of the bot reply being generated
    Stream { delta: String },

    /// Final text of a streamed reply
    StreamEnd { content: String },

    /// A complete message (welcome text, command results, errors)
    Message { role: Role, content: String },
}

// ============================================================================
// Health endpoint
// ============================================================================

/// Response body of `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: String,
    /// Whether the language model backend is reachable
    #[serde(default, deserialize_with = "deserialize_boolish")]
    pub lm_client_available: bool,
}

/// Accept the loose truthiness the backend has used over time: real booleans,
/// numbers, and a handful of string spellings.
fn deserialize_boolish<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "ok"
        ),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_parses_with_mixed_roles() {
        let json = r#"{"type":"history","messages":[
            {"role":"user","content":"hi"},
            {"role":"assistant","content":"hello"},
            {"role":"system","content":"note"}
        ]}"#;
        let parsed: ServerMessage = serde_json::from_str(json).unwrap();

        match parsed {
            ServerMessage::History { messages } => {
                assert_eq!(messages.len(), 3);
                assert_eq!(messages[0].role, Role::User);
                assert_eq!(messages[1].role, Role::Bot);
                assert_eq!(messages[2].role, Role::Bot);
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn stream_end_tag_is_snake_case() {
        let msg = ServerMessage::StreamEnd {
            content: "done".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"stream_end""#));
    }

    #[test]
    fn bot_role_serializes_as_assistant() {
        let msg = ServerMessage::Message {
            role: Role::Bot,
            content: "hey".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""role":"assistant""#));
    }

    #[test]
    fn stream_without_delta_is_rejected() {
        let result = serde_json::from_str::<ServerMessage>(r#"{"type":"stream"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn health_accepts_boolish_values() {
        let cases = [
            (r#"{"status":"ok","lm_client_available":true}"#, true),
            (r#"{"status":"ok","lm_client_available":false}"#, false),
            (r#"{"status":"ok","lm_client_available":1}"#, true),
            (r#"{"status":"ok","lm_client_available":0}"#, false),
            (r#"{"status":"ok","lm_client_available":"yes"}"#, true),
            (r#"{"status":"ok","lm_client_available":"False"}"#, false),
            (r#"{"status":"ok","lm_client_available":null}"#, false),
            (r#"{"status":"ok"}"#, false),
        ];
        for (json, expected) in cases {
            let parsed: HealthResponse = serde_json::from_str(json).unwrap();
            assert_eq!(parsed.lm_client_available, expected, "{}", json);
        }
    }
}
