use serde::{Deserialize, Serialize};

/// A message in the conversation, as sent by the chat UI.
///
/// The client re-sends the full transcript on every turn; the server never
/// stores it. Content may be a plain string or a list of typed parts — only
/// the textual parts matter for detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A single content part. The UI sends parts like
/// `{"type": "output_text", "text": "..."}`; anything without a `text`
/// field (images, tool payloads) is ignored by detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl MessageContent {
    /// Concatenate all textual content, skipping non-text parts.
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(t) => t.clone(),
            MessageContent::Parts(parts) => {
                let texts: Vec<&str> = parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect();
                texts.join(" ").trim().to_string()
            }
        }
    }
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    /// The message's textual content (empty string for non-text-only messages).
    pub fn text(&self) -> String {
        self.content.text()
    }
}

/// Concatenated text of all user-authored messages, in transcript order.
///
/// Assistant text is excluded on purpose: language detection must not be
/// biased by the system's own phrasing.
pub fn user_text(transcript: &[Message]) -> String {
    let texts: Vec<String> = transcript
        .iter()
        .filter(|m| m.role == Role::User)
        .map(Message::text)
        .filter(|t| !t.is_empty())
        .collect();
    texts.join(" ")
}

/// The textual content of each user message, in transcript order.
pub fn user_messages(transcript: &[Message]) -> Vec<String> {
    transcript
        .iter()
        .filter(|m| m.role == Role::User)
        .map(Message::text)
        .collect()
}

/// The text of the most recent assistant message, if any.
pub fn last_assistant_text(transcript: &[Message]) -> Option<String> {
    transcript
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
        .map(Message::text)
}
