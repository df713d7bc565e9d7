use xd_domain::chat::Message;
use xd_domain::error::Result;
use xd_domain::stream::{BoxStream, StreamEvent};

/// A provider-agnostic chat completion request.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// The conversation messages to send, system prompt first.
    pub messages: Vec<Message>,
    /// Sampling temperature. `None` lets the provider choose.
    pub temperature: Option<f32>,
    /// Model identifier override. `None` uses the provider default.
    pub model: Option<String>,
}

/// Trait every model adapter implements.
///
/// Chat turns are always streamed: the gateway forwards tokens to the
/// browser as they arrive, so there is no non-streaming entry point.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request and return a stream of events.
    async fn chat_stream(
        &self,
        req: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>>;

    /// A unique identifier for this provider instance, for log records.
    fn provider_id(&self) -> &str;
}
