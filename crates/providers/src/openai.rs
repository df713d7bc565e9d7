//! OpenAI-compatible chat completions adapter.
//!
//! Works against OpenAI itself and any endpoint that speaks the same
//! contract (Azure gateways, vLLM, Together, etc.).

use serde_json::Value;

use xd_domain::config::LlmConfig;
use xd_domain::error::{Error, Result};
use xd_domain::stream::{BoxStream, StreamEvent, Usage};
use xd_domain::chat::{Message, Role};

use crate::traits::{ChatRequest, LlmProvider};
use crate::util::from_reqwest;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    default_model: String,
    default_temperature: Option<f32>,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Build the adapter from config, resolving the API key from the
    /// configured environment variable.
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&cfg.api_key_env).map_err(|_| {
            Error::Config(format!(
                "environment variable '{}' not set or not valid UTF-8",
                cfg.api_key_env
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model: cfg.model.clone(),
            default_temperature: cfg.temperature,
            client,
        })
    }

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
    }

    fn build_chat_body(&self, req: &ChatRequest) -> Value {
        let messages: Vec<Value> = req.messages.iter().map(msg_to_openai).collect();
        let model = req
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": true,
            "stream_options": {"include_usage": true},
        });

        if let Some(temp) = req.temperature.or(self.default_temperature) {
            body["temperature"] = serde_json::json!(temp);
        }
        body
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire serialization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Content parts are flattened to plain text: the upstream only ever sees
/// the textual conversation, the same view the detector works from.
fn msg_to_openai(msg: &Message) -> Value {
    serde_json::json!({
        "role": role_to_str(msg.role),
        "content": msg.text(),
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SSE body decoding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Incremental decoder for the upstream `text/event-stream` body.
///
/// Network chunks split events at arbitrary byte boundaries, so complete
/// events (terminated by a blank line) are handed out as they form while
/// the unterminated tail is held back for the next chunk.
#[derive(Default)]
struct SseDecoder {
    pending: String,
}

impl SseDecoder {
    /// Feed one network chunk; returns the `data:` payloads of every
    /// event completed by it.
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.push_str(&String::from_utf8_lossy(chunk));
        match self.pending.rfind("\n\n") {
            Some(end) => {
                let complete: String = self.pending.drain(..end + 2).collect();
                complete.split("\n\n").flat_map(data_payloads).collect()
            }
            None => Vec::new(),
        }
    }

    /// Hand out whatever is left once the body closes. The final event of
    /// a stream sometimes arrives without its trailing blank line.
    fn finish(&mut self) -> Vec<String> {
        let tail = std::mem::take(&mut self.pending);
        data_payloads(&tail)
    }
}

/// The `data:` payloads of one event block. Comment, `event:`, `id:` and
/// `retry:` lines carry nothing this adapter uses.
fn data_payloads(block: &str) -> Vec<String> {
    block
        .lines()
        .filter_map(|line| line.trim().strip_prefix("data:"))
        .map(|payload| payload.trim().to_string())
        .filter(|payload| !payload.is_empty())
        .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Payload parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_openai_usage(v: &Value) -> Option<Usage> {
    Some(Usage {
        prompt_tokens: v.get("prompt_tokens")?.as_u64()? as u32,
        completion_tokens: v.get("completion_tokens")?.as_u64()? as u32,
        total_tokens: v.get("total_tokens")?.as_u64()? as u32,
    })
}

fn parse_sse_data(data: &str) -> Option<Result<StreamEvent>> {
    if data.trim() == "[DONE]" {
        return Some(Ok(StreamEvent::Done {
            usage: None,
            finish_reason: Some("stop".into()),
        }));
    }

    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return Some(Err(Error::Json(e))),
    };

    let choice = v
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first());

    // Usage-only chunk (stream_options.include_usage).
    let Some(choice) = choice else {
        if let Some(usage) = v.get("usage").and_then(parse_openai_usage) {
            return Some(Ok(StreamEvent::Done {
                usage: Some(usage),
                finish_reason: None,
            }));
        }
        return None;
    };

    if let Some(fr) = choice.get("finish_reason").and_then(|f| f.as_str()) {
        let usage = v.get("usage").and_then(parse_openai_usage);
        return Some(Ok(StreamEvent::Done {
            usage,
            finish_reason: Some(fr.to_string()),
        }));
    }

    let delta = choice.get("delta").unwrap_or(&Value::Null);
    if let Some(text) = delta.get("content").and_then(|v| v.as_str()) {
        if !text.is_empty() {
            return Some(Ok(StreamEvent::Token {
                text: text.to_string(),
            }));
        }
    }

    None
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat_stream(
        &self,
        req: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_chat_body(req);

        tracing::debug!(url = %url, "chat completions stream request");

        let resp = self
            .authed_post(&url)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let err_text = resp.text().await.map_err(from_reqwest)?;
            return Err(Error::Provider {
                provider: "openai".into(),
                message: format!("HTTP {} - {}", status.as_u16(), err_text),
            });
        }

        let stream = async_stream::stream! {
            let mut resp = resp;
            let mut decoder = SseDecoder::default();
            let mut finished = false;

            loop {
                match resp.chunk().await {
                    Ok(Some(bytes)) => {
                        for payload in decoder.push(&bytes) {
                            if let Some(event) = parse_sse_data(&payload) {
                                if matches!(&event, Ok(StreamEvent::Done { .. })) {
                                    finished = true;
                                }
                                yield event;
                            }
                        }
                    }
                    Ok(None) => {
                        for payload in decoder.finish() {
                            if let Some(event) = parse_sse_data(&payload) {
                                if matches!(&event, Ok(StreamEvent::Done { .. })) {
                                    finished = true;
                                }
                                yield event;
                            }
                        }
                        break;
                    }
                    Err(e) => {
                        yield Err(from_reqwest(e));
                        break;
                    }
                }
            }

            // The turn handler stops reading on a terminal event, so one
            // is guaranteed even when the upstream cuts off early.
            if !finished {
                yield Ok(StreamEvent::Done {
                    usage: None,
                    finish_reason: Some("stop".into()),
                });
            }
        };

        Ok(Box::pin(stream))
    }

    fn provider_id(&self) -> &str {
        "openai"
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_delta_becomes_token() {
        let data = r#"{"choices":[{"delta":{"content":"Merhaba"}}]}"#;
        match parse_sse_data(data) {
            Some(Ok(StreamEvent::Token { text })) => assert_eq!(text, "Merhaba"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn finish_reason_becomes_done() {
        let data = r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        match parse_sse_data(data) {
            Some(Ok(StreamEvent::Done { finish_reason, .. })) => {
                assert_eq!(finish_reason.as_deref(), Some("stop"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn usage_only_chunk_becomes_done_with_usage() {
        let data = r#"{"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#;
        match parse_sse_data(data) {
            Some(Ok(StreamEvent::Done { usage: Some(u), .. })) => {
                assert_eq!(u.total_tokens, 15);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn done_sentinel_terminates() {
        match parse_sse_data("[DONE]") {
            Some(Ok(StreamEvent::Done { .. })) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn empty_delta_yields_nothing() {
        assert!(parse_sse_data(r#"{"choices":[{"delta":{}}]}"#).is_none());
    }

    #[test]
    fn invalid_json_surfaces_an_error() {
        match parse_sse_data("{not json") {
            Some(Err(Error::Json(_))) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn messages_flatten_to_role_and_text() {
        let msg = Message::assistant("Which country do you want to sell to?");
        let v = msg_to_openai(&msg);
        assert_eq!(v["role"], "assistant");
        assert_eq!(v["content"], "Which country do you want to sell to?");
    }

    #[test]
    fn decoder_splits_token_deltas_across_network_chunks() {
        // One delta event split mid-JSON over two reads, a second event
        // completing in the same read as the first's tail.
        let mut dec = SseDecoder::default();
        assert!(dec
            .push(br#"data: {"choices":[{"delta":{"content":"Hangi "#)
            .is_empty());
        let payloads = dec.push(
            b"\xc3\xbclkeye\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\" satmak\"}}]}\n\n",
        );
        assert_eq!(payloads.len(), 2);
        match parse_sse_data(&payloads[0]) {
            Some(Ok(StreamEvent::Token { text })) => assert_eq!(text, "Hangi \u{fc}lkeye"),
            other => panic!("unexpected: {other:?}"),
        }
        match parse_sse_data(&payloads[1]) {
            Some(Ok(StreamEvent::Token { text })) => assert_eq!(text, " satmak"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn decoder_ignores_comment_and_field_lines() {
        let mut dec = SseDecoder::default();
        let payloads = dec.push(
            b": keep-alive\n\nevent: message\nid: 7\ndata: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\n",
        );
        assert_eq!(payloads, vec![r#"{"choices":[{"delta":{"content":"ok"}}]}"#]);
    }

    #[test]
    fn decoder_flushes_unterminated_done_sentinel_on_close() {
        // Some upstreams close the body right after "data: [DONE]" without
        // the trailing blank line.
        let mut dec = SseDecoder::default();
        let usage_chunk = r#"{"choices":[],"usage":{"prompt_tokens":812,"completion_tokens":64,"total_tokens":876}}"#;
        let payloads = dec.push(format!("data: {usage_chunk}\n\ndata: [DONE]").as_bytes());
        assert_eq!(payloads, vec![usage_chunk.to_string()]);

        let tail = dec.finish();
        assert_eq!(tail, vec!["[DONE]".to_string()]);
        match parse_sse_data(&tail[0]) {
            Some(Ok(StreamEvent::Done { .. })) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }
}
