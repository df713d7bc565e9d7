//! The turn endpoint — one chat turn per request.
//!
//! `POST /v1/turn` takes the full transcript, derives the conversation
//! state, streams the model's reply back as SSE, and fires the one-time
//! lead write when the reply introduces the scheduling marker.
//!
//! Event sequence per turn:
//! - `state`     — `{phase, step, progress, language}`, always first
//! - `delta`     — `{text}`, zero or more incremental chunks
//! - `completed` — `{persisted}`, always last

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use chrono::Utc;
use futures_util::StreamExt;
use serde::Deserialize;

use xd_domain::chat::Message;
use xd_domain::stream::StreamEvent;
use xd_intake::prompt::build_system_prompt;
use xd_intake::state::should_persist;
use xd_intake::{ConversationState, Language};
use xd_providers::ChatRequest;

use crate::leads::LeadRecord;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub messages: Vec<Message>,
}

/// Generic apology shown when the upstream model call fails. The chat is
/// allowed to continue; the visitor just retries their message.
fn apology(language: Language) -> &'static str {
    match language {
        Language::Turkish => {
            "Üzgünüm, şu anda teknik bir sorun yaşıyorum. Lütfen mesajınızı tekrar gönderir misiniz?"
        }
        Language::English => {
            "Sorry, I'm having a technical issue right now. Could you please send your message again?"
        }
    }
}

fn state_payload(state: &ConversationState) -> serde_json::Value {
    serde_json::json!({
        "phase": state.phase.label(),
        "step": state.phase.step(),
        "progress": state.progress,
        "language": state.language.tag(),
    })
}

fn delta_event(text: &str) -> Event {
    Event::default()
        .event("delta")
        .data(serde_json::json!({ "text": text }).to_string())
}

pub async fn turn(
    State(state): State<AppState>,
    axum::Json(body): axum::Json<TurnRequest>,
) -> impl IntoResponse {
    let transcript = body.messages;
    let convo = ConversationState::derive(&transcript);
    let turn_id = uuid::Uuid::new_v4();

    tracing::info!(
        %turn_id,
        phase = convo.phase.label(),
        progress = convo.progress,
        language = convo.language.tag(),
        messages = transcript.len(),
        "turn started"
    );

    // The detector runs before streaming starts; the model call is the
    // only suspending operation in the turn.
    let system = build_system_prompt(&convo, Utc::now().date_naive());
    let mut messages = Vec::with_capacity(transcript.len() + 1);
    messages.push(Message::system(system));
    messages.extend(transcript.iter().cloned());

    let req = ChatRequest {
        messages,
        temperature: None,
        model: None,
    };

    let upstream = state.llm.chat_stream(&req).await;

    // If the client disconnects mid-stream, axum drops this stream and
    // the upstream response with it, aborting the model call.
    let stream = async_stream::stream! {
        yield Ok::<_, std::convert::Infallible>(
            Event::default()
                .event("state")
                .data(state_payload(&convo).to_string()),
        );

        let mut reply = String::new();

        match upstream {
            Ok(mut events) => {
                while let Some(event) = events.next().await {
                    match event {
                        Ok(StreamEvent::Token { text }) => {
                            reply.push_str(&text);
                            yield Ok(delta_event(&text));
                        }
                        Ok(StreamEvent::Done { usage, .. }) => {
                            if let Some(u) = usage {
                                tracing::debug!(
                                    %turn_id,
                                    prompt_tokens = u.prompt_tokens,
                                    completion_tokens = u.completion_tokens,
                                    "turn usage"
                                );
                            }
                            break;
                        }
                        Ok(StreamEvent::Error { message }) => {
                            tracing::warn!(%turn_id, error = %message, "upstream stream error");
                            if reply.is_empty() {
                                yield Ok(delta_event(apology(convo.language)));
                            }
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(%turn_id, error = %e, "upstream stream failed");
                            if reply.is_empty() {
                                yield Ok(delta_event(apology(convo.language)));
                            }
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!(%turn_id, error = %e, "model call failed to start");
                yield Ok(delta_event(apology(convo.language)));
            }
        }

        let marker = &state.config.intake.scheduling_marker;
        let mut persisted = false;
        if should_persist(&transcript, &reply, marker) {
            match &state.leads {
                Some(leads) => {
                    let record = LeadRecord::from_state(&convo, &transcript, Utc::now());
                    match leads.save(&record).await {
                        Ok(()) => {
                            persisted = true;
                            tracing::info!(%turn_id, "lead persisted");
                        }
                        Err(e) => {
                            // Never surfaced to the visitor.
                            tracing::error!(%turn_id, error = %e, "lead persistence failed");
                        }
                    }
                }
                None => {
                    tracing::info!(%turn_id, "scheduling marker reached, lead store disabled");
                }
            }
        }

        yield Ok(
            Event::default()
                .event("completed")
                .data(serde_json::json!({ "persisted": persisted }).to_string()),
        );

        tracing::info!(%turn_id, reply_chars = reply.len(), persisted, "turn finished");
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
