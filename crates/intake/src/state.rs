//! Per-turn state derivation, recomputed from the full transcript.

use serde::Serialize;

use xd_domain::chat::{user_text, Message, Role};

use crate::detect::detect_phase;
use crate::extract::{extract_fields, CollectedFields};
use crate::language::{detect_language, Language};
use crate::phase::Phase;

/// Everything the gateway needs to know about a conversation, derived
/// fresh on every turn. No server-side session exists; the transcript is
/// the only source of truth.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationState {
    pub phase: Phase,
    pub progress: u8,
    pub language: Language,
    pub fields: CollectedFields,
}

impl ConversationState {
    pub fn derive(transcript: &[Message]) -> Self {
        let fields = extract_fields(transcript);
        let phase = detect_phase(transcript, &fields);
        let language = detect_language(&user_text(transcript));
        let state = Self {
            phase,
            progress: phase.progress(),
            language,
            fields,
        };
        tracing::debug!(
            phase = state.phase.label(),
            progress = state.progress,
            language = state.language.tag(),
            "derived conversation state"
        );
        state
    }
}

/// True when any assistant message in the transcript contains the
/// scheduling marker. User messages don't count: a visitor pasting the
/// link must not suppress the lead write.
pub fn transcript_has_marker(transcript: &[Message], marker: &str) -> bool {
    transcript
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .any(|m| m.text().contains(marker))
}

/// Persist exactly once per conversation: only when the newly produced
/// assistant reply introduces the marker and no earlier assistant message
/// already carried it. Re-derived from the transcript, so it holds across
/// stateless turns and concurrent instances alike.
pub fn should_persist(transcript: &[Message], reply: &str, marker: &str) -> bool {
    reply.contains(marker) && !transcript_has_marker(transcript, marker)
}
