//! Conversation-phase inference for the exportdesk intake script.
//!
//! The chat UI re-sends the full transcript on every turn and nothing is
//! persisted server-side between turns, so everything here is a pure
//! function of the transcript: which of the twelve intake steps the
//! conversation has reached, which language the visitor is writing in, and
//! which fields have been collected so far. The result feeds the system
//! prompt for the next model call and, once the scheduling link appears,
//! the one-time lead write.
//!
//! Detection never fails: malformed messages are skipped, ambiguity
//! resolves through deterministic fallbacks, and the same transcript always
//! produces the same answer.

pub mod detect;
pub mod extract;
pub mod language;
pub mod phase;
pub mod prompt;
pub mod state;

pub use detect::detect_phase;
pub use extract::{CollectedFields, ReviewStatus, TariffCode, TariffStatus};
pub use language::Language;
pub use phase::Phase;
pub use state::ConversationState;
