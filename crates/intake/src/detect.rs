//! Phase detection: which script step the conversation has reached.
//!
//! Three strategies, in strict precedence:
//!
//! 1. match the most recent assistant question against an ordered
//!    keyword table;
//! 2. if no assistant message exists yet, infer from the user message
//!    count;
//! 3. walk the collected fields in script order and take the first gap.
//!
//! Strategy 3 always yields a phase, and the final answer is the max of
//! the chosen strategy and that floor, so the detector can never move
//! backwards when a field has already been collected and never returns
//! "no phase".

use xd_domain::chat::{last_assistant_text, user_messages, Message};

use crate::extract::CollectedFields;
use crate::phase::Phase;

/// Ordered (phase, cues) table for the primary strategy. First match
/// wins, so more specific later-stage cues sit before the broad country
/// cues at the bottom.
const QUESTION_CUES: &[(Phase, &[&str])] = &[
    (
        Phase::TariffCode,
        // "GTİP".to_lowercase() is "gti\u{307}p" (combining dot above),
        // so the plain "gtip" cue alone would miss Turkish questions.
        &[
            "gtip",
            "gti\u{307}p",
            "hs code",
            "tariff",
            "shall we use",
            "kullanalım mı",
            "biliyor musunuz",
        ],
    ),
    (
        Phase::SalesChannels,
        &[
            "sales channel",
            "satış kanal",
            "wholesaler",
            "importer",
            "distributor",
            "toptan",
        ],
    ),
    (Phase::Website, &["website", "websiten", "web site", "domain"]),
    (Phase::Name, &["your name", "name", "isim", "adınız"]),
    (Phase::Email, &["email", "e-posta", "mail"]),
    (Phase::Phone, &["phone", "telefon", "number", "numara"]),
    (Phase::Keywords, &["keyword", "anahtar", "describe", "tanımlar"]),
    (
        Phase::Competitors,
        &["competitor", "rakip", "competition", "keep a note"],
    ),
    (
        Phase::Customers,
        &["customer", "müşteri", "potential customer", "potansiyel müşteri"],
    ),
    (
        Phase::Demo,
        &["demo", "meeting", "call", "schedule", "calendly", "summary"],
    ),
    (Phase::Country, &["country", "ülke", "hangi ülke"]),
];

/// Detect the current phase from the transcript and the already-extracted
/// fields. Pure and total.
pub fn detect_phase(transcript: &[Message], fields: &CollectedFields) -> Phase {
    let user_count = user_messages(transcript).len();
    if user_count == 0 {
        // Nothing to detect from; the field floor would otherwise lift
        // this to PRODUCT before the visitor has said anything.
        return Phase::Initial;
    }

    let floor = fields.first_missing();

    let signal = match last_assistant_text(transcript) {
        Some(question) => match_question(&question.to_lowercase()),
        None => Some(count_fallback(user_count)),
    };

    match signal {
        Some(phase) => phase.max(floor),
        None => floor,
    }
}

fn match_question(question: &str) -> Option<Phase> {
    for (phase, cues) in QUESTION_CUES {
        if cues.iter().any(|cue| question.contains(cue)) {
            return Some(*phase);
        }
    }
    None
}

/// Cold-start heuristic when no assistant message exists: assume the
/// script has been followed in strict order.
fn count_fallback(user_count: usize) -> Phase {
    match user_count {
        0 => Phase::Initial,
        1 => Phase::Country,
        2 => Phase::TariffCode,
        _ => Phase::SalesChannels,
    }
}
