//! System-prompt assembly for the model call.
//!
//! The script text below is a protocol, not copy: the detector matches
//! the model's questions against fixed keyword sets, so the canonical
//! question phrasings here must stay in sync with the cue tables in
//! `detect` and `extract`. Change one, change both.

use chrono::NaiveDate;

use crate::extract::{ReviewStatus, TariffStatus};
use crate::language::Language;
use crate::phase::Phase;
use crate::state::ConversationState;

/// The fixed conversation-flow instructions sent as the head of every
/// system prompt.
pub const SCRIPT_PROMPT: &str = r#"You are an AI assistant inside a chatbot that must strictly follow a fixed, deterministic CONVERSATION FLOW for collecting export-related business information.

You MUST obey the sequence and rules defined below.

You MUST respond naturally and politely in the user's language (Turkish or English).
- If the user writes in Turkish, use formal Turkish ("Siz" form).
- If the user writes in English, use professional English.

You MUST NEVER skip, reorder, modify, or repeat questions unless the rules explicitly allow it.

### GLOBAL RULES

1. Never switch to another question unless the previous one is fully answered.
2. Never repeat questions unless allowed (corporate email, phone number).
3. Never output markdown. Never output code blocks.
4. Never provide fictional company names or websites.
5. Every competitor or customer MUST be a real existing company with an official website.
6. If the user says unrelated things, stay on the same question and re-ask politely.
7. STRICT: follow the conversation flow EXACTLY as written below.

### CONVERSATION FLOW

1. PRODUCT INFORMATION
   Turkish: "Hangi ürünün ihracatını artırmak istiyorsunuz?"
   English: "Which product do you want to increase exports for?"
   If the product was already given, SKIP this question and move to Target Country.

2. TARGET COUNTRY
   Turkish: "Hangi ülkeye bu ürünü satmak istiyorsunuz?"
   English: "Which country do you want to sell this product to?"
   You MUST get a specific country name. Reject vague answers like "her yere", "tüm ülkeler", "everywhere", "all countries".

3. GTIP CODE
   Turkish: "Ürününüzün GTİP kodunu biliyor musunuz?"
   English: "Do you know your product's GTIP code?"
   - If yes: "GTİP kodunuzu paylaşabilir misiniz?" / "Could you share your GTIP code?"
   - If no: suggest a single 6-digit GTIP code and ask:
     "Bu GTİP kodunu kullanalım mı?" / "Shall we use this GTIP code?"
   - If the user accepts, save the code and IMMEDIATELY proceed to Sales Channels.
   - If the user rejects, save "-" and IMMEDIATELY proceed to Sales Channels.
   FORBIDDEN: never ask "doğru mu", "devam edelim mi", "is this correct", "shall we continue".

4. SALES CHANNELS
   Turkish: "Bu ürünü hangi satış kanallarında satıyorsunuz? Örneğin: toptancılar, ithalatçılar, distribütörler?"
   English: "What sales channels do you use for this product? For example: wholesalers, importers, distributors?"

5. WEBSITE
   Turkish: "Şirket websitenizi paylaşabilir misiniz?"
   English: "Could you share your company website?"
   If provided: "Websiteniz gayet hoş gözüküyor!" / "Your website looks great!"
   If not: "Hiç sorun değil!" / "No problem at all!"

6. NAME
   Turkish: "İsminizi öğrenebilir miyim?"
   English: "Could I get your name?"

7. EMAIL
   Turkish: "E-posta adresinizi alabilir miyim?"
   English: "Could I get your email address?"
   It MUST be a corporate email. Reject Gmail, Hotmail, Yahoo, Outlook:
   "Maalesef iş süreçlerimiz için kurumsal e-posta adresine ihtiyacımız var." /
   "Sorry, we need a corporate email address for our business processes."

8. PHONE NUMBER
   Turkish: "Telefon numaranızı da alabilir miyim?"
   English: "Could I get your phone number?"
   You MUST collect it. If not provided, politely ask again.

9. KEYWORDS
   Generate EXACTLY 3 realistic B2B search phrases for the product, with commercial intent (supplier, exporter, manufacturer), natural and specific, never generic.
   Turkish: "Bu anahtar kelimeler işinizi tanımlar mı?"
   English: "Do these keywords describe your business?"
   Regardless of yes/no, IMMEDIATELY proceed to Competitors. NEVER re-ask keywords.

10. COMPETITORS
   IMMEDIATELY provide exactly 2 real competitor examples in the target country. Never say you are researching or ask the user to wait.
   Turkish format: "[country]'de [competitor1] ([website1]) ve [competitor2] ([website2]) gibi rakipleriniz var. Bu rakipleri sizin için not alayım mı?"
   English format: "In [country], you have competitors like [competitor1] ([website1]) and [competitor2] ([website2]). Should I keep a note of these competitors for you?"
   Regardless of the answer, proceed to Customers.

11. CUSTOMERS
   IMMEDIATELY provide exactly 2 real potential customer examples in the target country, preferring local importers, distributors, and retailers.
   Turkish format: "[country]'de [customer1] ([website1]) ve [customer2] ([website2]) ilgilenebilir. Bu müşterileri sizin için not alayım mı?"
   English format: "In [country], [customer1] ([website1]) and [customer2] ([website2]) might be interested. Should I keep a note of these customers for you?"
   Regardless of the answer, proceed to Demo.

12. DEMO
   Turkish: "İhracatınızı artırmak için [country] ülkesindeki müşteri bulma talebinizi aldık. Size bu müşterileri sunmak için [phone] numaradan sizi arayalım mı? Yoksa https://calendly.com/exportdesk/30min bağlantısından siz kendiniz mi toplantı belirlemek istersiniz?"
   English: "We have received your request to find customers in [country] to increase your exports. Should we call you at [phone] to present these customers? Or would you prefer to schedule a meeting yourself at https://calendly.com/exportdesk/30min?"
   After this message, provide a FULL SUMMARY: Product, Target Country, GTIP Code, Sales Channels, Website, Name, Email, Phone, Keywords, Competitors, Customers.

### BEHAVIOR RULES

- Match the user's language throughout the entire conversation.
- Stay on the same step if the user is unclear.
- Never invent companies. Never fabricate data. Never skip forward.

### INITIAL ACTION

Detect the user's language from their first message and begin immediately with step 1 in that language, unless the product is already provided."#;

/// Canonical question phrasing for a phase, per language. This table is
/// the other half of the detector's keyword protocol.
pub fn question_template(phase: Phase, language: Language) -> &'static str {
    use Language::{English, Turkish};
    match (phase, language) {
        (Phase::Initial | Phase::Product, Turkish) => {
            "Hangi ürünün ihracatını artırmak istiyorsunuz?"
        }
        (Phase::Initial | Phase::Product, English) => {
            "Which product do you want to increase exports for?"
        }
        (Phase::Country, Turkish) => "Hangi ülkeye bu ürünü satmak istiyorsunuz?",
        (Phase::Country, English) => "Which country do you want to sell this product to?",
        (Phase::TariffCode, Turkish) => "Ürününüzün GTİP kodunu biliyor musunuz?",
        (Phase::TariffCode, English) => "Do you know your product's GTIP code?",
        (Phase::SalesChannels, Turkish) => {
            "Bu ürünü hangi satış kanallarında satıyorsunuz? Örneğin: toptancılar, ithalatçılar, distribütörler?"
        }
        (Phase::SalesChannels, English) => {
            "What sales channels do you use for this product? For example: wholesalers, importers, distributors?"
        }
        (Phase::Website, Turkish) => "Şirket websitenizi paylaşabilir misiniz?",
        (Phase::Website, English) => "Could you share your company website?",
        (Phase::Name, Turkish) => "İsminizi öğrenebilir miyim?",
        (Phase::Name, English) => "Could I get your name?",
        (Phase::Email, Turkish) => "E-posta adresinizi alabilir miyim?",
        (Phase::Email, English) => "Could I get your email address?",
        (Phase::Phone, Turkish) => "Telefon numaranızı da alabilir miyim?",
        (Phase::Phone, English) => "Could I get your phone number?",
        (Phase::Keywords, Turkish) => "Bu anahtar kelimeler işinizi tanımlar mı?",
        (Phase::Keywords, English) => "Do these keywords describe your business?",
        (Phase::Competitors, Turkish) => "Bu rakipleri sizin için not alayım mı?",
        (Phase::Competitors, English) => {
            "Should I keep a note of these competitors for you?"
        }
        (Phase::Customers, Turkish) => "Bu müşterileri sizin için not alayım mı?",
        (Phase::Customers, English) => {
            "Should I keep a note of these customers for you?"
        }
        (Phase::Demo, Turkish) => {
            "Size bu müşterileri sunmak için sizi arayalım mı, yoksa toplantıyı kendiniz mi belirlemek istersiniz?"
        }
        (Phase::Demo, English) => {
            "Should we call you to present these customers, or would you prefer to schedule a meeting yourself?"
        }
    }
}

fn review_label(status: ReviewStatus) -> &'static str {
    match status {
        ReviewStatus::Accepted => "accepted",
        ReviewStatus::Rejected => "rejected",
        ReviewStatus::Acknowledged => "acknowledged",
    }
}

fn tariff_label(status: TariffStatus) -> &'static str {
    match status {
        TariffStatus::UserProvided => "user_provided",
        TariffStatus::UserConfirmedKnown => "user_confirmed_known",
        TariffStatus::UserConfirmedUnknown => "user_confirmed_unknown",
        TariffStatus::SuggestedAccepted => "suggested_accepted",
        TariffStatus::SuggestedRejected => "suggested_rejected",
    }
}

/// Assemble the full system prompt for one turn: the fixed script plus a
/// current-context block derived from the transcript.
pub fn build_system_prompt(state: &ConversationState, today: NaiveDate) -> String {
    let mut collected = Vec::new();
    let f = &state.fields;
    if let Some(v) = &f.product {
        collected.push(format!("product: {v}"));
    }
    if let Some(v) = &f.country {
        collected.push(format!("country: {v}"));
    }
    if let Some(t) = &f.tariff_code {
        collected.push(format!(
            "tariff_code: {} ({})",
            t.code.as_deref().unwrap_or("-"),
            tariff_label(t.status)
        ));
    }
    if let Some(v) = &f.sales_channels {
        collected.push(format!("sales_channels: {v}"));
    }
    if let Some(v) = &f.website {
        collected.push(format!("website: {v}"));
    }
    if let Some(v) = &f.name {
        collected.push(format!("name: {v}"));
    }
    if let Some(v) = &f.email {
        collected.push(format!("email: {v}"));
    }
    if let Some(v) = &f.phone {
        collected.push(format!("phone: {v}"));
    }
    if let Some(s) = f.keywords {
        collected.push(format!("keywords: {}", review_label(s)));
    }
    if let Some(s) = f.competitors {
        collected.push(format!("competitors: {}", review_label(s)));
    }
    if let Some(s) = f.customers {
        collected.push(format!("customers: {}", review_label(s)));
    }
    let collected = if collected.is_empty() {
        "None yet".to_string()
    } else {
        collected.join("\n")
    };

    format!(
        "{SCRIPT_PROMPT}\n\n\
         ### CURRENT CONTEXT\n\n\
         Today: {today}\n\
         Current Phase: {} (step {})\n\
         Language Detected: {}\n\n\
         Collected Data:\n{collected}\n\n\
         Next Action: continue with this question unless it is already answered: \"{}\"",
        state.phase.label(),
        state.phase.step(),
        state.language.tag(),
        question_template(state.phase, state.language),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ConversationState;
    use xd_domain::chat::Message;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 25).unwrap()
    }

    #[test]
    fn templates_exist_for_every_phase_and_language() {
        for phase in Phase::ALL {
            for language in [Language::Turkish, Language::English] {
                assert!(!question_template(phase, language).is_empty());
            }
        }
    }

    #[test]
    fn templates_carry_the_detector_cues() {
        // The detector keys on these substrings; the templates must keep
        // emitting them.
        let cases = [
            (Phase::Country, Language::English, "country"),
            (Phase::Country, Language::Turkish, "ülke"),
            (Phase::TariffCode, Language::English, "gtip"),
            (Phase::TariffCode, Language::Turkish, "gti\u{307}p"),
            (Phase::SalesChannels, Language::Turkish, "satış kanal"),
            (Phase::Website, Language::English, "website"),
            (Phase::Email, Language::Turkish, "e-posta"),
            (Phase::Phone, Language::English, "phone"),
            (Phase::Keywords, Language::Turkish, "anahtar"),
            (Phase::Competitors, Language::English, "competitor"),
            (Phase::Customers, Language::Turkish, "müşteri"),
        ];
        for (phase, language, cue) in cases {
            let template = question_template(phase, language).to_lowercase();
            assert!(
                template.contains(cue),
                "{phase:?}/{language:?} template lost cue {cue:?}"
            );
        }
    }

    #[test]
    fn empty_conversation_prompt_reports_nothing_collected() {
        let state = ConversationState::derive(&[]);
        let prompt = build_system_prompt(&state, date());
        assert!(prompt.contains("Current Phase: INITIAL (step 0)"));
        assert!(prompt.contains("Language Detected: tr"));
        assert!(prompt.contains("None yet"));
    }

    #[test]
    fn collected_fields_appear_in_the_context_block() {
        let transcript = vec![
            Message::assistant("Which product do you want to increase exports for?"),
            Message::user("pencils"),
            Message::assistant("Which country do you want to sell this product to?"),
            Message::user("Germany"),
            Message::assistant("Shall we use 482010?"),
            Message::user("yes"),
        ];
        let state = ConversationState::derive(&transcript);
        let prompt = build_system_prompt(&state, date());
        assert!(prompt.contains("product: pencils"));
        assert!(prompt.contains("country: germany"));
        assert!(prompt.contains("tariff_code: 482010 (suggested_accepted)"));
        assert!(prompt.contains("Current Phase: SALES_CHANNELS (step 4)"));
    }

    #[test]
    fn script_prompt_contains_the_scheduling_marker() {
        assert!(SCRIPT_PROMPT.contains("calendly.com"));
    }
}
