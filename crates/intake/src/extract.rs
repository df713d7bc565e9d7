//! Field extraction from the transcript.
//!
//! Answers are attributed to questions by position: a (question, answer)
//! pair is an assistant message immediately followed by a user message.
//! Keyword attribution would misfire when the visitor echoes a question's
//! wording, so pairing is strictly adjacency-based.
//!
//! Extractors are total: any malformed or unexpected input degrades to
//! "absent", never to an error. Phase completion is permissive by design
//! (any non-empty answer to a question completes that step); data quality
//! is the model prompt's job, with one exception — the stored email value
//! must survive corporate-domain validation.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use xd_domain::chat::{user_messages, Message, Role};

use crate::phase::Phase;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Collected field types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How the tariff code was obtained. The downstream summary text differs
/// per state, so provenance is part of the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TariffStatus {
    /// The visitor typed a code before being asked whether they know one.
    UserProvided,
    /// The visitor affirmed knowing the code but has not given digits yet.
    UserConfirmedKnown,
    /// The visitor denied knowing a code.
    UserConfirmedUnknown,
    /// The assistant suggested a code and the visitor accepted it.
    SuggestedAccepted,
    /// The assistant suggested a code and the visitor rejected it.
    SuggestedRejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TariffCode {
    pub code: Option<String>,
    pub status: TariffStatus,
}

/// Outcome of a confirm-style question (keywords, competitors, customers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Accepted,
    Rejected,
    /// Replied with something that is neither clearly positive nor
    /// negative; the phase still counts as complete.
    Acknowledged,
}

/// Best-effort reconstruction of everything collected so far.
///
/// Absence is the only representation of "not yet known" — no field is
/// ever an empty string standing in for missing data.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectedFields {
    pub product: Option<String>,
    pub country: Option<String>,
    pub tariff_code: Option<TariffCode>,
    pub sales_channels: Option<String>,
    pub website: Option<String>,
    pub name: Option<String>,
    /// Only set when the answer passed corporate-email validation.
    pub email: Option<String>,
    pub phone: Option<String>,
    pub keywords: Option<ReviewStatus>,
    pub competitors: Option<ReviewStatus>,
    pub customers: Option<ReviewStatus>,
    /// The email question received *some* answer, valid or not. Phase
    /// completion is permissive even when the stored value is absent.
    #[serde(skip)]
    pub email_answered: bool,
}

impl CollectedFields {
    /// The first script step whose field is still missing, in script
    /// order. This is the tertiary detection strategy and the floor for
    /// the monotonic clamp: it always yields a phase.
    pub fn first_missing(&self) -> Phase {
        if self.product.is_none() {
            Phase::Product
        } else if self.country.is_none() {
            Phase::Country
        } else if self.tariff_code.is_none() {
            Phase::TariffCode
        } else if self.sales_channels.is_none() {
            Phase::SalesChannels
        } else if self.website.is_none() {
            Phase::Website
        } else if self.name.is_none() {
            Phase::Name
        } else if !self.email_answered {
            Phase::Email
        } else if self.phone.is_none() {
            Phase::Phone
        } else if self.keywords.is_none() {
            Phase::Keywords
        } else if self.competitors.is_none() {
            Phase::Competitors
        } else if self.customers.is_none() {
            Phase::Customers
        } else {
            Phase::Demo
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sentiment word lists (bilingual, shared protocol with the prompts)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const YES_WORDS: &[&str] = &[
    "yes", "evet", "ok", "okay", "use", "can", "sure", "yep", "yeah", "good",
];

const NO_WORDS: &[&str] = &["no", "hayır", "don't", "not"];

const KEYWORD_POSITIVE: &[&str] = &[
    "yes", "evet", "good", "iyi", "ok", "okay", "describes", "tanımlar",
    "perfect", "suitable", "uygun", "right", "correct", "doğru", "tamam",
    "yep", "yeah",
];

const KEYWORD_NEGATIVE: &[&str] = &[
    "no", "hayır", "not good", "iyi değil", "wrong", "yanlış", "change",
    "değiştir", "different", "farklı", "uygun değil",
];

const NOTE_ACCEPT: &[&str] = &[
    "yes", "evet", "ok", "okay", "keep", "note", "save", "kaydet", "use",
    "can", "good", "sure",
];

const NOTE_REJECT: &[&str] = &["no", "hayır", "don't", "not", "skip"];

/// Vague or non-answer replies to the country question.
const COUNTRY_DENYLIST: &[&str] = &[
    "don't know", "not sure", "bilmiyorum", "her yere", "tüm ülkeler",
    "everywhere", "all countries",
];

const GREETINGS: &[&str] = &["hello", "hi", "hey", "merhaba", "selam"];

const CONSUMER_EMAIL_DOMAINS: &[&str] =
    &["gmail.com", "hotmail.com", "yahoo.com", "outlook.com"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn tariff_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{4,8}\b").expect("tariff code regex"))
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Question/answer pairing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct Pair {
    /// Lower-cased assistant question.
    question: String,
    /// Trimmed user answer, original casing.
    answer: String,
}

/// Adjacent assistant→user pairs with non-empty text on both sides.
fn conversation_pairs(transcript: &[Message]) -> Vec<Pair> {
    let mut pairs = Vec::new();
    for window in transcript.windows(2) {
        let (q, a) = (&window[0], &window[1]);
        if q.role != Role::Assistant || a.role != Role::User {
            continue;
        }
        let question = q.text().to_lowercase();
        let answer = a.text().trim().to_string();
        if question.is_empty() || answer.is_empty() {
            continue;
        }
        pairs.push(Pair { question, answer });
    }
    pairs
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Extraction
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Reconstruct all collected fields from the transcript.
pub fn extract_fields(transcript: &[Message]) -> CollectedFields {
    let mut fields = CollectedFields::default();
    let users = user_messages(transcript);

    fields.product = extract_product(&users);
    fields.country = extract_country(&users);

    for pair in conversation_pairs(transcript) {
        let q = pair.question.as_str();
        let answer = pair.answer.as_str();
        let lower = answer.to_lowercase();

        // A "do you know" exchange that ended without digits is not final:
        // the script follows up with a suggestion, and that later pair
        // must be allowed to resolve the code.
        let tariff_unresolved = fields
            .tariff_code
            .as_ref()
            .map_or(true, |t| t.code.is_none());
        if tariff_unresolved && is_tariff_question(q) {
            if let Some(tariff) = extract_tariff(q, &lower) {
                fields.tariff_code = Some(tariff);
            }
        }

        if fields.sales_channels.is_none()
            && contains_any(q, &["sales channel", "satış kanal"])
        {
            fields.sales_channels = Some(answer.to_string());
        }

        if fields.website.is_none() && contains_any(q, &["website", "websiten"]) {
            fields.website = Some(answer.to_string());
        }

        // Ordering note: the email question contains "mail" but not
        // "name"; the name question contains neither "website" nor
        // "email". The per-field `is_none` guards plus transcript order
        // keep attribution correct.
        if fields.name.is_none() && contains_any(q, &["name", "isim"]) {
            fields.name = Some(answer.to_string());
        }

        if !fields.email_answered && contains_any(q, &["email", "e-posta"]) {
            fields.email_answered = true;
            fields.email = corporate_email(answer);
        }

        if fields.phone.is_none() && contains_any(q, &["phone", "telefon"]) {
            fields.phone = Some(answer.to_string());
        }

        if fields.keywords.is_none() && contains_any(q, &["keyword", "anahtar"]) {
            fields.keywords = Some(classify_review(
                &lower,
                KEYWORD_POSITIVE,
                KEYWORD_NEGATIVE,
                ReviewStatus::Acknowledged,
            ));
        }

        if fields.competitors.is_none()
            && contains_any(q, &["competitor", "rakip", "keep a note", "not alayım"])
        {
            fields.competitors = Some(classify_review(
                &lower,
                NOTE_ACCEPT,
                NOTE_REJECT,
                ReviewStatus::Accepted,
            ));
        }

        if fields.customers.is_none() && contains_any(q, &["customer", "müşteri"]) {
            fields.customers = Some(classify_review(
                &lower,
                NOTE_ACCEPT,
                NOTE_REJECT,
                ReviewStatus::Accepted,
            ));
        }
    }

    fields
}

/// The script opens by asking for the product, so the first substantive
/// user message is the product. Pure greetings don't count.
fn extract_product(users: &[String]) -> Option<String> {
    for text in users {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        let lower = trimmed.to_lowercase();
        if GREETINGS.contains(&lower.as_str()) {
            continue;
        }
        return Some(trimmed.to_string());
    }
    None
}

/// The script asks for the country second, so the second user message is
/// the candidate. Length bounds and the vague-answer denylist filter out
/// non-answers; no geocoding, the trimmed lower-cased text is kept as-is.
fn extract_country(users: &[String]) -> Option<String> {
    let candidate = users.get(1)?.trim().to_lowercase();
    if candidate.chars().count() < 2 || candidate.chars().count() > 50 {
        return None;
    }
    if contains_any(&candidate, COUNTRY_DENYLIST) {
        return None;
    }
    // Bare confirmations are never a country ("no" must not match Norway,
    // so this is equality, not substring).
    if matches!(candidate.as_str(), "no" | "yes" | "hayır" | "evet") {
        return None;
    }
    Some(candidate)
}

fn is_tariff_question(q: &str) -> bool {
    // "gti\u{307}p" is the lower-casing of "GTİP" (dotted capital I
    // decomposes to i + combining dot above).
    contains_any(
        q,
        &[
            "gtip",
            "gti\u{307}p",
            "hs code",
            "tariff",
            "shall we use",
            "kullanalım mı",
            "biliyor musunuz",
        ],
    )
}

/// Classify the tariff exchange by which side of the question boundary the
/// digits appear on.
fn extract_tariff(question: &str, answer_lower: &str) -> Option<TariffCode> {
    // "Do you know your tariff code?" — the visitor either volunteers
    // digits, claims to know them, or doesn't know.
    if contains_any(question, &["do you know", "biliyor musunuz"]) {
        if let Some(m) = tariff_code_re().find(answer_lower) {
            return Some(TariffCode {
                code: Some(m.as_str().to_string()),
                status: TariffStatus::UserProvided,
            });
        }
        if contains_any(answer_lower, &["yes", "evet", "know", "biliyorum"]) {
            return Some(TariffCode {
                code: None,
                status: TariffStatus::UserConfirmedKnown,
            });
        }
        return Some(TariffCode {
            code: None,
            status: TariffStatus::UserConfirmedUnknown,
        });
    }

    // "Shall we use <code>?" — the suggested digits live in the question.
    if contains_any(
        question,
        &["shall we use", "kullanalım mı", "use this gtip", "use gtip"],
    ) {
        let suggested = tariff_code_re()
            .find(question)
            .map(|m| m.as_str().to_string());

        if contains_any(answer_lower, YES_WORDS) {
            return Some(TariffCode {
                code: suggested,
                status: TariffStatus::SuggestedAccepted,
            });
        }
        if contains_any(answer_lower, NO_WORDS) {
            return Some(TariffCode {
                code: None,
                status: TariffStatus::SuggestedRejected,
            });
        }
        // Ambiguous reply: default-accept, same rule as the note-taking
        // questions.
        return Some(TariffCode {
            code: suggested,
            status: TariffStatus::SuggestedAccepted,
        });
    }

    None
}

/// Positive words win over negative ones; anything else gets the
/// per-question default.
fn classify_review(
    answer_lower: &str,
    positive: &[&str],
    negative: &[&str],
    default: ReviewStatus,
) -> ReviewStatus {
    if contains_any(answer_lower, positive) {
        ReviewStatus::Accepted
    } else if contains_any(answer_lower, negative) {
        ReviewStatus::Rejected
    } else {
        default
    }
}

/// Validate an email answer: syntactically an address, and not on a
/// consumer domain. Returns the trimmed address.
fn corporate_email(answer: &str) -> Option<String> {
    let candidate = answer.trim();
    if !email_re().is_match(candidate) {
        return None;
    }
    let domain = candidate.rsplit('@').next()?.to_lowercase();
    if CONSUMER_EMAIL_DOMAINS.contains(&domain.as_str()) {
        return None;
    }
    Some(candidate.to_string())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use xd_domain::chat::Message;

    fn opening(product: &str, country: &str) -> Vec<Message> {
        vec![
            Message::assistant("Which product do you want to increase exports for?"),
            Message::user(product),
            Message::assistant("Which country do you want to sell this product to?"),
            Message::user(country),
        ]
    }

    #[test]
    fn product_is_first_substantive_user_message() {
        let fields = extract_fields(&opening("pencils", "germany"));
        assert_eq!(fields.product.as_deref(), Some("pencils"));
    }

    #[test]
    fn greeting_alone_is_not_a_product() {
        let transcript = vec![
            Message::user("merhaba"),
            Message::assistant("Hangi ürünün ihracatını artırmak istiyorsunuz?"),
            Message::user("karpuz"),
        ];
        let fields = extract_fields(&transcript);
        assert_eq!(fields.product.as_deref(), Some("karpuz"));
    }

    #[test]
    fn country_comes_from_second_user_message_lowercased() {
        let fields = extract_fields(&opening("pencils", "Germany"));
        assert_eq!(fields.country.as_deref(), Some("germany"));
    }

    #[test]
    fn vague_country_answers_are_rejected() {
        for vague in ["everywhere", "all countries", "her yere", "I don't know", "no"] {
            let fields = extract_fields(&opening("pencils", vague));
            assert_eq!(fields.country, None, "{vague:?} should not be a country");
        }
    }

    #[test]
    fn overlong_country_answer_is_rejected() {
        let rambling = "well it depends on the season and on our production capacity";
        let fields = extract_fields(&opening("pencils", rambling));
        assert_eq!(fields.country, None);
    }

    #[test]
    fn tariff_suggestion_accepted_keeps_code() {
        let mut transcript = opening("pencils", "germany");
        transcript.push(Message::assistant("Shall we use 482010?"));
        transcript.push(Message::user("yes"));
        let fields = extract_fields(&transcript);
        assert_eq!(
            fields.tariff_code,
            Some(TariffCode {
                code: Some("482010".into()),
                status: TariffStatus::SuggestedAccepted,
            })
        );
    }

    #[test]
    fn tariff_suggestion_rejected_drops_code() {
        let mut transcript = opening("pencils", "germany");
        transcript.push(Message::assistant("Shall we use 482010?"));
        transcript.push(Message::user("no"));
        let fields = extract_fields(&transcript);
        assert_eq!(
            fields.tariff_code,
            Some(TariffCode {
                code: None,
                status: TariffStatus::SuggestedRejected,
            })
        );
    }

    #[test]
    fn tariff_volunteered_before_suggestion() {
        let mut transcript = opening("pencils", "germany");
        transcript.push(Message::assistant("Do you know your product's GTIP code?"));
        transcript.push(Message::user("482010"));
        let fields = extract_fields(&transcript);
        let tariff = fields.tariff_code.unwrap();
        assert_eq!(tariff.status, TariffStatus::UserProvided);
        assert_eq!(tariff.code.as_deref(), Some("482010"));
    }

    #[test]
    fn tariff_knowledge_without_digits() {
        let mut transcript = opening("pencils", "germany");
        transcript.push(Message::assistant("Do you know your product's GTIP code?"));
        transcript.push(Message::user("yes I know it"));
        let fields = extract_fields(&transcript);
        assert_eq!(
            fields.tariff_code.unwrap().status,
            TariffStatus::UserConfirmedKnown
        );
    }

    #[test]
    fn tariff_unknown() {
        let mut transcript = opening("pencils", "germany");
        transcript.push(Message::assistant("Do you know your product's GTIP code?"));
        transcript.push(Message::user("no idea"));
        let fields = extract_fields(&transcript);
        assert_eq!(
            fields.tariff_code.unwrap().status,
            TariffStatus::UserConfirmedUnknown
        );
    }

    #[test]
    fn any_nonempty_reply_completes_sales_channels() {
        let mut transcript = opening("pencils", "germany");
        transcript.push(Message::assistant(
            "What sales channels do you use for this product?",
        ));
        transcript.push(Message::user("mostly wholesalers"));
        let fields = extract_fields(&transcript);
        assert_eq!(fields.sales_channels.as_deref(), Some("mostly wholesalers"));
    }

    #[test]
    fn corporate_email_is_stored() {
        let transcript = vec![
            Message::assistant("Could I get your email address?"),
            Message::user("mehmet@acme-export.com"),
        ];
        let fields = extract_fields(&transcript);
        assert!(fields.email_answered);
        assert_eq!(fields.email.as_deref(), Some("mehmet@acme-export.com"));
    }

    #[test]
    fn consumer_email_completes_phase_but_stores_nothing() {
        let transcript = vec![
            Message::assistant("Could I get your email address?"),
            Message::user("mehmet@gmail.com"),
        ];
        let fields = extract_fields(&transcript);
        assert!(fields.email_answered);
        assert_eq!(fields.email, None);
    }

    #[test]
    fn keyword_rejection_still_counts_as_answered() {
        let transcript = vec![
            Message::assistant("Do these keywords describe your business?"),
            Message::user("no, change them"),
        ];
        let fields = extract_fields(&transcript);
        assert_eq!(fields.keywords, Some(ReviewStatus::Rejected));
    }

    #[test]
    fn keyword_neutral_reply_is_acknowledged() {
        let transcript = vec![
            Message::assistant("Do these keywords describe your business?"),
            Message::user("hmm interesting"),
        ];
        let fields = extract_fields(&transcript);
        assert_eq!(fields.keywords, Some(ReviewStatus::Acknowledged));
    }

    #[test]
    fn competitor_note_accept_and_reject() {
        let question = "In Germany, you have competitors like Faber (www.faber.de) \
                        and Staedtler (www.staedtler.de). Should I keep a note of \
                        these competitors for you?";
        for (reply, expected) in [
            ("yes please", ReviewStatus::Accepted),
            ("skip", ReviewStatus::Rejected),
            ("whatever", ReviewStatus::Accepted), // ambiguity defaults positive
        ] {
            let transcript = vec![Message::assistant(question), Message::user(reply)];
            let fields = extract_fields(&transcript);
            assert_eq!(fields.competitors, Some(expected), "reply {reply:?}");
        }
    }

    #[test]
    fn customer_question_fills_customers_not_only_competitors() {
        let transcript = vec![
            Message::assistant(
                "In Germany, you have competitors like Faber. Should I keep a note \
                 of these competitors for you?",
            ),
            Message::user("yes"),
            Message::assistant(
                "In Germany, Metro AG might be interested. Should I keep a note of \
                 these customers for you?",
            ),
            Message::user("no thanks"),
        ];
        let fields = extract_fields(&transcript);
        assert_eq!(fields.competitors, Some(ReviewStatus::Accepted));
        assert_eq!(fields.customers, Some(ReviewStatus::Rejected));
    }

    #[test]
    fn malformed_content_degrades_to_absent() {
        // A parts-array message with no textual parts pairs to nothing.
        let json = r#"[
            {"role":"assistant","content":[{"type":"image"}]},
            {"role":"user","content":"germany"}
        ]"#;
        let transcript: Vec<Message> = serde_json::from_str(json).unwrap();
        let fields = extract_fields(&transcript);
        assert_eq!(fields.sales_channels, None);
        assert_eq!(fields.tariff_code, None);
    }

    #[test]
    fn first_missing_walks_script_order() {
        let mut fields = CollectedFields::default();
        assert_eq!(fields.first_missing(), Phase::Product);
        fields.product = Some("pencils".into());
        assert_eq!(fields.first_missing(), Phase::Country);
        fields.country = Some("germany".into());
        assert_eq!(fields.first_missing(), Phase::TariffCode);
        fields.tariff_code = Some(TariffCode {
            code: Some("482010".into()),
            status: TariffStatus::SuggestedAccepted,
        });
        assert_eq!(fields.first_missing(), Phase::SalesChannels);
    }

    #[test]
    fn complete_fields_point_at_demo() {
        let fields = CollectedFields {
            product: Some("pencils".into()),
            country: Some("germany".into()),
            tariff_code: Some(TariffCode {
                code: Some("482010".into()),
                status: TariffStatus::SuggestedAccepted,
            }),
            sales_channels: Some("wholesalers".into()),
            website: Some("acme.com".into()),
            name: Some("Mehmet".into()),
            email: Some("m@acme.com".into()),
            phone: Some("+90 555 000 00 00".into()),
            keywords: Some(ReviewStatus::Accepted),
            competitors: Some(ReviewStatus::Accepted),
            customers: Some(ReviewStatus::Accepted),
            email_answered: true,
        };
        assert_eq!(fields.first_missing(), Phase::Demo);
    }
}
