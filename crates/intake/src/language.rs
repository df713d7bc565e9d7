//! Two-way language classification from user-authored text.
//!
//! The site serves the Turkish export market first, so every ambiguity
//! resolves toward Turkish: empty input, a scoring tie, anything. No
//! confidence threshold — whichever side scores higher wins, even by one.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Turkish,
    English,
}

impl Language {
    pub fn tag(self) -> &'static str {
        match self {
            Language::Turkish => "tr",
            Language::English => "en",
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::Turkish
    }
}

/// Common Turkish function/domain words seen in intake conversations.
const TURKISH_WORDS: &[&str] = &[
    "merhaba", "selam", "evet", "hayır", "tamam", "lütfen", "teşekkür",
    "ürün", "ihracat", "ülke", "satış", "müşteri", "şirket", "hangi",
    "istiyorum", "bilmiyorum", "değil", "numara", "adres",
];

/// Common English function/domain words seen in intake conversations.
const ENGLISH_WORDS: &[&str] = &[
    "hello", "hi", "yes", "no", "okay", "please", "thanks", "thank",
    "product", "export", "country", "sales", "customer", "company",
    "which", "want", "know", "the", "and", "number", "address",
];

/// Characters that exist in Turkish orthography but not in English.
const TURKISH_DIACRITICS: &[char] = &[
    'ç', 'ğ', 'ı', 'ö', 'ş', 'ü', 'Ç', 'Ğ', 'İ', 'Ö', 'Ş', 'Ü',
];

/// Weight of a single diacritic occurrence (a stronger signal than a
/// shared-vocabulary word hit, which scores 1).
const DIACRITIC_WEIGHT: u32 = 2;

/// Classify the dominant language of the given user text.
///
/// Word-list hits score 1 per occurrence for their side; each Turkish
/// diacritic character scores [`DIACRITIC_WEIGHT`] for Turkish. Stable:
/// identical input always yields identical output.
pub fn detect_language(user_text: &str) -> Language {
    if user_text.trim().is_empty() {
        return Language::Turkish;
    }

    let lower = user_text.to_lowercase();
    let mut turkish: u32 = 0;
    let mut english: u32 = 0;

    for word in lower.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        if TURKISH_WORDS.contains(&word) {
            turkish += 1;
        }
        if ENGLISH_WORDS.contains(&word) {
            english += 1;
        }
    }

    let diacritics = user_text
        .chars()
        .filter(|c| TURKISH_DIACRITICS.contains(c))
        .count() as u32;
    turkish += diacritics * DIACRITIC_WEIGHT;

    if english > turkish {
        Language::English
    } else {
        Language::Turkish
    }
}
