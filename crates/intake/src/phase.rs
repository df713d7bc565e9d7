//! The fixed 12-step intake script, plus the pre-script INITIAL state.

use serde::{Deserialize, Serialize};

/// One step of the intake script, in script order.
///
/// `Ord` follows script position, which is what makes the monotonic clamp
/// in [`crate::detect`] a plain `max`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No user message yet.
    Initial,
    /// Asking which product to export.
    Product,
    /// Asking for the target country.
    Country,
    /// Asking for (or suggesting) the customs tariff code.
    TariffCode,
    /// Asking which sales channels are used.
    SalesChannels,
    /// Asking for the company website.
    Website,
    /// Asking for the contact's name.
    Name,
    /// Asking for a corporate email address.
    Email,
    /// Asking for a phone number.
    Phone,
    /// Presenting generated search keywords for confirmation.
    Keywords,
    /// Presenting competitor examples.
    Competitors,
    /// Presenting potential-customer examples.
    Customers,
    /// Offering the demo call / scheduling link.
    Demo,
}

impl Phase {
    /// All phases in script order.
    pub const ALL: [Phase; 13] = [
        Phase::Initial,
        Phase::Product,
        Phase::Country,
        Phase::TariffCode,
        Phase::SalesChannels,
        Phase::Website,
        Phase::Name,
        Phase::Email,
        Phase::Phone,
        Phase::Keywords,
        Phase::Competitors,
        Phase::Customers,
        Phase::Demo,
    ];

    /// Fixed progress percentage shown by the UI progress bar.
    ///
    /// The jumps at the end (60 → 80 → 90 → 100) weight the value-delivery
    /// steps more heavily; the table is a product decision and must not be
    /// recomputed.
    pub fn progress(self) -> u8 {
        match self {
            Phase::Initial => 0,
            Phase::Product => 5,
            Phase::Country => 10,
            Phase::TariffCode => 20,
            Phase::SalesChannels => 25,
            Phase::Website => 40,
            Phase::Name => 45,
            Phase::Email => 50,
            Phase::Phone => 55,
            Phase::Keywords => 60,
            Phase::Competitors => 80,
            Phase::Customers => 90,
            Phase::Demo => 100,
        }
    }

    /// Zero-based step index, for log records.
    pub fn step(self) -> u8 {
        match self {
            Phase::Initial => 0,
            Phase::Product => 1,
            Phase::Country => 2,
            Phase::TariffCode => 3,
            Phase::SalesChannels => 4,
            Phase::Website => 5,
            Phase::Name => 6,
            Phase::Email => 7,
            Phase::Phone => 8,
            Phase::Keywords => 9,
            Phase::Competitors => 10,
            Phase::Customers => 11,
            Phase::Demo => 12,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Initial => "INITIAL",
            Phase::Product => "PRODUCT",
            Phase::Country => "COUNTRY",
            Phase::TariffCode => "TARIFF_CODE",
            Phase::SalesChannels => "SALES_CHANNELS",
            Phase::Website => "WEBSITE",
            Phase::Name => "NAME",
            Phase::Email => "EMAIL",
            Phase::Phone => "PHONE",
            Phase::Keywords => "KEYWORDS",
            Phase::Competitors => "COMPETITORS",
            Phase::Customers => "CUSTOMERS",
            Phase::Demo => "DEMO",
        }
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Initial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_script_position() {
        for pair in Phase::ALL.windows(2) {
            assert!(pair[0] < pair[1], "{:?} should sort before {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn progress_is_monotonic_over_the_script() {
        for pair in Phase::ALL.windows(2) {
            assert!(pair[0].progress() < pair[1].progress());
        }
    }

    #[test]
    fn progress_table_matches_product_spec() {
        let expected: [(Phase, u8); 13] = [
            (Phase::Initial, 0),
            (Phase::Product, 5),
            (Phase::Country, 10),
            (Phase::TariffCode, 20),
            (Phase::SalesChannels, 25),
            (Phase::Website, 40),
            (Phase::Name, 45),
            (Phase::Email, 50),
            (Phase::Phone, 55),
            (Phase::Keywords, 60),
            (Phase::Competitors, 80),
            (Phase::Customers, 90),
            (Phase::Demo, 100),
        ];
        for (phase, pct) in expected {
            assert_eq!(phase.progress(), pct, "{:?}", phase);
        }
    }

    #[test]
    fn serializes_to_snake_case() {
        let json = serde_json::to_string(&Phase::SalesChannels).unwrap();
        assert_eq!(json, "\"sales_channels\"");
        let back: Phase = serde_json::from_str("\"tariff_code\"").unwrap();
        assert_eq!(back, Phase::TariffCode);
    }
}
