//! One-time lead persistence to the hosted record store.
//!
//! The write fires when the assistant's reply first contains the
//! scheduling marker (see `xd_intake::state::should_persist`). A failed
//! write is logged and swallowed, never surfaced to the visitor, but it
//! does get a small bounded retry: losing a completed lead is the
//! costliest failure in the whole system.

use chrono::{DateTime, Utc};
use serde::Serialize;

use xd_domain::config::LeadsConfig;
use xd_domain::error::{Error, Result};
use xd_domain::chat::Message;
use xd_intake::{ConversationState, ReviewStatus};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Record shape
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Wire shape written to the record store, one row per completed lead.
#[derive(Debug, Serialize)]
pub struct LeadRecord {
    pub transcript: Vec<Message>,
    pub language: String,
    pub timestamp: DateTime<Utc>,
    pub structured_data: StructuredData,
}

#[derive(Debug, Serialize)]
pub struct StructuredData {
    pub product: Option<String>,
    pub country: Option<String>,
    pub tariff_code: Option<String>,
    pub sales_channels: Option<String>,
    pub website: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub keywords: Option<String>,
    pub competitors: Option<String>,
    pub customers: Option<String>,
}

fn review_str(status: Option<ReviewStatus>) -> Option<String> {
    status.map(|s| {
        match s {
            ReviewStatus::Accepted => "accepted",
            ReviewStatus::Rejected => "rejected",
            ReviewStatus::Acknowledged => "acknowledged",
        }
        .to_string()
    })
}

impl LeadRecord {
    /// Snapshot the derived state into a record, timestamped now.
    pub fn from_state(
        state: &ConversationState,
        transcript: &[Message],
        timestamp: DateTime<Utc>,
    ) -> Self {
        let f = &state.fields;
        Self {
            transcript: transcript.to_vec(),
            language: state.language.tag().to_string(),
            timestamp,
            structured_data: StructuredData {
                product: f.product.clone(),
                country: f.country.clone(),
                tariff_code: f.tariff_code.as_ref().and_then(|t| t.code.clone()),
                sales_channels: f.sales_channels.clone(),
                website: f.website.clone(),
                name: f.name.clone(),
                email: f.email.clone(),
                phone: f.phone.clone(),
                keywords: review_str(f.keywords),
                competitors: review_str(f.competitors),
                customers: review_str(f.customers),
            },
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct LeadStore {
    endpoint: String,
    api_key: String,
    table: String,
    max_retries: u32,
    retry_backoff_ms: u64,
    client: reqwest::Client,
}

impl LeadStore {
    /// Build the store client, or `None` when persistence is disabled
    /// (empty endpoint, or the API key env var is unset — in which case
    /// the gateway still serves chat and only warns).
    pub fn from_config(cfg: &LeadsConfig) -> Result<Option<Self>> {
        if cfg.endpoint.is_empty() {
            tracing::info!("lead persistence disabled (no leads.endpoint configured)");
            return Ok(None);
        }

        let api_key = match std::env::var(&cfg.api_key_env) {
            Ok(k) => k,
            Err(_) => {
                tracing::warn!(
                    env = %cfg.api_key_env,
                    "leads.endpoint is set but the API key env var is missing; \
                     lead persistence disabled"
                );
                return Ok(None);
            }
        };

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| Error::LeadStore(e.to_string()))?;

        Ok(Some(Self {
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            api_key,
            table: cfg.table.clone(),
            max_retries: cfg.max_retries,
            retry_backoff_ms: cfg.retry_backoff_ms,
            client,
        }))
    }

    fn insert_url(&self) -> String {
        format!("{}/{}", self.endpoint, self.table)
    }

    /// Write one lead record, retrying transient failures with a linear
    /// backoff. Returns `Ok` only if some attempt got a 2xx back.
    pub async fn save(&self, record: &LeadRecord) -> Result<()> {
        let url = self.insert_url();
        let mut last_err = None;

        for attempt in 1..=self.max_retries {
            let result = self
                .client
                .post(&url)
                .header("apikey", &self.api_key)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .header("Prefer", "return=minimal")
                .json(record)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => {
                    tracing::info!(attempt, "lead record written");
                    return Ok(());
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    tracing::warn!(
                        attempt,
                        status = status.as_u16(),
                        body = %body,
                        "lead write rejected"
                    );
                    last_err = Some(Error::LeadStore(format!(
                        "HTTP {} - {}",
                        status.as_u16(),
                        body
                    )));
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "lead write failed");
                    last_err = Some(Error::LeadStore(e.to_string()));
                }
            }

            if attempt < self.max_retries {
                let backoff = self.retry_backoff_ms * u64::from(attempt);
                tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
            }
        }

        Err(last_err.unwrap_or_else(|| Error::LeadStore("no attempts made".into())))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use xd_domain::chat::Message;

    fn completed_transcript() -> Vec<Message> {
        vec![
            Message::assistant("Which product do you want to increase exports for?"),
            Message::user("pencils"),
            Message::assistant("Which country do you want to sell this product to?"),
            Message::user("Germany"),
            Message::assistant("Shall we use 482010?"),
            Message::user("yes"),
            Message::assistant("Do these keywords describe your business?"),
            Message::user("no, change them"),
        ]
    }

    #[test]
    fn record_snapshot_carries_fields_and_statuses() {
        let transcript = completed_transcript();
        let state = ConversationState::derive(&transcript);
        let ts = Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).unwrap();
        let record = LeadRecord::from_state(&state, &transcript, ts);

        assert_eq!(record.language, "en");
        assert_eq!(record.structured_data.product.as_deref(), Some("pencils"));
        assert_eq!(record.structured_data.country.as_deref(), Some("germany"));
        assert_eq!(record.structured_data.tariff_code.as_deref(), Some("482010"));
        assert_eq!(record.structured_data.keywords.as_deref(), Some("rejected"));
        assert_eq!(record.transcript.len(), transcript.len());
    }

    #[test]
    fn record_serializes_with_snake_case_keys() {
        let transcript = completed_transcript();
        let state = ConversationState::derive(&transcript);
        let ts = Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).unwrap();
        let record = LeadRecord::from_state(&state, &transcript, ts);

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("structured_data").is_some());
        assert_eq!(json["structured_data"]["tariff_code"], "482010");
        assert_eq!(json["language"], "en");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn empty_endpoint_disables_the_store() {
        let cfg = LeadsConfig::default();
        assert!(LeadStore::from_config(&cfg).unwrap().is_none());
    }
}
