use std::sync::Arc;

use xd_domain::config::Config;
use xd_providers::LlmProvider;

use crate::leads::LeadStore;

/// Shared application state passed to all API handlers.
///
/// Deliberately small: the gateway holds no per-conversation state, only
/// the config and the two outbound clients.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub llm: Arc<dyn LlmProvider>,
    /// `None` when no lead endpoint is configured; the chat still works,
    /// completed leads are just not recorded.
    pub leads: Option<Arc<LeadStore>>,
}
