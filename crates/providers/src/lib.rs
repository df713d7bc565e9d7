//! Model-invocation adapter for the turn endpoint.
//!
//! One upstream today (any OpenAI-compatible chat completions API), behind
//! a trait so the gateway never touches wire formats directly.

pub mod openai;
pub mod traits;

pub(crate) mod util;

pub use openai::OpenAiProvider;
pub use traits::{ChatRequest, LlmProvider};
