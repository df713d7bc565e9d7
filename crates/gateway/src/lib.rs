//! HTTP gateway for the exportdesk intake chatbot.
//!
//! One stateful-looking but stateless endpoint: the browser POSTs the
//! full transcript, gets back an SSE stream of state + token deltas, and
//! the server forgets everything as soon as the response ends.

pub mod api;
pub mod cli;
pub mod leads;
pub mod state;
