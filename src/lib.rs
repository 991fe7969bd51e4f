//! openai-proxy - pass-through proxy for OpenAI-compatible completion APIs
//!
//! Forwards chat and text completion requests to an upstream API, logging
//! request, response, token usage and latency for every call.

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod proxy;

pub use client::UpstreamClient;
pub use config::Config;
pub use context::RequestContext;
pub use error::{Error, Result};
pub use proxy::Proxy;
