//! HTTP proxy module.
//!
//! This module provides the forwarding functions and the OpenAI-compatible
//! HTTP routes that pass requests through to the upstream API.

mod forward;
mod handlers;
mod hook;
mod server;
pub mod types;

pub use forward::Proxy;
pub use hook::ResponseHook;
pub use server::{bind_router, create_router, run_server};
pub use types::{
    ChatCompletionRequest, ChatCompletionResponse, CompletionRequest, CompletionResponse, Message,
    Usage,
};
