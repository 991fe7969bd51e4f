//! Response callback hook.

use std::time::Duration;

use super::types::{
    ChatCompletionRequest, ChatCompletionResponse, CompletionRequest, CompletionResponse,
};
use crate::context::RequestContext;
use crate::error::Result;

/// Callback invoked once per forwarded call, after the call is logged.
///
/// Runs on the request task, so implementations should return quickly and
/// hand slow work off to a spawned task.
pub trait ResponseHook: Send + Sync {
    fn on_chat_completion(
        &self,
        _ctx: &RequestContext,
        _request: &ChatCompletionRequest,
        _result: &Result<ChatCompletionResponse>,
        _elapsed: Duration,
    ) {
    }

    fn on_completion(
        &self,
        _ctx: &RequestContext,
        _request: &CompletionRequest,
        _result: &Result<CompletionResponse>,
        _elapsed: Duration,
    ) {
    }
}
