//! Request forwarding with timing and logging.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use super::hook::ResponseHook;
use super::types::{
    ChatCompletionRequest, ChatCompletionResponse, CompletionRequest, CompletionResponse, Message,
    Usage,
};
use crate::client::UpstreamClient;
use crate::context::RequestContext;
use crate::error::{Error, Result};

/// Forwards requests to the upstream API, logging each call exactly once.
#[derive(Clone)]
pub struct Proxy {
    client: UpstreamClient,
    hook: Option<Arc<dyn ResponseHook>>,
    log_payloads: bool,
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("client", &self.client)
            .field("hook", &self.hook.is_some())
            .field("log_payloads", &self.log_payloads)
            .finish()
    }
}

impl Proxy {
    pub fn new(client: UpstreamClient) -> Self {
        Self {
            client,
            hook: None,
            log_payloads: true,
        }
    }

    /// Install a callback invoked after every forwarded call.
    pub fn with_hook(mut self, hook: Arc<dyn ResponseHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Whether log lines include the request and response bodies.
    pub fn log_payloads(mut self, enabled: bool) -> Self {
        self.log_payloads = enabled;
        self
    }

    /// Forward a chat completion request and return the upstream response unchanged.
    pub async fn create_chat_completion(
        &self,
        ctx: &RequestContext,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        let start = Instant::now();
        let result = self.client.create_chat_completion(&request).await;
        let elapsed = start.elapsed();

        let usage = result.as_ref().ok().and_then(|r| r.usage());
        self.log_call(
            ctx,
            "create chat completion",
            &request,
            &result,
            usage,
            elapsed.as_millis(),
        );

        if let Some(hook) = &self.hook {
            hook.on_chat_completion(ctx, &request, &result, elapsed);
        }

        result
    }

    /// Forward a text completion request and return the upstream response unchanged.
    pub async fn create_completion(
        &self,
        ctx: &RequestContext,
        request: CompletionRequest,
    ) -> Result<CompletionResponse> {
        let start = Instant::now();
        let result = self.client.create_completion(&request).await;
        let elapsed = start.elapsed();

        let usage = result.as_ref().ok().and_then(|r| r.usage());
        self.log_call(
            ctx,
            "create completion",
            &request,
            &result,
            usage,
            elapsed.as_millis(),
        );

        if let Some(hook) = &self.hook {
            hook.on_completion(ctx, &request, &result, elapsed);
        }

        result
    }

    /// Forward a chat completion request and return the first choice's text.
    ///
    /// An upstream success with no choices, or with zero prompt tokens
    /// (a missing usage object counts as zero), is reported as
    /// [`Error::System`] instead of indexing into an empty response.
    pub async fn simple_chat_completion(
        &self,
        ctx: &RequestContext,
        request: ChatCompletionRequest,
    ) -> Result<String> {
        let response = self.create_chat_completion(ctx, request).await?;

        let choice = response
            .choices()
            .first()
            .ok_or_else(|| Error::System("upstream returned no choices".to_string()))?;

        let prompt_tokens = response.usage().map_or(0, Usage::prompt_tokens);
        if prompt_tokens == 0 {
            return Err(Error::System("upstream reported zero prompt tokens".to_string()));
        }

        Ok(choice.message().map(Message::text).unwrap_or_default())
    }

    fn log_call<Req, Resp>(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        request: &Req,
        result: &Result<Resp>,
        usage: Option<&Usage>,
        cost_ms: u128,
    ) where
        Req: fmt::Debug,
        Resp: fmt::Debug,
    {
        let cost_ms = cost_ms as u64;
        let request = Payload(request, self.log_payloads);

        match result {
            Ok(response) => tracing::info!(
                operation,
                request_id = %ctx.request_id(),
                biz_id = ctx.biz_id(),
                biz_type = ctx.biz_type(),
                prompt_tokens = usage.map_or(0, Usage::prompt_tokens),
                completion_tokens = usage.map_or(0, Usage::completion_tokens),
                total_tokens = usage.map_or(0, Usage::total_tokens),
                cost_ms,
                request = %request,
                response = %Payload(response, self.log_payloads),
                "Forwarded request"
            ),
            Err(e) => tracing::warn!(
                operation,
                request_id = %ctx.request_id(),
                biz_id = ctx.biz_id(),
                biz_type = ctx.biz_type(),
                status = ?e.status(),
                cost_ms,
                request = %request,
                error = %e,
                "Forwarded request failed"
            ),
        }
    }
}

/// Debug rendering of a payload, or a placeholder when payload logging is off.
struct Payload<'a, T>(&'a T, bool);

impl<T: fmt::Debug> fmt::Display for Payload<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.1 {
            write!(f, "{:?}", self.0)
        } else {
            f.write_str("<omitted>")
        }
    }
}
