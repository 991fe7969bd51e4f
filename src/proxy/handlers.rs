//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use tracing::Instrument;

use super::forward::Proxy;
use super::types::{
    ChatCompletionRequest, ChatCompletionResponse, CompletionRequest, CompletionResponse,
};
use crate::context::{BizTags, RequestContext};

/// Raw query pairs; a query string that cannot be decoded counts as empty.
type QueryPairs = Option<Query<Vec<(String, String)>>>;

fn request_context(query: QueryPairs) -> RequestContext {
    let pairs = query.map(|Query(pairs)| pairs).unwrap_or_default();
    RequestContext::from_tags(BizTags::from_pairs(pairs))
}

/// Handle POST /chat/completions
///
/// Forwarding errors are already logged by [`Proxy`]; the caller receives an
/// empty response object with status 200.
pub async fn chat_completions(
    State(proxy): State<Arc<Proxy>>,
    query: QueryPairs,
    Json(request): Json<ChatCompletionRequest>,
) -> Json<ChatCompletionResponse> {
    let ctx = request_context(query);
    let span = ctx.span();

    async move {
        match proxy.create_chat_completion(&ctx, request).await {
            Ok(response) => Json(response),
            Err(_) => Json(ChatCompletionResponse::default()),
        }
    }
    .instrument(span)
    .await
}

/// Handle POST /completions
pub async fn completions(
    State(proxy): State<Arc<Proxy>>,
    query: QueryPairs,
    Json(request): Json<CompletionRequest>,
) -> Json<CompletionResponse> {
    let ctx = request_context(query);
    let span = ctx.span();

    async move {
        match proxy.create_completion(&ctx, request).await {
            Ok(response) => Json(response),
            Err(_) => Json(CompletionResponse::default()),
        }
    }
    .instrument(span)
    .await
}

/// Handle GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "openai-proxy"
    }))
}
