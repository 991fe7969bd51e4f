//! OpenAI-compatible request and response types.
//!
//! Every type keeps the fields it does not model in an `extra` map, and
//! response fields are [`Nullable`], so a payload decoded and re-encoded by
//! the proxy carries the same content the upstream sent: absent keys stay
//! absent and explicit `null`s stay `null`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A field that distinguishes absent (`None`), explicit `null` (`Some(None)`)
/// and a value (`Some(Some(v))`).
pub type Nullable<T> = Option<Option<T>>;

/// Deserialize a present field, mapping `null` to `Some(None)`.
///
/// Paired with `#[serde(default)]`, which covers the absent case.
fn nullable<'de, D, T>(deserializer: D) -> Result<Nullable<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn value_of<T>(field: &Nullable<T>) -> Option<&T> {
    field.as_ref().and_then(Option::as_ref)
}

/// Chat completion request (OpenAI-compatible).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A chat message, in requests and in response choices.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Message {
    pub role: String,
    /// `null` for assistant messages that only carry tool calls.
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Nullable<MessageContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Message content: plain text or a list of typed content parts.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<Value>),
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Some(Some(MessageContent::Text(content.into()))),
            ..Default::default()
        }
    }

    /// Textual content of the message.
    ///
    /// For multi-part content, the `text` of every `{"type": "text"}` part is
    /// concatenated. Missing or `null` content yields an empty string.
    pub fn text(&self) -> String {
        match value_of(&self.content) {
            None => String::new(),
            Some(MessageContent::Text(text)) => text.clone(),
            Some(MessageContent::Parts(parts)) => parts
                .iter()
                .filter(|p| p.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect(),
        }
    }
}

/// Stop sequence can be a string or array of strings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StopSequence {
    Single(String),
    Multiple(Vec<String>),
}

/// Chat completion response (OpenAI-compatible).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChatCompletionResponse {
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub id: Nullable<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub object: Nullable<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub created: Nullable<u64>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub model: Nullable<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub choices: Nullable<Vec<ChatChoice>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub usage: Nullable<Usage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The empty response returned to HTTP callers when forwarding fails:
/// `{"id":"","object":"","created":0,"model":"","choices":[]}`.
impl Default for ChatCompletionResponse {
    fn default() -> Self {
        Self {
            id: Some(Some(String::new())),
            object: Some(Some(String::new())),
            created: Some(Some(0)),
            model: Some(Some(String::new())),
            choices: Some(Some(Vec::new())),
            usage: None,
            extra: Map::new(),
        }
    }
}

impl ChatCompletionResponse {
    /// Choices, empty when absent or `null`.
    pub fn choices(&self) -> &[ChatChoice] {
        value_of(&self.choices).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn usage(&self) -> Option<&Usage> {
        value_of(&self.usage)
    }
}

/// A chat completion choice.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ChatChoice {
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub index: Nullable<u32>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub message: Nullable<Message>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub finish_reason: Nullable<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatChoice {
    pub fn message(&self) -> Option<&Message> {
        value_of(&self.message)
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Usage {
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Nullable<u32>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Nullable<u32>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub total_tokens: Nullable<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Usage {
    pub fn prompt_tokens(&self) -> u32 {
        value_of(&self.prompt_tokens).copied().unwrap_or(0)
    }

    pub fn completion_tokens(&self) -> u32 {
        value_of(&self.completion_tokens).copied().unwrap_or(0)
    }

    pub fn total_tokens(&self) -> u32 {
        value_of(&self.total_tokens).copied().unwrap_or(0)
    }
}

/// Text completion request (OpenAI-compatible, legacy `/completions`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<Prompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub echo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Completion prompt: text, a batch of texts, or token arrays.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Prompt {
    Text(String),
    Batch(Vec<String>),
    Tokens(Vec<u32>),
    TokenBatch(Vec<Vec<u32>>),
}

/// Text completion response (OpenAI-compatible).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CompletionResponse {
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub id: Nullable<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub object: Nullable<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub created: Nullable<u64>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub model: Nullable<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub choices: Nullable<Vec<CompletionChoice>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub usage: Nullable<Usage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The empty response returned to HTTP callers when forwarding fails.
impl Default for CompletionResponse {
    fn default() -> Self {
        Self {
            id: Some(Some(String::new())),
            object: Some(Some(String::new())),
            created: Some(Some(0)),
            model: Some(Some(String::new())),
            choices: Some(Some(Vec::new())),
            usage: None,
            extra: Map::new(),
        }
    }
}

impl CompletionResponse {
    /// Choices, empty when absent or `null`.
    pub fn choices(&self) -> &[CompletionChoice] {
        value_of(&self.choices).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn usage(&self) -> Option<&Usage> {
        value_of(&self.usage)
    }
}

/// A text completion choice.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CompletionChoice {
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub text: Nullable<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub index: Nullable<u32>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub finish_reason: Nullable<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CompletionChoice {
    /// Generated text, empty when absent or `null`.
    pub fn text(&self) -> &str {
        value_of(&self.text).map_or("", String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_response_keeps_unknown_fields() {
        let upstream = json!({
            "id": "chatcmpl-abc",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4o",
            "system_fingerprint": "fp_123",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hi", "refusal": null},
                "logprobs": null,
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 5,
                "completion_tokens": 1,
                "total_tokens": 6,
                "prompt_tokens_details": {"cached_tokens": 0}
            }
        });

        let response: ChatCompletionResponse = serde_json::from_value(upstream.clone()).unwrap();
        assert_eq!(response.choices()[0].message().unwrap().text(), "Hi");
        assert_eq!(response.usage().unwrap().prompt_tokens(), 5);
        assert_eq!(serde_json::to_value(&response).unwrap(), upstream);
    }

    #[test]
    fn tool_call_message_keeps_null_content() {
        let upstream = json!({
            "id": "chatcmpl-tool",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "get_weather", "arguments": "{\"city\":\"Oslo\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 40, "completion_tokens": 12, "total_tokens": 52}
        });

        let response: ChatCompletionResponse = serde_json::from_value(upstream.clone()).unwrap();
        let message = response.choices()[0].message().unwrap();
        assert_eq!(message.content, Some(None));
        assert_eq!(message.text(), "");
        assert_eq!(serde_json::to_value(&response).unwrap(), upstream);
    }

    #[test]
    fn null_usage_and_finish_reason_stay_null() {
        let upstream = json!({
            "id": "chatcmpl-nulls",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "local-model",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "ok"},
                "finish_reason": null
            }],
            "usage": null
        });

        let response: ChatCompletionResponse = serde_json::from_value(upstream.clone()).unwrap();
        assert!(response.usage().is_none());
        assert_eq!(serde_json::to_value(&response).unwrap(), upstream);
    }

    #[test]
    fn absent_fields_are_not_added() {
        let upstream = json!({
            "choices": [{"message": {"role": "assistant", "content": "partial"}}]
        });

        let response: ChatCompletionResponse = serde_json::from_value(upstream.clone()).unwrap();
        assert_eq!(response.choices()[0].message().unwrap().text(), "partial");
        assert_eq!(serde_json::to_value(&response).unwrap(), upstream);

        let completion: CompletionResponse =
            serde_json::from_value(json!({"choices": [{"text": "x"}]})).unwrap();
        assert_eq!(completion.choices()[0].text(), "x");
        assert_eq!(
            serde_json::to_value(&completion).unwrap(),
            json!({"choices": [{"text": "x"}]})
        );
    }

    #[test]
    fn completion_response_keeps_unknown_fields() {
        let upstream = json!({
            "id": "cmpl-abc",
            "object": "text_completion",
            "created": 1700000000,
            "model": "gpt-3.5-turbo-instruct",
            "choices": [{"text": "\nHello", "index": 0, "logprobs": null, "finish_reason": "length"}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
        });

        let response: CompletionResponse = serde_json::from_value(upstream.clone()).unwrap();
        assert_eq!(response.choices()[0].text(), "\nHello");
        assert_eq!(serde_json::to_value(&response).unwrap(), upstream);
    }

    #[test]
    fn empty_responses_are_zero_valued() {
        let zero = json!({"id": "", "object": "", "created": 0, "model": "", "choices": []});
        assert_eq!(
            serde_json::to_value(ChatCompletionResponse::default()).unwrap(),
            zero
        );
        assert_eq!(serde_json::to_value(CompletionResponse::default()).unwrap(), zero);
    }

    #[test]
    fn request_forwards_vendor_parameters() {
        let body = json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "hello"}],
            "temperature": 0.5,
            "response_format": {"type": "json_object"},
            "seed": 7
        });

        let request: ChatCompletionRequest = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(request.temperature, Some(0.5));
        assert_eq!(request.extra.get("seed"), Some(&json!(7)));
        assert_eq!(serde_json::to_value(&request).unwrap(), body);
    }

    #[test]
    fn message_text_concatenates_text_parts() {
        let message: Message = serde_json::from_value(json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "Describe "},
                {"type": "image_url", "image_url": {"url": "https://example.com/a.png"}},
                {"type": "text", "text": "this image"}
            ]
        }))
        .unwrap();
        assert_eq!(message.text(), "Describe this image");
    }

    #[test]
    fn message_text_empty_when_content_missing() {
        let message: Message = serde_json::from_value(json!({"role": "assistant"})).unwrap();
        assert_eq!(message.content, None);
        assert_eq!(message.text(), "");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"role": "assistant"})
        );
    }

    #[test]
    fn prompt_variants_deserialize() {
        let single: CompletionRequest =
            serde_json::from_value(json!({"model": "m", "prompt": "hi"})).unwrap();
        assert_eq!(single.prompt, Some(Prompt::Text("hi".to_string())));

        let batch: CompletionRequest =
            serde_json::from_value(json!({"model": "m", "prompt": ["a", "b"]})).unwrap();
        assert_eq!(
            batch.prompt,
            Some(Prompt::Batch(vec!["a".to_string(), "b".to_string()]))
        );

        let tokens: CompletionRequest =
            serde_json::from_value(json!({"model": "m", "prompt": [1, 2, 3]})).unwrap();
        assert_eq!(tokens.prompt, Some(Prompt::Tokens(vec![1, 2, 3])));
    }
}
