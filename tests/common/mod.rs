//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tracing_subscriber::fmt::MakeWriter;

use openai_proxy::proxy::{ChatCompletionRequest, CompletionRequest, Message};

/// In-memory sink for formatted log output.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Number of captured lines containing `needle`.
    pub fn count_lines(&self, needle: &str) -> usize {
        self.contents().lines().filter(|l| l.contains(needle)).count()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Install a thread-local subscriber writing into a fresh buffer.
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}

pub fn chat_request() -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: "gpt-4o".to_string(),
        messages: vec![Message::new("user", "Say hello")],
        temperature: Some(0.2),
        ..Default::default()
    }
}

pub fn completion_request() -> CompletionRequest {
    serde_json::from_value(json!({
        "model": "gpt-3.5-turbo-instruct",
        "prompt": "Say hello",
        "max_tokens": 16
    }))
    .unwrap()
}

/// Chat completion body as an upstream would send it, including vendor fields.
pub fn chat_response_body(content: &str, prompt_tokens: u32) -> Value {
    json!({
        "id": "chatcmpl-9abc",
        "object": "chat.completion",
        "created": 1718000000,
        "model": "gpt-4o-2024-05-13",
        "system_fingerprint": "fp_3aa7262c27",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "logprobs": null,
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": prompt_tokens,
            "completion_tokens": 2,
            "total_tokens": prompt_tokens + 2
        }
    })
}

pub fn completion_response_body() -> Value {
    json!({
        "id": "cmpl-7xyz",
        "object": "text_completion",
        "created": 1718000000,
        "model": "gpt-3.5-turbo-instruct",
        "choices": [{"text": "\n\nHello!", "index": 0, "logprobs": null, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 3, "completion_tokens": 4, "total_tokens": 7}
    })
}

pub fn openai_error_body(message: &str) -> Value {
    json!({
        "error": {
            "message": message,
            "type": "server_error",
            "param": null,
            "code": null
        }
    })
}
