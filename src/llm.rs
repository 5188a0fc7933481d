//! Chat request/response shapes and the provider seam
//!
//! utagent never speaks a vendor wire protocol; it shapes requests and
//! responses that an external HTTP client transmits. [`ChatProvider`] is
//! the seam any vendor client (or retrying wrapper, or test double)
//! implements, and [`request_fingerprint`] is the canonical hash the
//! response cache keys on.

use serde::{Deserialize, Serialize};

/// One message in a chat conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user", or "assistant"
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }
}

/// A chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Transport hint only; excluded from the cache fingerprint so a
    /// streaming and a non-streaming request for the same content share
    /// one cache entry
    pub stream: bool,
    pub messages: Vec<ChatMessage>,
}

/// A chat completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub success: bool,
    /// Populated when `success == false`
    pub error: Option<String>,
}

impl ChatResponse {
    pub fn ok(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            success: true,
            error: None,
        }
    }

    pub fn failure(model: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            model: model.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Anything that can complete a chat request.
///
/// `chat_stream` delivers incremental chunks to `sink`; implementations
/// without native streaming may call the sink once with the full text.
pub trait ChatProvider {
    fn chat(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse>;

    fn chat_stream(
        &self,
        request: &ChatRequest,
        sink: &mut dyn FnMut(&str),
    ) -> anyhow::Result<()> {
        let response = self.chat(request)?;
        sink(&response.content);
        Ok(())
    }
}

/// Canonical SHA-256 fingerprint of a request's cache-relevant fields:
/// model, temperature, max-tokens, and the ordered role+content pairs.
///
/// Field values are newline-delimited with length-free tags; message
/// boundaries carry an explicit record separator so no concatenation of
/// different message lists collides. `stream` is deliberately absent.
pub fn request_fingerprint(request: &ChatRequest) -> String {
    let mut canonical = String::new();
    canonical.push_str("model:");
    canonical.push_str(&request.model);
    canonical.push('\n');
    canonical.push_str("temperature:");
    canonical.push_str(&format!("{:.4}", request.temperature));
    canonical.push('\n');
    canonical.push_str("max_tokens:");
    canonical.push_str(&request.max_tokens.to_string());
    canonical.push('\n');
    for message in &request.messages {
        canonical.push_str("role:");
        canonical.push_str(&message.role);
        canonical.push('\n');
        canonical.push_str("content:");
        canonical.push_str(&message.content);
        canonical.push('\u{1e}');
    }
    crate::hash::sha256_hex(canonical.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(stream: bool) -> ChatRequest {
        ChatRequest {
            model: "gpt-4o-mini".into(),
            temperature: 0.2,
            max_tokens: 2048,
            stream,
            messages: vec![
                ChatMessage::system("You write JUnit 5 tests."),
                ChatMessage::user("Generate tests for Calculator.add"),
            ],
        }
    }

    #[test]
    fn test_fingerprint_deterministic() {
        assert_eq!(request_fingerprint(&request(false)), request_fingerprint(&request(false)));
    }

    #[test]
    fn test_fingerprint_ignores_stream_flag() {
        assert_eq!(request_fingerprint(&request(false)), request_fingerprint(&request(true)));
    }

    #[test]
    fn test_fingerprint_sensitive_to_model_and_params() {
        let base = request(false);
        let mut other_model = base.clone();
        other_model.model = "gpt-4o".into();
        let mut other_temp = base.clone();
        other_temp.temperature = 0.7;
        let mut other_tokens = base.clone();
        other_tokens.max_tokens = 4096;

        let fp = request_fingerprint(&base);
        assert_ne!(fp, request_fingerprint(&other_model));
        assert_ne!(fp, request_fingerprint(&other_temp));
        assert_ne!(fp, request_fingerprint(&other_tokens));
    }

    #[test]
    fn test_fingerprint_sensitive_to_message_order() {
        let base = request(false);
        let mut reversed = base.clone();
        reversed.messages.reverse();
        assert_ne!(request_fingerprint(&base), request_fingerprint(&reversed));
    }

    #[test]
    fn test_fingerprint_message_boundaries() {
        // "ab" + "c" must not collide with "a" + "bc"
        let mut a = request(false);
        a.messages = vec![ChatMessage::user("ab"), ChatMessage::user("c")];
        let mut b = request(false);
        b.messages = vec![ChatMessage::user("a"), ChatMessage::user("bc")];
        assert_ne!(request_fingerprint(&a), request_fingerprint(&b));
    }

    #[test]
    fn test_default_stream_delegates_to_chat() {
        struct Fixed;
        impl ChatProvider for Fixed {
            fn chat(&self, _request: &ChatRequest) -> anyhow::Result<ChatResponse> {
                Ok(ChatResponse::ok("chunk", "m"))
            }
        }
        let mut collected = String::new();
        Fixed.chat_stream(&request(true), &mut |s| collected.push_str(s)).unwrap();
        assert_eq!(collected, "chunk");
    }
}
