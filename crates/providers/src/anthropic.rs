//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly.
//!
//! Features:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - Native tool use with `tool_use` / `tool_result` content blocks
//! - Extended thinking, with thinking blocks replayed verbatim

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shellpilot_core::error::ProviderError;
use shellpilot_core::message::ContentBlock;
use shellpilot_core::provider::{ModelRequest, ModelResponse, StopReason, Usage};
use shellpilot_core::tool::ToolDeclaration;
use tracing::{debug, trace, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        // Thinking-enabled calls can take minutes
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.base_url = base_url.as_ref().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Assemble the JSON body for `POST /v1/messages`.
    fn build_body(request: &ModelRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "messages": request.messages,
        });

        if let Some(ref sys) = request.system {
            body["system"] = serde_json::json!(sys);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        if let Some(budget) = request.thinking_budget {
            body["thinking"] = serde_json::json!({
                "type": "enabled",
                "budget_tokens": budget
            });
        }

        body
    }

    /// Convert tool declarations to Anthropic format.
    fn to_api_tools(tools: &[ToolDeclaration]) -> Vec<AnthropicTool> {
        tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.input_schema.clone(),
            })
            .collect()
    }

    /// Convert an Anthropic API response to a ModelResponse.
    fn to_model_response(
        resp: AnthropicResponse,
        requested_model: &str,
    ) -> Result<ModelResponse, ProviderError> {
        let mut content = Vec::with_capacity(resp.content.len());
        for raw in resp.content {
            let kind = raw.get("type").and_then(|t| t.as_str()).unwrap_or("").to_string();
            match kind.as_str() {
                "text" | "tool_use" | "thinking" | "redacted_thinking" => {
                    let block: ContentBlock = serde_json::from_value(raw).map_err(|e| {
                        ProviderError::MalformedResponse(format!("bad {kind} block: {e}"))
                    })?;
                    content.push(block);
                }
                other => trace!(block_type = other, "Ignoring unsupported content block"),
            }
        }

        let stop_reason = resp
            .stop_reason
            .as_deref()
            .map(StopReason::parse)
            .unwrap_or(StopReason::EndTurn);

        if stop_reason == StopReason::ToolUse
            && !content.iter().any(|b| matches!(b, ContentBlock::ToolUse { .. }))
        {
            return Err(ProviderError::MalformedResponse(
                "stop_reason is tool_use but no tool_use block was returned".into(),
            ));
        }

        let model = if resp.model.is_empty() {
            requested_model.to_string()
        } else {
            resp.model
        };

        Ok(ModelResponse {
            stop_reason,
            content,
            usage: Usage {
                input_tokens: resp.usage.input_tokens,
                output_tokens: resp.usage.output_tokens,
            },
            model,
        })
    }
}

#[async_trait]
impl shellpilot_core::Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::build_body(&request);

        debug!(
            provider = "anthropic",
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            thinking = request.thinking_budget.is_some(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Anthropic API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse Anthropic response: {e}")))?;

        Self::to_model_response(api_resp, &request.model)
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    model: String,
    content: Vec<serde_json::Value>,
    usage: AnthropicUsage,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shellpilot_core::Provider;
    use shellpilot_core::message::{Message, ResultSegment, Role};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn constructor() {
        let provider = AnthropicProvider::new("sk-ant-test");
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn constructor_with_base_url() {
        let provider =
            AnthropicProvider::new("sk-ant-test").with_base_url("https://custom.proxy.com/");
        assert_eq!(provider.base_url, "https://custom.proxy.com");
    }

    #[test]
    fn body_carries_system_tools_and_thinking() {
        let request = ModelRequest::new("claude-sonnet-4-20250514", 8192, vec![Message::user("hi")])
            .with_system("be brief")
            .with_thinking_budget(Some(1024))
            .with_tools(vec![ToolDeclaration {
                name: "bash".into(),
                description: "Run shell".into(),
                input_schema: json!({"type": "object", "properties": {}}),
            }]);

        let body = AnthropicProvider::build_body(&request);
        assert_eq!(body["system"], "be brief");
        assert_eq!(body["max_tokens"], 8192);
        assert_eq!(body["thinking"]["type"], "enabled");
        assert_eq!(body["thinking"]["budget_tokens"], 1024);
        assert_eq!(body["tools"][0]["name"], "bash");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"][0]["type"], "text");
    }

    #[test]
    fn body_omits_optional_fields() {
        let request = ModelRequest::new("m", 10, vec![Message::user("hi")]);
        let body = AnthropicProvider::build_body(&request);
        assert!(body.get("system").is_none());
        assert!(body.get("tools").is_none());
        assert!(body.get("thinking").is_none());
    }

    #[test]
    fn tool_results_serialize_as_user_blocks() {
        let msg = Message {
            role: Role::User,
            content: vec![ContentBlock::ToolResult {
                tool_use_id: "toolu_123".into(),
                content: vec![ResultSegment::Text { text: "done".into() }],
                is_error: true,
            }],
        };
        let request = ModelRequest::new("m", 10, vec![msg]);
        let body = AnthropicProvider::build_body(&request);
        let block = &body["messages"][0]["content"][0];
        assert_eq!(block["type"], "tool_result");
        assert_eq!(block["tool_use_id"], "toolu_123");
        assert_eq!(block["is_error"], true);
    }

    #[test]
    fn assistant_reasoning_is_replayed() {
        let msg = Message::assistant(vec![
            ContentBlock::Thinking { thinking: "plan".into(), signature: "sig".into() },
            ContentBlock::RedactedThinking { data: "opaque".into() },
            ContentBlock::ToolUse { id: "toolu_1".into(), name: "bash".into(), input: json!({}) },
        ]);
        let request = ModelRequest::new("m", 10, vec![Message::user("hi"), msg]);
        let body = AnthropicProvider::build_body(&request);
        let blocks = &body["messages"][1]["content"];
        assert_eq!(blocks[0]["signature"], "sig");
        assert_eq!(blocks[1]["type"], "redacted_thinking");
        assert_eq!(blocks[1]["data"], "opaque");
        assert_eq!(blocks[2]["type"], "tool_use");
    }

    #[test]
    fn parse_tool_use_response() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "id": "msg_02",
                "model": "claude-sonnet-4-20250514",
                "content": [
                    {"type": "thinking", "thinking": "list it", "signature": "sig"},
                    {"type": "text", "text": "Let me look"},
                    {"type": "tool_use", "id": "toolu_abc", "name": "bash", "input": {"command": "ls"}},
                    {"type": "redacted_thinking", "data": "xyz"}
                ],
                "usage": {"input_tokens": 20, "output_tokens": 10},
                "stop_reason": "tool_use"
            }"#,
        )
        .unwrap();

        let mr = AnthropicProvider::to_model_response(resp, "requested").unwrap();
        assert_eq!(mr.stop_reason, StopReason::ToolUse);
        assert_eq!(mr.content.len(), 4);
        assert_eq!(mr.text(), "Let me look");
        assert_eq!(mr.usage.input_tokens, 20);
        assert_eq!(mr.model, "claude-sonnet-4-20250514");
        match &mr.content[0] {
            ContentBlock::Thinking { signature, .. } => assert_eq!(signature, "sig"),
            other => panic!("Expected thinking block, got {other:?}"),
        }
        assert_eq!(
            mr.content[3],
            ContentBlock::RedactedThinking { data: "xyz".into() }
        );
    }

    #[test]
    fn tool_use_stop_without_block_is_malformed() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "model": "m",
                "content": [{"type": "text", "text": "hmm"}],
                "usage": {"input_tokens": 1, "output_tokens": 1},
                "stop_reason": "tool_use"
            }"#,
        )
        .unwrap();
        assert!(matches!(
            AnthropicProvider::to_model_response(resp, "m"),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn missing_model_falls_back_to_requested() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{"content": [], "usage": {"input_tokens": 0, "output_tokens": 0}, "stop_reason": "end_turn"}"#,
        )
        .unwrap();
        let mr = AnthropicProvider::to_model_response(resp, "claude-x").unwrap();
        assert_eq!(mr.model, "claude-x");
        assert_eq!(mr.stop_reason, StopReason::EndTurn);
    }

    /// Serve one canned HTTP response and hand back the raw request text.
    async fn one_shot_server(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64 * 1024];
            let mut request = Vec::new();
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let len = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + len {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let reply = format!(
                "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn complete_sends_headers_and_parses_reply() {
        let (url, server) = one_shot_server(
            "HTTP/1.1 200 OK",
            r#"{"model":"claude-sonnet-4-20250514","content":[{"type":"text","text":"hello"}],"usage":{"input_tokens":3,"output_tokens":2},"stop_reason":"end_turn"}"#,
        )
        .await;

        let provider = AnthropicProvider::new("sk-ant-test").with_base_url(&url);
        let resp = provider
            .complete(ModelRequest::new("claude-sonnet-4-20250514", 64, vec![Message::user("hi")]))
            .await
            .unwrap();
        assert_eq!(resp.text(), "hello");
        assert_eq!(resp.usage.output_tokens, 2);

        let raw = server.await.unwrap().to_ascii_lowercase();
        assert!(raw.starts_with("post /v1/messages"));
        assert!(raw.contains("x-api-key: sk-ant-test"));
        assert!(raw.contains("anthropic-version: 2023-06-01"));
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let (url, _server) = one_shot_server("HTTP/1.1 401 Unauthorized", "{}").await;
        let provider = AnthropicProvider::new("bad").with_base_url(&url);
        let err = provider
            .complete(ModelRequest::new("m", 8, vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));

        let (url, _server) = one_shot_server("HTTP/1.1 429 Too Many Requests", "{}").await;
        let provider = AnthropicProvider::new("k").with_base_url(&url);
        let err = provider
            .complete(ModelRequest::new("m", 8, vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { .. }));

        let (url, _server) =
            one_shot_server("HTTP/1.1 529 Overloaded", r#"{"error":"overloaded"}"#).await;
        let provider = AnthropicProvider::new("k").with_base_url(&url);
        let err = provider
            .complete(ModelRequest::new("m", 8, vec![Message::user("hi")]))
            .await
            .unwrap_err();
        match err {
            ProviderError::ApiError { status_code, message } => {
                assert_eq!(status_code, 529);
                assert!(message.contains("overloaded"));
            }
            other => panic!("Expected ApiError, got {other:?}"),
        }
    }
}
