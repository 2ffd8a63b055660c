//! Web tools: page reading and search through the Jina APIs.
//!
//! Each call is `GET {endpoint}/{argument}` returning markdown. A 403 is
//! retried once with caching disabled.

use async_trait::async_trait;
use shellpilot_core::error::ToolError;
use shellpilot_core::tool::{Tool, ToolOutput};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Which Jina service a request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JinaService {
    Reader,
    Search,
    Grounding,
}

/// Base URLs of the three services.
#[derive(Debug, Clone)]
pub struct JinaEndpoints {
    pub reader: String,
    pub search: String,
    pub grounding: String,
}

impl Default for JinaEndpoints {
    fn default() -> Self {
        Self {
            reader: "https://r.jina.ai".into(),
            search: "https://s.jina.ai".into(),
            grounding: "https://g.jina.ai".into(),
        }
    }
}

impl JinaEndpoints {
    /// Every service under one base, at `/r`, `/s` and `/g`.
    pub fn under(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            reader: format!("{base}/r"),
            search: format!("{base}/s"),
            grounding: format!("{base}/g"),
        }
    }

    fn base(&self, service: JinaService) -> &str {
        match service {
            JinaService::Reader => &self.reader,
            JinaService::Search => &self.search,
            JinaService::Grounding => &self.grounding,
        }
    }
}

/// Thin HTTP client for the Jina reader/search/grounding APIs.
pub struct JinaClient {
    api_key: String,
    endpoints: JinaEndpoints,
    client: reqwest::Client,
}

impl JinaClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self {
            api_key: api_key.into(),
            endpoints: JinaEndpoints::default(),
            client,
        }
    }

    pub fn with_endpoints(mut self, endpoints: JinaEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub async fn read_page(&self, url: &str) -> Result<String, String> {
        self.fetch(JinaService::Reader, url).await
    }

    pub async fn search(&self, term: &str) -> Result<String, String> {
        self.fetch(JinaService::Search, term).await
    }

    pub async fn search_grounding(&self, term: &str) -> Result<String, String> {
        self.fetch(JinaService::Grounding, term).await
    }

    async fn send(&self, url: &str, no_cache: bool) -> Result<reqwest::Response, String> {
        let mut request = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Return-Format", "markdown");
        if no_cache {
            request = request.header("X-No-Cache", "true");
        }
        request
            .send()
            .await
            .map_err(|e| format!("Jina request failed: {e}"))
    }

    async fn fetch(&self, service: JinaService, arg: &str) -> Result<String, String> {
        let url = format!("{}/{arg}", self.endpoints.base(service));
        info!(url = %url, "Fetching");

        let mut response = self.send(&url, false).await?;
        if response.status() == reqwest::StatusCode::FORBIDDEN {
            info!("Got 403, retrying with X-No-Cache");
            response = self.send(&url, true).await?;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(format!(
                "Jina API error: {}",
                status.canonical_reason().unwrap_or(status.as_str())
            ));
        }
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read Jina response: {e}"))?;
        debug!(url = %url, bytes = body.len(), "Fetched");
        Ok(body)
    }
}

/// One model-facing web tool; the three differ only in service and argument name.
pub struct JinaTool {
    client: Arc<JinaClient>,
    service: JinaService,
}

impl JinaTool {
    pub fn read_page(client: Arc<JinaClient>) -> Self {
        Self {
            client,
            service: JinaService::Reader,
        }
    }

    pub fn search(client: Arc<JinaClient>) -> Self {
        Self {
            client,
            service: JinaService::Search,
        }
    }

    pub fn search_grounding(client: Arc<JinaClient>) -> Self {
        Self {
            client,
            service: JinaService::Grounding,
        }
    }

    fn argument(&self) -> &'static str {
        match self.service {
            JinaService::Reader => "url",
            JinaService::Search | JinaService::Grounding => "searchTerm",
        }
    }
}

#[async_trait]
impl Tool for JinaTool {
    fn name(&self) -> &str {
        match self.service {
            JinaService::Reader => "readPage",
            JinaService::Search => "search",
            JinaService::Grounding => "searchGrounding",
        }
    }

    fn description(&self) -> &str {
        match self.service {
            JinaService::Reader => "Read and parse content from a URL using Jina Reader API",
            JinaService::Search => "Search content using Jina Search API",
            JinaService::Grounding => "Search with grounding using Jina Grounding API",
        }
    }

    fn input_schema(&self) -> serde_json::Value {
        let arg = self.argument();
        let desc = match self.service {
            JinaService::Reader => "The URL to read",
            _ => "The search term",
        };
        serde_json::json!({
            "type": "object",
            "properties": {
                arg: { "type": "string", "description": desc }
            },
            "required": [arg]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let arg = self.argument();
        let value = input[arg]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{arg}' argument")))?;
        let result = match self.service {
            JinaService::Reader => self.client.read_page(value).await,
            JinaService::Search => self.client.search(value).await,
            JinaService::Grounding => self.client.search_grounding(value).await,
        };
        Ok(match result {
            Ok(text) => ToolOutput::text(text),
            Err(e) => ToolOutput::error(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Serves one canned reply per connection, in order, and returns the raw requests.
    async fn scripted_server(
        replies: Vec<(&'static str, &'static str)>,
    ) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            for (status_line, body) in replies {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 16 * 1024];
                let mut request = Vec::new();
                loop {
                    let n = socket.read(&mut buf).await.unwrap();
                    request.extend_from_slice(&buf[..n]);
                    if n == 0 || String::from_utf8_lossy(&request).contains("\r\n\r\n") {
                        break;
                    }
                }
                let reply = format!(
                    "{status_line}\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                seen.push(String::from_utf8_lossy(&request).to_ascii_lowercase());
            }
            seen
        });
        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn read_page_sends_auth_and_format_headers() {
        let (base, server) = scripted_server(vec![("HTTP/1.1 200 OK", "# Title")]).await;
        let client = JinaClient::new("jina-key").with_endpoints(JinaEndpoints::under(&base));

        let text = client.read_page("https://example.com").await.unwrap();
        assert_eq!(text, "# Title");

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("get /r/https://example.com"));
        assert!(requests[0].contains("authorization: bearer jina-key"));
        assert!(requests[0].contains("x-return-format: markdown"));
        assert!(!requests[0].contains("x-no-cache"));
    }

    #[tokio::test]
    async fn forbidden_is_retried_once_without_cache() {
        let (base, server) = scripted_server(vec![
            ("HTTP/1.1 403 Forbidden", ""),
            ("HTTP/1.1 200 OK", "fresh"),
        ])
        .await;
        let client = JinaClient::new("k").with_endpoints(JinaEndpoints::under(&base));

        assert_eq!(client.search("rust").await.unwrap(), "fresh");
        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].starts_with("get /s/rust"));
        assert!(requests[1].contains("x-no-cache: true"));
    }

    #[tokio::test]
    async fn error_status_becomes_error_result() {
        let (base, _server) = scripted_server(vec![("HTTP/1.1 500 Internal Server Error", "")]).await;
        let client = Arc::new(JinaClient::new("k").with_endpoints(JinaEndpoints::under(&base)));
        let tool = JinaTool::search_grounding(client);

        let out = tool
            .execute(serde_json::json!({"searchTerm": "x"}))
            .await
            .unwrap();
        assert!(out.is_error);
        assert_eq!(out.joined(), "Jina API error: Internal Server Error");
    }

    #[test]
    fn tool_names_and_schemas() {
        let client = Arc::new(JinaClient::new("k"));
        let read = JinaTool::read_page(client.clone());
        assert_eq!(read.name(), "readPage");
        assert_eq!(read.input_schema()["required"][0], "url");
        let search = JinaTool::search(client);
        assert_eq!(search.name(), "search");
        assert_eq!(search.input_schema()["required"][0], "searchTerm");
    }
}
