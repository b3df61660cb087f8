use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use crate::llm::{strip_code_fence, GenerativeModel, JsonRequest};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const ERROR_PREVIEW_CHARS: usize = 180;

pub struct GeminiModel {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiModel {
    /// An empty key is accepted here; calls then fail fast with
    /// `Error::MissingApiKey` before touching the network.
    pub fn new(api_key: impl Into<String>, config: &GeminiConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("publicadmin-sim/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs.max(1)))
            .build()
            .map_err(|source| Error::Transport {
                model: config.model.clone(),
                source,
            })?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate_json(&self, request: &JsonRequest) -> Result<String> {
        if self.api_key.trim().is_empty() {
            return Err(Error::MissingApiKey);
        }

        let body = GenerateContentRequest::from_request(request);
        let url = self.endpoint();
        debug!(model = %self.model, prompt_chars = request.prompt.chars().count(), "gemini generateContent");

        let transport = |source: reqwest::Error| Error::Transport {
            model: self.model.clone(),
            source,
        };
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        if !status.is_success() {
            let preview: String = text.chars().take(ERROR_PREVIEW_CHARS).collect();
            return Err(Error::Api {
                status: status.as_u16(),
                body: preview,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)?;
        let output = parsed.text().ok_or(Error::EmptyResponse)?;
        debug!(model = %self.model, reply_chars = output.chars().count(), "gemini reply");
        Ok(strip_code_fence(&output).to_string())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

impl<'a> GenerateContentRequest<'a> {
    fn from_request(request: &'a JsonRequest) -> Self {
        Self {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &request.system_instruction,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: &request.response_schema,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_schema: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect::<String>();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::*;

    fn request() -> JsonRequest {
        JsonRequest {
            system_instruction: "persona".to_string(),
            prompt: "prompt".to_string(),
            response_schema: json!({ "type": "OBJECT" }),
        }
    }

    fn config(base_url: &str) -> GeminiConfig {
        GeminiConfig {
            base_url: base_url.to_string(),
            ..GeminiConfig::default()
        }
    }

    async fn spawn_stub(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("stub server");
        });
        addr
    }

    #[test]
    fn request_body_matches_wire_format() {
        let request = request();
        let body = serde_json::to_value(GenerateContentRequest::from_request(&request))
            .expect("serialize");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "persona");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "prompt");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let parsed: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        }))
        .expect("response");
        assert_eq!(parsed.text().as_deref(), Some("{\"a\":1}"));

        let empty: GenerateContentResponse =
            serde_json::from_value(json!({ "candidates": [] })).expect("response");
        assert!(empty.text().is_none());
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        // Port 9 is never contacted because the key check comes first.
        let model = GeminiModel::new("", &config("http://127.0.0.1:9")).expect("client");
        let err = model.generate_json(&request()).await.unwrap_err();
        assert!(matches!(err, Error::MissingApiKey));
    }

    #[tokio::test]
    async fn posts_to_model_endpoint_and_returns_text() {
        let router = Router::new().route(
            "/v1beta/models/gemini-2.5-flash:generateContent",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(
                    headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()),
                    Some("secret")
                );
                assert_eq!(body["contents"][0]["parts"][0]["text"], "prompt");
                Json(json!({
                    "candidates": [
                        { "content": { "parts": [{ "text": "```json\n{\"ok\":true}\n```" }] } }
                    ]
                }))
            }),
        );
        let addr = spawn_stub(router).await;
        let model = GeminiModel::new("secret", &config(&format!("http://{addr}/"))).expect("client");

        let text = tokio_test::assert_ok!(model.generate_json(&request()).await);
        assert_eq!(text, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn non_success_status_becomes_api_error() {
        let router = Router::new().route(
            "/v1beta/models/gemini-2.5-flash:generateContent",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota exhausted") }),
        );
        let addr = spawn_stub(router).await;
        let model = GeminiModel::new("secret", &config(&format!("http://{addr}"))).expect("client");

        match model.generate_json(&request()).await {
            Err(Error::Api { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota exhausted");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }
}
