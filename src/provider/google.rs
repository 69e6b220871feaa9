use super::{Completion, CompletionRequest, Provider};
use crate::error::ChatError;
use anyhow::Context;
use futures_core::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/";

#[derive(Debug, Clone)]
pub struct GoogleProvider {
    http: reqwest::Client,
    api_key: String,
    api_base: Url,
}

impl GoogleProvider {
    pub fn new(http: reqwest::Client, api_key: String, api_base: Option<&str>) -> anyhow::Result<Self> {
        let mut base = api_base.unwrap_or(DEFAULT_API_BASE).to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self {
            http,
            api_key,
            api_base: Url::parse(&base).with_context(|| format!("invalid API base URL: {base}"))?,
        })
    }

    fn build_url(&self, model: &str) -> Result<Url, ChatError> {
        // Docs: https://ai.google.dev/api/rest/v1beta/models/generateContent
        let mut url = self
            .api_base
            .join(&format!("v1beta/models/{model}:generateContent"))
            .map_err(|e| ChatError::InvalidResponse(format!("cannot build request URL: {e}")))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    fn headers() -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        h
    }
}

impl Provider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn generate(&self, req: CompletionRequest) -> BoxFuture<'static, Result<Completion, ChatError>> {
        Box::pin(self.clone().call(req))
    }
}

impl GoogleProvider {
    async fn call(self, req: CompletionRequest) -> Result<Completion, ChatError> {
        let url = self.build_url(&req.model)?;
        let body = GenerateContentRequest::user_prompt(req.prompt);

        tracing::debug!(model = %req.model, "sending generateContent request");
        let resp = self
            .http
            .post(url)
            .headers(Self::headers())
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &text));
        }

        let bytes = resp.bytes().await?;
        let parsed: GenerateContentResponse = serde_json::from_slice(&bytes)
            .map_err(|e| ChatError::InvalidResponse(e.to_string()))?;
        Ok(into_completion(parsed))
    }
}

/// Map a non-success HTTP status and its body to a failure class.
fn classify_status(status: u16, body: &str) -> ChatError {
    let envelope = serde_json::from_str::<ApiErrorEnvelope>(body).ok();
    let message = envelope
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    let invalid_key = envelope
        .as_ref()
        .map(|e| e.error.details.iter().any(|d| d.reason.as_deref() == Some("API_KEY_INVALID")))
        .unwrap_or(false)
        || body.contains("API_KEY_INVALID");

    match status {
        401 | 403 => ChatError::Auth(message),
        400 if invalid_key => ChatError::Auth(message),
        429 => ChatError::RateLimited(message),
        _ => ChatError::Service { status, message },
    }
}

fn into_completion(r: GenerateContentResponse) -> Completion {
    let Some(cand) = r.candidates.into_iter().next() else {
        // No candidates: the prompt itself was blocked, or nothing was produced.
        return Completion {
            text: String::new(),
            finish_reason: r.prompt_feedback.and_then(|f| f.block_reason),
        };
    };

    // Concatenate all text parts of the first candidate.
    let text = cand
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .unwrap_or_default();

    Completion {
        text,
        finish_reason: cand.finish_reason,
    }
}

#[derive(Debug, Clone, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

impl GenerateContentRequest {
    fn user_prompt(prompt: String) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some(prompt) }],
            }],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<ApiErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(base: Option<&str>) -> GoogleProvider {
        GoogleProvider::new(reqwest::Client::new(), "k3y".to_string(), base).unwrap()
    }

    #[test]
    fn url_targets_model_and_carries_key() {
        let url = provider(None).build_url("gemini-pro").unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent?key=k3y"
        );
    }

    #[test]
    fn api_base_without_trailing_slash_is_accepted() {
        let url = provider(Some("http://127.0.0.1:8080/proxy")).build_url("gemini-pro").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8080/proxy/v1beta/models/gemini-pro:generateContent?key=k3y"
        );
    }

    #[test]
    fn request_body_forwards_prompt_verbatim() {
        let body = GenerateContentRequest::user_prompt(String::new());
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"contents": [{"role": "user", "parts": [{"text": ""}]}]})
        );
    }

    #[test]
    fn concatenates_text_parts_of_first_candidate() {
        let r: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[
                {"content":{"role":"model","parts":[{"text":"Hi "},{"text":"there"}]},"finishReason":"STOP"},
                {"content":{"parts":[{"text":"ignored"}]}}
            ]}"#,
        )
        .unwrap();
        let c = into_completion(r);
        assert_eq!(c.text, "Hi there");
        assert_eq!(c.finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn blocked_prompt_is_an_empty_completion() {
        let r: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        let c = into_completion(r);
        assert_eq!(c.text, "");
        assert_eq!(c.finish_reason.as_deref(), Some("SAFETY"));
    }

    #[test]
    fn invalid_key_is_an_auth_failure() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.",
            "status":"INVALID_ARGUMENT","details":[{"@type":"type.googleapis.com/google.rpc.ErrorInfo","reason":"API_KEY_INVALID"}]}}"#;
        assert_eq!(
            classify_status(400, body),
            ChatError::Auth("API key not valid. Please pass a valid API key.".to_string())
        );
        assert!(matches!(classify_status(403, "forbidden"), ChatError::Auth(m) if m == "forbidden"));
    }

    #[tokio::test]
    async fn transport_errors_do_not_expose_api_key() {
        let p = GoogleProvider::new(
            reqwest::Client::new(),
            "SECRETKEY123".to_string(),
            Some("http://127.0.0.1:1/"),
        )
        .unwrap();

        let err = p
            .generate(CompletionRequest {
                model: "gemini-pro".into(),
                prompt: "Hello".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::Network(_)), "got {err:?}");
        let shown = crate::view::ResponseView::Error {
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
        .to_string();
        assert!(!shown.contains("SECRETKEY123"), "{shown}");
        assert!(!format!("{err:?}").contains("SECRETKEY123"));
    }

    #[test]
    fn other_statuses_are_transient() {
        assert!(matches!(classify_status(429, r#"{"error":{"message":"quota"}}"#), ChatError::RateLimited(m) if m == "quota"));
        assert_eq!(
            classify_status(400, r#"{"error":{"message":"bad field"}}"#),
            ChatError::Service { status: 400, message: "bad field".to_string() }
        );
        assert_eq!(
            classify_status(503, "upstream down\n"),
            ChatError::Service { status: 503, message: "upstream down".to_string() }
        );
    }
}
