use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::sse::SseDecoder;
use super::{AdviceGenerator, FragmentStream, GenerationEvent};
use crate::config::GeneratorConfig;
use crate::{AdvisorError, Result};

/// Response shape shared by `generateContent` and each streamed event
#[derive(Debug, Deserialize, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

impl Candidate {
    fn texts(&self) -> impl Iterator<Item = &str> {
        self.content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
    }
}

/// HTTP client for the Gemini `generateContent` / `streamGenerateContent` API
#[derive(Clone)]
pub struct GeminiGenerator {
    http: Client,
    cfg: GeneratorConfig,
    api_key: String,
}

impl GeminiGenerator {
    pub fn new(cfg: GeneratorConfig) -> Result<Self> {
        let api_key = cfg
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AdvisorError::Config("GEMINI_API_KEY is not set".into()))?;

        // No overall client timeout: streams may legitimately run longer than any fixed bound
        let http = Client::builder()
            .connect_timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| AdvisorError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { http, cfg, api_key })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GeneratorConfig::default())
    }

    fn url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.cfg.base_url.trim_end_matches('/'),
            model,
            method
        )
    }

    fn body(prompt: &str) -> serde_json::Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }]
        })
    }

    fn post(&self, url: &str, prompt: &str) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::body(prompt))
    }
}

#[async_trait]
impl AdviceGenerator for GeminiGenerator {
    async fn generate_once(&self, prompt: &str) -> Result<String> {
        let url = self.url(&self.cfg.model, "generateContent");
        debug!(target: "generator", model=%self.cfg.model, "POST {}", url);

        let resp = self
            .post(&url, prompt)
            .timeout(Duration::from_millis(self.cfg.request_timeout_ms))
            .send()
            .await
            .map_err(|e| AdvisorError::Generation(format!("gemini API failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!(target: "generator", %status, body = %body, "generateContent error");
            return Err(AdvisorError::Generation(format!(
                "gemini API failed: status={} body={}",
                status, body
            )));
        }

        let parsed: GenerateContentResponse = resp.json().await.map_err(|e| {
            AdvisorError::Generation(format!("failed to parse gemini response: {e}"))
        })?;

        let candidate = parsed
            .candidates
            .first()
            .ok_or_else(|| AdvisorError::Generation("no response generated".into()))?;

        Ok(candidate.texts().collect())
    }

    async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream> {
        let url = format!(
            "{}?alt=sse",
            self.url(&self.cfg.stream_model, "streamGenerateContent")
        );
        debug!(target: "generator", model=%self.cfg.stream_model, "POST {}", url);

        let resp = self
            .post(&url, prompt)
            .send()
            .await
            .map_err(|e| AdvisorError::Generation(format!("streaming failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!(target: "generator", %status, body = %body, "streamGenerateContent error");
            return Err(AdvisorError::Generation(format!(
                "streaming failed: status={} body={}",
                status, body
            )));
        }

        let mut body = resp.bytes_stream();
        let stream = async_stream::stream! {
            let mut decoder = SseDecoder::new();
            while let Some(chunk) = body.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(target: "generator", error=%e, "stream body failed");
                        yield Err(AdvisorError::Generation(format!("streaming failed: {e}")));
                        return;
                    }
                };
                for payload in decoder.push(&bytes) {
                    match fragments_of(&payload) {
                        Ok(texts) => {
                            for text in texts {
                                yield Ok(GenerationEvent::Fragment(text));
                            }
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }

            // Body ended normally; an unterminated last event may still be buffered
            if let Some(payload) = decoder.finish() {
                match fragments_of(&payload) {
                    Ok(texts) => {
                        for text in texts {
                            yield Ok(GenerationEvent::Fragment(text));
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
            yield Ok(GenerationEvent::End);
        };

        Ok(Box::pin(stream))
    }
}

/// Text parts of every candidate in one streamed event, one fragment per part
fn fragments_of(payload: &str) -> Result<Vec<String>> {
    let event: GenerateContentResponse = serde_json::from_str(payload)
        .map_err(|e| AdvisorError::Generation(format!("failed to parse stream event: {e}")))?;

    if let Some(err) = event.error {
        return Err(AdvisorError::Generation(format!(
            "streaming failed: code={} message={}",
            err.code, err.message
        )));
    }

    Ok(event
        .candidates
        .iter()
        .flat_map(|c| c.texts())
        .map(str::to_string)
        .collect())
}
