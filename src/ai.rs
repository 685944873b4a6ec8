use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::ModelError;
use crate::models::{Commit, RepositoryContext, UncommittedChange};
use crate::prompt;
use crate::response::{parse_reply, CodeAnalysis, MergeRequestReport};

const BASE_RETRY_DELAY: Duration = Duration::from_millis(500);

pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>>;

/// A text-completion endpoint.
pub trait CompletionModel: Send + Sync {
    fn complete<'a>(&'a self, prompt: &'a str) -> CompletionFuture<'a>;
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    max_retries: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self, ModelError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/models/{}:generateContent", config.api_base, config.model),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    async fn request_once(&self, prompt: &str) -> Result<String, ModelError> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(ModelError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|_| ModelError::UnparseableResponse)?;
        let reply = candidate_text(parsed);
        if reply.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(reply)
    }
}

fn candidate_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default()
}

impl CompletionModel for GeminiClient {
    fn complete<'a>(&'a self, prompt: &'a str) -> CompletionFuture<'a> {
        Box::pin(retry_transient(self.max_retries, BASE_RETRY_DELAY, move || {
            self.request_once(prompt)
        }))
    }
}

/// Run `op`, retrying transient failures with doubling delays.
pub async fn retry_transient<F, Fut, T>(
    max_retries: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T, ModelError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ModelError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_retries => {
                let delay = base_delay * 2u32.pow(attempt);
                attempt += 1;
                tracing::warn!(
                    "Model request failed ({}), retry {}/{} in {:?}",
                    e,
                    attempt,
                    max_retries,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Turns repository data into prompts and model replies into typed results.
pub struct ReviewService<M> {
    model: M,
}

impl<M: CompletionModel> ReviewService<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub async fn analyze_commits(&self, commits: &[Commit]) -> Result<CodeAnalysis, ModelError> {
        let prompt = prompt::analysis_prompt(commits);
        self.ask(&prompt).await
    }

    pub async fn analyze_changes(
        &self,
        changes: &[UncommittedChange],
    ) -> Result<CodeAnalysis, ModelError> {
        let prompt = prompt::uncommitted_analysis_prompt(changes);
        self.ask(&prompt).await
    }

    pub async fn generate_mr_description(
        &self,
        commits: &[Commit],
        context: &RepositoryContext,
    ) -> Result<MergeRequestReport, ModelError> {
        let prompt = prompt::report_prompt(commits, context);
        self.ask(&prompt).await
    }

    async fn ask<T: serde::de::DeserializeOwned>(&self, prompt: &str) -> Result<T, ModelError> {
        tracing::debug!("Sending prompt of {} bytes", prompt.len());
        let reply = self.model.complete(prompt).await?;
        tracing::debug!("Received reply of {} bytes", reply.len());
        parse_reply(&reply)
    }
}
