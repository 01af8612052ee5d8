//! Extraction-service boundary.
//!
//! The session never talks HTTP itself; it hands a
//! [`SubmissionRequest`](crate::session::SubmissionRequest) to an
//! [`ExtractionService`]. [`HttpExtractionService`] is the production adapter:
//! one multipart `POST /api/{provider}/parse` per submission, no retries.
//! Tests and embedders inject their own implementation.
//!
//! ## Wire format
//!
//! ```text
//! POST {base}/api/{provider}/parse      multipart/form-data
//!   file               application/pdf, original file name
//!   api_key            credential
//!   layout_model       model id
//!   description_model  model id
//!
//! 200 {"pages": [{"page_number": 1, "content": "…", "from_llm": false}, …]}
//! ```

use crate::config::ServiceConfig;
use crate::document::PDF_MEDIA_TYPE;
use crate::error::{SubmissionError, WorkbenchError};
use crate::pages::{PageCollection, PageResult};
use crate::session::SubmissionRequest;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest error body kept in a [`SubmissionError::Service`].
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Performs one extraction attempt.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// Send `request` and return the validated pages, or why it failed.
    ///
    /// Implementations make exactly one attempt.
    async fn parse(&self, request: &SubmissionRequest) -> Result<PageCollection, SubmissionError>;
}

/// [`ExtractionService`] over HTTP using `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpExtractionService {
    client: reqwest::Client,
    config: ServiceConfig,
}

impl HttpExtractionService {
    pub fn new(config: ServiceConfig) -> Result<Self, WorkbenchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| WorkbenchError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn build_form(request: &SubmissionRequest) -> Result<Form, SubmissionError> {
        let cfg = &request.configuration;
        let file = Part::bytes(request.document.bytes().to_vec())
            .file_name(request.document.name().to_string())
            .mime_str(PDF_MEDIA_TYPE)
            .map_err(|e| SubmissionError::Transport {
                detail: format!("could not build upload: {e}"),
            })?;
        Ok(Form::new()
            .part("file", file)
            .text("api_key", cfg.credential.expose().to_string())
            .text("layout_model", cfg.layout_model.clone())
            .text("description_model", cfg.description_model.clone()))
    }
}

#[async_trait]
impl ExtractionService for HttpExtractionService {
    async fn parse(&self, request: &SubmissionRequest) -> Result<PageCollection, SubmissionError> {
        let url = self.config.parse_url(request.configuration.provider);
        let form = Self::build_form(request)?;
        let start = Instant::now();
        info!(
            "Submitting '{}' ({} bytes) to {}",
            request.document.name(),
            request.document.len(),
            url
        );

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                let detail = if e.is_timeout() {
                    format!("request timed out after {}s", self.config.request_timeout_secs)
                } else {
                    e.to_string()
                };
                warn!("Submission to {} failed: {}", url, detail);
                SubmissionError::Transport { detail }
            })?;

        let status = response.status();
        if !status.is_success() {
            // The body of an error response is not assumed to be JSON.
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            warn!("Extraction service answered HTTP {}", status.as_u16());
            return Err(SubmissionError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SubmissionError::Transport {
                detail: format!("reading response body: {e}"),
            })?;
        let pages = parse_response(&bytes)?;
        debug!(
            "Received {} pages ({} layout-dependent) in {}ms",
            pages.len(),
            pages.layout_dependent_count(),
            start.elapsed().as_millis()
        );
        Ok(pages)
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    pages: Vec<WirePage>,
}

#[derive(Debug, Deserialize)]
struct WirePage {
    page_number: usize,
    content: String,
    #[serde(alias = "_from_llm", alias = "is_layout_dependent")]
    from_llm: bool,
}

/// Decode and validate a success body.
///
/// Anything other than a `pages` array of well-formed, densely numbered
/// entries is a [`SubmissionError::MalformedResponse`].
pub fn parse_response(body: &[u8]) -> Result<PageCollection, SubmissionError> {
    let wire: WireResponse =
        serde_json::from_slice(body).map_err(|e| SubmissionError::MalformedResponse {
            detail: e.to_string(),
        })?;
    PageCollection::from_unordered(
        wire.pages
            .into_iter()
            .map(|p| PageResult::new(p.page_number, p.content, p.from_llm))
            .collect(),
    )
}
