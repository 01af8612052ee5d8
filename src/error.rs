//! Error types for the pdfparse-workbench library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`WorkbenchError`] — **Rejection**: a user event could not be applied
//!   (not a PDF, model outside the provider's set, submit before the form is
//!   complete). Returned as `Err(WorkbenchError)` from the session and
//!   presenter operations; the state they guard is left untouched.
//!
//! * [`SubmissionError`] — **Per-attempt**: the extraction service could not
//!   be reached, answered with a non-success status, or returned a payload
//!   that cannot be trusted. Stored inside the `SubmissionFailed` session
//!   state so the user can read the notice and retry with the same
//!   configuration.
//!
//! Neither kind is fatal; every failure returns the session to an
//! interactive, retryable state.

use std::path::PathBuf;
use thiserror::Error;

/// Every rejection returned by the pdfparse-workbench library.
///
/// Extraction-attempt failures use [`SubmissionError`] and are stored in the
/// session rather than propagated here.
#[derive(Debug, Error)]
pub enum WorkbenchError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The declared media type of a selection is not `application/pdf`.
    #[error("Unsupported media type '{media_type}' for '{name}': only PDF documents are accepted")]
    UnsupportedMediaType { name: String, media_type: String },

    /// The content was read, but it is not a PDF.
    #[error("File is not a valid PDF: '{name}'\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: Vec<u8> },

    // ── Configuration errors ──────────────────────────────────────────────
    /// Provider identifier outside the closed provider set.
    #[error("Unknown provider '{0}'. Supported providers: anthropic, gemini, openai")]
    UnknownProvider(String),

    /// Model identifier outside the selected provider's allowed set.
    #[error("Model '{model}' is not a {role} model of provider '{provider}'")]
    ModelNotAllowed {
        provider: String,
        role: &'static str,
        model: String,
    },

    /// A model was chosen before any provider.
    #[error("Select a provider before choosing a model")]
    NoProviderSelected,

    /// Submit was requested while required fields are still missing.
    #[error("Cannot submit yet; missing: {}", .missing.join(", "))]
    NotReady { missing: Vec<&'static str> },

    // ── Lifecycle errors ──────────────────────────────────────────────────
    /// A submission is in flight; the session does not accept this event now.
    #[error("A submission is already in flight")]
    SubmissionInFlight,

    /// The event needs a selected document but none is present.
    #[error("No document is selected")]
    NoDocument,

    /// The displayable reference could not be allocated.
    #[error("Failed to prepare document for display: {0}")]
    DisplayUnavailable(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// The provider/model table failed construction-time validation.
    #[error("Invalid model catalog: {0}")]
    InvalidCatalog(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failed extraction attempt.
///
/// Stored in [`crate::session::SessionState::SubmissionFailed`]. The document
/// and configuration survive it, so a retry is one `submit()` away.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum SubmissionError {
    /// The service could not be reached or the connection broke mid-request.
    #[error("Could not reach the extraction service: {detail}")]
    Transport { detail: String },

    /// The service answered with a non-success HTTP status.
    #[error("Extraction service returned HTTP {status}: {body}")]
    Service { status: u16, body: String },

    /// A success response whose payload cannot be handed to the presenter.
    #[error("Extraction service returned an unusable response: {detail}")]
    MalformedResponse { detail: String },
}

impl SubmissionError {
    /// Short, user-facing notice shown while the session waits for a retry.
    pub fn notice(&self) -> String {
        match self {
            SubmissionError::Transport { .. } => {
                "Processing failed: the extraction service is unreachable. Check the endpoint and try again.".to_string()
            }
            SubmissionError::Service { status, .. } if *status == 401 || *status == 403 => {
                format!("Processing failed (HTTP {status}): the API key was rejected.")
            }
            SubmissionError::Service { status, .. } => {
                format!("Processing failed (HTTP {status}). Adjust the configuration or try again.")
            }
            SubmissionError::MalformedResponse { .. } => {
                "Processing failed: the extraction service returned an unexpected response.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_lists_missing_fields() {
        let e = WorkbenchError::NotReady {
            missing: vec!["document", "credential"],
        };
        assert_eq!(e.to_string(), "Cannot submit yet; missing: document, credential");
    }

    #[test]
    fn model_not_allowed_display() {
        let e = WorkbenchError::ModelNotAllowed {
            provider: "openai".into(),
            role: "layout",
            model: "claude-3-opus".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("claude-3-opus"), "got: {msg}");
        assert!(msg.contains("layout"), "got: {msg}");
    }

    #[test]
    fn service_error_display() {
        let e = SubmissionError::Service {
            status: 500,
            body: "boom".into(),
        };
        assert!(e.to_string().contains("HTTP 500"));
        assert!(e.notice().contains("HTTP 500"));
    }

    #[test]
    fn auth_failures_get_a_credential_hint() {
        let e = SubmissionError::Service {
            status: 401,
            body: String::new(),
        };
        assert!(e.notice().contains("API key"));
    }

    #[test]
    fn transport_notice_does_not_leak_detail() {
        let e = SubmissionError::Transport {
            detail: "tcp connect error 10.0.0.1".into(),
        };
        assert!(!e.notice().contains("10.0.0.1"));
    }
}
