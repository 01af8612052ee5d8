//! Callback trait for session lifecycle events.
//!
//! Inject an [`Arc<dyn SessionObserver>`] via
//! [`crate::session::SessionBuilder::observer`] to follow a session as it
//! moves through its states: a terminal spinner, a status line, an audit log.
//! The library knows nothing about how the host presents these events.
//!
//! # Example
//!
//! ```rust
//! use pdfparse_workbench::{Session, SessionObserver, SessionState};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct History(Mutex<Vec<SessionState>>);
//!
//! impl SessionObserver for History {
//!     fn on_transition(&self, _from: SessionState, to: SessionState) {
//!         self.0.lock().unwrap().push(to);
//!     }
//! }
//!
//! let history = Arc::new(History::default());
//! let mut session = Session::builder()
//!     .observer(history.clone() as Arc<dyn SessionObserver>)
//!     .build();
//! session.set_credential("sk-test").unwrap();
//! ```

use crate::catalog::Provider;
use crate::error::SubmissionError;
use crate::session::SessionState;
use std::sync::Arc;

/// Called by the session controller as events are applied.
///
/// All methods have default no-op implementations so observers only
/// override what they care about. Calls happen synchronously on the thread
/// that drives the session.
pub trait SessionObserver: Send + Sync {
    /// Called after every state change (never for a rejected event).
    fn on_transition(&self, from: SessionState, to: SessionState) {
        let _ = (from, to);
    }

    /// Called once the request for a submission has been prepared.
    ///
    /// # Arguments
    /// * `document_name` — file name of the uploaded PDF
    /// * `provider`      — the backend the request is routed to
    fn on_submission_start(&self, document_name: &str, provider: Provider) {
        let _ = (document_name, provider);
    }

    /// Called when a submission produced a valid page collection.
    ///
    /// # Arguments
    /// * `total_pages`      — number of pages returned
    /// * `layout_dependent` — how many of them needed layout-aware extraction
    fn on_submission_complete(&self, total_pages: usize, layout_dependent: usize) {
        let _ = (total_pages, layout_dependent);
    }

    /// Called when a submission failed; the session is retryable.
    fn on_submission_failed(&self, error: &SubmissionError) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need lifecycle events.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Convenience alias matching the type stored in the session.
pub type ObserverHandle = Arc<dyn SessionObserver>;
