//! # pdfparse-workbench
//!
//! Submit a PDF to a document-extraction service and compare what came back
//! with the original, page by page.
//!
//! ## Why this crate?
//!
//! Extraction services classify every page: plain-text pages get cheap text
//! extraction, layout-dependent pages (tables, figures, forms) get an LLM
//! description. Judging whether a provider/model pair does a good job means
//! looking at each page next to its source. This crate is the workflow
//! controller for that: a strict session state machine for the
//! upload → configure → submit cycle and a presenter for the results.
//!
//! ## Flow Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Select    Document::from_path / from_bytes (PDF only)
//!  ├─ 2. Configure credential, provider, layout + description model
//!  ├─ 3. Submit    one multipart POST /api/{provider}/parse
//!  ├─ 4. Validate  pages densely numbered 1..N
//!  └─ 5. Present   ResultPresenter: cursor, paired/tabbed view, badges
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfparse_workbench::{
//!     Document, HttpExtractionService, Provider, ResultPresenter, ServiceConfig, Session,
//!     SessionState, WatchViewport,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = HttpExtractionService::new(ServiceConfig::default())?;
//!     let mut session = Session::new();
//!     session.select_document(Document::from_path("document.pdf").await?)?;
//!     session.set_credential(std::env::var("OPENAI_API_KEY")?)?;
//!     session.select_provider(Provider::OpenAi)?;
//!
//!     if session.submit(&service).await? == SessionState::Processed {
//!         let pages = session.pages().cloned().expect("processed session has pages");
//!         let viewport = WatchViewport::new(1280);
//!         let mut presenter =
//!             ResultPresenter::mount(session.display_ref().cloned(), pages, &viewport);
//!         let view = presenter.render();
//!         println!("[{}] {}", view.badge, view.extracted.text());
//!     } else if let Some(notice) = session.failure_notice() {
//!         eprintln!("{notice}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfparse` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Providers
//!
//! | Provider | Default layout model | Default description model |
//! |----------|----------------------|---------------------------|
//! | `anthropic` | `claude-3-5-haiku-latest` | `claude-3-7-sonnet-latest` |
//! | `gemini`    | `gemini-2.0-flash-lite`   | `gemini-2.0-flash`         |
//! | `openai`    | `gpt-4.1-nano`            | `gpt-4.1`                  |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod catalog;
pub mod config;
pub mod document;
pub mod error;
pub mod observer;
pub mod pages;
pub mod presenter;
pub mod service;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use catalog::{ModelCatalog, ModelList, ModelOption, ModelRole, Provider, ProviderModels};
pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use document::{DisplayHost, DisplayRef, Document, TempFileDisplayHost};
pub use error::{SubmissionError, WorkbenchError};
pub use observer::{NoopObserver, ObserverHandle, SessionObserver};
pub use pages::{PageCollection, PageResult};
pub use presenter::{
    ExtractedContent, LayoutBadge, OriginalRegion, PageView, ResultPresenter, Tab, ViewMode,
    ViewportSource, WatchViewport,
};
pub use service::{ExtractionService, HttpExtractionService};
pub use session::{
    Configuration, Credential, Effect, Session, SessionBuilder, SessionEvent, SessionState,
    SubmissionConfig, SubmissionRequest, SubmissionTicket,
};
