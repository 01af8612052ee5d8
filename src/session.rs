//! Session controller: the upload → configure → submit state machine.
//!
//! ```text
//!            select_document            edit config             submit
//!  Empty ─────────────────▶ FileSelected ─────────▶ Configuring ───────▶ Submitting
//!    ▲                           ▲                    ▲      ▲              │
//!    │ remove_document           │ select_document    │      │ edit/retry   ├──▶ Processed
//!    └──── (any state with a document) ───────────────┘      └──────────────┴──▶ SubmissionFailed
//! ```
//!
//! Every user action is a [`SessionEvent`] applied through
//! [`Session::transition`]. The call is synchronous and atomic: a rejected
//! event returns `Err` and leaves the session exactly as it was, and
//! side effects such as "provider changed ⇒ models reset to that provider's
//! defaults" happen inside the same call, so a stale provider/model pair is
//! never observable.
//!
//! Submitting is split in two events so the network call can happen outside
//! the state machine: `Submit` yields a [`SubmissionRequest`] carrying a
//! [`SubmissionTicket`], and `Settle` applies the outcome for that ticket.
//! Removing the document or tearing the session down invalidates the ticket,
//! so a late answer for a session that moved on is discarded.
//! [`Session::submit`] drives both halves against an [`ExtractionService`].

use crate::catalog::{ModelCatalog, ModelRole, Provider};
use crate::document::{DisplayHost, DisplayRef, Document, TempFileDisplayHost};
use crate::error::{SubmissionError, WorkbenchError};
use crate::observer::ObserverHandle;
use crate::pages::PageCollection;
use crate::service::ExtractionService;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No document selected.
    Empty,
    /// A document is selected and the configuration has not been touched since.
    FileSelected,
    /// The user is filling in credential, provider and models.
    Configuring,
    /// One request is in flight.
    Submitting,
    /// The last submission produced a page collection.
    Processed,
    /// The last submission failed; everything needed for a retry is kept.
    SubmissionFailed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Empty => "empty",
            SessionState::FileSelected => "file selected",
            SessionState::Configuring => "configuring",
            SessionState::Submitting => "submitting",
            SessionState::Processed => "processed",
            SessionState::SubmissionFailed => "submission failed",
        };
        f.write_str(s)
    }
}

/// An opaque API secret. `Debug` never prints it.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Credential(<empty>)")
        } else {
            f.write_str("Credential(***)")
        }
    }
}

/// The form as currently filled in. Fields may still be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    pub credential: Credential,
    pub provider: Option<Provider>,
    pub layout_model: Option<String>,
    pub description_model: Option<String>,
}

/// A complete configuration, snapshotted when a submission starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionConfig {
    pub credential: Credential,
    pub provider: Provider,
    pub layout_model: String,
    pub description_model: String,
}

/// Identifies one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmissionTicket(u64);

impl SubmissionTicket {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Everything the extraction service needs for one attempt.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub ticket: SubmissionTicket,
    pub document: Document,
    pub configuration: SubmissionConfig,
}

/// A user action or a submission outcome.
#[derive(Debug)]
pub enum SessionEvent {
    SelectDocument(Document),
    RemoveDocument,
    SetCredential(String),
    SelectProvider(Provider),
    SelectLayoutModel(String),
    SelectDescriptionModel(String),
    Submit,
    Settle {
        ticket: SubmissionTicket,
        outcome: Result<PageCollection, SubmissionError>,
    },
}

/// What the host must do after an accepted event.
#[derive(Debug)]
pub enum Effect {
    /// Nothing beyond re-rendering.
    None,
    /// Send this request to the extraction service, then settle it.
    Dispatch(SubmissionRequest),
    /// A settlement for a ticket that is no longer current was dropped.
    Discarded,
}

/// The single document-processing session.
pub struct Session {
    catalog: ModelCatalog,
    host: Box<dyn DisplayHost>,
    observer: Option<ObserverHandle>,
    state: SessionState,
    document: Option<Document>,
    display: Option<DisplayRef>,
    config: Configuration,
    in_flight: Option<SubmissionTicket>,
    next_ticket: u64,
    pages: Option<PageCollection>,
    failure: Option<SubmissionError>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("document", &self.document)
            .field("display", &self.display)
            .field("config", &self.config)
            .field("in_flight", &self.in_flight)
            .field("pages", &self.pages.as_ref().map(|p| p.len()))
            .field("failure", &self.failure)
            .finish()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl Session {
    /// Built-in catalog, temp-file display host, no observer.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder {
            catalog: None,
            host: None,
            observer: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Displayable reference of the current document.
    pub fn display_ref(&self) -> Option<&DisplayRef> {
        self.display.as_ref()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Results of the last successful submission for the current document.
    ///
    /// Kept while the configuration is edited; cleared once a later
    /// submission fails, so they never sit next to a failure notice.
    pub fn pages(&self) -> Option<&PageCollection> {
        self.pages.as_ref()
    }

    /// Why the last submission failed, while in `SubmissionFailed`.
    pub fn last_error(&self) -> Option<&SubmissionError> {
        self.failure.as_ref()
    }

    /// User-visible notice for the last failure.
    pub fn failure_notice(&self) -> Option<String> {
        self.failure.as_ref().map(SubmissionError::notice)
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Required fields that are still unset, in form order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.document.is_none() {
            missing.push("document");
        }
        if self.config.credential.is_empty() {
            missing.push("credential");
        }
        if self.config.provider.is_none() {
            missing.push("provider");
        }
        if self.config.layout_model.is_none() {
            missing.push("layout model");
        }
        if self.config.description_model.is_none() {
            missing.push("description model");
        }
        missing
    }

    /// True iff every required field is set and nothing is in flight.
    pub fn can_submit(&self) -> bool {
        !self.is_submitting() && self.missing_fields().is_empty()
    }

    // ── Convenience wrappers over `transition` ───────────────────────────

    pub fn select_document(&mut self, document: Document) -> Result<(), WorkbenchError> {
        self.transition(SessionEvent::SelectDocument(document))
            .map(|_| ())
    }

    /// Validate an in-memory selection, then select it. Non-PDF input is
    /// rejected before the session is touched.
    pub fn select_document_bytes(
        &mut self,
        name: impl Into<String>,
        media_type: &str,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<(), WorkbenchError> {
        let document = Document::from_bytes(name, media_type, bytes)?;
        self.select_document(document)
    }

    pub fn remove_document(&mut self) -> Result<(), WorkbenchError> {
        self.transition(SessionEvent::RemoveDocument).map(|_| ())
    }

    pub fn set_credential(&mut self, value: impl Into<String>) -> Result<(), WorkbenchError> {
        self.transition(SessionEvent::SetCredential(value.into()))
            .map(|_| ())
    }

    pub fn select_provider(&mut self, provider: Provider) -> Result<(), WorkbenchError> {
        self.transition(SessionEvent::SelectProvider(provider))
            .map(|_| ())
    }

    pub fn select_layout_model(&mut self, model: impl Into<String>) -> Result<(), WorkbenchError> {
        self.transition(SessionEvent::SelectLayoutModel(model.into()))
            .map(|_| ())
    }

    pub fn select_description_model(
        &mut self,
        model: impl Into<String>,
    ) -> Result<(), WorkbenchError> {
        self.transition(SessionEvent::SelectDescriptionModel(model.into()))
            .map(|_| ())
    }

    /// First half of a submission: move to `Submitting` and hand out the request.
    pub fn begin_submission(&mut self) -> Result<SubmissionRequest, WorkbenchError> {
        match self.transition(SessionEvent::Submit)? {
            Effect::Dispatch(request) => Ok(request),
            other => Err(WorkbenchError::Internal(format!(
                "submit produced {other:?} instead of a request"
            ))),
        }
    }

    /// Second half of a submission. Returns `false` if the ticket was stale.
    pub fn settle(
        &mut self,
        ticket: SubmissionTicket,
        outcome: Result<PageCollection, SubmissionError>,
    ) -> bool {
        matches!(
            self.transition(SessionEvent::Settle { ticket, outcome }),
            Ok(Effect::None)
        )
    }

    /// Run one complete submission against `service`.
    ///
    /// Fails fast with no state change when [`Session::can_submit`] is false.
    /// Otherwise exactly one request is made and the returned state is
    /// `Processed` or `SubmissionFailed`. If the returned future is dropped
    /// before the service answers, the attempt is abandoned and the session
    /// goes back to `Configuring`.
    pub async fn submit(
        &mut self,
        service: &dyn ExtractionService,
    ) -> Result<SessionState, WorkbenchError> {
        let request = self.begin_submission()?;
        let mut guard = InFlightGuard {
            session: self,
            ticket: request.ticket,
            armed: true,
        };
        let outcome = service.parse(&request).await;
        guard.armed = false;
        guard.session.settle(request.ticket, outcome);
        Ok(guard.session.state)
    }

    /// Drop any in-flight attempt and release the displayable reference.
    ///
    /// Called automatically when the session is dropped.
    pub fn teardown(&mut self) {
        if let Some(ticket) = self.in_flight.take() {
            debug!("Teardown discards in-flight submission #{}", ticket.0);
        }
        self.release_display();
    }

    // ── The state machine ────────────────────────────────────────────────

    /// Apply one event. On `Err` nothing changed.
    pub fn transition(&mut self, event: SessionEvent) -> Result<Effect, WorkbenchError> {
        match event {
            SessionEvent::SelectDocument(document) => {
                self.reject_while_submitting()?;
                let display = self.host.allocate(&document)?;
                self.release_display();
                info!(
                    "Selected '{}' ({} KB)",
                    document.name(),
                    document.size_kb()
                );
                self.document = Some(document);
                self.display = Some(display);
                self.pages = None;
                self.failure = None;
                self.set_state(SessionState::FileSelected);
                Ok(Effect::None)
            }

            SessionEvent::RemoveDocument => {
                if self.document.is_none() {
                    return Err(WorkbenchError::NoDocument);
                }
                if let Some(ticket) = self.in_flight.take() {
                    warn!("Document removed; submission #{} will be discarded", ticket.0);
                }
                self.release_display();
                self.document = None;
                self.pages = None;
                self.failure = None;
                self.set_state(SessionState::Empty);
                Ok(Effect::None)
            }

            SessionEvent::SetCredential(value) => {
                self.reject_while_submitting()?;
                self.config.credential = Credential::new(value);
                self.mark_configuring();
                Ok(Effect::None)
            }

            SessionEvent::SelectProvider(provider) => {
                self.reject_while_submitting()?;
                let (layout, description) = self.catalog.models(provider).defaults();
                let (layout, description) = (layout.to_string(), description.to_string());
                debug!(
                    "Provider '{}' selected; models reset to {} / {}",
                    provider, layout, description
                );
                self.config.provider = Some(provider);
                self.config.layout_model = Some(layout);
                self.config.description_model = Some(description);
                self.mark_configuring();
                Ok(Effect::None)
            }

            SessionEvent::SelectLayoutModel(model) => {
                self.select_model(ModelRole::Layout, model)?;
                Ok(Effect::None)
            }

            SessionEvent::SelectDescriptionModel(model) => {
                self.select_model(ModelRole::Description, model)?;
                Ok(Effect::None)
            }

            SessionEvent::Submit => {
                self.reject_while_submitting()?;
                let request = self.prepare_request()?;
                self.next_ticket += 1;
                self.in_flight = Some(request.ticket);
                self.failure = None;
                info!(
                    "Submission #{}: '{}' via {} ({} / {})",
                    request.ticket.0,
                    request.document.name(),
                    request.configuration.provider,
                    request.configuration.layout_model,
                    request.configuration.description_model
                );
                if let Some(ref o) = self.observer {
                    o.on_submission_start(
                        request.document.name(),
                        request.configuration.provider,
                    );
                }
                self.set_state(SessionState::Submitting);
                Ok(Effect::Dispatch(request))
            }

            SessionEvent::Settle { ticket, outcome } => {
                if self.in_flight != Some(ticket) {
                    debug!("Discarding outcome of stale submission #{}", ticket.0);
                    return Ok(Effect::Discarded);
                }
                self.in_flight = None;
                match outcome {
                    Ok(pages) => {
                        info!(
                            "Submission #{} succeeded: {} pages, {} layout-dependent",
                            ticket.0,
                            pages.len(),
                            pages.layout_dependent_count()
                        );
                        if let Some(ref o) = self.observer {
                            o.on_submission_complete(pages.len(), pages.layout_dependent_count());
                        }
                        self.pages = Some(pages);
                        self.set_state(SessionState::Processed);
                    }
                    Err(error) => {
                        warn!("Submission #{} failed: {}", ticket.0, error);
                        if let Some(ref o) = self.observer {
                            o.on_submission_failed(&error);
                        }
                        self.pages = None;
                        self.failure = Some(error);
                        self.set_state(SessionState::SubmissionFailed);
                    }
                }
                Ok(Effect::None)
            }
        }
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn reject_while_submitting(&self) -> Result<(), WorkbenchError> {
        if self.in_flight.is_some() {
            Err(WorkbenchError::SubmissionInFlight)
        } else {
            Ok(())
        }
    }

    fn select_model(&mut self, role: ModelRole, model: String) -> Result<(), WorkbenchError> {
        self.reject_while_submitting()?;
        let provider = self.config.provider.ok_or(WorkbenchError::NoProviderSelected)?;
        self.catalog.check(provider, role, &model)?;
        match role {
            ModelRole::Layout => self.config.layout_model = Some(model),
            ModelRole::Description => self.config.description_model = Some(model),
        }
        self.mark_configuring();
        Ok(())
    }

    fn prepare_request(&self) -> Result<SubmissionRequest, WorkbenchError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(WorkbenchError::NotReady { missing });
        }
        match (
            &self.document,
            self.config.provider,
            &self.config.layout_model,
            &self.config.description_model,
        ) {
            (Some(document), Some(provider), Some(layout), Some(description)) => {
                Ok(SubmissionRequest {
                    ticket: SubmissionTicket(self.next_ticket + 1),
                    document: document.clone(),
                    configuration: SubmissionConfig {
                        credential: self.config.credential.clone(),
                        provider,
                        layout_model: layout.clone(),
                        description_model: description.clone(),
                    },
                })
            }
            _ => Err(WorkbenchError::Internal(
                "configuration incomplete after validation".into(),
            )),
        }
    }

    /// Editing the form moves a session with a document into `Configuring`.
    fn mark_configuring(&mut self) {
        match self.state {
            SessionState::FileSelected
            | SessionState::Processed
            | SessionState::SubmissionFailed => self.set_state(SessionState::Configuring),
            SessionState::Empty | SessionState::Configuring | SessionState::Submitting => {}
        }
    }

    /// Forget an in-flight attempt whose driver went away.
    fn abandon(&mut self, ticket: SubmissionTicket) {
        if self.in_flight == Some(ticket) {
            warn!("Submission #{} abandoned before completion", ticket.0);
            self.in_flight = None;
            self.set_state(SessionState::Configuring);
        }
    }

    fn release_display(&mut self) {
        if let Some(display) = self.display.take() {
            self.host.release(&display);
        }
    }

    fn set_state(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        debug!("Session: {} → {}", from, to);
        if let Some(ref o) = self.observer {
            o.on_transition(from, to);
        }
    }
}

/// Abandons the attempt if [`Session::submit`] is dropped mid-flight.
struct InFlightGuard<'a> {
    session: &'a mut Session,
    ticket: SubmissionTicket,
    armed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.abandon(self.ticket);
        }
    }
}

/// Builder for [`Session`].
pub struct SessionBuilder {
    catalog: Option<ModelCatalog>,
    host: Option<Box<dyn DisplayHost>>,
    observer: Option<ObserverHandle>,
}

impl SessionBuilder {
    /// Use a custom provider/model table instead of the built-in one.
    pub fn catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn display_host(mut self, host: impl DisplayHost + 'static) -> Self {
        self.host = Some(Box::new(host));
        self
    }

    pub fn observer(mut self, observer: ObserverHandle) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Session {
        Session {
            catalog: self
                .catalog
                .unwrap_or_else(|| ModelCatalog::builtin().clone()),
            host: self
                .host
                .unwrap_or_else(|| Box::new(TempFileDisplayHost::new())),
            observer: self.observer,
            state: SessionState::Empty,
            document: None,
            display: None,
            config: Configuration::default(),
            in_flight: None,
            next_ticket: 0,
            pages: None,
            failure: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ModelList, ModelOption, ProviderModels};
    use crate::pages::PageResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Display host that counts allocations and releases, no filesystem.
    #[derive(Default, Clone)]
    struct CountingHost {
        live: Arc<AtomicUsize>,
        released: Arc<AtomicUsize>,
        next: Arc<AtomicUsize>,
    }

    impl DisplayHost for CountingHost {
        fn allocate(&mut self, document: &Document) -> Result<DisplayRef, WorkbenchError> {
            let id = self.next.fetch_add(1, Ordering::SeqCst) as u64;
            self.live.fetch_add(1, Ordering::SeqCst);
            Ok(DisplayRef::new(id, format!("memory://{id}/{}", document.name())))
        }

        fn release(&mut self, display: &DisplayRef) {
            if display.is_live() {
                display.invalidate();
                self.live.fetch_sub(1, Ordering::SeqCst);
                self.released.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn live_count(&self) -> usize {
            self.live.load(Ordering::SeqCst)
        }
    }

    fn pdf(name: &str) -> Document {
        Document::from_bytes(name, "application/pdf", b"%PDF-1.4\n".to_vec()).unwrap()
    }

    fn session() -> (Session, CountingHost) {
        let host = CountingHost::default();
        let s = Session::builder().display_host(host.clone()).build();
        (s, host)
    }

    fn ready_session() -> (Session, CountingHost) {
        let (mut s, host) = session();
        s.select_document(pdf("a.pdf")).unwrap();
        s.set_credential("sk-test").unwrap();
        s.select_provider(Provider::OpenAi).unwrap();
        (s, host)
    }

    fn two_pages() -> PageCollection {
        PageCollection::from_unordered(vec![
            PageResult::new(1, "a", false),
            PageResult::new(2, "b", true),
        ])
        .unwrap()
    }

    #[test]
    fn starts_empty() {
        let (s, _) = session();
        assert_eq!(s.state(), SessionState::Empty);
        assert!(!s.can_submit());
        assert_eq!(s.missing_fields().len(), 5);
    }

    #[test]
    fn select_document_moves_to_file_selected() {
        let (mut s, host) = session();
        s.select_document(pdf("a.pdf")).unwrap();
        assert_eq!(s.state(), SessionState::FileSelected);
        assert_eq!(host.live_count(), 1);
        assert!(s.display_ref().unwrap().is_live());
    }

    #[test]
    fn reselecting_releases_previous_reference() {
        let (mut s, host) = session();
        s.select_document(pdf("a.pdf")).unwrap();
        let first = s.display_ref().unwrap().clone();
        s.set_credential("k").unwrap();
        assert_eq!(s.state(), SessionState::Configuring);

        s.select_document(pdf("b.pdf")).unwrap();
        assert_eq!(s.state(), SessionState::FileSelected);
        assert!(!first.is_live());
        assert_eq!(host.live_count(), 1);
        assert_eq!(host.released.load(Ordering::SeqCst), 1);
        assert_eq!(s.document().unwrap().name(), "b.pdf");
        // Configuration survives a document swap.
        assert_eq!(s.configuration().credential.expose(), "k");
    }

    #[test]
    fn non_pdf_selection_leaves_session_untouched() {
        let (mut s, host) = session();
        s.select_document(pdf("a.pdf")).unwrap();
        let before = s.display_ref().unwrap().clone();
        let r = s.select_document_bytes("x.txt", "text/plain", b"hello".to_vec());
        assert!(r.is_err());
        assert_eq!(s.document().unwrap().name(), "a.pdf");
        assert!(before.is_live());
        assert_eq!(host.live_count(), 1);
        assert_eq!(s.state(), SessionState::FileSelected);
    }

    #[test]
    fn remove_document_while_configuring_returns_to_empty() {
        let (mut s, host) = ready_session();
        assert_eq!(s.state(), SessionState::Configuring);
        let display = s.display_ref().unwrap().clone();

        s.remove_document().unwrap();
        assert_eq!(s.state(), SessionState::Empty);
        assert!(s.document().is_none());
        assert!(s.display_ref().is_none());
        assert!(display.page_locator(1).is_none(), "stale reference must not resolve");
        assert_eq!(host.live_count(), 0);
    }

    #[test]
    fn remove_without_document_is_rejected() {
        let (mut s, _) = session();
        assert!(matches!(s.remove_document(), Err(WorkbenchError::NoDocument)));
    }

    #[test]
    fn configuring_without_document_stays_empty() {
        let (mut s, _) = session();
        s.set_credential("k").unwrap();
        s.select_provider(Provider::Gemini).unwrap();
        assert_eq!(s.state(), SessionState::Empty);
        assert_eq!(s.missing_fields(), vec!["document"]);
    }

    #[test]
    fn provider_selection_resets_models_to_defaults() {
        let (mut s, _) = session();
        s.select_provider(Provider::OpenAi).unwrap();
        let c = s.configuration();
        assert_eq!(c.layout_model.as_deref(), Some("gpt-4.1-nano"));
        assert_eq!(c.description_model.as_deref(), Some("gpt-4.1"));

        s.select_layout_model("gpt-4.1-mini").unwrap();
        s.select_provider(Provider::Anthropic).unwrap();
        let models = ModelCatalog::builtin().models(Provider::Anthropic);
        let c = s.configuration();
        assert!(models.layout.contains(c.layout_model.as_deref().unwrap()));
        assert!(models
            .description
            .contains(c.description_model.as_deref().unwrap()));

        // Re-selecting the same provider also resets.
        s.select_provider(Provider::OpenAi).unwrap();
        s.select_layout_model("gpt-4o-mini").unwrap();
        s.select_provider(Provider::OpenAi).unwrap();
        assert_eq!(s.configuration().layout_model.as_deref(), Some("gpt-4.1-nano"));
    }

    #[test]
    fn provider_change_never_leaves_foreign_models() {
        let (mut s, _) = session();
        for first in Provider::ALL {
            for second in Provider::ALL {
                s.select_provider(first).unwrap();
                s.select_provider(second).unwrap();
                let models = s.catalog().models(second);
                let c = s.configuration();
                assert!(models.layout.contains(c.layout_model.as_deref().unwrap()));
                assert!(models
                    .description
                    .contains(c.description_model.as_deref().unwrap()));
            }
        }
    }

    #[test]
    fn defaults_fall_back_to_first_entry() {
        let unmarked = || {
            ProviderModels::new(
                ModelList::new(vec![ModelOption::new("l1", "L1"), ModelOption::new("l2", "L2")])
                    .unwrap(),
                ModelList::new(vec![
                    ModelOption::new("d1", "D1"),
                    ModelOption::new("d2", "D2").marked_default(),
                ])
                .unwrap(),
            )
        };
        let catalog = ModelCatalog::new([
            (Provider::Anthropic, unmarked()),
            (Provider::Gemini, unmarked()),
            (Provider::OpenAi, unmarked()),
        ])
        .unwrap();
        let mut s = Session::builder()
            .catalog(catalog)
            .display_host(CountingHost::default())
            .build();
        s.select_provider(Provider::Gemini).unwrap();
        assert_eq!(s.configuration().layout_model.as_deref(), Some("l1"));
        assert_eq!(s.configuration().description_model.as_deref(), Some("d2"));
    }

    #[test]
    fn model_outside_provider_set_is_rejected() {
        let (mut s, _) = ready_session();
        let before = s.configuration().clone();
        let r = s.select_layout_model("claude-3-5-haiku-latest");
        assert!(matches!(r, Err(WorkbenchError::ModelNotAllowed { .. })));
        let r = s.select_description_model("nonexistent");
        assert!(r.is_err());
        assert_eq!(s.configuration(), &before);
    }

    #[test]
    fn model_before_provider_is_rejected() {
        let (mut s, _) = session();
        assert!(matches!(
            s.select_layout_model("gpt-4.1-nano"),
            Err(WorkbenchError::NoProviderSelected)
        ));
    }

    #[test]
    fn can_submit_over_all_presence_combinations() {
        for mask in 0u8..32 {
            let (mut s, _) = session();
            let has_doc = mask & 1 != 0;
            let has_cred = mask & 2 != 0;
            let has_provider = mask & 4 != 0;
            let has_layout = mask & 8 != 0;
            let has_description = mask & 16 != 0;

            if has_doc {
                s.select_document(pdf("a.pdf")).unwrap();
            }
            if has_cred {
                s.set_credential("k").unwrap();
            }
            if has_provider {
                s.select_provider(Provider::OpenAi).unwrap();
            }
            // Models are only unset independently of the provider by editing
            // the form state directly.
            s.config.provider = has_provider.then_some(Provider::OpenAi);
            s.config.layout_model = has_layout.then(|| "gpt-4.1-nano".to_string());
            s.config.description_model = has_description.then(|| "gpt-4.1".to_string());

            assert_eq!(s.can_submit(), mask == 31, "mask {mask:05b}");
            if mask != 31 {
                let state = s.state();
                assert!(matches!(s.begin_submission(), Err(WorkbenchError::NotReady { .. })));
                assert_eq!(s.state(), state, "rejected submit must not change state");
            }
        }
    }

    #[test]
    fn empty_credential_blocks_submit() {
        let (mut s, _) = ready_session();
        s.set_credential("").unwrap();
        assert!(!s.can_submit());
        assert_eq!(s.missing_fields(), vec!["credential"]);
    }

    #[test]
    fn second_submit_while_in_flight_is_rejected() {
        let (mut s, _) = ready_session();
        let request = s.begin_submission().unwrap();
        assert_eq!(s.state(), SessionState::Submitting);
        assert!(!s.can_submit());
        assert!(matches!(
            s.begin_submission(),
            Err(WorkbenchError::SubmissionInFlight)
        ));
        assert!(s.settle(request.ticket, Ok(two_pages())));
        assert_eq!(s.state(), SessionState::Processed);
        assert_eq!(s.pages().unwrap().len(), 2);
    }

    #[test]
    fn request_snapshots_configuration() {
        let (mut s, _) = ready_session();
        s.select_layout_model("gpt-4.1-mini").unwrap();
        let request = s.begin_submission().unwrap();
        assert_eq!(request.configuration.provider, Provider::OpenAi);
        assert_eq!(request.configuration.layout_model, "gpt-4.1-mini");
        assert_eq!(request.configuration.description_model, "gpt-4.1");
        assert_eq!(request.configuration.credential.expose(), "sk-test");
        assert_eq!(request.document.name(), "a.pdf");
    }

    #[test]
    fn edits_rejected_while_submitting() {
        let (mut s, _) = ready_session();
        let _request = s.begin_submission().unwrap();
        assert!(matches!(
            s.select_provider(Provider::Gemini),
            Err(WorkbenchError::SubmissionInFlight)
        ));
        assert!(s.set_credential("other").is_err());
        assert!(s.select_document(pdf("b.pdf")).is_err());
        assert_eq!(s.configuration().provider, Some(Provider::OpenAi));
        assert_eq!(s.document().unwrap().name(), "a.pdf");
    }

    #[test]
    fn failure_keeps_configuration_and_allows_retry() {
        let (mut s, _) = ready_session();
        let request = s.begin_submission().unwrap();
        s.settle(
            request.ticket,
            Err(SubmissionError::Service {
                status: 500,
                body: "Error parsing PDF".into(),
            }),
        );
        assert_eq!(s.state(), SessionState::SubmissionFailed);
        assert!(s.failure_notice().unwrap().contains("500"));
        assert_eq!(s.document().unwrap().name(), "a.pdf");
        assert_eq!(s.configuration().credential.expose(), "sk-test");
        assert!(s.can_submit());

        let retry = s.begin_submission().unwrap();
        assert_ne!(retry.ticket, request.ticket);
        assert!(s.last_error().is_none());
        s.settle(retry.ticket, Ok(two_pages()));
        assert_eq!(s.state(), SessionState::Processed);
    }

    #[test]
    fn edit_after_failure_moves_to_configuring() {
        let (mut s, _) = ready_session();
        let request = s.begin_submission().unwrap();
        s.settle(
            request.ticket,
            Err(SubmissionError::Transport {
                detail: "refused".into(),
            }),
        );
        s.select_provider(Provider::Gemini).unwrap();
        assert_eq!(s.state(), SessionState::Configuring);
    }

    #[test]
    fn removing_document_discards_in_flight_outcome() {
        let (mut s, host) = ready_session();
        let request = s.begin_submission().unwrap();
        s.remove_document().unwrap();
        assert_eq!(s.state(), SessionState::Empty);
        assert_eq!(host.live_count(), 0);

        assert!(!s.settle(request.ticket, Ok(two_pages())));
        assert_eq!(s.state(), SessionState::Empty);
        assert!(s.pages().is_none());
    }

    #[test]
    fn new_document_clears_previous_results() {
        let (mut s, _) = ready_session();
        let request = s.begin_submission().unwrap();
        s.settle(request.ticket, Ok(two_pages()));
        s.select_document(pdf("b.pdf")).unwrap();
        assert_eq!(s.state(), SessionState::FileSelected);
        assert!(s.pages().is_none());
        assert!(s.can_submit());
    }

    #[test]
    fn teardown_releases_display_and_ticket() {
        let (mut s, host) = ready_session();
        let request = s.begin_submission().unwrap();
        s.teardown();
        assert_eq!(host.live_count(), 0);
        assert!(!s.settle(request.ticket, Ok(two_pages())));
    }

    #[test]
    fn drop_releases_display() {
        let (s, host) = ready_session();
        assert_eq!(host.live_count(), 1);
        drop(s);
        assert_eq!(host.live_count(), 0);
    }

    #[test]
    fn credential_is_redacted_in_debug() {
        let (s, _) = ready_session();
        let dbg = format!("{s:?}");
        assert!(!dbg.contains("sk-test"), "got: {dbg}");
        assert!(dbg.contains("***"));
    }

    #[test]
    fn failed_resubmit_drops_results_of_the_previous_configuration() {
        let (mut s, _) = ready_session();
        let first = s.begin_submission().unwrap();
        s.settle(first.ticket, Ok(two_pages()));
        assert_eq!(s.state(), SessionState::Processed);

        s.select_provider(Provider::Gemini).unwrap();
        assert_eq!(s.state(), SessionState::Configuring);
        assert_eq!(s.pages().map(|p| p.len()), Some(2));

        let retry = s.begin_submission().unwrap();
        s.settle(
            retry.ticket,
            Err(SubmissionError::Service {
                status: 500,
                body: String::new(),
            }),
        );

        assert_eq!(s.state(), SessionState::SubmissionFailed);
        assert!(s.pages().is_none());
        assert_eq!(s.configuration().provider, Some(Provider::Gemini));
        assert!(s.can_submit());
    }

    #[test]
    fn observer_sees_transitions() {
        #[derive(Default)]
        struct Recorder(Mutex<Vec<(SessionState, SessionState)>>);
        impl crate::observer::SessionObserver for Recorder {
            fn on_transition(&self, from: SessionState, to: SessionState) {
                self.0.lock().unwrap().push((from, to));
            }
        }

        let recorder = Arc::new(Recorder::default());
        let mut s = Session::builder()
            .display_host(CountingHost::default())
            .observer(recorder.clone())
            .build();
        s.select_document(pdf("a.pdf")).unwrap();
        s.set_credential("k").unwrap();
        s.select_provider(Provider::OpenAi).unwrap();
        let request = s.begin_submission().unwrap();
        s.settle(request.ticket, Ok(two_pages()));

        let seen = recorder.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (SessionState::Empty, SessionState::FileSelected),
                (SessionState::FileSelected, SessionState::Configuring),
                (SessionState::Configuring, SessionState::Submitting),
                (SessionState::Submitting, SessionState::Processed),
            ]
        );
    }
}
