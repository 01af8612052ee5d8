//! Result presenter: page-by-page comparison of original vs. extracted.
//!
//! The presenter owns a `current_page` cursor over a validated
//! [`PageCollection`] and a view mode:
//!
//! * [`ViewMode::Paired`] — original page and extracted content side by side.
//! * [`ViewMode::Sequential`] — the two shown as switchable tabs.
//!
//! Narrow viewports (below [`NARROW_BREAKPOINT`]) always get `Sequential`
//! and the user cannot override it. Viewport width comes from an injected
//! [`ViewportSource`]; the presenter subscribes in [`ResultPresenter::mount`]
//! and the subscription ends with [`ResultPresenter::unmount`] (or drop).

use crate::document::DisplayRef;
use crate::pages::{PageCollection, PageResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;
use tracing::debug;

/// Viewports narrower than this are forced into [`ViewMode::Sequential`].
pub const NARROW_BREAKPOINT: u32 = 768;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Paired,
    Sequential,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewMode::Paired => "side by side",
            ViewMode::Sequential => "tabbed",
        })
    }
}

/// Visible tab in [`ViewMode::Sequential`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Original,
    Extracted,
}

/// Something that reports the viewport width and its changes.
pub trait ViewportSource {
    /// Start observing. Dropping the receiver ends the subscription.
    fn subscribe(&self) -> watch::Receiver<u32>;
}

/// A [`ViewportSource`] backed by a `tokio::sync::watch` channel.
#[derive(Debug)]
pub struct WatchViewport {
    tx: watch::Sender<u32>,
}

impl WatchViewport {
    pub fn new(width: u32) -> Self {
        let (tx, _rx) = watch::channel(width);
        Self { tx }
    }

    /// Publish a resize.
    pub fn set_width(&self, width: u32) {
        self.tx.send_replace(width);
    }

    pub fn width(&self) -> u32 {
        *self.tx.borrow()
    }

    /// Live subscriptions; zero once every presenter has unmounted.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl ViewportSource for WatchViewport {
    fn subscribe(&self) -> watch::Receiver<u32> {
        self.tx.subscribe()
    }
}

/// Two-state classification badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutBadge {
    Dependent,
    Independent,
}

impl LayoutBadge {
    pub fn for_page(page: &PageResult) -> Self {
        if page.is_layout_dependent {
            LayoutBadge::Dependent
        } else {
            LayoutBadge::Independent
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LayoutBadge::Dependent => "Layout Dependent",
            LayoutBadge::Independent => "Layout Independent",
        }
    }

    pub fn is_active(self) -> bool {
        self == LayoutBadge::Dependent
    }
}

impl fmt::Display for LayoutBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Extracted content, prepared for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum ExtractedContent {
    /// Markup from layout-aware extraction; render as structured text.
    Structured(String),
    /// Plain text; render as a flowing paragraph.
    Plain(String),
}

impl ExtractedContent {
    pub fn for_page(page: &PageResult) -> Self {
        if page.is_layout_dependent {
            ExtractedContent::Structured(structured_markup(&page.content))
        } else {
            ExtractedContent::Plain(plain_text(&page.content))
        }
    }

    pub fn text(&self) -> &str {
        match self {
            ExtractedContent::Structured(s) | ExtractedContent::Plain(s) => s,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, ExtractedContent::Structured(_))
    }
}

/// The region of the original document matching the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OriginalRegion {
    pub page_number: usize,
    /// Page-addressed locator; `None` once the document reference was released.
    pub locator: Option<String>,
    /// Changes whenever document or page changes. Embedded viewers keyed on
    /// it reload instead of showing a stale page.
    pub reload_key: String,
}

/// Everything needed to draw the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageView {
    pub page_number: usize,
    pub total_pages: usize,
    pub view_mode: ViewMode,
    /// Visible tab; `None` in paired mode where both panes are visible.
    pub active_tab: Option<Tab>,
    /// Whether the user may switch view mode right now.
    pub view_mode_locked: bool,
    pub original: OriginalRegion,
    pub extracted: ExtractedContent,
    pub badge: LayoutBadge,
    pub can_go_previous: bool,
    pub can_go_next: bool,
}

/// Navigable comparison view over one page collection.
pub struct ResultPresenter {
    display: Option<DisplayRef>,
    pages: PageCollection,
    current_page: usize,
    mode: ViewMode,
    active_tab: Tab,
    viewport: watch::Receiver<u32>,
    narrow: bool,
}

impl fmt::Debug for ResultPresenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultPresenter")
            .field("display", &self.display)
            .field("total_pages", &self.pages.len())
            .field("current_page", &self.current_page)
            .field("mode", &self.mode)
            .field("active_tab", &self.active_tab)
            .field("narrow", &self.narrow)
            .finish()
    }
}

impl ResultPresenter {
    /// Start presenting `pages`, subscribing to `viewport`.
    pub fn mount(
        display: Option<DisplayRef>,
        pages: PageCollection,
        viewport: &dyn ViewportSource,
    ) -> Self {
        let mut rx = viewport.subscribe();
        let width = *rx.borrow_and_update();
        let narrow = width < NARROW_BREAKPOINT;
        debug!(
            "Presenter mounted: {} pages, viewport {}px",
            pages.len(),
            width
        );
        Self {
            display,
            pages,
            current_page: 1,
            mode: if narrow {
                ViewMode::Sequential
            } else {
                ViewMode::Paired
            },
            active_tab: Tab::default(),
            viewport: rx,
            narrow,
        }
    }

    /// Stop observing the viewport.
    pub fn unmount(self) {
        debug!("Presenter unmounted at page {}", self.current_page);
    }

    pub fn pages(&self) -> &PageCollection {
        &self.pages
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn can_go_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn can_go_next(&self) -> bool {
        self.current_page < self.total_pages()
    }

    /// Jump to page `n`. Out-of-range requests are ignored; returns whether
    /// the cursor moved.
    pub fn go_to_page(&mut self, n: usize) -> bool {
        if n < 1 || n > self.total_pages() || n == self.current_page {
            return false;
        }
        self.current_page = n;
        true
    }

    pub fn previous_page(&mut self) -> bool {
        match self.current_page.checked_sub(1) {
            Some(n) => self.go_to_page(n),
            None => false,
        }
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.current_page + 1)
    }

    /// Effective view mode after applying any pending viewport change.
    pub fn view_mode(&mut self) -> ViewMode {
        self.sync_viewport();
        if self.narrow {
            ViewMode::Sequential
        } else {
            self.mode
        }
    }

    /// Whether manual view-mode changes are currently refused.
    pub fn is_view_mode_locked(&mut self) -> bool {
        self.sync_viewport();
        self.narrow
    }

    /// Switch view mode. Refused (returns `false`) in narrow viewports.
    pub fn set_view_mode(&mut self, mode: ViewMode) -> bool {
        if self.is_view_mode_locked() {
            return false;
        }
        self.mode = mode;
        true
    }

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    /// Choose the visible tab for sequential mode.
    pub fn select_tab(&mut self, tab: Tab) {
        self.active_tab = tab;
    }

    /// Build the view model for `current_page`.
    pub fn render(&mut self) -> PageView {
        let view_mode = self.view_mode();
        let total_pages = self.total_pages();
        let page_number = self.current_page;
        let (extracted, badge) = match self.pages.get(page_number) {
            Some(page) => (ExtractedContent::for_page(page), LayoutBadge::for_page(page)),
            // The cursor is kept within 1..=len of a non-empty collection.
            None => (ExtractedContent::Plain(String::new()), LayoutBadge::Independent),
        };
        let display_id = self.display.as_ref().map(|d| d.id()).unwrap_or(0);
        PageView {
            page_number,
            total_pages,
            view_mode,
            active_tab: (view_mode == ViewMode::Sequential).then_some(self.active_tab),
            view_mode_locked: self.narrow,
            original: OriginalRegion {
                page_number,
                locator: self
                    .display
                    .as_ref()
                    .and_then(|d| d.page_locator(page_number)),
                reload_key: format!("{display_id}:{page_number}"),
            },
            extracted,
            badge,
            can_go_previous: self.can_go_previous(),
            can_go_next: self.can_go_next(),
        }
    }

    fn sync_viewport(&mut self) {
        // A closed channel means the source is gone; keep the last width.
        if !self.viewport.has_changed().unwrap_or(false) {
            return;
        }
        let width = *self.viewport.borrow_and_update();
        let narrow = width < NARROW_BREAKPOINT;
        if narrow != self.narrow {
            self.narrow = narrow;
            self.mode = if narrow {
                ViewMode::Sequential
            } else {
                ViewMode::Paired
            };
            debug!("Viewport {}px: switched to {} view", width, self.mode);
        }
    }
}

// ── Content preparation ──────────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

static RE_PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n\s*").unwrap());

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Keep markup as delivered; only line endings and blank runs are normalised.
fn structured_markup(input: &str) -> String {
    let s = input.replace("\r\n", "\n").replace('\r', "\n");
    let s = s
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    RE_BLANK_LINES.replace_all(s.trim_matches('\n'), "\n\n").to_string()
}

/// Reflow each paragraph onto one line; paragraphs stay separated.
fn plain_text(input: &str) -> String {
    let s = input.replace("\r\n", "\n");
    RE_PARAGRAPH_BREAK
        .split(s.trim())
        .map(|para| RE_WHITESPACE.replace_all(para.trim(), " ").to_string())
        .filter(|para| !para.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
