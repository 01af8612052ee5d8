//! CLI binary for pdfparse-workbench.
//!
//! A thin shim over the library crate: flags become session events, the
//! submission runs behind a spinner, and the result pages are printed (or
//! paged interactively) through the presenter.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdfparse_workbench::config::DEFAULT_BASE_URL;
use pdfparse_workbench::{
    Document, ExtractedContent, HttpExtractionService, ModelCatalog, ModelRole, PageView,
    Provider, ResultPresenter, ServiceConfig, Session, SessionObserver, SessionState,
    SubmissionError, Tab, ViewMode, WatchViewport,
};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Shows a spinner while the extraction service works and a one-line
/// summary once it answers.
struct CliObserver {
    bar: ProgressBar,
    started: Mutex<Option<Instant>>,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::hidden();
        Arc::new(Self {
            bar,
            started: Mutex::new(None),
        })
    }

    fn elapsed(&self) -> String {
        let secs = self
            .started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        format!("{secs:.1}s")
    }
}

impl SessionObserver for CliObserver {
    fn on_submission_start(&self, document_name: &str, provider: Provider) {
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.set_style(style);
        self.bar.set_prefix("Processing");
        self.bar
            .set_message(format!("{document_name} via {}", provider.display_name()));
        self.bar.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut s) = self.started.lock() {
            *s = Some(Instant::now());
        }
    }

    fn on_submission_complete(&self, total_pages: usize, layout_dependent: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages extracted  {}  {}",
            green("✔"),
            bold(&total_pages.to_string()),
            dim(&format!("({layout_dependent} layout-dependent)")),
            dim(&self.elapsed()),
        );
    }

    fn on_submission_failed(&self, error: &SubmissionError) {
        self.bar.finish_and_clear();
        eprintln!("{} {}  {}", red("✘"), red(&error.notice()), dim(&self.elapsed()));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract with OpenAI defaults and print every page
  pdfparse --provider openai report.pdf

  # Pick the models explicitly
  pdfparse --provider anthropic --layout-model claude-3-5-haiku-latest \
           --description-model claude-3-7-sonnet-latest report.pdf

  # Browse the result page by page
  pdfparse --provider gemini --interactive slides.pdf

  # Raw page results as JSON
  pdfparse --provider openai --json report.pdf > pages.json

  # Show available providers and models
  pdfparse --list-models

INTERACTIVE COMMANDS:
  n / p            next / previous page
  g N  (or N)      go to page N
  v paired|tabbed  switch view mode (wide viewports only)
  t original|text  switch tab in tabbed mode
  w WIDTH          simulate a viewport resize
  q                quit

ENVIRONMENT VARIABLES:
  PDFPARSE_API_KEY         Provider API key forwarded to the extraction service
  PDFPARSE_ENDPOINT        Extraction service base URL
  PDFPARSE_PROVIDER        anthropic, gemini or openai
  PDFPARSE_VIEWPORT_WIDTH  Viewport width used to choose the view mode
"#;

/// Send a PDF to the extraction service and compare pages with the original.
#[derive(Parser, Debug)]
#[command(
    name = "pdfparse",
    version,
    about = "Send a PDF to the extraction service and compare pages with the original",
    long_about = "Upload a PDF to a document-extraction service, choose a provider and a \
layout/description model pair, and inspect the per-page results next to the original \
document. Layout-dependent pages are shown as structured markup, the rest as plain text.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    #[arg(required_unless_present = "list_models")]
    input: Option<PathBuf>,

    /// Provider: anthropic, gemini, openai.
    #[arg(long, env = "PDFPARSE_PROVIDER", value_parser = parse_provider)]
    provider: Option<Provider>,

    /// Layout model (defaults to the provider's default).
    #[arg(long, env = "PDFPARSE_LAYOUT_MODEL")]
    layout_model: Option<String>,

    /// Description model (defaults to the provider's default).
    #[arg(long, env = "PDFPARSE_DESCRIPTION_MODEL")]
    description_model: Option<String>,

    /// API key forwarded to the provider.
    #[arg(long, env = "PDFPARSE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Extraction service base URL.
    #[arg(long, env = "PDFPARSE_ENDPOINT", default_value = DEFAULT_BASE_URL)]
    endpoint: String,

    /// Whole-request timeout in seconds.
    #[arg(long, env = "PDFPARSE_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Connect timeout in seconds.
    #[arg(long, env = "PDFPARSE_CONNECT_TIMEOUT", default_value_t = 10)]
    connect_timeout: u64,

    /// Start at this page (1-indexed). Without --interactive, print only it.
    #[arg(long)]
    page: Option<usize>,

    /// Initial view mode.
    #[arg(long, value_enum)]
    view: Option<ViewArg>,

    /// Viewport width; below 768 the view is always tabbed.
    #[arg(long, env = "PDFPARSE_VIEWPORT_WIDTH", default_value_t = 1024)]
    width: u32,

    /// Page through the results interactively.
    #[arg(short, long)]
    interactive: bool,

    /// Print the page results as JSON.
    #[arg(long)]
    json: bool,

    /// List providers and models, then exit.
    #[arg(long)]
    list_models: bool,

    /// Disable the spinner.
    #[arg(long, env = "PDFPARSE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFPARSE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, env = "PDFPARSE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ViewArg {
    Paired,
    #[value(alias = "tabbed")]
    Sequential,
}

impl From<ViewArg> for ViewMode {
    fn from(v: ViewArg) -> Self {
        match v {
            ViewArg::Paired => ViewMode::Paired,
            ViewArg::Sequential => ViewMode::Sequential,
        }
    }
}

fn parse_provider(s: &str) -> Result<Provider, String> {
    s.parse::<Provider>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers the interesting part; keep library logs quiet
    // unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.list_models {
        print_catalog(ModelCatalog::builtin());
        return Ok(());
    }

    // ── Service + session ────────────────────────────────────────────────
    let service_config = ServiceConfig::builder()
        .base_url(&cli.endpoint)
        .request_timeout_secs(cli.timeout)
        .connect_timeout_secs(cli.connect_timeout)
        .build()
        .context("Invalid service configuration")?;
    let service = HttpExtractionService::new(service_config)?;

    let mut builder = Session::builder();
    if show_progress {
        builder = builder.observer(CliObserver::new());
    }
    let mut session = builder.build();

    configure_session(&mut session, &cli).await?;

    // ── Submit ───────────────────────────────────────────────────────────
    let state = session
        .submit(&service)
        .await
        .context("Could not start the submission")?;

    if state == SessionState::SubmissionFailed {
        let notice = session.failure_notice().unwrap_or_default();
        let detail = session
            .last_error()
            .map(|e| e.to_string())
            .unwrap_or_default();
        anyhow::bail!("{notice}\n{detail}");
    }

    let pages = session
        .pages()
        .cloned()
        .context("Session finished without page results")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&pages).context("Failed to serialise pages")?;
        println!("{json}");
        return Ok(());
    }

    // ── Present ──────────────────────────────────────────────────────────
    let viewport = WatchViewport::new(cli.width);
    let mut presenter = ResultPresenter::mount(session.display_ref().cloned(), pages, &viewport);

    if let Some(n) = cli.page {
        if n != presenter.current_page() && !presenter.go_to_page(n) {
            anyhow::bail!(
                "Page {} is out of range (document has {} pages)",
                n,
                presenter.total_pages()
            );
        }
    }
    if let Some(view) = cli.view {
        if !presenter.set_view_mode(view.into()) && !cli.quiet {
            eprintln!(
                "{}",
                dim("Viewport is narrow; staying in tabbed view.")
            );
        }
    }

    if cli.interactive {
        run_pager(&mut presenter, &viewport).await?;
    } else if cli.page.is_some() {
        print_view(&presenter.render());
    } else {
        loop {
            print_view(&presenter.render());
            if !presenter.next_page() {
                break;
            }
        }
    }

    presenter.unmount();
    Ok(())
}

/// Feed the CLI flags into the session as events.
async fn configure_session(session: &mut Session, cli: &Cli) -> Result<()> {
    if let Some(ref input) = cli.input {
        let document = Document::from_path(input)
            .await
            .with_context(|| format!("Cannot use '{}'", input.display()))?;
        session.select_document(document)?;
        if !cli.quiet {
            if let Some(doc) = session.document() {
                eprintln!("{} {} {}", cyan("◆"), bold(doc.name()), dim(&format!("({} KB)", doc.size_kb())));
            }
        }
    }

    if let Some(ref key) = cli.api_key {
        session.set_credential(key.clone())?;
    }

    if let Some(provider) = cli.provider {
        session.select_provider(provider)?;
        if let Some(ref model) = cli.layout_model {
            session
                .select_layout_model(model.clone())
                .context("Invalid --layout-model")?;
        }
        if let Some(ref model) = cli.description_model {
            session
                .select_description_model(model.clone())
                .context("Invalid --description-model")?;
        }
    } else if cli.layout_model.is_some() || cli.description_model.is_some() {
        anyhow::bail!("--layout-model/--description-model need --provider");
    }

    if !session.can_submit() {
        let missing = session.missing_fields();
        anyhow::bail!(
            "Not ready to submit; missing: {}\nPass --api-key (or PDFPARSE_API_KEY) and --provider.",
            missing.join(", ")
        );
    }
    Ok(())
}

fn print_catalog(catalog: &ModelCatalog) {
    for provider in Provider::ALL {
        println!("{} ({})", bold(provider.display_name()), provider);
        let models = catalog.models(provider);
        for role in [ModelRole::Layout, ModelRole::Description] {
            let list = models.list(role);
            let default_id = &list.default_model().id;
            let entries: Vec<String> = list
                .iter()
                .map(|m| {
                    if &m.id == default_id {
                        format!("{} {}", m.id, dim("(default)"))
                    } else {
                        m.id.clone()
                    }
                })
                .collect();
            println!("  {:<12} {}", role.as_str(), entries.join(", "));
        }
    }
}

fn print_view(view: &PageView) {
    let badge = if view.badge.is_active() {
        red(view.badge.label())
    } else {
        green(view.badge.label())
    };
    println!(
        "\n{}  {}  {}",
        bold(&format!("Page {} of {}", view.page_number, view.total_pages)),
        badge,
        dim(&format!("[{}]", view.view_mode)),
    );

    let original = match view.original.locator {
        Some(ref l) => l.clone(),
        None => dim("(original document no longer available)"),
    };
    let show_original = view.active_tab != Some(Tab::Extracted);
    let show_extracted = view.active_tab != Some(Tab::Original);

    if view.active_tab.is_some() {
        let tab = |t: Tab, label: &str| {
            if view.active_tab == Some(t) {
                bold(&format!("[{label}]"))
            } else {
                dim(label)
            }
        };
        println!("{}  {}", tab(Tab::Original, "PDF Document"), tab(Tab::Extracted, "Extracted Text"));
    }

    if show_original {
        println!("{} {}", cyan("PDF Document:"), original);
    }
    if show_extracted {
        println!("{}", cyan("Extracted Text:"));
        match view.extracted {
            ExtractedContent::Structured(ref text) => {
                for line in text.lines() {
                    println!("  {} {}", dim("│"), line);
                }
            }
            ExtractedContent::Plain(ref text) => {
                for para in text.split("\n\n") {
                    println!("  {para}");
                }
            }
        }
    }

    let prev = if view.can_go_previous { "[p]revious" } else { "" };
    let next = if view.can_go_next { "[n]ext" } else { "" };
    if !prev.is_empty() || !next.is_empty() {
        println!("{}", dim(&format!("{prev}  {next}").trim().to_string()));
    }
}

/// Minimal line-oriented pager over the presenter.
async fn run_pager(presenter: &mut ResultPresenter, viewport: &WatchViewport) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_view(&presenter.render());

    loop {
        eprint!("{} ", cyan("›"));
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or("");
        let arg = parts.next();

        let redraw = match (cmd, arg) {
            ("q", _) | ("quit", _) => break,
            ("n", _) | ("next", _) => presenter.next_page(),
            ("p", _) | ("prev", _) | ("previous", _) => presenter.previous_page(),
            ("g", Some(n)) => match n.parse() {
                Ok(n) => presenter.go_to_page(n),
                Err(_) => false,
            },
            ("v", Some(mode)) => {
                let mode = match mode {
                    "paired" | "side" => Some(ViewMode::Paired),
                    "tabbed" | "sequential" => Some(ViewMode::Sequential),
                    _ => None,
                };
                match mode {
                    Some(m) if presenter.set_view_mode(m) => true,
                    Some(_) => {
                        eprintln!("{}", dim("Viewport is narrow; view mode is fixed to tabbed."));
                        false
                    }
                    None => false,
                }
            }
            ("t", Some(tab)) => {
                match tab {
                    "original" | "pdf" => presenter.select_tab(Tab::Original),
                    "text" | "extracted" => presenter.select_tab(Tab::Extracted),
                    _ => {}
                }
                true
            }
            ("w", Some(width)) => match width.parse() {
                Ok(w) => {
                    viewport.set_width(w);
                    true
                }
                Err(_) => false,
            },
            ("", None) => false,
            (n, None) if n.chars().all(|c| c.is_ascii_digit()) => {
                n.parse().map(|n| presenter.go_to_page(n)).unwrap_or(false)
            }
            _ => {
                eprintln!("{}", dim("n, p, g N, v paired|tabbed, t original|text, w WIDTH, q"));
                false
            }
        };

        if redraw {
            print_view(&presenter.render());
        }
    }
    Ok(())
}
