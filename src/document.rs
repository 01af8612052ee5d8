//! Document input boundary and displayable references.
//!
//! A [`Document`] can only be built from content that is declared as PDF
//! *and* starts with the `%PDF` magic bytes, so the session never sees
//! anything else. Rejection happens here, before any session state is
//! touched.
//!
//! The original pages are shown by an external renderer (a PDF viewer, a
//! browser tab). Renderers need something they can open, so the session asks
//! a [`DisplayHost`] to *allocate* a [`DisplayRef`] for the selected document
//! and *releases* it when the document is replaced or removed. A released
//! reference stops resolving: stale views get `None`, never old bytes.

use crate::error::WorkbenchError;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// The only media type accepted at the input boundary.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A user-selected PDF: file name plus immutable contents.
///
/// Cloning is cheap; the bytes are shared.
#[derive(Clone)]
pub struct Document {
    name: String,
    bytes: Arc<[u8]>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Document {
    /// Accept an in-memory selection (drag-and-drop, upload widget).
    ///
    /// `media_type` is the type the host declared for the selection;
    /// parameters such as `; charset=binary` are ignored.
    pub fn from_bytes(
        name: impl Into<String>,
        media_type: &str,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<Self, WorkbenchError> {
        let name = name.into();
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if essence != PDF_MEDIA_TYPE {
            return Err(WorkbenchError::UnsupportedMediaType {
                name,
                media_type: media_type.to_string(),
            });
        }
        let bytes = bytes.into();
        check_magic(&name, &bytes)?;
        Ok(Self {
            name,
            bytes: bytes.into(),
        })
    }

    /// Read a local file, validating extension, permissions and magic bytes.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, WorkbenchError> {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        let is_pdf_ext = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if !is_pdf_ext {
            return Err(WorkbenchError::UnsupportedMediaType {
                media_type: media_type_for(&path),
                name,
            });
        }

        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(WorkbenchError::PermissionDenied { path });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(WorkbenchError::FileNotFound { path });
            }
            Err(e) => {
                return Err(WorkbenchError::Internal(format!(
                    "Failed to read '{}': {e}",
                    path.display()
                )));
            }
        };
        check_magic(&name, &bytes)?;

        debug!("Resolved local PDF: {} ({} bytes)", path.display(), bytes.len());
        Ok(Self {
            name,
            bytes: bytes.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Size rounded to whole KiB, as shown next to the file name.
    pub fn size_kb(&self) -> usize {
        (self.bytes.len() + 512) / 1024
    }
}

fn check_magic(name: &str, bytes: &[u8]) -> Result<(), WorkbenchError> {
    if bytes.len() < PDF_MAGIC.len() || &bytes[..PDF_MAGIC.len()] != PDF_MAGIC {
        return Err(WorkbenchError::NotAPdf {
            name: name.to_string(),
            magic: bytes.iter().take(PDF_MAGIC.len()).copied().collect(),
        });
    }
    Ok(())
}

fn media_type_for(path: &Path) -> String {
    match path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .as_deref()
    {
        Some("txt") => "text/plain".into(),
        Some("png") => "image/png".into(),
        Some("jpg") | Some("jpeg") => "image/jpeg".into(),
        Some("html") | Some("htm") => "text/html".into(),
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document".into()
        }
        _ => "application/octet-stream".into(),
    }
}

// ── Displayable references ───────────────────────────────────────────────

/// A handle an external renderer can open to show the original pages.
///
/// Clones share liveness: once the owning host releases the reference,
/// every clone stops resolving.
#[derive(Clone)]
pub struct DisplayRef {
    id: u64,
    locator: Arc<str>,
    live: Arc<AtomicBool>,
}

impl fmt::Debug for DisplayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayRef")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}

impl PartialEq for DisplayRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.live, &other.live)
    }
}

impl DisplayRef {
    /// Create a live reference. Hosts call this from [`DisplayHost::allocate`].
    pub fn new(id: u64, locator: impl Into<String>) -> Self {
        Self {
            id,
            locator: Arc::from(locator.into()),
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Locator of the whole document, or `None` once released.
    pub fn locator(&self) -> Option<&str> {
        self.is_live().then_some(&*self.locator)
    }

    /// Locator addressing a single page (`…#page=N`), or `None` once released.
    ///
    /// The fragment differs per page, so a viewer keyed on the locator reloads
    /// whenever the page changes.
    pub fn page_locator(&self, page: usize) -> Option<String> {
        self.locator().map(|base| format!("{base}#page={page}"))
    }

    /// Mark this reference (and every clone) as released.
    pub fn invalidate(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

/// Allocates and releases displayable references for selected documents.
pub trait DisplayHost: Send {
    /// Make `document` available to an external renderer.
    fn allocate(&mut self, document: &Document) -> Result<DisplayRef, WorkbenchError>;

    /// Free the resources behind `reference` and invalidate it. Idempotent.
    fn release(&mut self, reference: &DisplayRef);

    /// Number of references currently allocated.
    fn live_count(&self) -> usize;
}

/// Materialises each document as a temporary `.pdf` file and hands out
/// `file://` locators. Releasing a reference deletes its file.
#[derive(Debug)]
pub struct TempFileDisplayHost {
    dir: Option<PathBuf>,
    next_id: u64,
    files: HashMap<u64, NamedTempFile>,
}

impl Default for TempFileDisplayHost {
    fn default() -> Self {
        Self::new()
    }
}

impl TempFileDisplayHost {
    /// Place files in the system temp directory.
    pub fn new() -> Self {
        Self {
            dir: None,
            next_id: 1,
            files: HashMap::new(),
        }
    }

    /// Place files in `dir` instead of the system temp directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::new()
        }
    }

    /// Path of a live reference's file.
    pub fn path_of(&self, display: &DisplayRef) -> Option<&Path> {
        if !display.is_live() {
            return None;
        }
        self.files.get(&display.id).map(|f| f.path())
    }
}

impl DisplayHost for TempFileDisplayHost {
    fn allocate(&mut self, document: &Document) -> Result<DisplayRef, WorkbenchError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pdfparse-").suffix(".pdf");
        let file = match self.dir {
            Some(ref dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        let mut file = file.map_err(|e| WorkbenchError::DisplayUnavailable(e.to_string()))?;
        file.write_all(document.bytes())
            .and_then(|_| file.flush())
            .map_err(|e| WorkbenchError::DisplayUnavailable(e.to_string()))?;

        let id = self.next_id;
        self.next_id += 1;
        let display = DisplayRef::new(id, format!("file://{}", file.path().display()));
        info!("Allocated display reference #{} for '{}'", id, document.name());
        self.files.insert(id, file);
        Ok(display)
    }

    fn release(&mut self, reference: &DisplayRef) {
        reference.invalidate();
        let id = reference.id();
        if self.files.remove(&id).is_some() {
            debug!("Released display reference #{}", id);
        }
    }

    fn live_count(&self) -> usize {
        self.files.len()
    }
}
