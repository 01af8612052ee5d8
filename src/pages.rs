//! Per-page extraction results.
//!
//! The service answers with one entry per page. [`PageCollection`] is the
//! only way those entries reach the presenter, and it can only be built from
//! a set whose numbering is exactly `1..=N`: duplicates and gaps are a
//! [`SubmissionError::MalformedResponse`], never silently re-indexed.

use crate::error::SubmissionError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Extraction result for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_number: usize,

    /// Extracted text. Markup (Markdown tables, headings) when the page is
    /// layout-dependent.
    pub content: String,

    /// Whether the service had to use layout-aware extraction for this page.
    pub is_layout_dependent: bool,
}

impl PageResult {
    pub fn new(page_number: usize, content: impl Into<String>, is_layout_dependent: bool) -> Self {
        Self {
            page_number,
            content: content.into(),
            is_layout_dependent,
        }
    }
}

/// Immutable, ordered, densely numbered page results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PageCollection {
    pages: Arc<[PageResult]>,
}

impl PageCollection {
    /// Sort `pages` by number and verify they are exactly `1..=N`, N ≥ 1.
    pub fn from_unordered(mut pages: Vec<PageResult>) -> Result<Self, SubmissionError> {
        if pages.is_empty() {
            return Err(SubmissionError::MalformedResponse {
                detail: "response contains no pages".into(),
            });
        }
        pages.sort_by_key(|p| p.page_number);
        for (i, page) in pages.iter().enumerate() {
            let expected = i + 1;
            if page.page_number == expected {
                continue;
            }
            let detail = if i > 0 && page.page_number == pages[i - 1].page_number {
                format!("page {} appears more than once", page.page_number)
            } else if page.page_number == 0 {
                "page numbers must start at 1, got 0".to_string()
            } else {
                format!(
                    "page numbering has a gap: expected page {expected}, got {}",
                    page.page_number
                )
            };
            return Err(SubmissionError::MalformedResponse { detail });
        }
        Ok(Self {
            pages: pages.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Always false for a validated collection.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Page `n` (1-indexed).
    pub fn get(&self, n: usize) -> Option<&PageResult> {
        n.checked_sub(1).and_then(|i| self.pages.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageResult> {
        self.pages.iter()
    }

    pub fn layout_dependent_count(&self) -> usize {
        self.pages.iter().filter(|p| p.is_layout_dependent).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: usize) -> PageResult {
        PageResult::new(n, format!("p{n}"), n % 2 == 0)
    }

    #[test]
    fn sorts_out_of_order_pages() {
        let c = PageCollection::from_unordered(vec![page(3), page(1), page(2)]).unwrap();
        let numbers: Vec<_> = c.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(c.get(2).unwrap().content, "p2");
    }

    #[test]
    fn get_is_one_indexed() {
        let c = PageCollection::from_unordered(vec![page(1)]).unwrap();
        assert!(c.get(0).is_none());
        assert!(c.get(1).is_some());
        assert!(c.get(2).is_none());
    }

    #[test]
    fn rejects_gap() {
        let err = PageCollection::from_unordered(vec![page(1), page(3)]).unwrap_err();
        assert!(err.to_string().contains("gap"), "got: {err}");
    }

    #[test]
    fn rejects_duplicate() {
        let err = PageCollection::from_unordered(vec![page(1), page(2), page(2)]).unwrap_err();
        assert!(err.to_string().contains("more than once"), "got: {err}");
    }

    #[test]
    fn rejects_zero_based_numbering() {
        let err = PageCollection::from_unordered(vec![page(0), page(1)]).unwrap_err();
        assert!(err.to_string().contains("start at 1"), "got: {err}");
    }

    #[test]
    fn rejects_empty() {
        assert!(PageCollection::from_unordered(vec![]).is_err());
    }

    #[test]
    fn counts_layout_dependent_pages() {
        let c = PageCollection::from_unordered(vec![page(1), page(2), page(3), page(4)]).unwrap();
        assert_eq!(c.layout_dependent_count(), 2);
    }

    #[test]
    fn serialises_as_array() {
        let c = PageCollection::from_unordered(vec![page(1)]).unwrap();
        let json = serde_json::to_value(&c).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["page_number"], 1);
    }
}
