//! Source document loading.
//!
//! A document is read once from disk as UTF-8 text. Pages are separated by
//! the form-feed character, which is what PDF text extractors such as
//! `pdftotext` emit between pages.

use crate::types::{AppError, Result};
use std::path::Path;

/// Page separator inside a document file.
pub const PAGE_BREAK: char = '\u{000C}';

/// One page of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    pub text: String,
}

/// An ordered, immutable sequence of pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Where the document came from (usually its path).
    pub source: String,
    pub pages: Vec<Page>,
}

impl Document {
    /// Build a document from page texts, numbering them from 1.
    pub fn from_pages<I, S>(source: impl Into<String>, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| Page {
                number: i as u32 + 1,
                text: text.into(),
            })
            .collect();

        Self {
            source: source.into(),
            pages,
        }
    }

    /// Split raw text into pages on form feeds.
    ///
    /// A single trailing form feed does not open a new page.
    pub fn from_text(source: impl Into<String>, text: &str) -> Self {
        let text = text.strip_suffix(PAGE_BREAK).unwrap_or(text);
        if text.is_empty() {
            return Self::from_pages(source, Vec::<String>::new());
        }
        Self::from_pages(source, text.split(PAGE_BREAK))
    }

    /// Read a document from disk.
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            AppError::InvalidInput(format!("cannot read document {}: {}", path.display(), e))
        })?;
        let text = String::from_utf8(bytes).map_err(|_| {
            AppError::InvalidInput(format!("document {} is not valid UTF-8", path.display()))
        })?;

        Ok(Self::from_text(path.display().to_string(), &text))
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// True when there are no pages or every page is blank.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }
}
