//! Fixed-size character chunking with overlap.
//!
//! Each page is cut independently with a sliding window of `chunk_size`
//! characters that advances by `chunk_size - chunk_overlap`. Windows never
//! cross a page break, and the last window of a page may be shorter.

use crate::rag::document::Document;
use crate::types::{AppError, Result};
use quire_vector::VectorMetadata;

/// A contiguous slice of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Stable identifier, `chunk-{ordinal}`.
    pub id: String,
    /// Position of the chunk across the whole document.
    pub ordinal: usize,
    /// Page the chunk was cut from (1-based).
    pub page: u32,
    /// Offset of the first character within the page, in characters.
    pub offset: usize,
    pub text: String,
}

impl Chunk {
    /// Metadata stored next to the chunk's vector in the index.
    pub fn metadata(&self) -> VectorMetadata {
        VectorMetadata::from_pairs([("page", i64::from(self.page)), ("offset", self.offset as i64)])
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    /// Create a chunker. `chunk_overlap` must be smaller than `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(AppError::Configuration("chunk_size must be > 0".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Cut every page of `document` into chunks, in page order.
    ///
    /// Blank pages contribute nothing. Fails with [`AppError::EmptyInput`]
    /// when the document has no pages or only blank ones.
    pub fn split(&self, document: &Document) -> Result<Vec<Chunk>> {
        if document.pages.is_empty() {
            return Err(AppError::EmptyInput(format!(
                "document {} has no pages",
                document.source
            )));
        }

        let mut chunks = Vec::new();
        for page in &document.pages {
            if page.text.trim().is_empty() {
                continue;
            }

            for (offset, text) in self.windows(&page.text) {
                let ordinal = chunks.len();
                chunks.push(Chunk {
                    id: format!("chunk-{}", ordinal),
                    ordinal,
                    page: page.number,
                    offset,
                    text: text.to_string(),
                });
            }
        }

        if chunks.is_empty() {
            return Err(AppError::EmptyInput(format!(
                "every page of {} is empty",
                document.source
            )));
        }

        Ok(chunks)
    }

    /// Character windows over `text` as `(char offset, slice)` pairs.
    fn windows<'a>(&self, text: &'a str) -> Vec<(usize, &'a str)> {
        // Byte position of every char boundary, including the end of the text.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = boundaries.len() - 1;
        if char_count == 0 {
            return Vec::new();
        }

        let step = self.chunk_size - self.chunk_overlap;
        let mut windows = Vec::with_capacity(char_count / step + 1);
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(char_count);
            windows.push((start, &text[boundaries[start]..boundaries[end]]));
            if end == char_count {
                break;
            }
            start += step;
        }
        windows
    }
}
