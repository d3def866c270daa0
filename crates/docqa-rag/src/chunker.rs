//! Overlapping text chunker
//!
//! Splits extracted document text into passages of at most `chunk_size`
//! characters. Every chunk after the first starts with the last `overlap`
//! characters of its predecessor so context survives the cut. Cuts prefer
//! paragraph, then line, then sentence, then word boundaries, and fall back
//! to a hard character cut when a window contains none of them.

use docqa_core::{DocumentPage, Error, RagConfig, Result};

/// Boundaries tried in order of preference
const SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "! ", "? ", " "];

/// Chunker configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker; `overlap` must be smaller than `chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Configuration("chunk_size must be positive".to_string()));
        }
        if overlap >= chunk_size {
            return Err(Error::Configuration(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Lazily split `text`. The returned iterator can be cloned to restart.
    pub fn chunk<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks {
            text,
            chunk_size: self.chunk_size,
            overlap: self.overlap,
            position: Some(0),
        }
    }

    /// Split one page, keeping a reference back to it on every chunk
    pub fn chunk_page<'a>(&self, page: &'a DocumentPage) -> PageChunks<'a> {
        PageChunks {
            page,
            chunks: self.chunk(&page.text),
            index: 0,
        }
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: 3000,
            overlap: 200,
        }
    }
}

/// Iterator over the chunks of one text
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    chunk_size: usize,
    overlap: usize,
    /// Byte offset where the next chunk starts; `None` once exhausted
    position: Option<usize>,
}

impl<'a> Chunks<'a> {
    fn split_point(&self, floor: usize, window_end: usize) -> usize {
        let window = &self.text[floor..window_end];
        SEPARATORS
            .iter()
            .find_map(|sep| window.rfind(sep).map(|p| floor + p + sep.len()))
            .unwrap_or(window_end)
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        loop {
            let start = self.position?;
            if start >= self.text.len() {
                self.position = None;
                return None;
            }

            let rest = &self.text[start..];
            let window_end = start + byte_offset(rest, self.chunk_size);

            let chunk = if window_end == self.text.len() {
                self.position = None;
                rest
            } else {
                // the cut must leave more than `overlap` characters behind so the
                // next chunk starts strictly later than this one
                let floor = start + byte_offset(rest, self.overlap + 1);
                let end = self.split_point(floor, window_end);
                self.position = Some(back_offset(self.text, end, self.overlap));
                &self.text[start..end]
            };

            if !chunk.trim().is_empty() {
                return Some(chunk);
            }
        }
    }
}

/// A chunk that remembers which page it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageChunk<'a> {
    pub page: &'a DocumentPage,
    /// Position of the chunk within its page
    pub index: usize,
    pub content: &'a str,
}

/// Iterator over the chunks of one page
#[derive(Debug, Clone)]
pub struct PageChunks<'a> {
    page: &'a DocumentPage,
    chunks: Chunks<'a>,
    index: usize,
}

impl<'a> Iterator for PageChunks<'a> {
    type Item = PageChunk<'a>;

    fn next(&mut self) -> Option<PageChunk<'a>> {
        let content = self.chunks.next()?;
        let index = self.index;
        self.index += 1;
        Some(PageChunk {
            page: self.page,
            index,
            content,
        })
    }
}

/// Byte offset of the `n`th character of `s`, or `s.len()` if it is shorter
fn byte_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

/// Byte offset `n` characters before `end`
fn back_offset(text: &str, end: usize, n: usize) -> usize {
    if n == 0 {
        return end;
    }
    text[..end]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}
