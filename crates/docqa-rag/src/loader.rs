//! Page extraction for uploaded documents
//!
//! Every supported format is reduced to a list of [`DocumentPage`]s. Paginated
//! formats number their pages from 1; formats without pages report page 0.

use pulldown_cmark::{Event, Parser, TagEnd};
use scraper::Html;
use serde_json::Value;
use std::path::Path;

use docqa_core::{DocumentPage, Error, Result};

/// Elements whose text is never shown to a reader
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Json,
    Text,
    Markdown,
    Html,
}

impl DocumentFormat {
    /// Detect the format from a file name's extension (case-insensitive)
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "json" => Ok(Self::Json),
            "txt" => Ok(Self::Text),
            "md" | "markdown" => Ok(Self::Markdown),
            "html" | "htm" => Ok(Self::Html),
            _ => Err(Error::UnsupportedFormat(format!(
                "{} (supported: pdf, json, txt, md, html)",
                path.display()
            ))),
        }
    }
}

/// Read `path` from disk and extract its pages, attributing them to `source`.
///
/// Blocking: call from `spawn_blocking` inside async code.
pub fn load_file(path: &Path, source: &str) -> Result<Vec<DocumentPage>> {
    let format = DocumentFormat::from_path(source)?;
    let bytes = std::fs::read(path)?;
    load_bytes(format, source, &bytes)
}

/// Extract pages from an in-memory document. Pages with no text are dropped.
pub fn load_bytes(format: DocumentFormat, source: &str, bytes: &[u8]) -> Result<Vec<DocumentPage>> {
    let pages = match format {
        DocumentFormat::Pdf => load_pdf(source, bytes)?,
        DocumentFormat::Json => load_json(source, bytes)?,
        DocumentFormat::Text => vec![DocumentPage::new(source, 0, decode_utf8(source, bytes)?)],
        DocumentFormat::Markdown => {
            vec![DocumentPage::new(source, 0, markdown_to_text(&decode_utf8(source, bytes)?))]
        }
        DocumentFormat::Html => {
            vec![DocumentPage::new(source, 0, html_to_text(&decode_utf8(source, bytes)?))]
        }
    };

    let total = pages.len();
    let pages: Vec<DocumentPage> = pages
        .into_iter()
        .filter(|page| !page.text.trim().is_empty())
        .collect();

    tracing::debug!(
        "Loaded {} of {} pages with text from {}",
        pages.len(),
        total,
        source
    );
    Ok(pages)
}

fn decode_utf8(source: &str, bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::Ingestion(format!("{} is not valid UTF-8: {}", source, e)))
}

fn load_pdf(source: &str, bytes: &[u8]) -> Result<Vec<DocumentPage>> {
    let document = lopdf::Document::load_mem(bytes)
        .map_err(|e| Error::Ingestion(format!("Failed to parse PDF {}: {}", source, e)))?;

    document
        .get_pages()
        .into_keys()
        .map(|number| {
            let text = document.extract_text(&[number]).map_err(|e| {
                Error::Ingestion(format!(
                    "Failed to extract text from page {} of {}: {}",
                    number, source, e
                ))
            })?;
            Ok(DocumentPage::new(source, number, text))
        })
        .collect()
}

fn load_json(source: &str, bytes: &[u8]) -> Result<Vec<DocumentPage>> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::Ingestion(format!("Failed to parse JSON {}: {}", source, e)))?;

    match value {
        Value::Array(items) => Ok(items
            .iter()
            .zip(1u32..)
            .map(|(item, page)| DocumentPage::new(source, page, flatten_json(item)))
            .collect()),
        other => Ok(vec![DocumentPage::new(source, 0, flatten_json(&other))]),
    }
}

/// Render a JSON value as `path: value` lines, one per scalar leaf
pub fn flatten_json(value: &Value) -> String {
    let mut lines = Vec::new();
    flatten_into(value, String::new(), &mut lines);
    lines.join("\n")
}

fn flatten_into(value: &Value, path: String, lines: &mut Vec<String>) {
    let leaf = match value {
        Value::Null => return,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_into(item, format!("{}[{}]", path, i), lines);
            }
            return;
        }
        Value::Object(map) => {
            for (key, item) in map {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                flatten_into(item, child, lines);
            }
            return;
        }
    };

    if path.is_empty() {
        lines.push(leaf);
    } else {
        lines.push(format!("{}: {}", path, leaf));
    }
}

/// Strip markdown syntax, keeping block structure as line breaks
pub fn markdown_to_text(markdown: &str) -> String {
    let mut text = String::new();

    for event in Parser::new(markdown) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak => text.push(' '),
            Event::HardBreak => text.push('\n'),
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::CodeBlock
                | TagEnd::TableRow,
            ) => text.push_str("\n\n"),
            Event::End(TagEnd::TableCell) => text.push(' '),
            _ => {}
        }
    }

    text.trim().to_string()
}

/// Visible text of an HTML document, one line per text node
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);

    document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
            });
            if hidden {
                return None;
            }
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            (!text.is_empty()).then_some(text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
