//! Document parsers keyed by file extension.
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use lopdf::Document;
use tracing::{debug, warn};

use ragdb_core::traits::DocumentParser;
use ragdb_core::types::ParsedSpan;
use ragdb_core::{Error, Result};

const PAGE_BREAK: char = '\x0c';

/// UTF-8 text and markdown. Pages are separated by form feeds, paragraphs
/// by blank lines; every non-empty paragraph becomes one span.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextParser;

impl DocumentParser for PlainTextParser {
    fn kinds(&self) -> &[&'static str] { &["txt", "text", "md", "markdown"] }

    fn parse(&self, bytes: &[u8], _kind: &str) -> Result<Vec<ParsedSpan>> {
        let text = String::from_utf8_lossy(bytes);
        let mut spans = Vec::new();
        let mut offset = 0usize;
        for (page_idx, page) in text.split(PAGE_BREAK).enumerate() {
            let page_no = u32::try_from(page_idx + 1).unwrap_or(u32::MAX);
            paragraphs(page, offset, page_no, &mut spans);
            // +1 for the form feed itself.
            offset += page.chars().count() + 1;
        }
        Ok(spans)
    }
}

/// Text layer of a PDF, one page at a time. Offsets count characters of the
/// extracted pages joined by form feeds, the same layout `PlainTextParser`
/// reads. Pages without a text layer yield nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfParser;

impl DocumentParser for PdfParser {
    fn kinds(&self) -> &[&'static str] { &["pdf"] }

    fn parse(&self, bytes: &[u8], _kind: &str) -> Result<Vec<ParsedSpan>> {
        let doc = Document::load_mem(bytes).map_err(|e| Error::invalid("pdf document", e.to_string()))?;
        let pages = doc.get_pages();
        let mut spans = Vec::new();
        let mut offset = 0usize;
        for &page_no in pages.keys() {
            let text = match doc.extract_text(&[page_no]) {
                Ok(text) => text,
                Err(e) => {
                    warn!(page = page_no, error = %e, "no text extracted from pdf page");
                    String::new()
                }
            };
            paragraphs(&text, offset, page_no, &mut spans);
            offset += text.chars().count() + 1;
        }
        debug!(pages = pages.len(), spans = spans.len(), "parsed pdf");
        Ok(spans)
    }
}

fn paragraphs(page: &str, page_start: usize, page_no: u32, out: &mut Vec<ParsedSpan>) {
    let mut start: Option<usize> = None;
    let mut buf = String::new();
    let mut pos = page_start;
    let mut flush = |buf: &mut String, start: &mut Option<usize>, end: usize| {
        if let Some(s) = start.take() {
            let trimmed = buf.trim_end();
            let len = trimmed.chars().count();
            if len > 0 {
                out.push(ParsedSpan { text: trimmed.to_string(), page: Some(page_no), span: Some((s, (s + len).min(end))) });
            }
            buf.clear();
        }
    };
    for line in page.split_inclusive('\n') {
        let line_len = line.chars().count();
        if line.trim().is_empty() {
            flush(&mut buf, &mut start, pos);
        } else {
            if start.is_none() {
                let lead = line.chars().take_while(|c| c.is_whitespace()).count();
                start = Some(pos + lead);
                buf.push_str(line.trim_start());
            } else {
                buf.push_str(line);
            }
        }
        pos += line_len;
    }
    flush(&mut buf, &mut start, pos);
}

/// Lower-cased extension of `filename`, without the dot.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename).extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase)
}

#[derive(Clone, Default)]
pub struct ParserRegistry {
    by_kind: HashMap<String, Arc<dyn DocumentParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self { Self::default() }

    /// Registry with the bundled parsers.
    pub fn with_defaults() -> Self { Self::new().register(Arc::new(PlainTextParser)).register(Arc::new(PdfParser)) }

    /// Later registrations replace earlier ones for the same extension.
    pub fn register(mut self, parser: Arc<dyn DocumentParser>) -> Self {
        for kind in parser.kinds() {
            self.by_kind.insert(kind.to_ascii_lowercase(), Arc::clone(&parser));
        }
        self
    }

    /// Parser and normalized extension for `filename`.
    pub fn resolve(&self, filename: &str) -> Result<(Arc<dyn DocumentParser>, String)> {
        let kind = extension_of(filename).unwrap_or_default();
        match self.by_kind.get(&kind) {
            Some(parser) => Ok((Arc::clone(parser), kind)),
            None => Err(Error::UnsupportedFormat { kind: if kind.is_empty() { filename.to_string() } else { kind } }),
        }
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.by_kind.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}
