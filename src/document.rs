// 📄 Document readers - price document file → ordered text lines
//
// The extractor only sees lines. Readers flatten whatever the file is into
// one ordered stream; page breaks disappear so a category that starts on
// one page carries on to the next.

use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Form feed some text converters emit between pages.
const PAGE_BREAK: char = '\u{c}';

/// Turns a document into lines.
pub trait DocumentReader {
    fn read_lines(&self, path: &Path) -> Result<Vec<String>>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Split converted text into lines, dropping page-break characters.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.replace(PAGE_BREAK, ""))
        .collect()
}

/// Plain text (already converted) price lists.
pub struct TextReader;

impl DocumentReader for TextReader {
    fn read_lines(&self, path: &Path) -> Result<Vec<String>> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read text file: {}", path.display()))?;
        Ok(split_lines(&text))
    }

    fn name(&self) -> &'static str {
        "text"
    }
}

/// PDF price lists, flattened with `pdf-extract`.
#[cfg(feature = "pdf")]
pub struct PdfReader;

#[cfg(feature = "pdf")]
impl DocumentReader for PdfReader {
    fn read_lines(&self, path: &Path) -> Result<Vec<String>> {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read PDF file: {}", path.display()))?;
        let text = pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|e| anyhow!("Failed to extract text from PDF {}: {}", path.display(), e))?;
        Ok(split_lines(&text))
    }

    fn name(&self) -> &'static str {
        "pdf"
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Pick a reader by file extension.
#[cfg(feature = "pdf")]
pub fn reader_for(path: &Path) -> Result<Box<dyn DocumentReader>> {
    if is_pdf(path) {
        return Ok(Box::new(PdfReader));
    }
    Ok(Box::new(TextReader))
}

#[cfg(not(feature = "pdf"))]
pub fn reader_for(path: &Path) -> Result<Box<dyn DocumentReader>> {
    if is_pdf(path) {
        bail!(
            "PDF support not compiled in; rebuild with --features pdf or pass a text file: {}",
            path.display()
        );
    }
    Ok(Box::new(TextReader))
}

/// Read `path` with the matching reader.
pub fn load_lines(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        bail!("Document not found: {}", path.display());
    }
    let reader = reader_for(path)?;
    let lines = reader.read_lines(path)?;
    info!(reader = reader.name(), lines = lines.len(), path = %path.display(), "Document loaded");
    Ok(lines)
}
