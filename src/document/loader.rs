use std::panic;
use std::path::PathBuf;

use log::{debug, info};

use crate::error::{RagError, Result};

/// Text of a single PDF page and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub content: String,
    pub source: String,
    pub page: usize,
}

/// Anything that yields page text in reading order.
pub trait PageSource {
    fn load_pages(&self) -> Result<Vec<PageRecord>>;

    fn describe(&self) -> String;
}

pub struct PdfLoader {
    path: PathBuf,
}

impl PdfLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Extracts every page in order. Any extraction failure fails the whole
    /// load; there is no partial result.
    pub fn load(&self) -> Result<Vec<PageRecord>> {
        if !self.path.is_file() {
            return Err(RagError::Document(format!(
                "PDF not found: {}",
                self.path.display()
            )));
        }

        let path = self.path.clone();
        // pdf-extract panics on some malformed font tables.
        let pages = panic::catch_unwind(move || pdf_extract::extract_text_by_pages(&path))
            .map_err(|_| {
                RagError::Document(format!(
                    "PDF extraction aborted on {}",
                    self.path.display()
                ))
            })?
            .map_err(|e| {
                RagError::Document(format!("Failed to read {}: {}", self.path.display(), e))
            })?;

        let source = self.path.to_string_lossy().to_string();
        let records: Vec<PageRecord> = pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| PageRecord {
                content: text.replace('\0', ""),
                source: source.clone(),
                page: i + 1,
            })
            .collect();

        debug!(
            "{} pages carry text",
            records.iter().filter(|p| !p.content.trim().is_empty()).count()
        );
        info!("📄 Loaded {} pages from {}", records.len(), source);
        Ok(records)
    }
}

impl PageSource for PdfLoader {
    fn load_pages(&self) -> Result<Vec<PageRecord>> {
        self.load()
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
