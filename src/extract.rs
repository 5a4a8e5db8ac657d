// src/extract.rs

//! Minimal text extractor feeding the engine: plain text files and PDFs
//! with a text layer. Scanned PDFs are rejected (no OCR).

use std::path::Path;

use lopdf::Document;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AnalyzeError, Result};

/// Below this many non-whitespace characters a PDF text layer is treated as
/// absent.
const MIN_TEXT_CHARS: usize = 30;
/// Share of image-only pages at which a PDF counts as scanned.
const SCANNED_SHARE: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Text,
    Pdf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMeta {
    pub source_type: SourceType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedText {
    pub text: String,
    pub meta: SourceMeta,
}

fn has_resource(doc: &Document, page: &lopdf::Dictionary, key: &[u8]) -> bool {
    page.get(b"Resources")
        .ok()
        .and_then(|r| doc.dereference(r).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .and_then(|res| res.get(key).ok())
        .and_then(|x| doc.dereference(x).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .is_some_and(|d| !d.is_empty())
}

/// Fraction of pages carrying images but no fonts.
fn image_only_share(doc: &Document) -> f64 {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return 0.0;
    }
    let image_only = pages
        .values()
        .filter_map(|id| doc.get_object(*id).ok())
        .filter_map(|obj| obj.as_dict().ok())
        .filter(|page| has_resource(doc, page, b"XObject") && !has_resource(doc, page, b"Font"))
        .count();
    image_only as f64 / pages.len() as f64
}

/// Text layer of an in-memory PDF.
///
/// Unparseable bytes are an extraction error; image-only documents and
/// documents whose text layer is (nearly) empty are unsupported.
pub fn read_pdf_text(bytes: &[u8], name: &str) -> Result<String> {
    let scanned = || AnalyzeError::UnsupportedSource(format!("{name} looks scanned; OCR is not supported"));

    let doc = Document::load_mem(bytes)
        .map_err(|e| AnalyzeError::Extraction(format!("{name}: cannot parse PDF: {e}")))?;
    let share = image_only_share(&doc);
    if share >= SCANNED_SHARE {
        info!(pdf = name, image_only_share = share, "Rejecting image-only PDF");
        return Err(scanned());
    }

    let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
        warn!(pdf = name, error = %e, "No readable text layer");
        scanned()
    })?;
    let meaningful = text.chars().filter(|c| !c.is_whitespace()).count();
    if meaningful < MIN_TEXT_CHARS {
        info!(pdf = name, chars = meaningful, "Text layer too thin");
        return Err(scanned());
    }
    Ok(text)
}

/// Read a document from disk as UTF-8 text.
///
/// `.pdf` goes through the PDF path; anything else is read as text.
pub fn extract_file(path: impl AsRef<Path>) -> Result<ExtractedText> {
    let path = path.as_ref();
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    if !is_pdf {
        let text = std::fs::read_to_string(path)?;
        info!(path = %path.display(), chars = text.chars().count(), "Read text file");
        return Ok(ExtractedText {
            text,
            meta: SourceMeta { source_type: SourceType::Text },
        });
    }

    let bytes = std::fs::read(path)?;
    let text = read_pdf_text(&bytes, &path.display().to_string())?;
    Ok(ExtractedText {
        text,
        meta: SourceMeta { source_type: SourceType::Pdf },
    })
}
