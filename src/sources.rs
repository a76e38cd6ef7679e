//! Seams to the surrounding application: text extraction for quote
//! suggestion, and the fetch/convert/suggest interfaces this crate
//! consumes but does not implement (apart from the PDF text extractor,
//! which reuses the page scanner).

use std::collections::BTreeMap;

use lopdf::Document;
use serde::{Deserialize, Serialize};

use crate::job::{AnnotationJob, SourceMetadata};
use crate::text_index::TextIndex;

/// Produces the plain text a quote suggester reads.
pub trait TextExtractor {
    fn extract_text(&self, document: &[u8]) -> anyhow::Result<String>;
}

/// Extractor backed by the same content-stream scanner the locator uses,
/// so suggested quotes are phrased in text the locator can find again.
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, document: &[u8]) -> anyhow::Result<String> {
        let doc = Document::load_mem(document)?;
        let mut pages: Vec<String> = Vec::new();
        for (_, page_id) in doc.get_pages() {
            let index = TextIndex::from_page(&doc, page_id)?;
            pages.push(index.text().to_string());
        }
        Ok(pages.join("\n\n"))
    }
}

/// How strongly a suggested quote supports its criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStrength {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedQuote {
    pub quote: String,
    pub strength: QuoteStrength,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestRequest {
    pub document_text: String,
    pub beneficiary: String,
    #[serde(default)]
    pub beneficiary_variants: Vec<String>,
    pub criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestResponse {
    pub by_criterion: BTreeMap<String, Vec<SuggestedQuote>>,
    #[serde(default)]
    pub notes: String,
}

/// Proposes verbatim quotes per criterion from extracted document text.
pub trait QuoteSuggester {
    fn suggest(&self, request: &SuggestRequest) -> anyhow::Result<SuggestResponse>;
}

/// A fetched source page, before conversion to PDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebPage {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
}

pub trait SourceFetcher {
    fn fetch(&self, url: &str) -> anyhow::Result<WebPage>;
}

pub trait PageConverter {
    fn to_pdf(&self, page: &WebPage) -> anyhow::Result<Vec<u8>>;
}

/// Fan a suggestion response out into one job per criterion, sharing the
/// document bytes and metadata. Criteria with no quotes still get a job;
/// their annotations are metadata callouts only.
pub fn jobs_from_suggestions(
    document: &[u8],
    metadata: &SourceMetadata,
    response: &SuggestResponse,
) -> Vec<AnnotationJob> {
    response
        .by_criterion
        .iter()
        .map(|(criterion, quotes)| AnnotationJob {
            document: document.to_vec(),
            quotes: quotes.iter().map(|q| q.quote.clone()).collect(),
            metadata: metadata.clone(),
            criterion: criterion.clone(),
        })
        .collect()
}
