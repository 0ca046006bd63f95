// src/record.rs
// =============================================================================
// The data shapes that flow through the pipeline and out of the API.
//
// A PageRecord is created by the fetcher (one per URL), possibly rewritten by
// the cleaner, and finally serialized into the response. It is either
// success-shaped (title, headings, paragraphs, optional tables) or
// failure-shaped (error message), never both.
//
// JSON shapes:
//   success: { "url": ..., "title": ..., "h1": [...], "h2": [...],
//              "h3": [...], "paragraphs": [...], "tables": [...]?,
//              "html": "..."? }
//   failure: { "url": ..., "error": "..." }
// =============================================================================

use serde::Serialize;

// One table: rows of cell texts, in document order
pub type Table = Vec<Vec<String>>;

// Structured content extracted from one rendered page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageContent {
    /// Document title, None when the page has no <title>
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub h3: Vec<String>,
    pub paragraphs: Vec<String>,
    /// Only present when table extraction was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<Table>>,
    /// The rendered document, only present when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

// The outcome of fetching one URL
//
// untagged: the JSON carries no extra discriminator, only the variant's
// own fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PageOutcome {
    Failed { error: String },
    Content(PageContent),
}

// The result of fetching one PageURL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRecord {
    pub url: String,
    #[serde(flatten)]
    pub outcome: PageOutcome,
}

impl PageRecord {
    pub fn success(url: impl Into<String>, content: PageContent) -> Self {
        Self {
            url: url.into(),
            outcome: PageOutcome::Content(content),
        }
    }

    pub fn failure(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            outcome: PageOutcome::Failed {
                error: error.into(),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, PageOutcome::Content(_))
    }

    pub fn content(&self) -> Option<&PageContent> {
        match &self.outcome {
            PageOutcome::Content(content) => Some(content),
            PageOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            PageOutcome::Failed { error } => Some(error),
            PageOutcome::Content(_) => None,
        }
    }
}
