use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Corpus-relative path of a document, e.g. `0/12`.
pub type DocId = String;
/// 1-based token position inside a document body.
pub type Position = u32;

/// One document's entry in a token's postings list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    /// Share of the document's title/meta token occurrences that are this token, in `[0, 1]`.
    pub html_tag_freq: f64,
    /// Ascending body positions.
    pub indices: Vec<Position>,
    /// Zero until the index is finalized.
    pub tf_idf: f64,
}

impl Posting {
    pub fn new(doc_id: DocId, first: Position) -> Self {
        Self { doc_id, html_tag_freq: 0.0, indices: vec![first], tf_idf: 0.0 }
    }

    /// Log-scaled term frequency, `1 + ln(|indices|)`.
    pub fn log_tf(&self) -> f64 {
        1.0 + (self.indices.len() as f64).ln()
    }
}

/// Postings for one token plus its token-level idf.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingsList {
    pub idf: f64,
    /// In document-processing order, at most one posting per document.
    pub postings: Vec<Posting>,
}

impl PostingsList {
    pub fn doc_freq(&self) -> usize { self.postings.len() }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvertedIndex {
    pub terms: BTreeMap<String, PostingsList>,
    /// Number of documents the idf values were computed against.
    pub num_docs: u32,
    /// Set once [`crate::indexing::finalize_tf_idf`] has run.
    pub finalized: bool,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, term: &str) -> Option<&PostingsList> { self.terms.get(term) }

    pub fn contains(&self, term: &str) -> bool { self.terms.contains_key(term) }

    pub fn num_terms(&self) -> usize { self.terms.len() }

    /// Total body occurrences of `term` across the corpus.
    pub fn occurrences(&self, term: &str) -> usize {
        self.get(term).map_or(0, |list| list.postings.iter().map(|p| p.indices.len()).sum())
    }
}
