//! Inverted-index construction.
//!
//! Building happens in two phases. Accumulation turns every document into a
//! self-contained [`DocumentPostings`] delta (in parallel) and merges the
//! deltas into the index in bookkeeping order. Finalization then computes idf
//! per token and tf-idf per posting once the corpus size is known.

use crate::corpus::{CorpusMetadata, DocumentSource};
use crate::error::{EngineError, Result};
use crate::extract::ExtractedDocument;
use crate::index::{DocId, InvertedIndex, Position, Posting};
use crate::tokenizer::normalize;
use rayon::prelude::*;
use std::collections::HashMap;

/// Postings a single document contributes, built without touching the shared index.
#[derive(Debug, Clone, Default)]
pub struct DocumentPostings {
    pub doc_id: DocId,
    /// Token and its posting for this document, in order of first occurrence.
    pub entries: Vec<(String, Posting)>,
    slots: HashMap<String, usize>,
}

impl DocumentPostings {
    pub fn from_document(doc_id: &str, doc: &ExtractedDocument) -> Self {
        let mut acc = DocumentPostings { doc_id: doc_id.to_string(), ..Default::default() };
        for (idx, raw) in doc.body.iter().enumerate() {
            if let Some(term) = normalize(raw) {
                acc.record(term, idx as Position + 1);
            }
        }
        acc.attribute_tag_frequency(doc.structural_tokens());
        acc
    }

    fn record(&mut self, term: String, position: Position) {
        match self.slots.get(&term) {
            Some(&slot) => self.entries[slot].1.indices.push(position),
            None => {
                self.slots.insert(term.clone(), self.entries.len());
                self.entries.push((term, Posting::new(self.doc_id.clone(), position)));
            }
        }
    }

    /// Structural tokens without a body posting in this document are skipped
    /// and do not count toward the total.
    fn attribute_tag_frequency<'a>(&mut self, tokens: impl Iterator<Item = &'a str>) {
        let mut counts: HashMap<usize, u32> = HashMap::new();
        let mut total = 0u32;
        for raw in tokens {
            let Some(term) = normalize(raw) else { continue };
            if let Some(&slot) = self.slots.get(&term) {
                *counts.entry(slot).or_insert(0) += 1;
                total += 1;
            }
        }
        if total == 0 {
            return;
        }
        for (slot, count) in counts {
            self.entries[slot].1.html_tag_freq = f64::from(count) / f64::from(total);
        }
    }

    pub fn get(&self, term: &str) -> Option<&Posting> {
        self.slots.get(term).map(|&slot| &self.entries[slot].1)
    }
}

/// Append a document's postings to the index.
pub fn merge_document(index: &mut InvertedIndex, delta: DocumentPostings) {
    for (term, posting) in delta.entries {
        index.terms.entry(term).or_default().postings.push(posting);
    }
}

/// Compute idf for every token and tf-idf for every posting.
pub fn finalize_tf_idf(index: &mut InvertedIndex, num_docs: u32) -> Result<()> {
    if num_docs == 0 {
        return Err(EngineError::EmptyCorpus);
    }
    if let Some((term, list)) = index.terms.iter().find(|(_, l)| l.doc_freq() as u64 > u64::from(num_docs)) {
        return Err(EngineError::CorruptIndex(format!(
            "token {term} appears in {} documents but the corpus has {num_docs}",
            list.doc_freq()
        )));
    }
    let n = f64::from(num_docs);
    index.terms.par_iter_mut().for_each(|(_, list)| {
        let idf = (n / list.doc_freq() as f64).ln();
        list.idf = idf;
        for posting in list.postings.iter_mut() {
            posting.tf_idf = posting.log_tf() * idf;
        }
    });
    index.num_docs = num_docs;
    index.finalized = true;
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub documents_indexed: u32,
    /// Documents left out of the index, with the reason.
    pub skipped: Vec<(DocId, String)>,
    pub num_terms: usize,
}

/// Build and finalize an index over every document listed in `metadata`.
pub fn build_index<S: DocumentSource>(
    source: &S,
    metadata: &CorpusMetadata,
) -> Result<(InvertedIndex, BuildReport)> {
    let doc_ids: Vec<&str> = metadata.doc_ids().collect();
    tracing::info!(documents = doc_ids.len(), "indexing corpus");

    let deltas: Vec<(&str, Result<DocumentPostings>)> = doc_ids
        .par_iter()
        .map(|&doc_id| (doc_id, source.load(doc_id).map(|doc| DocumentPostings::from_document(doc_id, &doc))))
        .collect();

    let mut index = InvertedIndex::new();
    let mut report = BuildReport::default();
    for (doc_id, delta) in deltas {
        match delta {
            Ok(delta) => {
                tracing::debug!(doc_id, terms = delta.entries.len(), "indexed document");
                merge_document(&mut index, delta);
                report.documents_indexed += 1;
            }
            Err(err) if err.is_document_local() => {
                tracing::warn!(doc_id, error = %err, "skipping document");
                report.skipped.push((doc_id.to_string(), err.to_string()));
            }
            Err(err) => return Err(err),
        }
    }

    finalize_tf_idf(&mut index, report.documents_indexed)?;
    report.num_terms = index.num_terms();
    tracing::info!(
        documents_indexed = report.documents_indexed,
        documents_skipped = report.skipped.len(),
        num_terms = report.num_terms,
        "index finalized"
    );
    Ok((index, report))
}
