//! Query scoring over a finalized index.
//!
//! `score = cosine + tag + proximity`, where cosine is the ltc.ltc similarity
//! restricted to the query terms, tag is the mean html-tag frequency of the
//! matched terms and proximity is `matched terms / smallest window`. Only
//! documents matching at least half of the distinct query terms (rounded up)
//! are scored at all.

use crate::config::{IndexFormat, ScorerConfig};
use crate::corpus::CorpusMetadata;
use crate::error::{EngineError, Result};
use crate::index::{DocId, InvertedIndex, Position};
use crate::persist::{load_index, IndexPaths};
use crate::proximity::proximity_score;
use crate::tokenizer::query_terms;
use serde::Serialize;
use std::collections::HashMap;

/// One ranked result with its individual signals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
    pub doc_id: DocId,
    pub url: String,
    pub score: f64,
    pub cosine: f64,
    pub tag: f64,
    pub proximity: f64,
}

/// Finalized index plus corpus bookkeeping. Immutable, safe to share between queries.
#[derive(Debug, Clone)]
pub struct SearchContext {
    index: InvertedIndex,
    metadata: CorpusMetadata,
    config: ScorerConfig,
}

#[derive(Default)]
struct DocAccumulator<'a> {
    dot: f64,
    norm_sq: f64,
    // log-tf only, used when every query term has zero idf
    dot_tf: f64,
    norm_sq_tf: f64,
    matched: usize,
    tag_sum: f64,
    positions: Vec<&'a [Position]>,
}

impl SearchContext {
    pub fn new(index: InvertedIndex, metadata: CorpusMetadata, config: ScorerConfig) -> Result<Self> {
        if !index.finalized {
            return Err(EngineError::CorruptIndex("index has not been finalized".into()));
        }
        Ok(Self { index, metadata, config })
    }

    /// Load the persisted index. Fails with `IndexUnavailable` if it was never built.
    pub fn load(paths: &IndexPaths, format: IndexFormat, metadata: CorpusMetadata, config: ScorerConfig) -> Result<Self> {
        let index = load_index(paths, format)?;
        tracing::info!(num_terms = index.num_terms(), num_docs = index.num_docs, "loaded inverted index");
        Self::new(index, metadata, config)
    }

    pub fn index(&self) -> &InvertedIndex { &self.index }

    pub fn metadata(&self) -> &CorpusMetadata { &self.metadata }

    /// Ranked `(docID, URL)` pairs, best first.
    pub fn retrieve(&self, query: &str) -> Vec<(DocId, String)> {
        self.retrieve_scored(query).into_iter().map(|d| (d.doc_id, d.url)).collect()
    }

    pub fn retrieve_scored(&self, query: &str) -> Vec<ScoredDocument> {
        let terms: Vec<String> = query_terms(query).into_iter().filter(|t| self.index.contains(t)).collect();
        if terms.is_empty() {
            return Vec::new();
        }

        // distinct terms in order of first occurrence, with raw query frequency
        let mut distinct: Vec<(&str, u32)> = Vec::new();
        for term in &terms {
            match distinct.iter_mut().find(|(t, _)| *t == term.as_str()) {
                Some((_, count)) => *count += 1,
                None => distinct.push((term.as_str(), 1)),
            }
        }
        let threshold = distinct.len().div_ceil(2);

        let mut query_norm_sq = 0.0;
        let mut query_norm_sq_tf = 0.0;
        let mut accumulators: HashMap<&str, DocAccumulator> = HashMap::new();
        for &(term, count) in &distinct {
            let Some(list) = self.index.get(term) else { continue };
            let query_tf = 1.0 + f64::from(count).ln();
            let query_weight = query_tf * list.idf;
            query_norm_sq += query_weight * query_weight;
            query_norm_sq_tf += query_tf * query_tf;

            for posting in &list.postings {
                let acc = accumulators.entry(posting.doc_id.as_str()).or_default();
                let doc_tf = posting.log_tf();
                acc.dot += query_weight * posting.tf_idf;
                acc.norm_sq += posting.tf_idf * posting.tf_idf;
                acc.dot_tf += query_tf * doc_tf;
                acc.norm_sq_tf += doc_tf * doc_tf;
                acc.matched += 1;
                acc.tag_sum += posting.html_tag_freq;
                acc.positions.push(&posting.indices);
            }
        }

        // every selected term occurs in every document: idf carries no signal
        let idf_degenerate = query_norm_sq == 0.0;

        let mut results = Vec::new();
        for (doc_id, acc) in accumulators {
            if acc.matched < threshold {
                continue;
            }
            let Some(url) = self.metadata.url(doc_id) else {
                tracing::warn!(doc_id, "indexed document missing from bookkeeping");
                continue;
            };
            let cosine = if idf_degenerate {
                cosine(acc.dot_tf, query_norm_sq_tf, acc.norm_sq_tf)
            } else {
                cosine(acc.dot, query_norm_sq, acc.norm_sq)
            };
            let tag = acc.tag_sum / acc.matched as f64;
            let proximity = if acc.positions.len() >= 2 {
                proximity_score(&acc.positions, self.config.proximity, self.config.proximity_step_budget)
                    .unwrap_or_else(|| {
                        tracing::debug!(doc_id, "proximity budget exhausted");
                        0.0
                    })
            } else {
                0.0
            };
            results.push(ScoredDocument {
                doc_id: doc_id.to_string(),
                url: url.to_string(),
                score: cosine + tag + proximity,
                cosine,
                tag,
                proximity,
            });
        }

        results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.doc_id.cmp(&b.doc_id)));
        results
    }
}

fn cosine(dot: f64, query_norm_sq: f64, doc_norm_sq: f64) -> f64 {
    let denom = query_norm_sq.sqrt() * doc_norm_sq.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProximityStrategy;
    use crate::extract::ExtractedDocument;
    use crate::indexing::{finalize_tf_idf, merge_document, DocumentPostings};

    fn context(docs: &[(&str, &str)]) -> SearchContext {
        context_with(docs, ScorerConfig::default())
    }

    fn context_with(docs: &[(&str, &str)], config: ScorerConfig) -> SearchContext {
        let mut index = InvertedIndex::new();
        for (id, body) in docs {
            let doc = ExtractedDocument { body: body.split_whitespace().map(str::to_string).collect(), ..Default::default() };
            merge_document(&mut index, DocumentPostings::from_document(id, &doc));
        }
        finalize_tf_idf(&mut index, docs.len() as u32).unwrap();
        let metadata = CorpusMetadata::from_entries(docs.iter().map(|(id, _)| (id.to_string(), format!("example.com/{id}"))));
        SearchContext::new(index, metadata, config).unwrap()
    }

    #[test]
    fn empty_and_unknown_queries_return_nothing() {
        let ctx = context(&[("a", "graph theory"), ("b", "number theory")]);
        assert!(ctx.retrieve("").is_empty());
        assert!(ctx.retrieve("the of and").is_empty());
        assert!(ctx.retrieve("zebra").is_empty());
    }

    #[test]
    fn duplicate_query_terms_do_not_change_threshold() {
        let ctx = context(&[("a", "graph theory"), ("b", "number field"), ("c", "lattice")]);
        let hits = ctx.retrieve("graph graph graph number");
        let ids: Vec<&str> = hits.iter().map(|(d, _)| d.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"a") && ids.contains(&"b"));
    }

    #[test]
    fn ties_break_by_doc_id() {
        let ctx = context(&[("b", "lattice"), ("a", "lattice"), ("c", "graph")]);
        let ids: Vec<String> = ctx.retrieve("lattice").into_iter().map(|(d, _)| d).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn single_matched_term_gets_no_proximity() {
        let ctx = context(&[("a", "graph theory"), ("b", "graph"), ("c", "lattice")]);
        let hits = ctx.retrieve_scored("graph theory");
        let b = hits.iter().find(|d| d.doc_id == "b").unwrap();
        assert_eq!(b.proximity, 0.0);
        let a = hits.iter().find(|d| d.doc_id == "a").unwrap();
        assert_eq!(a.proximity, 1.0);
    }

    #[test]
    fn exhausted_proximity_budget_falls_back_to_cosine_and_tag() {
        let docs = [("a", "graph lattice theory graph"), ("b", "number field"), ("c", "lattice")];
        for strategy in [ProximityStrategy::Greedy, ProximityStrategy::SlidingWindow] {
            let ctx = context_with(&docs, ScorerConfig { proximity: strategy, proximity_step_budget: 0 });
            let hits = ctx.retrieve_scored("graph lattice");
            let a = hits.iter().find(|d| d.doc_id == "a").unwrap();
            assert_eq!(a.proximity, 0.0);
            assert_eq!(a.score, a.cosine + a.tag);
            assert!(a.cosine > 0.0);
        }
        // same document with an ample budget gets the adjacency boost
        let ctx = context(&docs);
        let a = ctx.retrieve_scored("graph lattice").into_iter().find(|d| d.doc_id == "a").unwrap();
        assert_eq!(a.proximity, 1.0);
    }

    #[test]
    fn unfinalized_index_is_rejected() {
        let err = SearchContext::new(InvertedIndex::new(), CorpusMetadata::default(), ScorerConfig::default());
        assert!(matches!(err, Err(EngineError::CorruptIndex(_))));
    }
}
