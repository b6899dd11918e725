//! Corpus bookkeeping: which documents exist, in what order, and their URLs.

use crate::error::{EngineError, Result};
use crate::extract::{extract, parse_page, ExtractedDocument, ParsedPage};
use crate::index::DocId;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const BOOKKEEPING_FILE: &str = "bookkeeping.json";

/// docID → URL mapping in document-processing order.
#[derive(Debug, Clone, Default)]
pub struct CorpusMetadata {
    entries: Vec<(DocId, String)>,
    positions: HashMap<DocId, usize>,
}

impl CorpusMetadata {
    pub fn from_entries<I, D, U>(entries: I) -> Self
    where
        I: IntoIterator<Item = (D, U)>,
        D: Into<DocId>,
        U: Into<String>,
    {
        let mut meta = CorpusMetadata::default();
        for (doc_id, url) in entries {
            let doc_id = doc_id.into();
            if meta.positions.contains_key(&doc_id) {
                continue;
            }
            meta.positions.insert(doc_id.clone(), meta.entries.len());
            meta.entries.push((doc_id, url.into()));
        }
        meta
    }

    /// Parse a bookkeeping JSON object, keeping key order.
    pub fn from_json(json: &str) -> Result<Self> {
        let map: Map<String, Value> = serde_json::from_str(json)?;
        let mut entries = Vec::with_capacity(map.len());
        for (doc_id, url) in map {
            match url {
                Value::String(url) => entries.push((doc_id, url)),
                other => {
                    return Err(EngineError::CorruptIndex(format!(
                        "bookkeeping entry {doc_id} has non-string URL {other}"
                    )))
                }
            }
        }
        Ok(Self::from_entries(entries))
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn url(&self, doc_id: &str) -> Option<&str> {
        self.positions.get(doc_id).map(|&i| self.entries[i].1.as_str())
    }

    pub fn doc_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(d, _)| d.as_str())
    }
}

/// Supplies extracted documents to the indexer.
pub trait DocumentSource: Sync {
    fn load(&self, doc_id: &str) -> Result<ExtractedDocument>;
}

/// A corpus laid out as `<root>/bookkeeping.json` plus one raw HTML file per docID.
#[derive(Debug, Clone)]
pub struct FsCorpus {
    root: PathBuf,
    meta_token_cap: usize,
}

impl FsCorpus {
    pub fn new<P: AsRef<Path>>(root: P, meta_token_cap: usize) -> Self {
        Self { root: root.as_ref().to_path_buf(), meta_token_cap }
    }

    pub fn bookkeeping_path(&self) -> PathBuf { self.root.join(BOOKKEEPING_FILE) }

    pub fn metadata(&self) -> Result<CorpusMetadata> {
        CorpusMetadata::load(&self.bookkeeping_path())
    }

    fn document_path(&self, doc_id: &str) -> Result<PathBuf> {
        let rel = Path::new(doc_id);
        if rel.is_absolute() || rel.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return Err(EngineError::extraction(doc_id, "document path escapes the corpus root"));
        }
        Ok(self.root.join(rel))
    }

    /// Read a raw document as strict UTF-8.
    pub fn read_source(&self, doc_id: &str) -> Result<String> {
        let path = self.document_path(doc_id)?;
        let bytes = fs::read(&path).map_err(|e| EngineError::extraction(doc_id, format!("{}: {e}", path.display())))?;
        String::from_utf8(bytes).map_err(|e| EngineError::extraction(doc_id, e))
    }

    pub fn parse(&self, doc_id: &str) -> Result<ParsedPage> {
        Ok(parse_page(&self.read_source(doc_id)?))
    }
}

impl DocumentSource for FsCorpus {
    fn load(&self, doc_id: &str) -> Result<ExtractedDocument> {
        Ok(extract(&self.read_source(doc_id)?, self.meta_token_cap))
    }
}
