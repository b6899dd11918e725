//! Error type shared by indexing, persistence and scoring.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the engine.
///
/// Only [`EngineError::Extraction`] is recoverable during a build: the
/// offending document is skipped and the build carries on.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to extract document {doc_id}: {reason}")]
    Extraction { doc_id: String, reason: String },

    #[error("corpus contains no indexable documents")]
    EmptyCorpus,

    #[error("no inverted index at {0}; build the index first")]
    IndexUnavailable(PathBuf),

    #[error("corrupt inverted index: {0}")]
    CorruptIndex(String),

    #[error("document {0} is not listed in the corpus bookkeeping")]
    UnknownDocument(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
}

impl EngineError {
    pub fn extraction(doc_id: impl Into<String>, reason: impl ToString) -> Self {
        EngineError::Extraction { doc_id: doc_id.into(), reason: reason.to_string() }
    }

    /// True for failures that only affect a single document.
    pub fn is_document_local(&self) -> bool {
        matches!(self, EngineError::Extraction { .. } | EngineError::UnknownDocument(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
