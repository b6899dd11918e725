//! Static-corpus web search: inverted-index construction with TF-IDF weights
//! and a ranker combining cosine similarity, HTML-tag importance and term
//! proximity.

pub mod config;
pub mod corpus;
pub mod error;
pub mod extract;
pub mod index;
pub mod indexing;
pub mod persist;
pub mod proximity;
pub mod scorer;
pub mod tokenizer;

pub use config::{IndexFormat, IndexerConfig, ProximityStrategy, ScorerConfig};
pub use corpus::{CorpusMetadata, DocumentSource, FsCorpus};
pub use error::{EngineError, Result};
pub use index::{DocId, InvertedIndex, Position, Posting, PostingsList};
pub use indexing::{build_index, finalize_tf_idf, BuildReport};
pub use persist::{ensure_index, BuildOutcome, IndexPaths};
pub use scorer::{ScoredDocument, SearchContext};
