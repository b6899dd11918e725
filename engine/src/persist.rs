use crate::config::{IndexFormat, IndexerConfig};
use crate::corpus::{CorpusMetadata, DocumentSource};
use crate::error::{EngineError, Result};
use crate::index::{DocId, InvertedIndex, Position, Posting, PostingsList};
use crate::indexing::{build_index, BuildReport};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const IDF_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: usize,
    pub created_at: String,
}

/// One posting as written to disk; idf is repeated on every posting of a token.
#[derive(Debug, Serialize, Deserialize)]
struct StoredPosting {
    #[serde(rename = "docID")]
    doc_id: DocId,
    html_tag_freq: f64,
    indices: Vec<Position>,
    idf: f64,
    tf_idf: f64,
}

type StoredIndex = BTreeMap<String, Vec<StoredPosting>>;

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn artifact(&self, format: IndexFormat) -> PathBuf { self.root.join(format.file_name()) }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// The artifact's existence is the only "already built" signal.
pub fn is_built(paths: &IndexPaths, format: IndexFormat) -> bool {
    paths.artifact(format).is_file()
}

fn to_stored(index: &InvertedIndex) -> StoredIndex {
    index
        .terms
        .iter()
        .map(|(term, list)| {
            let postings = list
                .postings
                .iter()
                .map(|p| StoredPosting {
                    doc_id: p.doc_id.clone(),
                    html_tag_freq: p.html_tag_freq,
                    indices: p.indices.clone(),
                    idf: list.idf,
                    tf_idf: p.tf_idf,
                })
                .collect();
            (term.clone(), postings)
        })
        .collect()
}

fn from_stored(stored: StoredIndex, num_docs: u32) -> Result<InvertedIndex> {
    let mut index = InvertedIndex { num_docs, finalized: true, ..Default::default() };
    for (term, stored_postings) in stored {
        let idf = match stored_postings.first() {
            Some(p) => p.idf,
            None => return Err(EngineError::CorruptIndex(format!("token {term} has an empty postings list"))),
        };
        let mut postings = Vec::with_capacity(stored_postings.len());
        for p in stored_postings {
            if (p.idf - idf).abs() > IDF_TOLERANCE {
                return Err(EngineError::CorruptIndex(format!("token {term} has inconsistent idf values")));
            }
            if p.indices.is_empty() || p.indices.windows(2).any(|w| w[0] >= w[1]) {
                return Err(EngineError::CorruptIndex(format!(
                    "token {term} in {} has missing or unordered positions",
                    p.doc_id
                )));
            }
            postings.push(Posting { doc_id: p.doc_id, html_tag_freq: p.html_tag_freq, indices: p.indices, tf_idf: p.tf_idf });
        }
        index.terms.insert(term, PostingsList { idf, postings });
    }
    Ok(index)
}

/// Write the artifact through a temporary file so a partial write never counts as built.
pub fn save_index(paths: &IndexPaths, index: &InvertedIndex, format: IndexFormat) -> Result<()> {
    create_dir_all(&paths.root)?;
    let target = paths.artifact(format);
    let tmp = target.with_extension("tmp");
    let stored = to_stored(index);
    {
        let mut w = BufWriter::new(File::create(&tmp)?);
        match format {
            IndexFormat::Json => serde_json::to_writer(&mut w, &stored)?,
            IndexFormat::Bincode => bincode::serialize_into(&mut w, &stored)?,
        }
        w.flush()?;
    }
    fs::rename(&tmp, &target)?;
    Ok(())
}

pub fn load_index(paths: &IndexPaths, format: IndexFormat) -> Result<InvertedIndex> {
    let artifact = paths.artifact(format);
    if !artifact.is_file() {
        return Err(EngineError::IndexUnavailable(artifact));
    }
    let reader = BufReader::new(File::open(&artifact)?);
    let stored: StoredIndex = match format {
        IndexFormat::Json => serde_json::from_reader(reader)?,
        IndexFormat::Bincode => bincode::deserialize_from(reader)?,
    };
    let num_docs = match load_meta(paths) {
        Ok(meta) => meta.num_docs,
        Err(err) => {
            tracing::warn!(error = %err, "meta.json unreadable; counting documents from postings");
            let docs: HashSet<&str> = stored.values().flatten().map(|p| p.doc_id.as_str()).collect();
            docs.len() as u32
        }
    };
    from_stored(stored, num_docs)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let buf = fs::read_to_string(paths.meta())?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

#[derive(Debug)]
pub enum BuildOutcome {
    Built(BuildReport),
    /// An artifact already existed; nothing was read or written.
    Skipped,
}

/// Build and persist the index unless the artifact already exists.
pub fn ensure_index<S: DocumentSource>(
    paths: &IndexPaths,
    source: &S,
    metadata: &CorpusMetadata,
    config: &IndexerConfig,
) -> Result<BuildOutcome> {
    if is_built(paths, config.format) {
        tracing::info!(artifact = %paths.artifact(config.format).display(), "index already built; skipping");
        return Ok(BuildOutcome::Skipped);
    }
    let (index, report) = build_index(source, metadata)?;
    save_index(paths, &index, config.format)?;
    let meta = MetaFile {
        num_docs: index.num_docs,
        num_terms: index.num_terms(),
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
    };
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), "index build complete");
    Ok(BuildOutcome::Built(report))
}
