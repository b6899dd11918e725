use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Title/meta tokens read per description or keywords field.
pub const DEFAULT_META_TOKEN_CAP: usize = 10;
pub const DEFAULT_PROXIMITY_STEP_BUDGET: usize = 10_000;

/// On-disk encoding of the inverted index artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IndexFormat {
    #[default]
    Json,
    Bincode,
}

impl IndexFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            IndexFormat::Json => "inverted_index.json",
            IndexFormat::Bincode => "inverted_index.bin",
        }
    }
}

impl FromStr for IndexFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(IndexFormat::Json),
            "bincode" | "bin" => Ok(IndexFormat::Bincode),
            other => Err(format!("unknown index format '{other}' (expected json or bincode)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub meta_token_cap: usize,
    pub format: IndexFormat,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self { meta_token_cap: DEFAULT_META_TOKEN_CAP, format: IndexFormat::default() }
    }
}

/// How the proximity window is searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProximityStrategy {
    /// Anchored nearest-neighbour chain. Fast, not always minimal.
    #[default]
    Greedy,
    /// Exact minimum window over the sorted position lists.
    SlidingWindow,
}

impl FromStr for ProximityStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "greedy" => Ok(ProximityStrategy::Greedy),
            "sliding-window" | "exact" => Ok(ProximityStrategy::SlidingWindow),
            other => Err(format!("unknown proximity strategy '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScorerConfig {
    pub proximity: ProximityStrategy,
    /// Search steps allowed per document before the proximity signal is dropped.
    pub proximity_step_budget: usize,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self { proximity: ProximityStrategy::default(), proximity_step_budget: DEFAULT_PROXIMITY_STEP_BUDGET }
    }
}
