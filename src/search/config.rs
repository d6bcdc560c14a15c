//! Search configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Search service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Path to the search index directory; the project and page indexes
    /// live in subdirectories of it
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Index writer heap size in bytes (default: 50MB)
    #[serde(default = "default_writer_heap_size")]
    pub writer_heap_size: usize,

    /// Commit after every write so changes become searchable immediately
    #[serde(default = "default_true")]
    pub realtime_indexing: bool,

    /// Results per page on the search page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Hits scoring below this floor are dropped as noise
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Maximum hits fetched from the engine per search
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Highlight fragments per field for project results
    #[serde(default = "default_project_fragments")]
    pub project_fragments: usize,

    /// Highlight fragments per field for page results and inner hits
    #[serde(default = "default_page_fragments")]
    pub page_fragments: usize,

    /// Maximum characters per highlight fragment
    #[serde(default = "default_fragment_max_chars")]
    pub fragment_max_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            writer_heap_size: default_writer_heap_size(),
            realtime_indexing: true,
            page_size: default_page_size(),
            min_score: default_min_score(),
            max_results: default_max_results(),
            project_fragments: default_project_fragments(),
            page_fragments: default_page_fragments(),
            fragment_max_chars: default_fragment_max_chars(),
        }
    }
}

fn default_index_path() -> PathBuf {
    PathBuf::from("./data/search_index")
}

fn default_writer_heap_size() -> usize {
    50_000_000
}

fn default_true() -> bool {
    true
}

fn default_page_size() -> usize {
    9
}

fn default_min_score() -> f32 {
    1.0
}

fn default_max_results() -> usize {
    1000
}

fn default_project_fragments() -> usize {
    3
}

fn default_page_fragments() -> usize {
    1
}

fn default_fragment_max_chars() -> usize {
    150
}
