//! Search index management

use crate::search::config::SearchConfig;
use crate::search::document::SearchDocument;
use crate::search::error::{SearchError, SearchResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tantivy::collector::Count;
use tantivy::schema::Schema;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy};
use tokio::sync::RwLock;

/// Index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Index name
    pub name: String,

    /// Total number of entries in the index
    pub total_documents: u64,

    /// Index size in bytes
    pub index_size_bytes: u64,

    /// Number of segments
    pub num_segments: usize,
}

/// Manages one named tantivy index (project or page).
///
/// Commits reload the reader so committed writes are visible to the next
/// search. With realtime indexing disabled, visibility waits for the next
/// batch commit (a rebuild or a clear).
pub struct IndexManager {
    /// Index name, also the subdirectory under the configured index path
    name: String,

    /// The schema
    schema: Schema,

    /// Identity field used to replace and delete documents
    id_field: tantivy::schema::Field,

    /// Index writer (wrapped in RwLock for thread-safety)
    writer: Arc<RwLock<IndexWriter>>,

    /// Index reader
    reader: IndexReader,

    /// Configuration
    config: SearchConfig,
}

impl IndexManager {
    /// Open or create the named index under the configured directory.
    pub async fn new(name: &str, schema: Schema, id_field_name: &str, config: SearchConfig) -> SearchResult<Self> {
        let index_dir = config.index_path.join(name);
        std::fs::create_dir_all(&index_dir).map_err(|e| {
            SearchError::IndexInitFailed(format!("Failed to create index directory: {}", e))
        })?;

        let index = if Self::index_exists(&index_dir) {
            Index::open_in_dir(&index_dir).map_err(|e| {
                SearchError::IndexInitFailed(format!("Failed to open existing index: {}", e))
            })?
        } else {
            Index::create_in_dir(&index_dir, schema.clone()).map_err(|e| {
                SearchError::IndexInitFailed(format!("Failed to create new index: {}", e))
            })?
        };

        let id_field = schema.get_field(id_field_name).map_err(|e| {
            SearchError::SchemaError(format!("Missing id field {}: {}", id_field_name, e))
        })?;

        let writer = index
            .writer(config.writer_heap_size)
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create writer: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(if config.realtime_indexing {
                ReloadPolicy::OnCommitWithDelay
            } else {
                ReloadPolicy::Manual
            })
            .try_into()
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create reader: {}", e)))?;

        Ok(Self {
            name: name.to_string(),
            schema,
            id_field,
            writer: Arc::new(RwLock::new(writer)),
            reader,
            config,
        })
    }

    /// Check if an index exists at the given path
    fn index_exists(path: &Path) -> bool {
        path.join("meta.json").exists()
    }

    /// Get the schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get the reader
    pub fn reader(&self) -> &IndexReader {
        &self.reader
    }

    /// Index a single logical document, replacing any previous entries that
    /// share its identity.
    pub async fn index_document<D: SearchDocument>(&self, document: &D) -> SearchResult<()> {
        let mut writer = self.writer.write().await;

        let term = tantivy::Term::from_field_text(self.id_field, &document.document_id());
        writer.delete_term(term);

        for doc in document.to_tantivy_docs(&self.schema) {
            writer
                .add_document(doc)
                .map_err(|e| SearchError::IndexingFailed(format!("Failed to add document: {}", e)))?;
        }

        if self.config.realtime_indexing {
            writer.commit().map_err(|e| {
                SearchError::IndexingFailed(format!("Failed to commit document: {}", e))
            })?;
            self.reader.reload()?;
        }

        Ok(())
    }

    /// Index a batch of logical documents and commit once.
    pub async fn index_documents<D: SearchDocument>(&self, documents: &[D]) -> SearchResult<usize> {
        let mut writer = self.writer.write().await;
        let mut indexed = 0;

        for document in documents {
            let term = tantivy::Term::from_field_text(self.id_field, &document.document_id());
            writer.delete_term(term);

            for doc in document.to_tantivy_docs(&self.schema) {
                writer.add_document(doc).map_err(|e| {
                    SearchError::IndexingFailed(format!("Failed to add document {}: {}", indexed, e))
                })?;
            }
            indexed += 1;
        }

        writer
            .commit()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit batch: {}", e)))?;
        self.reader.reload()?;

        Ok(indexed)
    }

    /// Delete a logical document (and all its child entries) by identity.
    pub async fn delete_document(&self, document_id: &str) -> SearchResult<()> {
        let mut writer = self.writer.write().await;

        let term = tantivy::Term::from_field_text(self.id_field, document_id);
        writer.delete_term(term);

        if self.config.realtime_indexing {
            writer.commit().map_err(|e| {
                SearchError::DeletionFailed(format!("Failed to commit deletion: {}", e))
            })?;
            self.reader.reload()?;
        }

        Ok(())
    }

    /// Clear the entire index
    pub async fn clear(&self) -> SearchResult<()> {
        let mut writer = self.writer.write().await;
        writer
            .delete_all_documents()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to clear index: {}", e)))?;
        writer
            .commit()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit clear: {}", e)))?;
        self.reader.reload()?;
        Ok(())
    }

    /// Get index statistics
    pub async fn stats(&self) -> SearchResult<IndexStats> {
        let searcher = self.reader.searcher();

        let total_documents = searcher
            .search(&tantivy::query::AllQuery, &Count)
            .map_err(|e| SearchError::SearchFailed(format!("Failed to count documents: {}", e)))?
            as u64;

        let num_segments = searcher.segment_readers().len();

        let index_size_bytes = std::fs::read_dir(self.config.index_path.join(&self.name))
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.metadata().ok())
                    .map(|m| m.len())
                    .sum()
            })
            .unwrap_or(0);

        Ok(IndexStats {
            name: self.name.clone(),
            total_documents,
            index_size_bytes,
            num_segments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::document::build_page_schema;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_index_creation() {
        let temp_dir = TempDir::new().unwrap();
        let config = SearchConfig {
            index_path: temp_dir.path().to_path_buf(),
            ..Default::default()
        };

        let manager = IndexManager::new("page", build_page_schema(), "route", config).await;
        assert!(manager.is_ok());
    }

    #[tokio::test]
    async fn test_index_stats() {
        let temp_dir = TempDir::new().unwrap();
        let config = SearchConfig {
            index_path: temp_dir.path().to_path_buf(),
            ..Default::default()
        };

        let manager = IndexManager::new("page", build_page_schema(), "route", config)
            .await
            .unwrap();
        let stats = manager.stats().await.unwrap();

        assert_eq!(stats.total_documents, 0);
        assert_eq!(stats.name, "page");
    }
}
