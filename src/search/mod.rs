//! Full-text search over projects and documentation pages.
//!
//! Two tantivy indexes back the service: a project index (one entry per
//! project) and a page index (parent page entries plus section and domain
//! child entries). [`SearchService`] owns both and dispatches queries to the
//! builder matching the requested result type.

pub mod config;
pub mod document;
pub mod error;
pub mod faceted;
pub mod highlight;
pub mod index;
pub mod pagination;
pub mod query;

pub use config::SearchConfig;
pub use error::{SearchError, SearchResult};
pub use faceted::{FacetBucket, FacetedResponse, InnerHit, SearchBuilder, SearchHit};
pub use query::{ResultType, SortKey, UserInput};

use crate::models::{HtmlPage, Project};
use document::{
    build_page_schema, build_project_schema, PageDocument, ProjectDocument,
};
use faceted::{PageSearch, ProjectSearch, SearchDispatch};
use index::{IndexManager, IndexStats};
use std::sync::Arc;

/// Owns the project and page indexes and the per-result-type builders.
pub struct SearchService {
    project_index: Arc<IndexManager>,
    page_index: Arc<IndexManager>,
    dispatch: SearchDispatch,
    /// Whether project docs URLs use subdomain serving
    subdomain: bool,
}

impl SearchService {
    pub async fn new(config: SearchConfig, subdomain: bool) -> SearchResult<Self> {
        let project_index = Arc::new(
            IndexManager::new("project", build_project_schema(), "slug", config.clone()).await?,
        );
        let page_index = Arc::new(
            IndexManager::new("page", build_page_schema(), "route", config.clone()).await?,
        );

        let dispatch = SearchDispatch::new(
            Arc::new(ProjectSearch::new(project_index.clone(), config.clone())),
            Arc::new(PageSearch::new(page_index.clone(), config)),
        );

        Ok(Self {
            project_index,
            page_index,
            dispatch,
            subdomain,
        })
    }

    /// Run a search with the builder matching the requested result type.
    pub async fn search(&self, input: &UserInput) -> SearchResult<FacetedResponse> {
        self.dispatch.builder_for(input.result_type).search(input).await
    }

    /// Index (or replace) a project's search entry.
    pub async fn index_project(&self, project: &Project) -> SearchResult<()> {
        let document = ProjectDocument::from_project(project, self.subdomain);
        self.project_index.index_document(&document).await
    }

    pub async fn delete_project(&self, slug: &str) -> SearchResult<()> {
        self.project_index.delete_document(slug).await
    }

    /// Index (or replace) a page and all its section/domain entries.
    pub async fn index_page(&self, page: &HtmlPage) -> SearchResult<()> {
        let document = PageDocument::from_page(page);
        self.page_index.index_document(&document).await
    }

    pub async fn delete_page(&self, route: &str) -> SearchResult<()> {
        self.page_index.delete_document(route).await
    }

    /// Drop both indexes and rebuild them from the given records.
    pub async fn rebuild(
        &self,
        projects: &[Project],
        pages: &[HtmlPage],
    ) -> SearchResult<(usize, usize)> {
        self.project_index.clear().await?;
        self.page_index.clear().await?;

        let project_docs: Vec<ProjectDocument> = projects
            .iter()
            .map(|p| ProjectDocument::from_project(p, self.subdomain))
            .collect();
        let page_docs: Vec<PageDocument> = pages.iter().map(PageDocument::from_page).collect();

        let projects_indexed = self.project_index.index_documents(&project_docs).await?;
        let pages_indexed = self.page_index.index_documents(&page_docs).await?;

        tracing::info!(projects = projects_indexed, pages = pages_indexed, "Search indexes rebuilt");
        Ok((projects_indexed, pages_indexed))
    }

    pub async fn stats(&self) -> SearchResult<Vec<IndexStats>> {
        Ok(vec![
            self.project_index.stats().await?,
            self.page_index.stats().await?,
        ])
    }
}
