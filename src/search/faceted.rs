//! Faceted search builders.
//!
//! One builder per result type. Both run the same pipeline: tokenize the
//! query, build the dual-operator text query, apply facet filters and the
//! privacy exclusion, execute, collect facet counts per dimension, then
//! shape hits with HTML-safe highlights.
//!
//! Page search additionally merges child entries (sections and domain
//! references) back onto their parent page by `full_path`, surfacing them
//! as inner hits.

use crate::search::config::SearchConfig;
use crate::search::document::{KIND_DOMAIN, KIND_PAGE, KIND_SECTION};
use crate::search::error::{SearchError, SearchResult};
use crate::search::highlight::Highlighter;
use crate::search::index::IndexManager;
use crate::search::query::{operator_union, tokenize, BoostedField, UserInput};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tantivy::collector::{Count, FacetCollector, TopDocs};
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Facet, Field, IndexRecordOption, Schema, Value};
use tantivy::{DocAddress, Searcher, TantivyDocument, Term};

use super::document::facet_value;

/// One value of a facet dimension with its result count. `selected` marks
/// values the user filtered on.
#[derive(Debug, Clone, Serialize)]
pub struct FacetBucket {
    pub value: String,
    pub count: u64,
    pub selected: bool,
}

/// A section or domain match surfaced under its parent page.
#[derive(Debug, Clone, Serialize)]
pub struct InnerHit {
    /// `section` or `domain`
    pub kind: String,
    pub score: f32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    pub highlights: BTreeMap<String, Vec<String>>,
}

/// One search result, either a project or a page.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Last modification timestamp, used by the date sort keys
    pub modified: Option<chrono::DateTime<chrono::Utc>>,
    pub score: f32,
    pub highlights: BTreeMap<String, Vec<String>>,
    pub inner_hits: Vec<InnerHit>,
}

/// Search outcome: total hit count, the fetched hits in score order, and
/// facet counts per dimension.
#[derive(Debug, Clone, Serialize, Default)]
pub struct FacetedResponse {
    pub total: usize,
    pub hits: Vec<SearchHit>,
    pub facets: BTreeMap<String, Vec<FacetBucket>>,
}

/// A result-type-specific search pipeline.
#[async_trait]
pub trait SearchBuilder: Send + Sync {
    /// Facet dimensions this builder filters and counts on
    fn facet_dimensions(&self) -> &'static [&'static str];

    async fn search(&self, input: &UserInput) -> SearchResult<FacetedResponse>;
}

/// Facet term filter for one dimension: any of the selected values.
fn facet_filter(
    schema: &Schema,
    dimension: &str,
    values: &[String],
) -> SearchResult<Option<Box<dyn Query>>> {
    if values.is_empty() {
        return Ok(None);
    }
    let field = facet_field(schema, dimension)?;
    let clauses: Vec<(Occur, Box<dyn Query>)> = values
        .iter()
        .map(|value| {
            let term = Term::from_facet(field, &facet_value(dimension, value));
            let query: Box<dyn Query> =
                Box::new(TermQuery::new(term, IndexRecordOption::Basic));
            (Occur::Should, query)
        })
        .collect();
    Ok(Some(Box::new(BooleanQuery::new(clauses))))
}

fn facet_field(schema: &Schema, dimension: &str) -> SearchResult<Field> {
    schema
        .get_field(&format!("{}_facet", dimension))
        .map_err(|e| SearchError::SchemaError(format!("Unknown facet dimension {}: {}", dimension, e)))
}

/// Server-side privacy exclusion. Applied to every search, after client
/// filters, so a client-supplied filter can never re-admit private entries.
fn privacy_exclusion(schema: &Schema) -> SearchResult<(Occur, Box<dyn Query>)> {
    let field = schema
        .get_field("privacy")
        .map_err(|e| SearchError::SchemaError(format!("Missing privacy facet: {}", e)))?;
    let term = Term::from_facet(field, &facet_value("privacy", "private"));
    Ok((
        Occur::MustNot,
        Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
    ))
}

/// Assemble the final query: text union, one facet filter per selected
/// dimension, privacy exclusion. `exclude` leaves out that dimension's own
/// filter so its facet counts can be collected over the sibling values too.
fn assemble_query(
    schema: &Schema,
    text_query: Box<dyn Query>,
    dimensions: &[&str],
    input: &UserInput,
    exclude: Option<&str>,
) -> SearchResult<Box<dyn Query>> {
    let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(Occur::Must, text_query)];

    for dimension in dimensions {
        if Some(*dimension) == exclude {
            continue;
        }
        let values = input.facet_values(dimension);
        if let Some(filter) = facet_filter(schema, dimension, &values)? {
            clauses.push((Occur::Must, filter));
        }
    }

    clauses.push(privacy_exclusion(schema)?);
    Ok(Box::new(BooleanQuery::new(clauses)))
}

/// Execute the fully-filtered query, collecting the top window and the
/// engine total.
fn execute(
    searcher: &Searcher,
    query: &dyn Query,
    max_results: usize,
) -> SearchResult<(usize, Vec<(f32, DocAddress)>)> {
    searcher
        .search(query, &(Count, TopDocs::with_limit(max_results.max(1))))
        .map_err(|e| SearchError::SearchFailed(format!("Search execution failed: {}", e)))
}

/// Facet counts per dimension. Each dimension is counted against the query
/// with every filter applied except its own: selecting `language=en` narrows
/// the hits but the language facet still lists `it` with its count, so the
/// user can switch or widen the selection.
fn collect_facet_counts<F>(
    searcher: &Searcher,
    schema: &Schema,
    dimensions: &[&str],
    input: &UserInput,
    text_query: F,
) -> SearchResult<BTreeMap<String, Vec<FacetBucket>>>
where
    F: Fn() -> SearchResult<Box<dyn Query>>,
{
    let mut facets = BTreeMap::new();
    for dimension in dimensions {
        let query = assemble_query(schema, text_query()?, dimensions, input, Some(dimension))?;

        let mut collector = FacetCollector::for_field(format!("{}_facet", dimension));
        collector.add_facet(Facet::from(format!("/{}", dimension).as_str()));
        let counts = searcher
            .search(&*query, &collector)
            .map_err(|e| SearchError::SearchFailed(format!("Facet collection failed: {}", e)))?;

        let selected_values = input.facet_values(dimension);
        let buckets: Vec<FacetBucket> = counts
            .get(format!("/{}", dimension).as_str())
            .map(|(facet, count)| {
                let value = facet
                    .to_path()
                    .last()
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                let selected = selected_values.contains(&value);
                FacetBucket {
                    value,
                    count,
                    selected,
                }
            })
            .collect();
        facets.insert(dimension.to_string(), buckets);
    }
    Ok(facets)
}

fn first_text(doc: &TantivyDocument, schema: &Schema, name: &str) -> Option<String> {
    let field = schema.get_field(name).ok()?;
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn first_date(
    doc: &TantivyDocument,
    schema: &Schema,
    name: &str,
) -> Option<chrono::DateTime<chrono::Utc>> {
    let field = schema.get_field(name).ok()?;
    let datetime = doc.get_first(field).and_then(|v| v.as_datetime())?;
    chrono::DateTime::from_timestamp(datetime.into_timestamp_secs(), 0)
}

fn push_fragment(
    highlights: &mut BTreeMap<String, Vec<String>>,
    highlighter: &Highlighter,
    doc: &TantivyDocument,
    max_fragments: usize,
) {
    if let Some(fragment) = highlighter.fragment(doc) {
        let entry = highlights
            .entry(highlighter.field_name().to_string())
            .or_default();
        if entry.len() < max_fragments {
            entry.push(fragment);
        }
    }
}

/// Project search: name, slug and description, faceted on language,
/// publisher, publisher project and tags.
pub struct ProjectSearch {
    manager: Arc<IndexManager>,
    config: SearchConfig,
}

const PROJECT_FACETS: &[&str] = &["language", "publisher", "publisher_project", "tags"];

impl ProjectSearch {
    pub fn new(manager: Arc<IndexManager>, config: SearchConfig) -> Self {
        Self { manager, config }
    }

    fn text_query(&self, terms: &[String]) -> SearchResult<Box<dyn Query>> {
        let schema = self.manager.schema();
        let fields = [
            BoostedField::new(text_field(schema, "name")?, 10.0),
            BoostedField::new(text_field(schema, "slug_text")?, 5.0),
            BoostedField::new(text_field(schema, "description")?, 1.0),
        ];
        Ok(operator_union(&fields, terms))
    }
}

fn text_field(schema: &Schema, name: &str) -> SearchResult<Field> {
    schema
        .get_field(name)
        .map_err(|e| SearchError::SchemaError(format!("Missing field {}: {}", name, e)))
}

#[async_trait]
impl SearchBuilder for ProjectSearch {
    fn facet_dimensions(&self) -> &'static [&'static str] {
        PROJECT_FACETS
    }

    async fn search(&self, input: &UserInput) -> SearchResult<FacetedResponse> {
        let terms = tokenize(input.query.as_deref().unwrap_or(""));
        tracing::info!(query = ?input.query, result_type = %input.result_type, "Executing project search");

        let schema = self.manager.schema();
        let text_query = self.text_query(&terms)?;
        let query = assemble_query(schema, text_query, PROJECT_FACETS, input, None)?;

        let searcher = self.manager.reader().searcher();
        let (total, top_docs) = execute(&searcher, &*query, self.config.max_results)?;
        let facets = collect_facet_counts(&searcher, schema, PROJECT_FACETS, input, || {
            self.text_query(&terms)
        })?;

        let highlight_query = self.text_query(&terms)?;
        let highlighters = [
            Highlighter::new(
                &searcher,
                &*highlight_query,
                "name",
                text_field(schema, "name")?,
                self.config.fragment_max_chars,
            )?,
            Highlighter::new(
                &searcher,
                &*highlight_query,
                "description",
                text_field(schema, "description")?,
                self.config.fragment_max_chars,
            )?,
        ];

        let mut hits = Vec::new();
        for (score, address) in top_docs {
            if score < self.config.min_score {
                continue;
            }
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| SearchError::SearchFailed(format!("Failed to load document: {}", e)))?;

            let mut highlights = BTreeMap::new();
            for highlighter in &highlighters {
                push_fragment(&mut highlights, highlighter, &doc, self.config.project_fragments);
            }

            hits.push(SearchHit {
                title: first_text(&doc, schema, "name").unwrap_or_default(),
                link: first_text(&doc, schema, "url").unwrap_or_default(),
                project: first_text(&doc, schema, "slug"),
                version: None,
                path: None,
                modified: first_date(&doc, schema, "modified_date"),
                score,
                highlights,
                inner_hits: Vec::new(),
            });
        }

        // Engine total counts entries below the score floor too; prefer the
        // filtered count whenever the window was not truncated.
        let total = if top_docs_truncated(total, self.config.max_results) {
            total
        } else {
            hits.len()
        };

        Ok(FacetedResponse {
            total,
            hits,
            facets,
        })
    }
}

fn top_docs_truncated(engine_total: usize, max_results: usize) -> bool {
    engine_total > max_results
}

/// Page search: three dual-operator trees (page titles, section text, domain
/// references) unioned, hits merged onto their parent page by `full_path`.
pub struct PageSearch {
    manager: Arc<IndexManager>,
    config: SearchConfig,
}

const PAGE_FACETS: &[&str] = &[
    "project",
    "version",
    "role_name",
    "publisher",
    "publisher_project",
    "tags",
    "is_default",
];

impl PageSearch {
    pub fn new(manager: Arc<IndexManager>, config: SearchConfig) -> Self {
        Self { manager, config }
    }

    fn kind_clause(&self, kind: &str) -> SearchResult<Box<dyn Query>> {
        let field = text_field(self.manager.schema(), "kind")?;
        Ok(Box::new(TermQuery::new(
            Term::from_field_text(field, kind),
            IndexRecordOption::Basic,
        )))
    }

    fn tree(&self, kind: &str, fields: &[BoostedField], terms: &[String]) -> SearchResult<Box<dyn Query>> {
        Ok(Box::new(BooleanQuery::new(vec![
            (Occur::Must, self.kind_clause(kind)?),
            (Occur::Must, operator_union(fields, terms)),
        ])))
    }

    /// Union of the page, section and domain query trees. Each tree carries
    /// the dual-operator construction; a page accumulates score from every
    /// tree any of its entries match.
    fn text_query(&self, terms: &[String]) -> SearchResult<Box<dyn Query>> {
        let schema = self.manager.schema();
        let title = text_field(schema, "title")?;
        let content = text_field(schema, "content")?;
        let name = text_field(schema, "name")?;
        let docstrings = text_field(schema, "docstrings")?;

        let page_tree = self.tree(KIND_PAGE, &[BoostedField::new(title, 4.0)], terms)?;
        let section_tree = self.tree(
            KIND_SECTION,
            &[BoostedField::new(title, 3.0), BoostedField::new(content, 1.0)],
            terms,
        )?;
        let domain_tree = self.tree(
            KIND_DOMAIN,
            &[BoostedField::new(name, 2.0), BoostedField::new(docstrings, 1.0)],
            terms,
        )?;

        Ok(Box::new(BooleanQuery::new(vec![
            (Occur::Should, page_tree),
            (Occur::Should, section_tree),
            (Occur::Should, domain_tree),
        ])))
    }
}

#[async_trait]
impl SearchBuilder for PageSearch {
    fn facet_dimensions(&self) -> &'static [&'static str] {
        PAGE_FACETS
    }

    async fn search(&self, input: &UserInput) -> SearchResult<FacetedResponse> {
        let terms = tokenize(input.query.as_deref().unwrap_or(""));
        tracing::info!(query = ?input.query, result_type = %input.result_type, "Executing page search");

        let schema = self.manager.schema();
        let text_query = self.text_query(&terms)?;
        let query = assemble_query(schema, text_query, PAGE_FACETS, input, None)?;

        let searcher = self.manager.reader().searcher();
        let (engine_total, top_docs) = execute(&searcher, &*query, self.config.max_results)?;
        let facets = collect_facet_counts(&searcher, schema, PAGE_FACETS, input, || {
            self.text_query(&terms)
        })?;

        let highlight_query = self.text_query(&terms)?;
        let highlighters: Vec<Highlighter> = ["title", "content", "name", "docstrings"]
            .iter()
            .map(|field_name| {
                Highlighter::new(
                    &searcher,
                    &*highlight_query,
                    field_name,
                    text_field(schema, field_name)?,
                    self.config.fragment_max_chars,
                )
            })
            .collect::<SearchResult<_>>()?;

        // Merge entries onto their parent page. Entries arrive in score
        // order, so pages keep the order of their best entry.
        let mut hits: Vec<SearchHit> = Vec::new();
        let mut by_path: HashMap<String, usize> = HashMap::new();

        for (score, address) in &top_docs {
            let score = *score;
            if score < self.config.min_score {
                continue;
            }
            let doc: TantivyDocument = searcher
                .doc(*address)
                .map_err(|e| SearchError::SearchFailed(format!("Failed to load document: {}", e)))?;

            let full_path = first_text(&doc, schema, "full_path").unwrap_or_default();
            let kind = first_text(&doc, schema, "kind").unwrap_or_default();

            let index = match by_path.get(&full_path) {
                Some(index) => *index,
                None => {
                    let project = first_text(&doc, schema, "project").unwrap_or_default();
                    let version = first_text(&doc, schema, "version").unwrap_or_default();
                    hits.push(SearchHit {
                        title: String::new(),
                        link: format!("/docs/{}/{}/{}", project, version, full_path),
                        project: Some(project),
                        version: Some(version),
                        path: first_text(&doc, schema, "path"),
                        modified: first_date(&doc, schema, "modified_date"),
                        score,
                        highlights: BTreeMap::new(),
                        inner_hits: Vec::new(),
                    });
                    by_path.insert(full_path.clone(), hits.len() - 1);
                    hits.len() - 1
                }
            };
            let hit = &mut hits[index];
            hit.score = hit.score.max(score);

            match kind.as_str() {
                KIND_PAGE => {
                    hit.title = first_text(&doc, schema, "title").unwrap_or_default();
                    for highlighter in &highlighters {
                        if highlighter.field_name() == "title" {
                            push_fragment(
                                &mut hit.highlights,
                                highlighter,
                                &doc,
                                self.config.page_fragments,
                            );
                        }
                    }
                }
                KIND_SECTION => {
                    let mut highlights = BTreeMap::new();
                    for highlighter in &highlighters {
                        if matches!(highlighter.field_name(), "title" | "content") {
                            push_fragment(&mut highlights, highlighter, &doc, self.config.page_fragments);
                        }
                    }
                    hit.inner_hits.push(InnerHit {
                        kind: KIND_SECTION.to_string(),
                        score,
                        title: first_text(&doc, schema, "title").unwrap_or_default(),
                        section_id: first_text(&doc, schema, "section_id"),
                        role_name: None,
                        anchor: None,
                        highlights,
                    });
                }
                KIND_DOMAIN => {
                    let mut highlights = BTreeMap::new();
                    for highlighter in &highlighters {
                        if matches!(highlighter.field_name(), "name" | "docstrings") {
                            push_fragment(&mut highlights, highlighter, &doc, self.config.page_fragments);
                        }
                    }
                    hit.inner_hits.push(InnerHit {
                        kind: KIND_DOMAIN.to_string(),
                        score,
                        title: first_text(&doc, schema, "name").unwrap_or_default(),
                        section_id: None,
                        role_name: first_text(&doc, schema, "role_name"),
                        anchor: first_text(&doc, schema, "anchor"),
                        highlights,
                    });
                }
                other => {
                    tracing::warn!(kind = %other, "Skipping page index entry with unknown kind");
                }
            }
        }

        // Pages whose parent entry did not itself match fall back to the
        // page path for display.
        for hit in &mut hits {
            if hit.title.is_empty() {
                if let Some(path) = hit.path.clone() {
                    hit.title = path;
                }
            }
        }

        let total = if top_docs_truncated(engine_total, self.config.max_results) {
            engine_total
        } else {
            hits.len()
        };

        Ok(FacetedResponse {
            total,
            hits,
            facets,
        })
    }
}

/// Result-type dispatch, wired at process start.
pub struct SearchDispatch {
    project: Arc<ProjectSearch>,
    page: Arc<PageSearch>,
}

impl SearchDispatch {
    pub fn new(project: Arc<ProjectSearch>, page: Arc<PageSearch>) -> Self {
        Self { project, page }
    }

    pub fn builder_for(&self, result_type: crate::search::query::ResultType) -> Arc<dyn SearchBuilder> {
        match result_type {
            crate::search::query::ResultType::Project => self.project.clone(),
            crate::search::query::ResultType::File => self.page.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HtmlPage, PageSection, PrivacyLevel, Project, SphinxDomain};
    use crate::search::document::{
        build_page_schema, build_project_schema, PageDocument, ProjectDocument,
    };
    use crate::search::query::ResultType;
    use chrono::Utc;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn project(slug: &str, name: &str, description: &str, privacy: PrivacyLevel) -> Project {
        Project {
            slug: slug.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            language: "en".to_string(),
            default_version: "latest".to_string(),
            single_version: false,
            privacy_level: privacy,
            users: vec![],
            publisher: None,
            publisher_project: None,
            tags: vec![],
            modified_date: Utc::now(),
        }
    }

    fn page(project: &str, path: &str, title: &str, section_content: &str) -> HtmlPage {
        HtmlPage {
            project: project.to_string(),
            version: "latest".to_string(),
            path: path.to_string(),
            full_path: String::new(),
            title: title.to_string(),
            sections: vec![PageSection {
                id: "body".to_string(),
                title: title.to_string(),
                content: section_content.to_string(),
            }],
            domains: vec![SphinxDomain {
                role_name: "py:function".to_string(),
                anchor: format!("{}.main", project),
                type_display: "function".to_string(),
                docstrings: format!("Entry point for {}", project),
                name: format!("{}.main", project),
            }],
            domain_data: HashMap::new(),
            privacy_level: PrivacyLevel::Public,
            publisher: None,
            publisher_project: None,
            tags: vec![],
            is_default: true,
            modified_date: Utc::now(),
        }
    }

    async fn project_search(temp_dir: &TempDir) -> ProjectSearch {
        let config = SearchConfig {
            index_path: temp_dir.path().to_path_buf(),
            min_score: 0.0,
            ..Default::default()
        };
        let manager = IndexManager::new("project", build_project_schema(), "slug", config.clone())
            .await
            .unwrap();
        ProjectSearch::new(Arc::new(manager), config)
    }

    async fn page_search(temp_dir: &TempDir) -> PageSearch {
        let config = SearchConfig {
            index_path: temp_dir.path().to_path_buf(),
            min_score: 0.0,
            ..Default::default()
        };
        let manager = IndexManager::new("page", build_page_schema(), "route", config.clone())
            .await
            .unwrap();
        PageSearch::new(Arc::new(manager), config)
    }

    fn query(q: &str) -> UserInput {
        UserInput {
            query: Some(q.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_project_search_ranks_full_matches_first() {
        let temp_dir = TempDir::new().unwrap();
        let search = project_search(&temp_dir).await;

        let full = project("pip-docs", "Pip Documentation", "Install guide", PrivacyLevel::Public);
        let partial = project("numpy", "NumPy", "Documentation only", PrivacyLevel::Public);
        search
            .manager
            .index_document(&ProjectDocument::from_project(&full, false))
            .await
            .unwrap();
        search
            .manager
            .index_document(&ProjectDocument::from_project(&partial, false))
            .await
            .unwrap();

        let response = search.search(&query("pip documentation")).await.unwrap();
        assert_eq!(response.total, 2);
        assert_eq!(response.hits[0].title, "Pip Documentation");
        assert!(response.hits[0].score > response.hits[1].score);
    }

    #[tokio::test]
    async fn test_private_projects_are_never_returned() {
        let temp_dir = TempDir::new().unwrap();
        let search = project_search(&temp_dir).await;

        let public = project("pub", "Public Docs", "", PrivacyLevel::Public);
        let private = project("priv", "Private Docs", "", PrivacyLevel::Private);
        search
            .manager
            .index_document(&ProjectDocument::from_project(&public, false))
            .await
            .unwrap();
        search
            .manager
            .index_document(&ProjectDocument::from_project(&private, false))
            .await
            .unwrap();

        let response = search.search(&query("docs")).await.unwrap();
        assert_eq!(response.total, 1);
        assert_eq!(response.hits[0].project.as_deref(), Some("pub"));
    }

    #[tokio::test]
    async fn test_project_facet_counts_and_selection() {
        let temp_dir = TempDir::new().unwrap();
        let search = project_search(&temp_dir).await;

        let mut a = project("a", "Alpha Docs", "", PrivacyLevel::Public);
        a.language = "en".to_string();
        let mut b = project("b", "Beta Docs", "", PrivacyLevel::Public);
        b.language = "it".to_string();
        search
            .manager
            .index_document(&ProjectDocument::from_project(&a, false))
            .await
            .unwrap();
        search
            .manager
            .index_document(&ProjectDocument::from_project(&b, false))
            .await
            .unwrap();

        let mut input = query("docs");
        input.language = Some("en".to_string());
        let response = search.search(&input).await.unwrap();

        assert_eq!(response.total, 1);
        let languages = &response.facets["language"];
        let en = languages.iter().find(|b| b.value == "en").unwrap();
        assert_eq!(en.count, 1);
        assert!(en.selected);

        // Filtering on a dimension must not hide its sibling values: the
        // language facet still offers `it` so the user can switch.
        let it = languages.iter().find(|b| b.value == "it").unwrap();
        assert_eq!(it.count, 1);
        assert!(!it.selected);
    }

    #[tokio::test]
    async fn test_facet_counts_honor_other_dimensions_filters() {
        let temp_dir = TempDir::new().unwrap();
        let search = page_search(&temp_dir).await;

        let mut old = page("pip", "guide.html", "Guide", "shared words");
        old.version = "1.0".to_string();
        search
            .manager
            .index_document(&PageDocument::from_page(&old))
            .await
            .unwrap();
        search
            .manager
            .index_document(&PageDocument::from_page(&page(
                "numpy",
                "guide.html",
                "Guide",
                "shared words",
            )))
            .await
            .unwrap();

        let mut input = query("shared");
        input.project = Some("pip".to_string());
        let response = search.search(&input).await.unwrap();

        // The version facet keeps the project filter, so numpy's `latest`
        // pages do not leak into it; the project facet drops only its own
        // filter and still lists both projects.
        let versions = &response.facets["version"];
        assert!(versions.iter().any(|b| b.value == "1.0"));
        assert!(!versions.iter().any(|b| b.value == "latest"));

        let projects = &response.facets["project"];
        assert!(projects.iter().any(|b| b.value == "pip" && b.selected));
        assert!(projects.iter().any(|b| b.value == "numpy" && !b.selected));
    }

    #[tokio::test]
    async fn test_page_search_merges_inner_hits() {
        let temp_dir = TempDir::new().unwrap();
        let search = page_search(&temp_dir).await;

        search
            .manager
            .index_document(&PageDocument::from_page(&page(
                "pip",
                "install.html",
                "Installation",
                "Run pip install to get started with installation",
            )))
            .await
            .unwrap();

        let response = search.search(&query("installation")).await.unwrap();
        assert_eq!(response.total, 1);
        let hit = &response.hits[0];
        assert_eq!(hit.title, "Installation");
        assert_eq!(hit.project.as_deref(), Some("pip"));
        // The section entry matched too and surfaces as an inner hit
        assert_eq!(hit.inner_hits.len(), 1);
        assert_eq!(hit.inner_hits[0].kind, "section");
    }

    #[tokio::test]
    async fn test_page_search_filters_by_project_facet() {
        let temp_dir = TempDir::new().unwrap();
        let search = page_search(&temp_dir).await;

        search
            .manager
            .index_document(&PageDocument::from_page(&page(
                "pip",
                "usage.html",
                "Usage Guide",
                "pip usage",
            )))
            .await
            .unwrap();
        search
            .manager
            .index_document(&PageDocument::from_page(&page(
                "numpy",
                "usage.html",
                "Usage Guide",
                "numpy usage",
            )))
            .await
            .unwrap();

        let mut input = query("usage");
        input.project = Some("pip".to_string());
        let response = search.search(&input).await.unwrap();

        assert_eq!(response.total, 1);
        assert_eq!(response.hits[0].project.as_deref(), Some("pip"));
    }

    #[tokio::test]
    async fn test_page_search_matches_domain_references() {
        let temp_dir = TempDir::new().unwrap();
        let search = page_search(&temp_dir).await;

        search
            .manager
            .index_document(&PageDocument::from_page(&page(
                "pip",
                "api.html",
                "API Reference",
                "reference material",
            )))
            .await
            .unwrap();

        let response = search.search(&query("pip.main")).await.unwrap();
        assert_eq!(response.total, 1);
        let domain_hits: Vec<_> = response.hits[0]
            .inner_hits
            .iter()
            .filter(|h| h.kind == "domain")
            .collect();
        assert_eq!(domain_hits.len(), 1);
        assert_eq!(domain_hits[0].title, "pip.main");
        assert_eq!(domain_hits[0].role_name.as_deref(), Some("py:function"));
    }

    #[tokio::test]
    async fn test_dispatch_selects_builder_by_result_type() {
        let temp_dir = TempDir::new().unwrap();
        let project = Arc::new(project_search(&temp_dir).await);
        let page = Arc::new(page_search(&temp_dir).await);
        let dispatch = SearchDispatch::new(project, page);

        assert_eq!(
            dispatch.builder_for(ResultType::Project).facet_dimensions(),
            PROJECT_FACETS
        );
        assert_eq!(
            dispatch.builder_for(ResultType::File).facet_dimensions(),
            PAGE_FACETS
        );
    }
}
