use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::{HtmlPage, Project};
use crate::redirects::{get_redirect_path, RedirectRule};
use crate::registry::ProjectRegistry;
use crate::search::faceted::{FacetBucket, FacetedResponse, SearchHit};
use crate::search::index::IndexStats;
use crate::search::pagination::{apply_sort, sort_inner_hits, Page, Paginator};
use crate::search::query::{ResultType, SortKey, UserInput};
use axum::{
    extract::{Path, Query, RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Query parameters of the search surface. Multi-valued filters
/// (`publisher_project`, `tags`) are comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub result_type: Option<String>,
    pub project: Option<String>,
    pub version: Option<String>,
    pub language: Option<String>,
    pub role_name: Option<String>,
    pub index: Option<String>,
    pub publisher: Option<String>,
    pub publisher_project: Option<String>,
    pub tags: Option<String>,
    pub is_default: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
}

fn split_multi(value: &Option<String>) -> Vec<String> {
    value
        .as_deref()
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Parse request parameters into the typed user input. File searches
/// without an explicit version filter default to `latest`.
fn build_user_input(params: &SearchParams) -> UserInput {
    let result_type = ResultType::parse(params.result_type.as_deref());
    let version = match (&params.version, result_type) {
        (None, ResultType::File) => Some("latest".to_string()),
        (version, _) => version.clone(),
    };

    UserInput {
        query: params.q.clone(),
        result_type,
        project: params.project.clone(),
        version,
        language: params.language.clone(),
        role_name: params.role_name.clone(),
        index: params.index.clone(),
        publisher: params.publisher.clone(),
        publisher_project: split_multi(&params.publisher_project),
        tags: split_multi(&params.tags),
        is_default: params.is_default.clone(),
        sort: SortKey::parse(params.sort.as_deref()),
        page: params.page.clone(),
    }
}

/// A facet value the user selected that yields no hits must still render,
/// at count 0, so the UI never silently drops an active filter.
fn reinsert_selected_facets(
    facets: &mut BTreeMap<String, Vec<FacetBucket>>,
    input: &UserInput,
) {
    for (dimension, buckets) in facets.iter_mut() {
        for value in input.facet_values(dimension) {
            if !buckets.iter().any(|bucket| bucket.value == value) {
                buckets.push(FacetBucket {
                    value,
                    count: 0,
                    selected: true,
                });
            }
        }
    }
}

/// Rewrite page-hit links through the registered project so subdomain and
/// single-version serving are honored.
fn resolve_links(hits: &mut [SearchHit], registry: &ProjectRegistry, subdomain: bool) {
    for hit in hits.iter_mut() {
        let (Some(slug), Some(path), Some(version)) =
            (hit.project.clone(), hit.path.clone(), hit.version.clone())
        else {
            continue;
        };
        if let Ok(project) = registry.get_project(&slug) {
            hit.link = format!(
                "{}{}",
                project.docs_path(Some(&version), None, subdomain),
                path.trim_start_matches('/')
            );
        }
    }
}

const FILTER_DIMENSIONS: &[&str] = &[
    "project",
    "version",
    "language",
    "role_name",
    "index",
    "publisher",
    "publisher_project",
    "tags",
    "is_default",
];

/// Active filters echoed back to the client, so the UI can rebuild its
/// state (filter chips, facet selections) from the response alone.
fn echoed_filters(input: &UserInput) -> BTreeMap<String, Vec<String>> {
    FILTER_DIMENSIONS
        .iter()
        .filter_map(|dimension| {
            let values = input.facet_values(dimension);
            (!values.is_empty()).then(|| (dimension.to_string(), values))
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct SortContext {
    pub label: &'static str,
    pub selected: bool,
}

fn sort_context(selected: SortKey) -> BTreeMap<String, SortContext> {
    SortKey::choices(selected)
        .into_iter()
        .map(|choice| {
            (
                choice.key.to_string(),
                SortContext {
                    label: choice.label,
                    selected: choice.selected,
                },
            )
        })
        .collect()
}

/// Render context of the search page.
#[derive(Debug, Serialize)]
pub struct SearchPageResponse {
    pub query: Option<String>,
    #[serde(rename = "type")]
    pub result_type: ResultType,
    /// False when no query was submitted; distinguishes "not searched"
    /// from zero results
    pub searched: bool,
    /// Active filters, per dimension
    pub filters: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<Page>,
    pub facets: BTreeMap<String, Vec<FacetBucket>>,
    pub sorts: BTreeMap<String, SortContext>,
}

/// Search page endpoint
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchPageResponse>> {
    let input = build_user_input(&params);

    if !input.has_query() {
        return Ok(Json(SearchPageResponse {
            query: input.query.clone(),
            result_type: input.result_type,
            searched: false,
            filters: echoed_filters(&input),
            page: None,
            facets: BTreeMap::new(),
            sorts: sort_context(input.sort),
        }));
    }

    let FacetedResponse {
        total,
        mut hits,
        mut facets,
    } = state.search.search(&input).await?;

    sort_inner_hits(&mut hits);
    apply_sort(&mut hits, input.sort);
    reinsert_selected_facets(&mut facets, &input);
    resolve_links(&mut hits, &state.registry, state.config.serving.use_subdomain);

    let paginator = Paginator::new(state.config.search.page_size);
    let page = paginator.paginate(hits, total, input.page.as_deref());

    Ok(Json(SearchPageResponse {
        query: input.query.clone(),
        result_type: input.result_type,
        searched: true,
        filters: echoed_filters(&input),
        page: Some(page),
        facets,
        sorts: sort_context(input.sort),
    }))
}

#[derive(Debug, Serialize)]
pub struct ApiSearchResponse {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<ApiSearchResult>,
}

#[derive(Debug, Serialize)]
pub struct ApiSearchResult {
    pub title: String,
    pub link: String,
    pub highlight: BTreeMap<String, Vec<String>>,
}

/// Characters escaped in query string values.
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'&')
    .add(b'=')
    .add(b'%')
    .add(b'+')
    .add(b'?');

/// Pagination link carrying the full incoming parameter set, so following
/// `next` or `previous` repeats the same filtered search on another page.
fn api_page_url(params: &SearchParams, page: usize) -> String {
    let mut pairs: Vec<String> = Vec::new();
    let mut push = |key: &str, value: &Option<String>| {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            pairs.push(format!("{}={}", key, utf8_percent_encode(value, QUERY_VALUE)));
        }
    };
    push("q", &params.q);
    push("type", &params.result_type);
    push("project", &params.project);
    push("version", &params.version);
    push("language", &params.language);
    push("role_name", &params.role_name);
    push("index", &params.index);
    push("publisher", &params.publisher);
    push("publisher_project", &params.publisher_project);
    push("tags", &params.tags);
    push("is_default", &params.is_default);
    push("sort", &params.sort);
    pairs.push(format!("page={}", page));
    format!("/api/v2/search?{}", pairs.join("&"))
}

/// JSON search API over documentation pages.
pub async fn search_api(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ApiSearchResponse>> {
    let mut input = build_user_input(&params);
    input.result_type = ResultType::File;

    // Validated before any engine contact
    if !input.has_query() {
        return Err(AppError::Validation(
            "Missing required query parameter: q".to_string(),
        ));
    }

    let FacetedResponse { total, mut hits, .. } = state.search.search(&input).await?;
    sort_inner_hits(&mut hits);
    resolve_links(&mut hits, &state.registry, state.config.serving.use_subdomain);

    let paginator = Paginator::new(state.config.search.page_size);
    let page = paginator.paginate(hits, total, input.page.as_deref());

    let next = page.has_next.then(|| api_page_url(&params, page.number + 1));
    let previous = page
        .has_previous
        .then(|| api_page_url(&params, page.number - 1));

    Ok(Json(ApiSearchResponse {
        count: page.total,
        next,
        previous,
        results: page
            .hits
            .into_iter()
            .map(|hit| ApiSearchResult {
                title: hit.title,
                link: hit.link,
                highlight: hit.highlights,
            })
            .collect(),
    }))
}

/// Register or update a project and index its search entry.
pub async fn register_project(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(mut project): Json<Project>,
) -> Result<(StatusCode, Json<Project>)> {
    project.slug = slug;
    project.validate()?;

    state.registry.upsert_project(project.clone());
    state.search.index_project(&project).await?;

    Ok((StatusCode::CREATED, Json(project)))
}

/// Remove a project, its pages and its redirect rules.
pub async fn remove_project(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<StatusCode> {
    let routes: Vec<String> = state
        .registry
        .list_pages()
        .iter()
        .filter(|page| page.project == slug)
        .map(HtmlPage::route)
        .collect();

    state.registry.remove_project(&slug)?;
    state.search.delete_project(&slug).await?;
    for route in routes {
        state.search.delete_page(&route).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct PageIndexedResponse {
    pub route: String,
}

/// Index (or replace) one built page.
pub async fn index_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(mut page): Json<HtmlPage>,
) -> Result<(StatusCode, Json<PageIndexedResponse>)> {
    page.project = slug;
    page.validate()?;

    let route = state.registry.upsert_page(page.clone())?;
    state.search.index_page(&page).await?;

    Ok((StatusCode::CREATED, Json(PageIndexedResponse { route })))
}

#[derive(Debug, Deserialize)]
pub struct DeletePageParams {
    pub version: Option<String>,
}

/// Delete one page from the registry and the index.
pub async fn delete_page(
    State(state): State<AppState>,
    Path((slug, path)): Path<(String, String)>,
    Query(params): Query<DeletePageParams>,
) -> Result<StatusCode> {
    let version = params.version.as_deref().unwrap_or("latest");
    let route = format!("{}/{}/{}", slug, version, path);

    state.registry.remove_page(&route)?;
    state.search.delete_page(&route).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct ReindexResponse {
    pub projects: usize,
    pub pages: usize,
}

/// Rebuild both search indexes from the registry.
pub async fn reindex(State(state): State<AppState>) -> Result<Json<ReindexResponse>> {
    let projects = state.registry.list_projects();
    let pages = state.registry.list_pages();
    let (projects, pages) = state.search.rebuild(&projects, &pages).await?;

    Ok(Json(ReindexResponse { projects, pages }))
}

/// Index statistics
pub async fn search_stats(State(state): State<AppState>) -> Result<Json<Vec<IndexStats>>> {
    Ok(Json(state.search.stats().await?))
}

#[derive(Debug, Serialize)]
pub struct RedirectRulesResponse {
    pub count: usize,
}

/// Replace a project's ordered redirect rule list.
pub async fn set_redirects(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(rules): Json<Vec<RedirectRule>>,
) -> Result<Json<RedirectRulesResponse>> {
    for rule in &rules {
        rule.validate()?;
    }
    let count = state.registry.set_redirects(&slug, rules)?;
    Ok(Json(RedirectRulesResponse { count }))
}

/// Evaluate redirect rules for a docs request. Replies with the configured
/// redirect when a rule matches, 404 otherwise.
pub async fn serve_docs(
    State(state): State<AppState>,
    Path((slug, path)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> Result<Response> {
    let project = state.registry.get_project(&slug)?;
    let rules = state.registry.redirects_for(&slug);
    let subdomain = state.config.serving.use_subdomain;

    let full_path = format!("/docs/{}/{}", slug, path);
    let root = project.docs_path(None, None, subdomain);
    let filename = match full_path.strip_prefix(root.trim_end_matches('/')) {
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => format!("/{}", path),
    };

    let Some(matched) = get_redirect_path(
        &project,
        &rules,
        &filename,
        &full_path,
        query.as_deref(),
        subdomain,
    ) else {
        return Err(AppError::NotFound(format!(
            "No documentation found at {}",
            full_path
        )));
    };

    let status = if matched.http_status == 301 {
        StatusCode::MOVED_PERMANENTLY
    } else {
        StatusCode::FOUND
    };
    Ok((status, [(header::LOCATION, matched.location)]).into_response())
}
