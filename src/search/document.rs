//! Search document structures and index schemas.
//!
//! Two indexes back the search surface:
//!
//! - the **project index** holds one entry per project;
//! - the **page index** holds, per page, one parent entry (`kind = page`)
//!   plus one child entry per section (`kind = section`) and per domain
//!   reference (`kind = domain`). Children share the parent's `route` so a
//!   page is replaced atomically, and carry the parent's `full_path` so
//!   matches can be merged back onto the page they belong to.

use crate::models::{HtmlPage, PrivacyLevel, Project, SphinxDomain};
use crate::search::error::{SearchError, SearchResult};
use serde::{Deserialize, Serialize};
use tantivy::schema::*;
use tantivy::TantivyDocument;

/// Entry kind discriminator in the page index.
pub const KIND_PAGE: &str = "page";
pub const KIND_SECTION: &str = "section";
pub const KIND_DOMAIN: &str = "domain";

/// Trait for documents that can be indexed and searched
pub trait SearchDocument {
    /// Expand into the tantivy documents this logical document produces
    fn to_tantivy_docs(&self, schema: &Schema) -> Vec<TantivyDocument>;

    /// Identity term value, used to replace or delete the document
    fn document_id(&self) -> String;
}

/// Build a facet value under the given dimension, e.g. `/language/en`.
pub fn facet_value(dimension: &str, value: &str) -> Facet {
    Facet::from(format!("/{}/{}", dimension, value).as_str())
}

/// Project document for search indexing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDocument {
    pub slug: String,
    pub url: String,
    pub name: String,
    pub description: String,
    pub language: String,
    pub users: Vec<String>,
    pub publisher: Option<String>,
    pub publisher_project: Option<String>,
    pub tags: Vec<String>,
    pub privacy_level: PrivacyLevel,
    pub modified_date: chrono::DateTime<chrono::Utc>,
}

impl ProjectDocument {
    /// Project documents link to the docs root under the dashboard domain.
    pub fn from_project(project: &Project, subdomain: bool) -> Self {
        Self {
            slug: project.slug.clone(),
            url: project.docs_path(None, None, subdomain),
            name: project.name.clone(),
            description: project.description.clone(),
            language: project.language.clone(),
            users: project.users.clone(),
            publisher: project.publisher.clone(),
            publisher_project: project.publisher_project.clone(),
            tags: project.tags.clone(),
            privacy_level: project.privacy_level,
            modified_date: project.modified_date,
        }
    }
}

impl SearchDocument for ProjectDocument {
    fn to_tantivy_docs(&self, schema: &Schema) -> Vec<TantivyDocument> {
        let mut doc = TantivyDocument::new();

        if let Ok(field) = schema.get_field("slug") {
            doc.add_text(field, &self.slug);
        }
        if let Ok(field) = schema.get_field("url") {
            doc.add_text(field, &self.url);
        }
        if let Ok(field) = schema.get_field("name") {
            doc.add_text(field, &self.name);
        }
        // Slugs are searched tokenized; identity stays on the raw field
        if let Ok(field) = schema.get_field("slug_text") {
            doc.add_text(field, &self.slug);
        }
        if let Ok(field) = schema.get_field("description") {
            doc.add_text(field, &self.description);
        }
        if let Ok(field) = schema.get_field("language") {
            doc.add_text(field, &self.language);
        }
        if let Ok(field) = schema.get_field("users") {
            for user in &self.users {
                doc.add_text(field, user);
            }
        }
        if let Some(ref publisher) = self.publisher {
            if let Ok(field) = schema.get_field("publisher") {
                doc.add_text(field, publisher);
            }
            if let Ok(field) = schema.get_field("publisher_facet") {
                doc.add_facet(field, facet_value("publisher", publisher));
            }
        }
        if let Some(ref publisher_project) = self.publisher_project {
            if let Ok(field) = schema.get_field("publisher_project") {
                doc.add_text(field, publisher_project);
            }
            if let Ok(field) = schema.get_field("publisher_project_facet") {
                doc.add_facet(field, facet_value("publisher_project", publisher_project));
            }
        }
        if let Ok(field) = schema.get_field("language_facet") {
            doc.add_facet(field, facet_value("language", &self.language));
        }
        if let Ok(field) = schema.get_field("tags_facet") {
            for tag in &self.tags {
                doc.add_facet(field, facet_value("tags", tag));
            }
        }
        if let Ok(field) = schema.get_field("privacy") {
            doc.add_facet(field, facet_value("privacy", &self.privacy_level.to_string()));
        }
        if let Ok(field) = schema.get_field("modified_date") {
            doc.add_date(
                field,
                tantivy::DateTime::from_timestamp_secs(self.modified_date.timestamp()),
            );
        }

        vec![doc]
    }

    fn document_id(&self) -> String {
        self.slug.clone()
    }
}

/// Resolved domain reference ready for indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEntry {
    pub role_name: String,
    pub anchor: String,
    pub type_display: String,
    pub docstrings: String,
    pub name: String,
}

/// Page document for search indexing. Expands into a parent entry plus
/// section and domain child entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDocument {
    pub route: String,
    pub project: String,
    pub version: String,
    pub path: String,
    pub full_path: String,
    pub title: String,
    pub sections: Vec<crate::models::PageSection>,
    pub domains: Vec<DomainEntry>,
    pub publisher: Option<String>,
    pub publisher_project: Option<String>,
    pub tags: Vec<String>,
    pub is_default: bool,
    pub privacy_level: PrivacyLevel,
    pub modified_date: chrono::DateTime<chrono::Utc>,
}

impl PageDocument {
    /// Project a built page onto its index shape.
    ///
    /// Domain metadata extraction can fail on malformed builder output; the
    /// failure is logged per page and the page is indexed with an empty
    /// domain list rather than failing the whole batch.
    pub fn from_page(page: &HtmlPage) -> Self {
        let domains = match prepare_domains(page) {
            Ok(domains) => domains,
            Err(err) => {
                tracing::error!(
                    project = %page.project,
                    version = %page.version,
                    path = %page.path,
                    error = %err,
                    "Error preparing domain data for page"
                );
                Vec::new()
            }
        };

        let full_path = if page.full_path.is_empty() {
            page.path.clone()
        } else {
            page.full_path.clone()
        };

        Self {
            route: page.route(),
            project: page.project.clone(),
            version: page.version.clone(),
            path: page.path.clone(),
            full_path,
            title: page.title.clone(),
            sections: page.sections.clone(),
            domains,
            publisher: page.publisher.clone(),
            publisher_project: page.publisher_project.clone(),
            tags: page.tags.clone(),
            is_default: page.is_default,
            privacy_level: page.privacy_level,
            modified_date: page.modified_date,
        }
    }

    /// Fields shared by the parent entry and every child entry.
    fn add_common_fields(&self, schema: &Schema, doc: &mut TantivyDocument, kind: &str) {
        if let Ok(field) = schema.get_field("route") {
            doc.add_text(field, &self.route);
        }
        if let Ok(field) = schema.get_field("kind") {
            doc.add_text(field, kind);
        }
        if let Ok(field) = schema.get_field("project") {
            doc.add_text(field, &self.project);
        }
        if let Ok(field) = schema.get_field("version") {
            doc.add_text(field, &self.version);
        }
        if let Ok(field) = schema.get_field("path") {
            doc.add_text(field, &self.path);
        }
        if let Ok(field) = schema.get_field("full_path") {
            doc.add_text(field, &self.full_path);
        }
        if let Ok(field) = schema.get_field("project_facet") {
            doc.add_facet(field, facet_value("project", &self.project));
        }
        if let Ok(field) = schema.get_field("version_facet") {
            doc.add_facet(field, facet_value("version", &self.version));
        }
        if let Some(ref publisher) = self.publisher {
            if let Ok(field) = schema.get_field("publisher_facet") {
                doc.add_facet(field, facet_value("publisher", publisher));
            }
        }
        if let Some(ref publisher_project) = self.publisher_project {
            if let Ok(field) = schema.get_field("publisher_project_facet") {
                doc.add_facet(field, facet_value("publisher_project", publisher_project));
            }
        }
        if let Ok(field) = schema.get_field("tags_facet") {
            for tag in &self.tags {
                doc.add_facet(field, facet_value("tags", tag));
            }
        }
        if let Ok(field) = schema.get_field("is_default_facet") {
            doc.add_facet(field, facet_value("is_default", &self.is_default.to_string()));
        }
        if let Ok(field) = schema.get_field("privacy") {
            doc.add_facet(field, facet_value("privacy", &self.privacy_level.to_string()));
        }
        if let Ok(field) = schema.get_field("modified_date") {
            doc.add_date(
                field,
                tantivy::DateTime::from_timestamp_secs(self.modified_date.timestamp()),
            );
        }
    }
}

impl SearchDocument for PageDocument {
    fn to_tantivy_docs(&self, schema: &Schema) -> Vec<TantivyDocument> {
        let mut docs = Vec::with_capacity(1 + self.sections.len() + self.domains.len());

        // Parent entry carries the page title
        let mut parent = TantivyDocument::new();
        self.add_common_fields(schema, &mut parent, KIND_PAGE);
        if let Ok(field) = schema.get_field("title") {
            parent.add_text(field, &self.title);
        }
        docs.push(parent);

        for section in &self.sections {
            let mut doc = TantivyDocument::new();
            self.add_common_fields(schema, &mut doc, KIND_SECTION);
            if let Ok(field) = schema.get_field("section_id") {
                doc.add_text(field, &section.id);
            }
            if let Ok(field) = schema.get_field("title") {
                doc.add_text(field, &section.title);
            }
            if let Ok(field) = schema.get_field("content") {
                doc.add_text(field, &section.content);
            }
            docs.push(doc);
        }

        for domain in &self.domains {
            let mut doc = TantivyDocument::new();
            self.add_common_fields(schema, &mut doc, KIND_DOMAIN);
            if let Ok(field) = schema.get_field("role_name") {
                doc.add_text(field, &domain.role_name);
            }
            if let Ok(field) = schema.get_field("role_name_facet") {
                doc.add_facet(field, facet_value("role_name", &domain.role_name));
            }
            if let Ok(field) = schema.get_field("anchor") {
                doc.add_text(field, &domain.anchor);
            }
            if let Ok(field) = schema.get_field("type_display") {
                doc.add_text(field, &domain.type_display);
            }
            if let Ok(field) = schema.get_field("docstrings") {
                doc.add_text(field, &domain.docstrings);
            }
            if let Ok(field) = schema.get_field("name") {
                doc.add_text(field, &domain.name);
            }
            docs.push(doc);
        }

        docs
    }

    fn document_id(&self) -> String {
        self.route.clone()
    }
}

/// Resolve each domain's docstring from the page's per-anchor domain data.
///
/// A non-string docstring value means the builder output is malformed for
/// this page; the caller logs it and indexes the page without domains.
fn prepare_domains(page: &HtmlPage) -> SearchResult<Vec<DomainEntry>> {
    page.domains
        .iter()
        .map(|domain| {
            let docstrings = resolve_docstring(page, domain)?;
            Ok(DomainEntry {
                role_name: domain.role_name.clone(),
                anchor: domain.anchor.clone(),
                type_display: domain.type_display.clone(),
                docstrings,
                name: domain.name.clone(),
            })
        })
        .collect()
}

fn resolve_docstring(page: &HtmlPage, domain: &SphinxDomain) -> SearchResult<String> {
    match page.domain_data.get(&domain.anchor) {
        None | Some(serde_json::Value::Null) => Ok(domain.docstrings.clone()),
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(SearchError::SchemaError(format!(
            "domain data for anchor {} is not a string: {}",
            domain.anchor, other
        ))),
    }
}

/// Build the search schema for the project index
pub fn build_project_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    // Identity - raw token so replace/delete works on the whole slug
    schema_builder.add_text_field("slug", STRING | STORED);
    schema_builder.add_text_field("url", STRING | STORED);

    // Searchable content
    schema_builder.add_text_field("name", TEXT | STORED);
    schema_builder.add_text_field("slug_text", TEXT);
    schema_builder.add_text_field("description", TEXT | STORED);

    // Display-only metadata
    schema_builder.add_text_field("language", STRING | STORED);
    schema_builder.add_text_field("users", STRING | STORED);
    schema_builder.add_text_field("publisher", STRING | STORED);
    schema_builder.add_text_field("publisher_project", STRING | STORED);

    // Facet dimensions
    schema_builder.add_facet_field("language_facet", INDEXED);
    schema_builder.add_facet_field("publisher_facet", INDEXED);
    schema_builder.add_facet_field("publisher_project_facet", INDEXED);
    schema_builder.add_facet_field("tags_facet", INDEXED);
    schema_builder.add_facet_field("privacy", INDEXED);

    schema_builder.add_date_field("modified_date", INDEXED | STORED | FAST);

    schema_builder.build()
}

/// Build the search schema for the page index
pub fn build_page_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    // Identity and merge keys
    schema_builder.add_text_field("route", STRING | STORED);
    schema_builder.add_text_field("kind", STRING | STORED);
    schema_builder.add_text_field("project", STRING | STORED);
    schema_builder.add_text_field("version", STRING | STORED);
    schema_builder.add_text_field("path", STRING | STORED);
    schema_builder.add_text_field("full_path", STRING | STORED);

    // Searchable content (parent title or section title)
    schema_builder.add_text_field("title", TEXT | STORED);
    schema_builder.add_text_field("content", TEXT | STORED);

    // Domain reference entries
    schema_builder.add_text_field("section_id", STRING | STORED);
    schema_builder.add_text_field("role_name", STRING | STORED);
    schema_builder.add_text_field("anchor", STRING | STORED);
    schema_builder.add_text_field("type_display", STORED);
    schema_builder.add_text_field("docstrings", TEXT | STORED);
    schema_builder.add_text_field("name", TEXT | STORED);

    // Facet dimensions
    schema_builder.add_facet_field("project_facet", INDEXED);
    schema_builder.add_facet_field("version_facet", INDEXED);
    schema_builder.add_facet_field("role_name_facet", INDEXED);
    schema_builder.add_facet_field("publisher_facet", INDEXED);
    schema_builder.add_facet_field("publisher_project_facet", INDEXED);
    schema_builder.add_facet_field("tags_facet", INDEXED);
    schema_builder.add_facet_field("is_default_facet", INDEXED);
    schema_builder.add_facet_field("privacy", INDEXED);

    schema_builder.add_date_field("modified_date", INDEXED | STORED | FAST);

    schema_builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageSection;
    use chrono::Utc;
    use std::collections::HashMap;

    fn sample_page() -> HtmlPage {
        HtmlPage {
            project: "pip".to_string(),
            version: "latest".to_string(),
            path: "guides/install.html".to_string(),
            full_path: String::new(),
            title: "Installing".to_string(),
            sections: vec![PageSection {
                id: "usage".to_string(),
                title: "Usage".to_string(),
                content: "Run pip install".to_string(),
            }],
            domains: vec![SphinxDomain {
                role_name: "py:function".to_string(),
                anchor: "pip.main".to_string(),
                type_display: "function".to_string(),
                docstrings: String::new(),
                name: "pip.main".to_string(),
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

    #[test]
    fn test_page_expands_to_parent_and_children() {
        let schema = build_page_schema();
        let doc = PageDocument::from_page(&sample_page());
        let docs = doc.to_tantivy_docs(&schema);
        // 1 parent + 1 section + 1 domain
        assert_eq!(docs.len(), 3);
        assert_eq!(doc.document_id(), "pip/latest/guides/install.html");
    }

    #[test]
    fn test_domain_docstring_resolved_from_domain_data() {
        let mut page = sample_page();
        page.domain_data.insert(
            "pip.main".to_string(),
            serde_json::Value::String("Entry point".to_string()),
        );
        let doc = PageDocument::from_page(&page);
        assert_eq!(doc.domains[0].docstrings, "Entry point");
    }

    #[test]
    fn test_malformed_domain_data_indexes_empty_domains() {
        let mut page = sample_page();
        page.domain_data
            .insert("pip.main".to_string(), serde_json::json!({"bad": true}));
        let doc = PageDocument::from_page(&page);
        assert!(doc.domains.is_empty());
        // The page itself is still indexed
        let schema = build_page_schema();
        assert_eq!(doc.to_tantivy_docs(&schema).len(), 2);
    }

    #[test]
    fn test_schema_building() {
        let schema = build_page_schema();
        assert!(schema.get_field("route").is_ok());
        assert!(schema.get_field("title").is_ok());
        assert!(schema.get_field("project_facet").is_ok());
        assert!(schema.get_field("privacy").is_ok());

        let schema = build_project_schema();
        assert!(schema.get_field("slug").is_ok());
        assert!(schema.get_field("name").is_ok());
        assert!(schema.get_field("language_facet").is_ok());
    }
}
