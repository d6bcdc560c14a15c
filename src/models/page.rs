use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::models::PrivacyLevel;

/// One section of a built HTML page (a heading and the text under it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSection {
    /// Anchor id of the section heading
    pub id: String,

    /// Section title
    pub title: String,

    /// Section body text
    #[serde(default)]
    pub content: String,
}

/// A cross-reference entry extracted from the page (function, class,
/// configuration value, ...), in the shape produced by the doc builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SphinxDomain {
    /// Reference role, e.g. "py:function"
    pub role_name: String,

    /// Anchor for linking into the page
    pub anchor: String,

    /// Human-readable type label
    #[serde(default)]
    pub type_display: String,

    /// Symbol docstring, resolved from the page's domain data
    #[serde(default)]
    pub docstrings: String,

    /// Symbol name
    pub name: String,
}

/// A built documentation page, the unit of page-type search.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HtmlPage {
    /// Owning project slug
    #[validate(length(min = 1, max = 255))]
    pub project: String,

    /// Version slug the page was built for
    #[validate(length(min = 1, max = 255))]
    pub version: String,

    /// Page path as produced by the builder (e.g. "guides/install.html")
    #[validate(length(min = 1))]
    pub path: String,

    /// Path including any serving prefix
    #[serde(default)]
    pub full_path: String,

    /// Page title
    #[serde(default)]
    pub title: String,

    /// Page sections
    #[serde(default)]
    pub sections: Vec<PageSection>,

    /// Cross-reference entries; docstrings are resolved from `domain_data`
    /// keyed by anchor
    #[serde(default)]
    pub domains: Vec<SphinxDomain>,

    /// Docstring text per anchor, as emitted by the builder
    #[serde(default)]
    pub domain_data: HashMap<String, serde_json::Value>,

    /// Visibility of this page in public search
    #[serde(default)]
    pub privacy_level: PrivacyLevel,

    /// Publisher of the owning project, denormalized for faceting
    #[serde(default)]
    pub publisher: Option<String>,

    /// Publisher sub-project of the owning project
    #[serde(default)]
    pub publisher_project: Option<String>,

    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Whether the page belongs to the project's default version
    #[serde(default)]
    pub is_default: bool,

    /// Last modification timestamp, used for date sorting
    #[serde(default = "Utc::now")]
    pub modified_date: DateTime<Utc>,
}

impl HtmlPage {
    /// Unique key of this page in the search index. Children (sections,
    /// domain entries) share the key so a page can be replaced atomically.
    pub fn route(&self) -> String {
        format!("{}/{}/{}", self.project, self.version, self.path)
    }
}
