use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use validator::Validate;

/// Per-document visibility flag. Private content is excluded from public
/// search results server-side and cannot be re-included by client filters.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PrivacyLevel {
    #[default]
    Public,
    Protected,
    Private,
}

/// A hosted documentation project.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Project {
    /// URL-safe identifier, unique across the deployment
    #[validate(length(min = 1, max = 255))]
    pub slug: String,

    /// Human-readable name
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    /// Short description shown in search results
    #[serde(default)]
    pub description: String,

    /// Documentation language code (e.g. "en", "it")
    #[serde(default = "default_language")]
    pub language: String,

    /// Version served when none is requested
    #[serde(default = "default_version")]
    pub default_version: String,

    /// Serve a single unversioned tree instead of per-version roots
    #[serde(default)]
    pub single_version: bool,

    /// Visibility of the project in public search
    #[serde(default)]
    pub privacy_level: PrivacyLevel,

    /// Usernames of the project maintainers
    #[serde(default)]
    pub users: Vec<String>,

    /// Publisher that owns this project, if any
    #[serde(default)]
    pub publisher: Option<String>,

    /// Publisher sub-project grouping, if any
    #[serde(default)]
    pub publisher_project: Option<String>,

    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Last modification timestamp, used for date sorting
    #[serde(default = "Utc::now")]
    pub modified_date: DateTime<Utc>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_version() -> String {
    "latest".to_string()
}

impl Project {
    /// Root path of the documentation tree for `version`, relative to the
    /// serving host. Subdomain serving drops the `/docs/<slug>` prefix;
    /// single-version projects drop the language/version segments.
    pub fn docs_path(&self, version: Option<&str>, language: Option<&str>, subdomain: bool) -> String {
        let prefix = if subdomain {
            String::new()
        } else {
            format!("/docs/{}", self.slug)
        };

        if self.single_version {
            return format!("{}/", prefix);
        }

        format!(
            "{}/{}/{}/",
            prefix,
            language.unwrap_or(&self.language),
            version.unwrap_or(&self.default_version),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Project {
        Project {
            slug: "pip".to_string(),
            name: "Pip".to_string(),
            description: String::new(),
            language: "en".to_string(),
            default_version: "latest".to_string(),
            single_version: false,
            privacy_level: PrivacyLevel::Public,
            users: vec![],
            publisher: None,
            publisher_project: None,
            tags: vec![],
            modified_date: Utc::now(),
        }
    }

    #[test]
    fn test_docs_path() {
        let p = project();
        assert_eq!(p.docs_path(None, None, false), "/docs/pip/en/latest/");
        assert_eq!(p.docs_path(None, None, true), "/en/latest/");
        assert_eq!(p.docs_path(Some("0.8.2"), Some("de"), true), "/de/0.8.2/");
    }

    #[test]
    fn test_docs_path_single_version() {
        let mut p = project();
        p.single_version = true;
        assert_eq!(p.docs_path(None, None, false), "/docs/pip/");
        assert_eq!(p.docs_path(None, None, true), "/");
    }

    #[test]
    fn test_privacy_level_roundtrip() {
        assert_eq!("private".parse::<PrivacyLevel>().unwrap(), PrivacyLevel::Private);
        assert_eq!(PrivacyLevel::Public.to_string(), "public");
    }
}
