//! In-memory registry of projects, their pages and their redirect rules.
//!
//! The registry is the system of record for reindexing: a rebuild replays
//! everything registered here into the search indexes.

use crate::error::{AppError, Result};
use crate::models::{HtmlPage, Project};
use crate::redirects::RedirectRule;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct ProjectRegistry {
    projects: Arc<DashMap<String, Project>>,
    /// Pages keyed by route (`project/version/path`)
    pages: Arc<DashMap<String, HtmlPage>>,
    /// Ordered redirect rules per project slug
    redirects: Arc<DashMap<String, Vec<RedirectRule>>>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self {
            projects: Arc::new(DashMap::new()),
            pages: Arc::new(DashMap::new()),
            redirects: Arc::new(DashMap::new()),
        }
    }

    pub fn upsert_project(&self, project: Project) {
        tracing::debug!(slug = %project.slug, "Project registered");
        self.projects.insert(project.slug.clone(), project);
    }

    pub fn get_project(&self, slug: &str) -> Result<Project> {
        self.projects
            .get(slug)
            .map(|entry| entry.clone())
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", slug)))
    }

    pub fn remove_project(&self, slug: &str) -> Result<Project> {
        let (_, project) = self
            .projects
            .remove(slug)
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", slug)))?;

        let prefix = format!("{}/", slug);
        self.pages.retain(|route, _| !route.starts_with(&prefix));
        self.redirects.remove(slug);

        tracing::debug!(slug = %slug, "Project removed");
        Ok(project)
    }

    pub fn list_projects(&self) -> Vec<Project> {
        let mut projects: Vec<Project> =
            self.projects.iter().map(|entry| entry.value().clone()).collect();
        projects.sort_by(|a, b| a.slug.cmp(&b.slug));
        projects
    }

    /// Register a page under its route. The owning project must exist.
    pub fn upsert_page(&self, page: HtmlPage) -> Result<String> {
        if !self.projects.contains_key(&page.project) {
            return Err(AppError::NotFound(format!(
                "Project {} not found",
                page.project
            )));
        }
        let route = page.route();
        self.pages.insert(route.clone(), page);
        Ok(route)
    }

    pub fn remove_page(&self, route: &str) -> Result<HtmlPage> {
        self.pages
            .remove(route)
            .map(|(_, page)| page)
            .ok_or_else(|| AppError::NotFound(format!("Page {} not found", route)))
    }

    pub fn list_pages(&self) -> Vec<HtmlPage> {
        self.pages.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Replace the project's redirect rules with the given ordered list.
    pub fn set_redirects(&self, slug: &str, rules: Vec<RedirectRule>) -> Result<usize> {
        if !self.projects.contains_key(slug) {
            return Err(AppError::NotFound(format!("Project {} not found", slug)));
        }
        let count = rules.len();
        self.redirects.insert(slug.to_string(), rules);
        tracing::debug!(slug = %slug, rules = count, "Redirect rules replaced");
        Ok(count)
    }

    pub fn redirects_for(&self, slug: &str) -> Vec<RedirectRule> {
        self.redirects
            .get(slug)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }
}

impl Default for ProjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PrivacyLevel;
    use crate::redirects::RedirectType;
    use chrono::Utc;
    use std::collections::HashMap;

    fn project(slug: &str) -> Project {
        Project {
            slug: slug.to_string(),
            name: slug.to_string(),
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

    fn page(project: &str, path: &str) -> HtmlPage {
        HtmlPage {
            project: project.to_string(),
            version: "latest".to_string(),
            path: path.to_string(),
            full_path: String::new(),
            title: "Title".to_string(),
            sections: vec![],
            domains: vec![],
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
    fn test_project_roundtrip() {
        let registry = ProjectRegistry::new();
        registry.upsert_project(project("pip"));

        assert_eq!(registry.get_project("pip").unwrap().slug, "pip");
        assert!(registry.get_project("missing").is_err());
        assert_eq!(registry.list_projects().len(), 1);
    }

    #[test]
    fn test_page_requires_project() {
        let registry = ProjectRegistry::new();
        assert!(registry.upsert_page(page("pip", "install.html")).is_err());

        registry.upsert_project(project("pip"));
        let route = registry.upsert_page(page("pip", "install.html")).unwrap();
        assert_eq!(route, "pip/latest/install.html");
    }

    #[test]
    fn test_remove_project_drops_pages_and_redirects() {
        let registry = ProjectRegistry::new();
        registry.upsert_project(project("pip"));
        registry.upsert_page(page("pip", "install.html")).unwrap();
        registry
            .set_redirects(
                "pip",
                vec![RedirectRule {
                    redirect_type: RedirectType::SphinxHtml,
                    from_url: String::new(),
                    to_url: String::new(),
                    http_status: 302,
                }],
            )
            .unwrap();

        registry.remove_project("pip").unwrap();
        assert!(registry.list_pages().is_empty());
        assert!(registry.redirects_for("pip").is_empty());
    }
}
