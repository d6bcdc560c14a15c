//! User-defined redirects for documentation pages.
//!
//! Rules are evaluated in order against an incoming request; the first rule
//! producing a destination wins. Destinations that would redirect a request
//! to itself are skipped so a misconfigured rule cannot loop.

use crate::models::Project;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use validator::Validate;

static CROSSDOMAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://").expect("valid crossdomain pattern"));

/// Marker in an exact-rule `from_url` capturing the unmatched remainder.
const REST_MARKER: &str = "$rest";

/// How a rule matches and rewrites a request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RedirectType {
    /// `from_url` prefix of the page filename; remainder served under the
    /// project's version root
    Prefix,
    /// Exact filename match; `to_url` resolved under the version root,
    /// crossdomain destinations allowed
    Page,
    /// Exact request-path match; `to_url` used verbatim. A `$rest` suffix
    /// on `from_url` appends the unmatched remainder
    Exact,
    /// `/` or `/index.html` suffix rewritten to the `.html` form
    SphinxHtml,
    /// `.html` suffix rewritten to the trailing-`/` form
    SphinxHtmldir,
}

/// One user-defined redirect rule.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RedirectRule {
    pub redirect_type: RedirectType,

    #[serde(default)]
    pub from_url: String,

    #[serde(default)]
    pub to_url: String,

    /// 301 or 302
    #[serde(default = "default_http_status")]
    #[validate(range(min = 301, max = 302))]
    pub http_status: u16,
}

fn default_http_status() -> u16 {
    302
}

/// A resolved redirect: where to send the client and with which status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectMatch {
    pub location: String,
    pub http_status: u16,
}

/// Resolve a destination under the project's docs root.
///
/// Crossdomain destinations are only honored where `allow_crossdomain` is
/// set; everywhere else the URL is treated as a literal path tail so a rule
/// cannot smuggle users off-site.
fn get_full_path(
    project: &Project,
    filename: &str,
    allow_crossdomain: bool,
    subdomain: bool,
) -> String {
    if allow_crossdomain && CROSSDOMAIN_RE.is_match(filename) {
        return filename.to_string();
    }
    let root = project.docs_path(None, None, subdomain);
    format!("{}{}", root, filename.trim_start_matches('/'))
}

/// Evaluate one rule. `filename` is the page path relative to the project's
/// version root; `path` is the full request path.
fn apply_rule(
    project: &Project,
    rule: &RedirectRule,
    filename: &str,
    path: &str,
    subdomain: bool,
) -> Option<String> {
    match rule.redirect_type {
        RedirectType::Prefix => {
            let remainder = filename.strip_prefix(rule.from_url.as_str())?;
            Some(get_full_path(project, remainder, false, subdomain))
        }
        RedirectType::Page => {
            if filename != rule.from_url {
                return None;
            }
            Some(get_full_path(project, &rule.to_url, true, subdomain))
        }
        RedirectType::Exact => {
            if let Some(pattern) = rule.from_url.strip_suffix(REST_MARKER) {
                let remainder = path.strip_prefix(pattern)?;
                return Some(format!("{}{}", rule.to_url, remainder));
            }
            if path != rule.from_url {
                return None;
            }
            Some(rule.to_url.clone())
        }
        RedirectType::SphinxHtml => {
            let stem = filename
                .strip_suffix("/index.html")
                .or_else(|| filename.strip_suffix('/'))?;
            Some(get_full_path(
                project,
                &format!("{}.html", stem),
                false,
                subdomain,
            ))
        }
        RedirectType::SphinxHtmldir => {
            let stem = filename.strip_suffix(".html")?;
            Some(get_full_path(project, &format!("{}/", stem), false, subdomain))
        }
    }
}

/// Find the redirect for a request, if any.
///
/// Rules are tried in list order; the first rule yielding a destination
/// different from the request path wins. A rule whose destination equals
/// the request path is skipped (self-redirect guard). The original query
/// string is preserved on the destination.
pub fn get_redirect_path(
    project: &Project,
    rules: &[RedirectRule],
    filename: &str,
    path: &str,
    query: Option<&str>,
    subdomain: bool,
) -> Option<RedirectMatch> {
    for rule in rules {
        let Some(destination) = apply_rule(project, rule, filename, path, subdomain) else {
            continue;
        };
        if destination == path {
            tracing::debug!(
                project = %project.slug,
                path = %path,
                "Skipping redirect rule that points to itself"
            );
            continue;
        }

        let location = match query {
            Some(q) if !q.is_empty() => {
                let separator = if destination.contains('?') { "&" } else { "?" };
                format!("{}{}{}", destination, separator, q)
            }
            _ => destination,
        };

        tracing::info!(
            project = %project.slug,
            from = %path,
            to = %location,
            status = rule.http_status,
            "Resolved redirect"
        );
        return Some(RedirectMatch {
            location,
            http_status: rule.http_status,
        });
    }
    None
}
