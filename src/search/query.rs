//! Typed user input and query construction.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::Term;

/// Requested result type; anything unrecognized falls back to project search.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResultType {
    #[default]
    Project,
    File,
}

impl ResultType {
    pub fn parse(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

/// Sort order for search results. Invalid or absent keys silently fall back
/// to relevance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortKey {
    #[default]
    Relevance,
    Alphabetical,
    Newest,
    Oldest,
}

impl SortKey {
    pub fn parse(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Relevance => "Relevance",
            SortKey::Alphabetical => "Alphabetical",
            SortKey::Newest => "Newest",
            SortKey::Oldest => "Oldest",
        }
    }

    /// All sort choices with labels and the selected flag, for rendering.
    pub fn choices(selected: SortKey) -> Vec<SortChoice> {
        SortKey::iter()
            .map(|key| SortChoice {
                key,
                label: key.label(),
                selected: key == selected,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SortChoice {
    pub key: SortKey,
    pub label: &'static str,
    pub selected: bool,
}

/// An immutable record of everything the request asked for. Fully determined
/// by the incoming request and discarded with it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInput {
    /// Free-text query; empty means "not searched"
    pub query: Option<String>,

    /// Result type selector
    pub result_type: ResultType,

    pub project: Option<String>,
    pub version: Option<String>,
    pub language: Option<String>,
    pub role_name: Option<String>,
    pub index: Option<String>,
    pub publisher: Option<String>,
    pub publisher_project: Vec<String>,
    pub tags: Vec<String>,
    pub is_default: Option<String>,

    /// Sort key (already validated, invalid input collapsed to relevance)
    pub sort: SortKey,

    /// Raw page parameter, validated by the paginator
    pub page: Option<String>,
}

impl UserInput {
    /// Selected values for a facet dimension, by name.
    pub fn facet_values(&self, facet: &str) -> Vec<String> {
        let single = |v: &Option<String>| -> Vec<String> {
            v.as_ref().filter(|s| !s.is_empty()).cloned().into_iter().collect()
        };
        match facet {
            "project" => single(&self.project),
            "version" => single(&self.version),
            "language" => single(&self.language),
            "role_name" => single(&self.role_name),
            "index" => single(&self.index),
            "publisher" => single(&self.publisher),
            "publisher_project" => self.publisher_project.clone(),
            "tags" => self.tags.clone(),
            "is_default" => single(&self.is_default),
            _ => Vec::new(),
        }
    }

    pub fn has_query(&self) -> bool {
        self.query.as_deref().map(|q| !q.trim().is_empty()).unwrap_or(false)
    }
}

/// Split a query into lowercase alphanumeric terms, matching the index
/// tokenizer so term queries line up with what was indexed.
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// A searchable field with its relevance boost.
#[derive(Debug, Clone, Copy)]
pub struct BoostedField {
    pub field: Field,
    pub boost: f32,
}

impl BoostedField {
    pub fn new(field: Field, boost: f32) -> Self {
        Self { field, boost }
    }
}

/// One clause matching `term` in any of the fields, boosted per field.
fn term_clause(fields: &[BoostedField], term: &str) -> Box<dyn Query> {
    let subqueries: Vec<(Occur, Box<dyn Query>)> = fields
        .iter()
        .map(|bf| {
            let term_query: Box<dyn Query> = Box::new(TermQuery::new(
                Term::from_field_text(bf.field, term),
                IndexRecordOption::WithFreqs,
            ));
            let boosted: Box<dyn Query> = if (bf.boost - 1.0).abs() > f32::EPSILON {
                Box::new(BoostQuery::new(term_query, bf.boost))
            } else {
                term_query
            };
            (Occur::Should, boosted)
        })
        .collect();
    Box::new(BooleanQuery::new(subqueries))
}

/// Build the dual-operator union over a field set.
///
/// Two variants of the text query are produced: one requiring every term
/// (`and`) and one accepting any term (`or`). They are unioned with OR so a
/// document matching all terms accumulates both variants' scores and ranks
/// above partial matches, while partial matches still surface.
pub fn operator_union(fields: &[BoostedField], terms: &[String]) -> Box<dyn Query> {
    let and_variant: Vec<(Occur, Box<dyn Query>)> = terms
        .iter()
        .map(|t| (Occur::Must, term_clause(fields, t)))
        .collect();
    let or_variant: Vec<(Occur, Box<dyn Query>)> = terms
        .iter()
        .map(|t| (Occur::Should, term_clause(fields, t)))
        .collect();

    Box::new(BooleanQuery::new(vec![
        (Occur::Should, Box::new(BooleanQuery::new(and_variant)) as Box<dyn Query>),
        (Occur::Should, Box::new(BooleanQuery::new(or_variant)) as Box<dyn Query>),
    ]))
}
