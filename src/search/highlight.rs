//! HTML-safe highlight fragments for search results.
//!
//! Fragments are produced from the stored field text with the engine's
//! snippet machinery. The raw text is HTML-escaped before the highlight
//! tags are inserted, so page content can never smuggle markup into the
//! results page.

use crate::search::error::{SearchError, SearchResult};
use tantivy::query::Query;
use tantivy::schema::Field;
use tantivy::snippet::SnippetGenerator;
use tantivy::{Searcher, TantivyDocument};

/// Highlighted terms are wrapped in a bare span; styling is the caller's
/// concern.
const HIGHLIGHT_PREFIX: &str = "<span>";
const HIGHLIGHT_POSTFIX: &str = "</span>";

/// Produces highlight fragments for one field of one query.
pub struct Highlighter {
    field_name: String,
    generator: SnippetGenerator,
}

impl Highlighter {
    /// Build a highlighter for `field` against the executed query.
    pub fn new(
        searcher: &Searcher,
        query: &dyn Query,
        field_name: &str,
        field: Field,
        max_chars: usize,
    ) -> SearchResult<Self> {
        let mut generator = SnippetGenerator::create(searcher, query, field)
            .map_err(|e| SearchError::SearchFailed(format!("Failed to create snippet generator: {}", e)))?;
        generator.set_max_num_chars(max_chars);

        Ok(Self {
            field_name: field_name.to_string(),
            generator,
        })
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Escaped highlight fragment for the document, or `None` when the
    /// field has no match to highlight.
    pub fn fragment(&self, doc: &TantivyDocument) -> Option<String> {
        let mut snippet = self.generator.snippet_from_doc(doc);
        if snippet.highlighted().is_empty() {
            return None;
        }
        snippet.set_snippet_prefix_postfix(HIGHLIGHT_PREFIX, HIGHLIGHT_POSTFIX);
        Some(snippet.to_html())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tantivy::query::QueryParser;
    use tantivy::schema::{Schema, STORED, TEXT};
    use tantivy::{doc, Index};

    fn searchable_index() -> (Index, Field) {
        let mut builder = Schema::builder();
        let content = builder.add_text_field("content", TEXT | STORED);
        let schema = builder.build();
        let index = Index::create_in_ram(schema);
        (index, content)
    }

    #[test]
    fn test_fragment_escapes_html() {
        let (index, content) = searchable_index();
        let mut writer = index.writer(15_000_000).unwrap();
        writer
            .add_document(doc!(content => "Use <b>pip</b> to install packages"))
            .unwrap();
        writer.commit().unwrap();

        let reader = index.reader().unwrap();
        let searcher = reader.searcher();
        let query = QueryParser::for_index(&index, vec![content])
            .parse_query("install")
            .unwrap();

        let highlighter = Highlighter::new(&searcher, &*query, "content", content, 150).unwrap();
        let doc: TantivyDocument = searcher.doc(tantivy::DocAddress::new(0, 0)).unwrap();
        let fragment = highlighter.fragment(&doc).unwrap();

        assert!(fragment.contains("<span>install</span>"));
        assert!(!fragment.contains("<b>"));
        assert!(fragment.contains("&lt;b&gt;"));
    }

    #[test]
    fn test_no_match_yields_no_fragment() {
        let (index, content) = searchable_index();
        let mut writer = index.writer(15_000_000).unwrap();
        writer
            .add_document(doc!(content => "completely unrelated text"))
            .unwrap();
        writer.commit().unwrap();

        let reader = index.reader().unwrap();
        let searcher = reader.searcher();
        let query = QueryParser::for_index(&index, vec![content])
            .parse_query("missing")
            .unwrap();

        let highlighter = Highlighter::new(&searcher, &*query, "content", content, 150).unwrap();
        let doc: TantivyDocument = searcher.doc(tantivy::DocAddress::new(0, 0)).unwrap();
        assert!(highlighter.fragment(&doc).is_none());
    }
}
