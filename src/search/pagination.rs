//! Pagination over an already-computed hit list.

use crate::search::faceted::SearchHit;
use crate::search::query::SortKey;
use serde::Serialize;

/// One page window over the hit list, 1-based.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    /// Current page number
    pub number: usize,

    /// Total pages
    pub num_pages: usize,

    /// Total results across all pages (engine total, not the window)
    pub total: usize,

    pub has_previous: bool,
    pub has_next: bool,

    /// Hits on this page
    pub hits: Vec<SearchHit>,
}

/// Paginator with a fixed page size. Page numbers are 1-based; anything
/// unparseable, zero or out of range falls back to page 1.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: usize,
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    /// Resolve the raw page parameter to a valid page number.
    fn resolve(&self, raw: Option<&str>, num_pages: usize) -> usize {
        let requested = raw.and_then(|p| p.parse::<usize>().ok()).unwrap_or(1);
        if requested == 0 || requested > num_pages {
            1
        } else {
            requested
        }
    }

    /// Slice the hit window for the requested page. `total` is the engine
    /// total and may exceed the fetched window.
    pub fn paginate(&self, hits: Vec<SearchHit>, total: usize, raw_page: Option<&str>) -> Page {
        let num_pages = hits.len().div_ceil(self.page_size).max(1);
        let number = self.resolve(raw_page, num_pages);

        let start = (number - 1) * self.page_size;
        let window: Vec<SearchHit> = hits
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .collect();

        Page {
            number,
            num_pages,
            total,
            has_previous: number > 1,
            has_next: number < num_pages,
            hits: window,
        }
    }
}

/// Apply the requested sort over the fetched hits. Relevance keeps engine
/// order; date sorts push hits without a timestamp to the end.
pub fn apply_sort(hits: &mut [SearchHit], sort: SortKey) {
    match sort {
        SortKey::Relevance => {}
        SortKey::Alphabetical => {
            hits.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        }
        SortKey::Newest => {
            hits.sort_by(|a, b| b.modified.cmp(&a.modified));
        }
        SortKey::Oldest => {
            hits.sort_by(|a, b| match (a.modified, b.modified) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
        }
    }
}

/// Re-sort each hit's inner hits by non-increasing score. The engine
/// interleaves section and domain matches; display wants them merged by
/// relevance.
pub fn sort_inner_hits(hits: &mut [SearchHit]) {
    for hit in hits.iter_mut() {
        hit.inner_hits
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::faceted::InnerHit;
    use std::collections::BTreeMap;

    fn hit(title: &str, score: f32) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            link: format!("/{}", title),
            project: None,
            version: None,
            path: None,
            modified: None,
            score,
            highlights: BTreeMap::new(),
            inner_hits: Vec::new(),
        }
    }

    fn hits(n: usize) -> Vec<SearchHit> {
        (0..n).map(|i| hit(&format!("hit-{}", i), (n - i) as f32)).collect()
    }

    #[test]
    fn test_pagination_windows() {
        let paginator = Paginator::new(9);
        let page = paginator.paginate(hits(20), 20, Some("2"));

        assert_eq!(page.number, 2);
        assert_eq!(page.num_pages, 3);
        assert_eq!(page.hits.len(), 9);
        assert_eq!(page.hits[0].title, "hit-9");
        assert!(page.has_previous);
        assert!(page.has_next);
    }

    #[test]
    fn test_invalid_page_falls_back_to_first() {
        let paginator = Paginator::new(9);

        for raw in [Some("abc"), Some("0"), Some("-3"), None] {
            let page = paginator.paginate(hits(20), 20, raw);
            assert_eq!(page.number, 1);
            assert_eq!(page.hits[0].title, "hit-0");
        }
    }

    #[test]
    fn test_out_of_range_page_serves_first_page_results() {
        let paginator = Paginator::new(9);
        let page = paginator.paginate(hits(20), 20, Some("50"));

        assert_eq!(page.number, 1);
        assert_eq!(page.hits.len(), 9);
        assert_eq!(page.hits[0].title, "hit-0");
    }

    #[test]
    fn test_empty_hits_still_yield_one_page() {
        let paginator = Paginator::new(9);
        let page = paginator.paginate(Vec::new(), 0, None);

        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
        assert!(page.hits.is_empty());
        assert!(!page.has_next);
    }

    #[test]
    fn test_apply_sort() {
        use chrono::{TimeZone, Utc};

        let mut hits = vec![hit("beta", 2.0), hit("Alpha", 1.0)];
        hits[0].modified = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        hits[1].modified = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());

        let mut by_name = hits.clone();
        apply_sort(&mut by_name, SortKey::Alphabetical);
        assert_eq!(by_name[0].title, "Alpha");

        let mut newest = hits.clone();
        apply_sort(&mut newest, SortKey::Newest);
        assert_eq!(newest[0].title, "Alpha");

        let mut oldest = hits.clone();
        apply_sort(&mut oldest, SortKey::Oldest);
        assert_eq!(oldest[0].title, "beta");

        apply_sort(&mut hits, SortKey::Relevance);
        assert_eq!(hits[0].title, "beta");
    }

    #[test]
    fn test_inner_hits_sorted_by_descending_score() {
        let mut h = hit("page", 5.0);
        for (kind, score) in [("section", 1.0), ("domain", 3.0), ("section", 2.0)] {
            h.inner_hits.push(InnerHit {
                kind: kind.to_string(),
                score,
                title: String::new(),
                section_id: None,
                role_name: None,
                anchor: None,
                highlights: BTreeMap::new(),
            });
        }
        let mut all = vec![h];
        sort_inner_hits(&mut all);

        let scores: Vec<f32> = all[0].inner_hits.iter().map(|i| i.score).collect();
        assert_eq!(scores, vec![3.0, 2.0, 1.0]);
    }
}
