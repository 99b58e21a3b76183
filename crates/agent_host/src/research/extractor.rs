//! Turns raw result sets into the ranked reference list for one turn.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

use shared::chat::{PaperSearchResult, Reference};

use super::fanout::RawResultSet;
use super::heuristics::{
    infer_authors, infer_doi, infer_journal, infer_year, is_whitelisted, relevance_score,
    ABSTRACT_UNAVAILABLE,
};

/// Accepted items per query before the global merge.
pub const PER_QUERY_CAP: usize = 2;
/// Length of the final list.
pub const MAX_REFERENCES: usize = 6;

/// Build, dedup, cap, rank and truncate references.
///
/// Result sets are processed in slice order and items in backend order, so the
/// output is deterministic for fixed input. Titles are deduplicated by exact,
/// case-sensitive match against everything accepted so far in the turn.
pub fn extract_references(result_sets: &[RawResultSet], question: &str) -> PaperSearchResult {
    let mut accepted: Vec<Reference> = Vec::new();
    let mut seen_titles: HashSet<String> = HashSet::new();

    for set in result_sets {
        let mut taken = 0;
        for item in &set.items {
            if taken == PER_QUERY_CAP {
                break;
            }
            let (Some(title), Some(link)) = (item.title.as_deref(), item.link.as_deref()) else {
                continue;
            };
            if title.is_empty() || !is_whitelisted(link) {
                continue;
            }
            if !seen_titles.insert(title.to_string()) {
                continue;
            }

            let snippet = item.snippet.as_deref().filter(|s| !s.is_empty());
            accepted.push(Reference {
                id: format!("{}-{}", set.query_index, taken),
                title: title.to_string(),
                authors: infer_authors(snippet),
                journal: infer_journal(link),
                year: infer_year(snippet, title),
                doi: infer_doi(link),
                url: link.to_string(),
                relevance_score: relevance_score(link, title, question),
                abstract_text: snippet.unwrap_or(ABSTRACT_UNAVAILABLE).to_string(),
            });
            taken += 1;
        }
    }

    let total_found = accepted.len();
    // sort_by is stable: ties keep insertion order
    accepted.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    accepted.truncate(MAX_REFERENCES);

    PaperSearchResult {
        papers: accepted,
        query: question.to_string(),
        total_found,
    }
}

/// [`extract_references`], degrading to an empty list on any unexpected failure.
pub fn extract_references_or_empty(
    result_sets: &[RawResultSet],
    question: &str,
) -> PaperSearchResult {
    degrade_on_panic(question, || extract_references(result_sets, question))
}

fn degrade_on_panic(
    question: &str,
    extract: impl FnOnce() -> PaperSearchResult,
) -> PaperSearchResult {
    match catch_unwind(AssertUnwindSafe(extract)) {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("reference extraction failed; continuing without references");
            PaperSearchResult {
                papers: Vec::new(),
                query: question.to_string(),
                total_found: 0,
            }
        }
    }
}
