//! Paper reference pipeline.
//!
//! Provides:
//! - Domain-scoped query fanout with a settle-all join
//! - Bibliographic heuristics over search snippets
//! - Dedup, per-query cap, ranking and truncation of references

pub mod extractor;
pub mod fanout;
pub mod heuristics;

pub use extractor::{extract_references, extract_references_or_empty, MAX_REFERENCES, PER_QUERY_CAP};
pub use fanout::{build_queries, fan_out, DomainGroup, QueryOutcome, RawResultSet, SettledQuery};
pub use heuristics::{
    infer_authors, infer_doi, infer_journal, infer_year, is_whitelisted, relevance_score,
};
