//! Domain-scoped query construction and concurrent dispatch.

use std::sync::Arc;

use futures::future::join_all;
use services::SearchProvider;
use shared::search_types::{RawResultItem, SearchOptions};

/// Cluster of academic domains targeted by one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainGroup {
    Preprints,
    MajorJournals,
    ChemistrySocieties,
    Publishers,
}

impl DomainGroup {
    /// All groups, in query-iteration order.
    pub fn all() -> [DomainGroup; 4] {
        [
            DomainGroup::Preprints,
            DomainGroup::MajorJournals,
            DomainGroup::ChemistrySocieties,
            DomainGroup::Publishers,
        ]
    }

    pub fn query_for(&self, question: &str) -> String {
        match self {
            DomainGroup::Preprints => {
                format!("battery science research {} site:arxiv.org", question)
            }
            DomainGroup::MajorJournals => format!(
                "battery technology {} site:nature.com OR site:science.org",
                question
            ),
            DomainGroup::ChemistrySocieties => {
                format!("electrochemistry {} site:acs.org OR site:rsc.org", question)
            }
            DomainGroup::Publishers => format!(
                "energy storage {} site:springer.com OR site:sciencedirect.com",
                question
            ),
        }
    }
}

/// The four queries for one turn, one per domain group.
pub fn build_queries(question: &str) -> Vec<String> {
    DomainGroup::all()
        .iter()
        .map(|group| group.query_for(question))
        .collect()
}

/// How one dispatched query ended.
#[derive(Debug)]
pub enum QueryOutcome {
    Fulfilled(Vec<RawResultItem>),
    Rejected(String),
}

/// A query after the settle-all join.
#[derive(Debug)]
pub struct SettledQuery {
    pub index: usize,
    pub query: String,
    pub outcome: QueryOutcome,
}

/// Raw hits of one query, tagged with its position in iteration order.
#[derive(Debug, Clone, Default)]
pub struct RawResultSet {
    pub query_index: usize,
    pub items: Vec<RawResultItem>,
}

impl From<SettledQuery> for RawResultSet {
    fn from(settled: SettledQuery) -> Self {
        let items = match settled.outcome {
            QueryOutcome::Fulfilled(items) => items,
            QueryOutcome::Rejected(_) => Vec::new(),
        };
        RawResultSet {
            query_index: settled.index,
            items,
        }
    }
}

/// Dispatch every query concurrently and wait for all of them.
///
/// Each query runs in its own task, so an error or panic in one dispatch
/// cannot cancel the others. Failures are logged and reported as
/// [`QueryOutcome::Rejected`]; nothing is retried. The output is in the same
/// order as `queries`.
pub async fn fan_out(
    search: Arc<dyn SearchProvider>,
    queries: &[String],
    options: &SearchOptions,
) -> Vec<SettledQuery> {
    let handles: Vec<_> = queries
        .iter()
        .map(|query| {
            let search = Arc::clone(&search);
            let query = query.clone();
            let options = options.clone();
            tokio::spawn(async move { search.search(&query, &options).await })
        })
        .collect();

    let joined = join_all(handles).await;

    queries
        .iter()
        .zip(joined)
        .enumerate()
        .map(|(index, (query, joined))| {
            let outcome = match joined {
                Ok(Ok(response)) => {
                    let items = response.organic_results.unwrap_or_default();
                    tracing::debug!(index, count = items.len(), "paper query returned results");
                    QueryOutcome::Fulfilled(items)
                }
                Ok(Err(err)) => {
                    tracing::warn!(index, error = %err, "paper query failed");
                    QueryOutcome::Rejected(err.to_string())
                }
                Err(join_err) => {
                    tracing::warn!(index, error = %join_err, "paper query task aborted");
                    QueryOutcome::Rejected(join_err.to_string())
                }
            };
            SettledQuery {
                index,
                query: query.clone(),
                outcome,
            }
        })
        .collect()
}
