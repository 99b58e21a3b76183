//! Best-effort bibliographic inference over raw search hits.
//!
//! Every function here is pure and total: when nothing can be inferred the
//! documented fallback is returned instead.

use chrono::Datelike;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Author list used when no author pattern matches.
pub const VARIOUS_AUTHORS: &str = "Various Authors";
/// Journal used when the link's host has no known journal.
pub const GENERIC_JOURNAL: &str = "Academic Journal";
/// Abstract used when the hit has no snippet.
pub const ABSTRACT_UNAVAILABLE: &str = "Abstract not available";

/// Hosts a reference may come from. Subdomains are accepted.
pub const WHITELIST: &[&str] = &[
    "arxiv.org",
    "nature.com",
    "science.org",
    "acs.org",
    "rsc.org",
    "springer.com",
    "sciencedirect.com",
    "doi.org",
];

const TOP_TIER: &[&str] = &["nature.com", "science.org"];

const JOURNALS: &[(&str, &str)] = &[
    ("nature.com", "Nature"),
    ("science.org", "Science"),
    ("acs.org", "ACS Publications"),
    ("rsc.org", "Royal Society of Chemistry"),
    ("springer.com", "Springer"),
    ("sciencedirect.com", "ScienceDirect"),
    ("arxiv.org", "arXiv"),
];

const BASE_SCORE: f64 = 0.7;
const TOP_TIER_BONUS: f64 = 0.2;
const KEYWORD_BONUS: f64 = 0.1;
const MAX_SCORE: f64 = 0.99;

// Word boundaries are ASCII-only: "é2021" still yields 2021.
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9A-Za-z_])(20[0-2][0-9])(?:$|[^0-9A-Za-z_])")
        .expect("year pattern is valid")
});

// Tried in order; the first pattern with any match wins.
static AUTHOR_RES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        // Firstname M. Lastname
        Regex::new(r"[A-Z][a-z]+ [A-Z]\. [A-Z][a-z]+").expect("author pattern is valid"),
        // Lastname et al.
        Regex::new(r"[A-Z][a-z]+ et al\.").expect("author pattern is valid"),
        // Lastname, F.M.
        Regex::new(r"[A-Z][a-z]+, [A-Z]\.[A-Z]\.").expect("author pattern is valid"),
    ]
});

static DOI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"10\.\d{4,9}/[^\s?#]+").expect("doi pattern is valid"));

/// Lowercased host of a link, if it parses as an absolute URL.
pub fn link_host(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    url.host_str().map(|h| h.to_ascii_lowercase())
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn link_matches_any(link: &str, domains: &[&str]) -> bool {
    link_host(link).is_some_and(|host| domains.iter().any(|d| host_matches(&host, d)))
}

/// True when the link's host is one of the whitelisted academic domains.
pub fn is_whitelisted(link: &str) -> bool {
    link_matches_any(link, WHITELIST)
}

/// True for the two top-tier journal hosts.
pub fn is_top_tier(link: &str) -> bool {
    link_matches_any(link, TOP_TIER)
}

/// First year in 2000..=2029 found in the snippet, then the title.
pub fn find_year(snippet: Option<&str>, title: &str) -> Option<i32> {
    snippet
        .and_then(|s| YEAR_RE.captures(s))
        .or_else(|| YEAR_RE.captures(title))
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Publication year; falls back to the current calendar year.
pub fn infer_year(snippet: Option<&str>, title: &str) -> i32 {
    find_year(snippet, title).unwrap_or_else(|| chrono::Local::now().year())
}

/// Up to three author strings from the snippet, or `["Various Authors"]`.
pub fn infer_authors(snippet: Option<&str>) -> Vec<String> {
    let Some(snippet) = snippet else {
        return vec![VARIOUS_AUTHORS.to_string()];
    };

    for pattern in AUTHOR_RES.iter() {
        let matches: Vec<String> = pattern
            .find_iter(snippet)
            .take(3)
            .map(|m| m.as_str().to_string())
            .collect();
        if !matches.is_empty() {
            return matches;
        }
    }

    vec![VARIOUS_AUTHORS.to_string()]
}

/// Journal name from the link's host, or `"Academic Journal"`.
pub fn infer_journal(link: &str) -> String {
    let Some(host) = link_host(link) else {
        return GENERIC_JOURNAL.to_string();
    };
    JOURNALS
        .iter()
        .find(|(domain, _)| host_matches(&host, domain))
        .map(|(_, journal)| journal.to_string())
        .unwrap_or_else(|| GENERIC_JOURNAL.to_string())
}

/// DOI carried by the link, either as a doi.org path or embedded in a publisher URL.
pub fn infer_doi(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    if host_matches(&host, "doi.org") {
        let path = url.path().trim_start_matches('/');
        if path.starts_with("10.") {
            return Some(path.trim_end_matches('/').to_string());
        }
    }
    DOI_RE
        .find(url.path())
        .map(|m| m.as_str().trim_end_matches('/').to_string())
}

/// Credibility x topical-match proxy in `[0.70, 0.99]`.
///
/// 0.70 base, +0.20 for nature.com / science.org, +0.10 when the title
/// contains the question's first space-separated word (case-insensitive).
pub fn relevance_score(link: &str, title: &str, question: &str) -> f64 {
    let mut score = BASE_SCORE;
    if is_top_tier(link) {
        score += TOP_TIER_BONUS;
    }
    let question = question.to_lowercase();
    let first_word = question.split(' ').next().unwrap_or("");
    if title.to_lowercase().contains(first_word) {
        score += KEYWORD_BONUS;
    }
    score.min(MAX_SCORE)
}
