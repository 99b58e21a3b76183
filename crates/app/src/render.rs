//! Plain-text rendering of the conversation for the terminal.

use agent_host::prompts::BATTERY_EXPERT;
use shared::chat::Reference;

pub fn welcome() -> String {
    format!(
        "Battery Science Research Chat\n\
         AI-powered analysis with academic references\n\n\
         Ask anything about battery technology, materials and research trends.\n\
         Research areas: {}\n\
         Type a question and press Enter. Ctrl-D quits.\n",
        BATTERY_EXPERT.research_areas.join(" · ")
    )
}

/// Relevance as a whole percentage, e.g. 0.99 -> "99%"
pub fn score_badge(score: f64) -> String {
    format!("{}%", (score * 100.0).round() as i64)
}

pub fn format_reference(reference: &Reference) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {} [{}]\n",
        reference.title,
        score_badge(reference.relevance_score)
    ));
    out.push_str(&format!(
        "    {} • {} ({})\n",
        reference.authors.join(", "),
        reference.journal,
        reference.year
    ));
    if let Some(doi) = &reference.doi {
        out.push_str(&format!("    doi:{}\n", doi));
    }
    out.push_str(&format!("    {}\n", reference.abstract_text));
    out.push_str(&format!("    {}\n", reference.url));
    out
}

/// The reference block shown under a finished answer. Empty when there are none.
pub fn format_references(references: &[Reference]) -> String {
    if references.is_empty() {
        return String::new();
    }
    let mut out = format!("\nReferences ({})\n", references.len());
    for reference in references {
        out.push_str(&format_reference(reference));
    }
    out
}
