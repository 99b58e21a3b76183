//! Answer prompt for the battery science research assistant.

/// Persona data folded into the answer prompt
#[derive(Clone, Debug)]
pub struct ExpertPrompt {
    pub name: &'static str,
    pub expertise: &'static [&'static str],
    pub research_areas: &'static [&'static str],
}

pub static BATTERY_EXPERT: ExpertPrompt = ExpertPrompt {
    name: "battery science research expert",
    expertise: &["electrochemistry", "materials science", "battery technology"],
    research_areas: &[
        "Solid-state",
        "Li-ion",
        "Cathodes",
        "Anodes",
        "Electrolytes",
        "Degradation",
        "Safety",
        "Recycling",
    ],
};

/// Build the full prompt sent to the answer provider for one question.
///
/// The user's text is embedded verbatim; the model is told not to rephrase it.
pub fn build_answer_prompt(question: &str) -> String {
    let expert = &BATTERY_EXPERT;
    format!(
        r#"You are a {name} with deep knowledge of {expertise}.

User's question: "{question}"

Answer the user's EXACT question directly and specifically. Do not restructure or reinterpret it.

## Formatting Guidelines
- Write mathematical equations in LaTeX:
  * Inline math: $equation$
  * Display math: $$equation$$
  * Example: the Butler-Volmer current density is $j = j_0 \left( \exp\left(\frac{{\alpha_a n F \eta}}{{RT}}\right) - \exp\left(-\frac{{\alpha_c n F \eta}}{{RT}}\right) \right)$
- Write chemical formulas with LaTeX subscripts and superscripts: $\text{{LiCoO}}_2$, $\text{{Li}}^+$
- Use \rightleftharpoons for reversible reactions and \text{{}} for words inside equations
- Use markdown headings and lists for structure
- Use **bold** for key terms and `code` for short formulas

## Content Guidelines
- If they ask for specific technical details, give those exact details
- If they ask about a specific model or theory, stay on that topic
- Include relevant chemical formulas, mathematical expressions and technical specifications
- Be precise and technical where the question calls for it

Answer their question directly, at the level of technical detail they are asking for."#,
        name = expert.name,
        expertise = format_list(expert.expertise),
        question = question,
    )
}

/// "a, b and c"
fn format_list(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_question_verbatim() {
        let prompt = build_answer_prompt("What is the Nernst equation?");
        assert!(prompt.contains("User's question: \"What is the Nernst equation?\""));
        assert!(prompt.contains("electrochemistry, materials science and battery technology"));
    }

    #[test]
    fn test_prompt_latex_braces_survive_formatting() {
        let prompt = build_answer_prompt("x");
        assert!(prompt.contains(r"$\text{LiCoO}_2$"));
        assert!(prompt.contains(r"\frac{\alpha_a n F \eta}{RT}"));
    }

    #[test]
    fn test_format_list() {
        assert_eq!(format_list(&[]), "");
        assert_eq!(format_list(&["a"]), "a");
        assert_eq!(format_list(&["a", "b", "c"]), "a, b and c");
    }
}
