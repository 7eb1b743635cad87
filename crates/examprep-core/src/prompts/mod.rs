//! Prompt loading utilities
//!
//! Each prompt file under the workspace `prompts/` directory is a markdown
//! document with Usage and Prompt sections. Prompts are embedded at compile
//! time using `include_str!`; only the Prompt section is sent to the model.

// Embed prompt files at compile time
const QUESTION_GENERATION_MD: &str = include_str!("../../../../prompts/question_generation.md");
const ANSWER_EVALUATION_MD: &str = include_str!("../../../../prompts/answer_evaluation.md");

/// Prompt templates known to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    /// Generates a JSON array of exam questions from study content
    QuestionGeneration,
    /// Grades one answer against reference content
    AnswerEvaluation,
}

impl PromptTemplate {
    /// The Prompt section of the template, placeholders intact
    #[must_use]
    pub fn body(self) -> &'static str {
        let content = match self {
            Self::QuestionGeneration => QUESTION_GENERATION_MD,
            Self::AnswerEvaluation => ANSWER_EVALUATION_MD,
        };
        extract_prompt_section(content).unwrap_or(content)
    }

    /// Render the template, substituting each `{{name}}` from `values`
    #[must_use]
    pub fn render(self, values: &[(&str, &str)]) -> String {
        render(self.body(), values)
    }
}

/// Extracts the Prompt section from a markdown file
///
/// Returns `None` if the file has no `## Prompt` header.
fn extract_prompt_section(content: &str) -> Option<&str> {
    let prompt_start = content.find("## Prompt")?;
    let body_start = content[prompt_start..].find('\n')? + prompt_start + 1;

    // All prompt files have ## Prompt as the last top-level section
    Some(content[body_start..].trim())
}

/// Single-pass placeholder substitution.
///
/// Substituted values are never rescanned, so study content that happens to
/// contain `{{topic}}` is sent verbatim. Unknown placeholders are left as-is.
#[must_use]
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        output.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            output.push_str(&rest[open..]);
            return output;
        };

        let key = &after_open[..close];
        match values.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => output.push_str(value),
            None => output.push_str(&rest[open..open + close + 4]),
        }
        rest = &after_open[close + 2..];
    }

    output.push_str(rest);
    output
}
