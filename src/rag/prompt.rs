//! Prompt assembly from retrieved context.

use crate::config::Prompts;
use std::collections::HashMap;

/// Separator placed between context texts in the prompt.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// Join `contexts` in order, stopping before the first one that would push
/// the joined length past `limit` characters. The first context is always
/// kept.
pub fn join_contexts<'a>(contexts: impl IntoIterator<Item = &'a str>, limit: usize) -> String {
    let delimiter_len = CONTEXT_DELIMITER.chars().count();
    let mut contexts = contexts.into_iter();

    let Some(first) = contexts.next() else {
        return String::new();
    };
    let mut joined = first.to_string();
    let mut len = first.chars().count();

    for context in contexts {
        let next_len = len + delimiter_len + context.chars().count();
        if next_len > limit {
            break;
        }
        joined.push_str(CONTEXT_DELIMITER);
        joined.push_str(context);
        len = next_len;
    }
    joined
}

/// Builds completion prompts from the answer templates.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    prompts: Prompts,
    context_limit: usize,
}

impl PromptBuilder {
    pub fn new(prompts: Prompts, context_limit: usize) -> Self {
        Self {
            prompts,
            context_limit,
        }
    }

    /// `header + joined context + footer`, with `{{question}}` bound to `query`.
    pub fn build<'a>(&self, query: &str, contexts: impl IntoIterator<Item = &'a str>) -> String {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), query.to_string());

        let header = self.prompts.render_with_custom(&self.prompts.answer.header, &vars);
        let footer = self.prompts.render_with_custom(&self.prompts.answer.footer, &vars);
        let context = join_contexts(contexts, self.context_limit);

        format!("{}{}{}", header, context, footer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_contexts_fit() {
        let joined = join_contexts(["a", "b", "c"], 3750);
        assert_eq!(joined, "a\n\n---\n\nb\n\n---\n\nc");
    }

    #[test]
    fn test_stops_before_exceeding_limit() {
        let long = "x".repeat(2000);
        let joined = join_contexts([long.as_str(), long.as_str(), "short"], 3750);
        assert_eq!(joined, long);
    }

    #[test]
    fn test_exact_limit_is_allowed() {
        // 10 + 7 + 10 = 27 characters
        let part = "y".repeat(10);
        let joined = join_contexts([part.as_str(), part.as_str()], 27);
        assert_eq!(joined.chars().count(), 27);
        assert_eq!(join_contexts([part.as_str(), part.as_str()], 26), part);
    }

    #[test]
    fn test_oversized_first_context_is_kept_alone() {
        let huge = "z".repeat(5000);
        let joined = join_contexts([huge.as_str(), "tail"], 3750);
        assert_eq!(joined, huge);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let accented = "é".repeat(10);
        let joined = join_contexts([accented.as_str(), accented.as_str()], 27);
        assert_eq!(joined.chars().count(), 27);
    }

    #[test]
    fn test_builder_wraps_context() {
        let builder = PromptBuilder::new(Prompts::default(), 3750);
        let prompt = builder.build("what is a transformer?", ["attention", "layers"]);

        assert!(prompt.starts_with("Answer the question based on the context below.\n\nContext:\n"));
        assert!(prompt.contains("attention\n\n---\n\nlayers"));
        assert!(prompt.ends_with("\n\nQuestion: what is a transformer?\nAnswer:"));
    }
}
