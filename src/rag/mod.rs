//! Retrieval-augmented answering: prompt assembly, completion and the
//! query answerer tying them to the context store.

mod answer;
mod completion;
mod prompt;

pub use answer::{Answer, QueryAnswerer};
pub use completion::{Completer, OpenAICompleter};
pub use prompt::{join_contexts, PromptBuilder, CONTEXT_DELIMITER};

#[cfg(test)]
pub(crate) use answer::tests as test_support;
