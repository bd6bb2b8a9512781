//! Ask command implementation.

use crate::cli::Output;
use crate::config::{Credentials, Settings};
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::sync::Arc;

/// Answer one question and print the retrieved sources.
pub async fn run_ask(question: &str, settings: Settings, credentials: &Credentials) -> Result<()> {
    let orchestrator = Orchestrator::new(settings, credentials)?;
    let dataset = Arc::new(orchestrator.setup().await?);
    let answerer = orchestrator.answerer(dataset);

    let spinner = Output::spinner("Searching transcripts...");

    match answerer.answer(question).await {
        Ok(answer) => {
            spinner.finish_and_clear();

            println!("\n{}\n", answer.completion);

            Output::header("Sources");
            for source in &answer.context {
                Output::context_match(
                    &source.context.title,
                    source.context.start,
                    source.distance,
                    &source.context.text,
                    source.context.url.as_deref(),
                );
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
