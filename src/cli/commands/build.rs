//! Build command implementation.

use crate::cli::Output;
use crate::config::{Credentials, Settings};
use crate::orchestrator::Orchestrator;
use crate::vector_store::ContextStore;
use anyhow::Result;

/// Build the dataset, or rebuild it with `force`.
pub async fn run_build(force: bool, settings: Settings, credentials: &Credentials) -> Result<()> {
    let dir = settings.dataset_dir();
    let orchestrator = Orchestrator::new(settings, credentials)?;

    let dataset = if force {
        orchestrator.rebuild().await?
    } else {
        if dir.exists() {
            Output::info(&format!(
                "Dataset already exists at {}. Use --force to rebuild.",
                dir.display()
            ));
        }
        orchestrator.setup().await?
    };

    Output::success("Dataset ready");
    Output::kv("Path", &dataset.dir().display().to_string());
    Output::kv("Context windows", &dataset.count().await?.to_string());
    Output::kv("Dimension", &dataset.dimension().to_string());
    Output::kv("Indexed", if dataset.has_index() { "yes" } else { "no" });
    Output::kv("Built", &dataset.built_at().to_rfc3339());

    Ok(())
}
