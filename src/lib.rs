//! Eto - question answering over YouTube transcripts
//!
//! Eto turns a corpus of transcript utterances into overlapping context
//! windows, embeds them, and keeps them in an on-disk dataset with an
//! IVF+PQ index. Questions are answered by retrieving the closest windows
//! and asking a completion model to answer from them.
//!
//! # Architecture
//!
//! - `config` - Settings, credentials and prompt templates
//! - `corpus` - Transcript sources and the context windower
//! - `embedding` - Embedding backends, batching, rate limiting and retry
//! - `vector_store` - Persisted dataset and nearest-neighbor index
//! - `rag` - Prompt assembly, completion and the query answerer
//! - `orchestrator` - Dataset build-or-load and component wiring
//! - `cli` - Command line and HTTP server
//!
//! # Example
//!
//! ```rust,no_run
//! use eto::config::{Credentials, Settings};
//! use eto::orchestrator::Orchestrator;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let credentials = Credentials::load(&settings.api_key_path(), &settings.org_id_path())?;
//!     let orchestrator = Orchestrator::new(settings, &credentials)?;
//!
//!     let dataset = Arc::new(orchestrator.setup().await?);
//!     let answer = orchestrator.answerer(dataset).answer("What is a transformer?").await?;
//!     println!("{}", answer.completion);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod vector_store;

pub use error::{EtoError, Result};
