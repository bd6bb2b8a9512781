//! OpenAI client configuration.

use crate::config::Credentials;
use crate::error::Result;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create an OpenAI client authenticated with the given credentials.
///
/// Every request, embeddings and completions alike, is bounded by `timeout`.
pub fn create_client(credentials: &Credentials, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    let mut config = OpenAIConfig::new().with_api_key(credentials.api_key.clone());
    if let Some(org_id) = &credentials.org_id {
        config = config.with_org_id(org_id.clone());
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}
