//! OpenAI credential files.

use crate::error::{EtoError, Result};
use std::path::Path;
use tracing::{info, warn};

/// API key and optional organization ID read from disk.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub org_id: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("org_id", &self.org_id)
            .finish()
    }
}

impl Credentials {
    /// Read the API key file (required) and the organization ID file (optional).
    pub fn load(api_key_path: &Path, org_id_path: &Path) -> Result<Self> {
        if !api_key_path.is_file() {
            return Err(EtoError::Credentials(format!(
                "No OpenAI API key file found at {}",
                api_key_path.display()
            )));
        }

        let api_key = std::fs::read_to_string(api_key_path)?.trim().to_string();
        if api_key.is_empty() {
            return Err(EtoError::Credentials(format!(
                "OpenAI API key file {} is empty",
                api_key_path.display()
            )));
        }

        let org_id = if org_id_path.is_file() {
            let org = std::fs::read_to_string(org_id_path)?.trim().to_string();
            info!("Using OpenAI organization from {}", org_id_path.display());
            Some(org).filter(|o| !o.is_empty())
        } else {
            warn!(
                "No OpenAI organization ID found at {}, this might be necessary",
                org_id_path.display()
            );
            None
        };

        Ok(Self { api_key, org_id })
    }
}
