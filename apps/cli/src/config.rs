use anyhow::{bail, Result};
use std::path::PathBuf;

use resumesync_core::sync::SchedulerConfig;
use resumesync_core::IdentityKey;
use resumesync_remote::DEFAULT_API_URL;

const DEFAULT_DB_PATH: &str = "resume-cache.db";

/// CLI configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub access_token: Option<String>,
    pub db_path: PathBuf,
    pub identity: Option<String>,
    pub scheduler: SchedulerConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok(), SchedulerConfig::from_env()))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>, scheduler: SchedulerConfig) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Config {
            api_url: non_empty("RESUME_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            access_token: non_empty("RESUME_ACCESS_TOKEN"),
            db_path: non_empty("RESUME_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            identity: non_empty("RESUME_IDENTITY"),
            scheduler,
        }
    }

    /// Command-line identity wins over RESUME_IDENTITY.
    pub fn with_identity(mut self, identity: Option<String>) -> Self {
        if identity.is_some() {
            self.identity = identity;
        }
        self
    }

    pub fn identity(&self) -> Result<IdentityKey> {
        match self.identity.as_deref().map(IdentityKey::new) {
            Some(identity) if !identity.as_str().is_empty() => Ok(identity),
            _ => bail!("No resume identity configured. Pass --identity or set RESUME_IDENTITY."),
        }
    }
}
