use serde::{Deserialize, Serialize};

use crate::capabilities::{HttpError, ValidatedUrl};

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const API_URL_ENV: &str = "MEDICO_API_URL";

/// Where the prediction service lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    base_url: String,
}

impl ServiceConfig {
    pub fn new(base_url: impl Into<String>) -> Result<Self, HttpError> {
        let base_url = ValidatedUrl::new(base_url)?;
        Ok(Self {
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Builds a config from a variable lookup, falling back to
    /// [`DEFAULT_API_URL`] when the variable is unset or blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, HttpError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(API_URL_ENV) {
            Some(url) if !url.trim().is_empty() => Self::new(url.trim()),
            _ => Self::new(DEFAULT_API_URL),
        }
    }

    pub fn from_env() -> Result<Self, HttpError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Result<ValidatedUrl, HttpError> {
        ValidatedUrl::new(&self.base_url)?.join_path(path)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
        }
    }
}
