//! Provider Configuration
//!
//! Injected configuration for provider adapters. The crate never reads the
//! process environment itself; callers resolve credentials and pass them in.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{JobError, JobResult};

/// Configuration for a provider adapter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key (required by every bundled adapter)
    pub api_key: Option<String>,
    /// Base URL override
    pub base_url: Option<String>,
    /// Model ID to use (provider-specific)
    pub model_id: Option<String>,
    /// Additional provider-specific settings
    pub settings: HashMap<String, serde_json::Value>,
}

impl ProviderConfig {
    /// Creates a new config with an API key
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    /// Sets the base URL override
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model ID
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Sets a custom setting
    pub fn with_setting<T: Serialize>(mut self, key: impl Into<String>, value: T) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.settings.insert(key.into(), v);
        }
        self
    }

    /// Gets a setting value
    pub fn get_setting<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.settings
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Returns the API key or fails with a configuration error.
    /// Adapters call this at construction so a missing credential is
    /// caught before any network traffic.
    pub fn require_api_key(&self, provider: &str) -> JobResult<String> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key.to_string()),
            _ => Err(JobError::Configuration(format!(
                "Missing API key for provider '{}'",
                provider
            ))),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
