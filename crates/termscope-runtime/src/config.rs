//! Runtime configuration.
//!
//! Every field has a default, so an empty file is a valid configuration.
//! Durations are written as human-readable strings (`"15s"`, `"500ms"`).
//!
//! ```yaml
//! crawl:
//!   max_depth: 2
//!   allowed_hosts: [legal.example.com]
//! fetch:
//!   timeout: 15s
//! analysis:
//!   model: gemini-2.5-flash
//! provider:
//!   type: gemini
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::path::{Path, PathBuf};
use std::time::Duration;
use termscope_core::{CandidateClassifier, ClassifierConfig, ClassifierError};
use thiserror::Error;

use crate::fetch::FetchLimits;
use crate::providers::CompletionConfig;
use crate::resilience::RetryPolicy;

/// Browser-like user agent; many sites reject obvious bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Errors loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Invalid classifier table: {0}")]
    Classifier(#[from] ClassifierError),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub crawl: CrawlConfig,
    pub fetch: FetchConfig,
    pub analysis: AnalysisConfig,
    pub provider: ProviderConfig,
    pub classifier: ClassifierConfig,
}

impl RuntimeConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load and validate a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text)?,
            _ => Self::from_yaml_str(&text)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.crawl.validate()?;
        self.fetch.validate()?;
        self.analysis.validate()?;
        if self.provider.provider_type.trim().is_empty() {
            return Err(ConfigError::Invalid("provider.type must not be empty".into()));
        }
        CandidateClassifier::new(self.classifier.clone())?;
        Ok(())
    }

    pub fn build_classifier(&self) -> Result<CandidateClassifier, ConfigError> {
        Ok(CandidateClassifier::new(self.classifier.clone())?)
    }

    /// Limits for crawl fetches.
    pub fn crawl_limits(&self) -> FetchLimits {
        FetchLimits {
            timeout: self.fetch.timeout,
            max_bytes: self.fetch.max_bytes,
            max_redirects: self.fetch.max_redirects,
            allowed_hosts: self.crawl.allowed_hosts.clone(),
        }
    }

    /// Limits for the text-mode content fetch.
    pub fn content_limits(&self) -> FetchLimits {
        FetchLimits {
            max_bytes: self.analysis.content_max_bytes,
            ..self.crawl_limits()
        }
    }
}

/// Discovery bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Levels to fetch; the origin page is depth 1
    pub max_depth: u32,
    pub max_pages_fetched: usize,
    pub max_results: usize,
    /// In-flight fetches per level
    pub concurrency: usize,
    /// Try well-known policy paths when link discovery finds nothing
    pub probe_common_paths: bool,
    /// Extra hosts (and their subdomains) treated as part of the site
    pub allowed_hosts: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_pages_fetched: 20,
            max_results: 5,
            concurrency: 5,
            probe_common_paths: true,
            allowed_hosts: Vec::new(),
        }
    }
}

impl CrawlConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("crawl.max_depth must be at least 1".into()));
        }
        if self.max_pages_fetched == 0 {
            return Err(ConfigError::Invalid(
                "crawl.max_pages_fetched must be at least 1".into(),
            ));
        }
        if self.max_results == 0 {
            return Err(ConfigError::Invalid("crawl.max_results must be at least 1".into()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("crawl.concurrency must be at least 1".into()));
        }
        Ok(())
    }
}

/// HTTP fetch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    #[serde(with = "duration_str")]
    pub timeout: Duration,
    #[serde(with = "duration_str")]
    pub connect_timeout: Duration,
    pub max_bytes: usize,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
            max_bytes: 2 * 1024 * 1024,
            max_redirects: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err(ConfigError::Invalid("fetch timeouts must be non-zero".into()));
        }
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid("fetch.max_bytes must be non-zero".into()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("fetch.user_agent must not be empty".into()));
        }
        Ok(())
    }
}

/// Model and analysis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Per-call deadline
    #[serde(with = "duration_str")]
    pub model_timeout: Duration,
    /// Retry of a transient stage failure
    pub retry: RetryPolicy,
    /// Text sent to the model in text mode, marker included
    pub max_text_chars: usize,
    /// Pages with less extracted text are not analyzed
    pub min_content_chars: usize,
    /// Body cap for the text-mode content fetch
    pub content_max_bytes: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.1,
            max_output_tokens: 2000,
            model_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            max_text_chars: 10_000,
            min_content_chars: 100,
            content_max_bytes: 4 * 1024 * 1024,
        }
    }
}

impl AnalysisConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("analysis.model must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "analysis.temperature must be within 0.0-2.0, got {}",
                self.temperature
            )));
        }
        if self.model_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "analysis.model_timeout must be non-zero".into(),
            ));
        }
        if self.min_content_chars > self.max_text_chars {
            return Err(ConfigError::Invalid(format!(
                "analysis.min_content_chars ({}) exceeds max_text_chars ({})",
                self.min_content_chars, self.max_text_chars
            )));
        }
        if self.content_max_bytes == 0 {
            return Err(ConfigError::Invalid(
                "analysis.content_max_bytes must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn completion_config(&self, url_context: bool) -> CompletionConfig {
        CompletionConfig {
            model: self.model.clone(),
            max_tokens: self.max_output_tokens,
            temperature: self.temperature,
            timeout: self.model_timeout,
            url_context,
        }
    }

}

/// Provider selection plus provider-specific options.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub provider_type: String,

    /// Passed to the provider as-is (`api_key`, `base_url`, ...)
    #[serde(flatten)]
    pub options: Map<String, JsonValue>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: "gemini".to_string(),
            options: Map::new(),
        }
    }
}

impl ProviderConfig {
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.options.clone())
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let options: Map<String, JsonValue> = self
            .options
            .iter()
            .map(|(k, v)| {
                if k.contains("key") || k.contains("secret") || k.contains("token") {
                    (k.clone(), JsonValue::String("[REDACTED]".into()))
                } else {
                    (k.clone(), v.clone())
                }
            })
            .collect();
        f.debug_struct("ProviderConfig")
            .field("provider_type", &self.provider_type)
            .field("options", &options)
            .finish()
    }
}

pub(crate) mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
