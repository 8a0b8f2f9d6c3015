use std::collections::BTreeMap;
use std::time::Duration;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_SUFFIX: &str = "workshop";
pub const DEFAULT_STACK_NAME_PREFIX: &str = "big-data-agent-infrastructure";
pub const DEFAULT_TEMPLATE_FILE: &str = "big-data-agent-infrastructure.yaml";
pub const BUCKET_NAME_OUTPUT: &str = "BucketName";
pub const SUFFIX_PARAMETER: &str = "Suffix";
pub const PURPOSE_TAG_VALUE: &str = "BigDataAgent";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// Stack outputs keyed by `OutputKey`.
pub type StackOutputs = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// A source URL and the local filename it is staged under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileDescriptor {
    pub url: String,
    pub filename: String,
}

impl FileDescriptor {
    /// Parses `url` and takes its percent-decoded last path segment as the filename.
    pub fn from_url(url: &str) -> Result<Self, ValidationError> {
        let url = url.trim();
        let parsed = Url::parse(url)
            .map_err(|error| ValidationError::new(format!("invalid URL '{url}': {error}")))?;

        let segment = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default();
        let filename = percent_decode_str(segment)
            .decode_utf8()
            .map_err(|_| ValidationError::new(format!("URL '{url}' has a non UTF-8 filename")))?;

        if filename.is_empty()
            || filename == "."
            || filename == ".."
            || filename.contains(['/', '\\'])
        {
            return Err(ValidationError::new(format!(
                "URL '{url}' does not end with a filename"
            )));
        }

        Ok(Self {
            url: url.to_string(),
            filename: filename.into_owned(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrepareDataRequest {
    #[serde(default)]
    pub stack_name: Option<String>,
    #[serde(default = "default_suffix")]
    pub suffix: String,
    pub file_urls: Vec<String>,
    pub table_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedPrepareDataRequest {
    pub stack_name: String,
    pub table_name: String,
    pub file_urls: Vec<String>,
}

pub fn default_suffix() -> String {
    DEFAULT_SUFFIX.to_string()
}

pub fn default_stack_name(suffix: &str) -> String {
    format!("{DEFAULT_STACK_NAME_PREFIX}-{}", suffix.trim())
}

/// Resolves an explicit stack name, falling back to the suffix-derived default.
pub fn resolve_stack_name(stack_name: Option<&str>, suffix: &str) -> String {
    match stack_name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => default_stack_name(suffix),
    }
}

pub fn normalize_request(
    payload: PrepareDataRequest,
) -> Result<NormalizedPrepareDataRequest, ValidationError> {
    let table_name = payload.table_name.trim().trim_matches('/').to_string();
    if table_name.is_empty() {
        return Err(ValidationError::new("table_name cannot be empty"));
    }

    if payload.file_urls.is_empty() {
        return Err(ValidationError::new("file_urls must be a non-empty list"));
    }

    let stack_name = match payload.stack_name.as_deref() {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => {
            if payload.suffix.trim().is_empty() {
                return Err(ValidationError::new(
                    "suffix cannot be empty when stack_name is not provided",
                ));
            }
            default_stack_name(&payload.suffix)
        }
    };

    let file_urls = payload
        .file_urls
        .iter()
        .map(|url| url.trim().to_string())
        .collect();

    Ok(NormalizedPrepareDataRequest {
        stack_name,
        table_name,
        file_urls,
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransferStage {
    Resolve,
    Download,
    Upload,
}

impl std::fmt::Display for TransferStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolve => f.write_str("resolve"),
            Self::Download => f.write_str("download"),
            Self::Upload => f.write_str("upload"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Uploaded {
        url: String,
        key: String,
        bytes: u64,
    },
    Failed {
        url: String,
        stage: TransferStage,
        message: String,
    },
}

impl FileOutcome {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, Self::Uploaded { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrepareDataReport {
    pub stack_name: String,
    pub bucket: String,
    pub outcomes: Vec<FileOutcome>,
}

impl PrepareDataReport {
    pub fn uploaded_keys(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                FileOutcome::Uploaded { key, .. } => Some(key.as_str()),
                FileOutcome::Failed { .. } => None,
            })
            .collect()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.is_uploaded())
            .count()
    }
}

/// Bounded polling policy for stack create/update waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Inputs for a create-or-update of the workshop stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTemplateRequest {
    pub stack_name: String,
    pub template_body: String,
    pub suffix: String,
}

impl StackTemplateRequest {
    pub fn parameters(&self) -> Vec<(String, String)> {
        vec![(SUFFIX_PARAMETER.to_string(), self.suffix.clone())]
    }

    pub fn tags(&self) -> Vec<(String, String)> {
        vec![
            ("Purpose".to_string(), PURPOSE_TAG_VALUE.to_string()),
            ("Environment".to_string(), self.suffix.clone()),
        ]
    }
}
