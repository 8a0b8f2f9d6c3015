use std::env;
use std::path::PathBuf;
use std::time::Duration;

use workshop_core::contract::{
    WaitPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL, DEFAULT_SUFFIX,
    DEFAULT_TEMPLATE_FILE,
};

use crate::handlers::prepare_data::DEFAULT_SCRATCH_ROOT;

/// Operator settings shared by the deploy and data preparation workflows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkshopConfig {
    /// Resource suffix passed as the `Suffix` stack parameter (default: "workshop")
    pub suffix: String,

    /// CloudFormation template path (default: "big-data-agent-infrastructure.yaml")
    pub template_file: PathBuf,

    /// Directory under which a fresh per-run staging directory is created (default: ".")
    pub scratch_root: PathBuf,

    /// Delay between stack status polls (default: 30 s)
    pub poll_interval: Duration,

    /// Maximum number of stack status polls (default: 20)
    pub max_attempts: u32,

    /// Region override; the SDK default chain applies when unset
    pub region: Option<String>,
}

impl Default for WorkshopConfig {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
            template_file: PathBuf::from(DEFAULT_TEMPLATE_FILE),
            scratch_root: PathBuf::from(DEFAULT_SCRATCH_ROOT),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            region: None,
        }
    }
}

impl WorkshopConfig {
    /// Load configuration from environment variables, after an optional `.env` file.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Self {
            suffix: non_empty("WORKSHOP_SUFFIX").unwrap_or(default.suffix),

            template_file: non_empty("WORKSHOP_TEMPLATE_FILE")
                .map(PathBuf::from)
                .unwrap_or(default.template_file),

            scratch_root: non_empty("WORKSHOP_SCRATCH_ROOT")
                .map(PathBuf::from)
                .unwrap_or(default.scratch_root),

            poll_interval: non_empty("WORKSHOP_POLL_INTERVAL_SECS")
                .and_then(|value| value.trim().parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.poll_interval),

            max_attempts: non_empty("WORKSHOP_MAX_ATTEMPTS")
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(default.max_attempts),

            region: non_empty("AWS_REGION"),
        }
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            poll_interval: self.poll_interval,
            max_attempts: self.max_attempts,
        }
    }
}
