use workshop_core::contract::{StackOutputs, StackTemplateRequest};

use crate::error::{ProvisioningError, ResolutionError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDescription {
    pub stack_name: String,
    pub status: String,
    pub outputs: StackOutputs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Started { stack_id: String },
    NoUpdates,
}

/// Where a stack stands relative to the status an operation waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackProgress {
    InProgress,
    Succeeded,
    Failed,
}

pub fn classify_status(status: &str, target: &str) -> StackProgress {
    if status == target {
        StackProgress::Succeeded
    } else if status.ends_with("_IN_PROGRESS") {
        StackProgress::InProgress
    } else {
        StackProgress::Failed
    }
}

pub trait StackProvisioner {
    /// Returns `Ok(None)` when the stack does not exist.
    fn describe_stack(&self, stack_name: &str) -> Result<Option<StackDescription>, ResolutionError>;

    /// Starts stack creation and returns the stack id.
    fn create_stack(&self, request: &StackTemplateRequest) -> Result<String, ProvisioningError>;

    fn update_stack(&self, request: &StackTemplateRequest) -> Result<UpdateOutcome, ProvisioningError>;
}
