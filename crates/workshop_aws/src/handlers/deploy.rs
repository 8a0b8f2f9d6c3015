//! Idempotent create-or-update of the workshop CloudFormation stack.

use std::path::Path;
use std::time::Duration;

use workshop_core::contract::{StackOutputs, StackTemplateRequest, WaitPolicy};

use crate::adapters::provisioning::{classify_status, StackProgress, StackProvisioner, UpdateOutcome};
use crate::error::DeployError;

const CREATE_COMPLETE: &str = "CREATE_COMPLETE";
const UPDATE_COMPLETE: &str = "UPDATE_COMPLETE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployAction {
    Created { stack_id: String },
    Updated { stack_id: String },
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOutcome {
    pub stack_name: String,
    pub action: DeployAction,
    pub outputs: StackOutputs,
}

pub fn load_template(path: &Path) -> Result<String, DeployError> {
    std::fs::read_to_string(path).map_err(|source| DeployError::Template {
        path: path.to_path_buf(),
        source,
    })
}

/// Deploys the stack, blocking the current thread between status polls.
pub fn deploy_stack(
    request: &StackTemplateRequest,
    policy: &WaitPolicy,
    provisioner: &impl StackProvisioner,
) -> Result<DeployOutcome, DeployError> {
    deploy_stack_with_sleep(request, policy, provisioner, &std::thread::sleep)
}

pub fn deploy_stack_with_sleep(
    request: &StackTemplateRequest,
    policy: &WaitPolicy,
    provisioner: &impl StackProvisioner,
    sleep: &dyn Fn(Duration),
) -> Result<DeployOutcome, DeployError> {
    let stack_name = request.stack_name.as_str();
    tracing::info!(
        component = "deploy",
        stack_name,
        suffix = %request.suffix,
        "deploying stack"
    );

    let exists = provisioner.describe_stack(stack_name)?.is_some();
    let action = if exists {
        tracing::info!(component = "deploy", stack_name, "stack already exists, updating");
        match provisioner.update_stack(request)? {
            UpdateOutcome::Started { stack_id } => {
                tracing::info!(component = "deploy", stack_name, stack_id = %stack_id, "stack update initiated");
                wait_for_completion(provisioner, stack_name, UPDATE_COMPLETE, policy, sleep)?;
                tracing::info!(component = "deploy", stack_name, "stack updated");
                DeployAction::Updated { stack_id }
            }
            UpdateOutcome::NoUpdates => {
                tracing::info!(
                    component = "deploy",
                    stack_name,
                    "no updates needed, stack is already up to date"
                );
                DeployAction::Unchanged
            }
        }
    } else {
        tracing::info!(component = "deploy", stack_name, "creating new stack");
        let stack_id = provisioner.create_stack(request)?;
        tracing::info!(component = "deploy", stack_name, stack_id = %stack_id, "stack creation initiated");
        wait_for_completion(provisioner, stack_name, CREATE_COMPLETE, policy, sleep)?;
        tracing::info!(component = "deploy", stack_name, "stack created");
        DeployAction::Created { stack_id }
    };

    let outputs = provisioner
        .describe_stack(stack_name)?
        .map(|stack| stack.outputs)
        .ok_or_else(|| DeployError::Vanished {
            stack_name: stack_name.to_string(),
        })?;

    Ok(DeployOutcome {
        stack_name: stack_name.to_string(),
        action,
        outputs,
    })
}

fn wait_for_completion(
    provisioner: &impl StackProvisioner,
    stack_name: &str,
    target: &str,
    policy: &WaitPolicy,
    sleep: &dyn Fn(Duration),
) -> Result<(), DeployError> {
    let mut last_status = None;

    for attempt in 1..=policy.max_attempts {
        let stack = provisioner
            .describe_stack(stack_name)?
            .ok_or_else(|| DeployError::Vanished {
                stack_name: stack_name.to_string(),
            })?;

        match classify_status(&stack.status, target) {
            StackProgress::Succeeded => return Ok(()),
            StackProgress::Failed => {
                return Err(DeployError::Failed {
                    stack_name: stack_name.to_string(),
                    status: stack.status,
                })
            }
            StackProgress::InProgress => {}
        }

        tracing::info!(
            component = "deploy",
            stack_name,
            attempt,
            max_attempts = policy.max_attempts,
            status = %stack.status,
            "waiting for stack"
        );
        last_status = Some(stack.status);

        if attempt < policy.max_attempts {
            sleep(policy.poll_interval);
        }
    }

    Err(DeployError::Timeout {
        stack_name: stack_name.to_string(),
        attempts: policy.max_attempts,
        last_status,
    })
}
