use workshop_core::contract::StackOutputs;

use crate::adapters::provisioning::StackProvisioner;
use crate::error::ResolutionError;

/// Looks up the outputs of `stack_name`; `Ok(None)` means the stack does not exist.
pub fn resolve_stack_outputs(
    provisioner: &impl StackProvisioner,
    stack_name: &str,
) -> Result<Option<StackOutputs>, ResolutionError> {
    let description = provisioner.describe_stack(stack_name)?;
    if description.is_none() {
        tracing::warn!(component = "stack_outputs", stack_name, "stack does not exist");
    }
    Ok(description.map(|stack| stack.outputs))
}
