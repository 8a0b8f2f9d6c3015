//! AWS SDK implementations of the adapter traits.
//!
//! Workflows are synchronous, so the adapters own a current-thread Tokio
//! runtime and drive each SDK call to completion with `block_on`.

use std::path::Path;
use std::sync::Arc;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_cloudformation::error::ProvideErrorMetadata;
use aws_sdk_cloudformation::types::{Capability, Parameter, Stack, StackStatus, Tag};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::primitives::ByteStream;
use tokio::runtime::Runtime;
use workshop_core::contract::{StackOutputs, StackTemplateRequest};

use super::object_store::ObjectStore;
use super::provisioning::{StackDescription, StackProvisioner, UpdateOutcome};
use crate::error::{BucketCheckError, ProvisioningError, ResolutionError, TransferError};

const VALIDATION_ERROR_CODE: &str = "ValidationError";
const MISSING_STACK_MESSAGE: &str = "does not exist";
const NO_UPDATES_MESSAGE: &str = "No updates are to be performed";

/// Shared runtime and SDK configuration for every AWS adapter.
#[derive(Clone)]
pub struct AwsContext {
    runtime: Arc<Runtime>,
    sdk_config: SdkConfig,
}

impl AwsContext {
    pub fn load(region: Option<&str>) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let sdk_config = runtime.block_on(loader.load());

        Ok(Self {
            runtime: Arc::new(runtime),
            sdk_config,
        })
    }

    pub fn object_store(&self) -> S3ObjectStore {
        S3ObjectStore {
            runtime: Arc::clone(&self.runtime),
            s3_client: aws_sdk_s3::Client::new(&self.sdk_config),
        }
    }

    pub fn provisioner(&self) -> CloudFormationProvisioner {
        CloudFormationProvisioner {
            runtime: Arc::clone(&self.runtime),
            cfn_client: aws_sdk_cloudformation::Client::new(&self.sdk_config),
        }
    }
}

pub struct S3ObjectStore {
    runtime: Arc<Runtime>,
    s3_client: aws_sdk_s3::Client,
}

impl ObjectStore for S3ObjectStore {
    fn check_bucket(&self, bucket: &str) -> Result<(), BucketCheckError> {
        let client = self.s3_client.clone();
        let result = self
            .runtime
            .block_on(async move { client.head_bucket().bucket(bucket).send().await });

        match result {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(context)) => Err(classify_head_bucket(
                bucket,
                context.raw().status().as_u16(),
                context.err(),
            )),
            Err(error) => Err(BucketCheckError::Other {
                bucket: bucket.to_string(),
                message: DisplayErrorContext(&error).to_string(),
            }),
        }
    }

    fn upload_file(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), TransferError> {
        let client = self.s3_client.clone();
        let upload_error = |message: String| TransferError::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message,
        };

        let body = self
            .runtime
            .block_on(ByteStream::from_path(local_path))
            .map_err(|error| upload_error(format!("failed to open local file: {error}")))?;

        self.runtime
            .block_on(async move {
                client
                    .put_object()
                    .bucket(bucket)
                    .key(key)
                    .body(body)
                    .send()
                    .await
            })
            .map(|_| ())
            .map_err(|error| upload_error(DisplayErrorContext(&error).to_string()))
    }
}

pub struct CloudFormationProvisioner {
    runtime: Arc<Runtime>,
    cfn_client: aws_sdk_cloudformation::Client,
}

impl StackProvisioner for CloudFormationProvisioner {
    fn describe_stack(&self, stack_name: &str) -> Result<Option<StackDescription>, ResolutionError> {
        let client = self.cfn_client.clone();
        let result = self
            .runtime
            .block_on(async move { client.describe_stacks().stack_name(stack_name).send().await });

        match result {
            Ok(output) => Ok(output
                .stacks()
                .first()
                .map(|stack| describe(stack_name, stack))),
            Err(error)
                if validation_message_contains(error.as_service_error(), MISSING_STACK_MESSAGE) =>
            {
                Ok(None)
            }
            Err(error) => Err(ResolutionError::Query {
                stack_name: stack_name.to_string(),
                message: DisplayErrorContext(&error).to_string(),
            }),
        }
    }

    fn create_stack(&self, request: &StackTemplateRequest) -> Result<String, ProvisioningError> {
        let tags = build_tags(request, "create_stack")?;
        let client = self.cfn_client.clone();
        let result = self.runtime.block_on(async move {
            client
                .create_stack()
                .stack_name(&request.stack_name)
                .template_body(&request.template_body)
                .set_parameters(Some(build_parameters(request)))
                .capabilities(Capability::CapabilityNamedIam)
                .set_tags(Some(tags))
                .send()
                .await
        });

        result
            .map(|output| output.stack_id().unwrap_or_default().to_string())
            .map_err(|error| ProvisioningError::Request {
                operation: "create_stack",
                stack_name: request.stack_name.clone(),
                message: DisplayErrorContext(&error).to_string(),
            })
    }

    fn update_stack(&self, request: &StackTemplateRequest) -> Result<UpdateOutcome, ProvisioningError> {
        let tags = build_tags(request, "update_stack")?;
        let client = self.cfn_client.clone();
        let result = self.runtime.block_on(async move {
            client
                .update_stack()
                .stack_name(&request.stack_name)
                .template_body(&request.template_body)
                .set_parameters(Some(build_parameters(request)))
                .capabilities(Capability::CapabilityNamedIam)
                .set_tags(Some(tags))
                .send()
                .await
        });

        match result {
            Ok(output) => Ok(UpdateOutcome::Started {
                stack_id: output.stack_id().unwrap_or_default().to_string(),
            }),
            Err(error)
                if validation_message_contains(error.as_service_error(), NO_UPDATES_MESSAGE) =>
            {
                Ok(UpdateOutcome::NoUpdates)
            }
            Err(error) => Err(ProvisioningError::Request {
                operation: "update_stack",
                stack_name: request.stack_name.clone(),
                message: DisplayErrorContext(&error).to_string(),
            }),
        }
    }
}

/// CloudFormation reports both a missing stack and an empty change set as
/// `ValidationError`; only the service message tells them apart.
fn validation_message_contains<E: ProvideErrorMetadata>(error: Option<&E>, needle: &str) -> bool {
    error.is_some_and(|error| {
        error.code() == Some(VALIDATION_ERROR_CODE)
            && error.message().is_some_and(|message| message.contains(needle))
    })
}

fn classify_head_bucket(bucket: &str, status: u16, error: &HeadBucketError) -> BucketCheckError {
    let bucket = bucket.to_string();
    if error.is_not_found() || status == 404 {
        BucketCheckError::Missing { bucket }
    } else if status == 403 {
        BucketCheckError::Forbidden { bucket }
    } else {
        BucketCheckError::Other {
            bucket,
            message: DisplayErrorContext(error).to_string(),
        }
    }
}

fn describe(stack_name: &str, stack: &Stack) -> StackDescription {
    let outputs: StackOutputs = stack
        .outputs()
        .iter()
        .filter_map(|output| {
            Some((
                output.output_key()?.to_string(),
                output.output_value()?.to_string(),
            ))
        })
        .collect();

    StackDescription {
        stack_name: stack_name.to_string(),
        status: stack.stack_status().status_text(),
        outputs,
    }
}

fn build_parameters(request: &StackTemplateRequest) -> Vec<Parameter> {
    request
        .parameters()
        .into_iter()
        .map(|(key, value)| {
            Parameter::builder()
                .parameter_key(key)
                .parameter_value(value)
                .build()
        })
        .collect()
}

fn build_tags(
    request: &StackTemplateRequest,
    operation: &'static str,
) -> Result<Vec<Tag>, ProvisioningError> {
    request
        .tags()
        .into_iter()
        .map(|(key, value)| {
            Ok::<_, std::convert::Infallible>(Tag::builder().key(key).value(value).build())
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| ProvisioningError::Request {
            operation,
            stack_name: request.stack_name.clone(),
            message: format!("invalid stack tag: {error}"),
        })
}

// `Stack::stack_status` is optional in some SDK releases and required in others.
trait StatusText {
    fn status_text(&self) -> String;
}

impl StatusText for StackStatus {
    fn status_text(&self) -> String {
        self.as_str().to_string()
    }
}

impl StatusText for Option<&StackStatus> {
    fn status_text(&self) -> String {
        self.map(StackStatus::as_str).unwrap_or("UNKNOWN").to_string()
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_cloudformation::error::ErrorMetadata;
    use aws_sdk_cloudformation::operation::describe_stacks::DescribeStacksError;
    use aws_sdk_cloudformation::operation::update_stack::UpdateStackError;
    use aws_sdk_s3::types::error::NotFound;

    use super::*;

    fn metadata(code: &str, message: &str) -> ErrorMetadata {
        ErrorMetadata::builder().code(code).message(message).build()
    }

    #[test]
    fn missing_stack_is_recognised_from_validation_error() {
        let error = DescribeStacksError::generic(metadata(
            "ValidationError",
            "Stack with id big-data-agent-infrastructure-workshop does not exist",
        ));
        assert!(validation_message_contains(Some(&error), MISSING_STACK_MESSAGE));
        assert!(!validation_message_contains(Some(&error), NO_UPDATES_MESSAGE));
    }

    #[test]
    fn empty_change_set_is_recognised_from_validation_error() {
        let error = UpdateStackError::generic(metadata(
            "ValidationError",
            "No updates are to be performed.",
        ));
        assert!(validation_message_contains(Some(&error), NO_UPDATES_MESSAGE));
    }

    #[test]
    fn other_error_codes_are_not_swallowed() {
        let denied = DescribeStacksError::generic(metadata(
            "AccessDenied",
            "User is not authorized; role does not exist",
        ));
        assert!(!validation_message_contains(Some(&denied), MISSING_STACK_MESSAGE));

        let template = UpdateStackError::generic(metadata(
            "ValidationError",
            "Template format error: unsupported structure",
        ));
        assert!(!validation_message_contains(Some(&template), NO_UPDATES_MESSAGE));

        assert!(!validation_message_contains::<DescribeStacksError>(None, MISSING_STACK_MESSAGE));
    }

    #[test]
    fn head_bucket_status_is_classified() {
        let not_found = HeadBucketError::NotFound(NotFound::builder().build());
        assert!(matches!(
            classify_head_bucket("b", 404, &not_found),
            BucketCheckError::Missing { bucket } if bucket == "b"
        ));

        let forbidden = HeadBucketError::generic(
            aws_sdk_s3::error::ErrorMetadata::builder().code("403").build(),
        );
        assert!(matches!(
            classify_head_bucket("b", 403, &forbidden),
            BucketCheckError::Forbidden { .. }
        ));

        let throttled = HeadBucketError::generic(
            aws_sdk_s3::error::ErrorMetadata::builder()
                .code("SlowDown")
                .message("reduce your request rate")
                .build(),
        );
        match classify_head_bucket("b", 503, &throttled) {
            BucketCheckError::Other { bucket, message } => {
                assert_eq!(bucket, "b");
                assert!(message.contains("SlowDown"), "unexpected message: {message}");
            }
            other => panic!("expected other bucket error, got {other:?}"),
        }
    }
}
