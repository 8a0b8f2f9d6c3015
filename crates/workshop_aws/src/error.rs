use std::io;
use std::path::PathBuf;

use thiserror::Error;
use workshop_core::contract::ValidationError;

/// Provisioning query failed for a reason other than the stack being absent.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("failed to describe stack {stack_name}: {message}")]
    Query { stack_name: String, message: String },
}

#[derive(Debug, Error)]
pub enum BucketCheckError {
    #[error("bucket {bucket} does not exist")]
    Missing { bucket: String },
    #[error("access denied to bucket {bucket}")]
    Forbidden { bucket: String },
    #[error("error accessing bucket {bucket}: {message}")]
    Other { bucket: String, message: String },
}

/// Download or upload failure for a single file.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request for {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("download of {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to stream body of {url}")]
    Stream {
        url: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to {operation} {}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("upload to s3://{bucket}/{key} failed: {message}")]
    Upload {
        bucket: String,
        key: String,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("{operation} for stack {stack_name} failed: {message}")]
    Request {
        operation: &'static str,
        stack_name: String,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("failed to read template {}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),
    #[error("stack {stack_name} ended in status {status}")]
    Failed { stack_name: String, status: String },
    #[error("stack {stack_name} disappeared while waiting for completion")]
    Vanished { stack_name: String },
    #[error("timed out waiting for stack {stack_name} after {attempts} attempts (last status: {})", last_status.as_deref().unwrap_or("unknown"))]
    Timeout {
        stack_name: String,
        attempts: u32,
        last_status: Option<String>,
    },
}

/// Terminal failures of the data preparation workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
    #[error("CloudFormation stack {stack_name} does not exist")]
    StackNotFound { stack_name: String },
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("BucketName not found in outputs of stack {stack_name} (available: {})", available.join(", "))]
    MissingBucketOutput {
        stack_name: String,
        available: Vec<String>,
    },
    #[error(transparent)]
    Bucket(#[from] BucketCheckError),
    #[error("failed to create scratch directory {}", path.display())]
    Scratch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
