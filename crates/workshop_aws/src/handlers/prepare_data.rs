//! Download source files and re-upload them under partitioned S3 keys.
//!
//! The workflow is linear: resolve stack outputs, verify the bucket, then
//! transfer each file in order. Stack and bucket failures abort the run before
//! anything is downloaded; per-file failures are recorded and skipped.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use workshop_core::contract::{
    normalize_request, FileDescriptor, FileOutcome, PrepareDataReport, PrepareDataRequest,
    TransferStage, BUCKET_NAME_OUTPUT,
};
use workshop_core::storage_keys::object_key;

use super::stack_outputs::resolve_stack_outputs;
use super::transfer::{download, upload};
use crate::adapters::fetch::Fetcher;
use crate::adapters::object_store::ObjectStore;
use crate::adapters::provisioning::StackProvisioner;
use crate::error::WorkflowError;

/// Name prefix of the staging directory created under the scratch root.
pub const SCRATCH_DIR_PREFIX: &str = "temp_downloads-";
pub const DEFAULT_SCRATCH_ROOT: &str = ".";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareDataConfig {
    /// Parent of the per-run staging directory; its existing contents are never touched.
    pub scratch_root: PathBuf,
}

impl Default for PrepareDataConfig {
    fn default() -> Self {
        Self {
            scratch_root: PathBuf::from(DEFAULT_SCRATCH_ROOT),
        }
    }
}

/// Fresh staging directory owned by one workflow run, holding at most one
/// file at a time.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn create(root: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_DIR_PREFIX)
            .tempdir_in(root)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn discard(&self, file: &Path) {
        match std::fs::remove_file(file) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => tracing::warn!(
                component = "prepare_data",
                path = %file.display(),
                error = %error,
                "failed to delete local file"
            ),
        }
    }

    pub fn remove(self) -> io::Result<()> {
        self.dir.close()
    }
}

pub fn prepare_data(
    request: PrepareDataRequest,
    config: &PrepareDataConfig,
    provisioner: &impl StackProvisioner,
    store: &impl ObjectStore,
    fetcher: &impl Fetcher,
) -> Result<PrepareDataReport, WorkflowError> {
    let request = normalize_request(request)?;
    tracing::info!(
        component = "prepare_data",
        stack_name = %request.stack_name,
        files = request.file_urls.len(),
        "starting data preparation"
    );

    let outputs = resolve_stack_outputs(provisioner, &request.stack_name)?.ok_or_else(|| {
        WorkflowError::StackNotFound {
            stack_name: request.stack_name.clone(),
        }
    })?;
    let bucket = outputs
        .get(BUCKET_NAME_OUTPUT)
        .cloned()
        .ok_or_else(|| WorkflowError::MissingBucketOutput {
            stack_name: request.stack_name.clone(),
            available: outputs.keys().cloned().collect(),
        })?;
    tracing::info!(component = "prepare_data", bucket = %bucket, "using bucket from stack outputs");

    store.check_bucket(&bucket)?;
    tracing::info!(component = "prepare_data", bucket = %bucket, "verified bucket exists");

    let scratch = ScratchDir::create(&config.scratch_root).map_err(|source| WorkflowError::Scratch {
        path: config.scratch_root.clone(),
        source,
    })?;
    let scratch_path = scratch.path().to_path_buf();

    let outcomes = request
        .file_urls
        .iter()
        .map(|url| transfer_file(url, &request.table_name, &bucket, &scratch, store, fetcher))
        .collect::<Vec<_>>();

    if let Err(error) = scratch.remove() {
        tracing::warn!(
            component = "prepare_data",
            path = %scratch_path.display(),
            error = %error,
            "failed to remove scratch directory"
        );
    }

    let report = PrepareDataReport {
        stack_name: request.stack_name,
        bucket,
        outcomes,
    };
    tracing::info!(
        component = "prepare_data",
        bucket = %report.bucket,
        uploaded = report.uploaded_keys().len(),
        failed = report.failed_count(),
        "data preparation complete"
    );
    Ok(report)
}

fn transfer_file(
    url: &str,
    table_name: &str,
    bucket: &str,
    scratch: &ScratchDir,
    store: &impl ObjectStore,
    fetcher: &impl Fetcher,
) -> FileOutcome {
    let file = match FileDescriptor::from_url(url) {
        Ok(file) => file,
        Err(error) => {
            tracing::error!(
                component = "prepare_data",
                url,
                error = %error,
                "cannot derive a filename from URL, skipping file"
            );
            return FileOutcome::Failed {
                url: url.to_string(),
                stage: TransferStage::Resolve,
                message: error.to_string(),
            };
        }
    };

    let downloaded = match download(fetcher, &file, scratch.path()) {
        Ok(value) => value,
        Err(error) => {
            tracing::error!(
                component = "prepare_data",
                url = %file.url,
                error = %error,
                "download failed, skipping file"
            );
            scratch.discard(&scratch.path().join(&file.filename));
            return FileOutcome::Failed {
                url: file.url.clone(),
                stage: TransferStage::Download,
                message: error.to_string(),
            };
        }
    };

    let key = object_key(table_name, &file.filename);
    let result = upload(store, &downloaded.path, bucket, &key);
    scratch.discard(&downloaded.path);

    match result {
        Ok(()) => FileOutcome::Uploaded {
            url: file.url.clone(),
            key,
            bytes: downloaded.bytes,
        },
        Err(error) => {
            tracing::error!(
                component = "prepare_data",
                url = %file.url,
                key = %key,
                error = %error,
                "upload failed, skipping file"
            );
            FileOutcome::Failed {
                url: file.url.clone(),
                stage: TransferStage::Upload,
                message: error.to_string(),
            }
        }
    }
}
