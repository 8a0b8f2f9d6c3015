use std::path::Path;

use crate::error::{BucketCheckError, TransferError};

pub trait ObjectStore {
    fn check_bucket(&self, bucket: &str) -> Result<(), BucketCheckError>;

    fn upload_file(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), TransferError>;
}
