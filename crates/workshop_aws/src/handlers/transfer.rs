use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use workshop_core::contract::FileDescriptor;

use crate::adapters::fetch::Fetcher;
use crate::adapters::object_store::ObjectStore;
use crate::error::TransferError;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Streams `file.url` into `scratch_dir/<filename>`.
///
/// A partially written file is left behind on failure; removing it is the
/// caller's decision.
pub fn download(
    fetcher: &impl Fetcher,
    file: &FileDescriptor,
    scratch_dir: &Path,
) -> Result<DownloadedFile, TransferError> {
    let path = scratch_dir.join(&file.filename);
    tracing::info!(component = "transfer", url = %file.url, "downloading");

    let handle = File::create(&path).map_err(|source| TransferError::Io {
        operation: "create",
        path: path.clone(),
        source,
    })?;
    let mut sink = LocalSink::new(BufWriter::new(handle));
    let bytes = fetcher
        .fetch(&file.url, &mut sink)
        .map_err(|error| sink.attribute(error, &path))?;
    sink.flush().map_err(|source| TransferError::Io {
        operation: "flush",
        path: path.clone(),
        source,
    })?;

    let size_mb = format!("{:.1}", bytes as f64 / BYTES_PER_MB);
    tracing::info!(
        component = "transfer",
        filename = %file.filename,
        size_mb = %size_mb,
        "downloaded"
    );
    Ok(DownloadedFile { path, bytes })
}

/// Writer over the local file that records whether a local write failed.
struct LocalSink<W> {
    inner: W,
    write_failed: bool,
}

impl<W: Write> LocalSink<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            write_failed: false,
        }
    }

    fn record<T>(&mut self, result: io::Result<T>) -> io::Result<T> {
        if matches!(&result, Err(error) if error.kind() != io::ErrorKind::Interrupted) {
            self.write_failed = true;
        }
        result
    }

    fn attribute(&self, error: TransferError, path: &Path) -> TransferError {
        match error {
            TransferError::Stream { source, .. } if self.write_failed => TransferError::Io {
                operation: "write",
                path: path.to_path_buf(),
                source,
            },
            other => other,
        }
    }
}

impl<W: Write> Write for LocalSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let result = self.inner.write(buf);
        self.record(result)
    }

    fn flush(&mut self) -> io::Result<()> {
        let result = self.inner.flush();
        self.record(result)
    }
}

pub fn upload(
    store: &impl ObjectStore,
    local_path: &Path,
    bucket: &str,
    key: &str,
) -> Result<(), TransferError> {
    let target = format!("s3://{bucket}/{key}");
    tracing::info!(
        component = "transfer",
        path = %local_path.display(),
        target = %target,
        "uploading"
    );
    store.upload_file(local_path, bucket, key)?;
    tracing::info!(component = "transfer", key, "uploaded");
    Ok(())
}
