use std::io::Write;

use crate::error::TransferError;

pub trait Fetcher {
    /// Streams the body at `url` into `sink`, returning the number of bytes written.
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransferError>;
}
