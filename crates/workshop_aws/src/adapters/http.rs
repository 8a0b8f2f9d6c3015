use std::io::Write;

use reqwest::blocking::Client;

use super::fetch::Fetcher;
use crate::error::TransferError;

/// Blocking HTTP client that streams response bodies instead of buffering them.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a client without a request timeout; large dataset files can take minutes.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(None).build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransferError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|source| TransferError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        std::io::copy(&mut response, sink).map_err(|source| TransferError::Stream {
            url: url.to_string(),
            source,
        })
    }
}
