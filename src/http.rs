//! HTTP transport seam used by the version resolver, checksum provider and
//! downloader.
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use crate::error::TransportError;

/// TCP connect timeout in seconds.
const CONNECT_TIMEOUT: u64 = 10;

/// Total transfer timeout in seconds.
const TRANSFER_TIMEOUT: u64 = 120;

/// Blocking HTTP operations.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// GET `url` and return the body as text.
    ///
    /// `api` marks GitHub API requests, which carry the token when one is
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on network failure or a non-2xx status.
    fn get_text(&self, url: &str, api: bool) -> Result<String, TransportError>;

    /// GET `url` and stream the body into `dest`, returning the byte count.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on network failure, a non-2xx status or a
    /// write error.
    fn download(&self, url: &str, dest: &Path) -> Result<u64, TransportError>;
}

/// [`Transport`] backed by a shared [`ureq::Agent`].
#[derive(Debug)]
pub struct UreqTransport {
    agent: ureq::Agent,
    token: Option<String>,
    user_agent: String,
}

impl UreqTransport {
    /// Create a transport; `token` is sent as a bearer token on API requests.
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_connect(Some(Duration::from_secs(CONNECT_TIMEOUT)))
            .timeout_global(Some(Duration::from_secs(TRANSFER_TIMEOUT)))
            .build()
            .into();
        Self {
            agent,
            token,
            user_agent: format!("devsetup/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    fn call(
        &self,
        url: &str,
        api: bool,
    ) -> Result<ureq::http::Response<ureq::Body>, TransportError> {
        let mut request = self.agent.get(url).header("User-Agent", &self.user_agent);
        if api {
            request = request.header("Accept", "application/vnd.github+json");
            if let Some(token) = &self.token {
                request = request.header("Authorization", &format!("Bearer {token}"));
            }
        }
        request.call().map_err(|e| map_error(url, e))
    }
}

fn map_error(url: &str, err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::StatusCode(code) => TransportError::Status {
            url: url.to_string(),
            code,
        },
        other => TransportError::Network {
            url: url.to_string(),
            reason: other.to_string(),
        },
    }
}

impl Transport for UreqTransport {
    fn get_text(&self, url: &str, api: bool) -> Result<String, TransportError> {
        let mut response = self.call(url, api)?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|e| map_error(url, e))
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64, TransportError> {
        let response = self.call(url, false)?;
        let io_err = |source: io::Error| TransportError::Io {
            path: dest.to_path_buf(),
            source,
        };
        let mut file = fs::File::create(dest).map_err(io_err)?;
        let mut reader = response.into_body().into_reader();
        let copied = io::copy(&mut reader, &mut file).map_err(|e| TransportError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        file.sync_all().map_err(io_err)?;
        Ok(copied)
    }
}
