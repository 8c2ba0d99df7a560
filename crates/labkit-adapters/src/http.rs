//! Bounded network checks over `reqwest::blocking`.
//!
//! Every request carries its own timeout, applied by the client at the call
//! site, so a hung peer cannot stall the probe sequence.

use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use labkit_core::{
    application::ports::{HttpReply, NetworkProbe, ProbeError},
    error::{LabkitError, LabkitResult},
};
use reqwest::blocking::{Client, RequestBuilder};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ReqwestProbe {
    client: Client,
}

impl ReqwestProbe {
    pub fn new() -> LabkitResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("labkit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LabkitError::Configuration {
                message: format!("HTTP client could not be initialised: {e}"),
            })?;
        Ok(Self { client })
    }

    fn send(
        &self,
        request: RequestBuilder,
        url: &str,
        timeout: Duration,
    ) -> Result<HttpReply, ProbeError> {
        let response = request
            .timeout(timeout)
            .send()
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        let status_line = format!("{:?} {}", response.version(), status);
        let body = response.text().map_err(|e| classify(e, timeout))?;
        debug!(url, %status_line, bytes = body.len(), "HTTP reply");

        Ok(HttpReply {
            status: status.as_u16(),
            status_line,
            body,
        })
    }
}

impl NetworkProbe for ReqwestProbe {
    fn http_get(
        &self,
        url: &str,
        query: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpReply, ProbeError> {
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        self.send(request, url, timeout)
    }

    fn http_head(&self, url: &str, timeout: Duration) -> Result<HttpReply, ProbeError> {
        self.send(self.client.head(url), url, timeout)
    }

    fn tcp_listening(&self, port: u16, timeout: Duration) -> bool {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        TcpStream::connect_timeout(&addr, timeout).is_ok()
    }
}

fn classify(error: reqwest::Error, timeout: Duration) -> ProbeError {
    if error.is_timeout() {
        ProbeError::Timeout { after: timeout }
    } else if error.is_connect() {
        ProbeError::Unreachable(root_cause(&error))
    } else {
        ProbeError::Other(root_cause(&error))
    }
}

/// Innermost error message; reqwest's own Display hides the OS reason.
fn root_cause(error: &(dyn std::error::Error + 'static)) -> String {
    let mut current = error;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}
