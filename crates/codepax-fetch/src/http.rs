//! HTTP retrieval over a blocking `ureq` agent.

use crate::FetchError;
use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;

/// HTTP fetcher with an optional global per-request timeout.
///
/// A timeout aborts that one fetch with [`FetchError::Timeout`]; the caller's
/// strict/relaxed policy decides what that means for the whole operation.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(timeout)
            .build();
        Self {
            agent: config.into(),
        }
    }

    pub fn get(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<Vec<u8>, FetchError> {
        tracing::debug!("GET {url}");
        let mut req = self.agent.get(url);
        for (name, value) in headers {
            req = req.header(name, value);
        }

        let resp = match req.call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(FetchError::NotFound(url.to_owned()));
            }
            Err(ureq::Error::StatusCode(code)) => {
                return Err(FetchError::Network {
                    location: url.to_owned(),
                    reason: format!("HTTP {code}"),
                });
            }
            Err(ureq::Error::Timeout(_)) => {
                return Err(FetchError::Timeout(url.to_owned()));
            }
            Err(e) => {
                return Err(FetchError::Network {
                    location: url.to_owned(),
                    reason: e.to_string(),
                });
            }
        };

        let mut reader = resp.into_body().into_reader();
        let mut body = Vec::new();
        reader.read_to_end(&mut body).map_err(|e| FetchError::Network {
            location: url.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(body)
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(None)
    }
}
