use crate::{ArtifactKind, RemoteError, Remotes};
use std::io::Read;

/// HTTP client for downloading published artifacts.
///
/// Remotes serve plain files: `GET <base>/<name>.codex.json` for the lean
/// form, `GET <base>/<name>.codex.tar` for the bundle.
pub struct RemoteClient {
    agent: ureq::Agent,
}

impl Default for RemoteClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteClient {
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    /// Download one artifact from a named remote.
    pub fn fetch_artifact(
        &self,
        remotes: &Remotes,
        alias: &str,
        name: &str,
        kind: ArtifactKind,
    ) -> Result<Vec<u8>, RemoteError> {
        let url = remotes.artifact_url(alias, name, kind)?;
        tracing::debug!("GET {url}");
        self.do_get(&url)
    }

    fn do_get(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        let resp = match self.agent.get(url).call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(RemoteError::NotFound(url.to_owned()));
            }
            Err(ureq::Error::StatusCode(code)) => {
                return Err(RemoteError::Http(format!("HTTP {code} for {url}")));
            }
            Err(e) => {
                return Err(RemoteError::Http(e.to_string()));
            }
        };

        let mut reader = resp.into_body().into_reader();
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| RemoteError::Http(e.to_string()))?;
        Ok(body)
    }
}

/// Convenience wrapper over a one-shot [`RemoteClient`].
pub fn fetch_artifact(
    remotes: &Remotes,
    alias: &str,
    name: &str,
    kind: ArtifactKind,
) -> Result<Vec<u8>, RemoteError> {
    RemoteClient::new().fetch_artifact(remotes, alias, name, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;

    struct MockServer {
        addr: String,
        _handle: std::thread::JoinHandle<()>,
    }

    impl MockServer {
        fn start(routes: Vec<(&str, Vec<u8>)>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = format!("http://{}", listener.local_addr().unwrap());
            let routes: HashMap<String, Vec<u8>> = routes
                .into_iter()
                .map(|(path, body)| (path.to_owned(), body))
                .collect();

            let handle = std::thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(mut stream) = stream else { break };
                    let mut reader = BufReader::new(stream.try_clone().unwrap());
                    let mut request_line = String::new();
                    if reader.read_line(&mut request_line).is_err() {
                        continue;
                    }
                    let path = request_line
                        .split_whitespace()
                        .nth(1)
                        .unwrap_or("/")
                        .to_owned();
                    loop {
                        let mut line = String::new();
                        if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
                            break;
                        }
                    }
                    match routes.get(&path) {
                        Some(body) => {
                            let header = format!(
                                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                                body.len()
                            );
                            let _ = stream.write_all(header.as_bytes());
                            let _ = stream.write_all(body);
                        }
                        None => {
                            let _ = stream.write_all(
                                b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                            );
                        }
                    }
                    let _ = stream.flush();
                }
            });

            MockServer {
                addr,
                _handle: handle,
            }
        }
    }

    fn remotes_for(server: &MockServer) -> Remotes {
        let mut remotes = Remotes::new();
        remotes.insert("lab", &server.addr);
        remotes
    }

    #[test]
    fn fetches_lean_artifact() {
        let server = MockServer::start(vec![(
            "/shelley.codex.json",
            br#"{"spec_version": "0.1.0"}"#.to_vec(),
        )]);
        let body = fetch_artifact(&remotes_for(&server), "lab", "shelley", ArtifactKind::Lean)
            .unwrap();
        assert_eq!(body, br#"{"spec_version": "0.1.0"}"#);
    }

    #[test]
    fn fetches_bundle_artifact() {
        let server =
            MockServer::start(vec![("/shelley.codex.tar", b"tar-bytes".to_vec())]);
        let body = fetch_artifact(
            &remotes_for(&server),
            "lab",
            "shelley",
            ArtifactKind::Bundle,
        )
        .unwrap();
        assert_eq!(body, b"tar-bytes");
    }

    #[test]
    fn missing_artifact_is_not_found() {
        let server = MockServer::start(vec![]);
        let err = fetch_artifact(&remotes_for(&server), "lab", "ghost", ArtifactKind::Lean)
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));
    }

    #[test]
    fn unknown_alias_fails_before_any_request() {
        let err = fetch_artifact(&Remotes::new(), "nowhere", "shelley", ArtifactKind::Lean)
            .unwrap_err();
        assert!(matches!(err, RemoteError::Config(_)));
    }

    #[test]
    fn connection_refused_is_an_http_error() {
        let mut remotes = Remotes::new();
        remotes.insert("dead", "http://127.0.0.1:1");
        let err = fetch_artifact(&remotes, "dead", "shelley", ArtifactKind::Lean).unwrap_err();
        assert!(matches!(err, RemoteError::Http(_)));
    }
}
