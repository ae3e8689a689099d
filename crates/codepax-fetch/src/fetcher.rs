//! The composed content fetcher: cache → single-flight → dispatch.

use crate::cache::{FetchCache, NoopCache};
use crate::http::HttpFetcher;
use crate::singleflight::SingleFlight;
use crate::FetchError;
use codepax_resolve::Resolved;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

/// Backend for `func://` locations. The model-inference step itself lives
/// outside this engine; callers inject an implementation, tests inject
/// fakes.
pub trait FunctionInvoker: Send + Sync {
    fn invoke(
        &self,
        name: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Vec<u8>, FetchError>;
}

/// Default invoker: every invocation fails with a function error.
#[derive(Debug, Default)]
pub struct NullInvoker;

impl FunctionInvoker for NullInvoker {
    fn invoke(
        &self,
        name: &str,
        _params: &BTreeMap<String, String>,
    ) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::Function {
            name: name.to_owned(),
            reason: "no function backend configured".to_owned(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Per-fetch timeout for HTTP retrievals. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// Retrieves raw bytes for resolved locations.
///
/// Cache hits return without touching the network or the function backend.
/// Misses go through single-flight coalescing, then dispatch on the location
/// kind, then populate the cache.
pub struct ContentFetcher {
    http: HttpFetcher,
    cache: Arc<dyn FetchCache>,
    invoker: Arc<dyn FunctionInvoker>,
    flights: SingleFlight,
}

impl ContentFetcher {
    pub fn new(options: FetchOptions) -> Self {
        Self {
            http: HttpFetcher::new(options.timeout),
            cache: Arc::new(NoopCache),
            invoker: Arc::new(NullInvoker),
            flights: SingleFlight::new(),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn FetchCache>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_invoker(mut self, invoker: Arc<dyn FunctionInvoker>) -> Self {
        self.invoker = invoker;
        self
    }

    pub fn fetch(&self, location: &Resolved) -> Result<Vec<u8>, FetchError> {
        let key = location.cache_key();
        if let Some(hit) = self.cache.get(&key) {
            tracing::trace!("cache hit for '{key}'");
            return Ok(hit);
        }

        self.flights.run(&key, || {
            let data = self.fetch_direct(location)?;
            self.cache.put(&key, &data);
            Ok(data)
        })
    }

    fn fetch_direct(&self, location: &Resolved) -> Result<Vec<u8>, FetchError> {
        match location {
            Resolved::Http { url, headers, .. } => self.http.get(url, headers),
            Resolved::File(path) => fs::read(path).map_err(|e| {
                let location = path.display().to_string();
                if e.kind() == ErrorKind::NotFound {
                    FetchError::NotFound(location)
                } else {
                    FetchError::Io {
                        location,
                        reason: e.to_string(),
                    }
                }
            }),
            Resolved::Function { name, params, .. } => self.invoker.invoke(name, params),
        }
    }
}
