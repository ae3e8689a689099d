//! URI → concrete location resolution.
//!
//! One code path handles all location spellings. Resolution order mirrors
//! fetch dispatch: `func://` pseudo-URIs first, then resolver-table schemes,
//! then `file://` and plain http(s), and finally relative paths against the
//! manifest's base directory. Unknown schemes fail; they are never silently
//! treated as paths.

use crate::functions::FunctionTable;
use crate::gutenberg::normalize_gutenberg_id;
use crate::table::ResolverTable;
use crate::ResolveError;
use codepax_schema::SourceLocation;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Reserved scheme for the public-domain text archive; identifiers are
/// normalized to bare numeric form before template expansion.
pub const GUTENBERG_SCHEME: &str = "pg";

/// Pseudo-scheme for on-demand computed values.
pub const FUNCTION_SCHEME: &str = "func";

/// A concrete, fetchable location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Http {
        url: String,
        headers: BTreeMap<String, String>,
        encoding: Option<String>,
    },
    File(PathBuf),
    Function {
        name: String,
        params: BTreeMap<String, String>,
        /// Original URI, kept as the cache key.
        raw: String,
    },
}

impl Resolved {
    /// The exact location string used as the fetch-cache key.
    pub fn cache_key(&self) -> String {
        match self {
            Resolved::Http { url, .. } => url.clone(),
            Resolved::File(path) => path.display().to_string(),
            Resolved::Function { raw, .. } => raw.clone(),
        }
    }
}

fn split_scheme(uri: &str) -> Option<(&str, &str)> {
    uri.split_once("://")
}

fn parse_params(query: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        match pair.split_once('=') {
            Some((k, v)) => params.insert(k.to_owned(), v.to_owned()),
            None => params.insert(pair.to_owned(), String::new()),
        };
    }
    params
}

fn resolve_function(rest: &str, raw: &str, functions: &FunctionTable) -> Result<Resolved, ResolveError> {
    functions.validate()?;

    let (name_part, query) = match rest.split_once('?') {
        Some((n, q)) => (n, q),
        None => (rest, ""),
    };
    let name = name_part.trim_matches('/').to_owned();

    let spec = functions
        .get(&name)
        .ok_or_else(|| ResolveError::FunctionNotFound(name.clone()))?;
    let callable = spec
        .callable_name()
        .ok_or_else(|| ResolveError::InvalidFunction {
            name: name.clone(),
            reason: "missing required 'name' or 'id'".to_owned(),
        })?;

    Ok(Resolved::Function {
        name: callable.to_owned(),
        params: parse_params(query),
        raw: raw.to_owned(),
    })
}

/// Resolve one location reference to a concrete location.
pub fn resolve_location(
    uri: &str,
    base_dir: &Path,
    resolvers: &ResolverTable,
    functions: &FunctionTable,
) -> Result<Resolved, ResolveError> {
    let Some((scheme, rest)) = split_scheme(uri) else {
        // No scheme: a path relative to the manifest's directory.
        return Ok(Resolved::File(base_dir.join(uri)));
    };

    if scheme == FUNCTION_SCHEME {
        return resolve_function(rest, uri, functions);
    }

    if let Some(spec) = resolvers.get(scheme) {
        if !spec.template.contains("{id}") {
            return Err(ResolveError::MissingTemplate {
                scheme: scheme.to_owned(),
            });
        }
        let mut identifier = rest.trim_start_matches('/').to_owned();
        if let Some(stripped) = identifier.split_once(['?', '#']) {
            identifier = stripped.0.to_owned();
        }
        if scheme == GUTENBERG_SCHEME {
            identifier = normalize_gutenberg_id(&identifier);
        }
        let url = spec.expand(&identifier);
        tracing::debug!("resolved {uri} -> {url}");
        return Ok(Resolved::Http {
            url,
            headers: spec.headers.clone(),
            encoding: spec.encoding.clone(),
        });
    }

    match scheme {
        "file" => Ok(Resolved::File(PathBuf::from(rest.to_owned()))),
        "http" | "https" => Ok(Resolved::Http {
            url: uri.to_owned(),
            headers: BTreeMap::new(),
            encoding: None,
        }),
        _ => Err(ResolveError::UnresolvedScheme {
            scheme: scheme.to_owned(),
            uri: uri.to_owned(),
        }),
    }
}

/// Resolve a source's location value to an ordered list of concrete
/// locations. Order is preserved: multi-location sources are joined in this
/// order downstream.
pub fn resolve_source(
    location: &SourceLocation,
    base_dir: &Path,
    resolvers: &ResolverTable,
    functions: &FunctionTable,
) -> Result<Vec<Resolved>, ResolveError> {
    location
        .uris()
        .into_iter()
        .map(|uri| resolve_location(uri, base_dir, resolvers, functions))
        .collect()
}
