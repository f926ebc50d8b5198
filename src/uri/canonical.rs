//! Canonical (domain, suffix, path) decomposition
//!
//! Parsing is delegated to the `url` crate, which lowercases hosts and
//! converts internationalized labels to their punycode form. Public suffix
//! splitting uses the embedded list from the `psl` crate.

use crate::uri::error::{UriError, UriResult};
use serde::Serialize;
use std::fmt;
use url::{Host, Url};

/// Scheme prepended to inputs that carry no authority of their own
pub const DEFAULT_SCHEME: &str = "http://";

/// Comparable parts of a URI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UriComponents {
    /// Label directly below the public suffix (`example` in `www.example.co.uk`)
    pub registrable_domain: String,
    /// Public suffix (`co.uk`), empty for IP literals and unlisted suffixes
    pub public_suffix: String,
    /// Path plus `?query`; empty when the input has no path
    pub path: String,
}

impl UriComponents {
    /// Host rebuilt from domain and suffix (subdomains are not retained)
    pub fn host(&self) -> String {
        match (
            self.registrable_domain.is_empty(),
            self.public_suffix.is_empty(),
        ) {
            (false, false) => format!("{}.{}", self.registrable_domain, self.public_suffix),
            (false, true) => self.registrable_domain.clone(),
            (true, _) => self.public_suffix.clone(),
        }
    }

    /// Render back to a URI string that canonicalizes to the same components
    pub fn render(&self) -> String {
        format!("{}{}{}", DEFAULT_SCHEME, self.host(), self.path)
    }
}

impl fmt::Display for UriComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "domain={} suffix={} path={}",
            self.registrable_domain, self.public_suffix, self.path
        )
    }
}

/// Prefix `raw` with the default scheme unless it already names one
pub fn with_default_scheme(raw: &str) -> String {
    if raw.contains("://") {
        raw.to_string()
    } else {
        format!("{}{}", DEFAULT_SCHEME, raw)
    }
}

/// Split a raw string into registrable domain, public suffix and path
///
/// Inputs without a recognizable authority (`example.com/a`,
/// `localhost:8080`) are reparsed with [`DEFAULT_SCHEME`] in front.
pub fn canonicalize(raw: &str) -> UriResult<UriComponents> {
    let raw = raw.trim();

    let (url, source) = match Url::parse(raw) {
        Ok(url) if has_host(&url) => (url, raw.to_string()),
        _ => {
            let prefixed = format!("{}{}", DEFAULT_SCHEME, raw);
            match Url::parse(&prefixed) {
                Ok(url) if has_host(&url) => (url, prefixed),
                _ => return Err(UriError::MalformedUri(raw.to_string())),
            }
        }
    };

    let (registrable_domain, public_suffix) = match url.host() {
        Some(Host::Domain(name)) => split_host(&name.to_ascii_lowercase()),
        Some(Host::Ipv4(addr)) => (addr.to_string(), String::new()),
        Some(Host::Ipv6(addr)) => (format!("[{}]", addr), String::new()),
        None => return Err(UriError::MalformedUri(raw.to_string())),
    };

    if registrable_domain.chars().any(char::is_whitespace) {
        return Err(UriError::MalformedUri(raw.to_string()));
    }

    let mut path = if url.path() == "/" && !has_explicit_root(&source) {
        String::new()
    } else {
        url.path().to_string()
    };
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }

    Ok(UriComponents {
        registrable_domain,
        public_suffix,
        path,
    })
}

fn has_host(url: &Url) -> bool {
    url.host_str().map(|h| !h.is_empty()).unwrap_or(false)
}

/// Whether the text after the authority starts with a path separator
///
/// The parser normalizes `http://example.com` to path `/`; only a root the
/// caller actually wrote is kept.
fn has_explicit_root(source: &str) -> bool {
    let after_scheme = match source.find("://") {
        Some(pos) => &source[pos + 3..],
        None => source,
    };

    after_scheme
        .chars()
        .find(|c| matches!(c, '/' | '\\' | '?' | '#'))
        .map(|c| c == '/' || c == '\\')
        .unwrap_or(false)
}

/// Split a lowercase host name into (registrable label, public suffix)
fn split_host(host: &str) -> (String, String) {
    let host = host.trim_end_matches('.');

    let suffix = match psl::suffix(host.as_bytes()) {
        Some(suffix) if suffix.is_known() => String::from_utf8_lossy(suffix.as_bytes()).into_owned(),
        _ => String::new(),
    };

    let rest = if suffix.is_empty() {
        host
    } else {
        host[..host.len() - suffix.len()].trim_end_matches('.')
    };

    let domain = rest.rsplit('.').next().unwrap_or_default().to_string();
    (domain, suffix)
}
