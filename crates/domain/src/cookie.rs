//! Host-scoped cookie accumulation.
//!
//! Cookies are kept as bare `name=value` pairs per host; attributes such as
//! `Path` or `Expires` are dropped when a `Set-Cookie` header is parsed.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Cookies of one host, name to value, in first-seen order.
pub type CookieJar = IndexMap<String, String>;

/// Cookies for every host the engine has talked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct CookieStore {
    hosts: IndexMap<String, CookieJar>,
}

impl CookieStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the jar of a host, if any cookie was stored for it.
    #[must_use]
    pub fn jar(&self, host: &str) -> Option<&CookieJar> {
        self.hosts.get(host)
    }

    /// Builds the outbound `Cookie` header value for a host.
    ///
    /// Returns an empty string when the host is empty or has no cookies.
    #[must_use]
    pub fn cookie_header(&self, host: &str) -> String {
        if host.is_empty() {
            return String::new();
        }
        self.jar(host).map(build_cookie_header).unwrap_or_default()
    }

    /// Merges cookies into a host's jar. New values overwrite same-named ones.
    ///
    /// Returns the number of cookies merged.
    pub fn merge(&mut self, host: &str, cookies: CookieJar) -> usize {
        if host.is_empty() || cookies.is_empty() {
            return 0;
        }
        let count = cookies.len();
        self.hosts.entry(host.to_string()).or_default().extend(cookies);
        count
    }

    /// Removes every cookie of every host.
    pub fn clear(&mut self) {
        self.hosts.clear();
    }

    /// Returns true if no host has cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.values().all(IndexMap::is_empty)
    }

    /// Iterates over hosts and their jars.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CookieJar)> {
        self.hosts.iter()
    }
}

/// Parses `Set-Cookie` header values into a jar.
///
/// Each element contributes at most one cookie: the text before the first `;`
/// split on its first `=`, both sides trimmed. Elements without a name are
/// skipped.
#[must_use]
pub fn parse_set_cookies<S: AsRef<str>>(headers: &[S]) -> CookieJar {
    let mut jar = CookieJar::new();
    for header in headers {
        let pair = header.as_ref().split(';').next().unwrap_or_default();
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        jar.insert(name.to_string(), value.trim().to_string());
    }
    jar
}

/// Renders a jar as `name1=value1; name2=value2`.
#[must_use]
pub fn build_cookie_header(jar: &CookieJar) -> String {
    jar.iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}
