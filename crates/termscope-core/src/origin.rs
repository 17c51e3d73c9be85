//! Site boundaries and URL normalization.
//!
//! A crawl never leaves the site it started on. The boundary is the origin
//! (scheme + host + port) of the input URL, with two relaxations that real
//! sites need: a `www.` prefix is ignored and a plain-http site may link to
//! its https twin. Hosts that are known to serve a site's policies (for
//! example a separate `legal.` subdomain) can be allow-listed explicitly.

use thiserror::Error;
use url::Url;

/// Errors for URLs supplied by a caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("URL is empty")]
    Empty,

    #[error("Invalid URL '{input}': {reason}")]
    Invalid { input: String, reason: String },

    #[error("Unsupported scheme '{0}': only http and https sites can be checked")]
    UnsupportedScheme(String),

    #[error("URL has no host: {0}")]
    MissingHost(String),
}

/// Parse a caller-supplied URL, accepting bare hosts such as `example.com`.
pub fn parse_input_url(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate).map_err(|e| UrlError::Invalid {
        input: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    if !is_http(&url) {
        return Err(UrlError::UnsupportedScheme(url.scheme().to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost(trimmed.to_string()));
    }

    Ok(normalize_url(&url))
}

/// Normalize a URL for deduplication.
///
/// Scheme and host are already lower-cased and default ports stripped by
/// [`Url`]; this removes the fragment and any trailing slash on a non-root
/// path. Query strings are significant and kept.
pub fn normalize_url(url: &Url) -> Url {
    let mut normalized = url.clone();
    normalized.set_fragment(None);

    let path = normalized.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        normalized.set_path(if trimmed.is_empty() { "/" } else { &trimmed });
    }

    normalized
}

/// True for `http` and `https` URLs.
pub fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

fn bare_host(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// The set of URLs a crawl may visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteScope {
    origin: Url,
    scheme: String,
    host: String,
    port: Option<u16>,
    allowed_hosts: Vec<String>,
}

impl SiteScope {
    /// Scope rooted at the origin of `url`.
    pub fn new(url: &Url) -> Self {
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let mut origin = url.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);

        Self {
            origin,
            scheme: url.scheme().to_string(),
            host: bare_host(&host).to_string(),
            port: url.port(),
            allowed_hosts: Vec::new(),
        }
    }

    /// Additionally allow these hosts and their subdomains.
    pub fn with_allowed_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_hosts.extend(
            hosts
                .into_iter()
                .map(|h| h.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|h| !h.is_empty()),
        );
        self
    }

    /// The site origin with an empty path.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Whether `url` belongs to this site.
    pub fn contains(&self, url: &Url) -> bool {
        if !is_http(url) {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        if bare_host(&host) == self.host && url.port() == self.port {
            let upgrade = self.scheme == "http" && url.scheme() == "https";
            if url.scheme() == self.scheme || upgrade {
                return true;
            }
        }

        self.allowed_hosts
            .iter()
            .any(|allowed| host == *allowed || host.ends_with(&format!(".{}", allowed)))
    }
}
