use serde::{Deserialize, Serialize};

/// A discovered internal link and every crawled page that referenced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEdge {
    pub href: String,
    pub source_pages: Vec<String>,
}

impl LinkEdge {
    pub fn new(href: String) -> Self {
        Self {
            href,
            source_pages: Vec::new(),
        }
    }

    /// Record `page` as a referrer, ignoring repeats.
    pub fn add_source(&mut self, page: &str) {
        if !self.source_pages.iter().any(|p| p == page) {
            self.source_pages.push(page.to_string());
        }
    }
}

/// Outcome of verifying a single href.
///
/// `status_code == None` together with `error == Some(..)` is a
/// connection-level failure, as opposed to an HTTP error status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCheckResult {
    pub href: String,
    pub status_code: Option<u16>,
    pub is_redirect: bool,
    pub final_url: Option<String>,
    pub redirect_chain: Vec<String>,
    pub error: Option<String>,
}

impl LinkCheckResult {
    /// A terminal HTTP response. `redirect_chain` holds every URL that
    /// answered with a followed 3xx; when non-empty, `final_url` is the URL
    /// that produced `status_code`.
    pub fn completed(
        href: String,
        status_code: u16,
        redirect_chain: Vec<String>,
        final_url: String,
    ) -> Self {
        let is_redirect = !redirect_chain.is_empty();
        Self {
            href,
            status_code: Some(status_code),
            is_redirect,
            final_url: is_redirect.then_some(final_url),
            redirect_chain,
            error: None,
        }
    }

    pub fn with_error(href: String, error: String) -> Self {
        Self {
            href,
            status_code: None,
            is_redirect: false,
            final_url: None,
            redirect_chain: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code.is_some_and(|code| code >= 500)
    }

    pub fn is_connection_error(&self) -> bool {
        self.status_code.is_none() && self.error.is_some()
    }

    pub fn is_redirected(&self) -> bool {
        !self.redirect_chain.is_empty()
    }

    /// Unreachable for the purpose of proposing a replacement.
    pub fn is_broken(&self) -> bool {
        self.is_not_found() || self.is_server_error() || self.is_connection_error()
    }

    pub fn is_ok(&self) -> bool {
        self.status_code.is_some_and(|code| (200..300).contains(&code))
    }
}

/// An unreachable href together with the pages that link to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenLink {
    pub href: String,
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub source_pages: Vec<String>,
}

impl BrokenLink {
    pub fn new(result: &LinkCheckResult, source_pages: Vec<String>) -> Self {
        Self {
            href: result.href.clone(),
            status_code: result.status_code,
            error: result.error.clone(),
            source_pages,
        }
    }
}

/// Verified links partitioned into the buckets reported to users.
///
/// A redirected link can also appear in one of the failure buckets; the
/// three failure buckets are mutually exclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkClassification {
    pub not_found: Vec<LinkCheckResult>,
    pub redirected: Vec<LinkCheckResult>,
    pub server_errors: Vec<LinkCheckResult>,
    pub connection_errors: Vec<LinkCheckResult>,
}

impl LinkClassification {
    pub fn from_results(results: &[LinkCheckResult]) -> Self {
        let mut classification = Self::default();
        for result in results {
            if result.is_not_found() {
                classification.not_found.push(result.clone());
            } else if result.is_server_error() {
                classification.server_errors.push(result.clone());
            } else if result.is_connection_error() {
                classification.connection_errors.push(result.clone());
            }
            if result.is_redirected() {
                classification.redirected.push(result.clone());
            }
        }
        classification
    }

    pub fn broken_count(&self) -> usize {
        self.not_found.len() + self.server_errors.len() + self.connection_errors.len()
    }
}
