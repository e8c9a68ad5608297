use crate::error::{Result, ScanError};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Materializes a page and reports the links found on it.
///
/// Implementations return absolute hrefs in document order. Filtering to
/// the crawl's origin is left to the caller.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str, timeout: Duration) -> Result<Vec<String>>;
}

/// Static HTML renderer: fetches the page and reads `a[href]` elements.
/// Does not execute scripts.
#[derive(Clone)]
pub struct HtmlRenderer {
    client: Client,
}

impl HtmlRenderer {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("linkmend/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .pool_max_idle_per_host(50)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageRenderer for HtmlRenderer {
    async fn render(&self, url: &str, timeout: Duration) -> Result<Vec<String>> {
        debug!("Rendering {}", url);

        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!("{} answered {}, no links extracted", url, status.as_u16());
            return Ok(Vec::new());
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(false);
        if !is_html {
            return Ok(Vec::new());
        }

        let base = response.url().clone();
        let body = response.text().await?;
        extract_links(&body, &base)
    }
}

/// Resolve every `a[href]` in `html` against `base`, keeping http(s) only.
pub fn extract_links(html: &str, base: &Url) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").map_err(|e| ScanError::RenderError {
        url: base.to_string(),
        reason: e.to_string(),
    })?;

    Ok(document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_href(base, href))
        .collect())
}

fn resolve_href(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let resolved = base.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}
