use crate::error::{Result, ScanError};
use crate::executor::run_bounded;
use crate::normalize::{is_same_origin, normalize};
use crate::render::PageRenderer;
use crate::result::{BrokenLink, LinkCheckResult, LinkClassification, LinkEdge};
use crate::verifier::Verifier;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_MAX_PAGES: usize = 100;
pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Called with the running count and the URL of each visited page.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Called with each verification result as it completes.
pub type ResultCallback = Arc<dyn Fn(&LinkCheckResult) + Send + Sync>;

/// Every internal href seen during a crawl, keyed by normalized URL and kept
/// in discovery order.
#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    edges: Vec<LinkEdge>,
    index: HashMap<String, usize>,
}

impl LinkGraph {
    pub fn record(&mut self, href: &str, source: &str) {
        let slot = match self.index.get(href) {
            Some(&slot) => slot,
            None => {
                self.edges.push(LinkEdge::new(href.to_string()));
                self.index.insert(href.to_string(), self.edges.len() - 1);
                self.edges.len() - 1
            }
        };
        self.edges[slot].add_source(source);
    }

    pub fn get(&self, href: &str) -> Option<&LinkEdge> {
        self.index.get(href).map(|&slot| &self.edges[slot])
    }

    pub fn edges(&self) -> &[LinkEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// State owned by a single crawl invocation.
///
/// `enqueued` mirrors every URL ever pushed onto `frontier`, so membership
/// checks are O(1) while the queue keeps first-discovery order. A URL that
/// was excluded after being popped stays in `enqueued` and is never queued
/// again.
struct CrawlSession {
    visited: HashSet<String>,
    visit_order: Vec<String>,
    failed: Vec<String>,
    frontier: VecDeque<String>,
    enqueued: HashSet<String>,
    graph: LinkGraph,
}

impl CrawlSession {
    fn new(root: String) -> Self {
        let mut enqueued = HashSet::new();
        enqueued.insert(root.clone());
        Self {
            visited: HashSet::new(),
            visit_order: Vec::new(),
            failed: Vec::new(),
            frontier: VecDeque::from([root]),
            enqueued,
            graph: LinkGraph::default(),
        }
    }

    fn mark_visited(&mut self, url: &str) {
        self.visited.insert(url.to_string());
        self.visit_order.push(url.to_string());
    }

    fn enqueue(&mut self, url: &str) {
        if !self.visited.contains(url) && self.enqueued.insert(url.to_string()) {
            self.frontier.push_back(url.to_string());
        }
    }
}

/// Output of the discovery phase.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub root: String,
    pub pages_visited: Vec<String>,
    /// Visited pages whose render failed; they contribute no links.
    pub failed_pages: Vec<String>,
    pub graph: LinkGraph,
}

/// Output of a full crawl: discovery plus one verification result per
/// distinct href, ordered like the edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    pub root: String,
    pub pages_visited: Vec<String>,
    #[serde(default)]
    pub failed_pages: Vec<String>,
    pub edges: Vec<LinkEdge>,
    pub results: Vec<LinkCheckResult>,
}

impl CrawlReport {
    /// The root itself could not be rendered, so nothing behind it was seen.
    pub fn root_failed(&self) -> bool {
        self.failed_pages.iter().any(|page| *page == self.root)
    }

    pub fn classification(&self) -> LinkClassification {
        LinkClassification::from_results(&self.results)
    }

    /// Unreachable hrefs with their referrers, in discovery order.
    pub fn broken_links(&self) -> Vec<BrokenLink> {
        let sources: HashMap<&str, &Vec<String>> = self
            .edges
            .iter()
            .map(|edge| (edge.href.as_str(), &edge.source_pages))
            .collect();

        self.results
            .iter()
            .filter(|result| result.is_broken())
            .map(|result| {
                let pages = sources
                    .get(result.href.as_str())
                    .map(|pages| pages.to_vec())
                    .unwrap_or_default();
                BrokenLink::new(result, pages)
            })
            .collect()
    }

    pub fn redirected(&self) -> Vec<LinkCheckResult> {
        self.results
            .iter()
            .filter(|result| result.is_redirected())
            .cloned()
            .collect()
    }
}

/// Breadth-first crawler over a single origin.
///
/// Page discovery is sequential; verification of the discovered hrefs runs
/// afterwards with bounded concurrency. The crawler only holds
/// configuration, so one instance can run several crawls at once.
pub struct Crawler {
    renderer: Arc<dyn PageRenderer>,
    verifier: Verifier,
    max_pages: usize,
    concurrency: usize,
    timeout: Duration,
    exclude: Vec<Regex>,
    progress_callback: Option<ProgressCallback>,
    result_callback: Option<ResultCallback>,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl Crawler {
    pub fn new(renderer: Arc<dyn PageRenderer>) -> Result<Self> {
        Ok(Self {
            renderer,
            verifier: Verifier::new(DEFAULT_TIMEOUT)?,
            max_pages: DEFAULT_MAX_PAGES,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            exclude: Vec::new(),
            progress_callback: None,
            result_callback: None,
            cancel_flag: None,
        })
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.verifier = self.verifier.with_timeout(timeout);
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.verifier = self.verifier.with_follow_redirects(follow);
        self
    }

    /// Regular expressions matched against normalized URLs; matching pages
    /// are never visited.
    pub fn with_exclude_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        self.exclude = patterns
            .iter()
            .map(|pattern| Regex::new(pattern.as_ref()))
            .collect::<std::result::Result<_, _>>()?;
        Ok(self)
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_result_callback(mut self, callback: ResultCallback) -> Self {
        self.result_callback = Some(callback);
        self
    }

    /// Discovery stops before the next page once the flag is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    pub async fn crawl(&self, root: &str) -> Result<CrawlReport> {
        let discovery = self.discover(root).await?;
        let mut results = self.verify(discovery.graph.edges()).await;

        let position: HashMap<&str, usize> = discovery
            .graph
            .edges()
            .iter()
            .enumerate()
            .map(|(i, edge)| (edge.href.as_str(), i))
            .collect();
        results.sort_by_key(|result| position.get(result.href.as_str()).copied());

        Ok(CrawlReport {
            root: discovery.root,
            pages_visited: discovery.pages_visited,
            failed_pages: discovery.failed_pages,
            edges: discovery.graph.edges().to_vec(),
            results,
        })
    }

    /// Walk the site from `root`, recording every same-origin href.
    pub async fn discover(&self, root: &str) -> Result<Discovery> {
        let root_url = Url::parse(root)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", root, e)))?;
        if !matches!(root_url.scheme(), "http" | "https") {
            return Err(ScanError::InvalidUrl(format!(
                "{}: only http and https are supported",
                root
            )));
        }

        let origin = root_url.origin();
        let root = normalize(root_url.as_str());
        info!("Starting crawl of {} (max {} pages)", root, self.max_pages);

        let mut session = CrawlSession::new(root.clone());

        while session.visited.len() < self.max_pages {
            if self.is_cancelled() {
                info!("Crawl cancelled after {} pages", session.visited.len());
                break;
            }

            let Some(url) = session.frontier.pop_front() else {
                break;
            };
            if session.visited.contains(&url) {
                continue;
            }
            if self.is_excluded(&url) {
                debug!("Excluded {}", url);
                continue;
            }

            session.mark_visited(&url);
            if let Some(ref callback) = self.progress_callback {
                callback(session.visited.len(), url.clone());
            }

            let hrefs = match self.renderer.render(&url, self.timeout).await {
                Ok(hrefs) => hrefs,
                Err(e) => {
                    warn!("Skipping {}: {}", url, e);
                    session.failed.push(url);
                    continue;
                }
            };

            for href in hrefs {
                let href = normalize(&href);
                if !is_same_origin(&href, &origin) {
                    continue;
                }
                session.graph.record(&href, &url);
                session.enqueue(&href);
            }
        }

        info!(
            "Discovery complete: {} pages visited, {} distinct links",
            session.visit_order.len(),
            session.graph.len()
        );

        Ok(Discovery {
            root,
            pages_visited: session.visit_order,
            failed_pages: session.failed,
            graph: session.graph,
        })
    }

    /// Check every edge's href once, `concurrency` at a time. Results are in
    /// completion order.
    pub async fn verify(&self, edges: &[LinkEdge]) -> Vec<LinkCheckResult> {
        info!(
            "Verifying {} links with {} workers",
            edges.len(),
            self.concurrency
        );

        let hrefs = edges.iter().map(|edge| edge.href.clone());
        run_bounded(hrefs, self.concurrency, |href| async move {
            let result = self.verifier.check(&href).await;
            if let Some(ref callback) = self.result_callback {
                callback(&result);
            }
            result
        })
        .await
    }

    fn is_excluded(&self, url: &str) -> bool {
        self.exclude.iter().any(|pattern| pattern.is_match(url))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
