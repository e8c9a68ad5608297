use crate::error::Result;
use crate::fix::{DEFAULT_MIN_CONFIDENCE, compute_fixes, fixes_to_redirects};
use crate::report::{ScanReport, ScanSummary};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use linkmend_scanner::crawler::{DEFAULT_CONCURRENCY, DEFAULT_MAX_PAGES, DEFAULT_TIMEOUT};
use linkmend_scanner::{
    BrokenLink, CrawlReport, Crawler, HtmlRenderer, LinkCheckResult, PageRenderer,
    ProgressCallback, ResultCallback,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing::{info, warn};

/// Options for configuring a scan
pub struct CrawlOptions {
    pub url: String,
    pub max_pages: usize,
    pub concurrency: usize,
    pub timeout: Duration,
    pub follow_redirects: bool,
    pub exclude: Vec<String>,
    /// Extra URLs to treat as valid replacement targets.
    pub known_good: Vec<String>,
    pub min_confidence: f64,
    pub show_progress_bars: bool,
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_pages: DEFAULT_MAX_PAGES,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            follow_redirects: true,
            exclude: Vec::new(),
            known_good: Vec::new(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            show_progress_bars: false,
            cancel_flag: None,
        }
    }
}

/// Crawl, verify and compute fixes using the static HTML renderer.
pub async fn execute_crawl(options: CrawlOptions) -> Result<ScanReport> {
    let renderer = Arc::new(HtmlRenderer::new()?);
    execute_crawl_with(options, renderer).await
}

/// Crawl, verify and compute fixes with a caller-supplied renderer.
pub async fn execute_crawl_with(
    options: CrawlOptions,
    renderer: Arc<dyn PageRenderer>,
) -> Result<ScanReport> {
    let progress_bar = if options.show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting crawl...");
        Some(pb)
    } else {
        None
    };

    let mut crawler = Crawler::new(renderer)?
        .with_max_pages(options.max_pages)
        .with_concurrency(options.concurrency)
        .with_timeout(options.timeout)
        .with_follow_redirects(options.follow_redirects)
        .with_exclude_patterns(options.exclude.as_slice())?;

    if let Some(ref flag) = options.cancel_flag {
        crawler = crawler.with_cancel_flag(flag.clone());
    }

    if let Some(ref pb) = progress_bar {
        let crawl_pb = pb.clone();
        let progress: ProgressCallback = Arc::new(move |count: usize, url: String| {
            crawl_pb.set_message(format!("Crawling [{}] {}", count, url));
        });
        let verify_pb = pb.clone();
        let on_result: ResultCallback = Arc::new(move |result: &LinkCheckResult| {
            verify_pb.set_message(format!("Verified {}", result.href));
        });
        crawler = crawler
            .with_progress_callback(progress)
            .with_result_callback(on_result);
    }

    let crawl = crawler.crawl(&options.url).await?;

    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Crawl complete! {} pages, {} links",
            crawl.pages_visited.len(),
            crawl.results.len()
        ));
    }

    Ok(build_report(&crawl, &options.known_good, options.min_confidence))
}

/// Derive the report, fixes and redirect rules from a finished crawl.
pub fn build_report(crawl: &CrawlReport, extra_known_good: &[String], min_confidence: f64) -> ScanReport {
    if crawl.root_failed() {
        warn!("Root page {} could not be rendered; no links were discovered", crawl.root);
    }
    let broken = crawl.broken_links();
    let redirected = crawl.redirected();
    let known_good = known_good_urls(crawl, &broken, extra_known_good);

    let fixes = compute_fixes(&broken, &known_good, &redirected, min_confidence);
    let redirect_rules = fixes_to_redirects(&fixes, min_confidence);
    info!(
        "{} broken links, {} fixes from {} candidates",
        broken.len(),
        fixes.len(),
        known_good.len()
    );

    let (mut not_found, mut server_errors, mut connection_errors) = (Vec::new(), Vec::new(), Vec::new());
    for link in broken {
        match link.status_code {
            Some(404) => not_found.push(link),
            Some(_) => server_errors.push(link),
            None => connection_errors.push(link),
        }
    }

    ScanReport {
        root: crawl.root.clone(),
        generated_at: Utc::now(),
        pages_crawled: crawl.pages_visited.len(),
        links_checked: crawl.results.len(),
        summary: ScanSummary {
            not_found: not_found.len(),
            redirected: redirected.len(),
            server_errors: server_errors.len(),
            connection_errors: connection_errors.len(),
            fixes: fixes.len(),
        },
        not_found,
        redirected,
        server_errors,
        connection_errors,
        fixes,
        redirect_rules,
        unreachable_pages: crawl.failed_pages.clone(),
    }
}

/// Candidate pool for fixes: visited pages, hrefs that answered 2xx, then
/// caller extras, deduplicated in that order and never including a broken
/// href.
pub fn known_good_urls(crawl: &CrawlReport, broken: &[BrokenLink], extra: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = broken.iter().map(|link| link.href.as_str()).collect();
    let ok_hrefs = crawl
        .results
        .iter()
        .filter(|result| result.is_ok())
        .map(|result| &result.href);

    crawl
        .pages_visited
        .iter()
        .chain(ok_hrefs)
        .chain(extra)
        .filter(|url| seen.insert(url.as_str()))
        .cloned()
        .collect()
}
