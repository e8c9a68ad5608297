use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use linkmend_core::crawl::{CrawlOptions, execute_crawl};
use linkmend_core::monitor::{MonitorOptions, MonitorRound, RoundCallback, run_monitor};
use linkmend_core::redirects::{RedirectFormat, render_redirects};
use linkmend_core::report::{ReportFormat, render_report};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Process exit code when the run found broken or unhealthy links.
pub const EXIT_FINDINGS: i32 = 1;

// Helper functions for URL loading

/// Load URLs from either a file or the `--url` arguments
pub fn load_urls_from_source(urls: &[&Url], hosts_file: Option<&PathBuf>) -> Result<Vec<String>> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if !urls.is_empty() {
        Ok(urls.iter().map(|url| url.as_str().to_string()).collect())
    } else {
        bail!("Either --url or --hosts-file must be provided")
    }
}

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>> {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let content = fs::read_to_string(&expanded)
        .with_context(|| format!("Failed to read URL file {}", path.display()))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        bail!("No valid URLs found in {}", path.display());
    }

    Ok(urls)
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    if Url::parse(line).is_ok() {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    warn!("Skipping invalid URL '{}'", line);
    None
}

/// Write `content` to `path` (with `~` expanded), or to stdout when no path
/// is given.
pub fn write_output(content: &str, path: Option<&PathBuf>) -> Result<Option<PathBuf>> {
    let Some(path) = path else {
        print!("{}", content);
        return Ok(None);
    };

    let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
    if let Some(parent) = expanded.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(&expanded, content)
        .with_context(|| format!("Failed to write {}", expanded.display()))?;
    Ok(Some(expanded))
}

/// Exit code used when a second Ctrl-C aborts the run.
pub const EXIT_INTERRUPTED: i32 = 130;

/// What a Ctrl-C should do given the shared cancel flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// First press: let the current work wind down.
    Cancel,
    /// Already cancelling: stop immediately.
    Abort,
}

/// Sets the flag and reports whether it was already set.
pub fn interrupt_action(flag: &AtomicBool) -> Interrupt {
    if flag.swap(true, Ordering::SeqCst) {
        Interrupt::Abort
    } else {
        Interrupt::Cancel
    }
}

/// Flag that flips to true on the first Ctrl-C; a second Ctrl-C exits.
fn install_cancel_handler() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = flag.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match interrupt_action(&handler_flag) {
                Interrupt::Cancel => {
                    warn!("Interrupted, finishing current work (press Ctrl-C again to abort)")
                }
                Interrupt::Abort => {
                    warn!("Interrupted twice, aborting");
                    std::process::exit(EXIT_INTERRUPTED);
                }
            }
        }
    });
    flag
}

/// True when `scan` prints a json or markdown report to stdout, which then
/// must carry nothing else.
pub fn scan_reserves_stdout(args: &ArgMatches) -> bool {
    let format = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    format != "text" && args.get_one::<PathBuf>("output").is_none()
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn seconds(args: &ArgMatches, name: &str) -> Duration {
    Duration::from_secs(args.get_one::<u64>(name).copied().unwrap_or(10))
}

pub async fn handle_scan(args: &ArgMatches, quiet: bool) -> Result<i32> {
    let url = args.get_one::<Url>("url").context("--url is required")?;
    let format: ReportFormat = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text")
        .parse()?;
    let redirect_format = args
        .get_one::<String>("redirects")
        .map(|name| name.parse::<RedirectFormat>())
        .transpose()?;

    let min_confidence = args.get_one::<f64>("min-confidence").copied().unwrap_or(0.5);
    if !(0.0..=1.0).contains(&min_confidence) {
        bail!("--min-confidence must be between 0.0 and 1.0, got {}", min_confidence);
    }

    let output = args.get_one::<PathBuf>("output");
    let chatty = !quiet && !scan_reserves_stdout(args);

    let known_good = match args.get_one::<PathBuf>("known-good-file") {
        Some(path) => load_urls_from_file(path)?,
        None => Vec::new(),
    };

    let options = CrawlOptions {
        url: url.as_str().to_string(),
        max_pages: args.get_one::<usize>("max-pages").copied().unwrap_or(100),
        concurrency: args.get_one::<usize>("concurrency").copied().unwrap_or(5),
        timeout: seconds(args, "timeout"),
        follow_redirects: !args.get_flag("no-follow-redirects"),
        exclude: args
            .get_many::<String>("exclude")
            .map(|patterns| patterns.cloned().collect())
            .unwrap_or_default(),
        known_good,
        min_confidence,
        show_progress_bars: chatty,
        cancel_flag: Some(install_cancel_handler()),
    };

    if chatty {
        print_divider();
        println!("{} {}", "→".blue(), url.as_str().bright_white());
        println!(
            "  Max pages: {}  Concurrency: {}  Timeout: {}s",
            options.max_pages.to_string().cyan(),
            options.concurrency.to_string().cyan(),
            options.timeout.as_secs().to_string().cyan()
        );
        if !options.exclude.is_empty() {
            println!("  Excluding: {}", options.exclude.join(", ").bright_black());
        }
        print_divider();
        println!();
    }

    let report = execute_crawl(options).await?;
    info!(
        "Scan of {} finished: {} pages, {} links",
        report.root, report.pages_crawled, report.links_checked
    );

    let rendered = render_report(&report, format)?;
    if let Some(path) = write_output(&rendered, output)? {
        println!(
            "{} Report saved to {}",
            "✓".green().bold(),
            path.display().to_string().bright_white()
        );
    }

    if let Some(redirect_format) = redirect_format {
        let rules = render_redirects(&report.redirect_rules, redirect_format)?;
        let target = args
            .get_one::<PathBuf>("redirects-output")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(redirect_format.default_file_name()));
        let written = write_output(&rules, Some(&target))?.unwrap_or(target);
        if chatty {
            println!(
                "{} {} redirect rules written to {}",
                "✓".green().bold(),
                report.redirect_rules.len(),
                written.display().to_string().bright_white()
            );
        }
    }

    if report.root_unreachable() {
        bail!("Could not render root page {}", report.root);
    }

    Ok(if report.has_broken_links() { EXIT_FINDINGS } else { 0 })
}

pub async fn handle_monitor(args: &ArgMatches, quiet: bool) -> Result<i32> {
    let url_args: Vec<&Url> = args
        .get_many::<Url>("url")
        .map(|urls| urls.collect())
        .unwrap_or_default();
    let urls = load_urls_from_source(&url_args, args.get_one::<PathBuf>("hosts-file"))?;

    let options = MonitorOptions {
        urls,
        interval: Duration::from_secs(args.get_one::<u64>("interval").copied().unwrap_or(60)),
        rounds: args.get_one::<usize>("rounds").copied(),
        timeout: seconds(args, "timeout"),
        concurrency: args.get_one::<usize>("concurrency").copied().unwrap_or(5),
        cancel_flag: Some(install_cancel_handler()),
    };

    if !quiet {
        println!(
            "{} Monitoring {} URL(s) every {}s",
            "→".blue(),
            options.urls.len().to_string().cyan(),
            options.interval.as_secs().to_string().cyan()
        );
        println!();
    }

    let on_round: RoundCallback = Arc::new(|round: &MonitorRound| {
        print!("{}", format_round(round));
    });
    let rounds = run_monitor(options, Some(on_round)).await?;

    let unhealthy = rounds
        .last()
        .is_some_and(|round| round.unhealthy().next().is_some());
    Ok(if unhealthy { EXIT_FINDINGS } else { 0 })
}

/// One line per endpoint, with a diagnosis hint under failed checks.
pub fn format_round(round: &MonitorRound) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}",
        format!("Round {}", round.round).bold(),
        round.checked_at.format("%Y-%m-%d %H:%M:%S UTC").to_string().bright_black()
    );

    for endpoint in &round.endpoints {
        let status = endpoint
            .status_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "---".to_string());
        let marker = if endpoint.healthy {
            "✓".green().bold()
        } else {
            "✗".red().bold()
        };
        let _ = writeln!(
            out,
            "  {} {} {} {}",
            marker,
            status,
            endpoint.url,
            format!("({}ms)", endpoint.elapsed_ms).bright_black()
        );
        if let Some(ref error) = endpoint.error {
            let _ = writeln!(out, "      {}", error.bright_black());
        }
        if let Some(ref diagnosis) = endpoint.diagnosis {
            let _ = writeln!(
                out,
                "      {}: {}",
                diagnosis.category.label().yellow(),
                diagnosis.hint
            );
        }
    }
    out.push('\n');
    out
}
