// Report generation from a completed scan

use crate::diagnose::{diagnose, diagnose_status};
use crate::error::{CoreError, Result};
use crate::fix::{FixSuggestion, RedirectRule};
use chrono::{DateTime, Utc};
use colored::Colorize;
use linkmend_scanner::{BrokenLink, LinkCheckResult};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Markdown,
}

impl FromStr for ReportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            other => Err(CoreError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub not_found: usize,
    pub redirected: usize,
    pub server_errors: usize,
    pub connection_errors: usize,
    pub fixes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub root: String,
    pub generated_at: DateTime<Utc>,
    pub pages_crawled: usize,
    pub links_checked: usize,
    pub summary: ScanSummary,
    pub not_found: Vec<BrokenLink>,
    pub redirected: Vec<LinkCheckResult>,
    pub server_errors: Vec<BrokenLink>,
    pub connection_errors: Vec<BrokenLink>,
    pub fixes: Vec<FixSuggestion>,
    pub redirect_rules: Vec<RedirectRule>,
    /// Pages the crawler visited but could not render.
    #[serde(default)]
    pub unreachable_pages: Vec<String>,
}

impl ScanReport {
    pub fn broken_count(&self) -> usize {
        self.not_found.len() + self.server_errors.len() + self.connection_errors.len()
    }

    pub fn has_broken_links(&self) -> bool {
        self.broken_count() > 0
    }

    pub fn root_unreachable(&self) -> bool {
        self.unreachable_pages.iter().any(|page| *page == self.root)
    }
}

pub fn render_report(report: &ScanReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::Text => Ok(generate_text_report(report)),
        ReportFormat::Markdown => Ok(generate_markdown_report(report)),
    }
}

fn divider() -> String {
    "━".repeat(60)
}

fn status_text(code: Option<u16>) -> String {
    code.map(|c| c.to_string()).unwrap_or_else(|| "---".to_string())
}

fn failure_reason(link: &BrokenLink) -> String {
    match (link.status_code, link.error.as_deref()) {
        (Some(code), _) => diagnose_status(code).to_string(),
        (None, Some(error)) => diagnose(error).category.label().to_string(),
        (None, None) => "Unknown".to_string(),
    }
}

pub fn generate_text_report(report: &ScanReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}\n", divider());
    let _ = writeln!(out, "{}", "# Summary:".bold());
    let _ = writeln!(out, "  Root: {}", report.root);
    let _ = writeln!(out, "  Pages crawled: {}", report.pages_crawled);
    let _ = writeln!(out, "  Links checked: {}", report.links_checked);
    let _ = writeln!(out, "  Not found: {}", report.summary.not_found);
    let _ = writeln!(out, "  Redirected: {}", report.summary.redirected);
    let _ = writeln!(out, "  Server errors: {}", report.summary.server_errors);
    let _ = writeln!(out, "  Connection errors: {}", report.summary.connection_errors);
    let _ = writeln!(out, "  Suggested fixes: {}", report.summary.fixes);
    let _ = writeln!(out, "\n{}\n", divider());

    let sections = [
        ("## Not found", &report.not_found),
        ("## Server errors", &report.server_errors),
        ("## Connection errors", &report.connection_errors),
    ];
    for (title, links) in sections {
        if links.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{}", title.bold());
        for link in links {
            let _ = writeln!(
                out,
                "  {} {} {}",
                status_text(link.status_code).red(),
                link.href,
                format!("({})", failure_reason(link)).bright_black()
            );
            if let Some(ref error) = link.error {
                let _ = writeln!(out, "      {}", error.bright_black());
            }
            for page in &link.source_pages {
                let _ = writeln!(out, "      {} {}", "linked from".bright_black(), page);
            }
        }
        out.push('\n');
    }

    if !report.redirected.is_empty() {
        let _ = writeln!(out, "{}", "## Redirected".bold());
        for result in &report.redirected {
            let _ = writeln!(
                out,
                "  {} {} -> {} ({} hops)",
                status_text(result.status_code).cyan(),
                result.href,
                result.final_url.as_deref().unwrap_or("?"),
                result.redirect_chain.len()
            );
        }
        out.push('\n');
    }

    if !report.fixes.is_empty() {
        let _ = writeln!(out, "{}", "## Suggested fixes".bold());
        for fix in &report.fixes {
            let _ = writeln!(
                out,
                "  {} {} -> {} {}",
                format!("{:.0}%", fix.confidence * 100.0).green(),
                fix.original_href,
                fix.suggested_href,
                format!("[{}]", fix.method.as_str()).bright_black()
            );
        }
        out.push('\n');
    }

    if !report.unreachable_pages.is_empty() {
        let _ = writeln!(out, "{}", "## Could not render".bold());
        for page in &report.unreachable_pages {
            let _ = writeln!(out, "  {} {}", "✗".red(), page);
        }
        out.push('\n');
    }

    if report.root_unreachable() {
        let _ = writeln!(
            out,
            "{} Root page {} could not be rendered, nothing was checked",
            "✗".red().bold(),
            report.root
        );
    } else if !report.has_broken_links() {
        let _ = writeln!(out, "{} No broken links found", "✓".green().bold());
    }

    out
}

pub fn generate_markdown_report(report: &ScanReport) -> String {
    let mut md = String::new();

    let _ = writeln!(md, "# Link report for {}\n", report.root);
    let _ = writeln!(md, "Generated {}\n", report.generated_at.to_rfc3339());
    let _ = writeln!(md, "| Metric | Count |");
    let _ = writeln!(md, "|---|---|");
    let _ = writeln!(md, "| Pages crawled | {} |", report.pages_crawled);
    let _ = writeln!(md, "| Links checked | {} |", report.links_checked);
    let _ = writeln!(md, "| Not found | {} |", report.summary.not_found);
    let _ = writeln!(md, "| Redirected | {} |", report.summary.redirected);
    let _ = writeln!(md, "| Server errors | {} |", report.summary.server_errors);
    let _ = writeln!(md, "| Connection errors | {} |", report.summary.connection_errors);
    let _ = writeln!(md, "| Suggested fixes | {} |\n", report.summary.fixes);

    let broken: Vec<&BrokenLink> = report
        .not_found
        .iter()
        .chain(&report.server_errors)
        .chain(&report.connection_errors)
        .collect();
    if !broken.is_empty() {
        let _ = writeln!(md, "## Broken links\n");
        let _ = writeln!(md, "| Status | Link | Reason | Linked from |");
        let _ = writeln!(md, "|---|---|---|---|");
        for link in broken {
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} |",
                status_text(link.status_code),
                link.href,
                failure_reason(link),
                link.source_pages.join("<br>")
            );
        }
        md.push('\n');
    }

    if !report.fixes.is_empty() {
        let _ = writeln!(md, "## Suggested fixes\n");
        let _ = writeln!(md, "| Broken link | Suggestion | Confidence | Method |");
        let _ = writeln!(md, "|---|---|---|---|");
        for fix in &report.fixes {
            let _ = writeln!(
                md,
                "| {} | {} | {:.2} | {} |",
                fix.original_href,
                fix.suggested_href,
                fix.confidence,
                fix.method.as_str()
            );
        }
        md.push('\n');
    }

    if !report.unreachable_pages.is_empty() {
        let _ = writeln!(md, "## Could not render\n");
        for page in &report.unreachable_pages {
            let _ = writeln!(md, "- {}", page);
        }
        md.push('\n');
    }

    md
}
