use crate::similarity::{shares_segment, similarity};
use linkmend_scanner::{BrokenLink, LinkCheckResult, path_of};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Confidence assigned when the broken href is known to redirect somewhere.
pub const REDIRECT_TARGET_CONFIDENCE: f64 = 0.95;

pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixMethod {
    RedirectTarget,
    PathSimilarity,
    FuzzyMatch,
}

impl FixMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixMethod::RedirectTarget => "redirect-target",
            FixMethod::PathSimilarity => "path-similarity",
            FixMethod::FuzzyMatch => "fuzzy-match",
        }
    }
}

/// Proposed replacement for one broken href.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixSuggestion {
    pub original_href: String,
    pub suggested_href: String,
    pub confidence: f64,
    pub method: FixMethod,
    pub source_pages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectRule {
    pub from_path: String,
    pub to_path: String,
    pub status_code: u16,
}

/// Propose at most one replacement per distinct broken href.
///
/// A known redirect target always wins for its href. Otherwise the most
/// similar known-good URL is used, earliest in `known_good` on ties. The
/// result is sorted by confidence, highest first; equal confidences keep the
/// order in which hrefs first appear in `broken`.
pub fn compute_fixes(
    broken: &[BrokenLink],
    known_good: &[String],
    redirected: &[LinkCheckResult],
    min_confidence: f64,
) -> Vec<FixSuggestion> {
    let redirect_targets: HashMap<&str, &str> = redirected
        .iter()
        .filter_map(|result| {
            result
                .final_url
                .as_deref()
                .map(|target| (result.href.as_str(), target))
        })
        .collect();

    let mut fixes: Vec<FixSuggestion> = group_by_href(broken)
        .into_iter()
        .filter_map(|(href, source_pages)| {
            let (suggested, confidence, method) =
                suggest(href, known_good, &redirect_targets, min_confidence)?;
            Some(FixSuggestion {
                original_href: href.to_string(),
                suggested_href: suggested.to_string(),
                confidence,
                method,
                source_pages,
            })
        })
        .collect();

    fixes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    fixes
}

/// Path-only redirect rules for every fix at or above `min_confidence`.
pub fn fixes_to_redirects(fixes: &[FixSuggestion], min_confidence: f64) -> Vec<RedirectRule> {
    fixes
        .iter()
        .filter(|fix| fix.confidence >= min_confidence)
        .map(|fix| RedirectRule {
            from_path: path_of(&fix.original_href),
            to_path: path_of(&fix.suggested_href),
            status_code: 301,
        })
        .collect()
}

fn suggest<'a>(
    href: &str,
    known_good: &'a [String],
    redirect_targets: &HashMap<&str, &'a str>,
    min_confidence: f64,
) -> Option<(&'a str, f64, FixMethod)> {
    if let Some(&target) = redirect_targets.get(href)
        && REDIRECT_TARGET_CONFIDENCE >= min_confidence
    {
        return Some((target, REDIRECT_TARGET_CONFIDENCE, FixMethod::RedirectTarget));
    }

    let broken_path = path_of(href);
    let (candidate, score) = best_candidate(&broken_path, known_good)?;
    if score < min_confidence {
        return None;
    }

    let method = if shares_segment(&broken_path, &path_of(candidate)) {
        FixMethod::PathSimilarity
    } else {
        FixMethod::FuzzyMatch
    };
    Some((candidate, score, method))
}

/// Highest-scoring candidate; the first one wins a tie.
fn best_candidate<'a>(broken_path: &str, known_good: &'a [String]) -> Option<(&'a str, f64)> {
    known_good
        .iter()
        .map(|candidate| (candidate.as_str(), similarity(broken_path, &path_of(candidate))))
        .fold(None, |best, (candidate, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((candidate, score)),
        })
}

/// Distinct hrefs in first-appearance order, each with its merged source
/// pages in first-appearance order.
fn group_by_href(broken: &[BrokenLink]) -> Vec<(&str, Vec<String>)> {
    let mut groups: Vec<(&str, Vec<String>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for link in broken {
        let slot = *index.entry(link.href.as_str()).or_insert_with(|| {
            groups.push((link.href.as_str(), Vec::new()));
            groups.len() - 1
        });
        let pages = &mut groups[slot].1;
        for page in &link.source_pages {
            if !pages.contains(page) {
                pages.push(page.clone());
            }
        }
    }

    groups
}
