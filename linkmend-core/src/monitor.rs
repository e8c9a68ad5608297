// Periodic reachability polling for a fixed set of endpoints

use crate::diagnose::{Diagnosis, diagnose};
use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use linkmend_scanner::{Verifier, run_bounded};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

// How often a cancel flag is checked while waiting between rounds.
const CANCEL_POLL: Duration = Duration::from_millis(250);

/// Options for configuring a monitor run
pub struct MonitorOptions {
    pub urls: Vec<String>,
    pub interval: Duration,
    /// Number of polling rounds; `None` runs until `cancel_flag` is set.
    pub rounds: Option<usize>,
    pub timeout: Duration,
    pub concurrency: usize,
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            interval: DEFAULT_INTERVAL,
            rounds: None,
            timeout: linkmend_scanner::crawler::DEFAULT_TIMEOUT,
            concurrency: linkmend_scanner::crawler::DEFAULT_CONCURRENCY,
            cancel_flag: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointStatus {
    pub url: String,
    pub status_code: Option<u16>,
    pub healthy: bool,
    pub elapsed_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<Diagnosis>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorRound {
    pub round: usize,
    pub checked_at: DateTime<Utc>,
    pub endpoints: Vec<EndpointStatus>,
}

impl MonitorRound {
    pub fn unhealthy(&self) -> impl Iterator<Item = &EndpointStatus> {
        self.endpoints.iter().filter(|e| !e.healthy)
    }
}

/// Callback for reporting each completed round
pub type RoundCallback = Arc<dyn Fn(&MonitorRound) + Send + Sync>;

/// Poll every URL once per interval and return all completed rounds.
pub async fn run_monitor(
    options: MonitorOptions,
    on_round: Option<RoundCallback>,
) -> Result<Vec<MonitorRound>> {
    if options.urls.is_empty() {
        return Err(CoreError::InvalidOption("no URLs to monitor".to_string()));
    }
    if options.rounds == Some(0) {
        return Err(CoreError::InvalidOption("rounds must be at least 1".to_string()));
    }

    let verifier = Verifier::new(options.timeout)?;
    let cancelled = || {
        options
            .cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    };

    info!(
        "Monitoring {} endpoints every {:?}",
        options.urls.len(),
        options.interval
    );

    let mut rounds = Vec::new();
    loop {
        if cancelled() {
            break;
        }

        let round = MonitorRound {
            round: rounds.len() + 1,
            checked_at: Utc::now(),
            endpoints: poll_once(&verifier, &options.urls, options.concurrency).await,
        };
        debug!(
            "Round {} complete, {} unhealthy",
            round.round,
            round.unhealthy().count()
        );

        if let Some(ref callback) = on_round {
            callback(&round);
        }
        rounds.push(round);

        if options.rounds.is_some_and(|max| rounds.len() >= max) || cancelled() {
            break;
        }
        pause(options.interval, options.cancel_flag.as_ref()).await;
    }

    Ok(rounds)
}

/// Sleep for `interval`, returning early once `cancel_flag` is set.
async fn pause(interval: Duration, cancel_flag: Option<&Arc<AtomicBool>>) {
    let Some(flag) = cancel_flag else {
        tokio::time::sleep(interval).await;
        return;
    };

    let deadline = tokio::time::Instant::now() + interval;
    while !flag.load(Ordering::Relaxed) {
        let now = tokio::time::Instant::now();
        if now >= deadline {
            break;
        }
        tokio::time::sleep((deadline - now).min(CANCEL_POLL)).await;
    }
}

/// Check every URL once, returning statuses in input order.
pub async fn poll_once(verifier: &Verifier, urls: &[String], concurrency: usize) -> Vec<EndpointStatus> {
    let mut statuses = run_bounded(urls.iter().cloned(), concurrency, |url| async move {
        let started = Instant::now();
        let result = verifier.check(&url).await;
        let elapsed_ms = started.elapsed().as_millis();

        let healthy = result
            .status_code
            .is_some_and(|code| (200..400).contains(&code));
        let diagnosis = result.error.as_deref().map(diagnose);

        EndpointStatus {
            url,
            status_code: result.status_code,
            healthy,
            elapsed_ms,
            final_url: result.final_url,
            error: result.error,
            diagnosis,
        }
    })
    .await;

    let position: HashMap<&str, usize> = urls
        .iter()
        .enumerate()
        .map(|(i, url)| (url.as_str(), i))
        .collect();
    statuses.sort_by_key(|status| position.get(status.url.as_str()).copied());
    statuses
}
