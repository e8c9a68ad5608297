// Classification of verification failures into operator-facing categories

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Timeout,
    DnsFailure,
    ConnectionRefused,
    ConnectionReset,
    Tls,
    TooManyRedirects,
    Unknown,
}

impl ErrorCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::Timeout => "Timeout",
            ErrorCategory::DnsFailure => "DNS failure",
            ErrorCategory::ConnectionRefused => "Connection refused",
            ErrorCategory::ConnectionReset => "Connection reset",
            ErrorCategory::Tls => "TLS error",
            ErrorCategory::TooManyRedirects => "Too many redirects",
            ErrorCategory::Unknown => "Unknown error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnosis {
    pub category: ErrorCategory,
    pub hint: &'static str,
}

// Checked in order; the first matching pattern wins.
const PATTERNS: &[(&str, ErrorCategory, &str)] = &[
    (
        "too many redirects",
        ErrorCategory::TooManyRedirects,
        "The URL redirects in a loop or through an overly long chain.",
    ),
    (
        "timed out",
        ErrorCategory::Timeout,
        "The server did not answer in time. It may be overloaded or the timeout too short.",
    ),
    (
        "timeout",
        ErrorCategory::Timeout,
        "The server did not answer in time. It may be overloaded or the timeout too short.",
    ),
    (
        "dns error",
        ErrorCategory::DnsFailure,
        "The hostname could not be resolved. Check for typos or expired domains.",
    ),
    (
        "failed to lookup address",
        ErrorCategory::DnsFailure,
        "The hostname could not be resolved. Check for typos or expired domains.",
    ),
    (
        "name or service not known",
        ErrorCategory::DnsFailure,
        "The hostname could not be resolved. Check for typos or expired domains.",
    ),
    (
        "connection refused",
        ErrorCategory::ConnectionRefused,
        "Nothing is listening on the target port. The service may be down.",
    ),
    (
        "connection reset",
        ErrorCategory::ConnectionReset,
        "The server closed the connection abruptly.",
    ),
    (
        "broken pipe",
        ErrorCategory::ConnectionReset,
        "The server closed the connection abruptly.",
    ),
    (
        "certificate",
        ErrorCategory::Tls,
        "The TLS certificate is invalid, expired or does not match the host.",
    ),
    (
        "tls",
        ErrorCategory::Tls,
        "The TLS handshake failed.",
    ),
    (
        "ssl",
        ErrorCategory::Tls,
        "The TLS handshake failed.",
    ),
];

const UNKNOWN_HINT: &str = "Unrecognized failure; see the raw error message.";

/// Map a raw failure message onto a category by case-insensitive substring.
pub fn diagnose(message: &str) -> Diagnosis {
    let lowered = message.to_lowercase();
    PATTERNS
        .iter()
        .find(|(pattern, _, _)| lowered.contains(pattern))
        .map(|&(_, category, hint)| Diagnosis { category, hint })
        .unwrap_or(Diagnosis {
            category: ErrorCategory::Unknown,
            hint: UNKNOWN_HINT,
        })
}

/// Short label for an HTTP status code.
pub fn diagnose_status(status_code: u16) -> &'static str {
    match status_code {
        100..=199 => "Informational",
        200..=299 => "OK",
        300..=399 => "Redirect",
        401 | 403 => "Access denied",
        404 => "Not found",
        410 => "Gone",
        429 => "Rate limited",
        400..=499 => "Client error",
        500..=599 => "Server error",
        _ => "Unknown status",
    }
}
