use crate::error::Result;
use crate::result::LinkCheckResult;
use reqwest::Client;
use reqwest::header::LOCATION;
use std::error::Error as StdError;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Maximum number of redirect hops followed for a single check.
pub const MAX_REDIRECTS: usize = 10;

pub const TOO_MANY_REDIRECTS: &str = "Too many redirects";

/// Checks one URL at a time, following redirects by hand so the full chain
/// is observable.
#[derive(Clone)]
pub struct Verifier {
    client: Client,
    timeout: Duration,
    follow_redirects: bool,
}

impl Verifier {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("linkmend/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(50)
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            timeout,
            follow_redirects: true,
        })
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Issue one logical check for `url`.
    ///
    /// Every hop gets its own timeout. Network failures and redirect loops
    /// are reported in the returned result, never as an error.
    pub async fn check(&self, url: &str) -> LinkCheckResult {
        let mut current = url.to_string();
        let mut chain = Vec::new();

        loop {
            let response = match self.client.get(&current).timeout(self.timeout).send().await {
                Ok(response) => response,
                Err(e) => {
                    debug!("Check failed for {} at {}: {}", url, current, e);
                    return LinkCheckResult::with_error(
                        url.to_string(),
                        describe_error(&e, self.timeout),
                    );
                }
            };

            let status = response.status();
            let next = if self.follow_redirects && status.is_redirection() {
                response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|location| resolve_location(&current, location))
            } else {
                None
            };

            match next {
                Some(next) => {
                    if chain.len() >= MAX_REDIRECTS {
                        debug!("Giving up on {} after {} redirects", url, chain.len());
                        return LinkCheckResult::with_error(
                            url.to_string(),
                            TOO_MANY_REDIRECTS.to_string(),
                        );
                    }
                    debug!("{} {} -> {}", status.as_u16(), current, next);
                    chain.push(std::mem::replace(&mut current, next));
                }
                None => {
                    return LinkCheckResult::completed(
                        url.to_string(),
                        status.as_u16(),
                        chain,
                        current,
                    );
                }
            }
        }
    }
}

/// Resolve a `Location` header against the URL that returned it.
fn resolve_location(current: &str, location: &str) -> Option<String> {
    let base = Url::parse(current).ok()?;
    base.join(location).ok().map(|u| u.to_string())
}

/// Flatten a reqwest error and its sources into one message.
fn describe_error(error: &reqwest::Error, timeout: Duration) -> String {
    if error.is_timeout() {
        return format!("Request timeout after {}ms", timeout.as_millis());
    }

    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn verifier() -> Verifier {
        Verifier::new(Duration::from_secs(5)).unwrap()
    }

    async fn mount_redirect(server: &MockServer, from: &str, to: &str) {
        Mock::given(method("GET"))
            .and(path(from))
            .respond_with(ResponseTemplate::new(301).insert_header("location", to))
            .mount(server)
            .await;
    }

    async fn mount_status(server: &MockServer, at: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(status))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_plain_success() {
        let server = MockServer::start().await;
        mount_status(&server, "/ok", 200).await;

        let url = format!("{}/ok", server.uri());
        let result = verifier().check(&url).await;

        assert_eq!(result.href, url);
        assert_eq!(result.status_code, Some(200));
        assert!(!result.is_redirect);
        assert_eq!(result.final_url, None);
        assert!(result.redirect_chain.is_empty());
        assert_eq!(result.error, None);
    }

    #[tokio::test]
    async fn test_not_found() {
        let server = MockServer::start().await;
        mount_status(&server, "/missing", 404).await;

        let result = verifier().check(&format!("{}/missing", server.uri())).await;
        assert_eq!(result.status_code, Some(404));
        assert!(result.is_not_found());
    }

    #[tokio::test]
    async fn test_follows_relative_redirects() {
        let server = MockServer::start().await;
        mount_redirect(&server, "/old", "/middle").await;
        mount_redirect(&server, "/middle", "new").await;
        mount_status(&server, "/new", 200).await;

        let start = format!("{}/old", server.uri());
        let result = verifier().check(&start).await;

        assert_eq!(result.status_code, Some(200));
        assert!(result.is_redirect);
        assert_eq!(
            result.redirect_chain,
            vec![start.clone(), format!("{}/middle", server.uri())]
        );
        assert_eq!(result.final_url, Some(format!("{}/new", server.uri())));
    }

    #[tokio::test]
    async fn test_redirect_not_followed_when_disabled() {
        let server = MockServer::start().await;
        mount_redirect(&server, "/old", "/new").await;

        let result = verifier()
            .with_follow_redirects(false)
            .check(&format!("{}/old", server.uri()))
            .await;

        assert_eq!(result.status_code, Some(301));
        assert!(!result.is_redirect);
        assert_eq!(result.final_url, None);
    }

    #[tokio::test]
    async fn test_redirect_without_location_is_terminal() {
        let server = MockServer::start().await;
        mount_status(&server, "/odd", 302).await;

        let result = verifier().check(&format!("{}/odd", server.uri())).await;
        assert_eq!(result.status_code, Some(302));
        assert!(result.redirect_chain.is_empty());
    }

    #[tokio::test]
    async fn test_ten_redirects_allowed() {
        let server = MockServer::start().await;
        for hop in 0..10 {
            mount_redirect(&server, &format!("/hop{}", hop), &format!("/hop{}", hop + 1)).await;
        }
        mount_status(&server, "/hop10", 200).await;

        let result = verifier().check(&format!("{}/hop0", server.uri())).await;
        assert_eq!(result.status_code, Some(200));
        assert_eq!(result.redirect_chain.len(), 10);
    }

    #[tokio::test]
    async fn test_eleven_redirects_is_too_many() {
        let server = MockServer::start().await;
        for hop in 0..11 {
            mount_redirect(&server, &format!("/hop{}", hop), &format!("/hop{}", hop + 1)).await;
        }
        mount_status(&server, "/hop11", 200).await;

        let result = verifier().check(&format!("{}/hop0", server.uri())).await;
        assert_eq!(result.status_code, None);
        assert_eq!(result.error.as_deref(), Some(TOO_MANY_REDIRECTS));
        assert_eq!(result.final_url, None);
    }

    #[tokio::test]
    async fn test_redirect_loop_is_too_many() {
        let server = MockServer::start().await;
        mount_redirect(&server, "/a", "/b").await;
        mount_redirect(&server, "/b", "/a").await;

        let result = verifier().check(&format!("{}/a", server.uri())).await;
        assert_eq!(result.error.as_deref(), Some(TOO_MANY_REDIRECTS));
    }

    #[tokio::test]
    async fn test_timeout_is_reported_as_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let result = Verifier::new(Duration::from_millis(100))
            .unwrap()
            .check(&format!("{}/slow", server.uri()))
            .await;

        assert_eq!(result.status_code, None);
        assert!(result.error.unwrap().contains("timeout"));
    }

    #[tokio::test]
    async fn test_timeout_applies_per_hop() {
        let server = MockServer::start().await;
        let hop = Duration::from_millis(600);
        for (from, to) in [("/hop1", "/hop2"), ("/hop2", "/final")] {
            Mock::given(method("GET"))
                .and(path(from))
                .respond_with(
                    ResponseTemplate::new(301)
                        .insert_header("location", to)
                        .set_delay(hop),
                )
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/final"))
            .respond_with(ResponseTemplate::new(200).set_delay(hop))
            .mount(&server)
            .await;

        let result = Verifier::new(Duration::from_millis(1000))
            .unwrap()
            .check(&format!("{}/hop1", server.uri()))
            .await;

        assert_eq!(result.status_code, Some(200));
        assert_eq!(result.error, None);
        assert_eq!(result.redirect_chain.len(), 2);
        assert_eq!(result.final_url, Some(format!("{}/final", server.uri())));
    }

    #[tokio::test]
    async fn test_connection_failure_is_reported_as_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/gone", listener.local_addr().unwrap());
        drop(listener);

        let result = verifier().check(&url).await;
        assert!(result.is_connection_error());
        assert_eq!(result.final_url, None);
    }

    #[test]
    fn test_resolve_location() {
        assert_eq!(
            resolve_location("https://example.com/a/b", "c").as_deref(),
            Some("https://example.com/a/c")
        );
        assert_eq!(
            resolve_location("https://example.com/a/b", "/root").as_deref(),
            Some("https://example.com/root")
        );
        assert_eq!(
            resolve_location("https://example.com/a", "https://other.org/x").as_deref(),
            Some("https://other.org/x")
        );
    }
}
