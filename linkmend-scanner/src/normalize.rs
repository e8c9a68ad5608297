//! URL canonicalization used to deduplicate pages and links.

use url::{Origin, Url};

/// Canonicalize a URL for use as a page key.
///
/// The fragment is cleared and trailing slashes are trimmed from any path
/// other than the root. The query string is left untouched, so two URLs
/// differing only by query are distinct pages. Input that does not parse as
/// an absolute URL is returned unchanged.
pub fn normalize(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };

    parsed.set_fragment(None);

    if !parsed.cannot_be_a_base() {
        let path = parsed.path();
        if path.len() > 1 && path.ends_with('/') {
            // All of them: trimming one at a time would not be idempotent.
            let trimmed = path.trim_end_matches('/');
            let trimmed = if trimmed.is_empty() { "/" } else { trimmed }.to_string();
            parsed.set_path(&trimmed);
        }
    }

    parsed.to_string()
}

/// True when `url` shares scheme, host and port with `origin`.
///
/// Unparseable URLs are never same-origin.
pub fn is_same_origin(url: &str, origin: &Origin) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            let candidate = parsed.origin();
            candidate.is_tuple() && &candidate == origin
        }
        Err(_) => false,
    }
}

/// Path component of a URL, or the raw string when it cannot be parsed.
pub fn path_of(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_fragment() {
        assert_eq!(
            normalize("https://example.com/docs#install"),
            "https://example.com/docs"
        );
    }

    #[test]
    fn test_trims_trailing_slash() {
        assert_eq!(
            normalize("https://example.com/docs/"),
            "https://example.com/docs"
        );
    }

    #[test]
    fn test_trims_every_trailing_slash() {
        assert_eq!(
            normalize("https://example.com/docs///"),
            "https://example.com/docs"
        );
        assert_eq!(normalize("https://example.com//"), "https://example.com/");
    }

    #[test]
    fn test_keeps_root_slash() {
        assert_eq!(normalize("https://example.com/"), "https://example.com/");
        assert_eq!(normalize("https://example.com"), "https://example.com/");
    }

    #[test]
    fn test_preserves_query() {
        assert_eq!(
            normalize("https://example.com/search/?q=rust#top"),
            "https://example.com/search?q=rust"
        );
        assert_ne!(
            normalize("https://example.com/search?q=a"),
            normalize("https://example.com/search?q=b")
        );
    }

    #[test]
    fn test_malformed_returned_unchanged() {
        assert_eq!(normalize("not a url"), "not a url");
        assert_eq!(normalize("/relative/path/"), "/relative/path/");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "https://example.com/a/b/",
            "https://example.com/a//",
            "https://example.com//",
            "https://example.com/?x=1#y",
            "http://example.com:8080/path/?q=1",
            "garbage",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {}", input);
        }
    }

    #[test]
    fn test_same_origin() {
        let root = Url::parse("https://example.com/start").unwrap().origin();
        assert!(is_same_origin("https://example.com/other", &root));
        assert!(is_same_origin("https://example.com:443/other", &root));
        assert!(!is_same_origin("http://example.com/other", &root));
        assert!(!is_same_origin("https://example.com:8443/other", &root));
        assert!(!is_same_origin("https://sub.example.com/", &root));
        assert!(!is_same_origin("::not a url::", &root));
    }

    #[test]
    fn test_path_of() {
        assert_eq!(path_of("https://example.com/docs/guide?x=1"), "/docs/guide");
        assert_eq!(path_of("https://example.com"), "/");
        assert_eq!(path_of("not a url"), "not a url");
    }
}
