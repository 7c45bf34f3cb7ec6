//! Input validation for user-submitted URLs.
//!
//! Pure functions, no network access. Any parse failure maps to a negative
//! result rather than an error.

use url::Url;

/// Returns `true` when `candidate` is a well-formed absolute `http` or
/// `https` URL with a host. Empty, whitespace-only, scheme-less, and
/// otherwise malformed strings all return `false`.
pub fn is_valid_url(candidate: &str) -> bool {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return false;
    }
    match Url::parse(trimmed) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}

/// Extracts the YouTube video identifier from a watch URL.
///
/// Looks for the `v` query parameter (`youtube.com/watch?v=abc123`) and
/// falls back to the path segment for `youtu.be/abc123` short links.
/// Returns `None` when no identifier is present.
pub fn extract_video_id(candidate: &str) -> Option<String> {
    let parsed = Url::parse(candidate.trim()).ok()?;

    if let Some((_, value)) = parsed.query_pairs().find(|(key, _)| key == "v") {
        if !value.is_empty() {
            return Some(value.into_owned());
        }
    }

    let host = parsed.host_str()?;
    if host.eq_ignore_ascii_case("youtu.be") {
        let id = parsed.path().trim_matches('/');
        if !id.is_empty() {
            return Some(id.split('/').next().unwrap_or(id).to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(is_valid_url("https://youtube.com/watch?v=abc123"));
        assert!(is_valid_url("http://example.com/page"));
        assert!(is_valid_url("  https://example.com  "));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("   "));
        assert!(!is_valid_url("not a url"));
        assert!(!is_valid_url("example.com/no-scheme"));
        assert!(!is_valid_url("ftp://example.com/file"));
        assert!(!is_valid_url("https://"));
        assert!(!is_valid_url("\u{0}\u{1}garbage\u{2}"));
    }

    #[test]
    fn extracts_watch_parameter() {
        assert_eq!(
            extract_video_id("https://youtube.com/watch?v=abc123").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?list=PL1&v=xyz").as_deref(),
            Some("xyz")
        );
    }

    #[test]
    fn extracts_short_link_path() {
        assert_eq!(
            extract_video_id("https://youtu.be/abc123").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn missing_id_is_none() {
        assert!(extract_video_id("https://youtube.com/watch").is_none());
        assert!(extract_video_id("https://youtube.com/watch?v=").is_none());
        assert!(extract_video_id("https://example.com/page").is_none());
        assert!(extract_video_id("not a url").is_none());
    }
}
