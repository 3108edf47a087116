use crate::UrlError;
use url::Url;

/// Query parameters that only track visitors and never change page content
const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "msclkid",
    "dclid",
    "yclid",
    "mc_cid",
    "mc_eid",
    "_ga",
    "_gl",
    "_hsenc",
    "_hsmi",
    "ref",
    "source",
    "sid",
    "sessionid",
    "session_id",
    "phpsessid",
    "jsessionid",
    "lang",
    "locale",
    "hl",
];

/// Query parameters that select different content and must survive deduplication
const CONTENT_PARAMS: &[&str] = &[
    "page", "p", "q", "query", "search", "s", "category", "cat", "filter", "tag", "type", "id",
];

/// Trailing path documents that name the same resource as their directory
const INDEX_DOCUMENTS: &[&str] = &["index.html", "index.htm", "index.php"];

/// Normalizes a URL for traversal
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an http or https scheme
/// 3. Lowercase the host and remove the `www.` prefix
/// 4. Normalize path:
///    - Remove dot segments and empty segments
///    - Remove trailing slash (except for root /)
/// 5. Remove fragment
/// 6. Sort query parameters by key, then value
/// 7. Remove empty query string
///
/// Tracking parameters are kept here; they are only dropped by
/// [`deduplication_key`].
///
/// # Examples
///
/// ```
/// use ux_sweep::url::normalize_url;
///
/// let url = normalize_url("https://WWW.EXAMPLE.COM/page/?b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if let Some(host) = url.host_str() {
        let mut normalized_host = host.to_lowercase();

        if let Some(stripped) = normalized_host.strip_prefix("www.") {
            normalized_host = stripped.to_string();
        }

        url.set_host(Some(&normalized_host))
            .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
    } else {
        return Err(UrlError::MissingDomain);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        params.sort();
        set_query_params(&mut url, &params);
    }

    Ok(url)
}

/// Computes the deduplication key of a URL
///
/// The key is stricter than [`normalize_url`]: it ignores the scheme,
/// lowercases the path, drops trailing index documents and removes tracking
/// query parameters unless they select content (pagination, search, filters).
/// Two URLs with the same key denote the same page.
///
/// # Examples
///
/// ```
/// use ux_sweep::url::deduplication_key;
///
/// let a = deduplication_key("http://www.example.com/About/?utm_source=x").unwrap();
/// let b = deduplication_key("https://example.com/about").unwrap();
/// assert_eq!(a, b);
/// ```
pub fn deduplication_key(url_str: &str) -> Result<String, UrlError> {
    let url = normalize_url(url_str)?;
    let host = url.host_str().ok_or(UrlError::MissingDomain)?;

    let mut key = host.to_string();
    if let Some(port) = url.port() {
        key.push_str(&format!(":{}", port));
    }

    let mut path = url.path().to_lowercase();
    for index in INDEX_DOCUMENTS {
        if let Some(stripped) = path.strip_suffix(index) {
            path = stripped.to_string();
            break;
        }
    }
    let path = normalize_path(&path);
    key.push_str(&path);

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort();

    if !params.is_empty() {
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        key.push('?');
        key.push_str(&query);
    }

    Ok(key)
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}

fn set_query_params(url: &mut Url, params: &[(String, String)]) {
    url.set_query(None);
    if !params.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
}

/// Checks if a query parameter only tracks visitors
///
/// Content-changing parameters always win over the tracking list.
pub fn is_tracking_param(key: &str) -> bool {
    let key = key.to_lowercase();

    if CONTENT_PARAMS.contains(&key.as_str()) {
        return false;
    }

    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_scheme() {
        let result = normalize_url("http://example.com/page").unwrap();
        assert_eq!(result.as_str(), "http://example.com/page");
    }

    #[test]
    fn test_remove_www() {
        let result = normalize_url("https://www.example.com/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_remove_trailing_slash() {
        let result = normalize_url("https://example.com/page/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keep_root_slash() {
        let result = normalize_url("https://example.com").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.com/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_sort_query_params() {
        let result = normalize_url("https://example.com/page?b=2&a=1").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page?a=1&b=2");
    }

    #[test]
    fn test_traversal_keeps_tracking_params() {
        let result = normalize_url("https://example.com/page?utm_source=x").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page?utm_source=x");
    }

    #[test]
    fn test_empty_query_removed() {
        let result = normalize_url("https://example.com/page?").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_normalize_path_with_dots() {
        let result = normalize_url("https://example.com/a/../b/./c").unwrap();
        assert_eq!(result.as_str(), "https://example.com/b/c");
    }

    #[test]
    fn test_multiple_slashes() {
        let result = normalize_url("https://example.com///path//to///page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/path/to/page");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page");
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }

    #[test]
    fn test_malformed_url() {
        assert!(normalize_url("not a url").is_err());
    }

    #[test]
    fn test_dedup_key_ignores_scheme_and_www() {
        assert_eq!(
            deduplication_key("http://www.example.com/about").unwrap(),
            deduplication_key("https://example.com/about").unwrap()
        );
    }

    #[test]
    fn test_dedup_key_strips_tracking_params() {
        let key = deduplication_key(
            "https://example.com/page?utm_medium=email&fbclid=1&sessionid=abc&lang=en",
        )
        .unwrap();
        assert_eq!(key, "example.com/page");
    }

    #[test]
    fn test_dedup_key_keeps_content_params() {
        let key = deduplication_key("https://example.com/search?utm_source=x&q=shoes&page=2")
            .unwrap();
        assert_eq!(key, "example.com/search?page=2&q=shoes");
    }

    #[test]
    fn test_dedup_key_keeps_unknown_params() {
        let key = deduplication_key("https://example.com/events?year=2024").unwrap();
        assert_eq!(key, "example.com/events?year=2024");
    }

    #[test]
    fn test_dedup_key_case_and_index_documents() {
        assert_eq!(
            deduplication_key("https://example.com/About/index.html").unwrap(),
            deduplication_key("https://example.com/about/").unwrap()
        );
        assert_eq!(
            deduplication_key("https://example.com/index.php").unwrap(),
            "example.com/"
        );
    }

    #[test]
    fn test_dedup_key_keeps_port() {
        let key = deduplication_key("http://127.0.0.1:8080/a").unwrap();
        assert_eq!(key, "127.0.0.1:8080/a");
    }

    #[test]
    fn test_is_tracking_param() {
        assert!(is_tracking_param("utm_campaign"));
        assert!(is_tracking_param("UTM_Source"));
        assert!(is_tracking_param("gclid"));
        assert!(is_tracking_param("PHPSESSID"));
        assert!(!is_tracking_param("page"));
        assert!(!is_tracking_param("q"));
        assert!(!is_tracking_param("year"));
    }
}
