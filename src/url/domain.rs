use url::Url;

/// Extracts the domain from a URL
///
/// The host is lowercased and a leading `www.` is removed, so that
/// `www.example.com` and `example.com` count as the same site.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use ux_sweep::url::extract_domain;
///
/// let url = Url::parse("https://WWW.Example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| {
        let host = h.to_lowercase();
        match host.strip_prefix("www.") {
            Some(stripped) => stripped.to_string(),
            None => host,
        }
    })
}

/// Returns true if both URLs belong to the same crawl domain
///
/// The scheme is ignored, so `http://` and `https://` links to one host are
/// the same site. Only explicit ports are compared: a scheme's default port
/// is `None` here, and a local server on one port never matches another.
pub fn is_same_domain(a: &Url, b: &Url) -> bool {
    match (extract_domain(a), extract_domain(b)) {
        (Some(da), Some(db)) => da == db && a.port() == b.port(),
        _ => false,
    }
}
