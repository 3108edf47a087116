use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Binary and asset file extensions
const BINARY_EXTENSIONS: &str = r"\.(?:pdf|jpe?g|png|gif|svg|webp|ico|bmp|tiff?|zip|rar|gz|tar|7z|exe|dmg|msi|mp3|mp4|m4a|wav|avi|mov|wmv|webm|docx?|xlsx?|pptx?|csv|css|js|json|xml|rss|woff2?|ttf|eot)(?:$|\?)";

/// Admin, auth, account and shopping-cart areas
const ADMIN_AUTH_CART: &str = r"/(?:wp-admin|wp-login\.php|wp-json|admin|administrator|login|logout|signin|sign-in|signup|sign-up|register|account|my-account|cart|basket|checkout|dashboard)(?:/|$|\?)";

/// Feeds and CMS plumbing
const FEEDS: &str = r"/(?:feed|rss|xmlrpc\.php|cgi-bin)(?:/|$|\?)";

/// Date-stamped archive pages such as /2023/05/ or /2023/05/17/
const DATE_ARCHIVES: &str = r"/(?:19|20)\d{2}/(?:0?[1-9]|1[0-2])(?:/(?:0?[1-9]|[12]\d|3[01]))?/?(?:$|\?)";

/// Path-style pagination beyond the first page
const PATH_PAGINATION: &str = r"/page/(?:[2-9]|[1-9]\d+)(?:/|$|\?)";

/// Query-style pagination beyond the first page
const QUERY_PAGINATION: &str = r"[?&](?:page|paged)=(?:[2-9]|[1-9]\d+)(?:&|$)";

/// Author archives
const AUTHOR_PAGES: &str = r"/author/";

/// Legal and footer boilerplate
const LEGAL_PAGES: &str = r"/(?:privacy|privacy-policy|privacy-notice|terms|terms-of-service|terms-of-use|terms-and-conditions|cookies?|cookie-policy|legal|disclaimer|accessibility|accessibility-statement|sitemap)(?:/|$|\.|\?)";

/// The fixed set of non-content patterns applied to every crawl
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    BINARY_EXTENSIONS,
    ADMIN_AUTH_CART,
    FEEDS,
    DATE_ARCHIVES,
    PATH_PAGINATION,
    QUERY_PAGINATION,
    AUTHOR_PAGES,
    LEGAL_PAGES,
];

/// Drops non-content pages before they reach the frontier
///
/// Patterns are matched case-insensitively against the path plus query of a
/// URL, never against the host. Path patterns treat `?` as the end of the path.
#[derive(Debug, Clone)]
pub struct ExclusionFilter {
    patterns: Vec<String>,
    regexes: Vec<Regex>,
}

impl ExclusionFilter {
    /// Builds a filter from the default patterns plus caller-supplied ones
    pub fn new(extra_patterns: &[String]) -> Result<Self, regex::Error> {
        let patterns: Vec<String> = DEFAULT_EXCLUDE_PATTERNS
            .iter()
            .map(|p| p.to_string())
            .chain(extra_patterns.iter().cloned())
            .collect();

        let regexes = patterns
            .iter()
            .map(|p| Regex::new(&format!("(?i){}", p)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns, regexes })
    }

    /// Returns true if the URL should not be crawled
    pub fn is_excluded(&self, url: &Url) -> bool {
        let target = match_target(url);
        self.regexes.iter().any(|re| re.is_match(&target))
    }

    /// All patterns in effect, defaults first
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for ExclusionFilter {
    fn default() -> Self {
        Self::new(&[]).expect("default exclusion patterns are valid")
    }
}

/// Returns true if the URL is a legal or footer boilerplate page
pub fn is_legal_page(url: &Url) -> bool {
    static LEGAL: OnceLock<Regex> = OnceLock::new();
    let re = LEGAL.get_or_init(|| {
        Regex::new(&format!("(?i){}", LEGAL_PAGES)).expect("legal page pattern is valid")
    });
    re.is_match(&match_target(url))
}

fn match_target(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn excluded(url: &str) -> bool {
        ExclusionFilter::default().is_excluded(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_content_pages_pass() {
        assert!(!excluded("https://example.com/"));
        assert!(!excluded("https://example.com/services"));
        assert!(!excluded("https://example.com/blog/how-we-help"));
        assert!(!excluded("https://example.com/page/1"));
        assert!(!excluded("https://example.com/news?page=1"));
    }

    #[test]
    fn test_binary_files_excluded() {
        assert!(excluded("https://example.com/report.pdf"));
        assert!(excluded("https://example.com/img/logo.PNG"));
        assert!(excluded("https://example.com/assets/site.css"));
    }

    #[test]
    fn test_query_string_does_not_hide_extensions_or_dates() {
        assert!(excluded("https://example.com/brochure.pdf?v=2"));
        assert!(excluded("https://example.com/2023/05?ref=x"));
        assert!(excluded("https://example.com/news/2023/05/17/?utm_source=mail"));
        assert!(excluded("https://example.com/login?next=/donate"));
        assert!(excluded("https://example.com/privacy?lang=es"));
        assert!(!excluded("https://example.com/reports?format=pdf"));
    }

    #[test]
    fn test_admin_auth_cart_excluded() {
        assert!(excluded("https://example.com/wp-admin/options.php"));
        assert!(excluded("https://example.com/login"));
        assert!(excluded("https://example.com/cart/"));
        assert!(excluded("https://example.com/my-account/orders"));
        // "admin" inside another word is content
        assert!(!excluded("https://example.com/administration-team-bios"));
    }

    #[test]
    fn test_date_archives_excluded() {
        assert!(excluded("https://example.com/2023/05/"));
        assert!(excluded("https://example.com/news/2023/05/17"));
        assert!(!excluded("https://example.com/2023-annual-report"));
    }

    #[test]
    fn test_pagination_beyond_first_excluded() {
        assert!(excluded("https://example.com/blog/page/2"));
        assert!(excluded("https://example.com/blog/page/12/"));
        assert!(excluded("https://example.com/news?page=3"));
        assert!(excluded("https://example.com/news?cat=a&paged=10"));
    }

    #[test]
    fn test_author_and_legal_excluded() {
        assert!(excluded("https://example.com/author/jane"));
        assert!(excluded("https://example.com/privacy-policy"));
        assert!(excluded("https://example.com/terms"));
        assert!(excluded("https://example.com/legal/notice"));
    }

    #[test]
    fn test_custom_patterns() {
        let filter = ExclusionFilter::new(&[r"/events/\d+".to_string()]).unwrap();
        assert!(filter.is_excluded(&Url::parse("https://example.com/events/42").unwrap()));
        assert!(!filter.is_excluded(&Url::parse("https://example.com/events").unwrap()));
        assert_eq!(filter.patterns().len(), DEFAULT_EXCLUDE_PATTERNS.len() + 1);
    }

    #[test]
    fn test_is_legal_page() {
        assert!(is_legal_page(&Url::parse("https://example.com/cookie-policy").unwrap()));
        assert!(is_legal_page(&Url::parse("https://example.com/sitemap.xml").unwrap()));
        assert!(!is_legal_page(&Url::parse("https://example.com/programs").unwrap()));
    }
}
