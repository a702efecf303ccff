use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use tidemark::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns `host[:port]` for a URL, the port only when it is not the scheme default
pub fn netloc(url: &Url) -> Option<String> {
    let host = extract_domain(url)?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Checks whether a URL's host falls inside the crawl domain
///
/// Scope is a plain substring test on the lower-cased host, so `example.com`
/// admits `example.com`, `www.example.com` and `docs.example.com` alike.
pub fn in_scope(url: &Url, domain: &str) -> bool {
    extract_domain(url)
        .map(|host| host.contains(&domain.to_lowercase()))
        .unwrap_or(false)
}
