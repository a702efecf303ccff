use crate::url::domain::netloc;
use crate::{UrlError, UrlResult};
use url::Url;

/// Parses a URL and checks that it is something the crawler can fetch
///
/// # Returns
///
/// * `Ok(Url)` - An `http`/`https` URL with a host
/// * `Err(UrlError)` - Unparsable, wrong scheme, or no host
pub fn parse_http_url(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

/// Reduces a URL to the key used for deduplication
///
/// The key is `scheme://host[:port]path`: query string and fragment are dropped,
/// scheme and host are lower-cased, dot segments in the path are resolved and an
/// empty path becomes `/`. Two URLs that differ only in their query are therefore
/// the same page as far as the seen-set is concerned.
///
/// Input that cannot be parsed, or that has no host, is returned unchanged so it
/// still deduplicates against itself.
///
/// # Examples
///
/// ```
/// use tidemark::url::normalize_url;
///
/// assert_eq!(
///     normalize_url("https://Example.com/docs/intro?lang=fr#top"),
///     "https://example.com/docs/intro"
/// );
/// ```
pub fn normalize_url(url_str: &str) -> String {
    let Ok(url) = Url::parse(url_str) else {
        return url_str.to_string();
    };

    match netloc(&url) {
        Some(netloc) => format!("{}://{}{}", url.scheme(), netloc, url.path()),
        None => url_str.to_string(),
    }
}
