use sha2::{Digest, Sha256};
use url::Url;

/// Extensions removed from the last path segment before it becomes a file stem
const STRIPPED_EXTENSIONS: &[&str] = &[".pdf", ".png", ".jpg", ".jpeg", ".gif", ".bmp", ".svg"];

/// Longest stem kept before the hash suffix is appended
const MAX_STEM_CHARS: usize = 50;

/// Stem used when the URL has no usable last path segment
const FALLBACK_STEM: &str = "home";

/// Derives a stable, filesystem-safe file name (without extension) from a URL
///
/// The name is built from the URL's last non-empty path segment with known PDF/image
/// extensions removed, restricted to ASCII letters, digits and `-_.() `, cut to
/// 50 characters and suffixed with `_` plus the first 8 hex digits of the URL's
/// SHA-256. The suffix keeps two URLs apart even when their simplified stems
/// collide (`/a/index` and `/b/index`).
///
/// When the result is longer than `max_length` it is cut to `max_length - 5`
/// characters and re-suffixed with `_` plus 4 hex digits, so the returned name
/// never exceeds `max_length`.
///
/// # Arguments
///
/// * `url` - The URL the artifact was fetched from
/// * `max_length` - Upper bound on the length of the returned name
///
/// # Examples
///
/// ```
/// use tidemark::url::sanitize_filename;
///
/// let name = sanitize_filename("https://example.com/reports/annual.pdf", 100);
/// assert!(name.starts_with("annual_"));
/// assert_eq!(name.len(), "annual_".len() + 8);
/// ```
pub fn sanitize_filename(url: &str, max_length: usize) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));

    let segment = last_path_segment(url);
    let stem = strip_known_extension(&segment);

    let mut cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || "-_.() ".contains(*c))
        .take(MAX_STEM_CHARS)
        .collect();
    if cleaned.is_empty() {
        cleaned = FALLBACK_STEM.to_string();
    }

    let name = format!("{}_{}", cleaned, &digest[..8]);
    if name.len() <= max_length {
        return name;
    }

    // Only ASCII survives the filter above, so byte slicing is on char boundaries
    let keep = max_length.saturating_sub(5);
    let mut truncated = format!("{}_{}", &name[..keep], &digest[..4]);
    truncated.truncate(max_length);
    truncated
}

fn last_path_segment(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.rfind(|segment| !segment.is_empty()))
            .unwrap_or_default()
            .to_string(),
        Err(_) => {
            let without_query = url.split(['?', '#']).next().unwrap_or_default();
            without_query
                .rsplit('/')
                .find(|segment| !segment.is_empty())
                .unwrap_or_default()
                .to_string()
        }
    }
}

fn strip_known_extension(segment: &str) -> &str {
    let lower = segment.to_ascii_lowercase();
    for ext in STRIPPED_EXTENSIONS {
        if lower.ends_with(ext) {
            return &segment[..segment.len() - ext.len()];
        }
    }
    segment
}
