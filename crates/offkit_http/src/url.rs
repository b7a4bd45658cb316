//! URL helpers.

/// Returns `url` without its query string and fragment.
pub fn base_url(url: &str) -> &str {
    let end = url.find(|c| c == '?' || c == '#').unwrap_or(url.len());
    &url[..end]
}

/// Returns the query string of `url` (without the leading `?`), if any.
pub fn query_string(url: &str) -> Option<&str> {
    let without_fragment = url.split('#').next().unwrap_or(url);
    without_fragment.split_once('?').map(|(_, query)| query)
}
