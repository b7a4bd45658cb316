//! Cache key derivation and parsing.
//!
//! Keys have the layout `url$METHOD$vary`, where `vary` is the concatenation
//! of `field=value;` for every field named by the response's `Vary` header
//! (empty when there is none). `Vary: *` replaces the pairs with a random
//! UUID so the entry never shares a key. Keys written before this layout
//! existed are `url + METHOD` and are still recognised.

use crate::cache::MatchOptions;
use crate::vary::vary_fields;
use offkit_http::{base_url, HttpRequest, HttpResponse};
use uuid::Uuid;

/// Methods recognised at the end of legacy keys, longest first.
const LEGACY_METHODS: [&str; 7] = ["OPTIONS", "DELETE", "PATCH", "POST", "HEAD", "GET", "PUT"];

/// Derives the cache key for a request/response pair.
pub fn cache_key(request: &HttpRequest, response: &HttpResponse) -> String {
    let vary = match response.headers.get("vary") {
        None => String::new(),
        Some(vary) => {
            let fields = vary_fields(&vary);
            if fields.iter().any(|field| field == "*") {
                Uuid::new_v4().to_string()
            } else {
                fields
                    .iter()
                    .map(|field| {
                        format!("{field}={};", request.headers.get(field).unwrap_or_default())
                    })
                    .collect()
            }
        }
    };
    format!("{}${}${}", request.url, request.method, vary)
}

/// A cache key split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedKey<'a> {
    /// Request URL.
    pub url: &'a str,
    /// Request method.
    pub method: &'a str,
    /// `field=value;` pairs, a UUID, or empty.
    pub vary: &'a str,
    /// True for keys in the `url + METHOD` layout.
    pub legacy: bool,
}

/// Parses a cache key.
///
/// The URL ends at the first `$` followed by an uppercase method and
/// another `$`. Returns `None` for keys in neither layout.
pub fn parse_cache_key(key: &str) -> Option<ParsedKey<'_>> {
    for (index, _) in key.match_indices('$') {
        let rest = &key[index + 1..];
        if let Some((method, vary)) = rest.split_once('$') {
            if !method.is_empty() && method.bytes().all(|b| b.is_ascii_uppercase()) {
                return Some(ParsedKey {
                    url: &key[..index],
                    method,
                    vary,
                    legacy: false,
                });
            }
        }
    }
    LEGACY_METHODS.iter().find_map(|method| {
        key.strip_suffix(method)
            .filter(|url| !url.is_empty())
            .map(|url| ParsedKey {
                url,
                method,
                vary: "",
                legacy: true,
            })
    })
}

/// Returns the keys whose URL and method match `request`.
///
/// Vary is not considered here; candidates still need a
/// [`vary_matches`](crate::vary_matches) check against their stored request.
pub fn matched_cache_keys<'a>(
    keys: &'a [String],
    request: &HttpRequest,
    options: &MatchOptions,
) -> Vec<&'a str> {
    keys.iter()
        .map(String::as_str)
        .filter(|key| {
            parse_cache_key(key).is_some_and(|parsed| {
                let url_matches = if options.ignore_search {
                    base_url(parsed.url) == request.base_url()
                } else {
                    parsed.url == request.url
                };
                url_matches && (options.ignore_method || parsed.method == request.method)
            })
        })
        .collect()
}
