//! `Vary` header handling.

use offkit_http::{HttpRequest, HttpResponse};

/// Splits a `Vary` header value into lowercased field names.
pub fn vary_fields(vary: &str) -> Vec<String> {
    vary.split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Returns true if `request` may be served the cached response.
///
/// Every header named by the cached response's `Vary` must carry the same
/// value in both requests; a header absent from both counts as equal.
/// `Vary: *` never matches.
pub fn vary_matches(
    cached_request: &HttpRequest,
    cached_response: &HttpResponse,
    request: &HttpRequest,
    ignore_vary: bool,
) -> bool {
    if ignore_vary {
        return true;
    }
    let Some(vary) = cached_response.headers.get("vary") else {
        return true;
    };
    let fields = vary_fields(&vary);
    if fields.iter().any(|field| field == "*") {
        return false;
    }
    fields
        .iter()
        .all(|field| cached_request.headers.get(field) == request.headers.get(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cached(vary: &str, language: Option<&str>) -> (HttpRequest, HttpResponse) {
        let mut request = HttpRequest::get("https://api.test/items");
        if let Some(language) = language {
            request = request.with_header("Accept-Language", language);
        }
        (request, HttpResponse::ok().with_header("Vary", vary))
    }

    #[test]
    fn fields_are_trimmed_and_lowercased() {
        assert_eq!(vary_fields(" Accept , Accept-Language,,"), vec!["accept", "accept-language"]);
    }

    #[test]
    fn named_headers_must_agree() {
        let (req, res) = cached("Accept-Language", Some("en-US"));
        let same = HttpRequest::get("https://api.test/items").with_header("accept-language", "en-US");
        let other = HttpRequest::get("https://api.test/items").with_header("Accept-Language", "fr");
        assert!(vary_matches(&req, &res, &same, false));
        assert!(!vary_matches(&req, &res, &other, false));
        assert!(vary_matches(&req, &res, &other, true));
    }

    #[test]
    fn absent_on_both_sides_matches() {
        let (req, res) = cached("Accept-Language", None);
        assert!(vary_matches(&req, &res, &HttpRequest::get("https://api.test/items"), false));
    }

    #[test]
    fn star_never_matches() {
        let (req, res) = cached("*", None);
        assert!(!vary_matches(&req, &res, &req.clone(), false));
        assert!(vary_matches(&req, &res, &req.clone(), true));
    }

    #[test]
    fn no_vary_matches() {
        let req = HttpRequest::get("https://api.test/items");
        assert!(vary_matches(&req, &HttpResponse::ok(), &req.clone(), false));
    }
}
