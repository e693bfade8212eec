//! HTTP cache control module
//!
//! Every response this server emits forbids caching, so a client reloading a
//! saved file always sees what is on disk right now.

use hyper::header::{HeaderMap, HeaderValue, CACHE_CONTROL, EXPIRES, PRAGMA};

/// Cache-Control value sent with every response
pub const NO_STORE: &str = "no-store, no-cache, must-revalidate, max-age=0";

/// Overwrite the caching headers of `headers`: never store, always
/// revalidate, expire immediately. The legacy `Pragma` and `Expires`
/// headers are set for HTTP/1.0 intermediaries.
pub fn apply_no_store(headers: &mut HeaderMap) {
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
}

/// Check that `headers` carry the full no-store triple
pub fn is_no_store(headers: &HeaderMap) -> bool {
    headers.get(CACHE_CONTROL).is_some_and(|v| v == NO_STORE)
        && headers.get(PRAGMA).is_some_and(|v| v == "no-cache")
        && headers.get(EXPIRES).is_some_and(|v| v == "0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_store_overrides_existing_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=60"));
        assert!(!is_no_store(&headers));

        apply_no_store(&mut headers);

        assert_eq!(headers[CACHE_CONTROL], NO_STORE);
        assert_eq!(headers[PRAGMA], "no-cache");
        assert_eq!(headers[EXPIRES], "0");
        assert_eq!(headers.get_all(CACHE_CONTROL).iter().count(), 1);
        assert!(is_no_store(&headers));
    }

    #[test]
    fn test_partial_headers_are_not_no_store() {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
        assert!(!is_no_store(&headers));
    }
}
