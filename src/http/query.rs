//! URL decoding helpers
//!
//! Percent-decoding of request paths and form-style query strings.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped when a file name is put back into a link
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-decode a URL path. Invalid UTF-8 is replaced, never rejected.
pub fn decode_path(path: &str) -> String {
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}

/// Percent-encode a single path segment for use in an `href`
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// First non-blank value of `key` in a form-urlencoded query string.
///
/// `+` decodes to a space. Pairs with an empty value are skipped, so
/// `file=&file=a.json` yields `a.json`.
pub fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            Some((decode_form(k), decode_form(v)))
        })
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v)
}

fn decode_form(raw: &str) -> String {
    decode_path(&raw.replace('+', " "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param() {
        assert_eq!(
            query_param(Some("file=state.json"), "file").as_deref(),
            Some("state.json")
        );
        assert_eq!(
            query_param(Some("x=1&file=saves%2Fslot+1.json"), "file").as_deref(),
            Some("saves/slot 1.json")
        );
        assert_eq!(
            query_param(Some("file=&file=b.json"), "file").as_deref(),
            Some("b.json")
        );
    }

    #[test]
    fn test_query_param_missing() {
        assert_eq!(query_param(None, "file"), None);
        assert_eq!(query_param(Some(""), "file"), None);
        assert_eq!(query_param(Some("file="), "file"), None);
        assert_eq!(query_param(Some("file"), "file"), None);
        assert_eq!(query_param(Some("other=a.json"), "file"), None);
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("/my%20save.json"), "/my save.json");
        assert_eq!(decode_path("/a+b"), "/a+b");
        assert_eq!(decode_path("/%2e%2e/x"), "/../x");
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("my save#1.json"), "my%20save%231.json");
        assert_eq!(encode_segment("plain.js"), "plain.js");
    }
}
