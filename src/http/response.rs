//! HTTP response building module
//!
//! Builders for the handful of response shapes the file service emits.
//! Caching headers are not set here; the router applies them to every
//! response once routing is done.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{ALLOW, CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED, LOCATION};
use hyper::{Method, Response, StatusCode};
use tracing::error;

/// Build a plain-text response with the given status
pub fn build_text_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CONTENT_LENGTH, message.len())
        .body(Full::new(Bytes::from(message.to_owned())))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            fallback(status)
        })
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::NOT_FOUND, "File not found")
}

/// Build 501 Not Implemented response for methods the service does not handle
pub fn build_501_response(method: &Method) -> Response<Full<Bytes>> {
    let message = format!("Unsupported method ('{method}')");
    let mut response = build_text_response(StatusCode::NOT_IMPLEMENTED, &message);
    response
        .headers_mut()
        .insert(ALLOW, hyper::header::HeaderValue::from_static("GET, HEAD, POST"));
    response
}

/// Build 301 redirect response
pub fn build_redirect_response(target: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(LOCATION, target)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CONTENT_LENGTH, 0)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::MOVED_PERMANENTLY, &e);
            fallback(StatusCode::NOT_FOUND)
        })
}

/// Build generic HTML response
pub fn build_html_response(content: String, is_head: bool) -> Response<Full<Bytes>> {
    let content_length = content.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(content)
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .header(CONTENT_LENGTH, content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::OK, &e);
            fallback(StatusCode::INTERNAL_SERVER_ERROR)
        })
}

/// Build 200 response carrying a file's bytes.
///
/// For HEAD the body is dropped but `Content-Length` still reports the file size.
pub fn build_file_response(
    data: Vec<u8>,
    content_type: &str,
    last_modified: Option<&str>,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let content_length = data.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(data)
    };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, content_length);
    if let Some(modified) = last_modified {
        builder = builder.header(LAST_MODIFIED, modified);
    }

    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error(StatusCode::OK, &e);
        fallback(StatusCode::INTERNAL_SERVER_ERROR)
    })
}

fn fallback(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// Log response build error
fn log_build_error(status: StatusCode, err: &hyper::http::Error) {
    error!("Failed to build {status} response: {err}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(response: Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_text_response() {
        let response = build_text_response(StatusCode::BAD_REQUEST, "Missing file parameter");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[CONTENT_LENGTH], "22");
        assert_eq!(body_of(response).await, "Missing file parameter");
    }

    #[tokio::test]
    async fn test_head_file_response_keeps_length() {
        let response = build_file_response(b"abcdef".to_vec(), "text/plain", None, true);
        assert_eq!(response.headers()[CONTENT_LENGTH], "6");
        assert!(body_of(response).await.is_empty());
    }

    #[test]
    fn test_501_lists_allowed_methods() {
        let response = build_501_response(&Method::PUT);
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(response.headers()[ALLOW], "GET, HEAD, POST");
    }

    #[test]
    fn test_redirect() {
        let response = build_redirect_response("/assets/");
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[LOCATION], "/assets/");
    }
}
