//! Static file serving module
//!
//! GET/HEAD resolution against the served root: plain files, index files,
//! trailing-slash redirects and directory listings.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use tokio::fs;
use tracing::{error, warn};

use crate::config::AppState;
use crate::error::ServiceError;
use crate::handler::router::RequestContext;
use crate::http::{self, mime, query};

/// Serve the file or directory named by the request path
pub async fn serve(ctx: &RequestContext<'_>, state: &AppState) -> Response<Full<Bytes>> {
    let decoded = query::decode_path(ctx.path);
    let Ok(resolved) = state.root.resolve_existing(&decoded).await else {
        return http::build_404_response();
    };

    if resolved.is_dir() {
        if !ctx.path.ends_with('/') {
            return http::build_redirect_response(&with_trailing_slash(ctx.path, ctx.query));
        }
        return serve_directory(ctx, state, &resolved, &decoded).await;
    }

    serve_file(ctx, &resolved).await
}

/// Serve an index file from `dir`, or a listing when there is none
async fn serve_directory(
    ctx: &RequestContext<'_>,
    state: &AppState,
    dir: &Path,
    display_path: &str,
) -> Response<Full<Bytes>> {
    for index_file in &state.config.storage.index_files {
        let index_path = dir.join(index_file);
        if index_path.is_file() {
            return serve_file(ctx, &index_path).await;
        }
    }

    if !state.config.http.directory_listing {
        return http::build_404_response();
    }

    match list_directory(dir).await {
        Ok(entries) => http::build_html_response(render_listing(display_path, &entries), ctx.is_head),
        Err(e) => {
            warn!(dir = %dir.display(), "No permission to list directory: {e}");
            http::build_404_response()
        }
    }
}

async fn serve_file(ctx: &RequestContext<'_>, path: &Path) -> Response<Full<Bytes>> {
    match load_file(path).await {
        Ok((content, modified)) => http::build_file_response(
            content,
            mime::content_type_for(path),
            modified.as_deref(),
            ctx.is_head,
        ),
        Err(_) => http::build_404_response(),
    }
}

/// Read a file and its modification time as an HTTP date
async fn load_file(path: &Path) -> Result<(Vec<u8>, Option<String>), ServiceError> {
    let content = fs::read(path).await.map_err(|e| {
        error!(path = %path.display(), "Failed to read file: {e}");
        ServiceError::NotFound
    })?;
    let modified = fs::metadata(path)
        .await
        .and_then(|m| m.modified())
        .ok()
        .map(http_date);
    Ok((content, modified))
}

/// Format a timestamp as an IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Directory entry names, directories suffixed with `/`, sorted case-insensitively
async fn list_directory(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
            name.push('/');
        }
        entries.push(name);
    }
    entries.sort_by_key(|name| name.to_lowercase());
    Ok(entries)
}

fn render_listing(display_path: &str, entries: &[String]) -> String {
    let title = format!("Directory listing for {}", escape_html(display_path));
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n<hr>\n<ul>\n"
    );
    for name in entries {
        let (stem, slash) = name
            .strip_suffix('/')
            .map_or((name.as_str(), ""), |s| (s, "/"));
        html.push_str(&format!(
            "<li><a href=\"{}{slash}\">{}</a></li>\n",
            query::encode_segment(stem),
            escape_html(name)
        ));
    }
    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    html
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Redirect target for a directory. Leading slashes collapse to one so the
/// `Location` can never be read as `//host/...`.
fn with_trailing_slash(path: &str, query: Option<&str>) -> String {
    let path = format!("/{}", path.trim_start_matches('/'));
    match query {
        Some(q) => format!("{path}/?{q}"),
        None => format!("{path}/"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_http_date() {
        let time = UNIX_EPOCH + Duration::from_secs(784_111_777);
        assert_eq!(http_date(time), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_render_listing_escapes_names() {
        let html = render_listing("/saves/", &["a b.json".to_string(), "<x>/".to_string()]);
        assert!(html.contains("Directory listing for /saves/"));
        assert!(html.contains("<a href=\"a%20b.json\">a b.json</a>"));
        assert!(html.contains("<a href=\"%3Cx%3E/\">&lt;x&gt;/</a>"));
    }

    #[test]
    fn test_with_trailing_slash() {
        assert_eq!(with_trailing_slash("/assets", None), "/assets/");
        assert_eq!(with_trailing_slash("/assets", Some("v=2")), "/assets/?v=2");
        assert_eq!(with_trailing_slash("//evil.example", None), "/evil.example/");
        assert_eq!(with_trailing_slash("///a/b", Some("q")), "/a/b/?q");
    }

    #[tokio::test]
    async fn test_list_directory_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), b"").unwrap();
        std::fs::write(dir.path().join("A.json"), b"").unwrap();
        std::fs::create_dir(dir.path().join("img")).unwrap();

        let entries = list_directory(dir.path()).await.unwrap();
        assert_eq!(entries, vec!["A.json", "b.json", "img/"]);
    }
}
