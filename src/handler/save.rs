//! Save endpoint
//!
//! `POST /save-json?file=<name>` writes the raw request body to
//! `<root>/<name>`, creating or overwriting the file.

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::CONTENT_LENGTH;
use hyper::{Request, Response, StatusCode};
use tracing::{error, info, warn};

use crate::config::AppState;
use crate::error::ServiceError;
use crate::http::{self, query};

/// Any POST path starting with this prefix is the save route
pub const SAVE_ROUTE_PREFIX: &str = "/save-json";

/// Handle a POST request
pub async fn handle_post<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if !req.uri().path().starts_with(SAVE_ROUTE_PREFIX) {
        return http::build_text_response(StatusCode::NOT_FOUND, "Not found");
    }

    match save_body(req, state).await {
        Ok((name, bytes)) => {
            info!(file = %name, bytes, "Saved file");
            http::build_text_response(StatusCode::OK, "OK")
        }
        Err(err) => error_response(&err, state),
    }
}

async fn save_body<B>(req: Request<B>, state: &AppState) -> Result<(String, usize), ServiceError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let name = query::query_param(req.uri().query(), "file")
        .ok_or(ServiceError::MissingFileParameter)?;

    // Containment is checked before the body is buffered
    state.root.resolve_target(&name).await?;

    let body = read_body(req, state.config.http.max_body_size).await?;
    state.root.write(&name, &body).await?;
    Ok((name, body.len()))
}

/// Collect the whole request body, refusing anything over `limit` bytes
async fn read_body<B>(req: Request<B>, limit: u64) -> Result<Bytes, ServiceError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if let Some(declared) = declared_length(&req) {
        if declared > limit {
            return Err(ServiceError::PayloadTooLarge { limit });
        }
    }

    let limited = Limited::new(req.into_body(), usize::try_from(limit).unwrap_or(usize::MAX));
    match limited.collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(ServiceError::PayloadTooLarge { limit }),
        Err(e) => Err(ServiceError::BodyRead(e.to_string())),
    }
}

fn declared_length<B>(req: &Request<B>) -> Option<u64> {
    let value = req.headers().get(CONTENT_LENGTH)?;
    match value.to_str().ok().and_then(|s| s.trim().parse::<u64>().ok()) {
        Some(size) => Some(size),
        None => {
            warn!("Invalid Content-Length value: {value:?}, skipping size check");
            None
        }
    }
}

fn error_response(err: &ServiceError, state: &AppState) -> Response<Full<Bytes>> {
    match err {
        ServiceError::Write { path, source } => {
            error!(file = %path, "Failed to write file: {source}");
        }
        ServiceError::PathEscapesRoot(name) => {
            warn!(file = %name, "Path traversal attempt blocked");
        }
        other => warn!("Save rejected: {other}"),
    }
    http::build_text_response(
        err.status(),
        &err.client_message(state.config.http.expose_error_details),
    )
}
