//! No-cache static file server with a single save endpoint.
//!
//! `GET`/`HEAD` serve files from a served root; `POST /save-json?file=<name>`
//! writes the request body to `<root>/<name>`. Every response forbids
//! caching, and no path may resolve outside the root.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod storage;
