//! HTTP protocol layer module
//!
//! Response builders, caching headers, MIME lookup and URL decoding,
//! decoupled from the file service itself.

pub mod cache;
pub mod mime;
pub mod query;
pub mod response;

// Re-export commonly used items
pub use cache::apply_no_store;
pub use response::{
    build_404_response, build_501_response, build_file_response, build_html_response,
    build_redirect_response, build_text_response,
};
