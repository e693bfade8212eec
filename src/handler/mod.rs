//! Request handler module
//!
//! The file service: static GET/HEAD serving and the POST save endpoint.

pub mod router;
pub mod save;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
