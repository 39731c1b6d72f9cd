//! Request handler module
//!
//! Routing, path resolution and file streaming.

pub mod resolve;
pub mod router;
pub mod stream;

// Re-export main entry point
pub use router::{handle_request, RequestContext};
