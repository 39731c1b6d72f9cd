//! HTTP protocol layer module
//!
//! MIME detection, Range parsing and response builders, independent of how
//! requests are routed.

pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use mime::{describe, ContentDescriptor};
pub use range::{parse_range_header, ByteRange, RangeError};
pub use response::{
    build_404_response, build_405_response, build_416_response, build_500_response,
    build_file_response, build_health_response, build_options_response,
    build_redirect_response, empty_body, full_body, FileHeaders, ResponseBody,
};
