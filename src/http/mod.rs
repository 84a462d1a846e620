//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from the
//! dispatch logic: response building, MIME detection and cache validation.

pub mod cache;
pub mod mime;
pub mod response;

// Re-export commonly used builders
pub use response::{
    build_304_response, build_400_response, build_404_response, build_cached_response,
    build_html_response, build_post_ack_response,
};
