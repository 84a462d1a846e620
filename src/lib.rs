//! HTTP server that logs POST request bodies and serves static files.
//!
//! POST bodies are decoded as UTF-8 and written as single lines to the
//! access-log target (stdout by default), then acknowledged with a fixed
//! plaintext response. Every other request is answered from the configured
//! static file root. Connections are serviced strictly one at a time, in
//! the order they are accepted.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
