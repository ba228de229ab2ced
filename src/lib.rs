//! Decoder and validator for HAProxy PROXY protocol v2 headers.
//!
//! [`proxy::parse_proxy_v2`] is a pure function over one received buffer.
//! [`acquire`] obtains that buffer from stdin or a single TCP connection,
//! [`report`] renders the outcome and [`config`] holds the layered settings
//! used by the `parse_proxy_v2` binary.

pub mod acquire;
pub mod config;
pub mod proxy;
pub mod report;

pub use proxy::{parse_proxy_v2, ProxyError, ProxyInfo};
