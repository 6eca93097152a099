//! Tether - HTTP/1.x server built from raw byte streams
//!
//! Core library for request parsing, routing, and connection handling.

pub mod config;
pub mod http;
pub mod server;
