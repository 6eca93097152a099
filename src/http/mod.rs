//! HTTP protocol implementation.
//!
//! This module implements an HTTP/1.x server connection with support for keep-alive.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`connection`**: The per-connection loop: read, dispatch, respond, repeat
//! - **`parser`**: Incremental request parser fed from a growing byte buffer
//! - **`request`**: Request, method, and version types
//! - **`headers`**: Header store shared by requests and responses
//! - **`response`**: Status codes and the handler failure type
//! - **`writer`**: Buffers a response and writes it to the client
//! - **`mime`**: MIME type detection from body bytes or file extensions
//!
//! # Connection State Machine
//!
//! Each client connection goes through a state machine:
//!
//! ```text
//!        ┌─────────────┐
//!        │  IdleWait   │ ← Arm the idle deadline
//!        └──────┬──────┘
//!               ▼
//!        ┌─────────────┐
//!        │   Parsing   │ ← Read until one request is parsed
//!        └──────┬──────┘
//!               │ Request parsed          (parse error → 400 or 413, then Closed)
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← Route, middleware, handler
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │   Responding     │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → IdleWait (same connection)
//!               └─ Close → Closed
//! ```
//!
//! # Parser states
//!
//! ```text
//! AwaitingRequestLine → AwaitingHeaders → AwaitingBody ⟲ → Done
//! ```
//!
//! The body is read only when `Content-Length` is a positive integer;
//! chunked transfer-encoding is not supported.

pub mod connection;
pub mod headers;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
