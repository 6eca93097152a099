use std::path::Path;
use std::time::{Duration, SystemTime};

use bytes::BytesMut;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::headers::Headers;
use crate::http::mime;
use crate::http::request::Version;
use crate::http::response::{HandlerResult, RouteError, StatusCode};

/// Buffers one HTTP response for the connection loop to flush.
///
/// Handlers either use the `send_*` helpers, which fill in default headers
/// and write the whole response, or the low-level `write_status_line` /
/// `write_headers` / `write_body` trio.
pub struct ResponseWriter {
    version: Version,
    status: StatusCode,
    headers: Headers,
    keep_alive: bool,
    idle_timeout: Option<Duration>,
    buffer: BytesMut,
    written: usize,
}

impl ResponseWriter {
    pub fn new(version: Version, keep_alive: bool, idle_timeout: Option<Duration>) -> Self {
        // HTTP/2 is only a label here; replies always go out as HTTP/1.x.
        let version = match version {
            Version::Http10 => Version::Http10,
            _ => Version::Http11,
        };

        Self {
            version,
            status: StatusCode::Ok,
            headers: Headers::new(),
            keep_alive,
            idle_timeout,
            buffer: BytesMut::with_capacity(1024),
            written: 0,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Whether the connection may stay open after this response.
    ///
    /// A handler that set `Connection: close` itself wins over the request.
    pub fn keep_alive(&self) -> bool {
        let closed_by_handler = self
            .headers
            .get("Connection")
            .map(|v| v.eq_ignore_ascii_case("close"))
            .unwrap_or(false);
        self.keep_alive && !closed_by_handler
    }

    /// True once any response bytes have been buffered.
    pub fn is_started(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn write_status_line(&mut self) {
        let line = format!(
            "{} {} {}\r\n",
            self.version,
            self.status.as_u16(),
            self.status.reason_phrase()
        );
        self.buffer.extend_from_slice(line.as_bytes());
    }

    /// Writes every header followed by the blank separator line.
    pub fn write_headers(&mut self) {
        for (k, v) in self.headers.iter() {
            self.buffer.extend_from_slice(k.as_bytes());
            self.buffer.extend_from_slice(b": ");
            self.buffer.extend_from_slice(v.as_bytes());
            self.buffer.extend_from_slice(b"\r\n");
        }
        self.buffer.extend_from_slice(b"\r\n");
    }

    pub fn write_body(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Fills in the headers every response carries, keeping any the
    /// handler already set.
    pub fn set_default_headers(&mut self, body: &[u8]) {
        let headers = &mut self.headers;

        if !headers.contains("Content-Length") {
            let _ = headers.set("Content-Length", body.len().to_string());
        }

        if !headers.contains("Date") {
            let _ = headers.set("Date", httpdate::fmt_http_date(SystemTime::now()));
        }

        if !headers.contains("Connection") {
            if self.keep_alive {
                let _ = headers.set("Connection", "keep-alive");
                if let Some(timeout) = self.idle_timeout {
                    let _ = headers.set("Keep-Alive", format!("timeout={}", timeout.as_secs()));
                }
            } else {
                let _ = headers.set("Connection", "close");
            }
        }

        if !body.is_empty() && !headers.contains("Content-Type") {
            let _ = headers.set("Content-Type", mime::detect_content_type(body));
        }
    }

    /// Writes a complete response with the current status.
    pub fn send_response(&mut self, body: impl AsRef<[u8]>) -> HandlerResult {
        if self.is_started() {
            return Err(RouteError::internal("response already sent"));
        }

        let body = body.as_ref();
        self.set_default_headers(body);
        self.write_status_line();
        self.write_headers();
        self.write_body(body);
        Ok(())
    }

    pub fn send_text(&mut self, status: StatusCode, message: &str) -> HandlerResult {
        self.status = status;
        self.send_response(message.as_bytes())
    }

    pub fn send_bad_request(&mut self, message: &str) -> HandlerResult {
        self.send_text(StatusCode::BadRequest, message)
    }

    pub fn send_not_found(&mut self, message: &str) -> HandlerResult {
        self.send_text(StatusCode::NotFound, message)
    }

    pub fn send_method_not_allowed(&mut self, message: &str) -> HandlerResult {
        self.send_text(StatusCode::MethodNotAllowed, message)
    }

    pub fn send_internal_server_error(&mut self, message: &str) -> HandlerResult {
        self.send_text(StatusCode::InternalServerError, message)
    }

    /// Serializes `value` as the JSON body of a response with `status`.
    pub fn send_json<T: Serialize + ?Sized>(&mut self, value: &T, status: StatusCode) -> HandlerResult {
        let body = serde_json::to_vec(value).map_err(|e| {
            tracing::error!(error = %e, "Failed to encode JSON response");
            RouteError::internal("Failed to encode JSON")
        })?;

        self.status = status;
        if !self.headers.contains("Content-Type") {
            let _ = self.headers.set("Content-Type", mime::APPLICATION_JSON);
        }
        self.send_response(body)
    }

    /// Sends a file from disk, typed by its extension.
    pub fn send_file(&mut self, path: impl AsRef<Path>) -> HandlerResult {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(RouteError::not_found("File not found"));
        }

        let contents = std::fs::read(path).map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read file");
            RouteError::internal("Failed to read file")
        })?;

        if !self.headers.contains("Content-Type") {
            let _ = self.headers.set("Content-Type", mime::from_extension(path));
        }
        self.send_response(contents)
    }

    /// Discards anything buffered so an error response can replace it.
    pub fn reset(&mut self) {
        self.status = StatusCode::Ok;
        self.headers.clear();
        self.buffer.clear();
        self.written = 0;
    }

    pub async fn flush_to<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        stream.flush().await?;
        Ok(())
    }
}
