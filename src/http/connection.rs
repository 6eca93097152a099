use std::sync::Arc;

use anyhow::Context;
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, timeout_at};

use crate::http::parser::{ParseError, ParseState, RequestParser};
use crate::http::request::{Request, Version};
use crate::http::response::{RouteError, StatusCode};
use crate::http::writer::ResponseWriter;
use crate::server::app::App;

/// Size of each socket read.
pub const READ_CHUNK_SIZE: usize = 4096;

/// Drives one client connection: read, dispatch, respond, repeat.
pub struct Connection<S> {
    stream: S,
    buffer: BytesMut,
    app: Arc<App>,
    state: ConnectionState,
    deadline: Option<Instant>,
    served: usize,
}

pub enum ConnectionState {
    /// Arm the idle deadline for the next request
    IdleWait,
    /// Read and parse one request
    Parsing,
    /// Route and run the handler chain
    Dispatching(Request, bool), // bool = stream already hit EOF?
    /// Flush the buffered response
    Responding(ResponseWriter, bool), // bool = keep_alive?
    Closed,
}

enum ReadOutcome {
    Complete(Request),
    /// Body cut short by end-of-stream
    Truncated(Request),
    Malformed(ParseError),
    /// Peer closed between requests
    Closed,
    TimedOut,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, app: Arc<App>) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
            app,
            state: ConnectionState::IdleWait,
            deadline: None,
            served: 0,
        }
    }

    /// Number of responses written on this connection.
    pub fn served(&self) -> usize {
        self.served
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::IdleWait => {
                    self.deadline = self.app.idle_timeout().map(|t| Instant::now() + t);
                    self.state = ConnectionState::Parsing;
                }

                ConnectionState::Parsing => {
                    self.state = match self.read_request().await? {
                        ReadOutcome::Complete(req) => ConnectionState::Dispatching(req, false),
                        ReadOutcome::Truncated(req) => ConnectionState::Dispatching(req, true),
                        ReadOutcome::Malformed(err) => {
                            tracing::warn!(error = %err, "Malformed request");
                            ConnectionState::Responding(Self::parse_failure(&err), false)
                        }
                        ReadOutcome::Closed => ConnectionState::Closed,
                        ReadOutcome::TimedOut => {
                            tracing::debug!(served = self.served, "Idle timeout, closing connection");
                            ConnectionState::Closed
                        }
                    };
                }

                ConnectionState::Dispatching(req, eof) => {
                    let writer = self.dispatch(req, eof);
                    let keep_alive = writer.keep_alive();
                    self.state = ConnectionState::Responding(writer, keep_alive);
                }

                ConnectionState::Responding(mut writer, keep_alive) => {
                    match self.deadline {
                        Some(deadline) => timeout_at(deadline, writer.flush_to(&mut self.stream))
                            .await
                            .context("timed out writing response")??,
                        None => writer.flush_to(&mut self.stream).await?,
                    }
                    self.served += 1;

                    self.state = if keep_alive {
                        ConnectionState::IdleWait
                    } else {
                        ConnectionState::Closed
                    };
                }

                ConnectionState::Closed => {
                    let _ = self.stream.shutdown().await;
                    break;
                }
            }
        }

        Ok(())
    }

    /// Routes the request, runs the middleware-wrapped handler, and maps
    /// any failure it reports onto an error response.
    fn dispatch(&self, mut req: Request, eof: bool) -> ResponseWriter {
        let (handler, params) = self.app.resolve(&req);
        req.params = params;

        let keep_alive = req.keep_alive() && !eof;
        let mut writer = ResponseWriter::new(req.version, keep_alive, self.app.idle_timeout());

        tracing::debug!(
            method = %req.method,
            path = %req.path,
            version = %req.version,
            body_len = req.body.len(),
            "Dispatching request"
        );

        match handler.call(&mut writer, &req) {
            Ok(()) => {
                if !writer.is_started() {
                    let _ = writer.send_response(b"");
                }
            }
            Err(err) => {
                if err.code.is_client_error() {
                    tracing::warn!(status = err.code.as_u16(), error = %err, path = %req.path, "Handler failed");
                } else {
                    tracing::error!(status = err.code.as_u16(), error = %err, path = %req.path, "Handler failed");
                }
                writer.reset();
                send_route_error(&mut writer, &err);
            }
        }

        writer
    }

    fn parse_failure(err: &ParseError) -> ResponseWriter {
        let status = match err {
            ParseError::RequestTooLarge | ParseError::BodyTooLarge(_) => StatusCode::PayloadTooLarge,
            _ => StatusCode::BadRequest,
        };

        let mut writer = ResponseWriter::new(Version::Http11, false, None);
        let _ = writer.send_text(status, &err.to_string());
        writer
    }

    /// Reads until one request is parsed.
    ///
    /// Unconsumed bytes stay at the front of `buffer` and are fed to the
    /// next request on this connection.
    async fn read_request(&mut self) -> anyhow::Result<ReadOutcome> {
        let mut parser = RequestParser::with_body_limit(self.app.max_body_bytes());
        let limit = self.app.max_request_bytes();
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            if !self.buffer.is_empty() {
                let consumed = match parser.parse(&self.buffer) {
                    Ok(n) => n,
                    Err(e) => return Ok(ReadOutcome::Malformed(e)),
                };
                self.buffer.advance(consumed);

                if parser.is_done() {
                    return Ok(Self::finish(parser, false));
                }
                if consumed == 0 && self.buffer.len() >= limit {
                    return Ok(ReadOutcome::Malformed(ParseError::RequestTooLarge));
                }
            }

            let read = self.stream.read(&mut chunk);
            let n = match self.deadline {
                Some(deadline) => match timeout_at(deadline, read).await {
                    Ok(res) => res?,
                    Err(_) => return Ok(ReadOutcome::TimedOut),
                },
                None => read.await?,
            };

            if n == 0 {
                if self.buffer.is_empty() && parser.state() == ParseState::AwaitingRequestLine {
                    return Ok(ReadOutcome::Closed);
                }
                return Ok(match parser.finish_early() {
                    Ok(()) => Self::finish(parser, true),
                    Err(e) => ReadOutcome::Malformed(e),
                });
            }

            tracing::trace!(bytes = n, "Read from client");
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    fn finish(parser: RequestParser, truncated: bool) -> ReadOutcome {
        match parser.into_request() {
            Some(req) if truncated => ReadOutcome::Truncated(req),
            Some(req) => ReadOutcome::Complete(req),
            None => ReadOutcome::Malformed(ParseError::UnexpectedEof),
        }
    }
}

/// Maps a handler failure to a response using the fixed status table.
pub fn send_route_error(writer: &mut ResponseWriter, err: &RouteError) {
    let _ = match err.code {
        StatusCode::NotFound => writer.send_not_found(&err.message),
        StatusCode::MethodNotAllowed => writer.send_method_not_allowed(&err.message),
        StatusCode::BadRequest => writer.send_bad_request(&err.message),
        _ => writer.send_internal_server_error(&err.message),
    };
}
