use thiserror::Error;

use crate::http::headers::Headers;
use crate::http::request::{Method, Params, Request, Version};

const CRLF: &[u8] = b"\r\n";
const HEADERS_END: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    AwaitingRequestLine,
    AwaitingHeaders,
    AwaitingBody,
    Done,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid request line: expected 3 parts, got {0}")]
    InvalidRequestLine(usize),
    #[error("invalid HTTP method: {0:?}")]
    InvalidMethod(String),
    #[error("unsupported HTTP version: {0:?}")]
    UnsupportedVersion(String),
    #[error("invalid header line: {0:?}")]
    InvalidHeader(String),
    #[error("invalid header name: {0:?}")]
    InvalidHeaderName(String),
    #[error("request head exceeds buffer capacity")]
    RequestTooLarge,
    #[error("request body of {0} bytes exceeds the configured limit")]
    BodyTooLarge(usize),
    #[error("connection closed before the request was complete")]
    UnexpectedEof,
}

#[derive(Debug, Clone)]
struct RequestLine {
    method: Method,
    path: String,
    version: Version,
}

/// Incremental HTTP/1.x request parser.
///
/// Feed it the unconsumed bytes read so far; it returns how many it consumed.
/// `Ok(n)` with the state short of `Done` means more data is needed, which is
/// never an error. Errors are terminal for the request.
#[derive(Debug)]
pub struct RequestParser {
    state: ParseState,
    line: Option<RequestLine>,
    headers: Headers,
    body: Vec<u8>,
    max_body: Option<usize>,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::AwaitingRequestLine,
            line: None,
            headers: Headers::new(),
            body: Vec::new(),
            max_body: None,
        }
    }

    /// Parser that rejects a declared `Content-Length` above `limit`.
    pub fn with_body_limit(limit: usize) -> Self {
        Self {
            max_body: Some(limit),
            ..Self::new()
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParseState::Done
    }

    /// Advances through as many states as `buf` allows.
    pub fn parse(&mut self, buf: &[u8]) -> Result<usize, ParseError> {
        let mut consumed = 0;

        loop {
            let rest = &buf[consumed..];

            match self.state {
                ParseState::AwaitingRequestLine => match parse_request_line(rest)? {
                    Some((line, n)) => {
                        self.line = Some(line);
                        consumed += n;
                        self.state = ParseState::AwaitingHeaders;
                    }
                    None => return Ok(consumed),
                },

                ParseState::AwaitingHeaders => match parse_headers(rest, &mut self.headers)? {
                    Some(n) => {
                        if let (Some(len), Some(limit)) = (self.body_length(), self.max_body) {
                            if len > limit {
                                return Err(ParseError::BodyTooLarge(len));
                            }
                        }
                        consumed += n;
                        self.state = ParseState::AwaitingBody;
                    }
                    None => return Ok(consumed),
                },

                ParseState::AwaitingBody => {
                    let target = match self.body_length() {
                        Some(n) => n,
                        None => {
                            self.state = ParseState::Done;
                            continue;
                        }
                    };

                    let take = (target - self.body.len()).min(rest.len());
                    if take == 0 {
                        return Ok(consumed);
                    }

                    self.body.extend_from_slice(&rest[..take]);
                    consumed += take;

                    if self.body.len() >= target {
                        self.state = ParseState::Done;
                    }
                }

                ParseState::Done => return Ok(consumed),
            }
        }
    }

    /// Handles end-of-stream arriving mid-request.
    ///
    /// A request whose body was still being read is finalized with the
    /// bytes received so far; anything earlier cannot form a request.
    pub fn finish_early(&mut self) -> Result<(), ParseError> {
        match self.state {
            ParseState::AwaitingBody | ParseState::Done => {
                self.state = ParseState::Done;
                Ok(())
            }
            _ => Err(ParseError::UnexpectedEof),
        }
    }

    /// Returns the parsed request once the parser reached `Done`.
    pub fn into_request(self) -> Option<Request> {
        if self.state != ParseState::Done {
            return None;
        }
        let line = self.line?;

        Some(Request {
            method: line.method,
            path: line.path,
            version: line.version,
            headers: self.headers,
            body: self.body,
            params: Params::new(),
        })
    }

    /// Positive `Content-Length`, if any. Missing, non-numeric, or zero
    /// values mean no body is read.
    fn body_length(&self) -> Option<usize> {
        self.headers.content_length().filter(|n| *n > 0)
    }
}

/// Parses a complete request held in `buf`.
///
/// Returns `Ok(None)` while the request is incomplete.
pub fn parse_http_request(buf: &[u8]) -> Result<Option<(Request, usize)>, ParseError> {
    let mut parser = RequestParser::new();
    let consumed = parser.parse(buf)?;
    Ok(parser.into_request().map(|req| (req, consumed)))
}

fn parse_request_line(buf: &[u8]) -> Result<Option<(RequestLine, usize)>, ParseError> {
    let Some(end) = find(buf, CRLF) else {
        return Ok(None);
    };

    let parts: Vec<&[u8]> = buf[..end].split(|b| *b == b' ').collect();
    if parts.len() != 3 {
        return Err(ParseError::InvalidRequestLine(parts.len()));
    }

    let method_token = String::from_utf8_lossy(parts[0]);
    let method = Method::from_str(&method_token)
        .ok_or_else(|| ParseError::InvalidMethod(method_token.to_string()))?;

    let version_token = String::from_utf8_lossy(parts[2]);
    let version = Version::from_str(&version_token)
        .ok_or_else(|| ParseError::UnsupportedVersion(version_token.to_string()))?;

    let line = RequestLine {
        method,
        path: String::from_utf8_lossy(parts[1]).into_owned(),
        version,
    };

    Ok(Some((line, end + CRLF.len())))
}

fn parse_headers(buf: &[u8], headers: &mut Headers) -> Result<Option<usize>, ParseError> {
    // No header lines: the blank line follows the request line directly.
    if buf.starts_with(CRLF) {
        return Ok(Some(CRLF.len()));
    }

    let Some(end) = find(buf, HEADERS_END) else {
        return Ok(None);
    };

    for raw in crlf_lines(&buf[..end]) {
        // Lines are CRLF-delimited; a stray CR or LF is malformed.
        if raw.iter().any(|b| matches!(b, b'\r' | b'\n')) {
            return Err(ParseError::InvalidHeader(String::from_utf8_lossy(raw).into_owned()));
        }
        let line = std::str::from_utf8(raw)
            .map_err(|_| ParseError::InvalidHeader(String::from_utf8_lossy(raw).into_owned()))?;

        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| ParseError::InvalidHeader(line.to_string()))?;

        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(ParseError::InvalidHeaderName(key.to_string()));
        }

        headers
            .set(key, value.trim())
            .map_err(|_| ParseError::InvalidHeaderName(key.to_string()))?;
    }

    Ok(Some(end + HEADERS_END.len()))
}

/// Splits a header block on CRLF only.
fn crlf_lines(mut block: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut done = false;
    std::iter::from_fn(move || {
        if done {
            return None;
        }
        match find(block, CRLF) {
            Some(i) => {
                let line = &block[..i];
                block = &block[i + CRLF.len()..];
                Some(line)
            }
            None => {
                done = true;
                Some(block)
            }
        }
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
}
