//! Path normalization and `{param}` template matching.

use crate::http::request::Params;

/// Returns true for a `{name}` capture segment.
pub fn is_param(segment: &str) -> bool {
    segment.len() >= 2 && segment.starts_with('{') && segment.ends_with('}')
}

/// Strips the query string and validates the remaining path.
///
/// Paths must start with `/` and use only `[a-zA-Z0-9/_.-]`; anything else
/// normalizes to the empty string.
pub fn clean_path(path: &str) -> &str {
    let path = match path.split_once('?') {
        Some((p, _)) => p,
        None => path,
    };

    let valid = path.starts_with('/')
        && path
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b'_' | b'.' | b'-'));

    if valid { path } else { "" }
}

/// Splits a path on `/`, dropping the empty leading and trailing segments.
///
/// `/` itself yields no segments.
pub fn split_segments(path: &str) -> Vec<&str> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Capture(String),
}

/// A registered route path such as `/search/{firstID}/ds/{secondID}`.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(raw: &str) -> Self {
        let segments = split_segments(raw)
            .into_iter()
            .map(|seg| {
                if is_param(seg) {
                    Segment::Capture(seg[1..seg.len() - 1].to_string())
                } else {
                    Segment::Literal(seg.to_string())
                }
            })
            .collect();

        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Literal-vs-capture shape, left to right. Compared lexicographically,
    /// a literal at the first differing position ranks higher.
    pub fn specificity(&self) -> Vec<bool> {
        self.segments
            .iter()
            .map(|s| matches!(s, Segment::Literal(_)))
            .collect()
    }

    /// Matches already-split request segments, returning the captures.
    ///
    /// Literal segments compare byte-for-byte; a capture takes whatever
    /// single segment sits in its position.
    pub fn matches(&self, request: &[&str]) -> Option<Params> {
        if request.len() != self.segments.len() {
            return None;
        }

        let mut params = Params::new();
        for (template, actual) in self.segments.iter().zip(request) {
            match template {
                Segment::Capture(name) => params.insert(name.as_str(), *actual),
                Segment::Literal(lit) if lit == actual => {}
                Segment::Literal(_) => return None,
            }
        }

        Some(params)
    }
}
