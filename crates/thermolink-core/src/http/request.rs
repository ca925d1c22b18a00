//! Request-line and header parsing for the HTTP service.

use super::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other,
}

impl Method {
    fn from_token(token: &str) -> Self {
        match token {
            "GET" => Self::Get,
            "POST" => Self::Post,
            _ => Self::Other,
        }
    }
}

/// A parsed request borrowing from the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    pub method: Method,
    /// Request target without its query string
    pub path: &'a str,
    pub body: &'a [u8],
}

impl<'a> Request<'a> {
    /// Parse a request from whatever has been received so far.
    ///
    /// A missing blank line is tolerated (the body is then empty), and a body
    /// longer than `Content-Length` is cut to the announced length.
    pub fn parse(buf: &'a [u8]) -> Result<Self, ParseError> {
        let (head, body) = match header_end(buf) {
            Some(end) => (&buf[..end], &buf[end + 4..]),
            None => (buf, &buf[buf.len()..]),
        };
        let head = core::str::from_utf8(head).map_err(|_| ParseError::NotUtf8)?;

        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap_or_default();
        let mut parts = request_line.split_ascii_whitespace();
        let method = parts.next().ok_or(ParseError::RequestLine)?;
        let target = parts.next().ok_or(ParseError::RequestLine)?;
        if !target.starts_with('/') {
            return Err(ParseError::RequestLine);
        }
        let path = match target.split_once('?') {
            Some((path, _query)) => path,
            None => target,
        };

        let body = match content_length(lines) {
            Some(len) if len < body.len() => &body[..len],
            _ => body,
        };

        Ok(Self {
            method: Method::from_token(method),
            path,
            body,
        })
    }
}

/// Index of the `\r\n\r\n` that ends the header block.
fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length<'h>(headers: impl Iterator<Item = &'h str>) -> Option<usize> {
    headers
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
}

/// Total request size once the head is complete, `None` while it is not.
///
/// Saturates, so an absurd `Content-Length` just means "read until the
/// buffer is full".
pub(super) fn expected_len(buf: &[u8]) -> Option<usize> {
    let end = header_end(buf)?;
    let head = core::str::from_utf8(&buf[..end]).ok()?;
    let body_len = content_length(head.split("\r\n").skip(1)).unwrap_or(0);
    Some((end + 4).saturating_add(body_len))
}
