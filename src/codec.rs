// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Conversion between raw exchange text and structured requests/responses.
//!
//! Text layout:
//!
//! ```text
//! METHOD URL                 (request)   |  HTTP <status> <reason>   (response)
//! Name: Value
//! Name: Value
//!
//! body...
//! ```
//!
//! Header parsing stops at the first line that is not a `Name: Value` pair.
//! That line and everything after it form the body, even if some later lines
//! look like headers.
//!
//! Header values and the body are trimmed when parsed. Serializing then
//! parsing yields the same record only when no header value and no body has
//! leading or trailing whitespace; otherwise that whitespace is lost.

use crate::error::MalformedExchange;
use crate::exchange::{Exchange, Request, Response};
use crate::headers::Headers;
use std::fmt;

/// Parse a raw request block.
pub fn parse_request(text: &str) -> Result<Request, MalformedExchange> {
    let (start, rest) = split_block(text)?;
    let mut tokens = start.split_whitespace();
    let (method, url) = match (tokens.next(), tokens.next()) {
        (Some(m), Some(u)) => (m, u),
        _ => return Err(MalformedExchange::RequestLine(start.trim().to_string())),
    };
    let (headers, body) = parse_fields(rest);
    Ok(Request {
        method: method.to_string(),
        url: url.to_string(),
        headers,
        body,
    })
}

/// Parse a raw response block. The status line may carry an `HTTP` or
/// `HTTP/x.y` marker, or start directly with the status code.
pub fn parse_response(text: &str) -> Result<Response, MalformedExchange> {
    let (start, rest) = split_block(text)?;
    let (first, remainder) = split_token(start);
    let (code, reason) = if first.to_ascii_uppercase().starts_with("HTTP") {
        split_token(remainder)
    } else {
        (first, remainder)
    };
    let status = code
        .parse::<u16>()
        .map_err(|_| MalformedExchange::StatusLine(start.trim().to_string()))?;
    let (headers, body) = parse_fields(rest);
    Ok(Response {
        status,
        reason: reason.to_string(),
        headers,
        body,
    })
}

pub fn serialize_request(req: &Request) -> String {
    let start = format!("{} {}", req.method, req.url);
    serialize_block(start, &req.headers, req.body.as_deref())
}

pub fn serialize_response(resp: &Response) -> String {
    let start = if resp.reason.is_empty() {
        format!("HTTP {}", resp.status)
    } else {
        format!("HTTP {} {}", resp.status, resp.reason)
    };
    serialize_block(start, &resp.headers, resp.body.as_deref())
}

/// Request text followed by response text, as shown side by side to operators.
pub fn serialize_exchange(ex: &Exchange) -> String {
    match &ex.response {
        Some(resp) => format!("{}\n\n{}", serialize_request(&ex.request), serialize_response(resp)),
        None => serialize_request(&ex.request),
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serialize_request(self))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serialize_response(self))
    }
}

// Drop surrounding blank lines and return the start line plus the remaining lines.
fn split_block(text: &str) -> Result<(&str, Vec<&str>), MalformedExchange> {
    let lines: Vec<&str> = text.lines().collect();
    let first = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .ok_or(MalformedExchange::Empty)?;
    let last = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .unwrap_or(first);
    Ok((lines[first], lines[first + 1..=last].to_vec()))
}

fn parse_fields(lines: Vec<&str>) -> (Headers, Option<String>) {
    let mut headers = Headers::new();
    let mut body_start = lines.len();
    for (i, line) in lines.iter().enumerate() {
        match parse_header_line(line) {
            Some((name, value)) => {
                headers.insert(name, value);
            }
            None => {
                body_start = i;
                break;
            }
        }
    }
    let body = lines[body_start..].join("\n");
    let body = body.trim();
    let body = (!body.is_empty()).then(|| body.to_string());
    (headers, body)
}

fn parse_header_line(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() || !name.bytes().all(is_tchar) {
        return None;
    }
    Some((name, value.trim()))
}

// RFC 9110 token characters.
fn is_tchar(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim()),
        None => (s, ""),
    }
}

fn serialize_block(start: String, headers: &Headers, body: Option<&str>) -> String {
    let mut out = start;
    for (k, v) in headers.iter() {
        out.push('\n');
        out.push_str(k);
        out.push_str(": ");
        out.push_str(v);
    }
    if let Some(body) = body.filter(|b| !b.is_empty()) {
        out.push_str("\n\n");
        out.push_str(body);
    }
    out
}
