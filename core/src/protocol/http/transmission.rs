/*
 * transmission.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Httpwire, an HTTP/1.1 client engine.
 *
 * Httpwire is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Httpwire is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Httpwire.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Shared model of an HTTP message: protocol version, case-insensitive headers and a body
//! that is either literal bytes or a lazy stream. Renders the header block and chunked framing.

use std::collections::{BTreeMap, HashMap};

use bytes::{Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::http::stream::{ByteStream, SharedStream};

pub const HTTP_1_1: &str = "HTTP/1.1";

/// Header map keyed by lower-cased name. Last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(HashMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// (lower-cased name, value) pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Display form of a header key: first letter upper-cased (`content-length` -> `Content-length`).
fn display_name(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Message body.
#[derive(Clone)]
pub enum Body {
    /// Fixed bytes; framed with Content-Length.
    Literal(Bytes),
    /// Lazy pull source; framed with chunked transfer encoding when sent.
    Stream(SharedStream),
}

impl Default for Body {
    fn default() -> Self {
        Body::Literal(Bytes::new())
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Literal(b) => f.debug_tuple("Literal").field(b).finish(),
            Body::Stream(s) => f
                .debug_struct("Stream")
                .field("buffered", &s.buffered_len())
                .field("eof", &s.eof())
                .finish(),
        }
    }
}

impl Body {
    pub fn is_stream(&self) -> bool {
        matches!(self, Body::Stream(_))
    }

    pub fn literal(&self) -> Option<&Bytes> {
        match self {
            Body::Literal(b) => Some(b),
            Body::Stream(_) => None,
        }
    }

    /// A pull reader over this body. Stream bodies share their read position with every
    /// other handle; a literal body gets a fresh reader starting at its first byte.
    pub fn reader(&self) -> SharedStream {
        match self {
            Body::Literal(b) => SharedStream::new(ByteStream::from_bytes(b)),
            Body::Stream(s) => s.clone(),
        }
    }

    /// Everything not yet read. For a stream this blocks until the body ends.
    pub fn read_to_end(&self) -> Result<Bytes> {
        match self {
            Body::Literal(b) => Ok(b.clone()),
            Body::Stream(s) => Ok(s.read_to_end()?.unwrap_or_default()),
        }
    }

    /// Read and discard the rest of a stream body. Returns the number of bytes discarded.
    pub fn drain(&self) -> Result<usize> {
        match self {
            Body::Literal(_) => Ok(0),
            Body::Stream(s) => Ok(s.read_to_end()?.map_or(0, |b| b.len())),
        }
    }

    /// True when nothing more can be read from a stream body. Literal bodies are never consumed.
    pub fn is_finished(&self) -> bool {
        match self {
            Body::Literal(_) => false,
            Body::Stream(s) => s.eof(),
        }
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Body::Literal(b)
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body::Literal(Bytes::from(v))
    }
}

impl From<&[u8]> for Body {
    fn from(v: &[u8]) -> Self {
        Body::Literal(Bytes::copy_from_slice(v))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Literal(Bytes::from(s))
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Literal(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<SharedStream> for Body {
    fn from(s: SharedStream) -> Self {
        Body::Stream(s)
    }
}

impl From<ByteStream> for Body {
    fn from(s: ByteStream) -> Self {
        Body::Stream(SharedStream::new(s))
    }
}

/// One chunk of chunked transfer encoding: `<hex length>\r\n<data>\r\n`.
/// An empty `data` yields the terminating zero-length chunk.
pub fn chunk_encode(data: &[u8]) -> Bytes {
    let size = format!("{:x}\r\n", data.len());
    let mut out = BytesMut::with_capacity(size.len() + data.len() + 2);
    out.extend_from_slice(size.as_bytes());
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
    out.freeze()
}

/// A request or response: protocol, headers, body, and a kind-specific start line.
pub trait Transmission {
    fn protocol(&self) -> &str;
    fn set_protocol(&mut self, protocol: &str);
    fn headers(&self) -> &Headers;
    fn headers_mut(&mut self) -> &mut Headers;
    fn body(&self) -> &Body;
    fn set_body(&mut self, body: Body);

    /// Start line including its CRLF.
    fn render_start_line(&self) -> String;

    fn header(&self, name: &str) -> Option<&str> {
        self.headers().get(name)
    }

    fn set_header(&mut self, name: &str, value: impl Into<String>)
    where
        Self: Sized,
    {
        self.headers_mut().set(name, value);
    }

    /// Headers as sent: explicit headers plus a framing header when neither is set
    /// (`content-length` for literal bodies, `transfer-encoding: chunked` for streams).
    fn effective_headers(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        let has_framing =
            self.headers().contains("content-length") || self.headers().contains("transfer-encoding");
        if !has_framing {
            match self.body() {
                Body::Literal(b) => {
                    out.insert("content-length".to_string(), b.len().to_string());
                }
                Body::Stream(_) => {
                    out.insert("transfer-encoding".to_string(), "chunked".to_string());
                }
            }
        }
        for (k, v) in self.headers().iter() {
            out.insert(k.to_string(), v.to_string());
        }
        out
    }

    /// True when the body goes on the wire in chunked transfer encoding.
    fn sends_chunked(&self) -> bool {
        self.effective_headers()
            .get("transfer-encoding")
            .map_or(false, |te| is_chunked(te))
    }

    /// Header block sorted by name, terminated by a blank line.
    fn render_headers(&self) -> String {
        let mut r = String::new();
        for (k, v) in self.effective_headers() {
            r.push_str(&display_name(&k));
            r.push_str(": ");
            r.push_str(&v);
            r.push_str("\r\n");
        }
        r.push_str("\r\n");
        r
    }

    /// Start line and header block; the body is left to the caller.
    fn render_head(&self) -> String {
        let mut r = self.render_start_line();
        r.push_str(&self.render_headers());
        r
    }

    fn chunk_encode(&self, data: &[u8]) -> Bytes {
        chunk_encode(data)
    }

    /// Whole message. A stream body is read to its end and buffered here; send large
    /// bodies with `render_head` and `chunk_encode` instead.
    fn render_full(&self) -> Result<Bytes> {
        let head = self.render_head();
        let body = self.body().read_to_end()?;
        let mut out = BytesMut::with_capacity(head.len() + body.len() + 16);
        out.extend_from_slice(head.as_bytes());
        if self.sends_chunked() {
            if !body.is_empty() {
                out.extend_from_slice(&chunk_encode(&body));
            }
            out.extend_from_slice(&chunk_encode(b""));
        } else {
            out.extend_from_slice(&body);
        }
        Ok(out.freeze())
    }
}

/// True when the final transfer coding in `value` is `chunked`.
pub fn is_chunked(value: &str) -> bool {
    value
        .rsplit(',')
        .next()
        .map_or(false, |last| last.trim().eq_ignore_ascii_case("chunked"))
}
