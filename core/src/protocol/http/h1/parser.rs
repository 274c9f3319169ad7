/*
 * parser.rs
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

//! HTTP/1.1 pull parser: start line, headers, then body framing.
//!
//! The parser reads from a shared `ByteStream` and never consumes bytes past the end of the
//! header block; any over-read is pushed back. `parse` may be called repeatedly and advances
//! as far as currently available data allows. Once ready, the message body is a lazy stream
//! framed by chunked encoding, Content-Length, or (neither present) the end of the stream.
//!
//! A second parser must not be started on the same stream until the previous body has been
//! read to its end; with read-until-close framing no second message can follow at all.

use std::cell::RefCell;
use std::rc::Rc;

use bytes::{Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::http::h1::body::{ChunkedBody, ContentLengthBody};
use crate::protocol::http::request::Request;
use crate::protocol::http::response::Response;
use crate::protocol::http::stream::{ByteStream, SharedStream};
use crate::protocol::http::transmission::{is_chunked, Body, Transmission};

/// Bytes asked of the stream per line-read attempt.
const LINE_READ_SIZE: usize = 1024;

/// Where a parser publishes the body it builds, so its owner can drain it later.
pub(crate) type BodySlot = Rc<RefCell<Option<Body>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    StartLine,
    Headers,
    /// Headers received and body framing initialized. The body itself may be unread.
    Ready,
}

/// A message kind a parser can build from the wire.
pub trait Incoming: Transmission + Sized {
    fn blank() -> Self;
    fn apply_start_line(&mut self, line: &str) -> Result<()>;
}

impl Incoming for Request {
    fn blank() -> Self {
        Request::blank()
    }

    fn apply_start_line(&mut self, line: &str) -> Result<()> {
        self.apply_request_line(line)
    }
}

impl Incoming for Response {
    fn blank() -> Self {
        Response::default()
    }

    fn apply_start_line(&mut self, line: &str) -> Result<()> {
        self.apply_status_line(line)
    }
}

/// Find CRLF in `buf`; return the offset of the CR.
pub(crate) fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Reads CRLF-terminated lines, pushing bytes after the terminator back onto the stream.
/// An incomplete line is held here between calls.
#[derive(Default)]
pub(crate) struct LineReader {
    partial: BytesMut,
}

impl LineReader {
    /// Next line without its terminator, or `None` if no complete line is available yet.
    /// Fails with `EndOfStream` if the stream ends first.
    pub(crate) fn next_line(&mut self, stream: &SharedStream) -> Result<Option<Bytes>> {
        loop {
            if let Some(pos) = find_crlf(&self.partial) {
                let mut line = self.partial.split_to(pos + 2);
                line.truncate(pos);
                stream.unread(&self.partial);
                self.partial.clear();
                return Ok(Some(line.freeze()));
            }
            match stream.read(LINE_READ_SIZE)? {
                None => return Err(Error::EndOfStream),
                Some(data) if data.is_empty() => return Ok(None),
                Some(data) => self.partial.extend_from_slice(&data),
            }
        }
    }
}

/// Single-use parser for one request or response.
pub struct Parser<T> {
    stream: SharedStream,
    transmission: T,
    state: ParseState,
    lines: LineReader,
    body_slot: Option<BodySlot>,
}

pub type RequestParser = Parser<Request>;
pub type ResponseParser = Parser<Response>;

impl<T: Incoming> Parser<T> {
    /// Parser over `stream`. Nothing is read until `parse` is called.
    pub fn new(stream: SharedStream) -> Self {
        Self {
            stream,
            transmission: T::blank(),
            state: ParseState::StartLine,
            lines: LineReader::default(),
            body_slot: None,
        }
    }

    pub(crate) fn with_body_slot(stream: SharedStream, slot: BodySlot) -> Self {
        let mut parser = Self::new(stream);
        parser.body_slot = Some(slot);
        parser
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// True once headers are in and the body is initialized; says nothing about the body
    /// having been read.
    pub fn is_ready(&self) -> bool {
        self.state == ParseState::Ready
    }

    /// The message as parsed so far. Incomplete until `is_ready`.
    pub fn transmission(&self) -> &T {
        &self.transmission
    }

    pub fn into_transmission(self) -> T {
        self.transmission
    }

    /// Advance as far as the available data permits.
    pub fn parse(&mut self) -> Result<ParseState> {
        loop {
            match self.state {
                ParseState::StartLine => match self.next_line()? {
                    Some(line) => {
                        self.transmission.apply_start_line(&line)?;
                        self.state = ParseState::Headers;
                    }
                    None => break,
                },
                ParseState::Headers => match self.next_line()? {
                    Some(line) if line.is_empty() => {
                        self.receive_body()?;
                        self.state = ParseState::Ready;
                    }
                    Some(line) => {
                        // lines without a colon carry nothing we can use
                        if let Some((name, value)) = line.split_once(':') {
                            self.transmission.headers_mut().set(name.trim(), value.trim());
                        }
                    }
                    None => break,
                },
                ParseState::Ready => break,
            }
        }
        Ok(self.state)
    }

    /// Parse until ready, pulling from the stream as often as needed, and return the message.
    pub fn finish(mut self) -> Result<T> {
        while !self.is_ready() {
            self.parse()?;
        }
        Ok(self.transmission)
    }

    /// Header lines are bytes on the wire; invalid UTF-8 is replaced rather than rejected.
    fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self
            .lines
            .next_line(&self.stream)?
            .map(|line| String::from_utf8_lossy(&line).into_owned()))
    }

    /// Select body framing: chunked, then Content-Length, then read-until-close.
    fn receive_body(&mut self) -> Result<()> {
        let headers = self.transmission.headers();
        let chunked = headers.get("transfer-encoding").map_or(false, is_chunked);
        let body = if chunked {
            Body::Stream(SharedStream::new(ByteStream::new(ChunkedBody::new(self.stream.clone()))))
        } else if let Some(len) = headers.get("content-length") {
            let len = len
                .trim()
                .parse::<u64>()
                .map_err(|_| Error::parse(format!("invalid content-length {:?}", len)))?;
            let mut body = ByteStream::new(ContentLengthBody::new(self.stream.clone(), len));
            if len == 0 {
                body.mark_eof();
            }
            Body::Stream(SharedStream::new(body))
        } else {
            Body::Stream(self.stream.clone())
        };
        if let Some(slot) = &self.body_slot {
            *slot.borrow_mut() = Some(body.clone());
        }
        self.transmission.set_body(body);
        Ok(())
    }
}

impl Parser<Request> {
    /// Parse until ready and return the request.
    pub fn request(self) -> Result<Request> {
        self.finish()
    }
}

impl Parser<Response> {
    /// Parse until ready and return the response.
    pub fn response(self) -> Result<Response> {
        self.finish()
    }
}
