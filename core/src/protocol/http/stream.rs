/*
 * stream.rs
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

//! Pull-based buffered byte stream with pushback.
//!
//! A `ByteStream` asks its `Source` for more bytes only when a read cannot be satisfied from
//! the buffer, and never hands out more than was asked for. Bytes a consumer over-read can be
//! returned with `unread`, so several messages can be parsed one after another from one stream.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use bytes::{Bytes, BytesMut};

use crate::error::{Error, Result};

/// Size requested from the source per fill when reading to end of stream.
const READ_ALL_CHUNK: usize = 2048;

/// Supplier of bytes for a `ByteStream`.
pub trait Source {
    /// Return at most `max` bytes. An empty buffer means nothing is available yet;
    /// `None` means the source has ended.
    fn fill(&mut self, max: usize) -> Result<Option<Bytes>>;

    /// True once the source knows it has nothing more to give, without another `fill` call.
    fn exhausted(&self) -> bool {
        false
    }
}

impl<F> Source for F
where
    F: FnMut(usize) -> Result<Option<Bytes>>,
{
    fn fill(&mut self, max: usize) -> Result<Option<Bytes>> {
        self(max)
    }
}

/// Buffered cursor over a `Source`. Front of the buffer is the next byte to be consumed.
pub struct ByteStream {
    buffer: BytesMut,
    underlying_eof: bool,
    source: Option<Box<dyn Source>>,
}

impl ByteStream {
    pub fn new(source: impl Source + 'static) -> Self {
        Self::with_buffer(&[], source)
    }

    /// Stream over a fill closure: `fill(max)` returns up to `max` bytes, empty for
    /// "nothing yet", or `None` at end of input.
    pub fn from_fn<F>(fill: F) -> Self
    where
        F: FnMut(usize) -> Result<Option<Bytes>> + 'static,
    {
        Self::new(fill)
    }

    /// Stream that yields `initial` before the source is ever consulted.
    pub fn with_buffer(initial: impl AsRef<[u8]>, source: impl Source + 'static) -> Self {
        Self {
            buffer: BytesMut::from(initial.as_ref()),
            underlying_eof: false,
            source: Some(Box::new(source)),
        }
    }

    /// Stream over a fixed byte sequence with no underlying source.
    pub fn from_bytes(data: impl AsRef<[u8]>) -> Self {
        Self {
            buffer: BytesMut::from(data.as_ref()),
            underlying_eof: true,
            source: None,
        }
    }

    /// True when the buffer is empty and the source has ended.
    pub fn eof(&self) -> bool {
        self.buffer.is_empty() && self.underlying_eof
    }

    /// Treat the source as ended without asking it. Buffered bytes remain readable.
    pub fn mark_eof(&mut self) {
        self.underlying_eof = true;
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Put `data` back at the front of the buffer; the next read returns it first.
    pub fn unread(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let mut front = BytesMut::with_capacity(data.len() + self.buffer.len());
        front.extend_from_slice(data);
        front.extend_from_slice(&self.buffer);
        self.buffer = front;
    }

    /// Read up to `count` bytes. Buffered bytes are returned without consulting the source;
    /// otherwise the source is asked once. May return fewer bytes than requested (including
    /// none, when the source has nothing yet). `None` only at end of stream.
    pub fn read(&mut self, count: usize) -> Result<Option<Bytes>> {
        if self.eof() {
            return Ok(None);
        }
        if count > 0 && self.buffer.is_empty() && !self.underlying_eof {
            self.fill(count)?;
        }
        self.drain(count)
    }

    /// Read until the source ends and return everything.
    pub fn read_to_end(&mut self) -> Result<Option<Bytes>> {
        if self.eof() {
            return Ok(None);
        }
        while !self.underlying_eof {
            self.fill(READ_ALL_CHUNK)?;
        }
        let len = self.buffer.len();
        self.drain(len)
    }

    /// Read exactly `count` bytes, filling repeatedly. Fewer are returned only if the
    /// source ends first.
    pub fn read_exactly(&mut self, count: usize) -> Result<Option<Bytes>> {
        if self.eof() {
            return Ok(None);
        }
        while self.buffer.len() < count && !self.underlying_eof {
            self.fill(count - self.buffer.len())?;
        }
        self.drain(count)
    }

    fn drain(&mut self, count: usize) -> Result<Option<Bytes>> {
        if self.eof() {
            return Ok(None);
        }
        let n = count.min(self.buffer.len());
        Ok(Some(self.buffer.split_to(n).freeze()))
    }

    fn fill(&mut self, max: usize) -> Result<()> {
        let source = match self.source.as_mut() {
            Some(s) => s,
            None => {
                self.underlying_eof = true;
                return Ok(());
            }
        };
        match source.fill(max)? {
            Some(data) => self.buffer.extend_from_slice(&data),
            None => self.underlying_eof = true,
        }
        if source.exhausted() {
            self.underlying_eof = true;
        }
        Ok(())
    }
}

/// `Ok(0)` means end of stream only. A source with nothing available yet surfaces as
/// `ErrorKind::WouldBlock`.
impl io::Read for ByteStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match ByteStream::read(self, buf.len()).map_err(into_io)? {
            Some(data) if data.is_empty() && !buf.is_empty() => {
                Err(io::ErrorKind::WouldBlock.into())
            }
            Some(data) => {
                buf[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
            None => Ok(0),
        }
    }
}

fn into_io(e: Error) -> io::Error {
    match e {
        Error::Io(e) => e,
        Error::Timeout => io::Error::new(io::ErrorKind::TimedOut, e),
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

/// Shared handle to a `ByteStream`. A connection's stream is shared between the session and
/// the parser reading the current message; a body stream is shared between the message and
/// the session that may have to drain it.
#[derive(Clone)]
pub struct SharedStream(Rc<RefCell<ByteStream>>);

impl SharedStream {
    pub fn new(stream: ByteStream) -> Self {
        Self(Rc::new(RefCell::new(stream)))
    }

    pub fn read(&self, count: usize) -> Result<Option<Bytes>> {
        self.0.borrow_mut().read(count)
    }

    pub fn read_to_end(&self) -> Result<Option<Bytes>> {
        self.0.borrow_mut().read_to_end()
    }

    pub fn read_exactly(&self, count: usize) -> Result<Option<Bytes>> {
        self.0.borrow_mut().read_exactly(count)
    }

    pub fn unread(&self, data: &[u8]) {
        self.0.borrow_mut().unread(data)
    }

    pub fn eof(&self) -> bool {
        self.0.borrow().eof()
    }

    pub fn mark_eof(&self) {
        self.0.borrow_mut().mark_eof()
    }

    pub fn buffered_len(&self) -> usize {
        self.0.borrow().buffered_len()
    }

    /// True when both handles refer to the same stream.
    pub fn same_stream(&self, other: &SharedStream) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl From<ByteStream> for SharedStream {
    fn from(stream: ByteStream) -> Self {
        Self::new(stream)
    }
}

impl io::Read for SharedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut *self.0.borrow_mut(), buf)
    }
}
