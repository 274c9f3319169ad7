/*
 * body.rs
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

//! Body framing sources. Each wraps the connection stream and yields only this message's
//! body bytes, leaving anything after the body on the connection stream.

use bytes::{Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::http::h1::parser::LineReader;
use crate::protocol::http::stream::{SharedStream, Source};

/// Body of known length. Ends exactly when the count reaches zero, so the final read does
/// not need a trailing empty fill to be seen as the end.
pub(crate) struct ContentLengthBody {
    upstream: SharedStream,
    remaining: u64,
}

impl ContentLengthBody {
    pub(crate) fn new(upstream: SharedStream, length: u64) -> Self {
        Self { upstream, remaining: length }
    }
}

impl Source for ContentLengthBody {
    fn fill(&mut self, max: usize) -> Result<Option<Bytes>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let want = (max as u64).min(self.remaining) as usize;
        match self.upstream.read(want)? {
            Some(data) => {
                self.remaining -= data.len() as u64;
                Ok(Some(data))
            }
            None => {
                // connection ended short of the declared length
                self.remaining = 0;
                Ok(None)
            }
        }
    }

    fn exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Chunked transfer decoding: `<hex size>[;ext]\r\n<data>\r\n` repeated, ended by a
/// zero-size chunk. Chunk data is never read past its boundary.
///
/// A pull decodes at most one chunk, and only when the caller asks for at least as many
/// bytes as are already decoded. A pause between chunks therefore never holds back data
/// that has arrived.
pub(crate) struct ChunkedBody {
    upstream: SharedStream,
    lines: LineReader,
    /// Bytes left in the open chunk; zero when the next thing on the wire is a size line.
    chunk_remaining: u64,
    decoded: BytesMut,
    finished: bool,
}

/// Largest single read from the upstream while copying chunk data.
const CHUNK_READ_SIZE: u64 = 8192;

impl ChunkedBody {
    pub(crate) fn new(upstream: SharedStream) -> Self {
        Self {
            upstream,
            lines: LineReader::default(),
            chunk_remaining: 0,
            decoded: BytesMut::new(),
            finished: false,
        }
    }

    /// Decode through the end of one chunk: the open one, or else the next on the wire.
    /// Stops early when the upstream has nothing available yet.
    fn decode_chunk(&mut self) -> Result<()> {
        if self.chunk_remaining == 0 && !self.open_chunk()? {
            return Ok(());
        }
        while self.chunk_remaining > 0 {
            if !self.read_chunk_data()? {
                break;
            }
        }
        Ok(())
    }

    /// Read a size line. Returns true when a chunk with data is now open.
    fn open_chunk(&mut self) -> Result<bool> {
        let line = match self.lines.next_line(&self.upstream) {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(false),
            Err(Error::EndOfStream) => {
                self.finished = true;
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        let size = parse_chunk_size(&line)?;
        if size == 0 {
            self.read_boundary()?;
            self.finished = true;
            return Ok(false);
        }
        self.chunk_remaining = size;
        Ok(true)
    }

    /// Copy data of the open chunk. Returns false when no progress was made.
    fn read_chunk_data(&mut self) -> Result<bool> {
        let want = self.chunk_remaining.min(CHUNK_READ_SIZE) as usize;
        match self.upstream.read(want)? {
            None => {
                self.chunk_remaining = 0;
                self.finished = true;
                Ok(false)
            }
            Some(data) if data.is_empty() => Ok(false),
            Some(data) => {
                self.chunk_remaining -= data.len() as u64;
                self.decoded.extend_from_slice(&data);
                if self.chunk_remaining == 0 {
                    self.read_boundary()?;
                }
                Ok(true)
            }
        }
    }

    /// Consume the CRLF after chunk data. End of stream here is accepted.
    fn read_boundary(&mut self) -> Result<()> {
        match self.upstream.read_exactly(2)? {
            None => Ok(()),
            Some(b) if &b[..] == b"\r\n" || b.len() < 2 => Ok(()),
            Some(b) => Err(Error::encoding(format!("bad chunk boundary {:?}", b))),
        }
    }
}

impl Source for ChunkedBody {
    fn fill(&mut self, max: usize) -> Result<Option<Bytes>> {
        // asking for exactly what is decoded still looks ahead, so a trailing zero chunk
        // is seen with the last data
        if !self.finished && max >= self.decoded.len() {
            self.decode_chunk()?;
        }
        if self.decoded.is_empty() {
            return Ok(if self.finished { None } else { Some(Bytes::new()) });
        }
        let n = max.min(self.decoded.len());
        Ok(Some(self.decoded.split_to(n).freeze()))
    }

    fn exhausted(&self) -> bool {
        self.finished && self.decoded.is_empty()
    }
}

/// Hex size from a chunk-size line; extensions after `;` are ignored.
fn parse_chunk_size(line: &[u8]) -> Result<u64> {
    let text = std::str::from_utf8(line).map_err(|_| Error::encoding("invalid chunk size line"))?;
    let hex = text.split(';').next().unwrap_or_default().trim();
    u64::from_str_radix(hex, 16).map_err(|_| Error::encoding(format!("invalid chunk size {:?}", hex)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::http::stream::tests::{blob, byte_at_a_time};
    use crate::protocol::http::stream::ByteStream;

    fn chunked(upstream: ByteStream) -> (SharedStream, ByteStream) {
        let upstream = SharedStream::new(upstream);
        let body = ByteStream::new(ChunkedBody::new(upstream.clone()));
        (upstream, body)
    }

    #[test]
    fn chunk_sizes() {
        assert_eq!(parse_chunk_size(b"0").unwrap(), 0);
        assert_eq!(parse_chunk_size(b"1A").unwrap(), 26);
        assert_eq!(parse_chunk_size(b"ff;name=value").unwrap(), 255);
        assert!(matches!(parse_chunk_size(b"zz"), Err(Error::Encoding(_))));
        assert!(matches!(parse_chunk_size(b""), Err(Error::Encoding(_))));
    }

    #[test]
    fn chunked_reads_never_exceed_request() {
        let (_, mut body) = chunked(blob(b"a\r\n0123456789\r\n0\r\n\r\n"));
        assert_eq!(body.read(4).unwrap().unwrap(), "0123");
        assert_eq!(body.read(4).unwrap().unwrap(), "4567");
        assert_eq!(body.read(4).unwrap().unwrap(), "89");
        assert!(body.eof());
    }

    #[test]
    fn chunk_extensions_are_ignored() {
        let (upstream, mut body) = chunked(byte_at_a_time(b"3;x=y\r\nabc\r\n0;last\r\n\r\nnext"));
        assert_eq!(body.read_to_end().unwrap().unwrap(), "abc");
        assert_eq!(upstream.read_to_end().unwrap().unwrap(), "next");
    }

    #[test]
    fn bad_boundary_is_encoding_error() {
        let (_, mut body) = chunked(blob(b"3\r\nabcXY0\r\n\r\n"));
        assert!(matches!(body.read_to_end(), Err(Error::Encoding(_))));
    }

    #[test]
    fn end_of_stream_terminates_leniently() {
        let (_, mut body) = chunked(blob(b"3\r\nabc"));
        assert_eq!(body.read_to_end().unwrap().unwrap(), "abc");
        assert!(body.eof());

        let (_, mut body) = chunked(blob(b"3\r\nabc\r\n"));
        assert_eq!(body.read_to_end().unwrap().unwrap(), "abc");
        assert!(body.eof());
    }

    #[test]
    fn chunked_waits_when_nothing_available() {
        let mut pieces = vec![
            Some(Bytes::from_static(b"4\r\nwi")),
            Some(Bytes::new()),
            Some(Bytes::new()),
            Some(Bytes::from_static(b"ki\r\n0\r\n\r\n")),
        ]
        .into_iter();
        let upstream = ByteStream::from_fn(move |_max| Ok(pieces.next().flatten()));
        let (_, mut body) = chunked(upstream);
        assert_eq!(body.read(10).unwrap().unwrap(), "wi");
        assert_eq!(body.read(10).unwrap().unwrap(), "");
        assert!(!body.eof());
        assert_eq!(body.read(10).unwrap().unwrap(), "ki");
        assert!(!body.eof());
        assert_eq!(body.read(10).unwrap(), None);
        assert!(body.eof());
    }

    #[test]
    fn complete_chunk_is_returned_before_the_next_arrives() {
        for max in [1024, 5] {
            let mut first = Some(Bytes::from_static(b"5\r\nhello\r\n"));
            let upstream = ByteStream::from_fn(move |_max| match first.take() {
                Some(data) => Ok(Some(data)),
                None => Err(Error::Timeout),
            });
            let (_, mut body) = chunked(upstream);
            assert_eq!(body.read(max).unwrap().unwrap(), "hello");
            assert!(matches!(body.read(max), Err(Error::Timeout)));
        }
    }

    #[test]
    fn one_chunk_per_read() {
        let (upstream, mut body) = chunked(blob(b"2\r\nab\r\n2\r\ncd\r\n0\r\n\r\n"));
        assert_eq!(body.read(10).unwrap().unwrap(), "ab");
        assert_eq!(upstream.buffered_len(), 12);
        assert_eq!(body.read(10).unwrap().unwrap(), "cd");
        assert!(!body.eof());
        assert_eq!(body.read(10).unwrap(), None);
        assert!(body.eof());
    }

    #[test]
    fn content_length_stops_at_length() {
        let upstream = SharedStream::new(byte_at_a_time(b"hello world"));
        let mut body = ByteStream::new(ContentLengthBody::new(upstream.clone(), 5));
        assert_eq!(body.read_exactly(5).unwrap().unwrap(), "hello");
        assert!(body.eof());
        assert_eq!(body.read(1).unwrap(), None);
        assert_eq!(upstream.read_to_end().unwrap().unwrap(), " world");
    }

    #[test]
    fn content_length_short_stream_ends_body() {
        let upstream = SharedStream::new(blob(b"abc"));
        let mut body = ByteStream::new(ContentLengthBody::new(upstream, 10));
        assert_eq!(body.read_to_end().unwrap().unwrap(), "abc");
        assert!(body.eof());
    }
}
