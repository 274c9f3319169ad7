/*
 * error.rs
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

//! Errors raised by the codec, the URI parser and the session.

use std::io;

/// Errors from parsing, framing, transport or TLS.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed start line, header block or status code.
    #[error("parse error: {0}")]
    Parse(String),

    /// Malformed chunked transfer encoding (bad size line or chunk boundary).
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The byte source ended before a line terminator was found.
    #[error("end of stream")]
    EndOfStream,

    /// No data arrived before the read timeout elapsed.
    #[error("timed out")]
    Timeout,

    /// Write attempted on a connection that is not open.
    #[error("connection closed")]
    ConnectionClosed,

    /// Malformed URL.
    #[error("cannot parse {0:?}")]
    UriParse(String),

    /// Unusable certificate or key material in the TLS options.
    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert() {
        let e: Error = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("gone"));
    }
}
