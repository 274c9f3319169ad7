/*
 * lib.rs
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

//! Httpwire core: an HTTP/1.1 client engine.
//!
//! - `protocol::http::stream`: pull-based byte stream with pushback.
//! - `protocol::http::h1`: incremental request/response parser and body framing
//!   (content-length, chunked, read-until-close).
//! - `protocol::http::session`: one keep-alive connection, drain-before-reuse, read timeout
//!   and a wait hook for embedding in a foreign event loop.
//! - `net`: rustls client configuration.

pub mod config;
pub mod error;
pub mod net;
pub mod protocol;
pub mod uri;

pub use config::{SessionConfig, TlsOptions, VerifyMode};
pub use error::{Error, Result};
pub use protocol::http::{
    Body, ByteStream, Method, Request, RequestParser, Response, ResponseParser, Session,
    SharedStream, Transmission,
};
pub use uri::Uri;
