/*
 * mod.rs
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

//! HTTP/1.1 client.
//!
//! - Buffers: `bytes` crate (BytesMut for stream and decode buffers, Bytes for payload slices).
//! - Messages: `Transmission` holds protocol, headers and a literal or streamed body;
//!   `Request` and `Response` add their start lines.
//! - Parsing: `h1::Parser` pulls from a `ByteStream` and stops wherever data runs out, so
//!   the same parser serves blocking and polling callers.
//! - Transport: `connection::Transport` is the seam between a `Session` and the network;
//!   `TcpConnector` provides plain TCP and rustls TLS.

mod request;
mod response;

pub mod connection;
pub mod h1;
pub mod session;
pub mod stream;
pub mod transmission;

pub use connection::{
    Connector, Direction, HttpStream, ReadOutcome, TcpConnector, TcpTransport, TrafficLog,
    Transport, WaitHook,
};
pub use h1::{Incoming, ParseState, Parser, RequestParser, ResponseParser};
pub use request::{Method, Request};
pub use response::Response;
pub use session::Session;
pub use stream::{ByteStream, SharedStream, Source};
pub use transmission::{chunk_encode, is_chunked, Body, Headers, Transmission, HTTP_1_1};
