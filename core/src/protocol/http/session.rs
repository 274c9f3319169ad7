/*
 * session.rs
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

//! Keep-alive HTTP/1.1 session against one host.
//!
//! A session owns at most one connection and the byte stream reading from it. Each request
//! is written whole (streamed bodies piece by piece) and answered with a parser over the
//! connection stream. Before the next request goes out, any unread body of the previous
//! response is read and discarded so its bytes are not taken for the next status line.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::error::Result;
use crate::protocol::http::connection::{
    default_wait_hook, Connector, Direction, Link, LinkSource, TcpConnector, Transport,
};
use crate::protocol::http::h1::{BodySlot, ResponseParser};
use crate::protocol::http::request::{Method, Request};
use crate::protocol::http::response::Response;
use crate::protocol::http::stream::{ByteStream, SharedStream};
use crate::protocol::http::transmission::{chunk_encode, Body, Transmission};
use crate::uri::Uri;

/// Bytes pulled from a streamed request body per chunk written.
const SEND_CHUNK: usize = 8192;

/// One keep-alive connection to the host named by `uri`, opened on first use.
pub struct Session {
    uri: Uri,
    config: SessionConfig,
    connector: Box<dyn Connector>,
    link: Rc<RefCell<Link>>,
    stream: Option<SharedStream>,
    /// Body of the previous exchange, published once its headers were parsed.
    pending: Option<BodySlot>,
}

impl Session {
    /// Session for `url` with default configuration, connecting over TCP (TLS for `https`).
    pub fn new(url: &str) -> Result<Self> {
        Self::with_config(url, SessionConfig::default())
    }

    pub fn with_config(url: &str, config: SessionConfig) -> Result<Self> {
        Ok(Self::with_connector(Uri::parse(url)?, config, TcpConnector))
    }

    /// Session that opens its connections through `connector`.
    pub fn with_connector(uri: Uri, config: SessionConfig, connector: impl Connector + 'static) -> Self {
        let link = Link::new(config.read_timeout);
        Self {
            uri,
            config,
            connector: Box::new(connector),
            link: Rc::new(RefCell::new(link)),
            stream: None,
            pending: None,
        }
    }

    /// Scheme, credentials, host and port used for every request. Path and query are ignored.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Replace the configuration. TLS settings apply from the next connection on.
    pub fn set_config(&mut self, config: SessionConfig) {
        self.link.borrow_mut().set_read_timeout(config.read_timeout);
        self.config = config;
    }

    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.link.borrow_mut().set_read_timeout(timeout);
        self.config.read_timeout = timeout;
    }

    /// Install the hook called while waiting for data, with the transport and the time left
    /// before the read times out. The default blocks on the socket.
    pub fn set_wait_hook<F>(&mut self, hook: F)
    where
        F: FnMut(&mut dyn Transport, Duration) -> io::Result<()> + 'static,
    {
        self.link.borrow_mut().set_wait_hook(Box::new(hook));
    }

    pub fn reset_wait_hook(&mut self) {
        self.link.borrow_mut().set_wait_hook(default_wait_hook());
    }

    /// Install a callback receiving every byte sent and received.
    pub fn set_traffic_log<F>(&mut self, log: F)
    where
        F: FnMut(Direction, &[u8]) + 'static,
    {
        self.link.borrow_mut().set_log(Some(Box::new(log)));
    }

    pub fn clear_traffic_log(&mut self) {
        self.link.borrow_mut().set_log(None);
    }

    pub fn is_open(&self) -> bool {
        self.link.borrow().is_open()
    }

    /// True when response bytes are buffered or waiting on the connection.
    pub fn bytes_available(&self) -> Result<bool> {
        if self.stream.as_ref().map_or(false, |s| s.buffered_len() > 0) {
            return Ok(true);
        }
        self.link.borrow_mut().bytes_available()
    }

    /// Close the connection. Unread response bodies end; the next request reconnects.
    pub fn close(&mut self) -> Result<()> {
        self.stream = None;
        self.pending = None;
        self.link.borrow_mut().close()
    }

    /// Open a new connection, replacing any current one.
    pub fn establish_connection(&mut self) -> Result<SharedStream> {
        self.link.borrow_mut().close()?;
        self.pending = None;
        debug!(uri = %self.uri.scheme_and_authority(), "connecting");
        let transport = self.connector.connect(&self.uri, &self.config)?;
        let generation = self.link.borrow_mut().attach(transport);
        let stream = SharedStream::new(ByteStream::new(LinkSource::new(self.link.clone(), generation)));
        self.stream = Some(stream.clone());
        Ok(stream)
    }

    /// Session URI with path and query taken from `target` (e.g. `/search?q=1`).
    pub fn request_uri(&self, target: &str) -> Uri {
        let mut uri = self.uri.clone();
        uri.set_target(target);
        uri
    }

    /// Request for `target` on this session's host, ready to adjust before `request`.
    pub fn build_request(&self, method: Method, target: &str) -> Request {
        Request::new(method, self.request_uri(target))
    }

    /// Send `request` and return a parser for the response without reading it. Drive the
    /// parser with `parse` until ready, or call `response` to block.
    ///
    /// The verbs below block. Their polling form is `dispatch` of a `build_request`:
    ///
    /// ```no_run
    /// # use httpwire_core::{Method, Session};
    /// # fn main() -> httpwire_core::Result<()> {
    /// let mut session = Session::new("https://example.com")?;
    /// let request = session.build_request(Method::Post, "/items").with_body("{}");
    /// let mut parser = session.dispatch(request)?;
    /// while !parser.is_ready() {
    ///     parser.parse()?;
    /// }
    /// let response = parser.response()?;
    /// # let _ = response;
    /// # Ok(())
    /// # }
    /// ```
    pub fn dispatch(&mut self, mut request: Request) -> Result<ResponseParser> {
        if request.header("connection").is_none() {
            request.set_header("connection", "keep-alive");
        }
        self.finish_previous()?;
        let reuse = if self.is_open() { self.stream.clone() } else { None };
        let stream = match reuse {
            Some(stream) => stream,
            None => self.establish_connection()?,
        };
        self.write_request(&request)?;
        let slot = BodySlot::default();
        self.pending = Some(slot.clone());
        Ok(ResponseParser::with_body_slot(stream, slot))
    }

    /// Send `request` and wait for the response headers. The body is read on demand.
    pub fn request(&mut self, request: Request) -> Result<Response> {
        self.dispatch(request)?.response()
    }

    /// Blocking GET of `target`, resolved against the session URI. See `dispatch` for the
    /// polling form.
    pub fn get(&mut self, target: &str) -> Result<Response> {
        let request = self.build_request(Method::Get, target);
        self.request(request)
    }

    pub fn head(&mut self, target: &str) -> Result<Response> {
        let request = self.build_request(Method::Head, target);
        self.request(request)
    }

    pub fn delete(&mut self, target: &str) -> Result<Response> {
        let request = self.build_request(Method::Delete, target);
        self.request(request)
    }

    pub fn post(&mut self, target: &str, body: impl Into<Body>) -> Result<Response> {
        let request = self.build_request(Method::Post, target).with_body(body);
        self.request(request)
    }

    pub fn put(&mut self, target: &str, body: impl Into<Body>) -> Result<Response> {
        let request = self.build_request(Method::Put, target).with_body(body);
        self.request(request)
    }

    pub fn patch(&mut self, target: &str, body: impl Into<Body>) -> Result<Response> {
        let request = self.build_request(Method::Patch, target).with_body(body);
        self.request(request)
    }

    /// Discard what remains of the previous response. If its headers never arrived the
    /// connection position is unknown, so the connection is dropped instead.
    fn finish_previous(&mut self) -> Result<()> {
        let slot = match self.pending.take() {
            Some(slot) => slot,
            None => return Ok(()),
        };
        let body = slot.borrow_mut().take();
        match body {
            Some(body) if !body.is_finished() => {
                let n = body.drain()?;
                debug!(bytes = n, "drained unread response body");
            }
            Some(_) => {}
            None => {
                warn!("previous response abandoned before its headers; reconnecting");
                self.stream = None;
                self.link.borrow_mut().close()?;
            }
        }
        Ok(())
    }

    fn send(&self, data: &[u8]) -> Result<()> {
        self.link.borrow_mut().send(data)
    }

    fn write_request(&self, request: &Request) -> Result<()> {
        let source = match request.body() {
            Body::Literal(_) => return self.send(&request.render_full()?),
            Body::Stream(source) => source,
        };
        self.send(request.render_head().as_bytes())?;
        let chunked = request.sends_chunked();
        while let Some(piece) = source.read(SEND_CHUNK)? {
            if piece.is_empty() {
                continue;
            }
            if chunked {
                self.send(&chunk_encode(&piece))?;
            } else {
                self.send(&piece)?;
            }
        }
        if chunked {
            self.send(&chunk_encode(b""))?;
        }
        Ok(())
    }
}
