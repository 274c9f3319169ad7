/*
 * connection.rs
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

//! Connection plumbing: the transport seam a `Session` talks through, the default TCP/TLS
//! transport, and the link that turns transport reads into a byte-stream source.
//!
//! Sockets stay in blocking mode. Before each read the link checks whether data is
//! available and, while it is not, hands the transport and the remaining time to a wait
//! hook until the read timeout passes.

use std::cell::RefCell;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::rc::Rc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use rustls::pki_types::ServerName;
use rustls::ClientConnection;
use tracing::{debug, trace};

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::net;
use crate::protocol::http::stream::Source;
use crate::uri::Uri;

/// Outcome of a single transport read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// This many bytes were placed at the front of the buffer.
    Data(usize),
    /// Nothing to read yet.
    WouldBlock,
    /// The peer closed the connection.
    Eof,
}

/// Direction tag passed to the traffic log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Send,
    Recv,
}

/// An open byte channel to a server. For TLS, reads and writes carry plaintext.
pub trait Transport {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome>;

    /// True when a read would return data or end of stream without blocking.
    fn bytes_available(&mut self) -> io::Result<bool>;

    /// Block for at most `timeout` or until the transport becomes readable.
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()>;

    fn is_open(&self) -> bool;
}

/// Opens transports for a session.
pub trait Connector {
    fn connect(&mut self, uri: &Uri, config: &SessionConfig) -> Result<Box<dyn Transport>>;
}

/// Invoked while waiting for data with the transport and the time left before timeout.
pub type WaitHook = Box<dyn FnMut(&mut dyn Transport, Duration) -> io::Result<()>>;

/// Receives every byte sent and received, tagged by direction.
pub type TrafficLog = Box<dyn FnMut(Direction, &[u8])>;

pub(crate) fn default_wait_hook() -> WaitHook {
    Box::new(|transport, remaining| transport.wait_readable(remaining))
}

/// Plain TCP or TLS stream.
pub enum HttpStream {
    Plain(TcpStream),
    Tls(Box<rustls::StreamOwned<ClientConnection, TcpStream>>),
}

impl HttpStream {
    fn socket(&self) -> &TcpStream {
        match self {
            HttpStream::Plain(s) => s,
            HttpStream::Tls(s) => &s.sock,
        }
    }
}

/// Probe the socket without blocking: true if a read would return data or end of stream.
fn socket_readable(sock: &TcpStream) -> io::Result<bool> {
    sock.set_nonblocking(true)?;
    let mut peek_buf = [0u8; 1];
    let peeked = sock.peek(&mut peek_buf);
    sock.set_nonblocking(false)?;
    match peeked {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
        Err(e) => Err(e),
    }
}

fn tls_io(e: rustls::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

/// Default transport over `HttpStream`.
pub struct TcpTransport {
    stream: HttpStream,
    open: bool,
}

impl TcpTransport {
    pub fn new(stream: HttpStream) -> Self {
        Self { stream, open: true }
    }
}

impl Transport for TcpTransport {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        match &mut self.stream {
            HttpStream::Plain(s) => {
                s.write_all(data)?;
                s.flush()
            }
            HttpStream::Tls(s) => {
                s.write_all(data)?;
                s.flush()
            }
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        let result = match &mut self.stream {
            HttpStream::Plain(s) => s.read(buf),
            HttpStream::Tls(s) => s.read(buf),
        };
        match result {
            Ok(0) => Ok(ReadOutcome::Eof),
            Ok(n) => Ok(ReadOutcome::Data(n)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(ReadOutcome::WouldBlock),
            // peer closed without close_notify
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(ReadOutcome::Eof),
            Err(e) => Err(e),
        }
    }

    fn bytes_available(&mut self) -> io::Result<bool> {
        let tls = match &mut self.stream {
            HttpStream::Plain(s) => return socket_readable(s),
            HttpStream::Tls(s) => &mut **s,
        };
        let state = tls.conn.process_new_packets().map_err(tls_io)?;
        if state.plaintext_bytes_to_read() > 0 || state.peer_has_closed() {
            return Ok(true);
        }
        if !socket_readable(&tls.sock)? {
            return Ok(false);
        }
        if tls.conn.read_tls(&mut tls.sock)? == 0 {
            return Ok(true);
        }
        let state = tls.conn.process_new_packets().map_err(tls_io)?;
        Ok(state.plaintext_bytes_to_read() > 0 || state.peer_has_closed())
    }

    fn wait_readable(&mut self, timeout: Duration) -> io::Result<()> {
        if timeout.is_zero() {
            return Ok(());
        }
        let sock = self.stream.socket();
        sock.set_read_timeout(Some(timeout))?;
        let mut peek_buf = [0u8; 1];
        let peeked = sock.peek(&mut peek_buf);
        sock.set_read_timeout(None)?;
        match peeked {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        if let HttpStream::Tls(s) = &mut self.stream {
            s.conn.send_close_notify();
            let tls = &mut **s;
            let _ = tls.conn.complete_io(&mut tls.sock);
        }
        match self.stream.socket().shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Connects over TCP, adding a TLS handshake for `https` URIs.
#[derive(Debug, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(&mut self, uri: &Uri, config: &SessionConfig) -> Result<Box<dyn Transport>> {
        let host = uri.hostname();
        let port = uri.port();
        let tcp = TcpStream::connect((host, port))?;
        tcp.set_nodelay(true)?;
        debug!(host, port, "connected");
        if !uri.is_tls() {
            return Ok(Box::new(TcpTransport::new(HttpStream::Plain(tcp))));
        }
        let server_name = ServerName::try_from(host)
            .map_err(|_| Error::Certificate(format!("invalid server name {:?}", host)))?
            .to_owned();
        let mut conn = ClientConnection::new(net::client_config(config)?, server_name)?;
        let mut tcp = tcp;
        while conn.is_handshaking() {
            conn.complete_io(&mut tcp)?;
        }
        debug!(host, port, "TLS handshake complete");
        let stream = rustls::StreamOwned::new(conn, tcp);
        Ok(Box::new(TcpTransport::new(HttpStream::Tls(Box::new(stream)))))
    }
}

/// Bytes requested from the transport per receive when the caller has no size in mind.
const RECEIVE_SIZE: usize = 1024;

/// The session's hold on its current transport. Each connection gets a new generation so
/// streams of an earlier connection never read from a later one.
pub(crate) struct Link {
    transport: Option<Box<dyn Transport>>,
    generation: u64,
    read_timeout: Duration,
    wait_hook: WaitHook,
    log: Option<TrafficLog>,
}

impl Link {
    pub(crate) fn new(read_timeout: Duration) -> Self {
        Self {
            transport: None,
            generation: 0,
            read_timeout,
            wait_hook: default_wait_hook(),
            log: None,
        }
    }

    /// Adopt a new transport and return its generation.
    pub(crate) fn attach(&mut self, transport: Box<dyn Transport>) -> u64 {
        self.generation += 1;
        self.transport = Some(transport);
        self.generation
    }

    pub(crate) fn is_open(&self) -> bool {
        self.transport.as_ref().map_or(false, |t| t.is_open())
    }

    pub(crate) fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    pub(crate) fn set_wait_hook(&mut self, hook: WaitHook) {
        self.wait_hook = hook;
    }

    pub(crate) fn set_log(&mut self, log: Option<TrafficLog>) {
        self.log = log;
    }

    pub(crate) fn bytes_available(&mut self) -> Result<bool> {
        match self.transport.as_mut() {
            Some(t) if t.is_open() => Ok(t.bytes_available()?),
            _ => Ok(false),
        }
    }

    pub(crate) fn close(&mut self) -> Result<()> {
        if let Some(mut transport) = self.transport.take() {
            transport.close()?;
            debug!("connection closed");
        }
        Ok(())
    }

    pub(crate) fn send(&mut self, data: &[u8]) -> Result<()> {
        let transport = match self.transport.as_mut() {
            Some(t) if t.is_open() => t,
            _ => return Err(Error::ConnectionClosed),
        };
        transport.write_all(data)?;
        trace!(bytes = data.len(), "sent");
        if let Some(log) = self.log.as_mut() {
            log(Direction::Send, data);
        }
        Ok(())
    }

    /// Up to `max` bytes from the transport of `generation`. Waits for data until the read
    /// timeout passes; empty when the read would block; `None` at end of stream.
    pub(crate) fn receive(&mut self, generation: u64, max: usize) -> Result<Option<Bytes>> {
        if generation != self.generation {
            return Ok(None);
        }
        let transport = match self.transport.as_mut() {
            Some(t) if t.is_open() => t,
            _ => return Ok(None),
        };
        let deadline = Instant::now() + self.read_timeout;
        while !transport.bytes_available()? {
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::Timeout);
            }
            (self.wait_hook)(&mut **transport, deadline - now)?;
        }
        let mut buf = vec![0u8; max.max(1)];
        match transport.read(&mut buf)? {
            ReadOutcome::Data(n) => {
                buf.truncate(n);
                trace!(bytes = n, "received");
                if let Some(log) = self.log.as_mut() {
                    log(Direction::Recv, &buf);
                }
                Ok(Some(Bytes::from(buf)))
            }
            ReadOutcome::WouldBlock => Ok(Some(Bytes::new())),
            ReadOutcome::Eof => {
                debug!("connection closed by peer");
                transport.close()?;
                Ok(None)
            }
        }
    }
}

/// Byte-stream source reading one connection generation through a shared `Link`.
pub(crate) struct LinkSource {
    link: Rc<RefCell<Link>>,
    generation: u64,
}

impl LinkSource {
    pub(crate) fn new(link: Rc<RefCell<Link>>, generation: u64) -> Self {
        Self { link, generation }
    }
}

impl Source for LinkSource {
    fn fill(&mut self, max: usize) -> Result<Option<Bytes>> {
        let max = if max == 0 { RECEIVE_SIZE } else { max };
        self.link.borrow_mut().receive(self.generation, max)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// In-memory transport: records writes, replays queued reads.
    #[derive(Default)]
    pub(crate) struct Script {
        pub(crate) written: Vec<u8>,
        pub(crate) reads: VecDeque<ReadOutcome>,
        pub(crate) data: VecDeque<Bytes>,
        pub(crate) open: bool,
        pub(crate) closes: usize,
    }

    pub(crate) struct ScriptTransport(pub(crate) Rc<RefCell<Script>>);

    impl Transport for ScriptTransport {
        fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
            self.0.borrow_mut().written.extend_from_slice(data);
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
            let mut script = self.0.borrow_mut();
            match script.reads.pop_front() {
                Some(ReadOutcome::Data(_)) => {
                    let data = script.data.pop_front().unwrap_or_default();
                    buf[..data.len()].copy_from_slice(&data);
                    Ok(ReadOutcome::Data(data.len()))
                }
                Some(other) => Ok(other),
                None => Ok(ReadOutcome::Eof),
            }
        }

        fn bytes_available(&mut self) -> io::Result<bool> {
            Ok(!self.0.borrow().reads.is_empty())
        }

        fn wait_readable(&mut self, _timeout: Duration) -> io::Result<()> {
            Ok(())
        }

        fn close(&mut self) -> io::Result<()> {
            let mut script = self.0.borrow_mut();
            script.open = false;
            script.closes += 1;
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.0.borrow().open
        }
    }

    fn scripted(link: &mut Link) -> (Rc<RefCell<Script>>, u64) {
        let script = Rc::new(RefCell::new(Script { open: true, ..Script::default() }));
        let generation = link.attach(Box::new(ScriptTransport(script.clone())));
        (script, generation)
    }

    #[test]
    fn receive_reads_logs_and_closes_at_eof() {
        let mut link = Link::new(Duration::from_secs(1));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        link.set_log(Some(Box::new(move |dir, data: &[u8]| {
            sink.borrow_mut().push((dir, data.to_vec()))
        })));
        let (script, generation) = scripted(&mut link);
        {
            let mut s = script.borrow_mut();
            s.reads.extend([ReadOutcome::Data(0), ReadOutcome::WouldBlock, ReadOutcome::Eof]);
            s.data.push_back(Bytes::from_static(b"hello"));
        }
        link.send(b"ping").unwrap();
        assert_eq!(link.receive(generation, 16).unwrap().unwrap(), "hello");
        assert_eq!(link.receive(generation, 16).unwrap().unwrap(), "");
        assert_eq!(link.receive(generation, 16).unwrap(), None);
        assert!(!link.is_open());
        assert_eq!(script.borrow().closes, 1);
        assert_eq!(script.borrow().written, b"ping");
        assert_eq!(
            *seen.borrow(),
            vec![(Direction::Send, b"ping".to_vec()), (Direction::Recv, b"hello".to_vec())]
        );
        assert!(matches!(link.send(b"late"), Err(Error::ConnectionClosed)));
    }

    #[test]
    fn receive_times_out_after_waiting() {
        let mut link = Link::new(Duration::from_millis(20));
        let waits = Rc::new(RefCell::new(0));
        let counter = waits.clone();
        link.set_wait_hook(Box::new(move |_transport, remaining| {
            *counter.borrow_mut() += 1;
            std::thread::sleep(remaining);
            Ok(())
        }));
        let (script, generation) = scripted(&mut link);
        assert!(matches!(link.receive(generation, 16), Err(Error::Timeout)));
        assert!(*waits.borrow() >= 1);
        assert!(script.borrow().open, "timeout must not close the connection");
    }

    #[test]
    fn earlier_generation_sees_end_of_stream() {
        let mut link = Link::new(Duration::from_secs(1));
        let (_, first) = scripted(&mut link);
        let (script, second) = scripted(&mut link);
        script.borrow_mut().reads.push_back(ReadOutcome::Data(0));
        script.borrow_mut().data.push_back(Bytes::from_static(b"new"));
        assert_eq!(link.receive(first, 16).unwrap(), None);
        assert_eq!(link.receive(second, 16).unwrap().unwrap(), "new");
    }
}
