/*
 * response.rs
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

//! HTTP response: status code and text on top of the shared message model.

use crate::error::{Error, Result};
use crate::protocol::http::transmission::{Body, Headers, Transmission, HTTP_1_1};

#[derive(Debug, Clone)]
pub struct Response {
    protocol: String,
    status_code: Option<u16>,
    status_text: String,
    headers: Headers,
    body: Body,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            protocol: HTTP_1_1.to_string(),
            status_code: None,
            status_text: String::new(),
            headers: Headers::new(),
            body: Body::default(),
        }
    }
}

impl Response {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            status_code: Some(code),
            status_text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Status code; `None` until a status line has been parsed or set.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn set_status_code(&mut self, code: Option<u16>) {
        self.status_code = code;
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn set_status_text(&mut self, text: impl Into<String>) {
        self.status_text = text.into();
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status_code, Some(200..=299))
    }

    /// Apply a status line `PROTOCOL CODE [TEXT]`. The text may contain spaces.
    pub(crate) fn apply_status_line(&mut self, line: &str) -> Result<()> {
        let mut parts = line.splitn(3, ' ');
        let protocol = parts.next().unwrap_or_default();
        let code = parts
            .next()
            .and_then(|c| c.parse::<u16>().ok())
            .ok_or_else(|| Error::parse(format!("malformed status line {:?}", line)))?;
        if protocol.is_empty() {
            return Err(Error::parse(format!("malformed status line {:?}", line)));
        }
        self.protocol = protocol.to_string();
        self.status_code = Some(code);
        self.status_text = parts.next().unwrap_or_default().to_string();
        Ok(())
    }
}

impl Transmission for Response {
    fn protocol(&self) -> &str {
        &self.protocol
    }

    fn set_protocol(&mut self, protocol: &str) {
        self.protocol = protocol.to_string();
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    fn body(&self) -> &Body {
        &self.body
    }

    fn set_body(&mut self, body: Body) {
        self.body = body;
    }

    fn render_start_line(&self) -> String {
        let code = self.status_code.map(|c| c.to_string()).unwrap_or_default();
        format!("{} {} {}\r\n", self.protocol, code, self.status_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::http::stream::ByteStream;

    fn text_plain() -> Response {
        Response::new(200, "OK").with_header("content-type", "text/plain")
    }

    #[test]
    fn literal_body_gets_content_length() {
        let rsp = text_plain().with_body("body");
        assert_eq!(
            rsp.render_head(),
            "HTTP/1.1 200 OK\r\nContent-length: 4\r\nContent-type: text/plain\r\n\r\n"
        );
        assert_eq!(
            rsp.render_full().unwrap(),
            "HTTP/1.1 200 OK\r\nContent-length: 4\r\nContent-type: text/plain\r\n\r\nbody"
        );
    }

    #[test]
    fn stream_body_gets_chunked_framing() {
        let rsp = text_plain().with_body(ByteStream::from_bytes("body"));
        assert_eq!(
            rsp.render_head(),
            "HTTP/1.1 200 OK\r\nContent-type: text/plain\r\nTransfer-encoding: chunked\r\n\r\n"
        );
        assert_eq!(
            rsp.render_full().unwrap(),
            "HTTP/1.1 200 OK\r\nContent-type: text/plain\r\nTransfer-encoding: chunked\r\n\r\n\
             4\r\nbody\r\n0\r\n\r\n"
        );
    }

    #[test]
    fn status_line() {
        let mut rsp = Response::default();
        assert_eq!(rsp.status_code(), None);
        rsp.apply_status_line("HTTP/1.1 404 Not Found").unwrap();
        assert_eq!(rsp.status_code(), Some(404));
        assert_eq!(rsp.status_text(), "Not Found");
        assert!(!rsp.is_success());

        rsp.apply_status_line("HTTP/1.0 204").unwrap();
        assert_eq!(rsp.protocol(), "HTTP/1.0");
        assert_eq!(rsp.status_text(), "");

        assert!(matches!(rsp.apply_status_line("HTTP/1.1 abc OK"), Err(Error::Parse(_))));
        assert!(matches!(rsp.apply_status_line("garbage"), Err(Error::Parse(_))));
    }
}
