/*
 * config.rs
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

//! Session configuration: TLS material, certificate verification mode and read timeout.
//! Certificates and keys are PEM text; they are parsed when a TLS connection is made.
//! Defaults that never change at runtime (ports, user agent) live in static tables.

use std::time::Duration;

/// Read timeout applied when none is configured.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// User-Agent sent with every request unless the caller replaces it. Names this crate and
/// its version; set the header on a request to present as another client.
pub const DEFAULT_USER_AGENT: &str = concat!("httpwire/", env!("CARGO_PKG_VERSION"));

/// Accept header sent with every request unless the caller replaces it.
pub const DEFAULT_ACCEPT: &str = "*/*";

/// Well-known port for each supported scheme.
const DEFAULT_PORTS: &[(&str, u16)] = &[("http", 80), ("https", 443)];

/// Default port for `scheme`, if the scheme is known.
pub fn default_port(scheme: &str) -> Option<u16> {
    DEFAULT_PORTS
        .iter()
        .find(|(s, _)| s.eq_ignore_ascii_case(scheme))
        .map(|(_, p)| *p)
}

/// How the server certificate is checked during the TLS handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyMode {
    /// Handshake fails unless the chain verifies against the trust roots.
    #[default]
    Required,
    /// Verification failures are logged and the connection proceeds.
    Optional,
    /// The certificate chain is not checked at all.
    None,
}

/// PEM-encoded TLS material.
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// Trust roots. When unset, the platform store is used (Mozilla roots as fallback).
    pub ca_chain: Option<String>,
    /// Client certificate chain for mutual TLS.
    pub client_cert: Option<String>,
    /// Private key matching `client_cert`.
    pub client_key: Option<String>,
}

impl TlsOptions {
    pub fn has_client_auth(&self) -> bool {
        self.client_cert.is_some() && self.client_key.is_some()
    }
}

/// Configuration surface of a `Session`.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub tls: TlsOptions,
    pub verify: VerifyMode,
    /// Maximum time to wait for data once a response is expected.
    pub read_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tls: TlsOptions::default(),
            verify: VerifyMode::Required,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl SessionConfig {
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_verify(mut self, verify: VerifyMode) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_ca_chain(mut self, pem: impl Into<String>) -> Self {
        self.tls.ca_chain = Some(pem.into());
        self
    }

    pub fn with_client_auth(mut self, cert_pem: impl Into<String>, key_pem: impl Into<String>) -> Self {
        self.tls.client_cert = Some(cert_pem.into());
        self.tls.client_key = Some(key_pem.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_scheme_ports() {
        assert_eq!(default_port("http"), Some(80));
        assert_eq!(default_port("HTTPS"), Some(443));
        assert_eq!(default_port("gopher"), None);
    }

    #[test]
    fn defaults() {
        let c = SessionConfig::default();
        assert_eq!(c.verify, VerifyMode::Required);
        assert_eq!(c.read_timeout, Duration::from_secs(5));
        assert!(!c.tls.has_client_auth());
        let c = c.with_client_auth("cert", "key").with_read_timeout(Duration::from_millis(250));
        assert!(c.tls.has_client_auth());
        assert_eq!(c.read_timeout, Duration::from_millis(250));
    }

    #[test]
    fn user_agent_names_this_crate() {
        assert_eq!(
            DEFAULT_USER_AGENT,
            format!("httpwire/{}", env!("CARGO_PKG_VERSION"))
        );
    }
}
