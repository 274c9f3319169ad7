/*
 * net.rs
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

//! TLS client configuration: trust roots, client certificates and verification mode.
//!
//! Trust roots come from the configured PEM chain when one is given, otherwise from the
//! platform store with the Mozilla roots as fallback.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tracing::warn;

use crate::config::{SessionConfig, TlsOptions, VerifyMode};
use crate::error::{Error, Result};

/// Build a root certificate store: platform native certs first, then webpki-roots as fallback.
fn build_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    match rustls_native_certs::load_native_certs() {
        Ok(certs) => {
            for cert in certs {
                let _ = root_store.add(cert);
            }
        }
        Err(e) => warn!(error = %e, "cannot load platform certificates"),
    }
    if root_store.is_empty() {
        root_store.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    }
    root_store
}

/// Certificates from PEM text. Fails if the text holds none.
fn parse_certs(pem: &str, what: &str) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = pem.as_bytes();
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Certificate(format!("{}: {}", what, e)))?;
    if certs.is_empty() {
        return Err(Error::Certificate(format!("{}: no certificates found", what)));
    }
    Ok(certs)
}

fn parse_key(pem: &str) -> Result<PrivateKeyDer<'static>> {
    let mut reader = pem.as_bytes();
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| Error::Certificate(format!("client_key: {}", e)))?
        .ok_or_else(|| Error::Certificate("client_key: no private key found".to_string()))
}

fn root_store(tls: &TlsOptions) -> Result<RootCertStore> {
    match &tls.ca_chain {
        Some(pem) => {
            let mut store = RootCertStore::empty();
            for cert in parse_certs(pem, "ca_chain")? {
                store.add(cert)?;
            }
            Ok(store)
        }
        None => Ok(build_root_store()),
    }
}

/// TLS client config for HTTP/1.1 built from the session's TLS options and verify mode.
pub fn client_config(config: &SessionConfig) -> Result<Arc<ClientConfig>> {
    let roots = Arc::new(root_store(&config.tls)?);
    let builder = ClientConfig::builder();
    let builder = match config.verify {
        VerifyMode::Required => builder.with_root_certificates(roots),
        mode => {
            let inner = WebPkiServerVerifier::builder(roots)
                .build()
                .map_err(|e| Error::Certificate(e.to_string()))?;
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(RelaxedVerifier { inner, mode }))
        }
    };
    let mut tls = match (&config.tls.client_cert, &config.tls.client_key) {
        (Some(cert), Some(key)) => {
            builder.with_client_auth_cert(parse_certs(cert, "client_cert")?, parse_key(key)?)?
        }
        _ => builder.with_no_client_auth(),
    };
    tls.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(Arc::new(tls))
}

/// Verifier for `VerifyMode::Optional` and `VerifyMode::None`. Chain verification is
/// delegated to WebPKI and its failure tolerated; handshake signatures are always checked.
#[derive(Debug)]
struct RelaxedVerifier {
    inner: Arc<WebPkiServerVerifier>,
    mode: VerifyMode,
}

impl ServerCertVerifier for RelaxedVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        if self.mode == VerifyMode::None {
            return Ok(ServerCertVerified::assertion());
        }
        match self
            .inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
        {
            Ok(verified) => Ok(verified),
            Err(e) => {
                warn!(server = ?server_name, error = %e, "accepting unverified server certificate");
                Ok(ServerCertVerified::assertion())
            }
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_roots() {
        let config = client_config(&SessionConfig::default()).unwrap();
        assert_eq!(config.alpn_protocols, vec![b"http/1.1".to_vec()]);
    }

    #[test]
    fn relaxed_modes_build() {
        for mode in [VerifyMode::Optional, VerifyMode::None] {
            assert!(client_config(&SessionConfig::default().with_verify(mode)).is_ok());
        }
    }

    #[test]
    fn ca_chain_without_certificates_is_rejected() {
        let config = SessionConfig::default().with_ca_chain("not a certificate");
        assert!(matches!(client_config(&config), Err(Error::Certificate(_))));
    }

    #[test]
    fn client_key_must_be_present() {
        assert!(matches!(parse_key(""), Err(Error::Certificate(_))));
    }
}
