/*
 * http_integration.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Integration test for the HTTP session. Performs real HTTP and HTTPS requests
 * against a public echo service and verifies the full request/response cycle
 * including TLS handshake, keep-alive reuse and chunked decoding.
 *
 * Run with:
 *   cargo test -p httpwire_core --test http_integration -- --ignored --nocapture
 */

use httpwire_core::{Method, Session, SessionConfig, Transmission, VerifyMode};

#[test]
#[ignore] // requires network; run with: cargo test --test http_integration -- --ignored --nocapture
fn get_over_https_with_keep_alive() {
    let mut session = Session::new("https://httpbin.org").expect("bad URL");

    println!("=== HTTPS Integration Test ===");
    let rsp = session.get("/get?check=1").expect("request failed");
    println!("Status: {:?} {}", rsp.status_code(), rsp.status_text());
    for (name, value) in rsp.headers().iter() {
        println!("{}: {}", name, value);
    }
    let body = rsp.body().read_to_end().expect("body read failed");
    println!("\nBody length: {} bytes", body.len());
    assert_eq!(rsp.status_code(), Some(200));
    assert!(String::from_utf8_lossy(&body).contains("check"));

    // second request on the same connection
    let rsp = session.get("/stream/3").expect("second request failed");
    assert_eq!(rsp.status_code(), Some(200));
    let body = rsp.body().read_to_end().expect("chunked body read failed");
    assert_eq!(String::from_utf8_lossy(&body).lines().count(), 3);
    assert!(session.is_open());

    session.close().expect("close failed");
    println!("\n=== PASS ===");
}

#[test]
#[ignore] // requires network
fn post_over_plain_http() {
    let mut session = Session::with_config(
        "http://httpbin.org",
        SessionConfig::default().with_verify(VerifyMode::Optional),
    )
    .expect("bad URL");
    let mut request = session.build_request(Method::Post, "/post");
    request.set_header("Content-Type", "text/plain");
    let request = request.with_body("hello from httpwire");
    let rsp = session.request(request).expect("request failed");
    assert_eq!(rsp.status_code(), Some(200));
    let body = rsp.body().read_to_end().expect("body read failed");
    assert!(String::from_utf8_lossy(&body).contains("hello from httpwire"));
}
