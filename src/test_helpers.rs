// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Shared test utilities to reduce duplication across test modules.

use crate::dispatch::{ClientResponse, HttpClient};
use crate::error::DispatchError;
use crate::exchange::{Exchange, Request, Response};
use crate::headers::Headers;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// Create a request with headers and a JSON body
pub fn make_test_request() -> Request {
    let mut req = Request::new("POST", "http://example.com/api?q=1");
    req.headers.insert("Host", "example.com");
    req.headers.insert("Content-Type", "application/json");
    req.body = Some("{\"a\": 1}".to_string());
    req
}

/// Create a response carrying the canonical reason phrase for `status`
pub fn make_test_response(status: u16) -> Response {
    let mut resp = Response::new(status);
    resp.reason = canonical_reason(status);
    resp.headers.insert("Content-Type", "text/plain");
    resp.body = Some("ok".to_string());
    resp
}

/// Create an exchange around `make_test_request`, optionally with a response
pub fn make_test_exchange(id: &str, status: Option<u16>) -> Exchange {
    let mut ex = Exchange::new(id, make_test_request());
    ex.response = status.map(make_test_response);
    ex
}

/// Unique socket path under the temp dir, short enough for `sun_path`
pub fn make_temp_socket_path(tag: &str) -> PathBuf {
    let id = Uuid::new_v4().simple().to_string();
    std::env::temp_dir().join(format!("anv_{}_{}.sock", tag, &id[..12]))
}

pub fn stub_response(status: u16, body: &str) -> ClientResponse {
    ClientResponse {
        status,
        reason: canonical_reason(status),
        headers: Headers::new(),
        body: Bytes::from(body.to_string()),
    }
}

fn canonical_reason(status: u16) -> String {
    hyper::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or_default()
        .to_string()
}

type Responder =
    Box<dyn Fn(&Request) -> (Duration, Result<ClientResponse, DispatchError>) + Send + Sync>;

/// In-memory `HttpClient` that records every request it is asked to send.
pub struct StubClient {
    sent: Mutex<Vec<Request>>,
    responder: Responder,
}

impl StubClient {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&Request) -> (Duration, Result<ClientResponse, DispatchError>) + Send + Sync + 'static,
    {
        Self {
            sent: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    /// Answer every request immediately with `status` and `body`
    pub fn ok(status: u16, body: &str) -> Self {
        let body = body.to_string();
        Self::new(move |_| (Duration::ZERO, Ok(stub_response(status, &body))))
    }

    /// Fail every request with the error produced by `make_error`
    pub fn failing<F>(make_error: F) -> Self
    where
        F: Fn() -> DispatchError + Send + Sync + 'static,
    {
        Self::new(move |_| (Duration::ZERO, Err(make_error())))
    }

    pub fn sent_urls(&self) -> Vec<String> {
        self.sent
            .lock()
            .map(|sent| sent.iter().map(|r| r.url.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl HttpClient for StubClient {
    async fn send(
        &self,
        request: &Request,
        timeout: Duration,
    ) -> Result<ClientResponse, DispatchError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(request.clone());
        }
        let (delay, result) = (self.responder)(request);
        if delay > timeout {
            tokio::time::sleep(timeout).await;
            return Err(DispatchError::Timeout(timeout));
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }
}
