// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Outbound HTTP sending shared by bulk and replay dispatch.

use crate::error::DispatchError;
use crate::exchange::{Request, Response};
use crate::headers::Headers;
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Uri};
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as LegacyClient;
use hyper_util::rt::TokioExecutor;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

// Hop-by-hop headers plus Content-Length: the body is re-framed on send.
static SKIPPED_HEADERS: &[&str] = &[
    "connection",
    "content-length",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Per-call sending parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    pub timeout: Duration,
    /// Verify server certificates. Off by default for testing targets.
    pub verify_tls: bool,
    /// Maximum bulk items in flight; 1 sends strictly one after another.
    pub bulk_concurrency: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            verify_tls: false,
            bulk_concurrency: 1,
        }
    }
}

/// Response as received from the network.
#[derive(Debug, Clone)]
pub struct ClientResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl ClientResponse {
    /// Structured response; the body is decoded lossily as UTF-8.
    pub fn to_response(&self) -> Response {
        let body = String::from_utf8_lossy(&self.body);
        Response {
            status: self.status,
            reason: self.reason.clone(),
            headers: self.headers.clone(),
            body: (!body.is_empty()).then(|| body.into_owned()),
        }
    }
}

/// Capability to send one request over the network.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(
        &self,
        request: &Request,
        timeout: Duration,
    ) -> Result<ClientResponse, DispatchError>;
}

/// Strip whitespace and stray quoting/bracket characters around a url token.
pub fn clean_url(url: &str) -> &str {
    url.trim()
        .trim_matches(|c: char| matches!(c, '\'' | '"' | '[' | ']'))
}

/// Parse the url, requiring both a scheme and a host.
///
/// Characters a `Uri` refuses (`<`, `>`, `"`, spaces, non-ASCII) are
/// percent-encoded rather than rejected, so payload values still go out.
pub fn validate_url(url: &str) -> Result<Uri, DispatchError> {
    let malformed = || DispatchError::MalformedUrl(url.to_string());
    let parsed = url::Url::parse(url).map_err(|_| malformed())?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(malformed());
    }
    parsed.as_str().parse::<Uri>().map_err(|_| malformed())
}

/// Validate a request's url and send it. No network I/O happens for an invalid url.
pub async fn dispatch<C: HttpClient + ?Sized>(
    client: &C,
    request: &Request,
    timeout: Duration,
) -> Result<ClientResponse, DispatchError> {
    let mut request = request.clone();
    request.url = clean_url(&request.url).to_string();
    validate_url(&request.url)?;
    client.send(&request, timeout).await
}

/// `HttpClient` backed by the hyper legacy client over rustls.
pub struct HyperClient {
    client: LegacyClient<hyper_rustls::HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl HyperClient {
    pub fn new(settings: &DispatchSettings) -> anyhow::Result<Self> {
        let connector = if settings.verify_tls {
            HttpsConnectorBuilder::new().with_native_roots()?
        } else {
            HttpsConnectorBuilder::new().with_tls_config(insecure_tls_config()?)
        };
        let https = connector
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();
        let client = LegacyClient::builder(TokioExecutor::new()).build(https);
        Ok(Self { client })
    }

    fn build(&self, request: &Request) -> Result<hyper::Request<Full<Bytes>>, DispatchError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| DispatchError::InvalidRequest(e.to_string()))?;
        let uri = validate_url(&request.url)?;

        let mut builder = hyper::Request::builder().method(method).uri(uri);
        for (name, value) in request.headers.iter() {
            if SKIPPED_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
                continue;
            }
            builder = builder.header(name, value);
        }
        let body = request
            .body
            .as_ref()
            .map(|b| Bytes::from(b.clone()))
            .unwrap_or_default();
        builder
            .body(Full::new(body))
            .map_err(|e| DispatchError::InvalidRequest(e.to_string()))
    }
}

#[async_trait]
impl HttpClient for HyperClient {
    async fn send(
        &self,
        request: &Request,
        timeout: Duration,
    ) -> Result<ClientResponse, DispatchError> {
        let req = self.build(request)?;
        let exchange = async {
            let resp = self
                .client
                .request(req)
                .await
                .map_err(|e| DispatchError::Network(describe(&e)))?;
            let status = resp.status();
            let headers = Headers::from(resp.headers());
            let body = resp
                .into_body()
                .collect()
                .await
                .map_err(|e| DispatchError::Network(e.to_string()))?
                .to_bytes();
            Ok::<_, DispatchError>(ClientResponse {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                headers,
                body,
            })
        };
        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| DispatchError::Timeout(timeout))?
    }
}

fn insecure_tls_config() -> anyhow::Result<rustls::ClientConfig> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    Ok(rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(NoServerVerification(provider)))
        .with_no_client_auth())
}

// The legacy client's Display omits the cause (e.g. "connection refused").
fn describe(e: &(dyn std::error::Error + 'static)) -> String {
    let mut msg = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        msg.push_str(": ");
        msg.push_str(&s.to_string());
        source = s.source();
    }
    msg
}

/// Accepts any server certificate; signatures are still checked with the provider.
#[derive(Debug)]
struct NoServerVerification(Arc<rustls::crypto::CryptoProvider>);

impl ServerCertVerifier for NoServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[rstest]
    #[case("  'http://h/x'  ", "http://h/x")]
    #[case("[http://h/x]", "http://h/x")]
    #[case("\"http://h/x\"", "http://h/x")]
    #[case("http://h/x", "http://h/x")]
    fn clean_url_strips_wrapping(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(clean_url(raw), expected);
    }

    #[rstest]
    #[case("http://example.com/a?b=1", true)]
    #[case("https://127.0.0.1:8443/", true)]
    #[case("http://h/?q=<script>alert(1)</script>", true)]
    #[case("http://h/?q=a\"b", true)]
    #[case("http://h/a b?x=é", true)]
    #[case("mailto:someone@example.com", false)]
    #[case("/relative/path", false)]
    #[case("example.com/path", false)]
    #[case("not a url", false)]
    fn url_requires_scheme_and_host(#[case] url: &str, #[case] ok: bool) {
        assert_eq!(validate_url(url).is_ok(), ok);
    }

    #[tokio::test]
    async fn hyper_client_sends_headers_and_body() -> anyhow::Result<()> {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(header("x-token", "abc"))
            .and(body_string("user=a"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("x-reply", "yes")
                    .set_body_string("created"),
            )
            .mount(&mock)
            .await;

        let client = HyperClient::new(&DispatchSettings::default())?;
        let mut req = Request::new("POST", format!("{}/login", mock.uri()));
        req.headers.insert("X-Token", "abc");
        req.headers.insert("Content-Length", "999");
        req.body = Some("user=a".into());

        let resp = dispatch(&client, &req, DEFAULT_TIMEOUT).await?;
        assert_eq!(resp.status, 201);
        assert_eq!(resp.reason, "Created");
        assert_eq!(resp.headers.get("x-reply"), Some("yes"));
        assert_eq!(&resp.body[..], b"created");
        assert_eq!(resp.to_response().body.as_deref(), Some("created"));
        Ok(())
    }

    #[tokio::test]
    async fn connection_refused_is_a_network_error() -> anyhow::Result<()> {
        let client = HyperClient::new(&DispatchSettings::default())?;
        let req = Request::new("GET", "http://127.0.0.1:9/");
        let err = dispatch(&client, &req, DEFAULT_TIMEOUT)
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected failure"))?;
        assert!(matches!(err, DispatchError::Network(_)));
        Ok(())
    }

    #[tokio::test]
    async fn slow_response_times_out() -> anyhow::Result<()> {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&mock)
            .await;

        let client = HyperClient::new(&DispatchSettings::default())?;
        let req = Request::new("GET", mock.uri());
        let err = dispatch(&client, &req, Duration::from_millis(100))
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected timeout"))?;
        assert!(matches!(err, DispatchError::Timeout(_)));
        Ok(())
    }

    #[tokio::test]
    async fn invalid_method_is_rejected_before_sending() -> anyhow::Result<()> {
        let client = HyperClient::new(&DispatchSettings::default())?;
        let req = Request::new("GE T", "http://127.0.0.1:9/");
        let err = client.send(&req, DEFAULT_TIMEOUT).await.err();
        assert!(matches!(err, Some(DispatchError::InvalidRequest(_))));
        Ok(())
    }
}
