//! HTTP transport for SOAP envelopes.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client as HttpClient;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use tracing::trace;

use crate::config::ClientConfig;
use crate::error::{TransportError, WsmanError};

/// Content type of every request.
pub const SOAP_CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";

/// Raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// `WWW-Authenticate` header, if present
    pub www_authenticate: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            www_authenticate: None,
            body: body.into(),
        }
    }

    /// A 401 carrying `challenge`.
    pub fn unauthorized(challenge: impl Into<String>) -> Self {
        Self {
            status: 401,
            www_authenticate: Some(challenge.into()),
            body: Vec::new(),
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Performs one HTTP POST of an envelope to the management endpoint.
pub trait HttpTransport: Send + Sync {
    fn post(&self, body: &str, authorization: Option<&str>)
        -> Result<HttpResponse, TransportError>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    fn post(
        &self,
        body: &str,
        authorization: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        (**self).post(body, authorization)
    }
}

impl<T: HttpTransport + ?Sized> HttpTransport for Box<T> {
    fn post(
        &self,
        body: &str,
        authorization: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        (**self).post(body, authorization)
    }
}

/// Blocking reqwest transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: HttpClient,
    url: String,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Build a transport for the endpoint and TLS options in `config`.
    pub fn new(config: &ClientConfig) -> Result<Self, WsmanError> {
        let timeout = config.connection.timeout();
        let client = HttpClient::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(
                config.connection.use_tls && config.connection.self_signed_allowed,
            )
            .build()
            .map_err(|e| WsmanError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.endpoint_url(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl HttpTransport for ReqwestTransport {
    fn post(
        &self,
        body: &str,
        authorization: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .body(body.to_owned());
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }

        let response = request.send().map_err(|e| self.classify(e))?;
        let status = response.status().as_u16();
        let www_authenticate = select_challenge(
            response
                .headers()
                .get_all(WWW_AUTHENTICATE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );
        let body = response.bytes().map_err(|e| self.classify(e))?.to_vec();

        trace!(url = %self.url, status, bytes = body.len(), "HTTP exchange complete");

        Ok(HttpResponse {
            status,
            www_authenticate,
            body,
        })
    }
}

impl ReqwestTransport {
    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Connection(err.to_string())
        }
    }
}

/// Pick the Digest challenge among several `WWW-Authenticate` values.
///
/// Falls back to the first value so a non-Digest scheme is still reported.
pub fn select_challenge<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut first = None;
    for value in values {
        let is_digest = value
            .trim_start()
            .get(..6)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("digest"));
        if is_digest {
            return Some(value.to_string());
        }
        first.get_or_insert(value);
    }
    first.map(String::from)
}
