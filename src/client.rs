//! WS-Management client.
//!
//! Sends envelopes over an [`HttpTransport`], authenticating each exchange
//! with Basic or Digest credentials, and classifies the outcome.

use std::borrow::Cow;
use std::fmt::Display;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, warn};

use crate::config::{AuthMode, ClientConfig};
use crate::digest::{Credentials, DigestSession};
use crate::error::{AuthError, TransportError, WsmanError};
use crate::message::{Action, Message, MessageBuilder, MethodInput, ResourceUri, SelectorSet};
use crate::parser::{parse_fault, parse_response_header};
use crate::transport::{HttpTransport, ReqwestTransport};

const HTTP_METHOD: &str = "POST";

enum Authenticator {
    Digest(DigestSession),
    /// Precomputed header; `None` when no credentials are configured
    Basic(Option<String>),
}

/// Blocking WS-Management client bound to one endpoint.
///
/// Message ids and digest state are shared across calls and guarded
/// internally, so a client may be used from several threads.
pub struct Client {
    config: ClientConfig,
    transport: Box<dyn HttpTransport>,
    messages: MessageBuilder,
    auth: Authenticator,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.config.endpoint_url())
            .field("mode", &self.config.auth.mode)
            .finish()
    }
}

impl Client {
    /// Connect to the endpoint described by `config`.
    ///
    /// With digest authentication this performs one priming request to
    /// obtain the first challenge.
    pub fn connect(config: ClientConfig) -> Result<Self, WsmanError> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, transport)
    }

    /// As [`Self::connect`], over a caller-supplied transport.
    pub fn with_transport(
        config: ClientConfig,
        transport: impl HttpTransport + 'static,
    ) -> Result<Self, WsmanError> {
        let credentials = Credentials::new(&config.auth.username, &config.auth.password);
        let auth = match config.auth.mode {
            AuthMode::Digest => Authenticator::Digest(DigestSession::new(credentials)),
            AuthMode::Basic => Authenticator::Basic(basic_header(&credentials)),
        };

        let client = Self {
            messages: MessageBuilder::new()
                .with_destination(config.connection.path.clone())
                .with_operation_timeout(config.connection.operation_timeout.clone()),
            config,
            transport: Box::new(transport),
            auth,
        };

        if let Authenticator::Digest(session) = &client.auth {
            client.prime(session)?;
        }

        debug!(
            endpoint = %client.config.endpoint_url(),
            mode = ?client.config.auth.mode,
            "WS-Management client ready"
        );
        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Envelope builder whose message ids this client correlates against.
    pub fn messages(&self) -> &MessageBuilder {
        &self.messages
    }

    /// Current digest nonce count, when digest authentication is active.
    pub fn nonce_count(&self) -> Option<u32> {
        match &self.auth {
            Authenticator::Digest(session) => session.nonce_count(),
            Authenticator::Basic(_) => None,
        }
    }

    /// Harvest the first digest challenge.
    fn prime(&self, session: &DigestSession) -> Result<(), WsmanError> {
        let response = self.transport.post("", None)?;
        if response.status != 401 {
            return Err(WsmanError::Config(format!(
                "digest authentication requested but {} answered HTTP {} instead of 401",
                self.config.endpoint_url(),
                response.status
            )));
        }
        let challenge = response
            .www_authenticate
            .as_deref()
            .ok_or(AuthError::MissingChallenge)?;
        session.install(challenge)?;
        Ok(())
    }

    fn authorization(&self) -> Result<Option<String>, AuthError> {
        match &self.auth {
            Authenticator::Digest(session) => {
                session.authorize(HTTP_METHOD, &self.config.connection.path)
            }
            Authenticator::Basic(header) => Ok(header.clone()),
        }
    }

    /// POST an envelope and return the raw response body.
    ///
    /// A digest 401 is answered once with a freshly computed header; any
    /// other status of 400 or above is returned as
    /// [`TransportError::Status`] with the body verbatim.
    pub fn post(&self, envelope: &str) -> Result<Vec<u8>, WsmanError> {
        let authorization = self.authorization()?;
        let mut response = self.transport.post(envelope, authorization.as_deref())?;

        if response.status == 401 {
            if let Authenticator::Digest(session) = &self.auth {
                let challenge = response
                    .www_authenticate
                    .as_deref()
                    .ok_or(AuthError::MissingChallenge)?;
                session.install(challenge)?;
                debug!("Digest challenge refreshed, retrying request");

                let authorization =
                    session.authorize(HTTP_METHOD, &self.config.connection.path)?;
                response = self.transport.post(envelope, authorization.as_deref())?;
                if response.status == 401 {
                    warn!(
                        endpoint = %self.config.endpoint_url(),
                        "Credentials rejected after reauthentication"
                    );
                    return Err(AuthError::Rejected.into());
                }
            }
        }

        if response.status >= 400 {
            return Err(TransportError::Status {
                status: response.status,
                body: response.body_text(),
            }
            .into());
        }
        Ok(response.body)
    }

    /// Send `message` and return its correlated response.
    ///
    /// A non-success status whose body is a SOAP Fault is reported as
    /// [`WsmanError::Fault`].
    pub fn execute(&self, message: Message) -> Result<Response, WsmanError> {
        debug!(
            message_id = message.message_id,
            action = %message.action,
            resource_uri = %message.resource_uri,
            "Sending WS-Management request"
        );
        if self.config.logging.log_messages {
            debug!(envelope = %message.envelope, "Request envelope");
        }

        let body = match self.post(&message.envelope) {
            Ok(body) => body,
            Err(WsmanError::Transport(TransportError::Status { status, body })) => {
                return Err(match parse_fault(body.as_bytes()) {
                    Ok(fault) => {
                        debug!(
                            message_id = message.message_id,
                            status,
                            fault = fault.kind().as_str(),
                            "Endpoint returned a fault"
                        );
                        WsmanError::Fault(fault)
                    }
                    Err(_) => TransportError::Status { status, body }.into(),
                });
            }
            Err(err) => return Err(err),
        };

        if self.config.logging.log_messages {
            debug!(
                message_id = message.message_id,
                response = %String::from_utf8_lossy(&body),
                "Response envelope"
            );
        }

        if let Ok(header) = parse_response_header(&body) {
            if let Some(relates_to) = header.relates_to {
                if relates_to.trim() != message.message_id.to_string() {
                    return Err(WsmanError::MalformedResponse(format!(
                        "RelatesTo `{}` does not match MessageID {}",
                        relates_to, message.message_id
                    )));
                }
            }
        }

        Ok(Response {
            message_id: message.message_id,
            action: message.action,
            resource_uri: message.resource_uri,
            body,
        })
    }

    /// Get a class, or one instance when `selectors` is non-empty.
    pub fn get(
        &self,
        resource: &ResourceUri,
        selectors: Option<&SelectorSet>,
    ) -> Result<Response, WsmanError> {
        self.execute(self.messages.get(resource, selectors))
    }

    /// Replace the addressed instance with `instance_xml`.
    pub fn put(
        &self,
        resource: &ResourceUri,
        selectors: Option<&SelectorSet>,
        instance_xml: &str,
    ) -> Result<Response, WsmanError> {
        self.execute(self.messages.put(resource, selectors, instance_xml))
    }

    pub fn create(
        &self,
        resource: &ResourceUri,
        instance_xml: &str,
    ) -> Result<Response, WsmanError> {
        self.execute(self.messages.create(resource, instance_xml))
    }

    pub fn delete(
        &self,
        resource: &ResourceUri,
        selectors: Option<&SelectorSet>,
    ) -> Result<Response, WsmanError> {
        self.execute(self.messages.delete(resource, selectors))
    }

    /// Invoke a custom class method.
    pub fn invoke(
        &self,
        resource: &ResourceUri,
        input: &MethodInput,
        selectors: Option<&SelectorSet>,
    ) -> Result<Response, WsmanError> {
        self.execute(self.messages.invoke(resource, input, selectors))
    }
}

/// Raw response to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub message_id: u64,
    pub action: Action,
    pub resource_uri: ResourceUri,
    body: Vec<u8>,
}

impl Response {
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Decode the body with `decoder`, falling back to fault decoding.
    ///
    /// If `decoder` fails and the body is a SOAP Fault, the fault is
    /// returned; if it is not, the result is a malformed-response error.
    pub fn decode<T, E, F>(&self, decoder: F) -> Result<T, WsmanError>
    where
        F: FnOnce(&[u8]) -> Result<T, E>,
        E: Display,
    {
        match decoder(&self.body) {
            Ok(value) => Ok(value),
            Err(err) => match parse_fault(&self.body) {
                Ok(fault) => Err(WsmanError::Fault(fault)),
                Err(fault_err) => Err(WsmanError::MalformedResponse(format!(
                    "{err} (fault decode: {fault_err})"
                ))),
            },
        }
    }
}

fn basic_header(credentials: &Credentials) -> Option<String> {
    if credentials.is_empty() {
        return None;
    }
    let token = STANDARD.encode(format!("{}:{}", credentials.username, credentials.password));
    Some(format!("Basic {token}"))
}
