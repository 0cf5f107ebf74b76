//! Error types for the WS-Management client.
//!
//! Every exchange resolves to exactly one of four outcomes besides success:
//! a transport failure, an authentication failure, a SOAP Fault returned by
//! the managed endpoint, or a response that is neither a valid payload nor a
//! valid Fault.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::{xml_escape, ADDRESSING_NS, SOAP_ENVELOPE_NS, WSMAN_NS};

/// Action URI carried by WS-Management fault responses.
pub const FAULT_ACTION: &str = "http://schemas.dmtf.org/wbem/wsman/1/wsman/fault";

/// Top-level error for every client operation.
#[derive(Error, Debug)]
pub enum WsmanError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("authentication error: {0}")]
    Authentication(#[from] AuthError),

    #[error("SOAP fault: {0}")]
    Fault(Fault),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl WsmanError {
    /// The decoded fault, if this error carries one.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}

impl From<DecodeError> for WsmanError {
    fn from(err: DecodeError) -> Self {
        Self::MalformedResponse(err.0)
    }
}

/// No usable HTTP response was obtained.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Digest/Basic authentication failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("malformed challenge: {0}")]
    MalformedChallenge(String),

    #[error("challenge is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("unsupported qop: {0}")]
    UnsupportedQop(String),

    #[error("401 response carried no WWW-Authenticate header")]
    MissingChallenge,

    #[error("credentials rejected after reauthentication")]
    Rejected,
}

/// A response body that could not be decoded as the expected document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DecodeError(pub String);

impl DecodeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// A decoded SOAP Fault.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    /// Top-level code value, e.g. `a:Sender`
    pub code: String,
    /// Machine-readable subcode, e.g. `b:DestinationUnreachable`
    pub subcode: String,
    /// Reason text
    pub message: String,
    /// Opaque detail text
    pub detail: String,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.subcode, self.message)?;
        if !self.detail.is_empty() {
            write!(f, " ({})", self.detail)?;
        }
        Ok(())
    }
}

impl Fault {
    pub fn new(
        subcode: impl Into<String>,
        message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            code: "a:Sender".to_string(),
            subcode: subcode.into(),
            message: message.into(),
            detail: detail.into(),
        }
    }

    /// Classify the subcode.
    pub fn kind(&self) -> FaultKind {
        FaultKind::from_subcode(&self.subcode)
    }

    /// Render this fault as a SOAP 1.2 WS-Management fault envelope.
    pub fn to_envelope(&self) -> String {
        self.to_envelope_relating_to(None)
    }

    /// Render this fault as a response correlated to `message_id`.
    pub fn to_envelope_relating_to(&self, message_id: Option<u64>) -> String {
        let relates_to = message_id
            .map(|id| format!("<b:RelatesTo>{id}</b:RelatesTo>"))
            .unwrap_or_default();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<a:Envelope xmlns:a="{soap}" xmlns:b="{addressing}" xmlns:h="{wsman}">
  <a:Header>
    <b:To>http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous</b:To>
    {relates_to}
    <b:Action a:mustUnderstand="true">{action}</b:Action>
  </a:Header>
  <a:Body>
    <a:Fault>
      <a:Code>
        <a:Value>{code}</a:Value>
        <a:Subcode>
          <a:Value>{subcode}</a:Value>
        </a:Subcode>
      </a:Code>
      <a:Reason>
        <a:Text xml:lang="en-US">{message}</a:Text>
      </a:Reason>
      <a:Detail>{detail}</a:Detail>
    </a:Fault>
  </a:Body>
</a:Envelope>"#,
            soap = SOAP_ENVELOPE_NS,
            addressing = ADDRESSING_NS,
            wsman = WSMAN_NS,
            action = FAULT_ACTION,
            code = xml_escape(&self.code),
            subcode = xml_escape(&self.subcode),
            message = xml_escape(&self.message),
            detail = xml_escape(&self.detail),
        )
    }
}

/// Well-known WS-Management and WS-Addressing fault subcodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultKind {
    /// Resource URI or selector does not address an existing instance
    DestinationUnreachable,
    /// Enumeration context unknown or expired
    InvalidEnumerationContext,
    AccessDenied,
    ActionNotSupported,
    InvalidSelectors,
    TimedOut,
    SchemaValidationError,
    InvalidParameter,
    EncodingLimit,
    InternalError,
    CannotProcessFilter,
    /// Any subcode not listed above, verbatim
    Unrecognized(String),
}

impl FaultKind {
    /// Classify a subcode value; the namespace prefix is ignored.
    pub fn from_subcode(subcode: &str) -> Self {
        let local = subcode.rsplit(':').next().unwrap_or(subcode).trim();
        match local {
            "DestinationUnreachable" => Self::DestinationUnreachable,
            "InvalidEnumerationContext" => Self::InvalidEnumerationContext,
            "AccessDenied" => Self::AccessDenied,
            "ActionNotSupported" => Self::ActionNotSupported,
            "InvalidSelectors" => Self::InvalidSelectors,
            "TimedOut" => Self::TimedOut,
            "SchemaValidationError" => Self::SchemaValidationError,
            "InvalidParameter" => Self::InvalidParameter,
            "EncodingLimit" => Self::EncodingLimit,
            "InternalError" => Self::InternalError,
            "CannotProcessFilter" => Self::CannotProcessFilter,
            _ => Self::Unrecognized(subcode.to_string()),
        }
    }

    /// Get the string label for this fault kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::DestinationUnreachable => "DESTINATION_UNREACHABLE",
            Self::InvalidEnumerationContext => "INVALID_ENUMERATION_CONTEXT",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::ActionNotSupported => "ACTION_NOT_SUPPORTED",
            Self::InvalidSelectors => "INVALID_SELECTORS",
            Self::TimedOut => "TIMED_OUT",
            Self::SchemaValidationError => "SCHEMA_VALIDATION_ERROR",
            Self::InvalidParameter => "INVALID_PARAMETER",
            Self::EncodingLimit => "ENCODING_LIMIT",
            Self::InternalError => "INTERNAL_ERROR",
            Self::CannotProcessFilter => "CANNOT_PROCESS_FILTER",
            Self::Unrecognized(_) => "UNRECOGNIZED",
        }
    }
}
