//! WS-Management client engine for Intel AMT.
//!
//! Builds WS-Addressing / WS-Transfer / WS-Enumeration envelopes, sends them
//! over HTTP(S) with Basic or RFC 2617 Digest authentication, and decodes
//! SOAP Faults into a typed error.
//!
//! # Features
//!
//! - Envelope construction with strictly increasing MessageIDs
//! - Digest authentication with nonce-count tracking and one-shot reauthentication
//! - Enumerate/Pull paging with opaque continuation contexts
//! - Fault decoding that never conflates malformed input with "no fault"
//!
//! # Example
//!
//! ```no_run
//! use amt_wsman::{Client, ClientConfig, ResourceUri, Schema};
//!
//! # fn main() -> Result<(), amt_wsman::WsmanError> {
//! let mut config = ClientConfig::default();
//! config.connection.target = "192.168.1.40".to_string();
//! config.auth.username = "admin".to_string();
//! config.auth.password = "P@ssw0rd".to_string();
//!
//! let client = Client::connect(config)?;
//! let log = ResourceUri::new(Schema::Amt, "AMT_MessageLog");
//! let mut pages = client.enumerator(log);
//! while let Some(page) = pages.next_page()? {
//!     for item in page.items() {
//!         println!("{item}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod digest;
pub mod enumeration;
pub mod error;
pub mod message;
pub mod parser;
pub mod transport;

pub use client::{Client, Response};
pub use config::{AuthMode, ClientConfig};
pub use digest::{AuthChallenge, Credentials, DigestSession};
pub use enumeration::{EnumerationContext, EnumerationState, Enumerator, PullPage};
pub use error::{AuthError, DecodeError, Fault, FaultKind, TransportError, WsmanError};
pub use message::{
    Action, EndpointReference, Message, MessageBuilder, MethodInput, ResourceUri, Schema,
    Selector, SelectorSet,
};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
