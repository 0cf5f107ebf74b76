//! WS-Enumeration paging.
//!
//! `Enumerate` yields an opaque context; each `Pull` returns one page and,
//! unless the sequence has ended, the context for the next page. Nothing
//! here loops on its own.

use std::fmt;

use tracing::debug;

use crate::client::Client;
use crate::error::WsmanError;
use crate::message::ResourceUri;
use crate::parser::{parse_enumerate_response, parse_fault, parse_pull_response};

/// Server-issued continuation token. Never interpreted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumerationContext(String);

impl EnumerationContext {
    pub fn new(context: impl Into<String>) -> Self {
        Self(context.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnumerationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of a Pull.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullPage {
    items: Vec<String>,
    next: Option<EnumerationContext>,
}

impl PullPage {
    pub fn new(items: Vec<String>, next: Option<EnumerationContext>) -> Self {
        Self { items, next }
    }

    /// Raw XML of each item, in server order.
    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn into_items(self) -> Vec<String> {
        self.items
    }

    /// Context for the following Pull; `None` once the sequence has ended.
    pub fn next_context(&self) -> Option<&EnumerationContext> {
        self.next.as_ref()
    }

    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

impl Client {
    /// Start an enumeration of every instance of `resource`.
    pub fn enumerate(&self, resource: &ResourceUri) -> Result<EnumerationContext, WsmanError> {
        let message = self.messages().enumerate(resource);
        self.execute(message)?.decode(parse_enumerate_response)
    }

    /// Fetch the page following `context`.
    ///
    /// An expired or unknown context is reported by the endpoint as a Fault.
    pub fn pull(
        &self,
        resource: &ResourceUri,
        context: &EnumerationContext,
    ) -> Result<PullPage, WsmanError> {
        let hints = &self.config().enumeration;
        let message = self
            .messages()
            .pull(resource, context, hints.max_elements, hints.max_characters);
        self.execute(message)?.decode(parse_pull_response)
    }

    /// Abandon an unfinished enumeration.
    pub fn release(
        &self,
        resource: &ResourceUri,
        context: &EnumerationContext,
    ) -> Result<(), WsmanError> {
        let response = self.execute(self.messages().release(resource, context))?;
        match parse_fault(response.body()) {
            Ok(fault) => Err(WsmanError::Fault(fault)),
            Err(_) => Ok(()),
        }
    }

    /// Paging cursor over `resource`.
    pub fn enumerator(&self, resource: ResourceUri) -> Enumerator<'_> {
        Enumerator::new(self, resource)
    }
}

/// Where an [`Enumerator`] stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumerationState {
    Start,
    Enumerated(EnumerationContext),
    Pulling(EnumerationContext),
    Done,
}

/// Drives one enumeration a page at a time.
#[derive(Debug)]
pub struct Enumerator<'c> {
    client: &'c Client,
    resource: ResourceUri,
    state: EnumerationState,
}

impl<'c> Enumerator<'c> {
    pub fn new(client: &'c Client, resource: ResourceUri) -> Self {
        Self {
            client,
            resource,
            state: EnumerationState::Start,
        }
    }

    pub fn state(&self) -> &EnumerationState {
        &self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == EnumerationState::Done
    }

    /// Issue the Enumerate request, restarting from a fresh context.
    pub fn enumerate(&mut self) -> Result<EnumerationContext, WsmanError> {
        let context = self.client.enumerate(&self.resource)?;
        self.state = EnumerationState::Enumerated(context.clone());
        Ok(context)
    }

    /// Pull the next page, enumerating first if needed.
    ///
    /// Returns `Ok(None)` once the sequence is complete. A Fault from either
    /// the Enumerate or a Pull ends the enumeration; transport and
    /// authentication errors leave the state unchanged so the call can be
    /// repeated.
    pub fn next_page(&mut self) -> Result<Option<PullPage>, WsmanError> {
        let current = match &self.state {
            EnumerationState::Done => return Ok(None),
            EnumerationState::Start => None,
            EnumerationState::Enumerated(context) | EnumerationState::Pulling(context) => {
                Some(context.clone())
            }
        };
        let context = match current {
            Some(context) => context,
            None => match self.enumerate() {
                Ok(context) => context,
                Err(err) => return Err(self.finish_on_fault(err)),
            },
        };

        match self.client.pull(&self.resource, &context) {
            Ok(page) => {
                self.state = match page.next_context() {
                    Some(next) => EnumerationState::Pulling(next.clone()),
                    None => EnumerationState::Done,
                };
                debug!(
                    resource_uri = %self.resource,
                    items = page.items().len(),
                    last = page.is_last(),
                    "Pulled enumeration page"
                );
                Ok(Some(page))
            }
            Err(err) => Err(self.finish_on_fault(err)),
        }
    }

    fn finish_on_fault(&mut self, err: WsmanError) -> WsmanError {
        if let Some(fault) = err.fault() {
            debug!(
                resource_uri = %self.resource,
                fault = fault.kind().as_str(),
                "Enumeration ended by fault"
            );
            self.state = EnumerationState::Done;
        }
        err
    }
}
