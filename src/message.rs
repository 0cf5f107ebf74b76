//! WS-Management request construction.
//!
//! Envelopes are assembled as strings: a WS-Addressing header block
//! (Action, To, ResourceURI, MessageID, ReplyTo, OperationTimeout and an
//! optional SelectorSet) followed by a WS-Transfer or WS-Enumeration body.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::enumeration::EnumerationContext;

/// Namespace URIs.
pub const SOAP_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
pub const ADDRESSING_NS: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing";
pub const TRANSFER_NS: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer";
pub const ENUMERATION_NS: &str = "http://schemas.xmlsoap.org/ws/2004/09/enumeration";
pub const WSMAN_NS: &str = "http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd";

/// Reply address for request/response exchanges.
pub const ANONYMOUS_ROLE: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous";

/// Default `To` destination and HTTP path of the management endpoint.
pub const DEFAULT_PATH: &str = "/wsman";

/// Default OperationTimeout header value.
pub const DEFAULT_OPERATION_TIMEOUT: &str = "PT60S";

/// Management schema a class belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schema {
    /// Intel AMT classes (`AMT_*`)
    Amt,
    /// DMTF CIM classes (`CIM_*`)
    Cim,
    /// Intel platform services classes (`IPS_*`)
    Ips,
}

impl Schema {
    /// Base resource URI for classes in this schema.
    pub fn base_uri(&self) -> &'static str {
        match self {
            Self::Amt => "http://intel.com/wbem/wscim/1/amt-schema/1/",
            Self::Cim => "http://schemas.dmtf.org/wbem/wscim/1/cim-schema/2/",
            Self::Ips => "http://intel.com/wbem/wscim/1/ips-schema/1/",
        }
    }

    /// Infer the schema from a class name prefix.
    pub fn for_class(class_name: &str) -> Option<Self> {
        match class_name.split('_').next() {
            Some("AMT") => Some(Self::Amt),
            Some("CIM") => Some(Self::Cim),
            Some("IPS") => Some(Self::Ips),
            _ => None,
        }
    }
}

/// Resource URI naming one manageable class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceUri(String);

impl ResourceUri {
    /// Resource URI of `class_name` within `schema`.
    pub fn new(schema: Schema, class_name: &str) -> Self {
        Self(format!("{}{}", schema.base_uri(), class_name))
    }

    /// Resource URI for a class whose schema is implied by its prefix.
    pub fn for_class(class_name: &str) -> Option<Self> {
        Schema::for_class(class_name).map(|schema| Self::new(schema, class_name))
    }

    /// Wrap an arbitrary, fully-qualified resource URI.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing class name segment.
    pub fn class_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Get,
    Put,
    Create,
    Delete,
    Enumerate,
    Pull,
    Release,
    /// Custom class method, e.g. `AMT_AuditLog/ReadRecords`
    Method { resource: ResourceUri, name: String },
}

impl Action {
    /// Custom method `name` of the class at `resource`.
    pub fn method(resource: &ResourceUri, name: impl Into<String>) -> Self {
        Self::Method {
            resource: resource.clone(),
            name: name.into(),
        }
    }

    /// Action URI placed in the `a:Action` header.
    pub fn uri(&self) -> String {
        match self {
            Self::Get => format!("{TRANSFER_NS}/Get"),
            Self::Put => format!("{TRANSFER_NS}/Put"),
            Self::Create => format!("{TRANSFER_NS}/Create"),
            Self::Delete => format!("{TRANSFER_NS}/Delete"),
            Self::Enumerate => format!("{ENUMERATION_NS}/Enumerate"),
            Self::Pull => format!("{ENUMERATION_NS}/Pull"),
            Self::Release => format!("{ENUMERATION_NS}/Release"),
            Self::Method { resource, name } => format!("{}/{}", resource.as_str(), name),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method { name, .. } => f.write_str(name),
            other => write!(f, "{other:?}"),
        }
    }
}

/// One key of a selector set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub name: String,
    pub value: String,
}

impl Selector {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Keys addressing a single instance. Empty addresses the whole class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorSet(Vec<Selector>);

impl SelectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a selector.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push(Selector::new(name, value));
        self
    }

    pub fn push(&mut self, selector: Selector) {
        self.0.push(selector);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Selector> {
        self.0.iter()
    }

    /// Render as `w:SelectorSet`, or nothing when empty.
    pub fn to_xml(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let mut xml = String::from("<w:SelectorSet>");
        for selector in &self.0 {
            xml.push_str(&format!(
                r#"<w:Selector Name="{}">{}</w:Selector>"#,
                xml_escape(&selector.name),
                xml_escape(&selector.value)
            ));
        }
        xml.push_str("</w:SelectorSet>");
        xml
    }
}

impl FromIterator<Selector> for SelectorSet {
    fn from_iter<I: IntoIterator<Item = Selector>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Reference to an associated instance, as carried in method parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointReference {
    pub address: String,
    pub resource_uri: ResourceUri,
    pub selectors: SelectorSet,
}

impl EndpointReference {
    pub fn new(resource_uri: ResourceUri, selectors: SelectorSet) -> Self {
        Self {
            address: ANONYMOUS_ROLE.to_string(),
            resource_uri,
            selectors,
        }
    }

    /// Render the Address and ReferenceParameters children.
    pub fn to_xml(&self) -> String {
        format!(
            "<a:Address>{}</a:Address><a:ReferenceParameters><w:ResourceURI>{}</w:ResourceURI>{}</a:ReferenceParameters>",
            xml_escape(&self.address),
            xml_escape(self.resource_uri.as_str()),
            self.selectors.to_xml()
        )
    }
}

/// A method parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    Reference(EndpointReference),
    /// Pre-rendered XML, inserted verbatim
    Raw(String),
}

/// `<Method_INPUT>` body for a custom method invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInput {
    method: String,
    resource: ResourceUri,
    params: Vec<(String, ParamValue)>,
}

impl MethodInput {
    pub fn new(resource: &ResourceUri, method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            resource: resource.clone(),
            params: Vec::new(),
        }
    }

    /// Add a text parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.params
            .push((name.into(), ParamValue::Text(value.to_string())));
        self
    }

    /// Add a reference to an associated instance.
    pub fn reference(mut self, name: impl Into<String>, epr: EndpointReference) -> Self {
        self.params.push((name.into(), ParamValue::Reference(epr)));
        self
    }

    /// Add a parameter whose content is already XML.
    pub fn raw(mut self, name: impl Into<String>, xml: impl Into<String>) -> Self {
        self.params.push((name.into(), ParamValue::Raw(xml.into())));
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn action(&self) -> Action {
        Action::method(&self.resource, self.method.clone())
    }

    pub fn to_xml(&self) -> String {
        let mut xml = format!(
            r#"<h:{}_INPUT xmlns:h="{}">"#,
            self.method,
            xml_escape(self.resource.as_str())
        );
        for (name, value) in &self.params {
            let content = match value {
                ParamValue::Text(text) => xml_escape(text),
                ParamValue::Reference(epr) => epr.to_xml(),
                ParamValue::Raw(raw) => raw.clone(),
            };
            xml.push_str(&format!("<h:{name}>{content}</h:{name}>"));
        }
        xml.push_str(&format!("</h:{}_INPUT>", self.method));
        xml
    }
}

/// One outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub message_id: u64,
    pub action: Action,
    pub resource_uri: ResourceUri,
    pub envelope: String,
}

/// Builds envelopes with strictly increasing message ids.
#[derive(Debug)]
pub struct MessageBuilder {
    next_id: AtomicU64,
    to: String,
    operation_timeout: String,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            to: DEFAULT_PATH.to_string(),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT.to_string(),
        }
    }

    /// Set the `a:To` destination.
    pub fn with_destination(mut self, to: impl Into<String>) -> Self {
        self.to = to.into();
        self
    }

    /// Set the OperationTimeout, as an xs:duration such as `PT30S`.
    pub fn with_operation_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.operation_timeout = timeout.into();
        self
    }

    /// Build a complete envelope.
    pub fn build(
        &self,
        action: Action,
        resource: &ResourceUri,
        selectors: Option<&SelectorSet>,
        body: Option<&str>,
    ) -> Message {
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let selector_xml = selectors.map(SelectorSet::to_xml).unwrap_or_default();

        let envelope = format!(
            concat!(
                r#"<?xml version="1.0" encoding="utf-8"?>"#,
                r#"<Envelope xmlns="{soap}" xmlns:a="{addressing}" xmlns:w="{wsman}">"#,
                "<Header>",
                "<a:Action>{action}</a:Action>",
                "<a:To>{to}</a:To>",
                "<w:ResourceURI>{resource}</w:ResourceURI>",
                "<a:MessageID>{id}</a:MessageID>",
                "<a:ReplyTo><a:Address>{anonymous}</a:Address></a:ReplyTo>",
                "<w:OperationTimeout>{timeout}</w:OperationTimeout>",
                "{selectors}",
                "</Header>",
                "<Body>{body}</Body>",
                "</Envelope>"
            ),
            soap = SOAP_ENVELOPE_NS,
            addressing = ADDRESSING_NS,
            wsman = WSMAN_NS,
            action = xml_escape(&action.uri()),
            to = xml_escape(&self.to),
            resource = xml_escape(resource.as_str()),
            id = message_id,
            anonymous = ANONYMOUS_ROLE,
            timeout = xml_escape(&self.operation_timeout),
            selectors = selector_xml,
            body = body.unwrap_or(""),
        );

        Message {
            message_id,
            action,
            resource_uri: resource.clone(),
            envelope,
        }
    }

    /// WS-Transfer Get of a class or, with selectors, one instance.
    pub fn get(&self, resource: &ResourceUri, selectors: Option<&SelectorSet>) -> Message {
        self.build(Action::Get, resource, selectors, None)
    }

    /// WS-Transfer Put replacing the addressed instance with `instance_xml`.
    pub fn put(
        &self,
        resource: &ResourceUri,
        selectors: Option<&SelectorSet>,
        instance_xml: &str,
    ) -> Message {
        self.build(Action::Put, resource, selectors, Some(instance_xml))
    }

    pub fn create(&self, resource: &ResourceUri, instance_xml: &str) -> Message {
        self.build(Action::Create, resource, None, Some(instance_xml))
    }

    pub fn delete(&self, resource: &ResourceUri, selectors: Option<&SelectorSet>) -> Message {
        self.build(Action::Delete, resource, selectors, None)
    }

    pub fn enumerate(&self, resource: &ResourceUri) -> Message {
        let body = format!(r#"<Enumerate xmlns="{ENUMERATION_NS}" />"#);
        self.build(Action::Enumerate, resource, None, Some(&body))
    }

    pub fn pull(
        &self,
        resource: &ResourceUri,
        context: &EnumerationContext,
        max_elements: u32,
        max_characters: u32,
    ) -> Message {
        let body = format!(
            r#"<Pull xmlns="{ENUMERATION_NS}"><EnumerationContext>{}</EnumerationContext><MaxElements>{}</MaxElements><MaxCharacters>{}</MaxCharacters></Pull>"#,
            xml_escape(context.as_str()),
            max_elements,
            max_characters
        );
        self.build(Action::Pull, resource, None, Some(&body))
    }

    pub fn release(&self, resource: &ResourceUri, context: &EnumerationContext) -> Message {
        let body = format!(
            r#"<Release xmlns="{ENUMERATION_NS}"><EnumerationContext>{}</EnumerationContext></Release>"#,
            xml_escape(context.as_str())
        );
        self.build(Action::Release, resource, None, Some(&body))
    }

    /// Invoke a custom method on the class or, with selectors, one instance.
    pub fn invoke(
        &self,
        resource: &ResourceUri,
        input: &MethodInput,
        selectors: Option<&SelectorSet>,
    ) -> Message {
        self.build(input.action(), resource, selectors, Some(&input.to_xml()))
    }
}

pub(crate) fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
