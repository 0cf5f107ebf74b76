//! Response decoding.
//!
//! Uses quick-xml's event reader, which never expands external entities.
//! All decoders match on element local names so that any namespace prefix
//! the firmware chooses is accepted.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;

use crate::enumeration::{EnumerationContext, PullPage};
use crate::error::{DecodeError, Fault};

const ENVELOPE: &str = "Envelope";
const FAULT_PATH: [&str; 3] = [ENVELOPE, "Body", "Fault"];
const PULL_PATH: [&str; 3] = [ENVELOPE, "Body", "PullResponse"];

/// Addressing fields of a response header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeader {
    pub action: Option<String>,
    pub message_id: Option<String>,
    pub relates_to: Option<String>,
    pub resource_uri: Option<String>,
}

/// Decode a SOAP Fault from `data`.
///
/// Fails unless `data` is a well-formed Envelope whose Body holds a Fault.
pub fn parse_fault(data: &[u8]) -> Result<Fault, DecodeError> {
    let mut fault: Option<Fault> = None;
    let mut detail: Vec<String> = Vec::new();

    walk(data, |node| {
        match node {
            Node::Open(path) => {
                if path.is(&FAULT_PATH) {
                    fault = Some(Fault::default());
                }
            }
            Node::Text(path, text) => {
                if let Some(fault) = fault.as_mut() {
                    if path.is(&[ENVELOPE, "Body", "Fault", "Code", "Value"])
                        || path.is(&[ENVELOPE, "Body", "Fault", "faultcode"])
                    {
                        fault.code = text.trim().to_string();
                    } else if path.is(&[ENVELOPE, "Body", "Fault", "Code", "Subcode", "Value"]) {
                        fault.subcode = text.trim().to_string();
                    } else if path.is(&[ENVELOPE, "Body", "Fault", "Reason", "Text"])
                        || path.is(&[ENVELOPE, "Body", "Fault", "faultstring"])
                    {
                        fault.message = text.to_string();
                    } else if path.within(&[ENVELOPE, "Body", "Fault", "Detail"])
                        || path.within(&[ENVELOPE, "Body", "Fault", "detail"])
                    {
                        detail.push(text.to_string());
                    }
                }
            }
            Node::Raw(..) => {}
        }
        Ok(Walk::Descend)
    })?;

    let mut fault = fault.ok_or_else(|| DecodeError::new("Envelope Body carries no Fault"))?;
    fault.detail = join_detail(detail);
    Ok(fault)
}

/// A lone text node is kept verbatim; structured detail is flattened.
fn join_detail(pieces: Vec<String>) -> String {
    match <[String; 1]>::try_from(pieces) {
        Ok([only]) => only,
        Err(pieces) => pieces
            .iter()
            .map(|piece| piece.trim())
            .filter(|piece| !piece.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Decode the WS-Addressing header of any response envelope.
pub fn parse_response_header(data: &[u8]) -> Result<ResponseHeader, DecodeError> {
    let mut header = ResponseHeader::default();

    walk(data, |node| {
        if let Node::Text(path, text) = node {
            let slot = if path.is(&[ENVELOPE, "Header", "Action"]) {
                Some(&mut header.action)
            } else if path.is(&[ENVELOPE, "Header", "MessageID"]) {
                Some(&mut header.message_id)
            } else if path.is(&[ENVELOPE, "Header", "RelatesTo"]) {
                Some(&mut header.relates_to)
            } else if path.is(&[ENVELOPE, "Header", "ResourceURI"]) {
                Some(&mut header.resource_uri)
            } else {
                None
            };
            if let Some(slot) = slot {
                *slot = Some(text.trim().to_string());
            }
        }
        Ok(Walk::Descend)
    })?;

    Ok(header)
}

/// Extract the EnumerationContext from an EnumerateResponse.
pub fn parse_enumerate_response(data: &[u8]) -> Result<EnumerationContext, DecodeError> {
    let mut seen_response = false;
    let mut context: Option<String> = None;

    walk(data, |node| {
        match node {
            Node::Open(path) if path.is(&[ENVELOPE, "Body", "EnumerateResponse"]) => {
                seen_response = true;
            }
            Node::Text(path, text)
                if path.is(&[ENVELOPE, "Body", "EnumerateResponse", "EnumerationContext"]) =>
            {
                context = Some(text.to_string());
            }
            _ => {}
        }
        Ok(Walk::Descend)
    })?;

    if !seen_response {
        return Err(DecodeError::new("Envelope Body carries no EnumerateResponse"));
    }
    match context {
        Some(context) if !context.trim().is_empty() => Ok(EnumerationContext::new(context)),
        _ => Err(DecodeError::new(
            "EnumerateResponse carries no EnumerationContext",
        )),
    }
}

/// Decode one page of a PullResponse.
///
/// Each child of `Items` is returned as raw XML for the caller to decode.
pub fn parse_pull_response(data: &[u8]) -> Result<PullPage, DecodeError> {
    let mut seen_response = false;
    let mut items = Vec::new();
    let mut context: Option<String> = None;
    let mut end_of_sequence = false;

    walk(data, |node| {
        match node {
            Node::Open(path) => {
                if path.is(&PULL_PATH) {
                    seen_response = true;
                } else if path.is(&[ENVELOPE, "Body", "PullResponse", "EndOfSequence"]) {
                    end_of_sequence = true;
                } else if path.depth() == 5
                    && path.within(&[ENVELOPE, "Body", "PullResponse", "Items"])
                {
                    return Ok(Walk::Capture);
                }
            }
            Node::Text(path, text) => {
                if path.is(&[ENVELOPE, "Body", "PullResponse", "EnumerationContext"]) {
                    context = Some(text.to_string());
                }
            }
            Node::Raw(_, xml) => items.push(xml.to_string()),
        }
        Ok(Walk::Descend)
    })?;

    if !seen_response {
        return Err(DecodeError::new("Envelope Body carries no PullResponse"));
    }

    let next = if end_of_sequence {
        None
    } else {
        context
            .filter(|c| !c.trim().is_empty())
            .map(EnumerationContext::new)
    };
    Ok(PullPage::new(items, next))
}

/// Stack of element local names from the document root.
#[derive(Debug, Default)]
struct ElementPath(Vec<String>);

impl ElementPath {
    fn depth(&self) -> usize {
        self.0.len()
    }

    fn is(&self, expected: &[&str]) -> bool {
        self.0.len() == expected.len() && self.within(expected)
    }

    fn within(&self, prefix: &[&str]) -> bool {
        self.0.len() >= prefix.len() && self.0.iter().zip(prefix).all(|(a, b)| a == b)
    }
}

enum Node<'a> {
    /// Element opened; the path ends with it.
    Open(&'a ElementPath),
    /// Unescaped text directly inside the element at the path.
    Text(&'a ElementPath, &'a str),
    /// Complete markup of an element the visitor asked to capture, with
    /// the namespace declarations it inherits copied onto its start tag.
    Raw(&'a ElementPath, &'a str),
}

enum Walk {
    Descend,
    Capture,
}

/// `xmlns` declarations made on each open element.
type NamespaceScopes = Vec<Vec<(String, String)>>;

/// Drive `visit` over a SOAP envelope.
///
/// Rejects input that is not UTF-8, not well-formed, truncated, or whose
/// root element is not `Envelope`. Text is passed through untrimmed.
fn walk<F>(data: &[u8], mut visit: F) -> Result<(), DecodeError>
where
    F: FnMut(Node<'_>) -> Result<Walk, DecodeError>,
{
    let xml = std::str::from_utf8(data)
        .map_err(|e| DecodeError::new(format!("invalid UTF-8: {e}")))?;

    let mut reader = Reader::from_str(xml);

    let mut path = ElementPath::default();
    let mut scopes = NamespaceScopes::new();
    let mut seen_root = false;

    loop {
        let before = reader.buffer_position() as usize;
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                open_element(&mut path, &mut scopes, &mut seen_root, &e)?;
                if let Walk::Capture = visit(Node::Open(&path))? {
                    let name = e.name().as_ref().to_vec();
                    reader
                        .read_to_end(QName(&name))
                        .map_err(|err| DecodeError::new(format!("XML parse error: {err}")))?;
                    let after = reader.buffer_position() as usize;
                    let raw = raw_slice(xml, before, after);
                    let item = with_inherited_namespaces(raw, name.len(), &scopes);
                    visit(Node::Raw(&path, &item))?;
                    close_element(&mut path, &mut scopes);
                }
            }
            Ok(Event::Empty(e)) => {
                open_element(&mut path, &mut scopes, &mut seen_root, &e)?;
                if let Walk::Capture = visit(Node::Open(&path))? {
                    let after = reader.buffer_position() as usize;
                    let raw = raw_slice(xml, before, after);
                    let item = with_inherited_namespaces(raw, e.name().as_ref().len(), &scopes);
                    visit(Node::Raw(&path, &item))?;
                }
                close_element(&mut path, &mut scopes);
            }
            Ok(Event::End(_)) => {
                close_element(&mut path, &mut scopes);
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| DecodeError::new(format!("XML parse error: {err}")))?;
                if path.depth() == 0 {
                    if text.trim().is_empty() {
                        continue;
                    }
                    return Err(DecodeError::new("text outside of the document element"));
                }
                visit(Node::Text(&path, &text))?;
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                visit(Node::Text(&path, &text))?;
            }
            Ok(Event::DocType(_)) => {
                return Err(DecodeError::new("DOCTYPE declarations are not allowed"));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(DecodeError::new(format!("XML parse error: {e}"))),
            _ => {}
        }
    }

    if !seen_root {
        return Err(DecodeError::new("no SOAP Envelope found"));
    }
    if path.depth() != 0 {
        return Err(DecodeError::new("unexpected end of document"));
    }
    Ok(())
}

fn open_element(
    path: &mut ElementPath,
    scopes: &mut NamespaceScopes,
    seen_root: &mut bool,
    e: &BytesStart,
) -> Result<(), DecodeError> {
    let name = local_name_str(e);
    if path.depth() == 0 {
        if *seen_root {
            return Err(DecodeError::new("multiple document elements"));
        }
        if name != ENVELOPE {
            return Err(DecodeError::new(format!(
                "root element is `{name}`, expected Envelope"
            )));
        }
        *seen_root = true;
    }
    scopes.push(namespace_declarations(e)?);
    path.0.push(name);
    Ok(())
}

fn close_element(path: &mut ElementPath, scopes: &mut NamespaceScopes) {
    path.0.pop();
    scopes.pop();
}

/// `xmlns` and `xmlns:*` attributes of `e`, values kept escaped.
fn namespace_declarations(e: &BytesStart) -> Result<Vec<(String, String)>, DecodeError> {
    let mut declarations = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| DecodeError::new(format!("XML attribute error: {err}")))?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            let name = String::from_utf8_lossy(key).into_owned();
            let value = String::from_utf8_lossy(&attr.value).replace('"', "&quot;");
            declarations.push((name, value));
        }
    }
    Ok(declarations)
}

/// Copy declarations in scope from ancestors onto the start tag of `raw`.
///
/// The innermost ancestor wins, and anything the element declares itself
/// is left alone.
fn with_inherited_namespaces(
    raw: &str,
    qname_len: usize,
    scopes: &[Vec<(String, String)>],
) -> String {
    let Some((own, ancestors)) = scopes.split_last() else {
        return raw.to_string();
    };

    let mut inherited: Vec<(&str, &str)> = Vec::new();
    for (name, value) in ancestors.iter().flatten() {
        if own.iter().any(|(declared, _)| declared == name) {
            continue;
        }
        match inherited.iter_mut().find(|(seen, _)| *seen == name.as_str()) {
            Some(slot) => slot.1 = value.as_str(),
            None => inherited.push((name.as_str(), value.as_str())),
        }
    }

    // `<` then the qualified name
    let split = 1 + qname_len;
    match (inherited.is_empty(), raw.get(..split), raw.get(split..)) {
        (false, Some(head), Some(tail)) => {
            let mut item = String::from(head);
            for (name, value) in inherited {
                item.push_str(&format!(r#" {name}="{value}""#));
            }
            item.push_str(tail);
            item
        }
        _ => raw.to_string(),
    }
}

fn raw_slice(xml: &str, start: usize, end: usize) -> &str {
    xml.get(start..end).unwrap_or_default().trim()
}

/// Extract local name from element.
fn local_name_str(e: &BytesStart) -> String {
    let name = e.local_name();
    std::str::from_utf8(name.as_ref())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultKind;

    const AMT_FAULT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<a:Envelope xmlns:a="http://www.w3.org/2003/05/soap-envelope" xmlns:b="http://schemas.xmlsoap.org/ws/2004/08/addressing" xmlns:c="http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd" xmlns:e="http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd">
  <a:Header>
    <b:To>http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous</b:To>
    <b:RelatesTo>0</b:RelatesTo>
    <b:Action a:mustUnderstand="true">http://schemas.xmlsoap.org/ws/2004/08/addressing/fault</b:Action>
    <b:MessageID>uuid:00000000-8086-8086-8086-000000000061</b:MessageID>
  </a:Header>
  <a:Body>
    <a:Fault>
      <a:Code>
        <a:Value>a:Sender</a:Value>
        <a:Subcode>
          <a:Value>b:DestinationUnreachable</a:Value>
        </a:Subcode>
      </a:Code>
      <a:Reason>
        <a:Text xml:lang="en-US">No route can be determined to reach the destination role defined by the WS-Addressing To.</a:Text>
      </a:Reason>
      <a:Detail></a:Detail>
    </a:Fault>
  </a:Body>
</a:Envelope>"#;

    const ENUMERATE_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<a:Envelope xmlns:a="http://www.w3.org/2003/05/soap-envelope" xmlns:b="http://schemas.xmlsoap.org/ws/2004/08/addressing" xmlns:g="http://schemas.xmlsoap.org/ws/2004/09/enumeration">
  <a:Header>
    <b:RelatesTo>3</b:RelatesTo>
    <b:Action a:mustUnderstand="true">http://schemas.xmlsoap.org/ws/2004/09/enumeration/EnumerateResponse</b:Action>
  </a:Header>
  <a:Body>
    <g:EnumerateResponse>
      <g:EnumerationContext>14000000-0000-0000-0000-000000000000</g:EnumerationContext>
    </g:EnumerateResponse>
  </a:Body>
</a:Envelope>"#;

    const PULL_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<a:Envelope xmlns:a="http://www.w3.org/2003/05/soap-envelope" xmlns:g="http://schemas.xmlsoap.org/ws/2004/09/enumeration" xmlns:h="http://intel.com/wbem/wscim/1/amt-schema/1/AMT_EthernetPortSettings">
  <a:Header/>
  <a:Body>
    <g:PullResponse>
      <g:Items>
        <h:AMT_EthernetPortSettings><h:InstanceID>Intel(r) AMT Ethernet Port Settings 0</h:InstanceID></h:AMT_EthernetPortSettings>
        <h:AMT_EthernetPortSettings><h:InstanceID>Intel(r) AMT Ethernet Port Settings 1</h:InstanceID></h:AMT_EthernetPortSettings>
      </g:Items>
      <g:EndOfSequence/>
    </g:PullResponse>
  </a:Body>
</a:Envelope>"#;

    #[test]
    fn test_parse_amt_fault() {
        let fault = parse_fault(AMT_FAULT.as_bytes()).unwrap();
        assert_eq!(fault.code, "a:Sender");
        assert_eq!(fault.subcode, "b:DestinationUnreachable");
        assert!(fault.message.starts_with("No route can be determined"));
        assert_eq!(fault.detail, "");
        assert_eq!(fault.kind(), FaultKind::DestinationUnreachable);
    }

    #[test]
    fn test_fault_round_trip() {
        let original = Fault::new(
            "wsen:InvalidEnumerationContext",
            "The supplied enumeration context is invalid & expired",
            "http://schemas.dmtf.org/wbem/wsman/1/wsman/faultDetail/Expired",
        );
        let decoded = parse_fault(original.to_envelope().as_bytes()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_fault_round_trip_keeps_whitespace() {
        let original = Fault::new("b:InvalidParameter", "  value out of range\n", " 42 ");
        let decoded = parse_fault(original.to_envelope().as_bytes()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_structured_detail_is_flattened() {
        let xml = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
  <s:Body>
    <s:Fault>
      <s:Code><s:Value>s:Receiver</s:Value></s:Code>
      <s:Reason><s:Text>internal</s:Text></s:Reason>
      <s:Detail>
        <x:Code xmlns:x="urn:x">7</x:Code>
        <x:Where xmlns:x="urn:x">firmware</x:Where>
      </s:Detail>
    </s:Fault>
  </s:Body>
</s:Envelope>"#;
        let fault = parse_fault(xml.as_bytes()).unwrap();
        assert_eq!(fault.code, "s:Receiver");
        assert_eq!(fault.detail, "7 firmware");
    }

    #[test]
    fn test_parse_soap11_fault() {
        let xml = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <soap:Fault>
      <faultcode>soap:Client</faultcode>
      <faultstring>bad request</faultstring>
      <detail><x:info xmlns:x="urn:x">more</x:info></detail>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#;
        let fault = parse_fault(xml.as_bytes()).unwrap();
        assert_eq!(fault.code, "soap:Client");
        assert_eq!(fault.message, "bad request");
        assert_eq!(fault.detail, "more");
    }

    #[test]
    fn test_non_document_is_decode_error() {
        assert!(parse_fault(b"").is_err());
        assert!(parse_fault(b"not xml at all").is_err());
        assert!(parse_fault(b"<html><body>502 Bad Gateway</body></html>").is_err());
        assert!(parse_fault(&[0xff, 0xfe, 0x00]).is_err());
    }

    #[test]
    fn test_truncated_fault_is_decode_error() {
        let truncated = &AMT_FAULT[..AMT_FAULT.len() / 2];
        let err = parse_fault(truncated.as_bytes()).unwrap_err();
        assert!(!err.0.is_empty());
    }

    #[test]
    fn test_envelope_without_fault_is_decode_error() {
        let err = parse_fault(ENUMERATE_RESPONSE.as_bytes()).unwrap_err();
        assert_eq!(err, DecodeError::new("Envelope Body carries no Fault"));
    }

    #[test]
    fn test_doctype_is_rejected() {
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE foo [<!ENTITY xxe SYSTEM "file:///etc/passwd">]>
<a:Envelope xmlns:a="http://www.w3.org/2003/05/soap-envelope"><a:Body/></a:Envelope>"#;
        let err = parse_fault(xml.as_bytes()).unwrap_err();
        assert!(err.0.contains("DOCTYPE"));
    }

    #[test]
    fn test_parse_response_header() {
        let header = parse_response_header(AMT_FAULT.as_bytes()).unwrap();
        assert_eq!(header.relates_to.as_deref(), Some("0"));
        assert_eq!(
            header.message_id.as_deref(),
            Some("uuid:00000000-8086-8086-8086-000000000061")
        );
        assert_eq!(
            header.action.as_deref(),
            Some("http://schemas.xmlsoap.org/ws/2004/08/addressing/fault")
        );
    }

    #[test]
    fn test_parse_enumerate_response() {
        let ctx = parse_enumerate_response(ENUMERATE_RESPONSE.as_bytes()).unwrap();
        assert_eq!(ctx.as_str(), "14000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_enumerate_response_without_context() {
        let xml = r#"<a:Envelope xmlns:a="http://www.w3.org/2003/05/soap-envelope"><a:Body><g:EnumerateResponse xmlns:g="urn:e"/></a:Body></a:Envelope>"#;
        assert!(parse_enumerate_response(xml.as_bytes()).is_err());
        assert!(parse_enumerate_response(AMT_FAULT.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_pull_response_items_in_order() {
        let page = parse_pull_response(PULL_RESPONSE.as_bytes()).unwrap();
        assert_eq!(page.items().len(), 2);
        assert!(page.items()[0].starts_with(
            r#"<h:AMT_EthernetPortSettings xmlns:a="http://www.w3.org/2003/05/soap-envelope""#
        ));
        assert!(page.items()[0].contains("Ethernet Port Settings 0"));
        assert!(page.items()[1].contains("Ethernet Port Settings 1"));
        assert!(page.items()[1].ends_with("</h:AMT_EthernetPortSettings>"));
        assert!(page.is_last());
    }

    #[test]
    fn test_pull_response_with_continuation() {
        let xml = r#"<a:Envelope xmlns:a="http://www.w3.org/2003/05/soap-envelope" xmlns:g="http://schemas.xmlsoap.org/ws/2004/09/enumeration">
  <a:Body>
    <g:PullResponse>
      <g:EnumerationContext>15000000-0000-0000-0000-000000000000</g:EnumerationContext>
      <g:Items><h:Record xmlns:h="urn:r"/></g:Items>
    </g:PullResponse>
  </a:Body>
</a:Envelope>"#;
        let page = parse_pull_response(xml.as_bytes()).unwrap();
        assert_eq!(
            page.items(),
            [concat!(
                r#"<h:Record xmlns:a="http://www.w3.org/2003/05/soap-envelope""#,
                r#" xmlns:g="http://schemas.xmlsoap.org/ws/2004/09/enumeration""#,
                r#" xmlns:h="urn:r"/>"#
            )
            .to_string()]
        );
        assert_eq!(
            page.next_context().map(EnumerationContext::as_str),
            Some("15000000-0000-0000-0000-000000000000")
        );
        assert!(!page.is_last());
    }

    #[test]
    fn test_pull_response_empty_context_is_terminal() {
        let xml = r#"<a:Envelope xmlns:a="http://www.w3.org/2003/05/soap-envelope"><a:Body><g:PullResponse xmlns:g="urn:e"><g:Items/><g:EnumerationContext></g:EnumerationContext></g:PullResponse></a:Body></a:Envelope>"#;
        let page = parse_pull_response(xml.as_bytes()).unwrap();
        assert!(page.items().is_empty());
        assert!(page.is_last());
    }

    #[test]
    fn test_pull_items_resolve_inherited_namespaces() {
        use quick_xml::name::{Namespace, ResolveResult};
        use quick_xml::NsReader;

        let page = parse_pull_response(PULL_RESPONSE.as_bytes()).unwrap();
        let mut reader = NsReader::from_str(&page.items()[0]);
        let (ns, event) = reader.read_resolved_event().unwrap();
        assert!(matches!(event, Event::Start(_)));
        assert_eq!(
            ns,
            ResolveResult::Bound(Namespace(
                b"http://intel.com/wbem/wscim/1/amt-schema/1/AMT_EthernetPortSettings"
            ))
        );
    }

    #[test]
    fn test_innermost_and_own_declarations_win() {
        let xml = r#"<a:Envelope xmlns:a="http://www.w3.org/2003/05/soap-envelope" xmlns:h="urn:outer" xmlns="urn:default">
  <a:Body>
    <g:PullResponse xmlns:g="http://schemas.xmlsoap.org/ws/2004/09/enumeration" xmlns:h="urn:inner">
      <g:Items><h:Item/><k:Item xmlns:k="urn:k" xmlns:g="urn:own-g"/></g:Items>
      <g:EndOfSequence/>
    </g:PullResponse>
  </a:Body>
</a:Envelope>"#;
        let page = parse_pull_response(xml.as_bytes()).unwrap();
        assert_eq!(
            page.items()[0],
            concat!(
                r#"<h:Item xmlns:a="http://www.w3.org/2003/05/soap-envelope""#,
                r#" xmlns:h="urn:inner" xmlns="urn:default""#,
                r#" xmlns:g="http://schemas.xmlsoap.org/ws/2004/09/enumeration"/>"#
            )
        );
        assert!(page.items()[1].contains(r#"xmlns:g="urn:own-g""#));
        assert!(!page.items()[1].contains("schemas.xmlsoap.org/ws/2004/09/enumeration"));
    }
}
