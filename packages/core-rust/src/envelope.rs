//! SOAP envelope dialect detection, operation lookup, and envelope building.

use crate::config::DispatcherConfig;
use crate::xml::XmlElement;

/// SOAP 1.1 envelope namespace.
pub const SOAP11_ENVELOPE_URI: &str = "http://schemas.xmlsoap.org/soap/envelope/";
/// SOAP 1.2 envelope namespace.
pub const SOAP12_ENVELOPE_URI: &str = "http://www.w3.org/2003/05/soap-envelope";
/// Truncated SOAP 1.2 namespace accepted from older clients.
pub const SOAP12_LEGACY_ENVELOPE_URI: &str = "http://www.w3.org/2003/05/soap-env";

const ENVELOPE_URIS: [&str; 3] = [
    SOAP11_ENVELOPE_URI,
    SOAP12_ENVELOPE_URI,
    SOAP12_LEGACY_ENVELOPE_URI,
];

/// Per-request envelope dialect, resolved from the inbound document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectContext {
    /// Alias the envelope namespace is bound to; `""` for the default namespace.
    pub ns_alias: String,
    pub ns_uri: String,
    /// Prefix of the invoked operation element, reused for the response.
    pub body_prefix: Option<String>,
    /// Namespace the response element is placed in.
    pub target_namespace: Option<String>,
}

impl DialectContext {
    /// The configured default dialect.
    #[must_use]
    pub fn from_config(config: &DispatcherConfig) -> Self {
        Self {
            ns_alias: config.soap_ns.clone(),
            ns_uri: config.soap_uri.clone(),
            body_prefix: config.prefix.clone(),
            target_namespace: config.namespace.clone(),
        }
    }

    /// Qualifies `local` with the envelope alias.
    #[must_use]
    pub fn qualify(&self, local: &str) -> String {
        if self.ns_alias.is_empty() {
            local.to_string()
        } else {
            format!("{}:{local}", self.ns_alias)
        }
    }

    fn declaration(&self) -> String {
        if self.ns_alias.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{}", self.ns_alias)
        }
    }
}

/// Missing envelope structure. Reported as a `Client` fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructureError {
    #[error("envelope has no <{0}> element")]
    MissingBody(String),
    #[error("<{0}> contains no operation element")]
    EmptyBody(String),
}

impl StructureError {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingBody(_) => "MissingBodyError",
            Self::EmptyBody(_) => "EmptyBodyError",
        }
    }
}

/// The operation element found in a request body.
#[derive(Debug)]
pub struct LocatedOperation<'a> {
    pub element: &'a XmlElement,
    pub name: &'a str,
    pub prefix: Option<&'a str>,
}

/// Adopts the envelope namespace the request declares on its root.
///
/// If none of the root's namespace declarations is a SOAP envelope URI the
/// given default is returned unchanged. When several qualify the last wins.
#[must_use]
pub fn detect_dialect(document: &XmlElement, default: DialectContext) -> DialectContext {
    let declared = document
        .namespace_declarations()
        .filter(|(_, uri)| ENVELOPE_URIS.contains(uri))
        .last();
    match declared {
        Some((alias, uri)) => DialectContext {
            ns_alias: alias.to_string(),
            ns_uri: uri.to_string(),
            ..default
        },
        None => default,
    }
}

/// Finds the first child of `<alias:Body>`.
///
/// # Errors
///
/// `MissingBody` if the envelope has no Body, `EmptyBody` if it has no child element.
pub fn locate_operation<'a>(
    document: &'a XmlElement,
    dialect: &DialectContext,
) -> Result<LocatedOperation<'a>, StructureError> {
    let body_name = dialect.qualify("Body");
    let body = document
        .child(&body_name)
        .ok_or_else(|| StructureError::MissingBody(body_name.clone()))?;
    let element = body
        .children()
        .next()
        .ok_or(StructureError::EmptyBody(body_name))?;
    Ok(LocatedOperation {
        element,
        name: element.local_name(),
        prefix: element.prefix(),
    })
}

/// Namespace URI bound to `prefix` in scope of the operation element.
///
/// Looks at the operation element, then the Body, then the Envelope.
#[must_use]
pub fn resolve_prefix<'a>(
    document: &'a XmlElement,
    dialect: &DialectContext,
    operation: &'a XmlElement,
    prefix: &str,
) -> Option<&'a str> {
    let body = document.child(&dialect.qualify("Body"));
    [Some(operation), body, Some(document)]
        .into_iter()
        .flatten()
        .find_map(|element| {
            element
                .namespace_declarations()
                .find(|(alias, _)| *alias == prefix)
                .map(|(_, uri)| uri)
        })
}

/// Wraps `body_content` in `Envelope`/`Body` for the dialect.
///
/// The envelope declares the dialect namespace and, when the response
/// element is prefixed, that prefix's namespace.
#[must_use]
pub fn build_envelope(dialect: &DialectContext, body_content: XmlElement) -> XmlElement {
    let mut envelope = XmlElement::new(dialect.qualify("Envelope"))
        .with_attribute(dialect.declaration(), dialect.ns_uri.clone());
    if let (Some(prefix), Some(namespace)) = (&dialect.body_prefix, &dialect.target_namespace) {
        if *prefix != dialect.ns_alias {
            envelope.add_attribute(format!("xmlns:{prefix}"), namespace.clone());
        }
    }
    envelope
        .add_child(dialect.qualify("Body"))
        .push_child(body_content);
    envelope
}

/// A SOAP fault payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// `Client.<Kind>` or `Server.<Kind>`.
    pub code: String,
    pub message: String,
    pub detail: String,
}

/// Builds `<alias:Fault>` with `faultcode`, `faultstring`, `detail` in that order.
#[must_use]
pub fn build_fault(dialect: &DialectContext, fault: &Fault) -> XmlElement {
    let mut element = XmlElement::new(dialect.qualify("Fault"));
    element.add_child("faultcode").add_text(fault.code.clone());
    element.add_child("faultstring").add_text(fault.message.clone());
    element.add_child("detail").add_text(fault.detail.clone());
    element
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_dialect() -> DialectContext {
        DialectContext::from_config(&DispatcherConfig::default())
    }

    #[test]
    fn detects_soap12_alias() {
        let doc = XmlElement::parse(&format!(
            r#"<X:Envelope xmlns:X="{SOAP12_ENVELOPE_URI}"><X:Body><Op/></X:Body></X:Envelope>"#
        ))
        .unwrap();
        let dialect = detect_dialect(&doc, default_dialect());
        assert_eq!(dialect.ns_alias, "X");
        assert_eq!(dialect.ns_uri, SOAP12_ENVELOPE_URI);
    }

    #[test]
    fn detects_legacy_soap12_uri() {
        let doc = XmlElement::parse(&format!(
            r#"<env:Envelope xmlns:env="{SOAP12_LEGACY_ENVELOPE_URI}"/>"#
        ))
        .unwrap();
        assert_eq!(detect_dialect(&doc, default_dialect()).ns_alias, "env");
    }

    #[test]
    fn keeps_default_without_soap_declaration() {
        let doc = XmlElement::parse(r#"<a:Envelope xmlns:a="urn:other"/>"#).unwrap();
        assert_eq!(detect_dialect(&doc, default_dialect()), default_dialect());
    }

    #[test]
    fn default_namespace_declaration_selects_empty_alias() {
        let doc = XmlElement::parse(&format!(
            r#"<Envelope xmlns="{SOAP11_ENVELOPE_URI}"><Body><Op/></Body></Envelope>"#
        ))
        .unwrap();
        let dialect = detect_dialect(&doc, default_dialect());
        assert_eq!(dialect.ns_alias, "");
        assert_eq!(locate_operation(&doc, &dialect).unwrap().name, "Op");
    }

    #[test]
    fn locate_operation_returns_name_and_prefix() {
        let doc = XmlElement::parse(&format!(
            r#"<soapenv:Envelope xmlns:soapenv="{SOAP11_ENVELOPE_URI}" xmlns:pys="urn:pys">
                 <soapenv:Header/><soapenv:Body><pys:Adder/></soapenv:Body></soapenv:Envelope>"#
        ))
        .unwrap();
        let dialect = detect_dialect(&doc, default_dialect());
        let located = locate_operation(&doc, &dialect).unwrap();
        assert_eq!(located.name, "Adder");
        assert_eq!(located.prefix, Some("pys"));
        assert_eq!(resolve_prefix(&doc, &dialect, located.element, "pys"), Some("urn:pys"));
    }

    #[test]
    fn locate_operation_structure_errors() {
        let dialect = default_dialect();
        let missing = XmlElement::parse(&format!(r#"<soap:Envelope xmlns:soap="{SOAP11_ENVELOPE_URI}"/>"#)).unwrap();
        assert_eq!(
            locate_operation(&missing, &dialect).unwrap_err(),
            StructureError::MissingBody("soap:Body".to_string())
        );

        let empty = XmlElement::parse(&format!(
            r#"<soap:Envelope xmlns:soap="{SOAP11_ENVELOPE_URI}"><soap:Body> </soap:Body></soap:Envelope>"#
        ))
        .unwrap();
        assert_eq!(locate_operation(&empty, &dialect).unwrap_err().kind(), "EmptyBodyError");
    }

    #[test]
    fn envelope_declares_dialect_and_response_namespace() {
        let dialect = DialectContext {
            ns_alias: "X".to_string(),
            ns_uri: SOAP12_ENVELOPE_URI.to_string(),
            body_prefix: Some("ns0".to_string()),
            target_namespace: Some("urn:svc".to_string()),
        };
        let envelope = build_envelope(&dialect, XmlElement::new("ns0:OpResponse"));
        assert_eq!(envelope.name(), "X:Envelope");
        assert_eq!(envelope.attribute("xmlns:X"), Some(SOAP12_ENVELOPE_URI));
        assert_eq!(envelope.attribute("xmlns:ns0"), Some("urn:svc"));
        let body = envelope.child("X:Body").unwrap();
        assert_eq!(body.children().next().unwrap().name(), "ns0:OpResponse");
    }

    #[test]
    fn fault_children_in_fixed_order() {
        let fault = Fault {
            code: "Client.KeyError".to_string(),
            message: "unknown".to_string(),
            detail: "trace".to_string(),
        };
        let element = build_fault(&default_dialect(), &fault);
        assert_eq!(element.name(), "soap:Fault");
        let names: Vec<&str> = element.children().map(XmlElement::name).collect();
        assert_eq!(names, vec!["faultcode", "faultstring", "detail"]);
        assert_eq!(element.child("faultcode").unwrap().text(), "Client.KeyError");
    }
}
