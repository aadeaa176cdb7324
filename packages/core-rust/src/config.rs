use crate::envelope::SOAP11_ENVELOPE_URI;

/// Service-level settings for the dispatcher and the generated WSDL.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Service name; prefixes the WSDL port type, binding, and service names.
    pub name: String,
    /// Free text placed in `wsdl:documentation`.
    pub documentation: String,
    /// SOAPAction advertised for every operation.
    pub action: String,
    /// Endpoint URL advertised in `soap:address`.
    pub location: String,
    /// Target namespace of the schema and of response elements.
    pub namespace: Option<String>,
    /// Default prefix for response elements, overridden by the request's.
    pub prefix: Option<String>,
    /// Default envelope alias, used until a request declares its own.
    pub soap_ns: String,
    /// Default envelope namespace URI.
    pub soap_uri: String,
}

impl DispatcherConfig {
    /// Default settings with the given service name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            name: "SoapService".to_string(),
            documentation: String::new(),
            action: String::new(),
            location: String::new(),
            namespace: None,
            prefix: None,
            soap_ns: "soap".to_string(),
            soap_uri: SOAP11_ENVELOPE_URI.to_string(),
        }
    }
}
