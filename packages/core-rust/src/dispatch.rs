//! Request dispatch: one SOAP envelope in, one SOAP envelope out.
//!
//! Stages run in order (parse, resolve, decode, invoke, encode) and the first
//! failing stage short-circuits into a fault. Failures before the handler is
//! invoked are `Client` faults; failures from invocation onward are `Server`
//! faults.

use std::any::Any;
use std::error::Error as _;
use std::fmt::{self, Write as _};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use quick_xml::escape::escape;
use tracing::{debug, error, warn};

use crate::config::DispatcherConfig;
use crate::envelope::{
    build_envelope, build_fault, detect_dialect, locate_operation, resolve_prefix, DialectContext,
    Fault, StructureError,
};
use crate::marshal::{marshal, unmarshal, DecodeError, EncodeError, MarshalStyle};
use crate::registry::{HandlerError, Operation, OperationRegistry};
use crate::sample::{render_help, OperationHelp, SampleError};
use crate::schema::generate_wsdl;
use crate::types::{Arguments, Value};
use crate::xml::{XmlElement, XmlError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Which party a fault blames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultSide {
    Client,
    Server,
}

impl fmt::Display for FaultSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Client => "Client",
            Self::Server => "Server",
        })
    }
}

/// A failure at one dispatch stage.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Parse(#[from] XmlError),
    #[error(transparent)]
    Structure(#[from] StructureError),
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("{0}")]
    Handler(HandlerError),
    #[error("handler panicked: {0}")]
    Panic(String),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl DispatchError {
    #[must_use]
    pub fn side(&self) -> FaultSide {
        match self {
            Self::Parse(_) | Self::Structure(_) | Self::UnknownOperation(_) | Self::Decode(_) => {
                FaultSide::Client
            }
            Self::Handler(_) | Self::Panic(_) | Self::Encode(_) => FaultSide::Server,
        }
    }

    /// Cause kind used as the fault code suffix.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Parse(err) => err.kind(),
            Self::Structure(err) => err.kind(),
            Self::UnknownOperation(_) => "UnknownOperationError",
            Self::Decode(err) => err.kind(),
            Self::Handler(err) => err.kind(),
            Self::Panic(_) => "Panic",
            Self::Encode(_) => "EncodeError",
        }
    }

    /// `<side>.<kind>`.
    #[must_use]
    pub fn fault_code(&self) -> String {
        format!("{}.{}", self.side(), self.kind())
    }

    /// Full error text, including the cause chain, for the fault `detail`.
    #[must_use]
    pub fn trace(&self) -> String {
        match self {
            Self::Handler(err) => format!("{err:?}"),
            other => {
                let mut text = format!("{}: {other}", other.kind());
                let mut source = other.source();
                while let Some(cause) = source {
                    let _ = write!(text, "\nCaused by: {cause}");
                    source = cause.source();
                }
                text
            }
        }
    }

    #[must_use]
    pub fn to_fault(&self) -> Fault {
        Fault {
            code: self.fault_code(),
            message: self.to_string(),
            detail: self.trace(),
        }
    }
}

/// Failure to render help for one operation.
#[derive(Debug, thiserror::Error)]
pub enum HelpError {
    #[error("Method not found: {0}")]
    UnknownOperation(String),
    #[error(transparent)]
    Render(#[from] SampleError),
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Answers SOAP requests against a fixed operation registry.
///
/// Stateless per request; share it behind `Arc` across serving threads.
#[derive(Debug)]
pub struct Dispatcher {
    config: DispatcherConfig,
    registry: Arc<OperationRegistry>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(config: DispatcherConfig, registry: OperationRegistry) -> Self {
        Self::with_shared_registry(config, Arc::new(registry))
    }

    #[must_use]
    pub fn with_shared_registry(config: DispatcherConfig, registry: Arc<OperationRegistry>) -> Self {
        Self { config, registry }
    }

    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Processes one raw request and returns the raw response envelope.
    ///
    /// Never fails: every error becomes a fault envelope in the request's
    /// dialect (or the configured one if the request could not be read).
    #[must_use]
    pub fn dispatch(&self, xml: &str) -> String {
        let mut dialect = DialectContext::from_config(&self.config);
        let result = self.process(xml, &mut dialect);
        Self::respond(&dialect, result)
    }

    /// [`dispatch`](Self::dispatch) for a raw body. Anything that is not
    /// UTF-8 is answered with a `Client.EncodingError` fault.
    #[must_use]
    pub fn dispatch_bytes(&self, body: &[u8]) -> String {
        match std::str::from_utf8(body) {
            Ok(xml) => self.dispatch(xml),
            Err(err) => {
                let dialect = DialectContext::from_config(&self.config);
                Self::respond(&dialect, Err(XmlError::from(err).into()))
            }
        }
    }

    fn respond(dialect: &DialectContext, result: Result<XmlElement, DispatchError>) -> String {
        let body = match result {
            Ok(response) => response,
            Err(err) => {
                let fault = err.to_fault();
                warn!(code = %fault.code, message = %fault.message, "returning SOAP fault");
                build_fault(dialect, &fault)
            }
        };
        build_envelope(dialect, body)
            .to_xml(false)
            .unwrap_or_else(|err| {
                error!(error = %err, "failed to serialize response envelope");
                fallback_fault(dialect, &err)
            })
    }

    fn process(&self, xml: &str, dialect: &mut DialectContext) -> Result<XmlElement, DispatchError> {
        // Parsing
        let document = XmlElement::parse(xml)?;

        // Resolving
        *dialect = detect_dialect(&document, dialect.clone());
        let located = locate_operation(&document, dialect)?;
        if let Some(prefix) = located.prefix {
            if let Some(uri) = resolve_prefix(&document, dialect, located.element, prefix) {
                dialect.target_namespace = Some(uri.to_string());
            }
            // A prefix with nothing to bind it to would leave the response unbound.
            let bindable = prefix == dialect.ns_alias || dialect.target_namespace.is_some();
            dialect.body_prefix = bindable.then(|| prefix.to_string());
        } else {
            dialect.body_prefix = None;
        }
        let operation = self
            .registry
            .get(located.name)
            .ok_or_else(|| DispatchError::UnknownOperation(located.name.to_string()))?;
        debug!(operation = operation.name(), dialect = %dialect.ns_uri, "dispatching operation");

        // Decoding
        let args = Arguments::new(unmarshal(located.element, operation.args())?);

        // Invoking
        let result = invoke(operation, &args)?;

        // Encoding
        encode_response(operation, &result, dialect)
    }

    /// `(name, doc)` of every registered operation.
    #[must_use]
    pub fn list_operations(&self) -> Vec<(&str, &str)> {
        self.registry.list()
    }

    /// Sample request/response pair for one operation.
    ///
    /// # Errors
    ///
    /// `UnknownOperation` if `name` is not registered, `Render` if the
    /// samples cannot be serialized.
    pub fn help(&self, name: &str) -> Result<OperationHelp, HelpError> {
        let operation = self
            .registry
            .get(name)
            .ok_or_else(|| HelpError::UnknownOperation(name.to_string()))?;
        Ok(render_help(&self.config, operation)?)
    }

    /// WSDL 1.1 description of every registered operation.
    ///
    /// # Errors
    ///
    /// Returns `XmlError` if the document cannot be serialized.
    pub fn describe(&self) -> Result<String, XmlError> {
        generate_wsdl(&self.config, &self.registry).to_xml(true)
    }
}

fn invoke(operation: &Operation, args: &Arguments) -> Result<Value, DispatchError> {
    match catch_unwind(AssertUnwindSafe(|| operation.invoke(args))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(DispatchError::Handler(err)),
        Err(payload) => Err(DispatchError::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// `<OperationResponse>` holding the result marshalled under the first
/// declared return field. Further return fields are not serialized.
fn encode_response(
    operation: &Operation,
    result: &Value,
    dialect: &DialectContext,
) -> Result<XmlElement, DispatchError> {
    let prefix = dialect.body_prefix.as_deref();
    let local = format!("{}Response", operation.name());
    let mut response = match prefix {
        Some(prefix) => XmlElement::new(format!("{prefix}:{local}")),
        None => {
            let mut element = XmlElement::new(local);
            if let Some(namespace) = &dialect.target_namespace {
                element.add_attribute("xmlns", namespace.clone());
            }
            element
        }
    };
    if let Some(first) = operation.returns().fields().first() {
        marshal(&mut response, &first.name, result, &first.ty, &MarshalStyle::prefixed(prefix))?;
    }
    Ok(response)
}

fn fallback_fault(dialect: &DialectContext, err: &XmlError) -> String {
    let message = escape(err.to_string()).into_owned();
    let envelope = dialect.qualify("Envelope");
    let body = dialect.qualify("Body");
    let fault = dialect.qualify("Fault");
    let declaration = if dialect.ns_alias.is_empty() {
        "xmlns".to_string()
    } else {
        format!("xmlns:{}", dialect.ns_alias)
    };
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><{envelope} {declaration}=\"{uri}\"><{body}><{fault}>\
         <faultcode>Server.{kind}</faultcode><faultstring>{message}</faultstring><detail>{message}</detail>\
         </{fault}></{body}></{envelope}>",
        uri = escape(dialect.ns_uri.as_str()),
        kind = err.kind(),
    )
}
