//! Default-valued request/response envelopes for one operation.

use crate::config::DispatcherConfig;
use crate::envelope::{build_envelope, DialectContext};
use crate::marshal::{marshal, EncodeError, MarshalStyle};
use crate::registry::Operation;
use crate::types::StructType;
use crate::xml::{XmlElement, XmlError};

/// Rendered documentation for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHelp {
    /// A request envelope that dispatches as-is.
    pub request: String,
    pub response: String,
    pub doc: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Xml(#[from] XmlError),
}

/// Renders the sample pair in the configured default dialect.
///
/// Elements are unprefixed and carry the target namespace as the default
/// namespace, so the request decodes to exactly the sample values.
///
/// # Errors
///
/// Fails only if the samples cannot be serialized.
pub fn render_help(config: &DispatcherConfig, operation: &Operation) -> Result<OperationHelp, SampleError> {
    let dialect = DialectContext {
        body_prefix: None,
        ..DialectContext::from_config(config)
    };
    let request = sample_element(config, operation.name(), operation.args())?;
    let response = sample_element(
        config,
        &format!("{}Response", operation.name()),
        operation.returns(),
    )?;
    Ok(OperationHelp {
        request: build_envelope(&dialect, request).to_xml(true)?,
        response: build_envelope(&dialect, response).to_xml(true)?,
        doc: operation.doc().to_string(),
    })
}

fn sample_element(config: &DispatcherConfig, name: &str, shape: &StructType) -> Result<XmlElement, EncodeError> {
    let mut element = XmlElement::new(name);
    if let Some(namespace) = &config.namespace {
        element.add_attribute("xmlns", namespace.clone());
    }
    let style = MarshalStyle::sample();
    for field in shape.fields() {
        marshal(&mut element, &field.name, &field.ty.sample_value(), &field.ty, &style)?;
    }
    Ok(element)
}
