//! Type-directed conversion between [`Value`]s and XML element trees.
//!
//! The same two functions serve request decoding, response encoding, and
//! sample generation, so documentation samples always match the wire format.

use std::collections::BTreeMap;

use crate::types::{ScalarKind, StructType, TypeDescriptor, Value};
use crate::xml::XmlElement;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Argument decoding failures. Reported as `Client` faults.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("missing field: {field}")]
    MissingField { field: String },
    #[error("field {field}: invalid {kind} value {text:?}")]
    InvalidValue {
        field: String,
        kind: &'static str,
        text: String,
    },
    #[error("unexpected element <{element}> in {field}")]
    UnexpectedElement { field: String, element: String },
}

impl DecodeError {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => "MissingFieldError",
            Self::InvalidValue { .. } => "InvalidValueError",
            Self::UnexpectedElement { .. } => "UnexpectedElementError",
        }
    }
}

/// Result encoding failures. Reported as `Server` faults.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("result field {field} is missing")]
    MissingField { field: String },
    #[error("result field {field}: expected {expected}, found {found}")]
    ShapeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decodes the children of `parent` against `shape`.
///
/// Fields are matched by local name, so qualified and unqualified children
/// decode alike. An absent array field decodes to an empty array.
///
/// # Errors
///
/// `MissingField` for an absent non-array field, `InvalidValue` for scalar
/// text that does not parse, `UnexpectedElement` for an array child that
/// names no item field.
pub fn unmarshal(parent: &XmlElement, shape: &StructType) -> Result<BTreeMap<String, Value>, DecodeError> {
    let mut values = BTreeMap::new();
    for field in shape.fields() {
        let value = match parent.child(&field.name) {
            Some(element) => decode_element(element, &field.name, &field.ty)?,
            None if field.ty.is_array() => Value::Array(Vec::new()),
            None => {
                return Err(DecodeError::MissingField {
                    field: field.name.clone(),
                })
            }
        };
        values.insert(field.name.clone(), value);
    }
    Ok(values)
}

fn decode_element(element: &XmlElement, name: &str, ty: &TypeDescriptor) -> Result<Value, DecodeError> {
    match ty {
        TypeDescriptor::Scalar(kind) => decode_scalar(&element.text(), *kind, name),
        TypeDescriptor::Struct(shape) => unmarshal(element, shape).map(Value::Struct),
        TypeDescriptor::Array(item) => decode_array(element, name, item),
    }
}

/// Each child names one item field. Children accumulate into the current
/// item until a field repeats, which starts the next item.
fn decode_array(element: &XmlElement, name: &str, item: &StructType) -> Result<Value, DecodeError> {
    let mut items = Vec::new();
    let mut current: BTreeMap<String, Value> = BTreeMap::new();
    for child in element.children() {
        let field = item
            .get(child.local_name())
            .ok_or_else(|| DecodeError::UnexpectedElement {
                field: name.to_string(),
                element: child.name().to_string(),
            })?;
        if current.contains_key(&field.name) {
            items.push(Value::Struct(std::mem::take(&mut current)));
        }
        let value = decode_element(child, &field.name, &field.ty)?;
        current.insert(field.name.clone(), value);
    }
    if !current.is_empty() {
        items.push(Value::Struct(current));
    }
    Ok(Value::Array(items))
}

fn decode_scalar(text: &str, kind: ScalarKind, field: &str) -> Result<Value, DecodeError> {
    if kind == ScalarKind::String {
        return Ok(Value::String(text.to_string()));
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    let invalid = || DecodeError::InvalidValue {
        field: field.to_string(),
        kind: kind.label(),
        text: text.to_string(),
    };
    match kind {
        ScalarKind::Integer => trimmed.parse().map(Value::Int).map_err(|_| invalid()),
        ScalarKind::Float => trimmed.parse().map(Value::Float).map_err(|_| invalid()),
        ScalarKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
        ScalarKind::String => unreachable!("handled above"),
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// How emitted child elements are named and annotated.
#[derive(Debug, Clone, Default)]
pub struct MarshalStyle {
    /// Namespace prefix applied to every emitted element.
    pub prefix: Option<String>,
    /// Emit SoapUI-style documentation comments (sample mode).
    pub annotate: bool,
}

impl MarshalStyle {
    #[must_use]
    pub fn prefixed(prefix: Option<&str>) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            annotate: false,
        }
    }

    #[must_use]
    pub fn sample() -> Self {
        Self {
            prefix: None,
            annotate: true,
        }
    }

    fn qualify(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{name}"),
            None => name.to_string(),
        }
    }
}

/// Appends `<name>` under `parent` holding `value`, shaped by `ty`.
///
/// The descriptor decides naming and nesting only; scalar values are written
/// as text whatever their variant.
///
/// # Errors
///
/// `MissingField` if a struct value lacks a descriptor field, `ShapeMismatch`
/// if the value's variant cannot take the descriptor's shape.
pub fn marshal(
    parent: &mut XmlElement,
    name: &str,
    value: &Value,
    ty: &TypeDescriptor,
    style: &MarshalStyle,
) -> Result<(), EncodeError> {
    let mismatch = |expected| EncodeError::ShapeMismatch {
        field: name.to_string(),
        expected,
        found: value.type_name(),
    };
    match ty {
        TypeDescriptor::Scalar(kind) => {
            let text = value.to_text().ok_or_else(|| mismatch("scalar"))?;
            if style.annotate {
                parent.add_comment(format!("type: {}", kind.label()));
            }
            parent.add_child(style.qualify(name)).add_text(text);
        }
        TypeDescriptor::Struct(shape) => {
            let Value::Struct(fields) = value else {
                return Err(mismatch("struct"));
            };
            let element = parent.add_child(style.qualify(name));
            if style.annotate {
                element.add_comment(format!(
                    "You may enter the following {} items in any order",
                    shape.len()
                ));
            }
            for field in shape.fields() {
                let member = fields.get(&field.name).ok_or_else(|| EncodeError::MissingField {
                    field: format!("{name}.{}", field.name),
                })?;
                marshal(element, &field.name, member, &field.ty, style)?;
            }
        }
        TypeDescriptor::Array(item) => {
            let Value::Array(items) = value else {
                return Err(mismatch("array"));
            };
            let element = parent.add_child(style.qualify(name));
            if style.annotate {
                element.add_comment("Zero or more repetitions:");
            }
            for entry in items {
                let Value::Struct(members) = entry else {
                    return Err(EncodeError::ShapeMismatch {
                        field: name.to_string(),
                        expected: "struct item",
                        found: entry.type_name(),
                    });
                };
                for field in item.fields() {
                    if let Some(member) = members.get(&field.name) {
                        marshal(element, &field.name, member, &field.ty, style)?;
                    }
                }
            }
        }
    }
    Ok(())
}
