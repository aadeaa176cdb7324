//! Type descriptors and the runtime values that conform to them.
//!
//! A [`TypeDescriptor`] is the single description of an operation's argument
//! or return shape. Both the marshaller and the WSDL generator walk it; nothing
//! in the crate inspects runtime values to discover a shape.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ScalarKind
// ---------------------------------------------------------------------------

/// Primitive leaf kinds carried as element text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    String,
    Integer,
    Float,
    Boolean,
}

impl ScalarKind {
    /// The XML Schema builtin this kind lowers to.
    #[must_use]
    pub fn xsd_type(self) -> &'static str {
        match self {
            Self::String => "xsd:string",
            Self::Integer => "xsd:integer",
            Self::Float => "xsd:float",
            Self::Boolean => "xsd:boolean",
        }
    }

    /// Human label used in sample message comments.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
        }
    }

    /// Default value rendered in sample messages.
    #[must_use]
    pub fn sample_value(self) -> Value {
        match self {
            Self::String => Value::String(String::new()),
            Self::Integer => Value::Int(0),
            Self::Float => Value::Float(0.0),
            Self::Boolean => Value::Bool(false),
        }
    }
}

// ---------------------------------------------------------------------------
// Field / StructType / TypeDescriptor
// ---------------------------------------------------------------------------

/// A named member of a [`StructType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: TypeDescriptor,
}

/// Ordered set of named fields.
///
/// Field order is the emission order for samples and schema elements.
/// Decoding looks fields up by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructType {
    fields: Vec<Field>,
}

impl StructType {
    /// Creates a struct with no fields.
    #[must_use]
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Appends a field, builder style.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, ty: impl Into<TypeDescriptor>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty: ty.into(),
        });
        self
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// A struct value holding the sample value of every field.
    #[must_use]
    pub fn sample_value(&self) -> Value {
        Value::Struct(
            self.fields
                .iter()
                .map(|field| (field.name.clone(), field.ty.sample_value()))
                .collect(),
        )
    }
}

/// Recursive shape of an argument or return value.
///
/// Trees are finite and acyclic: they are built by hand at registration time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeDescriptor {
    Scalar(ScalarKind),
    Struct(StructType),
    /// Zero or more repetitions of one flattened item field set.
    ///
    /// All items share the fields of the item struct; heterogeneous item
    /// shapes cannot be expressed.
    Array(StructType),
}

impl TypeDescriptor {
    /// Shorthand for an array whose items have the given fields.
    #[must_use]
    pub fn array(item: StructType) -> Self {
        Self::Array(item)
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Example value used by sample generation.
    ///
    /// Arrays get one item carrying every item field.
    #[must_use]
    pub fn sample_value(&self) -> Value {
        match self {
            Self::Scalar(kind) => kind.sample_value(),
            Self::Struct(shape) => shape.sample_value(),
            Self::Array(item) => Value::Array(vec![item.sample_value()]),
        }
    }
}

impl From<ScalarKind> for TypeDescriptor {
    fn from(kind: ScalarKind) -> Self {
        Self::Scalar(kind)
    }
}

impl From<StructType> for TypeDescriptor {
    fn from(shape: StructType) -> Self {
        Self::Struct(shape)
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// Native value passed to and returned from operation handlers.
///
/// `Struct` uses `BTreeMap` so equality is field-by-field and independent of
/// wire order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Empty element text for a non-string scalar.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
}

/// Errors raised by the typed accessors on [`Value`] and [`Arguments`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("missing field: {name}")]
    MissingField { name: String },
    #[error("expected {expected}, found {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
}

impl Value {
    /// Builds a struct value from `(name, value)` pairs.
    pub fn structure<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Name of the variant, for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Struct(_) => "struct",
        }
    }

    fn wrong_type(&self, expected: &'static str) -> ValueError {
        ValueError::WrongType {
            expected,
            found: self.type_name(),
        }
    }

    /// Returns the named member of a struct value.
    ///
    /// # Errors
    ///
    /// `WrongType` if this is not a struct, `MissingField` if the member is absent.
    pub fn field(&self, name: &str) -> Result<&Value, ValueError> {
        match self {
            Self::Struct(fields) => fields.get(name).ok_or_else(|| ValueError::MissingField {
                name: name.to_string(),
            }),
            other => Err(other.wrong_type("struct")),
        }
    }

    /// # Errors
    ///
    /// `WrongType` unless this is an integer.
    pub fn int(&self) -> Result<i64, ValueError> {
        match self {
            Self::Int(v) => Ok(*v),
            other => Err(other.wrong_type("integer")),
        }
    }

    /// Integers widen to floats.
    ///
    /// # Errors
    ///
    /// `WrongType` unless this is a float or an integer.
    #[allow(clippy::cast_precision_loss)]
    pub fn float(&self) -> Result<f64, ValueError> {
        match self {
            Self::Float(v) => Ok(*v),
            Self::Int(v) => Ok(*v as f64),
            other => Err(other.wrong_type("float")),
        }
    }

    /// # Errors
    ///
    /// `WrongType` unless this is a boolean.
    pub fn bool(&self) -> Result<bool, ValueError> {
        match self {
            Self::Bool(v) => Ok(*v),
            other => Err(other.wrong_type("boolean")),
        }
    }

    /// # Errors
    ///
    /// `WrongType` unless this is a string.
    pub fn str(&self) -> Result<&str, ValueError> {
        match self {
            Self::String(v) => Ok(v),
            other => Err(other.wrong_type("string")),
        }
    }

    /// # Errors
    ///
    /// `WrongType` unless this is an array.
    pub fn items(&self) -> Result<&[Value], ValueError> {
        match self {
            Self::Array(items) => Ok(items),
            other => Err(other.wrong_type("array")),
        }
    }

    /// Element text for a scalar value; `None` for arrays and structs.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => Some(String::new()),
            Self::Bool(v) => Some(v.to_string()),
            Self::Int(v) => Some(v.to_string()),
            Self::Float(v) => Some(v.to_string()),
            Self::String(v) => Some(v.clone()),
            Self::Array(_) | Self::Struct(_) => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Decoded call arguments, keyed by argument field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: BTreeMap<String, Value>,
}

impl Arguments {
    #[must_use]
    pub fn new(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns the named argument.
    ///
    /// # Errors
    ///
    /// `MissingField` if the argument was not decoded.
    pub fn require(&self, name: &str) -> Result<&Value, ValueError> {
        self.values.get(name).ok_or_else(|| ValueError::MissingField {
            name: name.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.values
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        write!(f, "({})", names.join(", "))
    }
}
