use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::types::{Arguments, StructType, Value};

// ---------------------------------------------------------------------------
// HandlerError
// ---------------------------------------------------------------------------

/// Failure raised by an operation handler.
///
/// Any `std::error::Error` converts into it with `?`; the error's type name
/// is kept as the fault kind (`Server.<kind>`).
pub struct HandlerError {
    kind: String,
    error: anyhow::Error,
}

impl HandlerError {
    /// Wraps an arbitrary error under an explicit kind.
    #[must_use]
    pub fn new(kind: impl Into<String>, error: anyhow::Error) -> Self {
        Self {
            kind: kind.into(),
            error,
        }
    }

    /// A message-only failure.
    #[must_use]
    pub fn msg(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(kind, anyhow::Error::msg(message.into()))
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }
}

impl<E> From<E> for HandlerError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self {
            kind: short_type_name::<E>().to_string(),
            error: anyhow::Error::new(error),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?}", self.kind, self.error)
    }
}

/// `a::b::Foo<c::Bar>` -> `Foo`.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// ---------------------------------------------------------------------------
// OperationHandler
// ---------------------------------------------------------------------------

/// Native implementation of a remote operation.
///
/// Handlers run synchronously on the caller's thread.
pub trait OperationHandler: Send + Sync {
    /// Invoke with decoded arguments.
    ///
    /// # Errors
    ///
    /// Any failure becomes a `Server` fault.
    fn call(&self, args: &Arguments) -> Result<Value, HandlerError>;
}

impl<F> OperationHandler for F
where
    F: Fn(&Arguments) -> Result<Value, HandlerError> + Send + Sync,
{
    fn call(&self, args: &Arguments) -> Result<Value, HandlerError> {
        self(args)
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A registered operation: handler plus argument and return shapes.
pub struct Operation {
    name: String,
    handler: Arc<dyn OperationHandler>,
    returns: StructType,
    args: StructType,
    doc: String,
}

impl Operation {
    /// Creates an operation from a closure handler.
    pub fn new<F>(name: impl Into<String>, handler: F, returns: StructType, args: StructType) -> Self
    where
        F: Fn(&Arguments) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        Self::with_handler(name, Arc::new(handler), returns, args)
    }

    /// Creates an operation from a shared handler object.
    pub fn with_handler(
        name: impl Into<String>,
        handler: Arc<dyn OperationHandler>,
        returns: StructType,
        args: StructType,
    ) -> Self {
        Self {
            name: name.into(),
            handler,
            returns,
            args,
            doc: String::new(),
        }
    }

    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn set_doc(&mut self, doc: impl Into<String>) -> &mut Self {
        self.doc = doc.into();
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn args(&self) -> &StructType {
        &self.args
    }

    #[must_use]
    pub fn returns(&self) -> &StructType {
        &self.returns
    }

    #[must_use]
    pub fn doc(&self) -> &str {
        &self.doc
    }

    /// Calls the handler.
    ///
    /// # Errors
    ///
    /// Propagates the handler's error.
    pub fn invoke(&self, args: &Arguments) -> Result<Value, HandlerError> {
        self.handler.call(args)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("returns", &self.returns)
            .field("args", &self.args)
            .field("doc", &self.doc)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// OperationRegistry
// ---------------------------------------------------------------------------

/// Operations keyed by name, in registration order.
///
/// Filled during setup through `&mut self`; shared read-only (behind `Arc`)
/// once serving starts, so lookups need no locking.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    operations: Vec<Operation>,
    by_name: HashMap<String, usize>,
}

impl OperationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an operation. A repeated name replaces the earlier operation
    /// and keeps its position.
    pub fn register(&mut self, operation: Operation) -> &mut Operation {
        let index = match self.by_name.get(operation.name()) {
            Some(&index) => {
                self.operations[index] = operation;
                index
            }
            None => {
                let index = self.operations.len();
                self.by_name.insert(operation.name().to_string(), index);
                self.operations.push(operation);
                index
            }
        };
        &mut self.operations[index]
    }

    /// Registers a closure handler under `name`.
    pub fn register_operation<F>(
        &mut self,
        name: impl Into<String>,
        handler: F,
        returns: StructType,
        args: StructType,
    ) -> &mut Operation
    where
        F: Fn(&Arguments) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        self.register(Operation::new(name, handler, returns, args))
    }

    /// Case-sensitive lookup.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.by_name.get(name).map(|&index| &self.operations[index])
    }

    /// Operations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    /// `(name, doc)` for every operation, in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<(&str, &str)> {
        self.iter().map(|op| (op.name(), op.doc())).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::types::{ScalarKind, ValueError};

    fn echo_shape() -> (StructType, StructType) {
        (
            StructType::new().field("out0", ScalarKind::String),
            StructType::new().field("in0", ScalarKind::String),
        )
    }

    fn echo(args: &Arguments) -> Result<Value, HandlerError> {
        Ok(args.require("in0")?.clone())
    }

    #[test]
    fn register_and_get_by_name() {
        let mut registry = OperationRegistry::new();
        let (returns, args) = echo_shape();
        registry.register_operation("Dummy", echo, returns, args).set_doc("Echo in0");

        let op = registry.get("Dummy").unwrap();
        assert_eq!(op.name(), "Dummy");
        assert_eq!(op.doc(), "Echo in0");
        assert!(registry.get("dummy").is_none(), "lookup is case-sensitive");
    }

    #[test]
    fn iteration_follows_registration_order() {
        let mut registry = OperationRegistry::new();
        for name in ["first", "second", "third"] {
            let (returns, args) = echo_shape();
            registry.register(Operation::new(name, echo, returns, args));
        }
        let names: Vec<&str> = registry.iter().map(Operation::name).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn reregistering_replaces_in_place() {
        let mut registry = OperationRegistry::new();
        for name in ["a", "b"] {
            let (returns, args) = echo_shape();
            registry.register(Operation::new(name, echo, returns, args));
        }
        let (returns, args) = echo_shape();
        registry.register(Operation::new("a", echo, returns, args).with_doc("replaced"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.list(), vec![("a", "replaced"), ("b", "")]);
    }

    #[test]
    fn invoke_calls_handler() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let (returns, args) = echo_shape();
        let op = Operation::new(
            "Count",
            move |_args: &Arguments| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Null)
            },
            returns,
            args,
        );
        op.invoke(&Arguments::default()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_error_records_type_name() {
        let err = echo(&Arguments::default()).unwrap_err();
        assert_eq!(err.kind(), "ValueError");
        assert_eq!(err.to_string(), "missing field: in0");
        assert!(format!("{err:?}").starts_with("ValueError: "));
    }

    #[test]
    fn short_type_name_strips_path_and_generics() {
        assert_eq!(short_type_name::<ValueError>(), "ValueError");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
    }
}
