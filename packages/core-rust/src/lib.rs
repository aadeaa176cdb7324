//! `SoapDispatch` Core: SOAP envelope dispatch plus WSDL and sample
//! generation, all driven by one operation registry.

pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod marshal;
pub mod registry;
pub mod sample;
pub mod schema;
pub mod types;
pub mod xml;

pub use config::DispatcherConfig;
pub use dispatch::{DispatchError, Dispatcher, FaultSide, HelpError};
pub use envelope::{DialectContext, Fault, StructureError};
pub use marshal::{marshal, unmarshal, DecodeError, EncodeError, MarshalStyle};
pub use registry::{HandlerError, Operation, OperationHandler, OperationRegistry};
pub use sample::{OperationHelp, SampleError};
pub use schema::generate_wsdl;
pub use types::{Arguments, Field, ScalarKind, StructType, TypeDescriptor, Value, ValueError};
pub use xml::{XmlElement, XmlError, XmlNode};
