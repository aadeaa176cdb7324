//! WSDL 1.1 generation from the operation registry.
//!
//! Every operation's argument and return structs are lowered to XML Schema:
//! nested structs become `xsd:all` complex types named `<Parent><Field>`,
//! arrays become `xsd:sequence` complex types named `ArrayOf<Parent><Field>`
//! whose members repeat without bound. Output order follows registration
//! order, so the document is stable for a given registry.

use crate::config::DispatcherConfig;
use crate::registry::OperationRegistry;
use crate::types::{Field, TypeDescriptor};
use crate::xml::XmlElement;

pub const WSDL_NS: &str = "http://schemas.xmlsoap.org/wsdl/";
pub const WSDL_SOAP_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub const SOAP_HTTP_TRANSPORT: &str = "http://schemas.xmlsoap.org/soap/http";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Grouping {
    /// Top-level element wrapping an anonymous complex type.
    Element,
    /// Named complex type with order-independent members.
    All,
    /// Named complex type whose members repeat without bound.
    Sequence,
}

/// Schema items in emission order. A parent precedes the types it references.
#[derive(Default)]
struct SchemaBuilder {
    items: Vec<XmlElement>,
}

impl SchemaBuilder {
    fn lower(&mut self, name: &str, fields: &[Field], grouping: Grouping) {
        let slot = self.items.len();
        self.items.push(XmlElement::new("xsd:complexType"));

        let repeated = grouping == Grouping::Sequence;
        let mut group = XmlElement::new(if repeated { "xsd:sequence" } else { "xsd:all" });
        for field in fields {
            let mut member = XmlElement::new("xsd:element").with_attribute("name", field.name.clone());
            if repeated {
                member.add_attribute("minOccurs", "0");
                member.add_attribute("maxOccurs", "unbounded");
            }
            let ty = match &field.ty {
                TypeDescriptor::Scalar(kind) => kind.xsd_type().to_string(),
                TypeDescriptor::Struct(shape) => {
                    let type_name = format!("{name}{}", field.name);
                    self.lower(&type_name, shape.fields(), Grouping::All);
                    format!("tns:{type_name}")
                }
                TypeDescriptor::Array(item) => {
                    let type_name = format!("ArrayOf{name}{}", field.name);
                    self.lower(&type_name, item.fields(), Grouping::Sequence);
                    format!("tns:{type_name}")
                }
            };
            member.add_attribute("type", ty);
            group.push_child(member);
        }

        self.items[slot] = if grouping == Grouping::Element {
            let mut element = XmlElement::new("xsd:element").with_attribute("name", name);
            element.add_child("xsd:complexType").push_child(group);
            element
        } else {
            let mut complex = XmlElement::new("xsd:complexType").with_attribute("name", name);
            complex.push_child(group);
            complex
        };
    }
}

/// Builds the `wsdl:definitions` document for every registered operation.
#[must_use]
pub fn generate_wsdl(config: &DispatcherConfig, registry: &OperationRegistry) -> XmlElement {
    let namespace = config.namespace.clone().unwrap_or_default();
    let name = config.name.as_str();

    let mut definitions = XmlElement::new("wsdl:definitions")
        .with_attribute("name", name)
        .with_attribute("targetNamespace", namespace.clone())
        .with_attribute("xmlns:tns", namespace.clone())
        .with_attribute("xmlns:soap", WSDL_SOAP_NS)
        .with_attribute("xmlns:wsdl", WSDL_NS)
        .with_attribute("xmlns:xsd", XSD_NS);
    definitions
        .add_child("wsdl:documentation")
        .add_text(config.documentation.clone());

    // types
    let mut builder = SchemaBuilder::default();
    for operation in registry.iter() {
        builder.lower(operation.name(), operation.args().fields(), Grouping::Element);
        builder.lower(
            &format!("{}Response", operation.name()),
            operation.returns().fields(),
            Grouping::Element,
        );
    }
    let mut schema = XmlElement::new("xsd:schema")
        .with_attribute("targetNamespace", namespace)
        .with_attribute("elementFormDefault", "qualified");
    for item in builder.items {
        schema.push_child(item);
    }
    definitions.add_child("wsdl:types").push_child(schema);

    // messages
    for operation in registry.iter() {
        for (suffix, element) in [("Input", ""), ("Output", "Response")] {
            definitions
                .add_child("wsdl:message")
                .add_attribute("name", format!("{}{suffix}", operation.name()))
                .add_child("wsdl:part")
                .add_attribute("name", "parameters")
                .add_attribute("element", format!("tns:{}{element}", operation.name()));
        }
    }

    // portType
    let port_type = definitions
        .add_child("wsdl:portType")
        .add_attribute("name", format!("{name}PortType"));
    for operation in registry.iter() {
        let op = port_type
            .add_child("wsdl:operation")
            .add_attribute("name", operation.name());
        op.add_child("wsdl:input")
            .add_attribute("message", format!("tns:{}Input", operation.name()));
        op.add_child("wsdl:output")
            .add_attribute("message", format!("tns:{}Output", operation.name()));
    }

    // binding: one SOAPAction for every operation
    let binding = definitions
        .add_child("wsdl:binding")
        .add_attribute("name", format!("{name}Binding"))
        .add_attribute("type", format!("tns:{name}PortType"));
    binding
        .add_child("soap:binding")
        .add_attribute("style", "document")
        .add_attribute("transport", SOAP_HTTP_TRANSPORT);
    for operation in registry.iter() {
        let op = binding
            .add_child("wsdl:operation")
            .add_attribute("name", operation.name());
        op.add_child("soap:operation")
            .add_attribute("soapAction", config.action.clone())
            .add_attribute("style", "document");
        for direction in ["wsdl:input", "wsdl:output"] {
            op.add_child(direction)
                .add_child("soap:body")
                .add_attribute("use", "literal");
        }
    }

    // service
    let service = definitions
        .add_child("wsdl:service")
        .add_attribute("name", format!("{name}Service"));
    service
        .add_child("wsdl:documentation")
        .add_text(config.documentation.clone());
    service
        .add_child("wsdl:port")
        .add_attribute("name", name)
        .add_attribute("binding", format!("tns:{name}Binding"))
        .add_child("soap:address")
        .add_attribute("location", config.location.clone());

    definitions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::HandlerError;
    use crate::types::{Arguments, ScalarKind, StructType, Value};

    fn noop(_args: &Arguments) -> Result<Value, HandlerError> {
        Ok(Value::Null)
    }

    fn config() -> DispatcherConfig {
        DispatcherConfig {
            name: "Sample".to_string(),
            documentation: "Example service".to_string(),
            action: "http://localhost:8008/".to_string(),
            location: "http://localhost:8008/".to_string(),
            namespace: Some("http://example.com/sample/".to_string()),
            ..DispatcherConfig::default()
        }
    }

    fn registry() -> OperationRegistry {
        let mut registry = OperationRegistry::new();
        registry.register_operation(
            "Adder",
            noop,
            StructType::new().field(
                "AddResult",
                StructType::new()
                    .field("ab", ScalarKind::Integer)
                    .field("dd", ScalarKind::String),
            ),
            StructType::new()
                .field(
                    "p",
                    StructType::new()
                        .field("a", ScalarKind::Integer)
                        .field("b", ScalarKind::Integer),
                )
                .field(
                    "c",
                    TypeDescriptor::array(StructType::new().field("d", ScalarKind::String)),
                ),
        );
        registry.register_operation(
            "Dummy",
            noop,
            StructType::new().field("out0", ScalarKind::String),
            StructType::new().field("in0", ScalarKind::String),
        );
        registry
    }

    fn schema_items(wsdl: &XmlElement) -> Vec<&XmlElement> {
        wsdl.child("wsdl:types")
            .and_then(|types| types.child("xsd:schema"))
            .expect("schema")
            .children()
            .collect()
    }

    #[test]
    fn schema_items_in_emission_order() {
        let wsdl = generate_wsdl(&config(), &registry());
        let names: Vec<(&str, &str)> = schema_items(&wsdl)
            .into_iter()
            .map(|item| (item.name(), item.attribute("name").unwrap()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("xsd:element", "Adder"),
                ("xsd:complexType", "Adderp"),
                ("xsd:complexType", "ArrayOfAdderc"),
                ("xsd:element", "AdderResponse"),
                ("xsd:complexType", "AdderResponseAddResult"),
                ("xsd:element", "Dummy"),
                ("xsd:element", "DummyResponse"),
            ]
        );
    }

    #[test]
    fn struct_fields_use_all_and_reference_named_types() {
        let wsdl = generate_wsdl(&config(), &registry());
        let items = schema_items(&wsdl);
        let adder = items[0].child("xsd:complexType").unwrap().child("xsd:all").unwrap();
        let members: Vec<(&str, &str)> = adder
            .children()
            .map(|m| (m.attribute("name").unwrap(), m.attribute("type").unwrap()))
            .collect();
        assert_eq!(members, vec![("p", "tns:Adderp"), ("c", "tns:ArrayOfAdderc")]);

        let p = items[1].child("xsd:all").unwrap();
        assert_eq!(p.child("xsd:element").unwrap().attribute("type"), Some("xsd:integer"));
    }

    #[test]
    fn array_members_repeat_without_bound() {
        let wsdl = generate_wsdl(&config(), &registry());
        let sequence = schema_items(&wsdl)[2].child("xsd:sequence").unwrap();
        let d = sequence.child("xsd:element").unwrap();
        assert_eq!(d.attribute("name"), Some("d"));
        assert_eq!(d.attribute("minOccurs"), Some("0"));
        assert_eq!(d.attribute("maxOccurs"), Some("unbounded"));
        assert_eq!(d.attribute("type"), Some("xsd:string"));
    }

    #[test]
    fn messages_port_type_binding_and_service() {
        let wsdl = generate_wsdl(&config(), &registry());
        let messages: Vec<&str> = wsdl
            .children()
            .filter(|c| c.name() == "wsdl:message")
            .map(|m| m.attribute("name").unwrap())
            .collect();
        assert_eq!(messages, vec!["AdderInput", "AdderOutput", "DummyInput", "DummyOutput"]);

        let port_type = wsdl.child("wsdl:portType").unwrap();
        assert_eq!(port_type.attribute("name"), Some("SamplePortType"));
        assert_eq!(port_type.children().count(), 2);

        let binding = wsdl.child("wsdl:binding").unwrap();
        assert_eq!(binding.attribute("type"), Some("tns:SamplePortType"));
        for op in binding.children().filter(|c| c.name() == "wsdl:operation") {
            let soap_op = op.child("soap:operation").unwrap();
            assert_eq!(soap_op.attribute("soapAction"), Some("http://localhost:8008/"));
            assert_eq!(
                op.child("wsdl:input").unwrap().child("soap:body").unwrap().attribute("use"),
                Some("literal")
            );
        }

        let port = wsdl.child("wsdl:service").unwrap().child("wsdl:port").unwrap();
        assert_eq!(port.attribute("binding"), Some("tns:SampleBinding"));
        assert_eq!(
            port.child("soap:address").unwrap().attribute("location"),
            Some("http://localhost:8008/")
        );
    }

    #[test]
    fn generation_is_byte_stable() {
        let (config, registry) = (config(), registry());
        let first = generate_wsdl(&config, &registry).to_xml(true).unwrap();
        let second = generate_wsdl(&config, &registry).to_xml(true).unwrap();
        assert_eq!(first, second);
        assert!(XmlElement::parse(&first).is_ok());
    }
}
