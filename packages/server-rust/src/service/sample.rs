//! The sample operations and the two canned requests used by `local` mode.

use soapdispatch_core::{
    Arguments, Dispatcher, DispatcherConfig, HandlerError, OperationRegistry, ScalarKind,
    StructType, TypeDescriptor, Value,
};

pub const SERVICE_NAME: &str = "SampleSoapService";
pub const SERVICE_LOCATION: &str = "http://localhost:8008/";
pub const SERVICE_NAMESPACE: &str = "http://example.com/sample/";
pub const SERVICE_PREFIX: &str = "ns0";
pub const SERVICE_DOCUMENTATION: &str = "Example SOAP service";

/// Classic SOAP 1.1 dialect: unprefixed operation element with its own
/// default namespace.
pub const SAMPLE_REQUEST_CLASSIC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
   <soap:Body>
     <Adder xmlns="http://example.com/sample.wsdl">
       <p>
        <a>1</a>
        <b>2</b>
       </p>
       <c>
        <d>hola</d>
        <d>chau</d>
       </c>
    </Adder>
   </soap:Body>
</soap:Envelope>"#;

/// SoapUI dialect: `soapenv` alias and a prefixed body. The `dx` item is
/// not an item field of `c`, so this request answers with a client fault.
pub const SAMPLE_REQUEST_SOAPUI: &str = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:pys="http://example.com/sample/">
   <soapenv:Header/>
   <soapenv:Body>
      <pys:Adder>
         <!--You may enter the following 2 items in any order-->
         <pys:p>
            <!--You may enter the following 2 items in any order-->
            <!--type: integer-->
            <pys:a>9</pys:a>
            <!--type: integer-->
            <pys:b>3</pys:b>
         </pys:p>
         <pys:c>
            <!--Zero or more repetitions:-->
            <!--type: string-->
            <pys:dx>foo</pys:dx>
            <pys:d></pys:d>
         </pys:c>
      </pys:Adder>
   </soapenv:Body>
</soapenv:Envelope>"#;

/// `AddResult.ab = p.a + p.b`, `AddResult.dd` = every `c[].d` concatenated.
fn adder(args: &Arguments) -> Result<Value, HandlerError> {
    let p = args.require("p")?;
    let sum = p
        .field("a")?
        .int()?
        .checked_add(p.field("b")?.int()?)
        .ok_or_else(|| HandlerError::msg("OverflowError", "a + b overflows a 64-bit integer"))?;
    let mut dd = String::new();
    for item in args.require("c")?.items()? {
        dd.push_str(item.field("d")?.str()?);
    }
    Ok(Value::structure([("ab", Value::Int(sum)), ("dd", Value::String(dd))]))
}

fn dummy(args: &Arguments) -> Result<Value, HandlerError> {
    Ok(args.require("in0")?.clone())
}

/// Dispatcher settings matching the CLI defaults.
#[must_use]
pub fn sample_config() -> DispatcherConfig {
    DispatcherConfig {
        name: SERVICE_NAME.to_string(),
        documentation: SERVICE_DOCUMENTATION.to_string(),
        action: SERVICE_LOCATION.to_string(),
        location: SERVICE_LOCATION.to_string(),
        namespace: Some(SERVICE_NAMESPACE.to_string()),
        prefix: Some(SERVICE_PREFIX.to_string()),
        ..DispatcherConfig::default()
    }
}

#[must_use]
pub fn sample_registry() -> OperationRegistry {
    let mut registry = OperationRegistry::new();
    registry
        .register_operation(
            "Adder",
            adder,
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
        )
        .set_doc("Adds p.a and p.b and concatenates every c.d");
    registry
        .register_operation(
            "Dummy",
            dummy,
            StructType::new().field("out0", ScalarKind::String),
            StructType::new().field("in0", ScalarKind::String),
        )
        .set_doc("Echoes in0 as out0");
    registry
}

#[must_use]
pub fn sample_dispatcher(config: DispatcherConfig) -> Dispatcher {
    Dispatcher::new(config, sample_registry())
}

#[cfg(test)]
mod tests {
    use soapdispatch_core::XmlElement;

    use super::*;

    fn body_child(response: &str) -> XmlElement {
        let doc = XmlElement::parse(response).unwrap();
        doc.child("Body")
            .and_then(|body| body.children().next())
            .cloned()
            .unwrap()
    }

    #[test]
    fn registry_lists_both_operations_in_order() {
        let registry = sample_registry();
        assert_eq!(
            registry.list(),
            vec![
                ("Adder", "Adds p.a and p.b and concatenates every c.d"),
                ("Dummy", "Echoes in0 as out0"),
            ]
        );
    }

    #[test]
    fn classic_request_adds_and_concatenates() {
        let response = sample_dispatcher(sample_config()).dispatch(SAMPLE_REQUEST_CLASSIC);
        let res = body_child(&response);
        assert_eq!(res.name(), "AdderResponse");
        assert_eq!(res.attribute("xmlns"), Some(SERVICE_NAMESPACE));
        let result = res.child("AddResult").unwrap();
        assert_eq!(result.child("ab").unwrap().text(), "3");
        assert_eq!(result.child("dd").unwrap().text(), "holachau");
    }

    #[test]
    fn soapui_request_faults_on_unknown_item() {
        let response = sample_dispatcher(sample_config()).dispatch(SAMPLE_REQUEST_SOAPUI);
        let doc = XmlElement::parse(&response).unwrap();
        assert_eq!(doc.name(), "soapenv:Envelope");
        let fault = body_child(&response);
        assert_eq!(fault.name(), "soapenv:Fault");
        assert_eq!(
            fault.child("faultcode").unwrap().text(),
            "Client.UnexpectedElementError"
        );
    }

    #[test]
    fn dummy_echoes_with_request_prefix() {
        let request = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:pys="http://example.com/sample/">
            <soapenv:Body><pys:Dummy><pys:in0>hola</pys:in0></pys:Dummy></soapenv:Body></soapenv:Envelope>"#;
        let response = sample_dispatcher(sample_config()).dispatch(request);
        let res = body_child(&response);
        assert_eq!(res.name(), "pys:DummyResponse");
        assert_eq!(res.child("pys:out0").unwrap().text(), "hola");
    }

    #[test]
    fn adder_overflow_is_server_fault() {
        let request = format!(
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body>
               <Adder><p><a>{}</a><b>1</b></p><c/></Adder></soap:Body></soap:Envelope>"#,
            i64::MAX
        );
        let fault = body_child(&sample_dispatcher(sample_config()).dispatch(&request));
        assert_eq!(fault.child("faultcode").unwrap().text(), "Server.OverflowError");
    }

    #[test]
    fn every_sample_request_dispatches_cleanly() {
        let dispatcher = sample_dispatcher(sample_config());
        for (name, _) in dispatcher.list_operations() {
            let help = dispatcher.help(name).unwrap();
            let res = body_child(&dispatcher.dispatch(&help.request));
            assert_eq!(res.name(), format!("{name}Response"));
        }
    }
}
