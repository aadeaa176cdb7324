//! Built-in sample service: `Adder` and `Dummy`.

pub mod sample;

pub use sample::{
    sample_config, sample_dispatcher, sample_registry, SAMPLE_REQUEST_CLASSIC,
    SAMPLE_REQUEST_SOAPUI,
};
