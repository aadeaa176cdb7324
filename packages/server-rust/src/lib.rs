//! `SoapDispatch` Server: the axum transport and CLI around the sample SOAP service.

pub mod config;
pub mod network;
pub mod service;

pub use config::{Cli, Command, LogFormat};
pub use network::{NetworkConfig, NetworkModule};
