//! Command-line and environment configuration for the sample server.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use soapdispatch_core::DispatcherConfig;

use crate::network::NetworkConfig;
use crate::service::sample::{
    SERVICE_DOCUMENTATION, SERVICE_LOCATION, SERVICE_NAME, SERVICE_NAMESPACE, SERVICE_PREFIX,
};

#[derive(Debug, Parser)]
#[command(name = "soap-sample-server", version, about = "Sample SOAP service")]
pub struct Cli {
    #[command(flatten)]
    pub service: ServiceArgs,

    /// Log output format.
    #[arg(long, env = "SOAP_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve WSDL, samples, and dispatch over HTTP.
    Serve(ServeArgs),
    /// Print the WSDL, dispatch the built-in sample requests, and render
    /// every operation's help, without opening a socket.
    Local,
}

/// Service description shared by both subcommands.
#[derive(Debug, Clone, Args)]
pub struct ServiceArgs {
    #[arg(long, env = "SOAP_SERVICE_NAME", default_value = SERVICE_NAME, global = true)]
    pub name: String,
    /// Endpoint URL advertised in the WSDL.
    #[arg(long, env = "SOAP_LOCATION", default_value = SERVICE_LOCATION, global = true)]
    pub location: String,
    /// SOAPAction advertised for every operation.
    #[arg(long, env = "SOAP_ACTION", default_value = SERVICE_LOCATION, global = true)]
    pub action: String,
    #[arg(long, env = "SOAP_NAMESPACE", default_value = SERVICE_NAMESPACE, global = true)]
    pub namespace: String,
    #[arg(long, env = "SOAP_PREFIX", default_value = SERVICE_PREFIX, global = true)]
    pub prefix: String,
    #[arg(long, env = "SOAP_DOCUMENTATION", default_value = SERVICE_DOCUMENTATION, global = true)]
    pub documentation: String,
}

impl ServiceArgs {
    /// Empty namespace or prefix disables it.
    #[must_use]
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        let non_empty = |value: &str| (!value.is_empty()).then(|| value.to_string());
        DispatcherConfig {
            name: self.name.clone(),
            documentation: self.documentation.clone(),
            action: self.action.clone(),
            location: self.location.clone(),
            namespace: non_empty(&self.namespace),
            prefix: non_empty(&self.prefix),
            ..DispatcherConfig::default()
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, env = "SOAP_HOST", default_value = "0.0.0.0")]
    pub host: String,
    #[arg(long, env = "SOAP_PORT", default_value_t = 8008)]
    pub port: u16,
    /// Per-request timeout in seconds.
    #[arg(long, env = "SOAP_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
    /// Largest accepted request body in bytes.
    #[arg(long, env = "SOAP_MAX_BODY_BYTES", default_value_t = 1_048_576)]
    pub max_body_bytes: usize,
    /// Seconds to wait for in-flight calls on shutdown.
    #[arg(long, env = "SOAP_DRAIN_TIMEOUT_SECS", default_value_t = 30)]
    pub drain_timeout_secs: u64,
}

impl ServeArgs {
    #[must_use]
    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_body_bytes: self.max_body_bytes,
            drain_timeout: Duration::from_secs(self.drain_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}
