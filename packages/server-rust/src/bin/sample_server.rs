//! Sample SOAP server: `serve` over HTTP or run the `local` self-check.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use soapdispatch_server::service::{
    sample_dispatcher, SAMPLE_REQUEST_CLASSIC, SAMPLE_REQUEST_SOAPUI,
};
use soapdispatch_server::{Cli, Command, LogFormat, NetworkModule};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let dispatcher = Arc::new(sample_dispatcher(cli.service.dispatcher_config()));
    match cli.command {
        Command::Serve(args) => {
            let mut module = NetworkModule::new(args.network_config(), dispatcher);
            let port = module.start().await?;
            info!(port, "sample SOAP server starting");
            module.serve(shutdown_signal()).await?;
        }
        Command::Local => {
            println!("{}", dispatcher.describe()?);
            for request in [SAMPLE_REQUEST_CLASSIC, SAMPLE_REQUEST_SOAPUI] {
                println!("{}", dispatcher.dispatch(request));
            }
            for (name, doc) in dispatcher.list_operations() {
                let help = dispatcher.help(name)?;
                println!("{name}: {doc}\n{}\n{}", help.request, help.response);
            }
        }
    }
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
