//! verilog-ls binary entry point.
//!
//! Serves the language server over stdio by default; `--listen-at` binds a
//! TCP listener instead and accepts clients serially. Logging goes to a
//! JSON file with `--log-file`, and `--log-console` adds a human-readable
//! stdout log (only meaningful over TCP, where stdout is free).

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use miette::{Context, IntoDiagnostic, Result};
use tokio::net::TcpListener;
use tower_lsp::{LspService, Server};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use verilog_ls::lsp::Backend;

#[derive(Debug, Parser)]
#[command(name = "verilog-ls", version, about = "Language server for a Verilog subset")]
struct Args {
    /// Bind a TCP listener at HOST:PORT instead of serving over stdio.
    #[arg(long, value_name = "HOST:PORT")]
    listen_at: Option<String>,

    /// Write a JSON-structured log to this file.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Additionally write a human-readable log to stdout. Only honoured
    /// together with --listen-at; in stdio mode stdout carries the protocol.
    #[arg(long)]
    log_console: bool,
}

fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match &args.log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .into_diagnostic()
                .context("cannot create log file")?;
            Some(fmt::layer().json().with_writer(Arc::new(file)))
        }
        None => None,
    };

    let console_layer = (args.log_console && args.listen_at.is_some())
        .then(|| fmt::layer().with_writer(std::io::stdout));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    match &args.listen_at {
        Some(addr) => {
            let listener = TcpListener::bind(addr.as_str())
                .await
                .into_diagnostic()
                .context("cannot bind --listen-at address")?;
            info!(%addr, "listening for LSP clients");

            // One client at a time; each connection gets a fresh server.
            loop {
                let (stream, peer) = listener.accept().await.into_diagnostic()?;
                info!(%peer, "client connected");

                let (read, write) = tokio::io::split(stream);
                let (service, socket) = LspService::new(Backend::new);
                Server::new(read, write, socket).serve(service).await;

                info!(%peer, "client disconnected");
            }
        }
        None => {
            let (service, socket) = LspService::new(Backend::new);
            Server::new(tokio::io::stdin(), tokio::io::stdout(), socket)
                .serve(service)
                .await;
            Ok(())
        }
    }
}
