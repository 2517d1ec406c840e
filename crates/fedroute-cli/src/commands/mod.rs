mod fetch;
mod providers;
mod routes;

use std::io;
use std::path::PathBuf;

use fedroute_core::{BulkPayload, FederatedClient, FederatorConfig, FederatorConfigBuilder, QueryParams};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cli::{Cli, Command, SelectionArgs};
use crate::error::CliError;

use self::fetch::Dataset;

pub struct CommandResult {
    pub command: &'static str,
    pub data: Value,
    pub warnings: Vec<String>,
    /// Some requested lines were not delivered.
    pub incomplete: bool,
    /// Stdout carries payload bytes, so the report goes to stderr.
    pub report_to_stderr: bool,
}

impl CommandResult {
    pub fn ok(command: &'static str, data: Value) -> Self {
        Self {
            command,
            data,
            warnings: Vec::new(),
            incomplete: false,
            report_to_stderr: false,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_incomplete(mut self, incomplete: bool) -> Self {
        self.incomplete = incomplete;
        self
    }

    pub fn with_report_to_stderr(mut self, to_stderr: bool) -> Self {
        self.report_to_stderr = to_stderr;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    let config = build_config(cli);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, waiting for in-flight provider requests");
            interrupt.cancel();
        }
    });
    let client = FederatedClient::from_config(&config).with_cancellation(cancel);

    match &cli.command {
        Command::Routes(args) => routes::run(args, &client).await,
        Command::Stations(args) => fetch::run(args, &client, Dataset::Stations).await,
        Command::Waveforms(args) => fetch::run(args, &client, Dataset::Waveforms).await,
        Command::Providers(args) => providers::run(args, &client).await,
    }
}

/// Environment first, then command-line flags.
fn build_config(cli: &Cli) -> FederatorConfig {
    let mut builder = FederatorConfigBuilder::from_env().with_sequential(cli.sequential);
    if let Some(url) = &cli.routing_url {
        builder = builder.with_routing_url(url.clone());
    }
    if let Some(workers) = cli.workers {
        builder = builder.with_max_workers(workers);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        builder = builder.with_timeout_ms(timeout_ms);
    }
    builder.build()
}

fn selection_params(selection: &SelectionArgs) -> Result<QueryParams, CliError> {
    let mut params = QueryParams::new();
    let named = [
        ("network", &selection.network),
        ("station", &selection.station),
        ("location", &selection.location),
        ("channel", &selection.channel),
        ("starttime", &selection.starttime),
        ("endtime", &selection.endtime),
    ];
    for (key, value) in named {
        if let Some(value) = value {
            params.set(key, value.as_str());
        }
    }
    for pair in &selection.params {
        params.set_pair(pair)?;
    }
    Ok(params)
}

fn bulk_payload(selection: &SelectionArgs) -> Option<BulkPayload> {
    selection.bulk.as_deref().map(|source| {
        if source == "-" {
            BulkPayload::Reader(Box::new(io::stdin()))
        } else {
            BulkPayload::Path(PathBuf::from(source))
        }
    })
}
