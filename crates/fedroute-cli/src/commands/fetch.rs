use std::path::Path;
use std::sync::Arc;

use fedroute_core::{
    FederatedClient, FederatedRequest, FederationError, ProviderId, RoundOutcome, RoutingTable,
};
use serde::Serialize;

use crate::cli::FetchArgs;
use crate::error::CliError;
use crate::output;

use super::{bulk_payload, selection_params, CommandResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Stations,
    Waveforms,
}

impl Dataset {
    const fn command(self) -> &'static str {
        match self {
            Self::Stations => "stations",
            Self::Waveforms => "waveforms",
        }
    }
}

#[derive(Debug, Serialize)]
struct PayloadView<'a> {
    provider: &'a str,
    bytes: usize,
}

#[derive(Debug, Serialize)]
struct FetchData<'a> {
    succeeded: Vec<String>,
    failed: Vec<String>,
    payloads: Vec<PayloadView<'a>>,
    written: Vec<String>,
    cancelled: bool,
}

impl<'a> From<&'a RoundOutcome> for FetchData<'a> {
    fn from(outcome: &'a RoundOutcome) -> Self {
        Self {
            succeeded: outcome.succeeded.iter().map(ToString::to_string).collect(),
            failed: outcome.failed.iter().map(ToString::to_string).collect(),
            payloads: outcome
                .payloads
                .iter()
                .map(|payload| PayloadView {
                    provider: payload.provider.as_str(),
                    bytes: payload.body.len(),
                })
                .collect(),
            written: outcome
                .written
                .iter()
                .map(|path| path.display().to_string())
                .collect(),
            cancelled: outcome.cancelled,
        }
    }
}

pub async fn run(
    args: &FetchArgs,
    client: &FederatedClient,
    dataset: Dataset,
) -> Result<CommandResult, CliError> {
    let params = selection_params(&args.selection)?;
    let mut request = FederatedRequest::new(params)
        .with_reroute(args.reroute)
        .with_include_overlaps(args.include_overlaps)
        .include_providers(parse_providers(&args.include)?)
        .exclude_providers(parse_providers(&args.exclude)?);

    if let Some(path) = &args.routes {
        let text = std::fs::read_to_string(path)?;
        let table = RoutingTable::parse(&text).map_err(FederationError::from)?;
        request = request.with_existing_routes(Arc::new(table));
    }
    if let Some(output) = &args.output {
        if let Some(parent) = output.parent().filter(|parent| parent != &Path::new("")) {
            std::fs::create_dir_all(parent)?;
        }
        request = request.with_output(output.clone());
    }

    let outcome = match (dataset, bulk_payload(&args.selection)) {
        (Dataset::Stations, Some(bulk)) => client.get_stations_bulk(bulk, request).await?,
        (Dataset::Stations, None) => client.get_stations(request).await?,
        (Dataset::Waveforms, Some(bulk)) => client.get_waveforms_bulk(bulk, request).await?,
        (Dataset::Waveforms, None) => client.get_waveforms(request).await?,
    };

    if args.stdout {
        output::write_payload(&outcome.payload_bytes())?;
    }

    let data = serde_json::to_value(FetchData::from(&outcome))?;
    Ok(CommandResult::ok(dataset.command(), data)
        .with_warnings(outcome.warnings())
        .with_incomplete(!outcome.failed.is_empty() || outcome.cancelled)
        .with_report_to_stderr(args.stdout))
}

fn parse_providers(names: &[String]) -> Result<Vec<ProviderId>, CliError> {
    names
        .iter()
        .map(|name| name.trim().parse::<ProviderId>().map_err(CliError::from))
        .collect()
}
