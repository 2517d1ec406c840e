use std::collections::BTreeMap;

use fedroute_core::{FederatedClient, FederationError, Route, RoutingTable};
use serde::Serialize;

use crate::cli::RoutesArgs;
use crate::error::CliError;

use super::{bulk_payload, selection_params, CommandResult};

#[derive(Debug, Serialize)]
struct RouteView<'a> {
    provider: &'a str,
    services: BTreeMap<&'a str, &'a str>,
    parameters: &'a [String],
    request_lines: Vec<String>,
}

impl<'a> From<&'a Route> for RouteView<'a> {
    fn from(route: &'a Route) -> Self {
        Self {
            provider: route.provider_id().as_str(),
            services: route
                .services()
                .iter()
                .map(|(name, url)| (name.as_str(), url.as_str()))
                .collect(),
            parameters: route.parameters(),
            request_lines: route.request_lines().iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RoutesData<'a> {
    route_count: usize,
    request_line_count: usize,
    routes: Vec<RouteView<'a>>,
}

pub async fn run(args: &RoutesArgs, client: &FederatedClient) -> Result<CommandResult, CliError> {
    let params = selection_params(&args.selection)?;
    let text = match bulk_payload(&args.selection) {
        Some(bulk) => client.routing_text_bulk(bulk, &params).await?,
        None => client.routing_text(&params).await?,
    };

    if let Some(path) = &args.save {
        std::fs::write(path, &text)?;
    }

    if args.raw {
        return Ok(CommandResult::ok("routes", serde_json::json!({ "raw": text })));
    }

    let table = RoutingTable::parse(&text).map_err(FederationError::from)?;
    let data = serde_json::to_value(RoutesData {
        route_count: table.len(),
        request_line_count: table.request_lines().len(),
        routes: table.iter().map(RouteView::from).collect(),
    })?;

    let mut result = CommandResult::ok("routes", data);
    if table.is_empty() {
        result = result.with_warnings(vec![String::from(
            "the routing service returned no providers for this selection",
        )]);
    }
    Ok(result)
}
