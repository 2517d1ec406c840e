use fedroute_core::{FederatedClient, ProviderId, ProviderMetadata, RefreshStatus};
use serde::Serialize;

use crate::cli::ProvidersArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ProviderView {
    requested: String,
    summary: String,
    metadata: ProviderMetadata,
}

pub async fn run(args: &ProvidersArgs, client: &FederatedClient) -> Result<CommandResult, CliError> {
    let directory = client.directory();
    let status = directory.refresh(args.refresh).await;

    let mut warnings = Vec::new();
    if matches!(status, RefreshStatus::Failed | RefreshStatus::GaveUp) {
        warnings.push(String::from("provider metadata is unavailable from the routing service"));
    }

    let names = if args.names.is_empty() {
        directory.names().await
    } else {
        args.names.clone()
    };

    let mut providers = Vec::new();
    for name in names {
        let id = name.parse::<ProviderId>()?;
        match (directory.get(&id).await, directory.describe(&id).await) {
            (Some(metadata), Some(summary)) => providers.push(ProviderView {
                requested: name,
                summary,
                metadata,
            }),
            _ => warnings.push(format!("unknown provider '{name}'")),
        }
    }

    let data = serde_json::to_value(providers)?;
    Ok(CommandResult::ok("providers", data).with_warnings(warnings))
}
