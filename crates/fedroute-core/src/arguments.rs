//! Splits caller keyword arguments between the routing service and the
//! per-provider services.

use crate::bulk::QueryParams;

/// Keys the routing service must never see.
pub const ROUTING_PROHIBITED: [&str; 5] = ["filename", "attach_response", "user", "password", "base_url"];

/// The only keys forwarded to provider services; everything else is already
/// encoded in the routed request lines.
pub const SERVICE_FORWARDED: [&str; 4] = ["user", "password", "attach_response", "filename"];

/// Returns `(routing, service)` parameter sets.
pub fn partition_arguments(params: &QueryParams) -> (QueryParams, QueryParams) {
    let mut routing = params.clone();
    for key in ROUTING_PROHIBITED {
        routing.remove(key);
    }

    let service = params
        .iter()
        .filter(|(key, _)| SERVICE_FORWARDED.contains(key))
        .map(|(key, value)| (key.to_owned(), value.cloned()))
        .collect();

    (routing, service)
}
