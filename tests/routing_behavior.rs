//! Behavior-driven tests for routing response parsing
//!
//! These tests verify HOW the system turns routing service text into a
//! routing table: grammar enforcement, alias remapping, and the bulk bodies
//! each route produces.

use std::collections::HashSet;

use fedroute_core::{
    classify, split_bulk, Granularity, LineKind, ParserState, ProviderId, RequestLine,
    RoutingTable, ServiceName, PROVIDER_ALIASES,
};

const TWO_PROVIDERS: &str = "level=network
minlat=34.0

DATACENTER=GEOFON,http://geofon.gfz-potsdam.de
DATASELECTSERVICE=http://geofon.gfz-potsdam.de/fdsnws/dataselect/1/
STATIONSERVICE=http://geofon.gfz-potsdam.de/fdsnws/station/1/
GE APE -- BHE 2001-01-01T00:00:00 2001-01-02T00:00:00

DATACENTER=INGV,http://www.ingv.it
STATIONSERVICE=http://webservices.ingv.it/fdsnws/station/1/
IV ACER -- BHE 2001-01-01T00:00:00 2001-01-02T00:00:00
IV AQU -- BHE 2001-01-01T00:00:00 2001-01-02T00:00:00
";

// =============================================================================
// Routing Response: Well-formed Input
// =============================================================================

#[test]
fn when_two_providers_are_routed_system_builds_one_route_each() {
    // Given: A response with a two-line pre-amble and two provider blocks
    // When: The system parses it
    let table = RoutingTable::parse(TWO_PROVIDERS).expect("well-formed response");

    // Then: Two routes exist, in source order, with upstream ids remapped
    assert_eq!(table.len(), 2);
    let ids: Vec<&str> = table.iter().map(|route| route.provider_id().as_str()).collect();
    assert_eq!(ids, vec!["GFZ", "INGV"]);

    let gfz = table.get("GEOFON").expect("alias resolves");
    assert_eq!(gfz.request_lines().len(), 1);
    assert_eq!(table.get("INGV").expect("route").request_lines().len(), 2);
}

#[test]
fn when_station_body_is_serialized_system_keeps_only_station_parameters() {
    // Given: The GEOFON route from a response whose pre-amble has level and minlat
    let table = RoutingTable::parse(TWO_PROVIDERS).expect("well-formed response");
    let gfz = table.get("GFZ").expect("route");

    // When: The body for the station service is built
    let body = gfz.serialize_for(&ServiceName::Station);

    // Then: Only the pass-through parameter precedes the request line
    assert_eq!(
        body,
        "level=network\nGE APE -- BHE 2001-01-01T00:00:00 2001-01-02T00:00:00"
    );
    assert!(!gfz.serialize_for(&ServiceName::Dataselect).contains("level="));
}

#[test]
fn when_same_text_is_parsed_twice_system_yields_equal_tables() {
    // Given: A well-formed response
    // When: It is parsed twice
    let first = RoutingTable::parse(TWO_PROVIDERS).expect("first parse");
    let second = RoutingTable::parse(TWO_PROVIDERS).expect("second parse");

    // Then: Both tables are content-equal
    assert_eq!(first, second);
}

#[test]
fn when_serialized_body_is_split_again_system_recovers_the_request_lines() {
    // Given: Every route of a parsed table
    let table = RoutingTable::parse(TWO_PROVIDERS).expect("well-formed response");

    for route in &table {
        // When: Its station body is split back into lines
        let (parameters, lines) = split_bulk(&route.serialize_for(&ServiceName::Station));

        // Then: The request lines come back unchanged and only known parameters appear
        assert_eq!(lines, route.request_lines());
        for parameter in parameters {
            assert!(route.parameters().contains(&parameter));
        }
    }
}

#[test]
fn when_block_has_no_request_lines_system_drops_the_route() {
    // Given: A provider block with services but no request lines
    let text = "DATACENTER=ORFEUS,http://www.orfeus-eu.org
STATIONSERVICE=http://www.orfeus-eu.org/fdsnws/station/1/

DATACENTER=IRISDMC,http://ds.iris.edu
STATIONSERVICE=http://service.iris.edu/fdsnws/station/1/
IU ANMO 00 BHZ 2010-02-27T06:30:00 2010-02-27T06:33:00
";
    let preamble_only = "level=station\n";

    // When: The system parses it
    let table = RoutingTable::parse(text).expect("well-formed response");

    // Then: Only the provider with request lines survives
    assert_eq!(table.provider_ids(), vec![&ProviderId::new("IRIS")]);
    assert!(RoutingTable::parse(preamble_only).expect("pre-amble only").is_empty());
}

#[test]
fn when_aliased_ids_appear_anywhere_system_rewrites_every_one() {
    // Given: Upstream ids for every alias, in an arbitrary order
    let mut text = String::new();
    for (index, (upstream, _)) in PROVIDER_ALIASES.iter().enumerate().rev() {
        text.push_str(&format!(
            "DATACENTER={upstream},http://dc{index}.test\nSTATIONSERVICE=http://dc{index}.test/station/1/\nXX S{index} -- BHZ 2001-01-01 2001-01-02\n\n"
        ));
    }

    // When: The system parses it
    let table = RoutingTable::parse(&text).expect("well-formed response");

    // Then: No upstream id remains in the table
    for route in &table {
        assert!(
            PROVIDER_ALIASES
                .iter()
                .all(|(upstream, _)| route.provider_id().as_str() != *upstream),
            "{} was not remapped",
            route.provider_id()
        );
    }
    // USPC and USPSC both map to USP and merge into one route
    assert_eq!(table.len(), PROVIDER_ALIASES.len() - 1);
    assert_eq!(table.get("USP").expect("merged route").request_lines().len(), 2);
}

// =============================================================================
// Routing Response: Malformed Input
// =============================================================================

#[test]
fn when_service_precedes_any_provider_header_system_rejects_the_response() {
    // Given: A service declaration straight after the pre-amble state
    let text = "STATIONSERVICE=http://service.iris.edu/fdsnws/station/1/\nIU ANMO 00 BHZ 2010-02-27 2010-02-28\n";

    // When: The system parses it
    let error = RoutingTable::parse(text).expect_err("grammar violation");

    // Then: The error pinpoints the line and state; no table is produced
    assert_eq!(error.line_number, 1);
    assert_eq!(error.state, ParserState::Pre);
    assert_eq!(error.kind, LineKind::ServiceDeclaration);
}

#[test]
fn when_request_tuple_follows_header_directly_system_rejects_the_response() {
    // Given: A provider block without any service declaration
    let text = "DATACENTER=IRISDMC,http://ds.iris.edu\nIU ANMO 00 BHZ 2010-02-27 2010-02-28\n";

    // When: The system parses it
    let error = RoutingTable::parse(text).expect_err("grammar violation");

    // Then: Line 2 is reported from the provider-header state
    assert_eq!(error.line_number, 2);
    assert_eq!(error.state, ParserState::ProviderHeader);
    assert_eq!(error.kind, LineKind::RequestTuple);
}

#[test]
fn when_line_matches_no_shape_system_classifies_it_unrecognized() {
    // Given / When / Then: Classification follows the priority rules
    assert_eq!(classify("   "), LineKind::Empty);
    assert_eq!(classify("DATACENTER=IRISDMC,http://ds.iris.edu"), LineKind::ProviderHeader);
    assert_eq!(classify("STATIONSERVICE=http://x/"), LineKind::ServiceDeclaration);
    assert_eq!(classify("level=network"), LineKind::Parameter);
    assert_eq!(classify("IU ANMO 00 BHZ 2010-02-27 2010-02-28"), LineKind::RequestTuple);
    assert_eq!(classify("IU ANMO 00 BHZ"), LineKind::Unrecognized);
}

// =============================================================================
// Routes: Partitioning
// =============================================================================

#[test]
fn when_lines_are_partitioned_by_template_system_loses_and_duplicates_nothing() {
    // Given: A route with two request lines
    let table = RoutingTable::parse(TWO_PROVIDERS).expect("well-formed response");
    let ingv = table.get("INGV").expect("route");
    let templates: HashSet<String> = [String::from("IV.ACER")].into_iter().collect();

    for granularity in [Granularity::Network, Granularity::Station, Granularity::Channel] {
        // When: The lines are split by template at each granularity
        let (matched, unmatched) = ingv.partition_by_template(&templates, granularity);

        // Then: Matched and unmatched together are exactly the original lines
        let mut union: Vec<RequestLine> = matched.iter().chain(&unmatched).cloned().collect();
        union.sort();
        let mut original = ingv.request_lines().to_vec();
        original.sort();
        assert_eq!(union, original);
        assert!(matched.iter().all(|line| !unmatched.contains(line)));
    }

    let (matched, _) = ingv.partition_by_template(&templates, Granularity::Station);
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].station(), "ACER");
}
