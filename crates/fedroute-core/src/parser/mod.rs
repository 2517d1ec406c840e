//! Line-oriented parser for routing service responses.
//!
//! A response is an optional block of echoed `key=value` parameters followed
//! by one block per data center:
//!
//! ```text
//! level=network
//!
//! DATACENTER=GEOFON,http://geofon.gfz-potsdam.de
//! STATIONSERVICE=http://geofon.gfz-potsdam.de/fdsnws/station/1/
//! GE APE -- BHE 2001-01-01T00:00:00 2001-01-02T00:00:00
//! ```
//!
//! Every line is classified by [`classify`] and fed through the
//! [`ParserState`] transition table. A line the table does not allow fails the
//! whole parse with [`MalformedResponse`].

mod line;
mod state;

pub use line::{classify, LineKind, ResponseLine, PROVIDER_HEADER_TOKEN};
pub use state::ParserState;

use tracing::debug;

use crate::domain::{RequestLine, ServiceName};
use crate::route::{Route, RoutingTable};
use crate::source::{ProviderId, PROVIDER_ALIASES};
use crate::MalformedResponse;

/// Parses routing response text into a table keyed by caller-facing ids.
pub fn parse_routing(text: &str) -> Result<RoutingTable, MalformedResponse> {
    let mut builder = TableBuilder::default();
    let mut state = ParserState::Pre;

    for (index, raw) in text.lines().enumerate() {
        let line = ResponseLine::new(raw);
        let line_number = index + 1;
        let Some(next) = state.next(line.kind()) else {
            return Err(reject(line_number, &line, state, transition_detail(state, line.kind())));
        };

        match line.kind() {
            LineKind::Parameter => builder.preamble.push(line.text().to_owned()),
            LineKind::ProviderHeader => {
                let (provider, url) = parse_header(&line)
                    .ok_or_else(|| reject(line_number, &line, state, "data center header must read DATACENTER=<id>,<url>"))?;
                builder.open(provider, url);
            }
            LineKind::ServiceDeclaration => {
                let (name, url) = line
                    .key_value()
                    .ok_or_else(|| reject(line_number, &line, state, "service declaration must read NAME=<url>"))?;
                builder
                    .current_mut()
                    .ok_or_else(|| reject(line_number, &line, state, "service declared outside a data center block"))?
                    .add_service(ServiceName::new(name), url);
            }
            LineKind::RequestTuple => {
                let request = RequestLine::parse(line.text())
                    .map_err(|error| reject(line_number, &line, state, error.to_string()))?;
                builder
                    .current_mut()
                    .ok_or_else(|| reject(line_number, &line, state, "request line outside a data center block"))?
                    .add_request(request);
            }
            LineKind::Empty | LineKind::Unrecognized => {}
        }

        state = next;
    }

    let table = builder.finish();
    debug!(routes = table.len(), "parsed routing response");
    Ok(table)
}

#[derive(Debug, Default)]
struct TableBuilder {
    preamble: Vec<String>,
    current: Option<Route>,
    closed: Vec<Route>,
}

impl TableBuilder {
    fn open(&mut self, provider: ProviderId, url: &str) {
        self.close();
        let mut route = Route::new(provider);
        route.add_service(ServiceName::Datacenter, url);
        self.current = Some(route);
    }

    fn close(&mut self) {
        if let Some(route) = self.current.take() {
            if route.is_empty() {
                debug!(provider = %route.provider_id(), "discarding data center block without request lines");
            } else {
                self.closed.push(route);
            }
        }
    }

    fn current_mut(&mut self) -> Option<&mut Route> {
        self.current.as_mut()
    }

    // The echoed parameters are shared by every block of the response.
    fn finish(mut self) -> RoutingTable {
        self.close();
        let preamble = self.preamble;
        let routes = self.closed.into_iter().map(|mut route| {
            route.prepend_parameters(&preamble);
            route
        });
        RoutingTable::from_routes(routes).remap(&PROVIDER_ALIASES)
    }
}

fn parse_header(line: &ResponseLine) -> Option<(ProviderId, &str)> {
    let rest = line.text().strip_prefix(PROVIDER_HEADER_TOKEN)?;
    let (provider, url) = rest.split_once(',')?;
    let provider = provider.trim();
    if provider.is_empty() {
        return None;
    }
    Some((ProviderId::new(provider), url.trim()))
}

fn transition_detail(state: ParserState, kind: LineKind) -> String {
    if kind == LineKind::Unrecognized {
        return String::from("line matches no known line shape");
    }
    format!("{kind} is not allowed after {state}")
}

fn reject(
    line_number: usize,
    line: &ResponseLine,
    state: ParserState,
    detail: impl Into<String>,
) -> MalformedResponse {
    MalformedResponse {
        line_number,
        line: line.text().to_owned(),
        state,
        kind: line.kind(),
        detail: detail.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PROVIDERS: &str = "level=network
minlat=34.0

DATACENTER=GEOFON,http://geofon.gfz-potsdam.de
DATASELECTSERVICE=http://geofon.gfz-potsdam1.de/fdsnws/dataselect/1/
STATIONSERVICE=http://geofon.gfz-potsdam3.de/fdsnws/station/1/
GE APE -- BHE 2001-01-01T00:00:00 2001-01-02T00:00:00

DATACENTER=INGV,http://www.ingv.it
STATIONSERVICE=http://webservices.rm.ingv.it/fdsnws/station/1/
HL ARG -- BHZ 2015-01-01T00:00:00 2016-01-02T00:00:00
HL ARG -- VHZ 2015-01-01T00:00:00 2016-01-02T00:00:00
";

    #[test]
    fn parses_blocks_in_order_with_aliases_applied() {
        let table = parse_routing(TWO_PROVIDERS).expect("valid response");

        let ids: Vec<&str> = table.iter().map(|route| route.provider_id().as_str()).collect();
        assert_eq!(ids, vec!["GFZ", "INGV"]);

        let gfz = table.get("GFZ").expect("GFZ route");
        assert_eq!(
            gfz.service_url(&ServiceName::Datacenter),
            Some("http://geofon.gfz-potsdam.de")
        );
        assert_eq!(gfz.request_lines().len(), 1);
        assert_eq!(gfz.parameters(), ["level=network", "minlat=34.0"]);

        let ingv = table.get("INGV").expect("INGV route");
        assert_eq!(ingv.request_lines().len(), 2);
        assert_eq!(ingv.parameters(), ["level=network", "minlat=34.0"]);
    }

    #[test]
    fn block_without_request_lines_is_dropped() {
        let text = "DATACENTER=ORFEUS,http://www.orfeus-eu.org
STATIONSERVICE=http://www.orfeus-eu.org/fdsnws/station/1/

DATACENTER=IRISDMC,http://ds.iris.edu
STATIONSERVICE=http://service.iris.edu/fdsnws/station/1/
IU ANMO 00 BHZ * *
";
        let table = parse_routing(text).expect("header without requests is still legal");
        assert_eq!(table.len(), 1);
        assert!(table.get("ORFEUS").is_none());
        assert!(table.get("IRIS").is_some());
    }

    #[test]
    fn service_before_any_header_is_malformed() {
        let error = parse_routing("STATIONSERVICE=http://x/\n").expect_err("must fail");
        assert_eq!(error.line_number, 1);
        assert_eq!(error.state, ParserState::Pre);
        assert_eq!(error.kind, LineKind::ServiceDeclaration);
    }

    #[test]
    fn unrecognized_line_reports_its_position() {
        let text = "DATACENTER=IRISDMC,http://ds.iris.edu
STATIONSERVICE=http://service.iris.edu/fdsnws/station/1/
IU ANMO 00 BHZ
";
        let error = parse_routing(text).expect_err("short request line");
        assert_eq!(error.line_number, 3);
        assert_eq!(error.kind, LineKind::Unrecognized);
        assert_eq!(error.state, ParserState::Service);
    }

    #[test]
    fn header_without_url_is_malformed() {
        let error = parse_routing("DATACENTER=IRISDMC\n").expect_err("missing url");
        assert_eq!(error.kind, LineKind::ProviderHeader);
    }

    #[test]
    fn empty_text_yields_an_empty_table() {
        let table = parse_routing("").expect("empty response");
        assert!(table.is_empty());
    }
}
