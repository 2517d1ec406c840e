//! Per-provider routes and the routing table built from one response.

use std::collections::{BTreeMap, HashSet};
use std::fmt::{Display, Formatter};

use crate::domain::{Granularity, RequestLine, ServiceName};
use crate::parser;
use crate::source::ProviderId;
use crate::MalformedResponse;

/// One data center's share of a routing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    provider_id: ProviderId,
    services: BTreeMap<ServiceName, String>,
    parameters: Vec<String>,
    lines: Vec<RequestLine>,
}

impl Route {
    pub fn new(provider_id: ProviderId) -> Self {
        Self {
            provider_id,
            services: BTreeMap::new(),
            parameters: Vec::new(),
            lines: Vec::new(),
        }
    }

    pub fn provider_id(&self) -> &ProviderId {
        &self.provider_id
    }

    pub fn services(&self) -> &BTreeMap<ServiceName, String> {
        &self.services
    }

    pub fn service_url(&self, name: &ServiceName) -> Option<&str> {
        self.services.get(name).map(String::as_str)
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn request_lines(&self) -> &[RequestLine] {
        &self.lines
    }

    /// A route is empty when it carries no request lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn add_service(&mut self, name: ServiceName, url: impl Into<String>) {
        self.services.insert(name, url.into());
    }

    pub fn add_parameter(&mut self, text: impl Into<String>) {
        self.parameters.push(text.into());
    }

    pub fn add_parameters<I, S>(&mut self, parameters: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters.extend(parameters.into_iter().map(Into::into));
    }

    pub fn add_request(&mut self, line: RequestLine) {
        self.lines.push(line);
    }

    pub fn add_requests<I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = RequestLine>,
    {
        self.lines.extend(lines);
    }

    pub(crate) fn prepend_parameters(&mut self, shared: &[String]) {
        if shared.is_empty() {
            return;
        }
        let mut parameters = shared.to_vec();
        parameters.append(&mut self.parameters);
        self.parameters = parameters;
    }

    /// Bulk request body for `service`.
    ///
    /// Shared parameters outside the service's pass-through list are dropped;
    /// the remaining ones keep their order and precede every request line.
    pub fn serialize_for(&self, service: &ServiceName) -> String {
        self.parameters
            .iter()
            .filter(|parameter| {
                parameter
                    .split_once('=')
                    .is_some_and(|(key, _)| service.accepts_parameter(key.trim()))
            })
            .cloned()
            .chain(self.lines.iter().map(ToString::to_string))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Splits request lines by exact membership of their key in `templates`.
    pub fn partition_by_template(
        &self,
        templates: &HashSet<String>,
        granularity: Granularity,
    ) -> (Vec<RequestLine>, Vec<RequestLine>) {
        self.lines
            .iter()
            .cloned()
            .partition(|line| templates.contains(&line.key(granularity)))
    }

    /// Splits request lines by whether any returned key satisfies them.
    pub fn partition_by_keys(
        &self,
        keys: &HashSet<String>,
        granularity: Granularity,
    ) -> (Vec<RequestLine>, Vec<RequestLine>) {
        self.lines.iter().cloned().partition(|line| {
            keys.contains(&line.key(granularity))
                || keys.iter().any(|key| line.matches_key(key, granularity))
        })
    }

    fn absorb(&mut self, other: Route) {
        for (name, url) in other.services {
            self.services.entry(name).or_insert(url);
        }
        for parameter in other.parameters {
            if !self.parameters.contains(&parameter) {
                self.parameters.push(parameter);
            }
        }
        self.lines.extend(other.lines);
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} parameters, {} request lines",
            self.provider_id,
            self.parameters.len(),
            self.lines.len()
        )
    }
}

/// Ordered routes produced by one parse; ids are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    routes: Vec<Route>,
}

impl RoutingTable {
    pub fn parse(text: &str) -> Result<Self, MalformedResponse> {
        parser::parse_routing(text)
    }

    /// Builds a table, dropping empty routes and merging repeated ids into
    /// their first occurrence.
    pub fn from_routes(routes: impl IntoIterator<Item = Route>) -> Self {
        let mut merged: Vec<Route> = Vec::new();
        for route in routes {
            if route.is_empty() {
                continue;
            }
            match merged
                .iter_mut()
                .find(|existing| existing.provider_id == route.provider_id)
            {
                Some(existing) => existing.absorb(route),
                None => merged.push(route),
            }
        }
        Self { routes: merged }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Route> {
        self.routes.iter()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Looks a route up by id; upstream aliases resolve to their route.
    pub fn get(&self, provider: &str) -> Option<&Route> {
        let wanted = ProviderId::new(provider).canonical();
        self.routes
            .iter()
            .find(|route| route.provider_id == wanted || route.provider_id.as_str() == provider)
    }

    pub fn provider_ids(&self) -> Vec<&ProviderId> {
        self.routes.iter().map(Route::provider_id).collect()
    }

    /// Rewrites every provider id through `aliases`.
    pub fn remap(self, aliases: &[(&str, &str)]) -> Self {
        Self::from_routes(self.routes.into_iter().map(|mut route| {
            route.provider_id = route.provider_id.remapped(aliases);
            route
        }))
    }

    /// Keeps routes named in `include` (all when empty) and not in `exclude`.
    ///
    /// Both lists match after alias canonicalization.
    pub fn filter_providers(&self, include: &[ProviderId], exclude: &[ProviderId]) -> Self {
        fn listed(list: &[ProviderId], id: &ProviderId) -> bool {
            list.iter().any(|provider| provider.same_provider(id))
        }

        Self {
            routes: self
                .routes
                .iter()
                .filter(|route| include.is_empty() || listed(include, &route.provider_id))
                .filter(|route| !listed(exclude, &route.provider_id))
                .cloned()
                .collect(),
        }
    }

    /// Every request line across all routes, in table order.
    pub fn request_lines(&self) -> Vec<RequestLine> {
        self.routes
            .iter()
            .flat_map(|route| route.lines.iter().cloned())
            .collect()
    }
}

impl<'a> IntoIterator for &'a RoutingTable {
    type Item = &'a Route;
    type IntoIter = std::slice::Iter<'a, Route>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Display for RoutingTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "routing table with {} route(s)", self.routes.len())?;
        for route in &self.routes {
            writeln!(f, "  {route}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(provider: &str, lines: &[&str]) -> Route {
        let mut route = Route::new(ProviderId::new(provider));
        route.add_service(ServiceName::Station, "http://example.test/fdsnws/station/1/");
        route.add_requests(
            lines
                .iter()
                .map(|line| RequestLine::parse(line).expect("valid line")),
        );
        route
    }

    #[test]
    fn serialize_for_filters_parameters_per_service() {
        let mut route = route("IRIS", &["IU ANMO 00 BHZ * *"]);
        route.add_parameters(["quality=B", "level=channel", "minlat=34.0", "longestonly=true"]);

        assert_eq!(
            route.serialize_for(&ServiceName::Dataselect),
            "quality=B\nlongestonly=true\nIU ANMO 00 BHZ * *"
        );
        assert_eq!(
            route.serialize_for(&ServiceName::Station),
            "level=channel\nIU ANMO 00 BHZ * *"
        );
        assert_eq!(
            route.serialize_for(&ServiceName::new("EVENTSERVICE")),
            "IU ANMO 00 BHZ * *"
        );
    }

    #[test]
    fn partition_by_template_is_complete_and_disjoint() {
        let route = route(
            "IRIS",
            &[
                "IU ANMO 00 BHZ * *",
                "IU ANMO 10 BHZ * *",
                "IU COLA 00 BHZ * *",
            ],
        );
        let templates: HashSet<String> = [String::from("IU.ANMO")].into_iter().collect();

        let (matched, unmatched) = route.partition_by_template(&templates, Granularity::Station);
        assert_eq!(matched.len(), 2);
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].station(), "COLA");

        let (matched, unmatched) = route.partition_by_template(&templates, Granularity::Channel);
        assert!(matched.is_empty());
        assert_eq!(unmatched.len(), 3);
    }

    #[test]
    fn partition_by_template_is_case_sensitive() {
        let route = route("IRIS", &["IU ANMO 00 BHZ * *"]);
        let templates: HashSet<String> = [String::from("iu")].into_iter().collect();
        let (matched, _) = route.partition_by_template(&templates, Granularity::Network);
        assert!(matched.is_empty());
    }

    #[test]
    fn from_routes_merges_ids_that_collide() {
        let table = RoutingTable::from_routes([
            route("IRISDMC", &["IU ANMO 00 BHZ * *"]),
            route("ORFEUS", &["NL HGN 02 BHZ * *"]),
            route("IRIS", &["IU COLA 00 BHZ * *"]),
        ])
        .remap(&crate::PROVIDER_ALIASES);

        assert_eq!(table.len(), 2);
        let iris = table.get("IRIS").expect("merged route");
        assert_eq!(iris.request_lines().len(), 2);
        assert_eq!(table.provider_ids()[0].as_str(), "IRIS");
    }

    #[test]
    fn filter_providers_understands_aliases() {
        let table = RoutingTable::from_routes([
            route("IRIS", &["IU ANMO 00 BHZ * *"]),
            route("ORFEUS", &["NL HGN 02 BHZ * *"]),
        ]);

        let only_iris = table.filter_providers(&[ProviderId::new("IRISDMC")], &[]);
        assert_eq!(only_iris.len(), 1);

        let without_orfeus = table.filter_providers(&[], &[ProviderId::new("ORFEUS")]);
        assert_eq!(without_orfeus.provider_ids(), vec![&ProviderId::new("IRIS")]);
        assert_eq!(table.request_lines().len(), 2);
    }

    #[test]
    fn get_resolves_upstream_alias() {
        let table = RoutingTable::from_routes([route("GFZ", &["GE APE -- BHE * *"])]);
        assert!(table.get("GEOFON").is_some());
        assert!(table.get("GFZ").is_some());
    }
}
