use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Service keys declared inside a data center block.
///
/// `DATACENTER` is reserved for the landing URL taken from the block header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServiceName {
    Datacenter,
    Dataselect,
    Station,
    Other(String),
}

const DATASELECT_PASS_THROUGH: [&str; 3] = ["longestonly", "quality", "minimumlength"];
const STATION_PASS_THROUGH: [&str; 5] = [
    "level",
    "matchtimeseries",
    "includeavailability",
    "includerestricted",
    "format",
];

impl ServiceName {
    pub fn new(value: &str) -> Self {
        match value.trim() {
            "DATACENTER" => Self::Datacenter,
            "DATASELECTSERVICE" => Self::Dataselect,
            "STATIONSERVICE" => Self::Station,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Datacenter => "DATACENTER",
            Self::Dataselect => "DATASELECTSERVICE",
            Self::Station => "STATIONSERVICE",
            Self::Other(name) => name,
        }
    }

    /// Shared query parameters this service accepts in a bulk body.
    pub fn pass_through_parameters(&self) -> &'static [&'static str] {
        match self {
            Self::Dataselect => &DATASELECT_PASS_THROUGH,
            Self::Station => &STATION_PASS_THROUGH,
            Self::Datacenter | Self::Other(_) => &[],
        }
    }

    pub fn accepts_parameter(&self, key: &str) -> bool {
        self.pass_through_parameters().contains(&key)
    }
}

impl Display for ServiceName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ServiceName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ServiceName {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<ServiceName> for String {
    fn from(value: ServiceName) -> Self {
        value.as_str().to_owned()
    }
}
