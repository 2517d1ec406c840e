use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const FIELD_COUNT: usize = 6;

/// Location code used on the wire for an empty location.
pub const EMPTY_LOCATION: &str = "--";

/// Level of detail at which request lines are compared with returned data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Network,
    Station,
    Channel,
}

impl Granularity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Station => "station",
            Self::Channel => "channel",
        }
    }

    /// Number of leading request-line fields that form a key.
    pub const fn field_count(self) -> usize {
        match self {
            Self::Network => 1,
            Self::Station => 2,
            Self::Channel => 4,
        }
    }
}

impl Display for Granularity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "network" => Ok(Self::Network),
            "station" => Ok(Self::Station),
            "channel" | "response" => Ok(Self::Channel),
            other => Err(ValidationError::InvalidGranularity {
                value: other.to_owned(),
            }),
        }
    }
}

/// One `NET STA LOC CHA START END` unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestLine {
    network: String,
    station: String,
    location: String,
    channel: String,
    start: String,
    end: String,
}

impl RequestLine {
    pub fn new(
        network: impl Into<String>,
        station: impl Into<String>,
        location: impl Into<String>,
        channel: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        let location = location.into();
        Self {
            network: network.into(),
            station: station.into(),
            location: if location.trim().is_empty() {
                String::from(EMPTY_LOCATION)
            } else {
                location
            },
            channel: channel.into(),
            start: start.into(),
            end: end.into(),
        }
    }

    /// Parses a whitespace-separated line holding exactly six fields.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let fields: Vec<&str> = input.split_whitespace().collect();
        if fields.len() != FIELD_COUNT {
            return Err(ValidationError::RequestLineArity {
                line: input.trim().to_owned(),
                found: fields.len(),
            });
        }

        Ok(Self::new(
            fields[0], fields[1], fields[2], fields[3], fields[4], fields[5],
        ))
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    pub fn fields(&self) -> [&str; FIELD_COUNT] {
        [
            &self.network,
            &self.station,
            &self.location,
            &self.channel,
            &self.start,
            &self.end,
        ]
    }

    /// Dotted key made of the leading fields for `granularity`, e.g. `IU.ANMO`.
    pub fn key(&self, granularity: Granularity) -> String {
        self.fields()[..granularity.field_count()].join(".")
    }

    /// Whether a dotted key reported by returned data satisfies this line.
    ///
    /// Request fields may carry FDSN wildcards (`*`, `?`); an empty location in
    /// the key is read as `--`.
    pub fn matches_key(&self, key: &str, granularity: Granularity) -> bool {
        let parts: Vec<&str> = key.split('.').collect();
        if parts.len() != granularity.field_count() {
            return false;
        }

        self.fields()
            .iter()
            .zip(parts)
            .all(|(pattern, value)| {
                let value = if value.is_empty() { EMPTY_LOCATION } else { value };
                pattern
                    .split(',')
                    .any(|alternative| wildcard_match(alternative, value))
            })
    }
}

impl Display for RequestLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.fields().join(" "))
    }
}

impl FromStr for RequestLine {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for RequestLine {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RequestLine> for String {
    fn from(value: RequestLine) -> Self {
        value.to_string()
    }
}

fn wildcard_match(pattern: &str, value: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let value: Vec<char> = value.chars().collect();
    let (mut p, mut v) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while v < value.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == value[v]) {
            p += 1;
            v += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, v));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            v = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|ch| *ch == '*')
}
