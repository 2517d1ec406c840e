//! Query parameters and bulk request text.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::io::Read;
use std::path::{Path, PathBuf};

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::domain::RequestLine;
use crate::parser::{classify, LineKind};
use crate::{BulkError, ValidationError};

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]");

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Time(OffsetDateTime),
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(value) => f.write_str(value),
            Self::Bool(value) => f.write_str(if *value { "true" } else { "false" }),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value:?}"),
            Self::Time(value) => {
                let formatted = value
                    .to_offset(UtcOffset::UTC)
                    .format(TIMESTAMP_FORMAT)
                    .map_err(|_| std::fmt::Error)?;
                f.write_str(&formatted)
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<OffsetDateTime> for ParamValue {
    fn from(value: OffsetDateTime) -> Self {
        Self::Time(value)
    }
}

/// Keyword parameters; `None` marks a parameter that is present but unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(BTreeMap<String, Option<ParamValue>>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), Some(value.into()));
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<ParamValue>) {
        self.0.insert(key.into(), value);
    }

    /// Parses a `key=value` pair into a text parameter.
    pub fn set_pair(&mut self, pair: &str) -> Result<(), ValidationError> {
        let (key, value) = pair
            .split_once('=')
            .filter(|(key, _)| !key.trim().is_empty())
            .ok_or_else(|| ValidationError::InvalidParameter {
                value: pair.to_owned(),
            })?;
        self.set(key.trim(), value.trim());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key).and_then(Option::as_ref)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Option<ParamValue>> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ParamValue>)> {
        self.0
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_ref()))
    }

    /// `key=value` lines for every set parameter.
    pub fn to_lines(&self) -> Vec<String> {
        self.iter()
            .filter_map(|(key, value)| value.map(|value| format!("{key}={value}")))
            .collect()
    }

    /// URL query string for every set parameter.
    pub fn to_query_string(&self) -> String {
        self.iter()
            .filter_map(|(key, value)| {
                value.map(|value| {
                    format!(
                        "{}={}",
                        urlencoding::encode(key),
                        urlencoding::encode(&value.to_string())
                    )
                })
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl FromIterator<(String, Option<ParamValue>)> for QueryParams {
    fn from_iter<T: IntoIterator<Item = (String, Option<ParamValue>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for QueryParams {
    type Item = (String, Option<ParamValue>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Option<ParamValue>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Source of bulk request lines.
pub enum BulkPayload {
    /// Request text; a single line naming an existing file is read from it.
    Text(String),
    Path(PathBuf),
    Reader(Box<dyn Read + Send>),
    /// Pre-split records; callers must serialize these to text first.
    Records(Vec<Vec<String>>),
}

impl BulkPayload {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Request lines written one per line.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a RequestLine>) -> Self {
        Self::Text(
            lines
                .into_iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    fn read(self) -> Result<String, BulkError> {
        match self {
            Self::Text(text) => {
                let candidate = Path::new(text.trim());
                if !text.contains('\n') && !text.trim().is_empty() && candidate.is_file() {
                    Ok(std::fs::read_to_string(candidate)?)
                } else {
                    Ok(text)
                }
            }
            Self::Path(path) => Ok(std::fs::read_to_string(path)?),
            Self::Reader(mut reader) => {
                let mut text = String::new();
                reader.read_to_string(&mut text)?;
                Ok(text)
            }
            Self::Records(_) => Err(BulkError::UnsupportedBulkType { kind: "records" }),
        }
    }
}

impl std::fmt::Debug for BulkPayload {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Reader(_) => f.write_str("Reader(..)"),
            Self::Records(records) => f.debug_tuple("Records").field(&records.len()).finish(),
        }
    }
}

/// Parameter lines followed by the payload's request text.
pub fn build_bulk_string(payload: BulkPayload, params: &QueryParams) -> Result<String, BulkError> {
    let body = payload.read()?;
    let mut lines = params.to_lines();
    if lines.is_empty() {
        return Ok(body);
    }
    lines.push(body);
    Ok(lines.join("\n"))
}

/// Splits bulk text into its parameter lines and request lines.
///
/// Blank lines and lines of any other shape are skipped.
pub fn split_bulk(text: &str) -> (Vec<String>, Vec<RequestLine>) {
    let mut parameters = Vec::new();
    let mut requests = Vec::new();
    for line in text.lines() {
        match classify(line) {
            LineKind::Parameter => parameters.push(line.trim().to_owned()),
            LineKind::RequestTuple => {
                if let Ok(request) = RequestLine::parse(line) {
                    requests.push(request);
                }
            }
            _ => {}
        }
    }
    (parameters, requests)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;
    use time::macros::datetime;

    #[test]
    fn values_render_in_canonical_form() {
        assert_eq!(ParamValue::from(false).to_string(), "false");
        assert_eq!(ParamValue::from(34.0).to_string(), "34.0");
        assert_eq!(ParamValue::from(-117.5).to_string(), "-117.5");
        assert_eq!(ParamValue::from(7_i64).to_string(), "7");
        assert_eq!(
            ParamValue::from(datetime!(2010-02-27 06:30:00 UTC)).to_string(),
            "2010-02-27T06:30:00.000000"
        );
    }

    #[test]
    fn unset_parameters_are_omitted() {
        let mut params = QueryParams::new().with("level", "station");
        params.insert("quality", None);

        assert_eq!(params.to_lines(), vec![String::from("level=station")]);
        assert_eq!(params.to_query_string(), "level=station");
        assert!(params.contains_key("quality"));
        assert!(params.get("quality").is_none());
    }

    #[test]
    fn query_string_is_url_encoded() {
        let params = QueryParams::new().with("station", "A*,B?");
        assert_eq!(params.to_query_string(), "station=A%2A%2CB%3F");
    }

    #[test]
    fn reader_payload_is_consumed() {
        let reader = Cursor::new(b"IU ANMO 00 BHZ * *".to_vec());
        let bulk = build_bulk_string(BulkPayload::Reader(Box::new(reader)), &QueryParams::new())
            .expect("reader payload");
        assert_eq!(bulk, "IU ANMO 00 BHZ * *");
    }

    #[test]
    fn split_bulk_separates_parameters_from_requests() {
        let (parameters, requests) =
            split_bulk("level=station\n\nIU ANMO 00 BHZ * *\nIU COLA 00 BHZ * *\n");
        assert_eq!(parameters, vec![String::from("level=station")]);
        assert_eq!(requests.len(), 2);
    }

    #[test]
    fn set_pair_rejects_missing_equals() {
        let mut params = QueryParams::new();
        params.set_pair("minlat=34.0").expect("valid pair");
        assert_eq!(params.get("minlat"), Some(&ParamValue::from("34.0")));
        assert!(params.set_pair("minlat").is_err());
        assert!(params.set_pair("=3").is_err());
    }
}
