use std::fmt::{Display, Formatter};

/// Header token opening a data center block.
pub const PROVIDER_HEADER_TOKEN: &str = "DATACENTER=";

const REQUEST_FIELDS: usize = 6;

/// Classification of one line of routing response text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    Empty,
    ProviderHeader,
    Parameter,
    ServiceDeclaration,
    RequestTuple,
    Unrecognized,
}

impl LineKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty line",
            Self::ProviderHeader => "data center header",
            Self::Parameter => "parameter",
            Self::ServiceDeclaration => "service declaration",
            Self::RequestTuple => "request line",
            Self::Unrecognized => "unrecognized line",
        }
    }
}

impl Display for LineKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a line after trimming surrounding whitespace.
///
/// Rules apply in order: empty, `DATACENTER=` header, `KEY=value` (service
/// declaration when the key is upper case, parameter otherwise), six
/// whitespace-separated fields, anything else.
pub fn classify(raw: &str) -> LineKind {
    let line = raw.trim();
    if line.is_empty() {
        return LineKind::Empty;
    }
    if line.starts_with(PROVIDER_HEADER_TOKEN) {
        return LineKind::ProviderHeader;
    }
    if let Some((key, _)) = line.split_once('=') {
        return if is_upper(key) {
            LineKind::ServiceDeclaration
        } else {
            LineKind::Parameter
        };
    }
    if line.split_whitespace().count() == REQUEST_FIELDS {
        return LineKind::RequestTuple;
    }
    LineKind::Unrecognized
}

// At least one cased character and none of them lower case.
fn is_upper(text: &str) -> bool {
    text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase)
}

/// A trimmed response line together with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseLine {
    text: String,
    kind: LineKind,
}

impl ResponseLine {
    pub fn new(raw: &str) -> Self {
        let text = raw.trim().to_owned();
        let kind = classify(&text);
        Self { text, kind }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn kind(&self) -> LineKind {
        self.kind
    }

    pub fn is_empty(&self) -> bool {
        self.kind == LineKind::Empty
    }

    pub fn is_provider_header(&self) -> bool {
        self.kind == LineKind::ProviderHeader
    }

    pub fn is_parameter(&self) -> bool {
        self.kind == LineKind::Parameter
    }

    pub fn is_service_declaration(&self) -> bool {
        self.kind == LineKind::ServiceDeclaration
    }

    pub fn is_request_tuple(&self) -> bool {
        self.kind == LineKind::RequestTuple
    }

    /// Splits a `KEY=value` line at the first `=`.
    pub fn key_value(&self) -> Option<(&str, &str)> {
        self.text
            .split_once('=')
            .map(|(key, value)| (key.trim(), value.trim()))
    }
}
