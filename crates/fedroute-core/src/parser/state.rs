use std::fmt::{Display, Formatter};

use super::LineKind;

/// Position of the parser within the routing response grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserState {
    Pre,
    Parameter,
    Empty,
    ProviderHeader,
    Service,
    Request,
}

impl ParserState {
    /// Transition table; `None` marks a line that may not follow this state.
    pub const fn next(self, kind: LineKind) -> Option<Self> {
        use LineKind as K;

        match (self, kind) {
            (Self::Pre, K::Empty) => Some(Self::Empty),
            (Self::Pre, K::Parameter) => Some(Self::Parameter),
            (Self::Pre, K::ProviderHeader) => Some(Self::ProviderHeader),

            (Self::Parameter, K::Empty) => Some(Self::Empty),
            (Self::Parameter, K::Parameter) => Some(Self::Parameter),

            (Self::Empty, K::Empty) => Some(Self::Empty),
            (Self::Empty, K::ProviderHeader) => Some(Self::ProviderHeader),

            (Self::ProviderHeader, K::ServiceDeclaration) => Some(Self::Service),

            (Self::Service, K::ServiceDeclaration) => Some(Self::Service),
            (Self::Service, K::RequestTuple) => Some(Self::Request),

            (Self::Request, K::Empty) => Some(Self::Empty),
            (Self::Request, K::RequestTuple) => Some(Self::Request),

            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pre => "start of response",
            Self::Parameter => "parameter block",
            Self::Empty => "blank line",
            Self::ProviderHeader => "data center header",
            Self::Service => "service declarations",
            Self::Request => "request lines",
        }
    }
}

impl Display for ParserState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
