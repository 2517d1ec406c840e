use fedroute_core::FederationError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] fedroute_core::ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Federation(#[from] FederationError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Command(_) => 2,
            Self::Federation(error) => match error {
                FederationError::AllProvidersFailed { .. } => 4,
                FederationError::Bulk(_) | FederationError::Validation(_) => 2,
                _ => 3,
            },
            Self::Serialization(_) => 5,
            Self::Io(_) => 10,
        }
    }
}
