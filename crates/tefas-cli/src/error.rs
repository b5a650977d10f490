use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] tefas_core::ConfigError),

    #[error(transparent)]
    Validation(#[from] tefas_core::ValidationError),

    #[error(transparent)]
    Fetch(#[from] tefas_core::FetchError),

    #[error(transparent)]
    Update(#[from] tefas_core::UpdateError),

    #[error(transparent)]
    Interchange(#[from] tefas_core::InterchangeError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Validation(_) => 2,
            Self::Serialization(_) => 4,
            Self::Fetch(_) => 6,
            Self::Update(_) => 6,
            Self::Interchange(_) => 10,
            Self::Io(_) => 10,
        }
    }
}
