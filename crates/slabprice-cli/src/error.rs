use slabprice_core::{PipelineError, ValidationError, WarehouseError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Pipeline(PipelineError::Persistence(_)) => 5,
            Self::Pipeline(error) if error.is_client_error() => 2,
            Self::Pipeline(_) => 3,
            Self::Validation(_) => 2,
            Self::Warehouse(WarehouseError::RecordNotFound(_)) => 2,
            Self::Warehouse(_) => 5,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }

    /// Stable machine-readable code printed alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Pipeline(error) => error.code(),
            Self::Validation(_) => "cli.invalid_input",
            Self::Warehouse(WarehouseError::RecordNotFound(_)) => "warehouse.not_found",
            Self::Warehouse(_) => "warehouse.failure",
            Self::Serialization(_) => "cli.serialization",
            Self::Io(_) => "cli.io",
        }
    }
}
