use crate::config::ConfigError;
use crate::controller::ControllerError;
use crate::descriptor::ValidationError;
use crate::logging::InitError;
use crate::negotiate::PortError;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Negotiation(#[from] PortError),
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Session(#[from] ControllerError),
    #[error("logging initialization failed: {0}")]
    Logging(#[from] InitError),
}
