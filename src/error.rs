//! Error types for the appliance API layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("{0}")]
    Request(#[source] reqwest::Error),
}
