use std::time::Duration;

use thiserror::Error;

/// A target could not be fetched. Handled by bounded retry, then the target
/// is skipped.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Navigation to {url} timed out after {}s", .after.as_secs())]
    Timeout { url: String, after: Duration },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Gave up on {target} after {attempts} attempts: {last}")]
    Exhausted {
        target: String,
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl From<browserless_client::BrowserlessError> for FetchError {
    fn from(err: browserless_client::BrowserlessError) -> Self {
        FetchError::Browser(err.to_string())
    }
}

impl From<chromiumoxide::error::CdpError> for FetchError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        FetchError::Browser(err.to_string())
    }
}

/// The document store could not be reached or written. Fatal for the run.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store connection failed: {0}")]
    Connection(String),

    #[error("Store migration failed: {0}")]
    Migration(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid source configuration: {0}")]
    Source(String),
}
