//! Data access layer: the facade every read/write goes through, the
//! in-memory question state the UI reads, and the filter semantics
//! shared by the online and offline paths.

pub mod filter;
mod local;

mod facade;

use thiserror::Error;

pub use facade::{DataFacade, PagedQuestions, PageRequest, Pagination, PAGE_FETCH_SIZE};
pub use local::LocalQuestions;

use crate::questions::ValidationError;
use crate::remote::RemoteError;

/// Errors surfaced to callers of the data layer. Raw transport and
/// storage failures are translated into this taxonomy at the facade
/// boundary; the UI never handles them directly.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Not authenticated — please log in")]
    NotAuthenticated,

    #[error("Offline — operation unsupported")]
    OfflineUnsupported,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Remote transient failure surfaced verbatim (writes only; reads
    /// fall back to the cache instead when one exists)
    #[error("Remote store failure: {0}")]
    Remote(RemoteError),
}

impl From<RemoteError> for DataError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::AuthFailed => Self::NotAuthenticated,
            RemoteError::NotFound(what) => Self::NotFound(what),
            other => Self::Remote(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;

/// Session slot shared between the facade, the optimistic updater and
/// the count batcher
pub type SharedSession = std::sync::Arc<std::sync::RwLock<Option<crate::remote::Session>>>;
