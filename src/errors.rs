use crate::services::{datatier::DbError, object_store::StorageError, viewer::DisplayError};
use std::{io, path::PathBuf};
use thiserror::Error;

/// Everything a catalog operation can fail with.
///
/// Not-found cases are ordinary outcomes for the shell; the rest carry the
/// underlying storage, database or display error.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no such asset: {0}")]
    AssetNotFound(i64),
    #[error("no such user: {0}")]
    UserNotFound(i64),
    #[error("invalid filename `{name}`: {reason}")]
    InvalidFilename { name: String, reason: &'static str },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Database(#[from] DbError),
    /// The object was written but its asset row was not.
    #[error("object `{key}` was uploaded but not recorded in the database: {source}")]
    OrphanedObject {
        key: String,
        #[source]
        source: DbError,
    },
    #[error("saved as `{}` but could not display it: {source}", .path.display())]
    Display {
        path: PathBuf,
        #[source]
        source: DisplayError,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
