// Store failure taxonomy
//
// Parsing and normalization problems never reach this type: they are
// recovered where they happen. Only the backing store can fail an
// operation, and when it does the caller learns which operation it was.

use std::fmt;
use thiserror::Error;

/// Store-level operation that can fail as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Schema,
    CatalogReload,
    CatalogRead,
    FxUpdate,
    FxRead,
    ItemSave,
    ItemDelete,
    IngestLog,
}

impl StoreOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOperation::Schema => "schema setup",
            StoreOperation::CatalogReload => "catalog reload",
            StoreOperation::CatalogRead => "catalog read",
            StoreOperation::FxUpdate => "FX update",
            StoreOperation::FxRead => "FX read",
            StoreOperation::ItemSave => "item save",
            StoreOperation::ItemDelete => "item delete",
            StoreOperation::IngestLog => "ingest log",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("{operation} failed: {source}")]
pub struct StoreError {
    pub operation: StoreOperation,
    #[source]
    pub source: rusqlite::Error,
}

impl StoreError {
    pub fn new(operation: StoreOperation, source: rusqlite::Error) -> Self {
        StoreError { operation, source }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Tag a rusqlite result with the operation it belongs to.
pub trait StoreContext<T> {
    fn during(self, operation: StoreOperation) -> StoreResult<T>;
}

impl<T> StoreContext<T> for rusqlite::Result<T> {
    fn during(self, operation: StoreOperation) -> StoreResult<T> {
        self.map_err(|e| StoreError::new(operation, e))
    }
}
