//! Closed error-kind taxonomy shared by the whole workspace.
//!
//! Every fallible entry point in `harp-core`, `harp-geo`, `harp-dsl`,
//! `harp-ops` and `harp-ingest` returns `harp_core::error::Result<T>`.
//! There is no global `errno`-style state: the error travels with the
//! `Result`.

use thiserror::Error;

/// The closed set of error kinds every operation in this workspace can fail with.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HarpError {
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("unsupported product: {0}")]
    UnsupportedProduct(String),

    #[error("could not open file '{path}': {message}")]
    FileOpen { path: String, message: String },

    #[error("could not read file '{path}': {message}")]
    FileRead { path: String, message: String },

    #[error("could not close file '{path}': {message}")]
    FileClose { path: String, message: String },

    #[error("ingestion error ({file}): {message}")]
    Ingestion { file: String, message: String },

    /// Stand-in for the original project's dependency on the CODA
    /// format-access library; kept as a distinct error kind because
    /// an ingestion backend may one day delegate to such a library.
    #[error("coda error: {0}")]
    Coda(String),

    #[error("operation error: {0}")]
    Operation(String),

    #[error("operation syntax error at position {position}: {message}")]
    OperationSyntax { message: String, position: usize },

    #[error("variable not found: {0}")]
    VariableNotFound(String),

    #[error("unit conversion error: {0}")]
    UnitConversion(String),

    #[error("no data")]
    NoData,
}

impl HarpError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat(message.into())
    }

    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation(message.into())
    }

    pub fn operation_syntax(message: impl Into<String>, position: usize) -> Self {
        Self::OperationSyntax {
            message: message.into(),
            position,
        }
    }

    pub fn variable_not_found(name: impl Into<String>) -> Self {
        Self::VariableNotFound(name.into())
    }

    pub fn unit_conversion(message: impl Into<String>) -> Self {
        Self::UnitConversion(message.into())
    }

    /// Stable integer code, usable across an FFI boundary.
    pub fn code(&self) -> i32 {
        match self {
            Self::OutOfMemory(_) => 1,
            Self::InvalidArgument(_) => 2,
            Self::InvalidFormat(_) => 3,
            Self::UnsupportedProduct(_) => 4,
            Self::FileOpen { .. } => 5,
            Self::FileRead { .. } => 6,
            Self::FileClose { .. } => 7,
            Self::Ingestion { .. } => 8,
            Self::Coda(_) => 9,
            Self::Operation(_) => 10,
            Self::OperationSyntax { .. } => 11,
            Self::VariableNotFound(_) => 12,
            Self::UnitConversion(_) => 13,
            Self::NoData => 14,
        }
    }
}

pub type Result<T> = std::result::Result<T, HarpError>;
