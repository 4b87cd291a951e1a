//! Error taxonomy: setup and I/O errors are recoverable and carry a message
//! back to the caller; runtime diagnostics are logged, not returned; and
//! programming errors use `debug_assert!` so release builds stay fast.

use std::path::PathBuf;

use thiserror::Error;

use crate::quantity::{Order, QuantityId, ValueType};

/// Failures that abort the operation that raised them and are always
/// surfaced to the caller: bad configuration, a missing input file, an
/// incompatible quantity request.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("quantity {id:?} already exists with a different value type or order")]
    TypeMismatch { id: QuantityId },
    #[error("quantity {id:?} has order {existing:?}, requested {requested:?}")]
    OrderMismatch {
        id: QuantityId,
        existing: Order,
        requested: Order,
    },
    #[error("quantity {id:?} is not present in the store")]
    QuantityMissing { id: QuantityId },
    #[error("expected {expected} particles, got {actual} values for quantity {id:?}")]
    LengthMismatch {
        id: QuantityId,
        expected: usize,
        actual: usize,
    },
    #[error("index {index} is out of range for a store of {len} particles")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("material index {index} is out of range ({count} materials present)")]
    MaterialOutOfRange { index: usize, count: usize },
    #[error("cannot merge stores: left side has {left:?}, right side has {right:?}")]
    QuantitySetMismatch {
        left: Vec<QuantityId>,
        right: Vec<QuantityId>,
    },
    #[error("derivative '{name}' already required with incompatible flags")]
    ConflictingDerivativeFlags { name: String },
    #[error("two equation terms both claim ownership of the smoothing-length derivative")]
    ConflictingSmoothingLengthOwner,
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("missing required option: {0}")]
    MissingOption(&'static str),
}

/// Failures reading or writing files: not found, malformed header,
/// truncated record. Loads are atomic — either a valid store is produced or
/// the caller's prior state is left untouched.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: bad magic number (expected {expected:#x}, found {found:#x})")]
    BadMagic {
        path: PathBuf,
        expected: u32,
        found: u32,
    },
    #[error("{path}: unsupported dump version {found} (supported up to {max})")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        max: u32,
    },
    #[error("{path}: truncated record for quantity {id:?} (expected {expected} bytes, got {actual})")]
    TruncatedRecord {
        path: PathBuf,
        id: QuantityId,
        expected: usize,
        actual: usize,
    },
    #[error("{path}: descriptor table names a value type {value_type:?} this build cannot decode")]
    UnsupportedValueType {
        path: PathBuf,
        value_type: ValueType,
    },
    #[error("{path}: malformed line {line}: {message}")]
    MalformedConfig {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("{path}: could not parse output file name mask")]
    BadFileMask { path: PathBuf },
}

pub type SetupResult<T> = Result<T, SetupError>;
pub type IoResult<T> = Result<T, IoError>;

/// Non-aborting runtime diagnostics, surfaced through the log rather than
/// returned from the call that detected them. See [`crate::run::trigger`].
#[derive(Debug, Clone)]
pub enum Diagnostic {
    NonFiniteQuantity { id: QuantityId, particle: usize },
    NeighbourCountExploding { particle: usize, count: usize },
    ParticleExitedDomain { particle: usize },
    TimestepClampedToMaximum,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::NonFiniteQuantity { id, particle } => {
                write!(f, "non-finite value for {id:?} on particle {particle}")
            }
            Diagnostic::NeighbourCountExploding { particle, count } => {
                write!(f, "particle {particle} has {count} neighbours")
            }
            Diagnostic::ParticleExitedDomain { particle } => {
                write!(f, "particle {particle} exited the domain")
            }
            Diagnostic::TimestepClampedToMaximum => {
                write!(f, "timestep clamped to the configured maximum")
            }
        }
    }
}
