//! Application error type.
//!
//! Every fallible operation returns `Result<_, AppError>`. The error carries a
//! [`ErrorKind`] so callers (and tests) can tell failures apart, and the kind
//! decides the process exit code used by the `nspec` binary.

/// Failure categories surfaced by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad CLI or configuration value (zero batch size, `k = 0`, ...).
    InvalidArgument,
    /// Filesystem failure while opening, reading or writing a file.
    Io,
    /// Grid bounds or spacing are unusable.
    InvalidRange,
    /// Target spectrum has no known points or an out-of-range index.
    InvalidTarget,
    /// A record could not be parsed into the expected numeric fields.
    MalformedRecord,
    /// A library line does not hold exactly one spectrum.
    RecordLength,
    /// Dataset rows do not match the requested feature/label columns.
    SchemaMismatch,
    /// No qualifying input files (or rows) were found.
    EmptyDataset,
    /// Checkpoint parameters or model outputs have the wrong shape.
    Model,
    /// A long-running operation was cancelled cooperatively.
    Cancelled,
}

impl ErrorKind {
    /// Process exit code for this kind.
    ///
    /// - 2: the inputs/flags are wrong
    /// - 3: the data files are wrong
    /// - 4: the model boundary failed
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::InvalidArgument
            | ErrorKind::Io
            | ErrorKind::InvalidRange
            | ErrorKind::InvalidTarget => 2,
            ErrorKind::MalformedRecord
            | ErrorKind::RecordLength
            | ErrorKind::SchemaMismatch
            | ErrorKind::EmptyDataset => 3,
            ErrorKind::Model => 4,
            ErrorKind::Cancelled => 130,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::Io => "i/o error",
            ErrorKind::InvalidRange => "invalid range",
            ErrorKind::InvalidTarget => "invalid target",
            ErrorKind::MalformedRecord => "malformed record",
            ErrorKind::RecordLength => "record length",
            ErrorKind::SchemaMismatch => "schema mismatch",
            ErrorKind::EmptyDataset => "empty dataset",
            ErrorKind::Model => "model error",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.kind.label())
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("exit_code", &self.exit_code())
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
