use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An input or target vector whose length does not match the model.
    ///
    /// This signals a caller-side contract violation, not a data-quality
    /// issue, so it surfaces as a real error instead of a soft fallback.
    DimensionMismatch { expected: usize, actual: usize },
    InvalidData(String),
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DimensionMismatch { expected, actual } => {
                write!(f, "dimension mismatch: expected length {expected}, got {actual}")
            }
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            Error::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
