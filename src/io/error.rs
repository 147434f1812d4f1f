use super::util::ConversionError;
use thiserror::Error;

/// Failure while reading or writing a structure file.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Rejected by the `bio-forge` parser or writer.
    #[error("{0}")]
    Format(String),

    /// Parsed, but not representable as a [`Structure`](crate::Structure).
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl From<bio_forge::io::Error> for Error {
    fn from(e: bio_forge::io::Error) -> Self {
        Error::Format(e.to_string())
    }
}
