use parquet_peek_core::{ErrorKind, PeekError};
use snafu::Snafu;

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(context(false), display("{source}"))]
    Peek { source: PeekError },

    #[snafu(display("Failed to write report: {source}"))]
    WriteReport { source: std::io::Error },
}

impl CliError {
    /// Taxonomy kind for pipeline failures; `None` for local output errors.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            CliError::Peek { source } => Some(source.kind()),
            CliError::WriteReport { .. } => None,
        }
    }
}
