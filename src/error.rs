use std::path::PathBuf;
use thiserror::Error;

/// Failures that end one ingestion run. Malformed rows are not errors: they
/// are salvaged and reported through the run summary instead.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("source file not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("could not read source {}: {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no usable header in {source_name}: {reason}")]
    Structural { source_name: String, reason: String },

    #[error("canonical dataset {} is locked by another ingestion run", .0.display())]
    Locked(PathBuf),

    #[error("configuration error: {0:#}")]
    Config(anyhow::Error),

    #[error("reading canonical dataset failed: {0:#}")]
    Storage(anyhow::Error),

    #[error("write failed: {0:#}")]
    Write(anyhow::Error),
}

impl IngestError {
    /// Process exit status for the batch entry point.
    pub fn exit_code(&self) -> u8 {
        match self {
            IngestError::SourceMissing(_) | IngestError::SourceUnreadable { .. } => 1,
            IngestError::Structural { .. } => 2,
            IngestError::Locked(_)
            | IngestError::Config(_)
            | IngestError::Storage(_)
            | IngestError::Write(_) => 4,
        }
    }
}
