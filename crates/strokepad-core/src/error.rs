use thiserror::Error;

/// Failures surfaced by the persistence codec. Tool- and geometry-level
/// problems never reach this type; they resolve locally as no-ops or
/// discarded gestures.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The record stream is structurally unreadable. The load is aborted
    /// and no partial document is exposed.
    #[error("document is corrupt: {0}")]
    Corrupt(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
