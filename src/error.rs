use std::io;
use thiserror::Error;

/// Unified error type for the dump and session layers.
///
/// A failed write never hides progress: [`DumpError::SinkWriteFailed`]
/// carries the count of input bytes the failing call had already durably
/// transcoded, so callers can retry the remainder like a short write.
#[derive(Error, Debug)]
pub enum DumpError {
    /// The sink could not be opened or acquired.
    #[error("sink unavailable: {0}")]
    ResourceUnavailable(#[source] io::Error),

    /// An append to the sink failed mid-transcode.
    #[error("sink write failed after {committed} bytes: {source}")]
    SinkWriteFailed {
        committed: u64,
        #[source]
        source: io::Error,
    },

    /// Write or close was called without a prior successful open.
    #[error("session is not open")]
    InvalidState,
}
