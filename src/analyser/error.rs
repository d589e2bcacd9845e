//! Errors that abort processing of a capture.
//!
//! Anything the classifier merely doesn't expect is *not* an error; it is reported
//! through a message's confidence and comment instead.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    /// One transaction id spans rows that disagree on address or direction.
    /// Row framing is lost at this point, so nothing after it can be trusted.
    #[error("Malformed capture in transaction {packet_id}: {reason}")]
    MalformedCapture { packet_id: String, reason: String },

    #[error("Invalid capture row at line {line}: {reason}")]
    InvalidRow { line: u64, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, CaptureError>;
