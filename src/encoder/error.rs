//! Encoder error taxonomy.
//!
//! Configuration mistakes are surfaced immediately and never coerced;
//! transient dequeue conditions are control flow, not errors, and never show
//! up here. Teardown failures are logged and swallowed so that `stop()`
//! always completes from the caller's point of view.

use crate::session::SessionError;

/// Encoder error type
#[derive(Debug, thiserror::Error)]
pub enum EncoderError {
    /// The codec device could not be configured. Fatal to `prepare`, not
    /// retried.
    #[error("failed to initialize codec: {0}")]
    CodecInit(#[from] SessionError),

    /// A configuration value lies outside the supported set.
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// The sample rate has no entry in the ADTS frequency table.
    #[error("unsupported sample rate: {0} Hz")]
    UnsupportedSampleRate(u32),

    /// The output sink could not be opened or written.
    #[error("output sink error: {0}")]
    Io(#[from] std::io::Error),

    /// The factory was asked for an encode type outside the known set.
    #[error("unsupported encode type: {0}")]
    UnsupportedOperation(i32),
}

pub type EncoderResult<T> = Result<T, EncoderError>;
