//! The hardware codec session abstraction.
//!
//! A [`CodecSession`] is the opaque platform encode engine: raw media goes in
//! through an input queue (or, for video, through a drawable input surface),
//! encoded access units come out of an output queue. The trait captures the
//! queue/dequeue semantics the encoders are written against; production
//! bindings wrap the actual device, tests script the session.

pub mod event;
pub mod surface;

pub use event::{unit_flag, DequeueEvent, FormatDescriptor, UnitHandle, UnitMeta};
pub use surface::{InputSurface, SurfaceRenderer};

use std::time::Duration;

/// Configuration applied to a session at [`CodecSession::configure`] time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionFormat {
    Audio {
        sample_rate: u32,
        channel_count: u32,
        bitrate: u32,
    },
    Video {
        width: u32,
        height: u32,
        frame_rate: u32,
        bitrate: u32,
        /// One key frame per this many seconds.
        keyframe_interval_secs: u32,
    },
}

/// Session error type
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The codec device rejected an operation.
    #[error("codec device error: {0}")]
    Device(String),

    /// An operation was issued against a session in the wrong state.
    #[error("invalid session state: {0}")]
    InvalidState(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// The opaque hardware/software encode engine.
///
/// One session is owned by exactly one encoder instance. Output-side calls
/// (`dequeue_output`, `unit_data`, `release_unit`, teardown) are issued by a
/// single thread at a time; the video encoder serializes access through a
/// mutex and the audio encoder is single-threaded by contract.
///
/// Dequeued payload bytes are only valid until the handle is released; the
/// caller copies them out before calling [`release_unit`](Self::release_unit).
pub trait CodecSession: Send {
    /// Configure the session for encoding. Must be called exactly once,
    /// before `start`.
    fn configure(&mut self, format: &SessionFormat) -> SessionResult<()>;

    /// Start the codec.
    fn start(&mut self) -> SessionResult<()>;

    /// Obtain the encoder-owned drawable input surface.
    ///
    /// Only meaningful for sessions configured with
    /// [`SessionFormat::Video`]; must be called between `configure` and
    /// `start`.
    fn create_input_surface(&mut self) -> SessionResult<Box<dyn InputSurface>>;

    /// Push one chunk of raw input into the next free input buffer.
    ///
    /// Returns `Ok(false)` when no input buffer is currently available; the
    /// caller is expected to skip the chunk and re-drive later rather than
    /// block.
    fn queue_input(&mut self, data: &[u8], pts_us: i64) -> SessionResult<bool>;

    /// Signal that no further input follows. The output queue will
    /// eventually yield a unit flagged
    /// [`unit_flag::END_OF_STREAM`].
    fn signal_end_of_stream(&mut self) -> SessionResult<()>;

    /// Attempt to dequeue the next output buffer, waiting at most `timeout`.
    fn dequeue_output(&mut self, timeout: Duration) -> SessionResult<DequeueEvent>;

    /// Borrow the payload bytes of a dequeued unit.
    fn unit_data(&self, handle: &UnitHandle) -> &[u8];

    /// Return a dequeued buffer to the codec. The payload borrow obtained
    /// through [`unit_data`](Self::unit_data) is invalid afterwards.
    fn release_unit(&mut self, handle: UnitHandle);

    /// Drop any queued but undelivered buffers.
    fn flush(&mut self) -> SessionResult<()>;

    /// Stop the codec.
    fn stop(&mut self) -> SessionResult<()>;

    /// Release the underlying device. The session must not be used
    /// afterwards.
    fn release(&mut self) -> SessionResult<()>;
}
