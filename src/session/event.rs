//! Dequeue events and encoded access-unit metadata.
//!
//! A hardware codec reports its output queue state through integer sentinels
//! and a raw buffer index on most platforms. Here that surface is a tagged
//! enum, so a drain loop is an exhaustive `match` instead of a cascade of
//! magic-number comparisons.

/// Flags attached to an encoded access unit by the codec session.
///
/// Mirrors the platform buffer-info flag bits.
pub mod unit_flag {
    /// The unit is a sync point (key frame).
    pub const KEY_FRAME: u32 = 1 << 0;

    /// The unit carries codec configuration data (e.g. CSD), not media.
    pub const CODEC_CONFIG: u32 = 1 << 1;

    /// The unit marks the end of the stream; its payload must not be
    /// forwarded downstream.
    pub const END_OF_STREAM: u32 = 1 << 2;
}

/// Metadata describing one encoded access unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitMeta {
    /// Byte offset of the payload within the codec-owned buffer.
    pub offset: usize,
    /// Payload size in bytes.
    pub size: usize,
    /// Presentation timestamp in microseconds.
    pub pts_us: i64,
    /// Bitwise OR of [`unit_flag`] values.
    pub flags: u32,
}

impl UnitMeta {
    #[inline]
    pub fn is_key_frame(&self) -> bool {
        self.flags & unit_flag::KEY_FRAME != 0
    }

    #[inline]
    pub fn is_codec_config(&self) -> bool {
        self.flags & unit_flag::CODEC_CONFIG != 0
    }

    #[inline]
    pub fn is_end_of_stream(&self) -> bool {
        self.flags & unit_flag::END_OF_STREAM != 0
    }
}

/// A borrowed view onto one dequeued output buffer.
///
/// The payload bytes stay owned by the codec session; they are read through
/// [`CodecSession::unit_data`](super::CodecSession::unit_data) and become
/// invalid the moment the handle is passed back through
/// [`CodecSession::release_unit`](super::CodecSession::release_unit).
/// The encoder wrappers copy the payload out before releasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitHandle {
    /// Index of the buffer inside the codec session's output queue.
    pub index: usize,
    /// Metadata for this unit.
    pub meta: UnitMeta,
}

/// Result of one attempt to dequeue an output buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum DequeueEvent {
    /// No output available within the timeout; retry on the next iteration.
    TryAgain,
    /// The codec rotated its buffer set; nothing to forward.
    BuffersChanged,
    /// The codec reported its output format. Emitted once per session,
    /// before the first data unit.
    FormatChanged(FormatDescriptor),
    /// An encoded access unit is ready.
    Unit(UnitHandle),
}

/// The codec-reported output format, forwarded verbatim to the callback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatDescriptor {
    /// Mime-type style codec name, e.g. `audio/mp4a-latm` or `video/avc`.
    pub mime: String,
    pub sample_rate: Option<u32>,
    pub channel_count: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}
