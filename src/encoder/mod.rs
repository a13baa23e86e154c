//! Encoder API surface.
//!
//! Two encoder implementations share one lifecycle contract: a call-driven
//! PCM audio encoder and a two-thread surface video encoder. Both are thin
//! coordinators around an injected [`CodecSession`](crate::session::CodecSession);
//! neither touches compressed bits beyond framing and forwarding.

pub mod adts;
pub mod audio;
pub mod error;
pub mod factory;
pub mod video;

pub use adts::AdtsHeader;
pub use audio::PcmAudioEncoder;
pub use error::{EncoderError, EncoderResult};
pub use factory::{EncodeKind, EncoderFactory, EncoderRequest};
pub use video::SurfaceVideoEncoder;

use std::path::PathBuf;
use std::sync::Arc;

use crate::session::{FormatDescriptor, UnitMeta};

/// Encoder lifecycle state.
///
/// `Paused` is only ever entered by the video encoder; the audio encoder is
/// synchronous and call-driven, so it has no independent running state
/// beyond `Prepared`/`Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncoderState {
    /// Created, not yet prepared (or `prepare` failed).
    #[default]
    Idle,
    /// Session configured, ready to run.
    Prepared,
    /// Actively encoding.
    Running,
    /// Progress frozen; threads and session kept alive.
    Paused,
    /// Shutdown in progress.
    Stopping,
    /// Session torn down; terminal.
    Released,
}

/// Receives encoder output events.
///
/// `on_format_changed` is delivered exactly once per session, when the codec
/// first reports its output format, and carries no payload bytes. The byte
/// slice passed to `on_data_encoded` is only valid for the duration of the
/// call; implementations copy what they keep.
pub trait EncoderCallback: Send + Sync {
    fn on_format_changed(&self, format: &FormatDescriptor);
    fn on_data_encoded(&self, data: &[u8], meta: &UnitMeta);
}

/// Audio encoder configuration, captured at `prepare` time and never
/// mutated afterwards.
#[derive(Clone)]
pub struct AudioEncoderConfig {
    /// PCM sample rate in Hz; must appear in
    /// [`adts::FREQUENCY_TABLE`].
    pub sample_rate: u32,
    /// Channel count (1..=7, must fit the 3-bit header field).
    pub channel_count: u32,
    /// Bytes per PCM sample (1 or 2).
    pub bytes_per_sample: u32,
    /// Target bitrate in bits per second.
    pub bitrate: u32,
    /// Flat-file sink for framed records; `None` means encode-only mode
    /// (callback delivery without persistence).
    pub output: Option<PathBuf>,
    /// Output event receiver.
    pub callback: Arc<dyn EncoderCallback>,
}

impl std::fmt::Debug for AudioEncoderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEncoderConfig")
            .field("sample_rate", &self.sample_rate)
            .field("channel_count", &self.channel_count)
            .field("bytes_per_sample", &self.bytes_per_sample)
            .field("bitrate", &self.bitrate)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

/// Video encoder configuration, captured at `prepare` time and never
/// mutated afterwards.
#[derive(Clone)]
pub struct VideoEncoderConfig {
    pub width: u32,
    pub height: u32,
    /// Frames per second produced by the render thread.
    pub frame_rate: u32,
    /// Target bitrate in bits per second. Defaults to `width * height * 4`.
    pub bitrate: Option<u32>,
    /// Key-frame cadence in seconds. Defaults to 1.
    pub keyframe_interval_secs: Option<u32>,
    /// Output event receiver.
    pub callback: Arc<dyn EncoderCallback>,
}

impl VideoEncoderConfig {
    /// Effective bitrate after applying the default formula.
    pub fn effective_bitrate(&self) -> u32 {
        self.bitrate
            .unwrap_or_else(|| self.width.saturating_mul(self.height).saturating_mul(4))
    }

    /// Effective key-frame interval after applying the default.
    pub fn effective_keyframe_interval_secs(&self) -> u32 {
        self.keyframe_interval_secs.unwrap_or(1)
    }
}

impl std::fmt::Debug for VideoEncoderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoEncoderConfig")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("frame_rate", &self.frame_rate)
            .field("bitrate", &self.bitrate)
            .field("keyframe_interval_secs", &self.keyframe_interval_secs)
            .finish_non_exhaustive()
    }
}

/// Lifecycle contract shared by both encoder implementations.
///
/// `stop` is idempotent and must complete even when `prepare` failed partway
/// or the encoder is already released.
pub trait Encoder: Send {
    /// Configure the codec session and any output resources.
    fn prepare(&mut self) -> EncoderResult<()>;

    /// Current lifecycle state.
    fn state(&self) -> EncoderState;

    /// Flush remaining output and tear the session down.
    fn stop(&mut self);
}
