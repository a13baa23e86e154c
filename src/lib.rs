#![deny(clippy::all)]

//! Hardware media-encoder wrappers.
//!
//! This crate wraps a platform hardware codec session behind two small
//! encoder coordinators: a call-driven PCM-to-AAC audio encoder that frames
//! its output with ADTS headers, and a two-thread surface video encoder fed
//! by a GPU renderer. The codec itself is injected through the
//! [`CodecSession`](session::CodecSession) trait, so the pipeline logic is
//! testable without hardware.

// Codec session contract and its event/surface types
pub mod session;

// Encoder coordinators built on top of a session
pub mod encoder;

// Re-export the API surface at crate root
pub use encoder::{
    AudioEncoderConfig, EncodeKind, Encoder, EncoderCallback, EncoderError, EncoderFactory,
    EncoderRequest, EncoderResult, EncoderState, PcmAudioEncoder, SurfaceVideoEncoder,
    VideoEncoderConfig,
};
pub use session::{
    CodecSession, DequeueEvent, FormatDescriptor, InputSurface, SessionError, SessionFormat,
    SessionResult, SurfaceRenderer, UnitHandle, UnitMeta,
};
