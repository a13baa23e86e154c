//! Selection logic mapping an encode-type value to an encoder instance.

use crate::session::{CodecSession, SurfaceRenderer};

use super::audio::PcmAudioEncoder;
use super::error::{EncoderError, EncoderResult};
use super::video::SurfaceVideoEncoder;
use super::{AudioEncoderConfig, Encoder, VideoEncoderConfig};

/// The known encoder kinds, with their raw wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum EncodeKind {
    PcmAudio = 0,
    SurfaceVideo = 1,
}

impl EncodeKind {
    /// Map a raw platform encode-type value; unknown values fail with
    /// [`EncoderError::UnsupportedOperation`].
    pub fn from_raw(raw: i32) -> EncoderResult<Self> {
        match raw {
            0 => Ok(Self::PcmAudio),
            1 => Ok(Self::SurfaceVideo),
            other => Err(EncoderError::UnsupportedOperation(other)),
        }
    }

    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

/// Everything needed to build one encoder of a given kind.
pub enum EncoderRequest {
    PcmAudio(AudioEncoderConfig),
    SurfaceVideo {
        config: VideoEncoderConfig,
        renderer: Box<dyn SurfaceRenderer>,
    },
}

impl EncoderRequest {
    pub fn kind(&self) -> EncodeKind {
        match self {
            Self::PcmAudio(_) => EncodeKind::PcmAudio,
            Self::SurfaceVideo { .. } => EncodeKind::SurfaceVideo,
        }
    }
}

/// Stateless encoder constructor.
pub struct EncoderFactory;

impl EncoderFactory {
    /// Build the encoder named by `raw_kind` around `session`.
    ///
    /// Fails with [`EncoderError::UnsupportedOperation`] when `raw_kind` is
    /// outside the known set, and with
    /// [`EncoderError::UnsupportedConfiguration`] when the request payload
    /// does not match the requested kind.
    pub fn create(
        raw_kind: i32,
        request: EncoderRequest,
        session: Box<dyn CodecSession>,
    ) -> EncoderResult<Box<dyn Encoder>> {
        let kind = EncodeKind::from_raw(raw_kind)?;
        if kind != request.kind() {
            return Err(EncoderError::UnsupportedConfiguration(format!(
                "request payload is for {:?}, not {:?}",
                request.kind(),
                kind
            )));
        }
        Ok(match request {
            EncoderRequest::PcmAudio(config) => Box::new(PcmAudioEncoder::new(session, config)),
            EncoderRequest::SurfaceVideo { config, renderer } => {
                Box::new(SurfaceVideoEncoder::new(session, renderer, config))
            }
        })
    }
}
