//! Call-driven PCM audio encoder.
//!
//! The caller is the sole producer and drives the encoder from a single
//! thread: each `encode` call pushes one PCM chunk into the codec session,
//! then drains whatever encoded access units the codec has ready. Every
//! drained unit is wrapped with a 7-byte ADTS framing header, stamped with a
//! byte-count-derived presentation timestamp, delivered to the callback and
//! optionally appended to a flat-file sink.
//!
//! Presentation time is an exact function of bytes consumed, never of
//! wall-clock time: a live microphone delivers chunks at irregular cadence,
//! and downstream muxers need timestamps that only depend on the PCM stream.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::session::{CodecSession, DequeueEvent, SessionFormat};

use super::adts::{frequency_index, AdtsHeader};
use super::error::{EncoderError, EncoderResult};
use super::{AudioEncoderConfig, Encoder, EncoderState};

/// PCM → framed compressed audio, synchronous and single-threaded.
pub struct PcmAudioEncoder {
    session: Box<dyn CodecSession>,
    config: AudioEncoderConfig,
    state: EncoderState,
    /// Set once `configure` succeeded; teardown is attempted iff true.
    session_open: bool,
    sink: Option<BufWriter<File>>,
    /// Accumulated presentation time of the PCM consumed so far.
    pts_us: i64,
    format_reported: bool,
}

impl PcmAudioEncoder {
    /// Create an encoder around an unconfigured codec session.
    pub fn new(session: Box<dyn CodecSession>, config: AudioEncoderConfig) -> Self {
        Self {
            session,
            config,
            state: EncoderState::Idle,
            session_open: false,
            sink: None,
            pts_us: 0,
            format_reported: false,
        }
    }

    /// Validate the configuration, open the codec session in encode mode and
    /// create the output sink if one was requested.
    pub fn prepare(&mut self) -> EncoderResult<()> {
        let cfg = &self.config;
        if frequency_index(cfg.sample_rate).is_none() {
            return Err(EncoderError::UnsupportedConfiguration(format!(
                "sample rate {} Hz has no framing-table index",
                cfg.sample_rate
            )));
        }
        if !(1..=7).contains(&cfg.channel_count) {
            return Err(EncoderError::UnsupportedConfiguration(format!(
                "channel count {} does not fit the framing header",
                cfg.channel_count
            )));
        }
        if cfg.bytes_per_sample != 1 && cfg.bytes_per_sample != 2 {
            return Err(EncoderError::UnsupportedConfiguration(format!(
                "{} bytes per sample is not PCM8/PCM16",
                cfg.bytes_per_sample
            )));
        }

        self.session.configure(&SessionFormat::Audio {
            sample_rate: cfg.sample_rate,
            channel_count: cfg.channel_count,
            bitrate: cfg.bitrate,
        })?;
        self.session_open = true;
        self.session.start()?;

        if let Some(path) = &cfg.output {
            let file = File::create(path)?;
            self.sink = Some(BufWriter::new(file));
        }

        info!(
            sample_rate = cfg.sample_rate,
            channels = cfg.channel_count,
            persist = cfg.output.is_some(),
            "audio encoder prepared"
        );
        self.state = EncoderState::Prepared;
        Ok(())
    }

    /// Feed one chunk of raw PCM.
    ///
    /// No-op on empty input or on an encoder whose `prepare` did not
    /// succeed. When the codec has no free input buffer the chunk is skipped
    /// rather than blocking; the caller re-drives on its next tick.
    pub fn encode(&mut self, chunk: &[u8]) {
        if !matches!(self.state, EncoderState::Prepared | EncoderState::Running) {
            return;
        }
        if chunk.is_empty() {
            return;
        }
        self.state = EncoderState::Running;

        // The clock only advances for bytes the codec actually consumed; a
        // skipped or failed chunk must not shift later timestamps.
        let pts_us = self.pts_us + self.pts_delta_us(chunk.len());
        match self.session.queue_input(chunk, pts_us) {
            Ok(true) => self.pts_us = pts_us,
            Ok(false) => {
                debug!(len = chunk.len(), "no input buffer free, chunk skipped");
            }
            Err(e) => {
                warn!(error = %e, "failed to queue PCM chunk");
                return;
            }
        }

        self.drain();
    }

    /// Forward every output buffer the codec has ready right now.
    fn drain(&mut self) {
        loop {
            let event = match self.session.dequeue_output(Duration::ZERO) {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "dequeue failed during audio drain");
                    return;
                }
            };
            match event {
                DequeueEvent::TryAgain => return,
                DequeueEvent::BuffersChanged => continue,
                DequeueEvent::FormatChanged(format) => {
                    if !self.format_reported {
                        self.format_reported = true;
                        self.config.callback.on_format_changed(&format);
                    }
                }
                DequeueEvent::Unit(handle) => {
                    if handle.meta.is_end_of_stream() {
                        self.session.release_unit(handle);
                        return;
                    }
                    self.forward_unit(handle);
                }
            }
        }
    }

    /// Frame one access unit, emit it and hand the buffer back.
    fn forward_unit(&mut self, handle: crate::session::UnitHandle) {
        let meta = handle.meta;
        let header =
            match AdtsHeader::for_unit(self.config.sample_rate, self.config.channel_count, meta.size)
            {
                Ok(header) => header,
                // A unit too large for the 13-bit frame length cannot be
                // framed; dropped rather than corrupting the stream.
                Err(e) => {
                    warn!(error = %e, "dropping unit with unframable size");
                    self.session.release_unit(handle);
                    return;
                }
            };

        let payload = self.session.unit_data(&handle);
        let mut framed = Vec::with_capacity(super::adts::HEADER_LEN + payload.len());
        framed.extend_from_slice(&header.to_bytes());
        framed.extend_from_slice(&payload[meta.offset..meta.offset + meta.size]);
        self.session.release_unit(handle);

        let out_meta = crate::session::UnitMeta {
            offset: 0,
            size: framed.len(),
            pts_us: self.pts_us,
            flags: meta.flags,
        };
        self.config.callback.on_data_encoded(&framed, &out_meta);

        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.write_all(&framed) {
                warn!(error = %e, "sink write failed, continuing without persistence");
                self.sink = None;
            }
        }
    }

    /// Flush, stop and release the codec session and close the sink.
    ///
    /// Idempotent; a no-op when `prepare` failed before the session opened.
    pub fn stop(&mut self) {
        if self.state == EncoderState::Released {
            return;
        }
        self.state = EncoderState::Stopping;

        if self.session_open {
            // Each teardown step is attempted even if the previous one
            // failed; the codec device must not be leaked.
            if let Err(e) = self.session.flush() {
                warn!(error = %e, "session flush failed during stop");
            }
            if let Err(e) = self.session.stop() {
                warn!(error = %e, "session stop failed");
            }
            if let Err(e) = self.session.release() {
                warn!(error = %e, "session release failed");
            }
            self.session_open = false;
        }

        if let Some(mut sink) = self.sink.take() {
            if let Err(e) = sink.flush() {
                warn!(error = %e, "sink flush failed during stop");
            }
        }

        info!(pts_us = self.pts_us, "audio encoder stopped");
        self.state = EncoderState::Released;
    }

    /// Accumulated presentation time of the PCM consumed so far.
    pub fn pts_us(&self) -> i64 {
        self.pts_us
    }

    /// Microseconds represented by `len` bytes of PCM, round-half-up.
    fn pts_delta_us(&self, len: usize) -> i64 {
        let denom = u64::from(self.config.sample_rate)
            * u64::from(self.config.channel_count)
            * u64::from(self.config.bytes_per_sample);
        ((1_000_000 * len as u64 + denom / 2) / denom) as i64
    }
}

impl Encoder for PcmAudioEncoder {
    fn prepare(&mut self) -> EncoderResult<()> {
        PcmAudioEncoder::prepare(self)
    }

    fn state(&self) -> EncoderState {
        self.state
    }

    fn stop(&mut self) {
        PcmAudioEncoder::stop(self)
    }
}

impl Drop for PcmAudioEncoder {
    fn drop(&mut self) {
        self.stop();
    }
}
