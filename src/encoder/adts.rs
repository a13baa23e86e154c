//! ADTS access-unit framing.
//!
//! Each encoded audio access unit is prefixed with a fixed 7-byte ADTS
//! header so a downstream reader can locate frame boundaries without an
//! external index. The 13-bit frame-length field embeds the header itself,
//! which is why the header is computed fresh per unit: payload length varies.
//!
//! Bit layout (MSB-first across the 7 bytes, CRC absent):
//!
//! ```text
//! AAAAAAAA AAAABCCD EEFFFFGH HHIJKLMM MMMMMMMM MMMOOOOO OOOOOOPP
//! A sync word (0xFFF)      B MPEG version        C layer (00)
//! D protection absent (1)  E profile - 1         F frequency index
//! G private bit            H channel config      I original/copy
//! J home                   K copyright id bit    L copyright id start
//! M frame length (13 bits) O buffer fullness hi  P buffer fullness lo
//! ```
//!
//! The trailing buffer-fullness field is pinned to 0x7FF (VBR), so bytes 5-6
//! end in the fixed `...111 11111100` pattern.

use super::error::EncoderError;

/// Size of the framing header prepended to every access unit.
pub const HEADER_LEN: usize = 7;

/// Largest payload whose total frame length fits the 13-bit field.
pub const MAX_PAYLOAD_LEN: usize = (1 << 13) - 1 - HEADER_LEN;

/// AAC LC object type, as written into the profile field (value minus one).
pub const PROFILE_AAC_LC: u8 = 2;

/// The 13 sampling frequencies with a defined ADTS frequency index,
/// in index order.
pub const FREQUENCY_TABLE: [u32; 13] = [
    96_000, 88_200, 64_000, 48_000, 44_100, 32_000, 24_000, 22_050, 16_000, 12_000, 11_025, 8_000,
    7_350,
];

/// Look up the ADTS frequency index for a sample rate.
pub fn frequency_index(sample_rate: u32) -> Option<u8> {
    FREQUENCY_TABLE
        .iter()
        .position(|&rate| rate == sample_rate)
        .map(|idx| idx as u8)
}

/// One decoded (or to-be-encoded) 7-byte framing header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdtsHeader {
    /// Audio object type (1-based; AAC LC = 2).
    pub profile: u8,
    /// Index into [`FREQUENCY_TABLE`].
    pub frequency_index: u8,
    /// Channel configuration (1..=7).
    pub channel_config: u8,
    /// Total frame length: payload bytes + [`HEADER_LEN`].
    pub frame_length: u32,
}

impl AdtsHeader {
    /// Build the header for one access unit.
    ///
    /// Fails with [`EncoderError::UnsupportedSampleRate`] when the rate has
    /// no frequency-table entry, and with
    /// [`EncoderError::UnsupportedConfiguration`] when the channel count
    /// does not fit the 3-bit field or the payload overflows the 13-bit
    /// frame length. An overflow packed anyway would corrupt every
    /// subsequent frame, since readers use the embedded length for framing.
    pub fn for_unit(
        sample_rate: u32,
        channel_count: u32,
        payload_len: usize,
    ) -> Result<Self, EncoderError> {
        let frequency_index =
            frequency_index(sample_rate).ok_or(EncoderError::UnsupportedSampleRate(sample_rate))?;
        if !(1..=7).contains(&channel_count) {
            return Err(EncoderError::UnsupportedConfiguration(format!(
                "channel count {channel_count} does not fit the framing header"
            )));
        }
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(EncoderError::UnsupportedConfiguration(format!(
                "payload of {payload_len} bytes overflows the 13-bit frame length"
            )));
        }
        Ok(Self {
            profile: PROFILE_AAC_LC,
            frequency_index,
            channel_config: channel_count as u8,
            frame_length: (payload_len + HEADER_LEN) as u32,
        })
    }

    /// Pack the header into its 7-byte wire form.
    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let len = self.frame_length;
        let chan = u32::from(self.channel_config);
        [
            0xFF,
            0xF1,
            ((self.profile - 1) << 6) | (self.frequency_index << 2) | (chan >> 2) as u8,
            (((chan & 0x3) << 6) | (len >> 11)) as u8,
            ((len >> 3) & 0xFF) as u8,
            (((len & 0x7) << 5) | 0x1F) as u8,
            0xFC,
        ]
    }

    /// Decode a 7-byte header back into its fields (mask/shift inverse of
    /// [`to_bytes`](Self::to_bytes)).
    ///
    /// Returns `None` when the sync word or fixed trailer bits do not match.
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Option<Self> {
        if bytes[0] != 0xFF || bytes[1] & 0xF6 != 0xF0 {
            return None;
        }
        let profile = (bytes[2] >> 6) + 1;
        let frequency_index = (bytes[2] >> 2) & 0x0F;
        let channel_config = ((bytes[2] & 0x1) << 2) | (bytes[3] >> 6);
        let frame_length = (u32::from(bytes[3] & 0x3) << 11)
            | (u32::from(bytes[4]) << 3)
            | u32::from(bytes[5] >> 5);
        Some(Self {
            profile,
            frequency_index,
            channel_config,
            frame_length,
        })
    }
}
