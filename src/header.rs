//! The fixed 8-byte container header.
//!
//! Every compressed frame starts with this header; the entropy coder's
//! payload follows immediately. All multi-byte fields are little-endian.
//!
//! ```text
//! Offset | Size | Field
//! -------|------|----------------------------------------------
//! 0      | 2    | magic (0xFBF8 intra, 0xF8FB delta)
//! 2      | 2    | width in pixels
//! 4      | 2    | height in pixels
//! 6      | 1    | channels
//! 7      | 1    | bytes per channel (values > 8 mean Bayer mosaic)
//! ```

use byteorder_lite::{ByteOrder, LittleEndian};

use crate::common::{FrameKind, PixelLayout};
use crate::decoder::DecodeError;

/// Magic identifying an intra frame.
pub(crate) const MAGIC_INTRA: u16 = 0xFBF8;
/// Magic identifying a delta frame.
pub(crate) const MAGIC_DELTA: u16 = 0xF8FB;

/// Wire value written into the bytes-per-channel field for Bayer frames.
/// Any value above 8 is accepted on parse.
const BAYER_WIRE_BPC: u8 = 0xFF;

/// Size of the container header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Parsed form of the container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameHeader {
    pub kind: FrameKind,
    pub width: u16,
    pub height: u16,
    pub layout: PixelLayout,
}

impl FrameHeader {
    pub(crate) fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < HEADER_SIZE {
            return Err(DecodeError::TruncatedInput);
        }
        let magic = LittleEndian::read_u16(&data[0..2]);
        let kind = match magic {
            MAGIC_INTRA => FrameKind::Intra,
            MAGIC_DELTA => FrameKind::Delta,
            other => return Err(DecodeError::BadMagic(other)),
        };
        let channels = data[6];
        let bytes_per_channel = data[7];
        let layout = if bytes_per_channel > 8 {
            PixelLayout::BayerMosaic
        } else {
            PixelLayout::Linear {
                channels,
                bytes_per_channel,
            }
        };
        Ok(FrameHeader {
            kind,
            width: LittleEndian::read_u16(&data[2..4]),
            height: LittleEndian::read_u16(&data[4..6]),
            layout,
        })
    }

    pub(crate) fn write_to(&self, out: &mut [u8]) {
        let magic = match self.kind {
            FrameKind::Intra => MAGIC_INTRA,
            FrameKind::Delta => MAGIC_DELTA,
        };
        let (channels, bytes_per_channel) = match self.layout {
            PixelLayout::Linear {
                channels,
                bytes_per_channel,
            } => (channels, bytes_per_channel),
            PixelLayout::BayerMosaic => (1, BAYER_WIRE_BPC),
        };
        LittleEndian::write_u16(&mut out[0..2], magic);
        LittleEndian::write_u16(&mut out[2..4], self.width);
        LittleEndian::write_u16(&mut out[4..6], self.height);
        out[6] = channels;
        out[7] = bytes_per_channel;
    }
}
