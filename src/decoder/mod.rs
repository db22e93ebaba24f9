//! Decompression pipeline: parse, entropy-decode, unfilter.
//!
//! The 8-byte header names the frame geometry and, through its magic,
//! whether an inverse delta step is required. The zstd payload is expanded
//! into a zero-filled residual scratch (short payloads therefore read as
//! zeros), then the inverse kernel matching the header reconstructs the
//! pixels.

use thiserror::Error;
use zstd::bulk::Decompressor;

use crate::common::{DecodedImage, FrameKind, ImageFrame};
use crate::encoder::Dictionary;
use crate::filter;
use crate::filter::delta::MAX_OVERFLOW_BYTES;
use crate::header::{FrameHeader, HEADER_SIZE};

/// Errors that can occur while decompressing a frame.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// Input is shorter than the container header.
    #[error("input shorter than the frame header")]
    TruncatedInput,

    /// The magic matches neither the intra nor the delta constant.
    #[error("unrecognized frame magic {0:#06x}")]
    BadMagic(u16),

    /// The header says delta but no reference frame was supplied.
    #[error("delta frame requires a reference")]
    MissingReference,

    /// The header describes a geometry the filter family cannot invert.
    #[error("unsupported pixel geometry in header")]
    UnsupportedGeometry,

    /// The supplied reference does not match the header's geometry.
    #[error("reference frame geometry does not match the header")]
    ReferenceMismatch,

    /// The entropy coder reported a failure.
    #[error("entropy coder error: {0}")]
    Coder(#[from] std::io::Error),
}

/// Decompress an intra frame.
///
/// Fails with [`DecodeError::MissingReference`] if the payload turns out to
/// be a delta frame; use [`decompress_delta`] for video streams.
pub fn decompress(data: &[u8]) -> Result<DecodedImage, DecodeError> {
    decode(None, data, None)
}

/// Decompress a frame that may be delta-coded against `reference`.
///
/// The container magic decides: an intra frame decodes on its own even if a
/// reference is supplied, a delta frame reconstructs against the reference.
pub fn decompress_delta(
    reference: Option<&ImageFrame<'_>>,
    data: &[u8],
) -> Result<DecodedImage, DecodeError> {
    decode(reference, data, None)
}

/// Like [`decompress_delta`], for payloads compressed by a session that
/// trained a [`Dictionary`]. The same dictionary must be supplied here; the
/// container does not carry it.
pub fn decompress_delta_with_dictionary(
    reference: Option<&ImageFrame<'_>>,
    data: &[u8],
    dictionary: &Dictionary,
) -> Result<DecodedImage, DecodeError> {
    decode(reference, data, Some(dictionary))
}

fn decode(
    reference: Option<&ImageFrame<'_>>,
    data: &[u8],
    dictionary: Option<&Dictionary>,
) -> Result<DecodedImage, DecodeError> {
    let header = FrameHeader::parse(data)?;
    let width = header.width as usize;
    let height = header.height as usize;
    let byte_count = width * height * header.layout.bytes_per_pixel();

    if header.kind == FrameKind::Delta {
        let Some(reference) = reference else {
            return Err(DecodeError::MissingReference);
        };
        if reference.width != header.width as u32
            || reference.height != header.height as u32
            || reference.layout != header.layout
            || reference.pixels.len() != byte_count
        {
            return Err(DecodeError::ReferenceMismatch);
        }
    }

    let mut residual = vec![0u8; byte_count + MAX_OVERFLOW_BYTES];
    let mut decompressor = match dictionary {
        Some(dictionary) => Decompressor::with_dictionary(dictionary.as_bytes())?,
        None => Decompressor::new()?,
    };
    decompressor.decompress_to_buffer(&data[HEADER_SIZE..], &mut residual[..])?;

    let mut pixels = vec![0u8; byte_count];
    filter::inverse(
        header.kind,
        header.layout,
        width,
        height,
        reference,
        &residual,
        &mut pixels,
    )?;

    Ok(DecodedImage {
        width: header.width as u32,
        height: header.height as u32,
        layout: header.layout,
        is_intra: header.kind == FrameKind::Intra,
        pixels,
    })
}
