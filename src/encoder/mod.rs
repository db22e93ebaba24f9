//! Compression pipeline: filter, entropy-code, frame.
//!
//! Encoding is a two-pass pipeline. The forward filter packs the frame into
//! a residual scratch buffer, then zstd compresses the residual behind an
//! 8-byte container header. Sessions that want dictionary-assisted coding
//! pass a [`CompressionContext`]; the first frame trains the dictionary,
//! every later frame reuses it.

mod context;

pub use context::{CompressionContext, Dictionary};

use thiserror::Error;

use crate::common::{FrameKind, ImageFrame, PixelLayout};
use crate::filter::delta::MAX_OVERFLOW_BYTES;
use crate::filter::{self, PackOutcome};
use crate::header::{FrameHeader, HEADER_SIZE};

/// Errors that can occur while compressing a frame.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EncodeError {
    /// The layout is not one the filter family supports: more than 8 bytes
    /// per pixel, a zero-sized pixel, a mosaic with odd dimensions, or a
    /// delta frame in a geometry the fallback cannot re-pack.
    #[error("unsupported pixel geometry")]
    UnsupportedGeometry,

    /// Width or height is zero or exceeds the 16-bit header field.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Declared width in pixels.
        width: u32,
        /// Declared height in pixels.
        height: u32,
    },

    /// The pixel slice does not match the declared geometry.
    #[error("pixel buffer holds {got} bytes, geometry implies {expected}")]
    InvalidBufferSize {
        /// Byte count implied by width, height and layout.
        expected: usize,
        /// Actual slice length.
        got: usize,
    },

    /// A delta frame's reference must share width, height and layout.
    #[error("reference frame geometry does not match the target")]
    ReferenceMismatch,

    /// The caller-supplied output buffer is smaller than
    /// [`max_compressed_size`].
    #[error("output buffer holds {got} bytes, at least {required} required")]
    OutputTooSmall {
        /// Minimum acceptable buffer size.
        required: usize,
        /// Actual buffer size.
        got: usize,
    },

    /// The entropy coder reported a failure.
    #[error("entropy coder error: {0}")]
    Coder(#[from] std::io::Error),
}

/// What the encoder produced for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameStats {
    /// Total bytes written, header included.
    pub bytes_written: usize,
    /// Whether the frame went out as intra or delta. A delta request can
    /// still produce an intra frame when the overflow budget is exhausted.
    pub kind: FrameKind,
    /// Escape bytes appended by the inter-frame predictor (0 for intra).
    pub overflow_bytes: u32,
}

/// Worst-case compressed size for a frame of the given geometry, header
/// included. Caller-supplied output buffers must be at least this large.
#[must_use]
pub fn max_compressed_size(width: u32, height: u32, layout: PixelLayout) -> usize {
    let byte_count = width as usize * height as usize * layout.bytes_per_pixel();
    HEADER_SIZE + zstd::zstd_safe::compress_bound(byte_count + MAX_OVERFLOW_BYTES)
}

/// Compress a single frame into a fresh buffer.
///
/// With a [`CompressionContext`] the session dictionary is trained on this
/// frame's residual (first use) and applied; without one each frame is
/// coded stateless.
///
/// ```rust
/// use zenpng::ImageFrame;
///
/// let pixels = [40u8, 40, 40, 41, 41, 41];
/// let frame = ImageFrame::linear(2, 1, 3, 1, &pixels);
/// let packed = zenpng::compress(&frame, None)?;
/// let image = zenpng::decompress(&packed)?;
/// assert_eq!(image.pixels, pixels);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn compress(
    frame: &ImageFrame<'_>,
    context: Option<&mut CompressionContext>,
) -> Result<Vec<u8>, EncodeError> {
    validate(frame)?;
    let mut out = vec![0u8; max_compressed_size(frame.width, frame.height, frame.layout)];
    let written = compress_delta_into(None, frame, &mut out, context)?.bytes_written;
    out.truncate(written);
    Ok(out)
}

/// Compress a single frame into a caller-supplied buffer of at least
/// [`max_compressed_size`] bytes. Returns the number of bytes written.
pub fn compress_into(
    frame: &ImageFrame<'_>,
    out: &mut [u8],
    context: Option<&mut CompressionContext>,
) -> Result<usize, EncodeError> {
    Ok(compress_delta_into(None, frame, out, context)?.bytes_written)
}

/// Compress a frame against an optional reference into a fresh buffer.
pub fn compress_delta(
    reference: Option<&ImageFrame<'_>>,
    frame: &ImageFrame<'_>,
    context: Option<&mut CompressionContext>,
) -> Result<(Vec<u8>, FrameStats), EncodeError> {
    validate(frame)?;
    let mut out = vec![0u8; max_compressed_size(frame.width, frame.height, frame.layout)];
    let stats = compress_delta_into(reference, frame, &mut out, context)?;
    out.truncate(stats.bytes_written);
    Ok((out, stats))
}

/// Compress a frame against an optional reference into a caller-supplied
/// buffer.
///
/// `reference` selects the inter-frame predictor; `None` encodes an intra
/// frame. When more than 1000 residual bytes fall outside the signed-byte
/// range, the encoder abandons the delta and re-packs the frame as intra
/// (reflected in the returned [`FrameStats::kind`]).
pub fn compress_delta_into(
    reference: Option<&ImageFrame<'_>>,
    frame: &ImageFrame<'_>,
    out: &mut [u8],
    context: Option<&mut CompressionContext>,
) -> Result<FrameStats, EncodeError> {
    validate(frame)?;
    if let Some(reference) = reference {
        validate(reference)?;
        if !reference.same_geometry(frame) {
            return Err(EncodeError::ReferenceMismatch);
        }
    }

    let required = max_compressed_size(frame.width, frame.height, frame.layout);
    if out.len() < required {
        return Err(EncodeError::OutputTooSmall {
            required,
            got: out.len(),
        });
    }

    let byte_count = frame.byte_count();
    let mut residual = vec![0u8; byte_count + MAX_OVERFLOW_BYTES];
    let outcome = filter::forward(reference, frame, &mut residual)?;

    let (kind, wire_layout, overflow_bytes) = match outcome {
        PackOutcome::Intra => (FrameKind::Intra, frame.layout, 0),
        PackOutcome::Delta { overflow_bytes } => (FrameKind::Delta, frame.layout, overflow_bytes),
        PackOutcome::Fallback => (FrameKind::Intra, PixelLayout::BayerMosaic, 0),
    };

    let residual_len = byte_count + overflow_bytes as usize;
    let payload = &mut out[HEADER_SIZE..];
    let payload_len = match context {
        Some(context) => {
            context.ensure_dictionary(&residual[..byte_count], frame.height as usize)?;
            context.compress(&residual[..residual_len], payload)?
        }
        None => zstd::bulk::compress_to_buffer(
            &residual[..residual_len],
            payload,
            context::COMPRESSION_LEVEL,
        )?,
    };

    FrameHeader {
        kind,
        width: frame.width as u16,
        height: frame.height as u16,
        layout: wire_layout,
    }
    .write_to(&mut out[..HEADER_SIZE]);

    Ok(FrameStats {
        bytes_written: HEADER_SIZE + payload_len,
        kind,
        overflow_bytes,
    })
}

fn validate(frame: &ImageFrame<'_>) -> Result<(), EncodeError> {
    if frame.width == 0
        || frame.height == 0
        || frame.width > u16::MAX as u32
        || frame.height > u16::MAX as u32
    {
        return Err(EncodeError::InvalidDimensions {
            width: frame.width,
            height: frame.height,
        });
    }
    let expected = frame.byte_count();
    if frame.pixels.len() != expected {
        return Err(EncodeError::InvalidBufferSize {
            expected,
            got: frame.pixels.len(),
        });
    }
    Ok(())
}
