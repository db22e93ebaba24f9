//! Reversible pre-filters and their dispatch.
//!
//! The filter stage turns correlated pixel data into a low-entropy residual
//! stream; every forward kernel has an exact inverse. Which kernel runs is
//! decided by the frame layout, the bytes-per-pixel count, and whether a
//! reference frame is present:
//!
//! | reference | layout       | bytes/pixel | kernel                    |
//! |-----------|--------------|-------------|---------------------------|
//! | no        | Bayer mosaic | 1           | XGGY planar ([`bayer`])   |
//! | no        | linear       | 3, 4        | color planar ([`color`])  |
//! | no        | linear       | 1,2,5..=8   | per-lane ([`spatial`])    |
//! | yes       | linear       | 1..=8       | inter-frame ([`delta`])   |
//! | yes       | Bayer mosaic | -           | rejected                  |
//!
//! The decoder dispatches symmetrically, keyed on the container magic and
//! the layout recovered from the header.

pub(crate) mod bayer;
pub(crate) mod color;
pub(crate) mod delta;
pub(crate) mod spatial;

use crate::common::{FrameKind, ImageFrame, PixelLayout};
use crate::decoder::DecodeError;
use crate::encoder::EncodeError;

/// Result of the forward filter pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PackOutcome {
    /// An intra kernel ran; residual length equals the frame's byte count.
    Intra,
    /// The inter-frame kernel ran; `overflow_bytes` tail bytes follow the
    /// main residual.
    Delta {
        /// Number of escape bytes appended to the overflow tail.
        overflow_bytes: u32,
    },
    /// The inter-frame overflow budget was exhausted and the frame was
    /// re-packed with the XGGY intra kernel instead. The container header
    /// must carry the intra magic and the mosaic layout so the decoder
    /// picks the matching inverse.
    Fallback,
}

/// Run the forward kernel selected by geometry and reference presence.
///
/// `residual` must hold `frame.byte_count() + delta::MAX_OVERFLOW_BYTES`
/// bytes and be zero-filled by the caller.
pub(crate) fn forward(
    reference: Option<&ImageFrame<'_>>,
    frame: &ImageFrame<'_>,
    residual: &mut [u8],
) -> Result<PackOutcome, EncodeError> {
    let width = frame.width as usize;
    let height = frame.height as usize;

    match (reference, frame.layout) {
        (Some(_), PixelLayout::BayerMosaic) => Err(EncodeError::UnsupportedGeometry),
        (Some(reference), PixelLayout::Linear { .. }) => {
            require_linear(frame.layout)?;
            match delta::filter(frame.pixels, reference.pixels, residual) {
                Some(overflow_bytes) => Ok(PackOutcome::Delta { overflow_bytes }),
                None => {
                    // Too many escapes: code the frame on its own. The XGGY
                    // kernel walks exactly width * height bytes, so only
                    // single-byte-pixel frames with even dimensions survive
                    // the switch losslessly.
                    require_mosaic_geometry(width, height)?;
                    if frame.layout.bytes_per_pixel() != 1 {
                        return Err(EncodeError::UnsupportedGeometry);
                    }
                    bayer::filter_xggy(frame.pixels, width, height, residual);
                    Ok(PackOutcome::Fallback)
                }
            }
        }
        (None, PixelLayout::BayerMosaic) => {
            require_mosaic_geometry(width, height)?;
            bayer::filter_xggy(frame.pixels, width, height, residual);
            Ok(PackOutcome::Intra)
        }
        (None, layout @ PixelLayout::Linear { .. }) => {
            match require_linear(layout)? {
                1 => spatial::filter::<1>(frame.pixels, width, residual),
                2 => spatial::filter::<2>(frame.pixels, width, residual),
                3 => color::filter_rgb(frame.pixels, width, height, residual),
                4 => color::filter_rgba(frame.pixels, width, height, residual),
                5 => spatial::filter::<5>(frame.pixels, width, residual),
                6 => spatial::filter::<6>(frame.pixels, width, residual),
                7 => spatial::filter::<7>(frame.pixels, width, residual),
                _ => spatial::filter::<8>(frame.pixels, width, residual),
            }
            Ok(PackOutcome::Intra)
        }
    }
}

/// Run the inverse kernel for a decoded residual.
///
/// For delta frames the overflow tail starts at `pixels.len()` inside
/// `residual`. The caller guarantees `reference` is present and of matching
/// geometry whenever `kind` is [`FrameKind::Delta`].
pub(crate) fn inverse(
    kind: FrameKind,
    layout: PixelLayout,
    width: usize,
    height: usize,
    reference: Option<&ImageFrame<'_>>,
    residual: &[u8],
    pixels: &mut [u8],
) -> Result<(), DecodeError> {
    match (kind, reference) {
        (FrameKind::Delta, Some(reference)) => match layout {
            PixelLayout::Linear { .. } if require_linear(layout).is_ok() => {
                delta::unfilter(residual, reference.pixels, pixels);
                Ok(())
            }
            _ => Err(DecodeError::UnsupportedGeometry),
        },
        (FrameKind::Delta, None) => Err(DecodeError::MissingReference),
        (FrameKind::Intra, _) => match layout {
            PixelLayout::BayerMosaic => {
                if require_mosaic_geometry(width, height).is_err() {
                    return Err(DecodeError::UnsupportedGeometry);
                }
                bayer::unfilter_xggy(residual, width, height, pixels);
                Ok(())
            }
            layout @ PixelLayout::Linear { .. } => {
                let Ok(bpp) = require_linear(layout) else {
                    return Err(DecodeError::UnsupportedGeometry);
                };
                match bpp {
                    1 => spatial::unfilter::<1>(residual, width, pixels),
                    2 => spatial::unfilter::<2>(residual, width, pixels),
                    3 => color::unfilter_rgb(residual, width, height, pixels),
                    4 => color::unfilter_rgba(residual, width, height, pixels),
                    5 => spatial::unfilter::<5>(residual, width, pixels),
                    6 => spatial::unfilter::<6>(residual, width, pixels),
                    7 => spatial::unfilter::<7>(residual, width, pixels),
                    _ => spatial::unfilter::<8>(residual, width, pixels),
                }
                Ok(())
            }
        },
    }
}

/// Returns the bytes-per-pixel count of a supported linear layout.
fn require_linear(layout: PixelLayout) -> Result<usize, EncodeError> {
    let bpp = layout.bytes_per_pixel();
    if (1..=8).contains(&bpp) {
        Ok(bpp)
    } else {
        Err(EncodeError::UnsupportedGeometry)
    }
}

/// The XGGY kernel walks samples in 2x2 tiles; odd dimensions would run
/// past row ends.
fn require_mosaic_geometry(width: usize, height: usize) -> Result<(), EncodeError> {
    if width.is_multiple_of(2) && height.is_multiple_of(2) {
        Ok(())
    } else {
        Err(EncodeError::UnsupportedGeometry)
    }
}
