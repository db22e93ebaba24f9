//! Lossless compression for raw pixel frames.
//!
//! zenpng turns 8- or 16-bit-per-channel pixel buffers (1 to 8 bytes per
//! pixel) into a compact stream that round-trips exactly. A family of
//! channel-aware spatial filters first converts correlated pixels into
//! low-entropy residuals; zstd then codes the residual behind a small
//! self-describing header. Frames of a short video can additionally be
//! coded as byte-wise deltas against the previous frame.
//!
//! # Encoding
//!
//! ```rust
//! use zenpng::ImageFrame;
//!
//! let pixels = vec![128u8; 64 * 64 * 3];
//! let frame = ImageFrame::linear(64, 64, 3, 1, &pixels);
//! let packed = zenpng::compress(&frame, None)?;
//! assert!(packed.len() < pixels.len());
//! # Ok::<(), zenpng::EncodeError>(())
//! ```
//!
//! Repeated frames compress better through a session context, which trains
//! a zstd dictionary on the first frame's residual and reuses it:
//!
//! ```rust
//! use zenpng::{CompressionContext, ImageFrame};
//!
//! let mut ctx = CompressionContext::new()?;
//! let pixels = vec![0u8; 32 * 32];
//! let frame = ImageFrame::linear(32, 32, 1, 1, &pixels);
//! let first = zenpng::compress(&frame, Some(&mut ctx))?;
//! let second = zenpng::compress(&frame, Some(&mut ctx))?;
//! # let _ = (first, second);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Decoding
//!
//! ```rust
//! # let pixels = vec![7u8; 4 * 4];
//! # let frame = zenpng::ImageFrame::linear(4, 4, 1, 1, &pixels);
//! # let packed = zenpng::compress(&frame, None)?;
//! let image = zenpng::decompress(&packed)?;
//! assert!(image.is_intra);
//! assert_eq!(image.pixels, pixels);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Video decoding mirrors encoding: [`decompress_delta`] consults the
//! container magic and applies the inverse delta only when the frame was
//! actually coded against a reference.
//!
//! # Bayer mosaics
//!
//! Sensor data in a 2x2 color-filter-array layout gets a dedicated planar
//! filter; declare it with [`PixelLayout::BayerMosaic`] (or the
//! [`ImageFrame::bayer`] shorthand). Width and height must be even.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod common;
/// Decompression pipeline and its error type.
pub mod decoder;
/// Compression pipeline, session context, and dictionary training.
pub mod encoder;
mod filter;
mod header;

pub use common::{DecodedImage, FrameKind, ImageFrame, PixelLayout};
pub use decoder::{
    decompress, decompress_delta, decompress_delta_with_dictionary, DecodeError,
};
pub use encoder::{
    compress, compress_delta, compress_delta_into, compress_into, max_compressed_size,
    CompressionContext, Dictionary, EncodeError, FrameStats,
};
pub use header::HEADER_SIZE;
