//! Session state: the reusable zstd compressor and its trained dictionary.

use std::io;

use log::debug;
use zstd::bulk::Compressor;

/// Compression level used for every frame. Higher levels cost speed for
/// almost no gain on filtered residuals.
pub(crate) const COMPRESSION_LEVEL: i32 = 1;

/// Upper bound on the trained dictionary size.
const DICT_CAPACITY: usize = 100_000;

/// Training slices the residual into `height * SAMPLES_PER_ROW` samples.
const SAMPLES_PER_ROW: usize = 8;

/// A zstd dictionary trained on one session's first filtered residual.
///
/// Trained lazily by [`CompressionContext`] and read-only afterwards. The
/// raw bytes are exposed so a receiving session can decode with
/// [`decompress_delta_with_dictionary`](crate::decompress_delta_with_dictionary).
pub struct Dictionary {
    raw: Vec<u8>,
}

impl Dictionary {
    /// Train from a filtered residual, treating it as `height * 8` equal
    /// slices (any remainder is ignored).
    pub(crate) fn train(residual: &[u8], height: usize) -> io::Result<Self> {
        let samples = height * SAMPLES_PER_ROW;
        let sample_size = residual.len() / samples;
        if sample_size == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "residual too small to slice into training samples",
            ));
        }
        let sizes = vec![sample_size; samples];
        let raw = zstd::dict::from_continuous(residual, &sizes, DICT_CAPACITY)?;
        Ok(Dictionary { raw })
    }

    /// The trained dictionary bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

impl std::fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dictionary")
            .field("len", &self.raw.len())
            .finish()
    }
}

/// Mutable per-session encoder state.
///
/// Owns the zstd compression context so repeated frames reuse its internal
/// tables, plus the session dictionary once trained. Not thread-safe; use
/// one context per worker.
pub struct CompressionContext {
    compressor: Compressor<'static>,
    dictionary: Option<Dictionary>,
}

impl CompressionContext {
    /// Create a fresh session with no dictionary.
    pub fn new() -> io::Result<Self> {
        Ok(CompressionContext {
            compressor: Compressor::new(COMPRESSION_LEVEL)?,
            dictionary: None,
        })
    }

    /// The session dictionary, once the first frame has trained it.
    #[must_use]
    pub fn dictionary(&self) -> Option<&Dictionary> {
        self.dictionary.as_ref()
    }

    /// Train the session dictionary on the first frame's residual and load
    /// it into the compressor. Later frames reuse it unchanged. If training
    /// fails (a residual too small to sample, or degenerate content), the
    /// frame is coded stateless and the slot stays empty for a retry.
    pub(crate) fn ensure_dictionary(&mut self, residual: &[u8], height: usize) -> io::Result<()> {
        if self.dictionary.is_some() {
            return Ok(());
        }
        match Dictionary::train(residual, height) {
            Ok(dict) => {
                self.compressor = Compressor::with_dictionary(COMPRESSION_LEVEL, dict.as_bytes())?;
                self.dictionary = Some(dict);
            }
            Err(err) => {
                debug!("dictionary training failed ({err}); compressing stateless");
            }
        }
        Ok(())
    }

    /// Compress one residual into `out`, with the dictionary if present.
    pub(crate) fn compress(&mut self, residual: &[u8], out: &mut [u8]) -> io::Result<usize> {
        self.compressor.compress_to_buffer(residual, out)
    }
}

impl std::fmt::Debug for CompressionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionContext")
            .field("dictionary", &self.dictionary)
            .finish()
    }
}
