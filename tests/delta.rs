//! Delta (inter-frame) roundtrip tests: escape handling, fallback, and
//! dictionary sessions.

use zenpng::{
    CompressionContext, DecodeError, EncodeError, FrameKind, ImageFrame, PixelLayout,
};

fn deterministic_noise(len: usize, mut seed: u64) -> Vec<u8> {
    let mut out = vec![0u8; len];
    for b in out.iter_mut() {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        *b = (seed >> 33) as u8;
    }
    out
}

/// Encode `target` against `reference`, decode, verify equality, and return
/// the encoder's stats.
fn assert_delta_roundtrip(
    reference: &ImageFrame<'_>,
    target: &ImageFrame<'_>,
) -> zenpng::FrameStats {
    let (packed, stats) =
        zenpng::compress_delta(Some(reference), target, None).expect("delta encode failed");
    assert_eq!(stats.bytes_written, packed.len());
    let image = zenpng::decompress_delta(Some(reference), &packed).expect("delta decode failed");
    assert_eq!(image.pixels, target.pixels, "pixel mismatch after roundtrip");
    assert_eq!(image.is_intra, stats.kind == FrameKind::Intra);
    stats
}

#[test]
fn identical_frames_make_empty_delta() {
    let pixels = deterministic_noise(40 * 30 * 3, 1);
    let frame = ImageFrame::linear(40, 30, 3, 1, &pixels);
    let stats = assert_delta_roundtrip(&frame, &frame);
    assert_eq!(stats.kind, FrameKind::Delta);
    assert_eq!(stats.overflow_bytes, 0);
}

#[test]
fn delta_magic_on_wire() {
    let pixels = vec![9u8; 8 * 8];
    let frame = ImageFrame::linear(8, 8, 1, 1, &pixels);
    let (packed, _) = zenpng::compress_delta(Some(&frame), &frame, None).unwrap();
    assert_eq!(&packed[..2], &[0xFB, 0xF8]);
}

#[test]
fn small_differences_roundtrip() {
    let reference_px = deterministic_noise(64 * 64 * 2, 2);
    let mut target_px = reference_px.clone();
    for (i, b) in target_px.iter_mut().enumerate() {
        *b = b.wrapping_add((i % 40) as u8);
    }
    let reference = ImageFrame::linear(64, 64, 2, 1, &reference_px);
    let target = ImageFrame::linear(64, 64, 2, 1, &target_px);
    let stats = assert_delta_roundtrip(&reference, &target);
    assert_eq!(stats.kind, FrameKind::Delta);
    assert_eq!(stats.overflow_bytes, 0);
}

#[test]
fn single_escape_byte() {
    let reference_px = vec![0u8; 10 * 10];
    let mut target_px = vec![0u8; 10 * 10];
    target_px[37] = 200;
    let reference = ImageFrame::linear(10, 10, 1, 1, &reference_px);
    let target = ImageFrame::linear(10, 10, 1, 1, &target_px);
    let stats = assert_delta_roundtrip(&reference, &target);
    assert_eq!(stats.kind, FrameKind::Delta);
    assert_eq!(stats.overflow_bytes, 1);
}

#[test]
fn minus_128_difference_survives() {
    // A difference of exactly -128 would read back as the escape marker if
    // stored inline; it must ride the overflow tail instead.
    let reference_px = vec![128u8; 4 * 4];
    let target_px = vec![0u8; 4 * 4];
    let reference = ImageFrame::linear(4, 4, 1, 1, &reference_px);
    let target = ImageFrame::linear(4, 4, 1, 1, &target_px);
    let stats = assert_delta_roundtrip(&reference, &target);
    assert_eq!(stats.overflow_bytes, 16);
}

#[test]
fn full_range_boundaries_stay_inline() {
    let reference_px = vec![127u8, 0, 255, 128];
    let target_px = vec![0u8, 127, 128, 255];
    let reference = ImageFrame::linear(4, 1, 1, 1, &reference_px);
    let target = ImageFrame::linear(4, 1, 1, 1, &target_px);
    let stats = assert_delta_roundtrip(&reference, &target);
    assert_eq!(stats.overflow_bytes, 0);
}

#[test]
fn frame_chain_through_decoded_references() {
    let (w, h) = (32u32, 32u32);
    let mut previous = deterministic_noise((w * h) as usize, 3);
    let mut reference_image = zenpng::compress(&ImageFrame::linear(w, h, 1, 1, &previous), None)
        .map(|p| zenpng::decompress(&p).unwrap())
        .unwrap();

    for step in 0..4u8 {
        let mut next = previous.clone();
        for b in next.iter_mut() {
            *b = b.wrapping_add(step);
        }
        let target = ImageFrame::linear(w, h, 1, 1, &next);
        let (packed, stats) =
            zenpng::compress_delta(Some(&reference_image.as_frame()), &target, None).unwrap();
        assert_eq!(stats.kind, FrameKind::Delta);
        reference_image =
            zenpng::decompress_delta(Some(&reference_image.as_frame()), &packed).unwrap();
        assert_eq!(reference_image.pixels, next);
        previous = next;
    }
}

// --- Overflow budget fallback ---

#[test]
fn budget_exhaustion_falls_back_to_intra() {
    // Every byte differs by 255, so the escape budget dies immediately and
    // the frame is re-packed with the mosaic intra kernel.
    let reference_px = vec![0u8; 64 * 64];
    let target_px = vec![255u8; 64 * 64];
    let reference = ImageFrame::linear(64, 64, 1, 1, &reference_px);
    let target = ImageFrame::linear(64, 64, 1, 1, &target_px);

    let (packed, stats) = zenpng::compress_delta(Some(&reference), &target, None).unwrap();
    assert_eq!(stats.kind, FrameKind::Intra);
    assert_eq!(stats.overflow_bytes, 0);
    // Intra magic on the wire, mosaic sentinel in the header.
    assert_eq!(&packed[..2], &[0xF8, 0xFB]);
    assert!(packed[7] > 8);

    // Decoding "with the wrong assumption" is corrected by the magic: the
    // reference is ignored and the frame decodes on its own.
    let image = zenpng::decompress_delta(Some(&reference), &packed).unwrap();
    assert!(image.is_intra);
    assert_eq!(image.pixels, target_px);

    let standalone = zenpng::decompress(&packed).unwrap();
    assert_eq!(standalone.pixels, target_px);
}

#[test]
fn fallback_needs_mosaic_safe_geometry() {
    // Three bytes per pixel cannot be re-packed by the mosaic kernel.
    let reference_px = vec![0u8; 40 * 40 * 3];
    let target_px = vec![255u8; 40 * 40 * 3];
    let reference = ImageFrame::linear(40, 40, 3, 1, &reference_px);
    let target = ImageFrame::linear(40, 40, 3, 1, &target_px);
    let err = zenpng::compress_delta(Some(&reference), &target, None).unwrap_err();
    assert!(matches!(err, EncodeError::UnsupportedGeometry));
}

// --- Reference policing ---

#[test]
fn delta_frame_requires_reference_to_decode() {
    let pixels = deterministic_noise(16 * 16, 4);
    let frame = ImageFrame::linear(16, 16, 1, 1, &pixels);
    let (packed, _) = zenpng::compress_delta(Some(&frame), &frame, None).unwrap();

    assert!(matches!(
        zenpng::decompress(&packed),
        Err(DecodeError::MissingReference)
    ));
    assert!(matches!(
        zenpng::decompress_delta(None, &packed),
        Err(DecodeError::MissingReference)
    ));
}

#[test]
fn mismatched_reference_is_rejected() {
    let a = deterministic_noise(16 * 16, 5);
    let b = deterministic_noise(8 * 8, 6);
    let target = ImageFrame::linear(16, 16, 1, 1, &a);
    let small = ImageFrame::linear(8, 8, 1, 1, &b);

    assert!(matches!(
        zenpng::compress_delta(Some(&small), &target, None),
        Err(EncodeError::ReferenceMismatch)
    ));

    let (packed, _) = zenpng::compress_delta(Some(&target), &target, None).unwrap();
    assert!(matches!(
        zenpng::decompress_delta(Some(&small), &packed),
        Err(DecodeError::ReferenceMismatch)
    ));
}

#[test]
fn mosaic_frames_cannot_be_delta_coded() {
    let pixels = deterministic_noise(16 * 16, 7);
    let frame = ImageFrame::bayer(16, 16, &pixels);
    let err = zenpng::compress_delta(Some(&frame), &frame, None).unwrap_err();
    assert!(matches!(err, EncodeError::UnsupportedGeometry));
}

// --- Dictionary sessions ---

#[test]
fn dictionary_trains_once_and_roundtrips() {
    // Rows repeat, so the filtered residual is highly structured and easy
    // to train on.
    let (w, h) = (512u32, 128u32);
    let base: Vec<u8> = (0..w * h)
        .map(|i| ((i % 64) as u8).wrapping_add((i / 8192) as u8))
        .collect();
    let frame = ImageFrame::linear(w, h, 1, 1, &base);

    let mut ctx = CompressionContext::new().unwrap();
    let first = zenpng::compress(&frame, Some(&mut ctx)).unwrap();
    let dict_len = {
        let dict = ctx.dictionary().expect("dictionary not trained");
        assert!(!dict.as_bytes().is_empty());
        assert!(dict.as_bytes().len() <= 100_000);
        dict.as_bytes().len()
    };

    // Second frame reuses the same dictionary.
    let mut shifted = base.clone();
    for b in shifted.iter_mut() {
        *b = b.wrapping_add(3);
    }
    let second_frame = ImageFrame::linear(w, h, 1, 1, &shifted);
    let (second, stats) =
        zenpng::compress_delta(Some(&frame), &second_frame, Some(&mut ctx)).unwrap();
    assert_eq!(stats.kind, FrameKind::Delta);
    assert_eq!(ctx.dictionary().unwrap().as_bytes().len(), dict_len);

    // Dictionary-coded payloads need the dictionary back.
    let dict = ctx.dictionary().unwrap();
    let image = zenpng::decompress_delta_with_dictionary(None, &first, dict).unwrap();
    assert_eq!(image.pixels, base);
    let image =
        zenpng::decompress_delta_with_dictionary(Some(&frame), &second, dict).unwrap();
    assert_eq!(image.pixels, shifted);

    // Without it, zstd refuses the frame.
    assert!(matches!(
        zenpng::decompress(&first),
        Err(DecodeError::Coder(_))
    ));
}

#[test]
fn layout_survives_delta_roundtrip() {
    let pixels = deterministic_noise(20 * 10 * 4, 8);
    let frame = ImageFrame::linear(20, 10, 4, 1, &pixels);
    let (packed, _) = zenpng::compress_delta(Some(&frame), &frame, None).unwrap();
    let image = zenpng::decompress_delta(Some(&frame), &packed).unwrap();
    assert_eq!(
        image.layout,
        PixelLayout::Linear {
            channels: 4,
            bytes_per_channel: 1
        }
    );
    assert!(!image.is_intra);
}
