#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests for PVR/PVRZ import and export
//!
//! Exercises the full path through files on disk, the compressed wrapper
//! form, header rejection and the failure guarantees of import.

use std::fs::File;

use ietools_buffers::{ByteBuffer, CompressionLevel, ErrorKind};
use ietools_pvrz::{
    ColorSpace, EncodeOptions, PixelFormat, PvrTexture, PvrzError, Quality, Rect,
};
use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;

const TOLERANCE: u8 = 24;

/// One solid color per 4x4 block
fn tiles(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x / 4 * 60) as u8, (y / 4 * 60) as u8, 128, 255])
    })
}

fn assert_close(actual: &RgbaImage, expected: &RgbaImage) {
    assert_eq!(actual.dimensions(), expected.dimensions());
    for (x, y, want) in expected.enumerate_pixels() {
        let got = actual.get_pixel(x, y);
        for c in 0..4 {
            assert!(
                got[c].abs_diff(want[c]) <= TOLERANCE,
                "pixel ({x}, {y}) channel {c}: got {got:?}, want {want:?}"
            );
        }
    }
}

/// Build an uncompressed PVR with a valid BC1 8x8 texture
fn sample_pvr() -> Vec<u8> {
    let mut texture = PvrTexture::new(8, 8, PixelFormat::Bc1);
    texture.set_image(&tiles(8, 8)).unwrap();
    texture.to_bytes(false).unwrap()
}

// --- Round trips ---

#[test]
fn bc1_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("MOS1000.PVR");

    let source = tiles(8, 8);
    let mut texture = PvrTexture::new(8, 8, PixelFormat::Bc1);
    texture.set_image(&source).unwrap();
    texture.save(File::create(&path).unwrap(), false).unwrap();

    let reloaded = PvrTexture::load(File::open(&path).unwrap()).unwrap();
    assert_eq!((reloaded.width(), reloaded.height()), (8, 8));
    assert_eq!(reloaded.pixel_format(), PixelFormat::Bc1);
    assert_close(&reloaded.image(), &source);
}

#[test]
fn pvrz_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("MOS1000.PVRZ");

    let source = tiles(16, 8);
    let options = EncodeOptions::new()
        .with_quality(Quality::High)
        .with_perceptual_metric(true)
        .with_compression_level(CompressionLevel::Level(6));
    let mut texture = PvrTexture::new(1, 1, PixelFormat::Bc3).with_options(options);
    texture.set_image(&source).unwrap();
    texture.save(File::create(&path).unwrap(), true).unwrap();

    let raw = std::fs::read(&path).unwrap();
    assert_ne!(&raw[0..4], b"PVR\x03");

    let reloaded = PvrTexture::load(File::open(&path).unwrap()).unwrap();
    assert_eq!(reloaded.pixel_format(), PixelFormat::Bc3);
    assert_close(&reloaded.image(), &source);
}

#[test]
fn every_format_survives_export() {
    for format in [PixelFormat::Bc1, PixelFormat::Bc2, PixelFormat::Bc3] {
        for compressed in [false, true] {
            let mut texture = PvrTexture::new(16, 16, format);
            texture
                .fill_image_rect(Rect::new(0, 0, 8, 16), Rgba([255, 255, 255, 255]))
                .unwrap();
            texture
                .fill_image_rect(Rect::new(8, 0, 8, 16), Rgba([0, 0, 0, 255]))
                .unwrap();
            let bytes = texture.to_bytes(compressed).unwrap();

            let reloaded = PvrTexture::from_bytes(bytes).unwrap();
            assert_eq!(reloaded.pixel_format(), format);
            assert_close(&reloaded.image(), &texture.image());
        }
    }
}

#[test]
fn wrapper_is_size_prefixed_zlib() {
    let mut texture = PvrTexture::from_bytes(sample_pvr()).unwrap();
    let pvr = texture.to_bytes(false).unwrap();
    let pvrz = texture.to_bytes(true).unwrap();

    let declared = u32::from_le_bytes(pvrz[0..4].try_into().unwrap()) as usize;
    assert_eq!(declared, pvr.len());

    let mut buf = ByteBuffer::wrap(pvrz.clone());
    let unpacked = buf.decompress_replace(4, pvrz.len() - 4).unwrap();
    assert_eq!(unpacked, pvr.len());
    assert_eq!(&buf.as_bytes()[4..], pvr.as_slice());
}

#[test]
fn wrapper_trailing_bytes_are_dropped() {
    let pvr = sample_pvr();
    let mut padded = pvr.clone();
    padded.extend_from_slice(&[0xEE; 16]);

    let mut buf = ByteBuffer::wrap(padded);
    let len = buf.buffer_length();
    buf.compress_replace(0, len, CompressionLevel::Default).unwrap();
    buf.insert_bytes(0, 4).unwrap();
    buf.put_u32(0, pvr.len() as u32).unwrap();

    let texture = PvrTexture::from_bytes(buf.into_inner()).unwrap();
    assert_eq!((texture.width(), texture.height()), (8, 8));
}

#[test]
fn wrapper_inflation_stops_at_declared_size() {
    let pvr = sample_pvr();
    let mut padded = pvr.clone();
    padded.resize(pvr.len() + (8 << 20), 0);

    let mut buf = ByteBuffer::wrap(padded);
    let len = buf.buffer_length();
    buf.compress_replace(0, len, CompressionLevel::BEST).unwrap();
    buf.insert_bytes(0, 4).unwrap();
    buf.put_u32(0, pvr.len() as u32).unwrap();

    let mut texture = PvrTexture::from_bytes(buf.into_inner()).unwrap();
    assert_eq!((texture.width(), texture.height()), (8, 8));
    assert_eq!(texture.to_bytes(false).unwrap().len(), pvr.len());
}

// --- Rejection ---

#[test]
fn declared_size_out_of_range_leaves_state() {
    for declared in [-1i32, 0x33, (1 << 25) + 1, i32::MIN] {
        let mut texture = PvrTexture::new(4, 4, PixelFormat::Bc2);
        texture.set_color_space(ColorSpace::Srgb).unwrap();
        texture
            .fill_image_rect(Rect::from_size(4, 4), Rgba([1, 2, 3, 4]))
            .unwrap();
        let before = texture.image();

        let mut data = declared.to_le_bytes().to_vec();
        data.extend_from_slice(&[0u8; 64]);
        let err = texture.import(data).unwrap_err();

        assert_eq!(err, PvrzError::DeclaredSizeOutOfRange(declared));
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(texture.width(), 0);

        texture.clear_error();
        assert_eq!(texture.pixel_format(), PixelFormat::Bc2);
        assert_eq!(texture.color_space(), ColorSpace::Srgb);
        assert_eq!(texture.image(), before);
    }
}

#[test]
fn mipmap_count_other_than_one_is_rejected() {
    let mut pvr = ByteBuffer::wrap(sample_pvr());
    pvr.put_u32(0x2c, 3).unwrap();

    let mut texture = PvrTexture::new(4, 4, PixelFormat::Bc3);
    let err = texture.import(pvr.into_inner()).unwrap_err();
    assert!(matches!(
        err,
        PvrzError::UnsupportedLayout {
            field: "mip maps",
            value: 3
        }
    ));
    assert!(err.is_format_error());
    texture.clear_error();
    assert_eq!((texture.width(), texture.height()), (4, 4));
    assert_eq!(texture.pixel_format(), PixelFormat::Bc3);
}

#[test]
fn truncated_payload_is_rejected() {
    let mut pvr = sample_pvr();
    pvr.truncate(pvr.len() - 1);
    let err = PvrTexture::from_bytes(pvr).unwrap_err();
    assert!(matches!(err, PvrzError::BufferTooSmall { .. }));
}

#[test]
fn short_decompressed_data_is_rejected() {
    let pvr = sample_pvr();
    let mut buf = ByteBuffer::wrap(pvr.clone());
    let len = buf.buffer_length();
    buf.compress_replace(0, len, CompressionLevel::BEST).unwrap();
    buf.insert_bytes(0, 4).unwrap();
    buf.put_u32(0, (pvr.len() + 10) as u32).unwrap();

    let err = PvrTexture::from_bytes(buf.into_inner()).unwrap_err();
    assert_eq!(
        err,
        PvrzError::SizeMismatch {
            declared: pvr.len() + 10,
            actual: pvr.len()
        }
    );
}

#[test]
fn tiny_input_is_a_format_error() {
    for data in [
        vec![],
        vec![0x50, 0x56, 0x52],
        0x40u32.to_le_bytes().to_vec(),
    ] {
        let err = PvrTexture::from_bytes(data).unwrap_err();
        assert!(err.is_format_error(), "{err}");
    }
}

// --- Dirty tracking of the underlying buffer ---

#[test]
fn buffer_dirty_flag_follows_content() {
    let mut buf = ByteBuffer::load(sample_pvr().as_slice()).unwrap();
    assert!(!buf.is_modified());

    let width = buf.get_u32(0x1c).unwrap();
    buf.put_u32(0x1c, width).unwrap();
    assert!(!buf.is_modified());

    buf.put_u32(0x04, 2).unwrap();
    assert!(buf.is_modified());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("edited.pvr");
    buf.save(File::create(&path).unwrap()).unwrap();
    assert!(!buf.is_modified());

    let texture = PvrTexture::load(File::open(&path).unwrap()).unwrap();
    assert_eq!(texture.flags(), 2);
}
