use image::{ImageBuffer, Rgb};
use tempfile::tempdir;
use tiff::encoder::{TiffEncoder, colortype};

use super::{
    FormatError, ImageFormat, decode_bytes, decode_dicom, encode_gray_png, read_frames,
    sniff_format, write_gray_png,
};
use crate::model::{Photometric, PixelType};

fn element(group: u16, element: u16, vr: &[u8; 2], value: &[u8]) -> Vec<u8> {
    let mut value = value.to_vec();
    if value.len() % 2 == 1 {
        value.push(if vr == b"OB" || vr == b"UI" { 0 } else { b' ' });
    }
    let mut out = Vec::new();
    out.extend_from_slice(&group.to_le_bytes());
    out.extend_from_slice(&element.to_le_bytes());
    out.extend_from_slice(vr);
    if matches!(vr, b"OB" | b"OW" | b"SQ" | b"UN") {
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    } else {
        out.extend_from_slice(&(value.len() as u16).to_le_bytes());
    }
    out.extend_from_slice(&value);
    out
}

fn implicit_element(group: u16, element: u16, value: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&group.to_le_bytes());
    out.extend_from_slice(&element.to_le_bytes());
    out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    out.extend_from_slice(value);
    out
}

fn part10(transfer_syntax: &str, dataset: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0_u8; 128];
    bytes.extend_from_slice(b"DICM");
    bytes.extend(element(0x0002, 0x0010, b"UI", transfer_syntax.as_bytes()));
    bytes.extend_from_slice(dataset);
    bytes
}

fn ct_dataset(pixels: &[i16]) -> Vec<u8> {
    let pixel_bytes = pixels
        .iter()
        .flat_map(|value| value.to_le_bytes())
        .collect::<Vec<_>>();
    let mut dataset = Vec::new();
    dataset.extend(element(0x0008, 0x0060, b"CS", b"CT"));
    dataset.extend(element(0x0010, 0x0020, b"LO", b"ANON-1"));
    // undefined-length sequence that the decoder has to skip
    dataset.extend_from_slice(&[0x08, 0x00, 0x15, 0x11]);
    dataset.extend_from_slice(b"SQ\0\0");
    dataset.extend_from_slice(&0xFFFF_FFFF_u32.to_le_bytes());
    dataset.extend_from_slice(&[0xFE, 0xFF, 0x00, 0xE0]);
    dataset.extend_from_slice(&0xFFFF_FFFF_u32.to_le_bytes());
    dataset.extend(element(0x0008, 0x1150, b"UI", b"1.2.3"));
    dataset.extend_from_slice(&[0xFE, 0xFF, 0x0D, 0xE0, 0, 0, 0, 0]);
    dataset.extend_from_slice(&[0xFE, 0xFF, 0xDD, 0xE0, 0, 0, 0, 0]);
    dataset.extend(element(0x0028, 0x0002, b"US", &1_u16.to_le_bytes()));
    dataset.extend(element(0x0028, 0x0004, b"CS", b"MONOCHROME2"));
    dataset.extend(element(0x0028, 0x0010, b"US", &2_u16.to_le_bytes()));
    dataset.extend(element(0x0028, 0x0011, b"US", &2_u16.to_le_bytes()));
    dataset.extend(element(0x0028, 0x0030, b"DS", b"0.5\\0.75"));
    dataset.extend(element(0x0028, 0x0100, b"US", &16_u16.to_le_bytes()));
    dataset.extend(element(0x0028, 0x0101, b"US", &12_u16.to_le_bytes()));
    dataset.extend(element(0x0028, 0x0103, b"US", &1_u16.to_le_bytes()));
    dataset.extend(element(0x0028, 0x1050, b"DS", b"40\\400"));
    dataset.extend(element(0x0028, 0x1051, b"DS", b"400\\2000"));
    dataset.extend(element(0x0028, 0x1052, b"DS", b"-1024"));
    dataset.extend(element(0x0028, 0x1053, b"DS", b"1"));
    dataset.extend(element(0x7FE0, 0x0010, b"OW", &pixel_bytes));
    dataset
}

#[test]
fn explicit_little_endian_ct_decodes_metadata_and_signed_pixels() {
    let bytes = part10("1.2.840.10008.1.2.1", &ct_dataset(&[-5, 0, 100, 2047]));
    let frames = decode_dicom(&bytes, "ct.dcm").expect("decode");
    assert_eq!(frames.len(), 1);
    let frame = &frames[0];
    assert_eq!(frame.data.dim(), (2, 2));
    assert_eq!(frame.metadata.pixel_type, PixelType::I16);
    assert_eq!(frame.metadata.modality.as_deref(), Some("CT"));
    assert_eq!(frame.metadata.pixel_spacing, Some((0.5, 0.75)));
    assert_eq!(frame.metadata.rescale_intercept, -1024.0);
    let window = frame.metadata.window.expect("window");
    assert_eq!((window.center, window.width), (40.0, 400.0));
    assert_eq!(frame.data[[0, 0]], -5.0);
    assert_eq!(frame.data[[1, 1]], 2047.0);
    assert_eq!(frame.modality_at(0.0, 0.0), Some(-1029.0));
    assert_eq!(
        frame.metadata.extras.get("patient_id"),
        Some(&serde_json::json!("ANON-1"))
    );
}

#[test]
fn implicit_little_endian_multi_frame_splits_frames() {
    let mut dataset = Vec::new();
    dataset.extend(implicit_element(0x0008, 0x0060, b"MR"));
    dataset.extend(implicit_element(0x0028, 0x0004, b"MONOCHROME1 "));
    dataset.extend(implicit_element(0x0028, 0x0008, b"2 "));
    dataset.extend(implicit_element(0x0028, 0x0010, &1_u16.to_le_bytes()));
    dataset.extend(implicit_element(0x0028, 0x0011, &2_u16.to_le_bytes()));
    dataset.extend(implicit_element(0x0028, 0x0100, &8_u16.to_le_bytes()));
    dataset.extend(implicit_element(0x7FE0, 0x0010, &[1, 2, 3, 4]));
    let bytes = part10("1.2.840.10008.1.2", &dataset);

    let frames = decode_dicom(&bytes, "").expect("decode");
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1].data[[0, 1]], 4.0);
    assert_eq!(frames[0].metadata.photometric, Photometric::Monochrome1);
    assert_eq!(frames[0].metadata.source, None);
}

#[test]
fn compressed_transfer_syntax_is_rejected() {
    let bytes = part10("1.2.840.10008.1.2.4.50", &ct_dataset(&[0, 0, 0, 0]));
    let error = decode_dicom(&bytes, "jpeg.dcm").expect_err("unsupported");
    assert!(matches!(error, FormatError::UnsupportedTransferSyntax(_)));
}

#[test]
fn truncated_pixel_data_is_an_error_not_a_panic() {
    let mut bytes = part10("1.2.840.10008.1.2.1", &ct_dataset(&[1, 2, 3, 4]));
    bytes.truncate(bytes.len() - 3);
    assert!(decode_dicom(&bytes, "short.dcm").is_err());
}

#[test]
fn non_dicom_payload_is_rejected() {
    assert!(matches!(
        decode_dicom(b"plainly not dicom", "x"),
        Err(FormatError::NotDicom)
    ));
}

#[test]
fn raster_decode_reduces_colour_to_luminance() {
    let mut image = ImageBuffer::<Rgb<u8>, Vec<u8>>::new(2, 1);
    image.put_pixel(0, 0, Rgb([255, 255, 255]));
    image.put_pixel(1, 0, Rgb([0, 0, 0]));
    let mut bytes = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .expect("encode");
    let bytes = bytes.into_inner();

    assert_eq!(sniff_format(&bytes), Some(ImageFormat::Raster));
    let frames = decode_bytes(&bytes, "https://example.org/a.png").expect("decode");
    assert_eq!(frames[0].data.dim(), (1, 2));
    assert_eq!(frames[0].data[[0, 0]], 255.0);
    assert_eq!(frames[0].data[[0, 1]], 0.0);
    assert_eq!(frames[0].metadata.pixel_type, PixelType::U8);
}

#[test]
fn multi_page_tiff_reads_one_frame_per_page() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("stack.tiff");
    {
        let file = std::fs::File::create(&path).expect("create");
        let mut encoder = TiffEncoder::new(file).expect("encoder");
        for page in 0..3_u16 {
            let data = vec![page * 10; 4];
            encoder
                .write_image::<colortype::Gray16>(2, 2, &data)
                .expect("write page");
        }
    }
    let frames = read_frames(&path).expect("read");
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[2].data[[1, 1]], 20.0);
    assert_eq!(frames[0].metadata.pixel_type, PixelType::U16);
}

#[test]
fn png_written_from_gray_samples_reads_back() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("render.png");
    write_gray_png(&path, 2, 2, &[0, 64, 128, 255]).expect("write");
    let frames = read_frames(&path).expect("read");
    assert_eq!(frames[0].data[[1, 0]], 128.0);

    let encoded = encode_gray_png(2, 2, &[0, 64, 128, 255]).expect("encode");
    assert_eq!(sniff_format(&encoded), Some(ImageFormat::Raster));
}

#[test]
fn wrong_sample_count_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let error = write_gray_png(dir.path().join("bad.png"), 3, 3, &[0, 1]).expect_err("layout");
    assert!(error.to_string().contains("expected 9 grayscale samples"));
}

#[test]
fn unknown_file_is_unsupported() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "hello").expect("write");
    let error = read_frames(&path).expect_err("unsupported");
    assert!(matches!(error, FormatError::UnsupportedFormat(_)));
}

#[test]
fn deeply_nested_sequences_are_rejected() {
    let mut dataset = Vec::new();
    for _ in 0..200_000 {
        dataset.extend_from_slice(&[0x08, 0x00, 0x15, 0x11]);
        dataset.extend_from_slice(&0xFFFF_FFFF_u32.to_le_bytes());
    }
    let bytes = part10("1.2.840.10008.1.2", &dataset);

    let worker = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(move || decode_dicom(&bytes, "nested.dcm"))
        .expect("spawn");
    let result = worker.join().expect("decoder thread");
    assert!(matches!(
        result,
        Err(FormatError::UnsupportedLayout(reason)) if reason.contains("nesting")
    ));
}

#[test]
fn oversized_frame_count_is_rejected() {
    let mut dataset = Vec::new();
    dataset.extend(element(0x0028, 0x0008, b"IS", b"9999999999999"));
    dataset.extend(element(0x0028, 0x0010, b"US", &65535_u16.to_le_bytes()));
    dataset.extend(element(0x0028, 0x0011, b"US", &65535_u16.to_le_bytes()));
    dataset.extend(element(0x0028, 0x0100, b"US", &16_u16.to_le_bytes()));
    dataset.extend(element(0x7FE0, 0x0010, b"OW", &[0; 16]));
    let bytes = part10("1.2.840.10008.1.2.1", &dataset);

    assert!(matches!(
        decode_dicom(&bytes, "huge.dcm"),
        Err(FormatError::UnsupportedLayout(_))
    ));
}
