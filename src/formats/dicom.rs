use std::collections::HashMap;

use ndarray::Array2;

use crate::model::{Frame, Photometric, PixelType, WindowLevel};

use super::util::{decimal_pair, first_decimal, metadata_for};
use super::{FormatError, Result};

const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";
const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
const UNDEFINED_LENGTH: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Tag(u16, u16);

impl Tag {
    const TRANSFER_SYNTAX: Tag = Tag(0x0002, 0x0010);
    const STUDY_DATE: Tag = Tag(0x0008, 0x0020);
    const MODALITY: Tag = Tag(0x0008, 0x0060);
    const PATIENT_ID: Tag = Tag(0x0010, 0x0020);
    const BODY_PART: Tag = Tag(0x0018, 0x0015);
    const STUDY_UID: Tag = Tag(0x0020, 0x000D);
    const SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
    const PHOTOMETRIC: Tag = Tag(0x0028, 0x0004);
    const NUMBER_OF_FRAMES: Tag = Tag(0x0028, 0x0008);
    const ROWS: Tag = Tag(0x0028, 0x0010);
    const COLUMNS: Tag = Tag(0x0028, 0x0011);
    const PIXEL_SPACING: Tag = Tag(0x0028, 0x0030);
    const BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
    const BITS_STORED: Tag = Tag(0x0028, 0x0101);
    const PIXEL_REPRESENTATION: Tag = Tag(0x0028, 0x0103);
    const WINDOW_CENTER: Tag = Tag(0x0028, 0x1050);
    const WINDOW_WIDTH: Tag = Tag(0x0028, 0x1051);
    const RESCALE_INTERCEPT: Tag = Tag(0x0028, 0x1052);
    const RESCALE_SLOPE: Tag = Tag(0x0028, 0x1053);
    const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);
    const ITEM_DELIMITATION: Tag = Tag(0xFFFE, 0xE00D);
    const SEQUENCE_DELIMITATION: Tag = Tag(0xFFFE, 0xE0DD);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Syntax {
    ExplicitLittle,
    ImplicitLittle,
}

struct Header {
    tag: Tag,
    vr: Option<[u8; 2]>,
    length: u32,
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8], offset: usize) -> Self {
        Self { bytes, offset }
    }

    fn is_empty(&self) -> bool {
        self.offset >= self.bytes.len()
    }

    fn peek_u16(&self) -> Option<u16> {
        let slice = self.bytes.get(self.offset..self.offset + 2)?;
        Some(u16::from_le_bytes([slice[0], slice[1]]))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(FormatError::Truncated {
                offset: self.offset,
                needed: len,
            })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn header(&mut self, syntax: Syntax) -> Result<Header> {
        let tag = Tag(self.u16()?, self.u16()?);
        // Items and delimiters never carry a VR, whatever the transfer syntax.
        if tag.0 == 0xFFFE || syntax == Syntax::ImplicitLittle {
            let length = self.u32()?;
            return Ok(Header {
                tag,
                vr: None,
                length,
            });
        }

        let vr_bytes = self.take(2)?;
        let vr = [vr_bytes[0], vr_bytes[1]];
        let length = if has_long_length(&vr) {
            self.take(2)?;
            self.u32()?
        } else {
            u32::from(self.u16()?)
        };
        Ok(Header {
            tag,
            vr: Some(vr),
            length,
        })
    }
}

fn has_long_length(vr: &[u8; 2]) -> bool {
    matches!(
        vr,
        b"OB" | b"OD" | b"OF" | b"OL" | b"OV" | b"OW" | b"SQ" | b"SV" | b"UC" | b"UN" | b"UR"
            | b"UT" | b"UV"
    )
}

pub(crate) fn is_dicom(bytes: &[u8]) -> bool {
    bytes.get(PREAMBLE_LEN..PREAMBLE_LEN + 4) == Some(MAGIC.as_slice())
}

/// Decodes an uncompressed little-endian DICOM part 10 stream. Multi-frame objects yield
/// one frame per image, all sharing the same metadata.
pub(crate) fn decode_dicom(bytes: &[u8], source: &str) -> Result<Vec<Frame>> {
    if !is_dicom(bytes) {
        return Err(FormatError::NotDicom);
    }

    let mut reader = Reader::new(bytes, PREAMBLE_LEN + MAGIC.len());
    let mut elements = HashMap::new();
    read_elements(&mut reader, Syntax::ExplicitLittle, &mut elements, Some(0x0002))?;

    let transfer_syntax = elements
        .get(&Tag::TRANSFER_SYNTAX)
        .map(|value| text(value))
        .ok_or(FormatError::MissingAttribute("TransferSyntaxUID"))?;
    let syntax = match transfer_syntax.as_str() {
        IMPLICIT_VR_LITTLE_ENDIAN => Syntax::ImplicitLittle,
        EXPLICIT_VR_LITTLE_ENDIAN => Syntax::ExplicitLittle,
        other => return Err(FormatError::UnsupportedTransferSyntax(other.to_string())),
    };

    read_elements(&mut reader, syntax, &mut elements, None)?;
    build_frames(&elements, source)
}

fn read_elements<'a>(
    reader: &mut Reader<'a>,
    syntax: Syntax,
    elements: &mut HashMap<Tag, &'a [u8]>,
    only_group: Option<u16>,
) -> Result<()> {
    while !reader.is_empty() {
        if let Some(group) = only_group
            && reader.peek_u16() != Some(group)
        {
            break;
        }

        let header = reader.header(syntax)?;
        if header.length == UNDEFINED_LENGTH {
            if header.tag == Tag::PIXEL_DATA {
                return Err(FormatError::UnsupportedTransferSyntax(
                    "encapsulated pixel data".into(),
                ));
            }
            skip_undefined(reader, syntax)?;
            continue;
        }

        let value = reader.take(header.length as usize)?;
        if header.vr != Some(*b"SQ") {
            elements.insert(header.tag, value);
        }
        if header.tag == Tag::PIXEL_DATA {
            break;
        }
    }
    Ok(())
}

const MAX_SEQUENCE_DEPTH: usize = 64;

/// Skips an undefined-length sequence or item up to its delimiter, including nested ones.
fn skip_undefined(reader: &mut Reader<'_>, syntax: Syntax) -> Result<()> {
    let mut depth = 1usize;
    while depth > 0 {
        let header = reader.header(syntax)?;
        match header.tag {
            Tag::SEQUENCE_DELIMITATION | Tag::ITEM_DELIMITATION => depth -= 1,
            _ if header.length == UNDEFINED_LENGTH => {
                depth += 1;
                if depth > MAX_SEQUENCE_DEPTH {
                    return Err(FormatError::UnsupportedLayout(
                        "sequence nesting too deep".into(),
                    ));
                }
            }
            _ => {
                reader.take(header.length as usize)?;
            }
        }
    }
    Ok(())
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

fn unsigned_short(elements: &HashMap<Tag, &[u8]>, tag: Tag) -> Option<u16> {
    let bytes = elements.get(&tag)?;
    (bytes.len() >= 2).then(|| u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn string_attr(elements: &HashMap<Tag, &[u8]>, tag: Tag) -> Option<String> {
    elements
        .get(&tag)
        .map(|value| text(value))
        .filter(|value| !value.is_empty())
}

fn build_frames(elements: &HashMap<Tag, &[u8]>, source: &str) -> Result<Vec<Frame>> {
    let rows = unsigned_short(elements, Tag::ROWS).ok_or(FormatError::MissingAttribute("Rows"))?
        as usize;
    let columns = unsigned_short(elements, Tag::COLUMNS)
        .ok_or(FormatError::MissingAttribute("Columns"))? as usize;
    let bits_allocated = unsigned_short(elements, Tag::BITS_ALLOCATED)
        .ok_or(FormatError::MissingAttribute("BitsAllocated"))?;
    let bits_stored = unsigned_short(elements, Tag::BITS_STORED).unwrap_or(bits_allocated);
    let signed = unsigned_short(elements, Tag::PIXEL_REPRESENTATION) == Some(1);
    let samples = unsigned_short(elements, Tag::SAMPLES_PER_PIXEL).unwrap_or(1);
    let pixel_data = elements
        .get(&Tag::PIXEL_DATA)
        .ok_or(FormatError::MissingAttribute("PixelData"))?;

    if rows == 0 || columns == 0 {
        return Err(FormatError::UnsupportedLayout(format!(
            "zero-sized image {columns}x{rows}"
        )));
    }
    if samples != 1 {
        return Err(FormatError::UnsupportedLayout(format!(
            "{samples} samples per pixel; only monochrome images are supported"
        )));
    }
    let photometric = match string_attr(elements, Tag::PHOTOMETRIC).as_deref() {
        Some("MONOCHROME1") => Photometric::Monochrome1,
        Some("MONOCHROME2") | None => Photometric::Monochrome2,
        Some(other) => {
            return Err(FormatError::UnsupportedLayout(format!(
                "photometric interpretation {other}"
            )));
        }
    };
    let (bytes_per_sample, pixel_type) = match (bits_allocated, signed) {
        (8, _) => (1, PixelType::U8),
        (16, false) => (2, PixelType::U16),
        (16, true) => (2, PixelType::I16),
        (other, _) => {
            return Err(FormatError::UnsupportedLayout(format!(
                "{other} bits allocated per sample"
            )));
        }
    };

    let frame_count = string_attr(elements, Tag::NUMBER_OF_FRAMES)
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);
    let frame_len = rows
        .checked_mul(columns)
        .and_then(|pixels| pixels.checked_mul(bytes_per_sample))
        .ok_or_else(|| {
            FormatError::UnsupportedLayout(format!("frame size {columns}x{rows} overflows"))
        })?;
    if frame_count > pixel_data.len() / frame_len {
        return Err(FormatError::UnsupportedLayout(format!(
            "pixel data holds {} bytes, too few for {frame_count} frame(s) of {columns}x{rows}",
            pixel_data.len()
        )));
    }

    let mut metadata = metadata_for(rows, columns, pixel_type, source);
    metadata.photometric = photometric;
    metadata.modality = string_attr(elements, Tag::MODALITY);
    if let Some(slope) = string_attr(elements, Tag::RESCALE_SLOPE).and_then(|v| first_decimal(&v)) {
        metadata.rescale_slope = slope;
    }
    if let Some(intercept) =
        string_attr(elements, Tag::RESCALE_INTERCEPT).and_then(|v| first_decimal(&v))
    {
        metadata.rescale_intercept = intercept;
    }
    let center = string_attr(elements, Tag::WINDOW_CENTER).and_then(|v| first_decimal(&v));
    let width = string_attr(elements, Tag::WINDOW_WIDTH).and_then(|v| first_decimal(&v));
    if let (Some(center), Some(width)) = (center, width) {
        metadata.window = Some(WindowLevel::new(center, width));
    }
    metadata.pixel_spacing =
        string_attr(elements, Tag::PIXEL_SPACING).and_then(|v| decimal_pair(&v));
    for (key, tag) in [
        ("patient_id", Tag::PATIENT_ID),
        ("study_date", Tag::STUDY_DATE),
        ("study_instance_uid", Tag::STUDY_UID),
        ("body_part_examined", Tag::BODY_PART),
    ] {
        if let Some(value) = string_attr(elements, tag) {
            metadata.extras.insert(key.into(), serde_json::Value::String(value));
        }
    }
    metadata
        .extras
        .insert("number_of_frames".into(), serde_json::json!(frame_count));

    pixel_data
        .chunks_exact(frame_len)
        .take(frame_count)
        .map(|chunk| -> Result<Frame> {
            let values = decode_samples(chunk, bytes_per_sample, bits_stored, signed);
            let data = Array2::from_shape_vec((rows, columns), values)
                .map_err(|error| FormatError::UnsupportedLayout(error.to_string()))?;
            Ok(Frame::new(data, metadata.clone())?)
        })
        .collect()
}

fn decode_samples(chunk: &[u8], bytes_per_sample: usize, bits_stored: u16, signed: bool) -> Vec<f32> {
    if bytes_per_sample == 1 {
        return chunk
            .iter()
            .map(|byte| if signed { f32::from(*byte as i8) } else { f32::from(*byte) })
            .collect();
    }

    let bits = u32::from(bits_stored.clamp(1, 16));
    let mask: u32 = (1 << bits) - 1;
    chunk
        .chunks_exact(2)
        .map(|pair| {
            let raw = u32::from(u16::from_le_bytes([pair[0], pair[1]])) & mask;
            if signed && raw >> (bits - 1) & 1 == 1 {
                (raw as i32 - (1 << bits)) as f32
            } else {
                raw as f32
            }
        })
        .collect()
}
