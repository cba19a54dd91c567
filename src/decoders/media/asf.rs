//! Lector de cabeceras ASF (WMA/WMV).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::bytes::{le_u16, le_u32, le_u64, utf16le};
use super::{MediaError, MediaInfo};

const CONTAINER: &str = "ASF";
const MAX_HEADER_SIZE: u64 = 64 * 1024 * 1024;

pub(super) const HEADER_GUID: [u8; 16] = [
    0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11, 0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62, 0xCE, 0x6C,
];
const FILE_PROPERTIES_GUID: [u8; 16] = [
    0xA1, 0xDC, 0xAB, 0x8C, 0x47, 0xA9, 0xCF, 0x11, 0x8E, 0xE4, 0x00, 0xC0, 0x0C, 0x20, 0x53, 0x65,
];
const STREAM_PROPERTIES_GUID: [u8; 16] = [
    0x91, 0x07, 0xDC, 0xB7, 0xB7, 0xA9, 0xCF, 0x11, 0x8E, 0xE6, 0x00, 0xC0, 0x0C, 0x20, 0x53, 0x65,
];
const AUDIO_MEDIA_GUID: [u8; 16] = [
    0x40, 0x9E, 0x69, 0xF8, 0x4D, 0x5B, 0xCF, 0x11, 0xA8, 0xFD, 0x00, 0x80, 0x5F, 0x5C, 0x44, 0x2B,
];
const CONTENT_DESCRIPTION_GUID: [u8; 16] = [
    0x33, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11, 0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62, 0xCE, 0x6C,
];
const EXTENDED_CONTENT_DESCRIPTION_GUID: [u8; 16] = [
    0x40, 0xA4, 0xD0, 0xD2, 0x07, 0xE3, 0xD2, 0x11, 0x97, 0xF0, 0x00, 0xA0, 0xC9, 0x5E, 0xA8, 0x50,
];

const CONTENT_DESCRIPTION_NAMES: [&str; 5] =
    ["Title", "Author", "Copyright", "Description", "Rating"];

fn malformed(reason: impl Into<String>) -> MediaError {
    MediaError::Malformed {
        container: CONTAINER,
        reason: reason.into(),
    }
}

pub(super) fn read(path: &Path) -> Result<MediaInfo, MediaError> {
    let mut file = File::open(path)?;
    let file_len = file.metadata()?.len();

    let mut prefix = [0_u8; 30];
    file.read_exact(&mut prefix)
        .map_err(|_| MediaError::HeaderNotFound(CONTAINER))?;
    if prefix[..16] != HEADER_GUID {
        return Err(MediaError::HeaderNotFound(CONTAINER));
    }

    let header_size = le_u64(&prefix, 16).unwrap_or(0);
    let object_count = le_u32(&prefix, 24).unwrap_or(0);
    if header_size < 30 || header_size > file_len || header_size > MAX_HEADER_SIZE {
        return Err(malformed(format!("invalid header size {header_size}")));
    }

    let mut body = vec![0_u8; (header_size - 30) as usize];
    file.read_exact(&mut body)?;

    let mut info = parse_header_objects(&body, object_count)?;
    if info.bitrate.is_none()
        && let Some(length) = info.length.filter(|length| *length > 0.0)
    {
        info.bitrate = Some((file_len as f64 * 8.0 / length / 1000.0).round() as u32);
    }
    Ok(info)
}

/// Recorre los objetos hijos del Header Object.
fn parse_header_objects(body: &[u8], count: u32) -> Result<MediaInfo, MediaError> {
    let mut info = MediaInfo::default();
    let mut offset = 0_usize;

    for _ in 0..count {
        let guid = body
            .get(offset..offset + 16)
            .ok_or_else(|| malformed("truncated header object"))?;
        let size = le_u64(body, offset + 16)
            .and_then(|size| usize::try_from(size).ok())
            .ok_or_else(|| malformed("truncated header object"))?;
        let end = offset
            .checked_add(size)
            .filter(|end| size >= 24 && *end <= body.len())
            .ok_or_else(|| malformed(format!("object size {size} out of bounds")))?;
        let payload = &body[offset + 24..end];

        if guid == FILE_PROPERTIES_GUID {
            info.length = file_length(payload);
        } else if guid == STREAM_PROPERTIES_GUID {
            if info.channels.is_none() {
                read_audio_stream(payload, &mut info);
            }
        } else if guid == CONTENT_DESCRIPTION_GUID {
            info.tags.extend(content_description(payload)?);
        } else if guid == EXTENDED_CONTENT_DESCRIPTION_GUID {
            info.tags.extend(extended_content_description(payload)?);
        }

        offset = end;
    }

    Ok(info)
}

/// Duración en segundos: play duration (100 ns) menos el preroll (ms).
fn file_length(payload: &[u8]) -> Option<f64> {
    let play_duration = le_u64(payload, 40)?;
    let preroll = le_u64(payload, 56)?;
    Some((play_duration as f64 / 10_000_000.0 - preroll as f64 / 1000.0).max(0.0))
}

fn read_audio_stream(payload: &[u8], info: &mut MediaInfo) {
    if payload.get(..16) != Some(AUDIO_MEDIA_GUID.as_slice()) {
        return;
    }
    // WAVEFORMATEX tras los 54 bytes fijos del objeto
    const FORMAT: usize = 54;
    info.channels = le_u16(payload, FORMAT + 2).map(u32::from);
    info.sample_rate = le_u32(payload, FORMAT + 4);
    info.bitrate = le_u32(payload, FORMAT + 8)
        .map(|bytes_per_sec| (f64::from(bytes_per_sec) * 8.0 / 1000.0).round() as u32);
}

fn content_description(payload: &[u8]) -> Result<Vec<(String, String)>, MediaError> {
    let mut tags = Vec::new();
    let mut offset = 10;
    for (index, name) in CONTENT_DESCRIPTION_NAMES.iter().enumerate() {
        let len = le_u16(payload, index * 2)
            .ok_or_else(|| malformed("truncated content description"))?
            as usize;
        let value = payload
            .get(offset..offset + len)
            .ok_or_else(|| malformed("truncated content description"))?;
        offset += len;
        let value = utf16le(value);
        if !value.is_empty() {
            tags.push(((*name).to_string(), value));
        }
    }
    Ok(tags)
}

fn extended_content_description(payload: &[u8]) -> Result<Vec<(String, String)>, MediaError> {
    let truncated = || malformed("truncated extended content description");
    let count = le_u16(payload, 0).ok_or_else(truncated)?;
    let mut tags = Vec::with_capacity(usize::from(count));
    let mut offset = 2;

    for _ in 0..count {
        let name_len = usize::from(le_u16(payload, offset).ok_or_else(truncated)?);
        offset += 2;
        let name = utf16le(payload.get(offset..offset + name_len).ok_or_else(truncated)?);
        offset += name_len;
        let value_type = le_u16(payload, offset).ok_or_else(truncated)?;
        let value_len = usize::from(le_u16(payload, offset + 2).ok_or_else(truncated)?);
        offset += 4;
        let value = payload.get(offset..offset + value_len).ok_or_else(truncated)?;
        offset += value_len;
        tags.push((name, descriptor_value(value_type, value)));
    }

    Ok(tags)
}

fn descriptor_value(value_type: u16, value: &[u8]) -> String {
    let number = match value_type {
        0 => return utf16le(value),
        2 => le_u32(value, 0)
            .or_else(|| le_u16(value, 0).map(u32::from))
            .map(|flag| (flag != 0).to_string()),
        3 => le_u32(value, 0).map(|v| v.to_string()),
        4 => le_u64(value, 0).map(|v| v.to_string()),
        5 => le_u16(value, 0).map(|v| v.to_string()),
        _ => None,
    };
    number.unwrap_or_else(|| format!("<binary, {} bytes>", value.len()))
}
