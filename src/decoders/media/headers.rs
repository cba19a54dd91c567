//! Cabeceras fijas de TrueAudio y OptimFROG. Las etiquetas de ambos
//! formatos viven en un APEv2 al final del archivo.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use super::ape::read_tags;
use super::bytes::{le_u16, le_u32};
use super::signature::skip_id3v2;
use super::{MediaError, MediaInfo};

const TTA_HEADER_LEN: u64 = 22;
const OFR_HEADER_LEN: u64 = 20;

pub(super) fn read_true_audio(path: &Path) -> Result<MediaInfo, MediaError> {
    const CONTAINER: &str = "TrueAudio";

    let mut file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let offset = skip_id3v2(&mut file)?;
    let header = read_header(&mut file, offset, TTA_HEADER_LEN)
        .filter(|header| header.starts_with(b"TTA1"))
        .ok_or(MediaError::HeaderNotFound(CONTAINER))?;

    let channels = le_u16(&header, 6).map(u32::from);
    let sample_rate = le_u32(&header, 10).unwrap_or(0);
    let samples = le_u32(&header, 14).unwrap_or(0);
    if sample_rate == 0 {
        return Err(MediaError::Malformed {
            container: CONTAINER,
            reason: "sample rate is zero".to_string(),
        });
    }

    let length = f64::from(samples) / f64::from(sample_rate);
    Ok(MediaInfo {
        length: Some(length),
        bitrate: bitrate_from_size(file_len, length),
        channels,
        sample_rate: Some(sample_rate),
        tags: read_tags(&mut file)?,
    })
}

pub(super) fn read_optimfrog(path: &Path) -> Result<MediaInfo, MediaError> {
    const CONTAINER: &str = "OptimFROG";

    let mut file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let header = read_header(&mut file, 0, OFR_HEADER_LEN)
        .filter(|header| header.starts_with(b"OFR "))
        .ok_or(MediaError::HeaderNotFound(CONTAINER))?;

    let samples_low = u64::from(le_u32(&header, 8).unwrap_or(0));
    let samples_high = u64::from(le_u16(&header, 12).unwrap_or(0));
    let total_samples = samples_low | (samples_high << 32);
    let channels = u32::from(header[15]) + 1;
    let sample_rate = le_u32(&header, 16).unwrap_or(0);

    let length = (sample_rate > 0)
        .then(|| total_samples as f64 / (f64::from(channels) * f64::from(sample_rate)));
    Ok(MediaInfo {
        length,
        bitrate: length.and_then(|length| bitrate_from_size(file_len, length)),
        channels: Some(channels),
        sample_rate: Some(sample_rate),
        tags: read_tags(&mut file)?,
    })
}

/// Cabecera de largo fijo; `None` si el archivo es más corto.
fn read_header(file: &mut File, offset: u64, len: u64) -> Option<Vec<u8>> {
    file.seek(SeekFrom::Start(offset)).ok()?;
    let mut header = Vec::new();
    file.by_ref().take(len).read_to_end(&mut header).ok()?;
    (header.len() as u64 == len).then_some(header)
}

fn bitrate_from_size(file_len: u64, length: f64) -> Option<u32> {
    (length > 0.0).then(|| (file_len as f64 * 8.0 / length / 1000.0).round() as u32)
}
