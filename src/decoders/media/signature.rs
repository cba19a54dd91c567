//! Firmas de cabecera por contenedor.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use super::Container;
use super::asf::HEADER_GUID;
use super::bytes::contains;

const HEAD_LEN: u64 = 64;

/// Primeros bytes del archivo, antes y después de las etiquetas ID3v2.
pub(super) struct Head {
    start: Vec<u8>,
    after_id3: Vec<u8>,
}

impl Head {
    pub(super) fn read(path: &Path) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let start = read_at(&mut file, 0)?;
        let offset = skip_id3v2(&mut file)?;
        let after_id3 = if offset == 0 {
            start.clone()
        } else {
            read_at(&mut file, offset)?
        };
        Ok(Self { start, after_id3 })
    }

    pub(super) fn matches(&self, container: Container) -> bool {
        let bytes = if container.allows_id3() {
            &self.after_id3
        } else {
            &self.start
        };
        signature_matches(container, bytes)
    }

    /// Primer contenedor de la tabla cuya firma coincide.
    pub(super) fn detect(&self) -> Option<Container> {
        Container::ALL
            .into_iter()
            .find(|container| self.matches(*container))
    }
}

fn read_at(file: &mut File, offset: u64) -> io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buffer = Vec::new();
    file.by_ref().take(HEAD_LEN).read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// Posición del primer byte de audio tras las etiquetas ID3v2 iniciales.
pub(super) fn skip_id3v2<R: Read + Seek>(reader: &mut R) -> io::Result<u64> {
    let mut offset = 0_u64;
    loop {
        reader.seek(SeekFrom::Start(offset))?;
        let mut header = Vec::new();
        reader.by_ref().take(10).read_to_end(&mut header)?;
        match id3v2_tag_len(&header) {
            Some(len) => offset += len,
            None => return Ok(offset),
        }
    }
}

/// Largo total de una etiqueta ID3v2, cabecera y pie incluidos.
fn id3v2_tag_len(header: &[u8]) -> Option<u64> {
    if header.len() < 10 || !header.starts_with(b"ID3") {
        return None;
    }
    if header[6..10].iter().any(|byte| byte & 0x80 != 0) {
        return None;
    }
    let size = header[6..10]
        .iter()
        .fold(0_u64, |acc, byte| (acc << 7) | u64::from(*byte));
    let footer = if header[5] & 0x10 != 0 { 10 } else { 0 };
    Some(10 + size + footer)
}

fn signature_matches(container: Container, bytes: &[u8]) -> bool {
    match container {
        Container::Mp3 => {
            bytes.len() >= 2
                && bytes[0] == 0xFF
                && bytes[1] & 0xE0 == 0xE0
                && bytes[1] & 0x06 != 0
        }
        Container::Flac => bytes.starts_with(b"fLaC"),
        Container::OggVorbis => bytes.starts_with(b"OggS") && contains(bytes, b"\x01vorbis"),
        Container::OggOpus => bytes.starts_with(b"OggS") && contains(bytes, b"OpusHead"),
        Container::Mp4 => bytes.get(4..8) == Some(b"ftyp".as_slice()),
        Container::Asf => bytes.starts_with(&HEADER_GUID),
        Container::WavPack => bytes.starts_with(b"wvpk"),
        Container::Aiff => {
            bytes.starts_with(b"FORM")
                && (bytes.get(8..12) == Some(b"AIFF".as_slice())
                    || bytes.get(8..12) == Some(b"AIFC".as_slice()))
        }
        Container::TrueAudio => bytes.starts_with(b"TTA1"),
        Container::MonkeysAudio => bytes.starts_with(b"MAC "),
        Container::Musepack => bytes.starts_with(b"MPCK") || bytes.starts_with(b"MP+"),
        Container::OptimFrog => bytes.starts_with(b"OFR "),
        Container::Aac => {
            (bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xF6 == 0xF0)
                || bytes.starts_with(b"ADIF")
        }
    }
}
