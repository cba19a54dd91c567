//! Extracción de metadata para audio y video.
//!
//! La extensión elige el contenedor. Cada contenedor valida su firma antes de
//! decodificar; si no coincide se recurre a la detección genérica (firmas de
//! todos los contenedores y luego la sonda de `lofty`).

mod ape;
mod asf;
mod bytes;
mod headers;
mod signature;
mod tagged;

use lofty::error::LoftyError;
use lofty::file::FileType;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use self::signature::Head;
use super::Decoder;
use crate::error::DecodeError;
use crate::metadata::mime::lowercase_extension;
use crate::metadata::report::{FieldList, MetadataField};

const UNPARSEABLE: &str = "Could not parse audio/video metadata.";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("No {0} header found")]
    HeaderNotFound(&'static str),

    #[error("{container} data is malformed: {reason}")]
    Malformed {
        container: &'static str,
        reason: String,
    },

    #[error("unrecognized audio/video container")]
    Unrecognized,

    #[error("{0}")]
    Lofty(#[from] LoftyError),

    #[error("{0}")]
    Io(#[from] io::Error),
}

/// Propiedades técnicas y etiquetas de un flujo de audio/video.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaInfo {
    pub length: Option<f64>,
    /// En kbps.
    pub bitrate: Option<u32>,
    pub channels: Option<u32>,
    pub sample_rate: Option<u32>,
    pub tags: Vec<(String, String)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Container {
    Mp3,
    Flac,
    OggVorbis,
    Mp4,
    Asf,
    WavPack,
    Aiff,
    TrueAudio,
    MonkeysAudio,
    Musepack,
    OptimFrog,
    Aac,
    OggOpus,
}

static CONTAINER_EXTENSIONS: &[(&str, Container)] = &[
    ("mp3", Container::Mp3),
    ("flac", Container::Flac),
    ("ogg", Container::OggVorbis),
    ("oga", Container::OggVorbis),
    ("m4a", Container::Mp4),
    ("mp4", Container::Mp4),
    ("m4v", Container::Mp4),
    ("wma", Container::Asf),
    ("wmv", Container::Asf),
    ("asf", Container::Asf),
    ("wv", Container::WavPack),
    ("aiff", Container::Aiff),
    ("aif", Container::Aiff),
    ("tta", Container::TrueAudio),
    ("ape", Container::MonkeysAudio),
    ("mpc", Container::Musepack),
    ("ofr", Container::OptimFrog),
    ("aac", Container::Aac),
    ("opus", Container::OggOpus),
];

impl Container {
    pub const ALL: [Container; 13] = [
        Container::Mp3,
        Container::Flac,
        Container::OggVorbis,
        Container::Mp4,
        Container::Asf,
        Container::WavPack,
        Container::Aiff,
        Container::TrueAudio,
        Container::MonkeysAudio,
        Container::Musepack,
        Container::OptimFrog,
        Container::Aac,
        Container::OggOpus,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Container::Mp3 => "MP3",
            Container::Flac => "FLAC",
            Container::OggVorbis => "Ogg Vorbis",
            Container::Mp4 => "MP4",
            Container::Asf => "ASF",
            Container::WavPack => "WavPack",
            Container::Aiff => "AIFF",
            Container::TrueAudio => "TrueAudio",
            Container::MonkeysAudio => "Monkey's Audio",
            Container::Musepack => "Musepack",
            Container::OptimFrog => "OptimFROG",
            Container::Aac => "AAC",
            Container::OggOpus => "Ogg Opus",
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        CONTAINER_EXTENSIONS
            .iter()
            .find(|(candidate, _)| *candidate == extension)
            .map(|(_, container)| *container)
    }

    /// Formatos que admiten etiquetas ID3v2 delante del flujo.
    fn allows_id3(self) -> bool {
        matches!(
            self,
            Container::Mp3
                | Container::Flac
                | Container::TrueAudio
                | Container::MonkeysAudio
                | Container::Musepack
                | Container::Aac
        )
    }

    fn read(self, path: &Path) -> Result<MediaInfo, MediaError> {
        match self {
            Container::Asf => asf::read(path),
            Container::TrueAudio => headers::read_true_audio(path),
            Container::OptimFrog => headers::read_optimfrog(path),
            Container::Mp3 => tagged::read_as(path, FileType::Mpeg),
            Container::Flac => tagged::read_as(path, FileType::Flac),
            Container::OggVorbis => tagged::read_as(path, FileType::Vorbis),
            Container::Mp4 => tagged::read_as(path, FileType::Mp4),
            Container::WavPack => tagged::read_as(path, FileType::WavPack),
            Container::Aiff => tagged::read_as(path, FileType::Aiff),
            Container::MonkeysAudio => tagged::read_as(path, FileType::Ape),
            Container::Musepack => tagged::read_as(path, FileType::Mpc),
            Container::Aac => tagged::read_as(path, FileType::Aac),
            Container::OggOpus => tagged::read_as(path, FileType::Opus),
        }
    }
}

pub struct AudioVideoDecoder;

impl Decoder for AudioVideoDecoder {
    fn name(&self) -> &'static str {
        "Audio/Video"
    }

    fn decode(&self, path: &Path, fields: &mut FieldList) -> Result<(), DecodeError> {
        let head = Head::read(path)?;
        let container = lowercase_extension(path)
            .as_deref()
            .and_then(Container::from_extension);

        if let Some(container) = container {
            if head.matches(container) {
                match container.read(path) {
                    Ok(info) => {
                        push_media_fields(&info, fields);
                        return Ok(());
                    }
                    Err(MediaError::HeaderNotFound(_)) => {}
                    Err(error) => return Err(error.into()),
                }
            }
            debug!(container = container.label(), "cabecera no encontrada, detección genérica");
            fields.push(MetadataField::new(
                "Info",
                format!(
                    "No {} header found, trying generic audio/video parsing.",
                    container.label()
                ),
            ));
        }

        match read_generic(path, &head) {
            Ok(info) => push_media_fields(&info, fields),
            Err(error) => {
                debug!(%error, "detección genérica sin resultado");
                fields.push(MetadataField::new("Info", UNPARSEABLE));
            }
        }
        Ok(())
    }
}

fn read_generic(path: &Path, head: &Head) -> Result<MediaInfo, MediaError> {
    match head.detect() {
        Some(container) => {
            debug!(container = container.label(), "contenedor detectado por firma");
            container.read(path)
        }
        None => tagged::read_guessed(path),
    }
}

fn push_media_fields(info: &MediaInfo, fields: &mut FieldList) {
    fields.push(MetadataField::new(
        "Length (seconds)",
        info.length.map(|length| format!("{length:.2}")),
    ));
    fields.push(MetadataField::new("Bitrate (kbps)", info.bitrate));
    fields.push(MetadataField::new("Channels", info.channels));
    fields.push(MetadataField::new("Sample Rate (Hz)", info.sample_rate));
    for (key, value) in &info.tags {
        fields.push(MetadataField::new(format!("Tag: {key}"), value.as_str()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::report::FieldValue;

    fn value_of<'a>(fields: &'a FieldList, label: &str) -> Option<&'a FieldValue> {
        fields.iter().find(|f| f.label == label).map(|f| &f.value)
    }

    #[test]
    fn extension_table_covers_every_container() {
        for container in Container::ALL {
            assert!(
                CONTAINER_EXTENSIONS.iter().any(|(_, c)| *c == container),
                "{container:?} sin extensión"
            );
        }
        assert_eq!(Container::from_extension("oga"), Some(Container::OggVorbis));
        assert_eq!(Container::from_extension("wav"), None);
    }

    #[test]
    fn true_audio_file_reports_properties_and_tags() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("pista.tta");
        std::fs::write(&path, headers::tests::sample_tta())?;

        let output = AudioVideoDecoder.extract(&path);
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        let labels: Vec<&str> = output.fields.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(
            labels,
            [
                "Length (seconds)",
                "Bitrate (kbps)",
                "Channels",
                "Sample Rate (Hz)",
                "Tag: Title",
            ]
        );
        assert_eq!(output.fields[0].value, FieldValue::text("2.50"));
        assert_eq!(output.fields[2].value, FieldValue::Integer(2));
        assert_eq!(output.fields[4].value, FieldValue::text("Aurora"));
        Ok(())
    }

    #[test]
    fn mislabelled_file_falls_back_to_signature_probe() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("en_realidad_asf.mp3");
        std::fs::write(&path, asf::tests::sample_header())?;

        let output = AudioVideoDecoder.extract(&path);
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        assert_eq!(
            output.fields[0],
            MetadataField::new(
                "Info",
                "No MP3 header found, trying generic audio/video parsing."
            )
        );
        assert_eq!(value_of(&output.fields, "Sample Rate (Hz)"), Some(&FieldValue::Integer(44_100)));
        assert_eq!(value_of(&output.fields, "Tag: Title"), Some(&FieldValue::text("Nocturno")));
        Ok(())
    }

    #[test]
    fn short_header_falls_back_to_generic_parsing() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let cases: [(&str, &[u8], &str); 2] = [
            ("corto.tta", b"TTA1\x01\x00", "TrueAudio"),
            ("corto.wma", &asf::HEADER_GUID, "ASF"),
        ];

        for (name, content, label) in cases {
            let path = dir.path().join(name);
            std::fs::write(&path, content)?;

            let output = AudioVideoDecoder.extract(&path);
            assert!(output.errors.is_empty(), "{name}: {:?}", output.errors);
            assert_eq!(
                output.fields,
                vec![
                    MetadataField::new(
                        "Info",
                        format!("No {label} header found, trying generic audio/video parsing.")
                    ),
                    MetadataField::new("Info", UNPARSEABLE),
                ],
                "{name}"
            );
        }
        Ok(())
    }

    /// FLAC mínimo: STREAMINFO de 2 s a 44.1 kHz estéreo, comentarios Vorbis,
    /// imagen opcional y 4000 bytes de flujo.
    fn flac_fixture(with_picture: bool) -> Vec<u8> {
        fn block(bytes: &mut Vec<u8>, kind: u8, last: bool, content: &[u8]) {
            bytes.push(if last { kind | 0x80 } else { kind });
            bytes.extend_from_slice(&(content.len() as u32).to_be_bytes()[1..]);
            bytes.extend_from_slice(content);
        }

        let total_samples: u64 = 88_200;
        let mut stream_info = vec![0x10, 0x00, 0x10, 0x00, 0, 0, 0, 0, 0, 0];
        let packed = (44_100_u32 << 12) | (1 << 9) | (15 << 4) | (total_samples >> 32) as u32;
        stream_info.extend_from_slice(&packed.to_be_bytes());
        stream_info.extend_from_slice(&(total_samples as u32).to_be_bytes());
        stream_info.extend_from_slice(&[0; 16]);

        let vendor = b"metalens";
        let comment = b"TITLE=Hola";
        let mut comments = Vec::new();
        comments.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
        comments.extend_from_slice(vendor);
        comments.extend_from_slice(&1_u32.to_le_bytes());
        comments.extend_from_slice(&(comment.len() as u32).to_le_bytes());
        comments.extend_from_slice(comment);

        let mime = b"image/png";
        let mut picture = Vec::new();
        picture.extend_from_slice(&3_u32.to_be_bytes());
        picture.extend_from_slice(&(mime.len() as u32).to_be_bytes());
        picture.extend_from_slice(mime);
        picture.extend_from_slice(&0_u32.to_be_bytes());
        picture.extend_from_slice(&[0; 16]);
        picture.extend_from_slice(&8_u32.to_be_bytes());
        picture.extend_from_slice(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);

        let mut bytes = b"fLaC".to_vec();
        block(&mut bytes, 0, false, &stream_info);
        block(&mut bytes, 4, !with_picture, &comments);
        if with_picture {
            block(&mut bytes, 6, true, &picture);
        }
        bytes.extend_from_slice(&[0; 4000]);
        bytes
    }

    #[test]
    fn flac_properties_and_native_tag_keys() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("hola.flac");
        std::fs::write(&path, flac_fixture(false))?;

        let output = AudioVideoDecoder.extract(&path);
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        assert_eq!(value_of(&output.fields, "Length (seconds)"), Some(&FieldValue::text("2.00")));
        assert_eq!(value_of(&output.fields, "Bitrate (kbps)"), Some(&FieldValue::Integer(16)));
        assert_eq!(value_of(&output.fields, "Channels"), Some(&FieldValue::Integer(2)));
        assert_eq!(value_of(&output.fields, "Sample Rate (Hz)"), Some(&FieldValue::Integer(44_100)));
        assert_eq!(value_of(&output.fields, "Tag: TITLE"), Some(&FieldValue::text("Hola")));
        assert!(!output.fields.iter().any(|f| f.label.starts_with("Tag: Picture")));
        Ok(())
    }

    #[test]
    fn flac_embedded_picture_is_summarized() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("portada.flac");
        std::fs::write(&path, flac_fixture(true))?;

        let output = AudioVideoDecoder.extract(&path);
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        assert_eq!(value_of(&output.fields, "Tag: TITLE"), Some(&FieldValue::text("Hola")));
        assert_eq!(
            value_of(&output.fields, "Tag: Picture 1"),
            Some(&FieldValue::text("CoverFront (8 bytes)"))
        );
        assert_eq!(
            output.fields.last().map(|f| f.label.as_str()),
            Some("Tag: Picture 1")
        );
        Ok(())
    }

    #[test]
    fn unrecognized_content_is_informational() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("video.mkv");
        std::fs::write(&path, [0x13_u8; 256])?;

        let output = AudioVideoDecoder.extract(&path);
        assert!(output.errors.is_empty());
        assert_eq!(output.fields, vec![MetadataField::new("Info", UNPARSEABLE)]);
        Ok(())
    }

    #[test]
    fn corrupted_stream_is_a_soft_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("roto.flac");
        std::fs::write(&path, b"fLaC\x00\x00\x00\x22\x12")?;

        let output = AudioVideoDecoder.extract(&path);
        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.errors[0].stage, "Audio/Video");
        assert_eq!(output.fields.len(), 1);
        assert_eq!(output.fields[0].label, "Error (Audio/Video Metadata)");
        Ok(())
    }

    #[test]
    fn missing_values_stay_null() {
        let mut fields = FieldList::new();
        push_media_fields(
            &MediaInfo {
                length: Some(61.0),
                ..MediaInfo::default()
            },
            &mut fields,
        );
        assert_eq!(fields[0].value, FieldValue::text("61.00"));
        assert!(fields[1..].iter().all(|f| f.value.is_null()));
    }
}
