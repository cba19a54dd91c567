//! Contenedores soportados por `lofty`.

use lofty::file::{FileType, TaggedFile, TaggedFileExt};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, ItemValue, TagType};
use std::path::Path;

use super::{MediaError, MediaInfo};

/// Lee el archivo forzando el tipo de contenedor.
pub(super) fn read_as(path: &Path, file_type: FileType) -> Result<MediaInfo, MediaError> {
    let tagged_file = Probe::open(path)?.set_file_type(file_type).read()?;
    Ok(media_info(&tagged_file))
}

/// Deja que `lofty` adivine el contenedor a partir del contenido.
pub(super) fn read_guessed(path: &Path) -> Result<MediaInfo, MediaError> {
    let probe = Probe::open(path)?.guess_file_type()?;
    if probe.file_type().is_none() {
        return Err(MediaError::Unrecognized);
    }
    let tagged_file = probe.read()?;
    Ok(media_info(&tagged_file))
}

fn media_info(tagged_file: &TaggedFile) -> MediaInfo {
    let properties = tagged_file.properties();
    let mut info = MediaInfo {
        length: Some(properties.duration().as_secs_f64()),
        bitrate: properties.audio_bitrate().or(properties.overall_bitrate()),
        channels: properties.channels().map(u32::from),
        sample_rate: properties.sample_rate(),
        tags: Vec::new(),
    };

    let mut picture_index = 0;
    for tag in tagged_file.tags() {
        for item in tag.items() {
            info.tags
                .push((item_key_name(item.key(), tag.tag_type()), item_value_text(item.value())));
        }
        for picture in tag.pictures() {
            picture_index += 1;
            info.tags.push((
                format!("Picture {picture_index}"),
                format!("{:?} ({} bytes)", picture.pic_type(), picture.data().len()),
            ));
        }
    }

    info
}

/// Clave nativa del formato de etiqueta; el nombre genérico de `lofty` solo
/// si el formato no tiene equivalente.
fn item_key_name(key: &ItemKey, tag_type: TagType) -> String {
    key.map_key(tag_type, true)
        .map_or_else(|| format!("{key:?}"), str::to_owned)
}

fn item_value_text(value: &ItemValue) -> String {
    match value {
        ItemValue::Text(text) | ItemValue::Locator(text) => text.clone(),
        ItemValue::Binary(bytes) => format!("<binary, {} bytes>", bytes.len()),
    }
}
