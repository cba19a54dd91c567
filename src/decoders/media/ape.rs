//! Etiquetas APEv2 al final del archivo.

use std::io::{Read, Seek, SeekFrom};

use super::MediaError;
use super::bytes::le_u32;

const FOOTER_LEN: u64 = 32;
const ID3V1_LEN: u64 = 128;
const MAX_TAG_SIZE: u64 = 16 * 1024 * 1024;

fn malformed(reason: impl Into<String>) -> MediaError {
    MediaError::Malformed {
        container: "APEv2",
        reason: reason.into(),
    }
}

/// Ítems de la etiqueta en orden de aparición. Sin etiqueta, lista vacía.
pub(super) fn read_tags<R: Read + Seek>(reader: &mut R) -> Result<Vec<(String, String)>, MediaError> {
    let file_len = reader.seek(SeekFrom::End(0))?;

    let mut end = file_len;
    if file_len >= ID3V1_LEN {
        reader.seek(SeekFrom::Start(file_len - ID3V1_LEN))?;
        let mut marker = [0_u8; 3];
        reader.read_exact(&mut marker)?;
        if &marker == b"TAG" {
            end -= ID3V1_LEN;
        }
    }
    if end < FOOTER_LEN {
        return Ok(Vec::new());
    }

    reader.seek(SeekFrom::Start(end - FOOTER_LEN))?;
    let mut footer = [0_u8; FOOTER_LEN as usize];
    reader.read_exact(&mut footer)?;
    if !footer.starts_with(b"APETAGEX") {
        return Ok(Vec::new());
    }

    let tag_size = u64::from(le_u32(&footer, 12).unwrap_or(0));
    let item_count = le_u32(&footer, 16).unwrap_or(0);
    if tag_size < FOOTER_LEN || tag_size > end || tag_size > MAX_TAG_SIZE {
        return Err(malformed(format!("invalid tag size {tag_size}")));
    }

    reader.seek(SeekFrom::Start(end - tag_size))?;
    let mut items = vec![0_u8; (tag_size - FOOTER_LEN) as usize];
    reader.read_exact(&mut items)?;
    parse_items(&items, item_count)
}

fn parse_items(data: &[u8], count: u32) -> Result<Vec<(String, String)>, MediaError> {
    let mut tags = Vec::new();
    let mut offset = 0_usize;

    for _ in 0..count {
        let value_len = le_u32(data, offset)
            .ok_or_else(|| malformed("truncated item header"))? as usize;
        let flags = le_u32(data, offset + 4).ok_or_else(|| malformed("truncated item header"))?;
        offset += 8;

        let key_len = data
            .get(offset..)
            .and_then(|rest| rest.iter().position(|byte| *byte == 0))
            .ok_or_else(|| malformed("unterminated item key"))?;
        let key = String::from_utf8_lossy(&data[offset..offset + key_len]).into_owned();
        offset += key_len + 1;

        let value = offset
            .checked_add(value_len)
            .and_then(|end| data.get(offset..end))
            .ok_or_else(|| malformed(format!("value of `{key}` out of bounds")))?;
        offset += value_len;

        tags.push((key, item_value(flags, value)));
    }

    Ok(tags)
}

fn item_value(flags: u32, value: &[u8]) -> String {
    match (flags >> 1) & 0b11 {
        1 => format!("<binary, {} bytes>", value.len()),
        _ => String::from_utf8_lossy(value)
            .split('\0')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Etiqueta APEv2 serializada (ítems + pie), para fixtures de pruebas.
#[cfg(test)]
pub(super) fn encode_tag(items: &[(&str, &[u8], u32)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (key, value, flags) in items {
        body.extend_from_slice(&(value.len() as u32).to_le_bytes());
        body.extend_from_slice(&flags.to_le_bytes());
        body.extend_from_slice(key.as_bytes());
        body.push(0);
        body.extend_from_slice(value);
    }
    let mut footer = b"APETAGEX".to_vec();
    footer.extend_from_slice(&2000_u32.to_le_bytes());
    footer.extend_from_slice(&((body.len() + 32) as u32).to_le_bytes());
    footer.extend_from_slice(&(items.len() as u32).to_le_bytes());
    footer.extend_from_slice(&0_u32.to_le_bytes());
    footer.extend_from_slice(&[0; 8]);
    body.extend_from_slice(&footer);
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_text_and_binary_items() -> Result<(), MediaError> {
        let mut data = vec![0xAA; 40];
        data.extend_from_slice(&encode_tag(&[
            ("Artist", b"Ana\0Luis".as_slice(), 0),
            ("Cover Art (Front)", [1_u8, 2, 3].as_slice(), 0b010),
        ]));

        let tags = read_tags(&mut Cursor::new(data))?;
        assert_eq!(
            tags,
            vec![
                ("Artist".to_string(), "Ana, Luis".to_string()),
                ("Cover Art (Front)".to_string(), "<binary, 3 bytes>".to_string()),
            ]
        );
        Ok(())
    }

    #[test]
    fn skips_trailing_id3v1() -> Result<(), MediaError> {
        let mut data = encode_tag(&[("Title", b"Ruta".as_slice(), 0)]);
        let mut id3v1 = b"TAG".to_vec();
        id3v1.resize(128, 0);
        data.extend_from_slice(&id3v1);

        let tags = read_tags(&mut Cursor::new(data))?;
        assert_eq!(tags, vec![("Title".to_string(), "Ruta".to_string())]);
        Ok(())
    }

    #[test]
    fn missing_tag_yields_nothing() -> Result<(), MediaError> {
        let tags = read_tags(&mut Cursor::new(vec![0_u8; 10]))?;
        assert!(tags.is_empty());
        Ok(())
    }

    #[test]
    fn oversized_tag_is_malformed() {
        let mut data = encode_tag(&[("Title", b"x".as_slice(), 0)]);
        let footer_start = data.len() - 32;
        data[footer_start + 12..footer_start + 16].copy_from_slice(&9_999_u32.to_le_bytes());
        assert!(matches!(
            read_tags(&mut Cursor::new(data)),
            Err(MediaError::Malformed { .. })
        ));
    }
}
