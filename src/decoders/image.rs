//! Extracción de metadata de imágenes: contenedor, información embebida y EXIF.

use image::{ColorType, ImageDecoder as _, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::Decoder;
use super::exif_tags::exif_tag_name;
use crate::error::DecodeError;
use crate::metadata::report::{FieldList, FieldValue, MetadataField};

pub struct ImageDecoder;

impl Decoder for ImageDecoder {
    fn name(&self) -> &'static str {
        "Image"
    }

    fn decode(&self, path: &Path, fields: &mut FieldList) -> Result<(), DecodeError> {
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let format = reader
            .format()
            .ok_or_else(|| DecodeError::invalid("cannot identify image file"))?;
        let decoder = reader.into_decoder()?;
        let (width, height) = decoder.dimensions();
        let color_type = decoder.color_type();
        drop(decoder);

        let mode = if uses_palette(path, format)? {
            "P".to_string()
        } else {
            color_mode(color_type)
        };
        fields.push(MetadataField::new("Image Format", format_name(format)));
        fields.push(MetadataField::new("Image Mode", mode));
        fields.push(MetadataField::new(
            "Image Size",
            format!("{width}x{height} pixels"),
        ));

        for (key, value) in container_info(path, format)? {
            fields.push(MetadataField::new(format!("Image Info: {key}"), value));
        }

        if carries_exif(format) {
            read_exif(path, fields)?;
        }

        Ok(())
    }
}

fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Png => "PNG".to_string(),
        ImageFormat::Jpeg => "JPEG".to_string(),
        ImageFormat::Gif => "GIF".to_string(),
        ImageFormat::WebP => "WEBP".to_string(),
        ImageFormat::Tiff => "TIFF".to_string(),
        ImageFormat::Bmp => "BMP".to_string(),
        ImageFormat::Ico => "ICO".to_string(),
        ImageFormat::Pnm => "PPM".to_string(),
        ImageFormat::Tga => "TGA".to_string(),
        ImageFormat::Avif => "AVIF".to_string(),
        other => format!("{other:?}").to_uppercase(),
    }
}

/// Modo de color en la notación corta habitual (`L`, `RGB`, `I;16`...).
fn color_mode(color: ColorType) -> String {
    match color {
        ColorType::L8 => "L".to_string(),
        ColorType::La8 => "LA".to_string(),
        ColorType::Rgb8 => "RGB".to_string(),
        ColorType::Rgba8 => "RGBA".to_string(),
        ColorType::L16 => "I;16".to_string(),
        ColorType::La16 => "LA;16".to_string(),
        ColorType::Rgb16 => "RGB;16".to_string(),
        ColorType::Rgba16 => "RGBA;16".to_string(),
        ColorType::Rgb32F => "RGB;F".to_string(),
        ColorType::Rgba32F => "RGBA;F".to_string(),
        other => format!("{other:?}"),
    }
}

/// `image` expande las paletas a RGB(A); el tipo original se lee del
/// contenedor.
fn uses_palette(path: &Path, format: ImageFormat) -> Result<bool, DecodeError> {
    Ok(match format {
        ImageFormat::Gif => true,
        ImageFormat::Png => {
            let decoder = png::Decoder::new(BufReader::new(File::open(path)?));
            decoder.read_info()?.info().color_type == png::ColorType::Indexed
        }
        _ => false,
    })
}

fn carries_exif(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Jpeg
            | ImageFormat::Tiff
            | ImageFormat::Png
            | ImageFormat::WebP
            | ImageFormat::Avif
    )
}

/// Pares clave/valor del contenedor. Los bloques binarios (perfil ICC, EXIF
/// crudo) no se incluyen.
fn container_info(
    path: &Path,
    format: ImageFormat,
) -> Result<Vec<(String, FieldValue)>, DecodeError> {
    match format {
        ImageFormat::Png => png_info(path),
        ImageFormat::Jpeg => {
            let mut reader = BufReader::new(File::open(path)?);
            Ok(jpeg_info(&mut reader)?)
        }
        ImageFormat::Gif => gif_info(path),
        _ => Ok(Vec::new()),
    }
}

fn png_info(path: &Path) -> Result<Vec<(String, FieldValue)>, DecodeError> {
    let decoder = png::Decoder::new(BufReader::new(File::open(path)?));
    let reader = decoder.read_info()?;
    let info = reader.info();
    let mut entries = Vec::new();

    if let Some(dims) = info.pixel_dims
        && matches!(dims.unit, png::Unit::Meter)
    {
        let x = (f64::from(dims.xppu) * 0.0254).round() as i64;
        let y = (f64::from(dims.yppu) * 0.0254).round() as i64;
        entries.push(("dpi".to_string(), FieldValue::text(format!("({x}, {y})"))));
    }
    if info.interlaced {
        entries.push(("interlace".to_string(), FieldValue::Integer(1)));
    }
    for chunk in &info.uncompressed_latin1_text {
        entries.push((chunk.keyword.clone(), FieldValue::text(chunk.text.clone())));
    }
    for chunk in &info.compressed_latin1_text {
        if let Ok(text) = chunk.get_text() {
            entries.push((chunk.keyword.clone(), FieldValue::text(text)));
        }
    }
    for chunk in &info.utf8_text {
        if let Ok(text) = chunk.get_text() {
            entries.push((chunk.keyword.clone(), FieldValue::text(text)));
        }
    }

    Ok(entries)
}

/// Recorre los segmentos JPEG hasta el inicio de los datos de imagen.
fn jpeg_info<R: Read>(reader: &mut R) -> std::io::Result<Vec<(String, FieldValue)>> {
    let mut entries = Vec::new();
    let mut soi = [0_u8; 2];
    reader.read_exact(&mut soi)?;
    if soi != [0xFF, 0xD8] {
        return Ok(entries);
    }

    loop {
        let mut byte = [0_u8; 1];
        reader.read_exact(&mut byte)?;
        if byte[0] != 0xFF {
            break;
        }
        let mut marker = 0xFF;
        while marker == 0xFF {
            reader.read_exact(&mut byte)?;
            marker = byte[0];
        }
        if marker == 0xD9 || marker == 0xDA {
            break;
        }
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            continue;
        }

        let mut length = [0_u8; 2];
        reader.read_exact(&mut length)?;
        let length = u16::from_be_bytes(length) as usize;
        if length < 2 {
            break;
        }
        let mut payload = vec![0_u8; length - 2];
        reader.read_exact(&mut payload)?;

        match marker {
            0xE0 if payload.len() >= 12 && payload.starts_with(b"JFIF\0") => {
                let unit = payload[7];
                let x = u16::from_be_bytes([payload[8], payload[9]]);
                let y = u16::from_be_bytes([payload[10], payload[11]]);
                entries.push((
                    "jfif".to_string(),
                    FieldValue::Integer(i64::from(u16::from_be_bytes([payload[5], payload[6]]))),
                ));
                entries.push((
                    "jfif_version".to_string(),
                    FieldValue::text(format!("({}, {})", payload[5], payload[6])),
                ));
                entries.push(("jfif_unit".to_string(), FieldValue::Integer(i64::from(unit))));
                entries.push((
                    "jfif_density".to_string(),
                    FieldValue::text(format!("({x}, {y})")),
                ));
                match unit {
                    1 => entries.push(("dpi".to_string(), FieldValue::text(format!("({x}, {y})")))),
                    2 => {
                        let dx = (f64::from(x) * 2.54).round() as i64;
                        let dy = (f64::from(y) * 2.54).round() as i64;
                        entries.push(("dpi".to_string(), FieldValue::text(format!("({dx}, {dy})"))));
                    }
                    _ => {}
                }
            }
            0xEE if payload.len() >= 12 && payload.starts_with(b"Adobe") => {
                let version = u16::from_be_bytes([payload[5], payload[6]]);
                entries.push(("adobe".to_string(), FieldValue::Integer(i64::from(version))));
                entries.push((
                    "adobe_transform".to_string(),
                    FieldValue::Integer(i64::from(payload[11])),
                ));
            }
            0xFE => {
                entries.push((
                    "comment".to_string(),
                    FieldValue::text(String::from_utf8_lossy(&payload).into_owned()),
                ));
            }
            0xC2 => {
                entries.push(("progressive".to_string(), FieldValue::Integer(1)));
                entries.push(("progression".to_string(), FieldValue::Integer(1)));
            }
            _ => {}
        }
    }

    Ok(entries)
}

fn gif_info(path: &Path) -> Result<Vec<(String, FieldValue)>, DecodeError> {
    let mut header = [0_u8; 13];
    File::open(path)?.read_exact(&mut header)?;
    Ok(vec![
        (
            "version".to_string(),
            FieldValue::text(String::from_utf8_lossy(&header[..6]).into_owned()),
        ),
        ("background".to_string(), FieldValue::Integer(i64::from(header[11]))),
    ])
}

fn read_exif(path: &Path, fields: &mut FieldList) -> Result<(), DecodeError> {
    let mut bufreader = BufReader::new(File::open(path)?);
    let exif = match exif::Reader::new().read_from_container(&mut bufreader) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(()),
        Err(other) => return Err(other.into()),
    };

    for field in exif.fields().filter(|field| field.ifd_num == exif::In::PRIMARY) {
        let name = exif_tag_name(field.tag.context(), field.tag.number());
        fields.push(MetadataField::new(format!("EXIF: {name}"), exif_value(field)));
    }

    Ok(())
}

fn exif_value(field: &exif::Field) -> FieldValue {
    use exif::Value;

    match &field.value {
        Value::Ascii(parts) => FieldValue::text(
            parts
                .iter()
                .map(|part| decode_exif_bytes(part))
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Byte(bytes) | Value::Undefined(bytes, _) => {
            FieldValue::text(decode_exif_bytes(bytes))
        }
        Value::Short(values) if values.len() == 1 => FieldValue::Integer(i64::from(values[0])),
        Value::Long(values) if values.len() == 1 => FieldValue::Integer(i64::from(values[0])),
        _ => FieldValue::text(field.display_value().to_string()),
    }
}

/// Bytes como UTF-8; las secuencias inválidas se reemplazan por U+FFFD.
pub(crate) fn decode_exif_bytes(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// TIFF mínimo con Make, XPTitle (bytes con UTF-8 inválido) y una
    /// etiqueta desconocida.
    fn tiff_block() -> Vec<u8> {
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"II*\0");
        tiff.extend_from_slice(&8_u32.to_le_bytes());
        tiff.extend_from_slice(&3_u16.to_le_bytes());
        // Make, ASCII, 6 bytes en el offset 50
        tiff.extend_from_slice(&0x010F_u16.to_le_bytes());
        tiff.extend_from_slice(&2_u16.to_le_bytes());
        tiff.extend_from_slice(&6_u32.to_le_bytes());
        tiff.extend_from_slice(&50_u32.to_le_bytes());
        // XPTitle, BYTE, 6 bytes en el offset 56
        tiff.extend_from_slice(&0x9C9B_u16.to_le_bytes());
        tiff.extend_from_slice(&1_u16.to_le_bytes());
        tiff.extend_from_slice(&6_u32.to_le_bytes());
        tiff.extend_from_slice(&56_u32.to_le_bytes());
        // Etiqueta desconocida, SHORT = 7
        tiff.extend_from_slice(&0xC7A1_u16.to_le_bytes());
        tiff.extend_from_slice(&3_u16.to_le_bytes());
        tiff.extend_from_slice(&1_u32.to_le_bytes());
        tiff.extend_from_slice(&7_u32.to_le_bytes());
        tiff.extend_from_slice(&0_u32.to_le_bytes());
        assert_eq!(tiff.len(), 50);
        tiff.extend_from_slice(b"Canon\0");
        tiff.extend_from_slice(&[b'H', b'i', 0xFF, b'o', b'k', 0]);
        tiff
    }

    fn write_jpeg_with_exif(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let plain = path.with_extension("plain.jpg");
        RgbImage::from_pixel(8, 6, Rgb([200, 40, 40])).save(&plain)?;
        let encoded = std::fs::read(&plain)?;

        let tiff = tiff_block();
        let mut segment = vec![0xFF, 0xE1];
        segment.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
        segment.extend_from_slice(b"Exif\0\0");
        segment.extend_from_slice(&tiff);

        let mut output = encoded[..2].to_vec();
        output.extend_from_slice(&segment);
        output.extend_from_slice(&encoded[2..]);
        std::fs::write(path, output)?;
        Ok(())
    }

    fn value_of<'a>(fields: &'a FieldList, label: &str) -> Option<&'a FieldValue> {
        fields.iter().find(|f| f.label == label).map(|f| &f.value)
    }

    #[test]
    fn reports_png_basics() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("tiny.png");
        RgbImage::new(4, 3).save(&path)?;

        let output = ImageDecoder.extract(&path);
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        assert_eq!(output.fields[0], MetadataField::new("Image Format", "PNG"));
        assert_eq!(output.fields[1], MetadataField::new("Image Mode", "RGB"));
        assert_eq!(output.fields[2], MetadataField::new("Image Size", "4x3 pixels"));
        assert!(!output.fields.iter().any(|f| f.label.starts_with("EXIF:")));
        Ok(())
    }

    #[test]
    fn palette_png_reports_p_mode() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("paleta.png");
        let mut encoder = png::Encoder::new(File::create(&path)?, 2, 2);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_palette(vec![0, 0, 0, 255, 255, 255]);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&[0, 1, 1, 0])?;
        writer.finish()?;

        let output = ImageDecoder.extract(&path);
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        assert_eq!(output.fields[1], MetadataField::new("Image Mode", "P"));
        assert_eq!(output.fields[2], MetadataField::new("Image Size", "2x2 pixels"));
        Ok(())
    }

    #[test]
    fn gif_reports_p_mode() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("anim.gif");
        RgbImage::from_pixel(3, 3, Rgb([10, 20, 30])).save(&path)?;

        let output = ImageDecoder.extract(&path);
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        assert_eq!(output.fields[0], MetadataField::new("Image Format", "GIF"));
        assert_eq!(output.fields[1], MetadataField::new("Image Mode", "P"));
        Ok(())
    }

    #[test]
    fn decodes_exif_table() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("camera.jpg");
        write_jpeg_with_exif(&path)?;

        let output = ImageDecoder.extract(&path);
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        assert_eq!(value_of(&output.fields, "Image Format"), Some(&FieldValue::text("JPEG")));
        assert_eq!(value_of(&output.fields, "Image Size"), Some(&FieldValue::text("8x6 pixels")));
        assert_eq!(value_of(&output.fields, "EXIF: Make"), Some(&FieldValue::text("Canon")));
        assert_eq!(
            value_of(&output.fields, "EXIF: XPTitle"),
            Some(&FieldValue::text("Hi\u{FFFD}ok"))
        );
        assert_eq!(value_of(&output.fields, "EXIF: 51105"), Some(&FieldValue::Integer(7)));

        let info_index = output
            .fields
            .iter()
            .position(|f| f.label.starts_with("Image Info:"))
            .expect("campos de contenedor");
        let exif_index = output
            .fields
            .iter()
            .position(|f| f.label.starts_with("EXIF:"))
            .expect("campos EXIF");
        assert!(info_index < exif_index);
        Ok(())
    }

    #[test]
    fn jpeg_segments_yield_jfif_info() -> Result<(), Box<dyn std::error::Error>> {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        data.extend_from_slice(b"JFIF\0");
        data.extend_from_slice(&[1, 2, 1, 0, 72, 0, 72, 0, 0]);
        data.extend_from_slice(&[0xFF, 0xFE, 0x00, 0x07]);
        data.extend_from_slice(b"hola\xFF");
        data.extend_from_slice(&[0xFF, 0xDA]);

        let entries = jpeg_info(&mut data.as_slice())?;
        let lookup = |key: &str| entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
        assert_eq!(lookup("jfif_version"), Some(FieldValue::text("(1, 2)")));
        assert_eq!(lookup("dpi"), Some(FieldValue::text("(72, 72)")));
        assert_eq!(lookup("comment"), Some(FieldValue::text("hola\u{FFFD}")));
        Ok(())
    }

    #[test]
    fn non_image_content_is_a_soft_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("fake.png");
        std::fs::write(&path, b"definitely not pixels")?;

        let output = ImageDecoder.extract(&path);
        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.fields.last().map(|f| f.label.as_str()), Some("Error (Image Metadata)"));
        Ok(())
    }

    #[test]
    fn exif_bytes_replace_invalid_sequences() {
        assert_eq!(decode_exif_bytes(b"abc\0\0"), "abc");
        assert_eq!(decode_exif_bytes(&[0x61, 0xC3, 0x28]), "a\u{FFFD}(");
    }
}
