//! Extracción de metadata en PDFs mediante lectura del diccionario Info.

use lopdf::{Dictionary, Document, Object};
use std::path::Path;

use super::Decoder;
use crate::error::DecodeError;
use crate::metadata::report::{FieldList, FieldValue, MetadataField};

/// Referencias encadenadas que se siguen antes de desistir.
const MAX_REFERENCE_DEPTH: usize = 8;

pub struct PdfDecoder;

impl Decoder for PdfDecoder {
    fn name(&self) -> &'static str {
        "PDF"
    }

    fn decode(&self, path: &Path, fields: &mut FieldList) -> Result<(), DecodeError> {
        let doc = Document::load(path)?;

        if let Ok(info) = doc.trailer.get(b"Info")
            && let Some(dict) = deref_dictionary(&doc, info)
        {
            for (key, value) in dict.iter() {
                let key = String::from_utf8_lossy(key).replace('/', "");
                fields.push(MetadataField::new(
                    format!("PDF: {key}"),
                    object_value(&doc, value, 0),
                ));
            }
        }

        fields.push(MetadataField::new(
            "PDF: Number of Pages",
            doc.get_pages().len(),
        ));
        Ok(())
    }
}

fn deref_dictionary<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(reference) => doc.get_dictionary(*reference).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn object_value(doc: &Document, obj: &Object, depth: usize) -> FieldValue {
    match obj {
        Object::String(bytes, _) => FieldValue::text(decode_text_string(bytes)),
        Object::Name(name) => FieldValue::text(String::from_utf8_lossy(name).into_owned()),
        Object::Integer(value) => FieldValue::Integer(*value),
        Object::Real(value) => FieldValue::text(value.to_string()),
        Object::Boolean(value) => FieldValue::text(value.to_string()),
        Object::Null => FieldValue::Null,
        Object::Reference(reference) if depth < MAX_REFERENCE_DEPTH => doc
            .get_object(*reference)
            .map(|inner| object_value(doc, inner, depth + 1))
            .unwrap_or(FieldValue::Null),
        Object::Array(items) => FieldValue::text(
            items
                .iter()
                .map(|item| object_value(doc, item, depth + 1).to_string())
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => FieldValue::text(format!("<{}>", other.type_name().unwrap_or("object"))),
    }
}

/// Cadenas de texto PDF: UTF-16BE si traen BOM, PDFDocEncoding si no.
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|byte| pdf_doc_char(*byte)).collect()
}

fn pdf_doc_char(byte: u8) -> char {
    const HIGH: [char; 32] = [
        '\u{2022}', '\u{2020}', '\u{2021}', '\u{2026}', '\u{2014}', '\u{2013}', '\u{0192}',
        '\u{2044}', '\u{2039}', '\u{203A}', '\u{2212}', '\u{2030}', '\u{201E}', '\u{201C}',
        '\u{201D}', '\u{2018}', '\u{2019}', '\u{201A}', '\u{2122}', '\u{FB01}', '\u{FB02}',
        '\u{0141}', '\u{0152}', '\u{0160}', '\u{0178}', '\u{017D}', '\u{0131}', '\u{0142}',
        '\u{0153}', '\u{0161}', '\u{017E}', '\u{FFFD}',
    ];
    match byte {
        0x80..=0x9F => HIGH[usize::from(byte - 0x80)],
        0xA0 => '\u{20AC}',
        other => char::from(other),
    }
}

/// PDF mínimo con `pages` páginas y un diccionario Info de ejemplo.
#[cfg(test)]
pub(crate) fn write_sample_pdf(
    path: &Path,
    pages: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    use lopdf::dictionary;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
            })
            .into()
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Report"),
        "Author" => Object::String(
            vec![0xFE, 0xFF, 0x00, 0x41, 0x00, 0x6E, 0x00, 0x61],
            lopdf::StringFormat::Hexadecimal,
        ),
        "Trapped" => false,
        "Revision" => 4_i64,
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_info_dictionary_and_page_count() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("report.pdf");
        write_sample_pdf(&path, 3)?;

        let output = PdfDecoder.extract(&path);
        assert!(output.errors.is_empty(), "{:?}", output.errors);

        let labels: Vec<&str> = output.fields.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(
            labels,
            [
                "PDF: Title",
                "PDF: Author",
                "PDF: Trapped",
                "PDF: Revision",
                "PDF: Number of Pages",
            ]
        );
        assert_eq!(output.fields[0].value, FieldValue::text("Report"));
        assert_eq!(output.fields[1].value, FieldValue::text("Ana"));
        assert_eq!(output.fields[2].value, FieldValue::text("false"));
        assert_eq!(output.fields[3].value, FieldValue::Integer(4));
        assert_eq!(output.fields[4].value, FieldValue::Integer(3));
        Ok(())
    }

    #[test]
    fn non_pdf_content_is_a_soft_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])?;

        let output = PdfDecoder.extract(&path);
        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.errors[0].stage, "PDF");
        assert_eq!(output.fields.len(), 1);
        assert_eq!(output.fields[0].label, "Error (PDF Metadata)");
        Ok(())
    }

    #[test]
    fn pdf_doc_encoding_maps_special_range() {
        assert_eq!(decode_text_string(b"caf\xE9"), "café");
        assert_eq!(decode_text_string(&[0x80, 0x92]), "\u{2022}\u{2122}");
        assert_eq!(decode_text_string(&[0xFE, 0xFF, 0x00, 0xE9]), "é");
    }
}
