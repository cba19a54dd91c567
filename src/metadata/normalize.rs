//! Unión de la etapa general y la del decodificador en un solo reporte.

use std::path::Path;

use super::report::{ExtractionResult, FieldValue, MetadataField, StageOutput};
use super::sniffer::FormatClassification;

/// Concatena las propiedades en orden (generales primero) y limpia el texto.
/// Los `Null` se conservan y las etiquetas repetidas no se deduplican.
pub fn normalize(
    path: &Path,
    classification: FormatClassification,
    general: StageOutput,
    decoded: StageOutput,
) -> ExtractionResult {
    let fields = general
        .fields
        .into_iter()
        .chain(decoded.fields)
        .map(sanitize_field)
        .collect();
    let errors = general.errors.into_iter().chain(decoded.errors).collect();

    ExtractionResult {
        path: path.to_path_buf(),
        classification,
        fields,
        errors,
    }
}

fn sanitize_field(field: MetadataField) -> MetadataField {
    match field.value {
        FieldValue::Text(text) => MetadataField {
            label: sanitize_text(&field.label),
            value: FieldValue::Text(sanitize_text(&text)),
        },
        value => MetadataField {
            label: sanitize_text(&field.label),
            value,
        },
    }
}

/// Quita los NUL finales y reemplaza los demás caracteres de control
/// (salvo tabulador y salto de línea) por U+FFFD.
pub fn sanitize_text(text: &str) -> String {
    text.trim_end_matches('\0')
        .chars()
        .map(|ch| match ch {
            '\t' | '\n' => ch,
            ch if ch.is_control() => char::REPLACEMENT_CHARACTER,
            ch => ch,
        })
        .collect()
}
