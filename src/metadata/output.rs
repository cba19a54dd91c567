//! Presentación en texto plano de un resultado de extracción.

use std::fmt::Write;

use super::report::{ExtractionResult, MetadataField};
use crate::formatting::format_field_line;

pub const END_MARKER: &str = "--- End of Metadata ---";

/// Encabezado con el nombre del archivo y la categoría activa.
pub fn header_lines(result: &ExtractionResult) -> [String; 2] {
    let name = result
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| result.path.display().to_string());
    [
        format!("--- Metadata for: {name} ---"),
        format!("--- Category: {} ---", result.classification.kind.label()),
    ]
}

/// Una línea por propiedad; `Null` se muestra como `N/A`.
pub fn field_line(field: &MetadataField) -> String {
    format_field_line(&field.label, &field.value.to_string())
}

pub fn render_text(result: &ExtractionResult) -> String {
    let mut output = String::new();
    for line in header_lines(result) {
        let _ = writeln!(output, "{line}");
    }
    output.push('\n');
    for field in &result.fields {
        let _ = writeln!(output, "{}", field_line(field));
    }
    output.push('\n');
    output.push_str(END_MARKER);
    output.push('\n');
    output
}
