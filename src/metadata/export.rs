//! Exportación de resultados de extracción en distintos formatos.

use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

use super::output::render_text;
use super::report::ExtractionResult;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub enum ExportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Error)]
#[error("unknown output format `{0}` (expected `text` or `json`)")]
pub struct UnknownExportFormat(String);

impl FromStr for ExportFormat {
    type Err = UnknownExportFormat;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "text" | "txt" => Ok(ExportFormat::Text),
            "json" => Ok(ExportFormat::Json),
            _ => Err(UnknownExportFormat(input.to_string())),
        }
    }
}

pub fn to_json(result: &ExtractionResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result)
}

pub fn to_text(result: &ExtractionResult) -> String {
    render_text(result)
}

pub fn export(result: &ExtractionResult, format: ExportFormat) -> Result<String, serde_json::Error> {
    match format {
        ExportFormat::Text => Ok(to_text(result)),
        ExportFormat::Json => to_json(result),
    }
}

/// Varios resultados en un solo documento: bloques de texto separados por una
/// línea en blanco, o un arreglo JSON. Un único resultado se exporta igual que
/// con [`export`].
pub fn export_all(
    results: &[ExtractionResult],
    format: ExportFormat,
) -> Result<String, serde_json::Error> {
    match (format, results) {
        (_, [single]) => export(single, format),
        (ExportFormat::Text, _) => Ok(results
            .iter()
            .map(|result| to_text(result).trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n\n")),
        (ExportFormat::Json, _) => serde_json::to_string_pretty(results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::report::{ExtractionError, FieldValue, MetadataField};
    use crate::metadata::sniffer::{ClassificationSource, FormatClassification, FormatKind};
    use std::path::PathBuf;

    #[test]
    fn parses_format_names() {
        assert_eq!("JSON".parse::<ExportFormat>().ok(), Some(ExportFormat::Json));
        assert_eq!("txt".parse::<ExportFormat>().ok(), Some(ExportFormat::Text));
        assert!("xml".parse::<ExportFormat>().is_err());
    }

    fn sample(path: &str) -> ExtractionResult {
        ExtractionResult {
            path: PathBuf::from(path),
            classification: FormatClassification {
                kind: FormatKind::Generic,
                mime: "application/octet-stream".to_string(),
                source: ClassificationSource::Extension,
            },
            fields: vec![MetadataField::new("File Size", "3 B (3 bytes)")],
            errors: Vec::new(),
        }
    }

    #[test]
    fn several_results_form_one_json_array() -> Result<(), Box<dyn std::error::Error>> {
        let results = [sample("a.bin"), sample("b.bin")];

        let value: serde_json::Value =
            serde_json::from_str(&export_all(&results, ExportFormat::Json)?)?;
        let items = value.as_array().ok_or("se esperaba un arreglo")?;
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["path"], "b.bin");

        let single: serde_json::Value =
            serde_json::from_str(&export_all(&results[..1], ExportFormat::Json)?)?;
        assert!(single.is_object());
        Ok(())
    }

    #[test]
    fn several_text_results_are_separated_by_a_blank_line() -> Result<(), Box<dyn std::error::Error>> {
        let results = [sample("a.bin"), sample("b.bin")];
        let text = export_all(&results, ExportFormat::Text)?;
        let first = to_text(&results[0]);
        assert!(text.starts_with(&format!("{}\n\n", first.trim_end())));
        assert!(text.ends_with(to_text(&results[1]).trim_end()));
        Ok(())
    }

    #[test]
    fn json_keeps_types_and_nulls() -> Result<(), Box<dyn std::error::Error>> {
        let error = ExtractionError::new("PDF", "unexpected end of file");
        let result = ExtractionResult {
            path: PathBuf::from("roto.pdf"),
            classification: FormatClassification {
                kind: FormatKind::Pdf,
                mime: "application/pdf".to_string(),
                source: ClassificationSource::Extension,
            },
            fields: vec![
                MetadataField::new("PDF: Title", FieldValue::Null),
                MetadataField::new("PDF: Number of Pages", 3_i64),
                error.as_field(),
            ],
            errors: vec![error],
        };

        let value: serde_json::Value = serde_json::from_str(&to_json(&result)?)?;
        assert_eq!(value["classification"]["kind"], "Pdf");
        assert_eq!(value["fields"][0]["value"], serde_json::Value::Null);
        assert_eq!(value["fields"][1]["value"], 3);
        assert_eq!(value["fields"][2]["label"], "Error (PDF Metadata)");
        assert_eq!(value["errors"][0]["stage"], "PDF");
        Ok(())
    }
}
