//! Decodificadores por formato y registro que los asocia a cada clasificación.

mod exif_tags;
pub mod image;
pub mod media;
pub mod office;
pub mod pdf;

use std::path::Path;
use tracing::{debug, warn};

use crate::error::DecodeError;
use crate::metadata::report::{FieldList, StageOutput};
use crate::metadata::sniffer::FormatKind;

pub use self::image::ImageDecoder;
pub use self::media::AudioVideoDecoder;
pub use self::office::{PresentationDecoder, SpreadsheetDecoder, WordDecoder};
pub use self::pdf::PdfDecoder;

/// Contrato común: cada decodificador conoce un contenedor y un esquema fijo.
pub trait Decoder: Sync {
    /// Nombre de la etapa usado en `Error (<nombre> Metadata)`.
    fn name(&self) -> &'static str;

    /// Agrega propiedades a `fields`. Lo ya agregado se conserva aunque
    /// después se devuelva un error.
    fn decode(&self, path: &Path, fields: &mut FieldList) -> Result<(), DecodeError>;

    fn extract(&self, path: &Path) -> StageOutput {
        let mut output = StageOutput::new();
        debug!(decoder = self.name(), path = %path.display(), "decodificando");
        if let Err(error) = self.decode(path, &mut output.fields) {
            warn!(decoder = self.name(), path = %path.display(), %error, "decodificación parcial");
            output.record_error(self.name(), error.to_string());
        }
        output
    }
}

/// Solo atributos del sistema de archivos.
pub struct GenericDecoder;

impl Decoder for GenericDecoder {
    fn name(&self) -> &'static str {
        "Generic"
    }

    fn decode(&self, _path: &Path, _fields: &mut FieldList) -> Result<(), DecodeError> {
        Ok(())
    }
}

pub fn decoder_for(kind: FormatKind) -> &'static dyn Decoder {
    match kind {
        FormatKind::Image => &ImageDecoder,
        FormatKind::AudioVideo => &AudioVideoDecoder,
        FormatKind::Pdf => &PdfDecoder,
        FormatKind::WordDocument => &WordDecoder,
        FormatKind::Spreadsheet => &SpreadsheetDecoder,
        FormatKind::Presentation => &PresentationDecoder,
        FormatKind::Generic => &GenericDecoder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_its_decoder() {
        let expected = [
            (FormatKind::Image, "Image"),
            (FormatKind::AudioVideo, "Audio/Video"),
            (FormatKind::Pdf, "PDF"),
            (FormatKind::WordDocument, "DOCX"),
            (FormatKind::Spreadsheet, "XLSX"),
            (FormatKind::Presentation, "PPTX"),
            (FormatKind::Generic, "Generic"),
        ];
        for (kind, name) in expected {
            assert_eq!(decoder_for(kind).name(), name);
        }
    }

    #[test]
    fn generic_decoder_adds_nothing() {
        let output = decoder_for(FormatKind::Generic).extract(Path::new("/no/existe"));
        assert!(output.fields.is_empty());
        assert!(output.errors.is_empty());
    }

    struct FailingDecoder;

    impl Decoder for FailingDecoder {
        fn name(&self) -> &'static str {
            "Test"
        }

        fn decode(&self, _path: &Path, fields: &mut FieldList) -> Result<(), DecodeError> {
            fields.push(crate::metadata::report::MetadataField::new("Test: First", "ok"));
            Err(DecodeError::invalid("truncated"))
        }
    }

    #[test]
    fn failure_keeps_collected_fields() {
        let output = FailingDecoder.extract(Path::new("x"));
        assert_eq!(output.fields.len(), 2);
        assert_eq!(output.fields[0].label, "Test: First");
        assert_eq!(output.fields[1].label, "Error (Test Metadata)");
        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.errors[0].message, "truncated");
    }
}
