//! Clasificación del formato de un archivo.
//!
//! La clasificación es total: cualquier entrada desconocida termina en
//! [`FormatKind::Generic`], de modo que siempre existe un decodificador.

use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use super::mime::{
    DOCX_MIME, OCTET_STREAM, PDF_MIME, PPTX_MIME, XLSX_MIME, mime_from_content,
    mime_from_extension, office_mime_from_extension,
};
use super::report::ExtractionOptions;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum FormatKind {
    Image,
    AudioVideo,
    Pdf,
    WordDocument,
    Spreadsheet,
    Presentation,
    Generic,
}

impl FormatKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::AudioVideo => "Audio/Video",
            Self::Pdf => "PDF",
            Self::WordDocument => "Word Document",
            Self::Spreadsheet => "Excel Spreadsheet",
            Self::Presentation => "PowerPoint Presentation",
            Self::Generic => "Generic",
        }
    }

    /// Categoría a partir de un MIME: prefijo para medios, igualdad exacta
    /// para documentos.
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("audio/") || mime.starts_with("video/") {
            Self::AudioVideo
        } else {
            match mime {
                PDF_MIME => Self::Pdf,
                DOCX_MIME => Self::WordDocument,
                XLSX_MIME => Self::Spreadsheet,
                PPTX_MIME => Self::Presentation,
                _ => Self::Generic,
            }
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Selector manual del tipo de archivo.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub enum TypeOverride {
    #[default]
    AutoDetect,
    Image,
    AudioVideo,
    Pdf,
    WordDocument,
    Spreadsheet,
    Presentation,
    Generic,
}

impl TypeOverride {
    pub const ALL: [TypeOverride; 8] = [
        Self::AutoDetect,
        Self::Image,
        Self::AudioVideo,
        Self::Pdf,
        Self::WordDocument,
        Self::Spreadsheet,
        Self::Presentation,
        Self::Generic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::AutoDetect => "Auto-Detect",
            Self::Image => "Image",
            Self::AudioVideo => "Audio/Video",
            Self::Pdf => "PDF",
            Self::WordDocument => "Word Document (DOCX)",
            Self::Spreadsheet => "Excel Spreadsheet (XLSX)",
            Self::Presentation => "PowerPoint Presentation (PPTX)",
            Self::Generic => "Generic",
        }
    }

    /// `None` para `Auto-Detect`.
    pub fn kind(self) -> Option<FormatKind> {
        match self {
            Self::AutoDetect => None,
            Self::Image => Some(FormatKind::Image),
            Self::AudioVideo => Some(FormatKind::AudioVideo),
            Self::Pdf => Some(FormatKind::Pdf),
            Self::WordDocument => Some(FormatKind::WordDocument),
            Self::Spreadsheet => Some(FormatKind::Spreadsheet),
            Self::Presentation => Some(FormatKind::Presentation),
            Self::Generic => Some(FormatKind::Generic),
        }
    }
}

impl fmt::Display for TypeOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
#[error("unknown file type selector `{0}`")]
pub struct UnknownTypeOverride(String);

impl FromStr for TypeOverride {
    type Err = UnknownTypeOverride;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        if let Some(found) = Self::ALL
            .iter()
            .find(|candidate| candidate.label().to_lowercase() == normalized)
        {
            return Ok(*found);
        }

        match normalized.as_str() {
            "auto" | "autodetect" => Ok(Self::AutoDetect),
            "av" | "audio" | "video" => Ok(Self::AudioVideo),
            "docx" | "word" => Ok(Self::WordDocument),
            "xlsx" | "excel" => Ok(Self::Spreadsheet),
            "pptx" | "powerpoint" => Ok(Self::Presentation),
            _ => Err(UnknownTypeOverride(input.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum ClassificationSource {
    Override,
    Extension,
    OfficeContainer,
    Content,
    Default,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FormatClassification {
    pub kind: FormatKind,
    /// MIME detectado, solo con fines de diagnóstico.
    pub mime: String,
    pub source: ClassificationSource,
}

pub fn classify(path: &Path, manual: TypeOverride) -> FormatClassification {
    classify_with(path, manual, &ExtractionOptions::default())
}

pub fn classify_with(
    path: &Path,
    manual: TypeOverride,
    options: &ExtractionOptions,
) -> FormatClassification {
    let (mime, source) = detect_mime(path);

    if let Some(kind) = manual.kind() {
        debug!(path = %path.display(), %kind, "clasificación forzada manualmente");
        return FormatClassification {
            kind,
            mime: mime.to_string(),
            source: ClassificationSource::Override,
        };
    }

    if source == ClassificationSource::Default
        && options.sniff_content
        && let Some(sniffed) = mime_from_content(path)
    {
        let kind = FormatKind::from_mime(&sniffed);
        debug!(path = %path.display(), mime = %sniffed, %kind, "clasificación por contenido");
        return FormatClassification {
            kind,
            mime: sniffed,
            source: ClassificationSource::Content,
        };
    }

    let kind = FormatKind::from_mime(mime);
    debug!(path = %path.display(), %mime, %kind, "clasificación por extensión");
    FormatClassification {
        kind,
        mime: mime.to_string(),
        source,
    }
}

fn detect_mime(path: &Path) -> (&'static str, ClassificationSource) {
    if let Some(mime) = mime_from_extension(path) {
        return (mime, ClassificationSource::Extension);
    }
    if let Some(mime) = office_mime_from_extension(path) {
        return (mime, ClassificationSource::OfficeContainer);
    }
    (OCTET_STREAM, ClassificationSource::Default)
}
