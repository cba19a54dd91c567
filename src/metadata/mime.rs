//! Detección de tipos MIME por extensión y, opcionalmente, por contenido.

use infer::Infer;
use std::path::Path;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Tabla estática extensión → MIME. Las extensiones Office Open XML quedan
/// fuera a propósito: se resuelven con [`OFFICE_CONTAINERS`].
static EXTENSION_MIME_TYPES: &[(&str, &str)] = &[
    // Imágenes
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("jpe", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("webp", "image/webp"),
    ("ico", "image/vnd.microsoft.icon"),
    ("avif", "image/avif"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
    ("tga", "image/x-tga"),
    ("pnm", "image/x-portable-anymap"),
    ("pbm", "image/x-portable-bitmap"),
    ("pgm", "image/x-portable-graymap"),
    ("ppm", "image/x-portable-pixmap"),
    ("qoi", "image/qoi"),
    ("svg", "image/svg+xml"),
    // Audio
    ("mp3", "audio/mpeg"),
    ("flac", "audio/flac"),
    ("ogg", "audio/ogg"),
    ("oga", "audio/ogg"),
    ("opus", "audio/opus"),
    ("m4a", "audio/mp4"),
    ("aac", "audio/aac"),
    ("wav", "audio/x-wav"),
    ("aif", "audio/x-aiff"),
    ("aiff", "audio/x-aiff"),
    ("aifc", "audio/x-aiff"),
    ("wma", "audio/x-ms-wma"),
    ("wv", "audio/x-wavpack"),
    ("tta", "audio/x-tta"),
    ("ape", "audio/x-ape"),
    ("mpc", "audio/x-musepack"),
    ("ofr", "audio/x-optimfrog"),
    ("mid", "audio/midi"),
    ("midi", "audio/midi"),
    // Video
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("mov", "video/quicktime"),
    ("qt", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
    ("wmv", "video/x-ms-wmv"),
    ("asf", "video/x-ms-asf"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("3gp", "video/3gpp"),
    ("flv", "video/x-flv"),
    ("ogv", "video/ogg"),
    // Documentos
    ("pdf", PDF_MIME),
    ("doc", "application/msword"),
    ("xls", "application/vnd.ms-excel"),
    ("ppt", "application/vnd.ms-powerpoint"),
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("ods", "application/vnd.oasis.opendocument.spreadsheet"),
    ("odp", "application/vnd.oasis.opendocument.presentation"),
    ("rtf", "application/rtf"),
    ("txt", "text/plain"),
    ("csv", "text/csv"),
    ("md", "text/markdown"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("xml", "text/xml"),
    ("json", "application/json"),
    // Contenedores
    ("zip", "application/zip"),
    ("tar", "application/x-tar"),
    ("gz", "application/gzip"),
    ("7z", "application/x-7z-compressed"),
];

/// Contenedores Office que el primer mapa no conoce.
static OFFICE_CONTAINERS: &[(&str, &str)] = &[
    ("docx", DOCX_MIME),
    ("xlsx", XLSX_MIME),
    ("pptx", PPTX_MIME),
];

/// Extensión en minúsculas, sin el punto.
pub fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = lowercase_extension(path)?;
    lookup(EXTENSION_MIME_TYPES, &ext)
}

pub fn office_mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = lowercase_extension(path)?;
    lookup(OFFICE_CONTAINERS, &ext)
}

fn lookup(table: &[(&str, &'static str)], ext: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, mime)| *mime)
}

/// Intenta detectar el tipo MIME del archivo a partir de su contenido.
pub fn mime_from_content(path: &Path) -> Option<String> {
    let infer = Infer::new();
    infer
        .get_from_path(path)
        .ok()
        .flatten()
        .map(|kind| kind.mime_type().to_string())
}
