//! Tipos de error de la biblioteca.
//!
//! Solo [`ExtractError`] llega al llamador. Los [`DecodeError`] se quedan en el
//! límite de cada decodificador y se convierten en errores suaves del reporte.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::decoders::media::MediaError;

/// Fallo de precondición: la extracción no llega a empezar.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Please select a valid file first: `{}` does not exist", .0.display())]
    PathNotFound(PathBuf),
}

/// Fallo dentro de un decodificador concreto.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Image(#[from] image::ImageError),

    #[error("{0}")]
    Png(#[from] png::DecodingError),

    #[error("{0}")]
    Exif(#[from] exif::Error),

    #[error("{0}")]
    Pdf(#[from] lopdf::Error),

    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("{0}")]
    Xml(#[from] xmltree::ParseError),

    #[error("{0}")]
    Media(#[from] MediaError),

    #[error("{0}")]
    Invalid(String),
}

impl DecodeError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}
