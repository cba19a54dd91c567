//! Modelos compartidos para reportar metadata de manera consistente.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use super::sniffer::FormatClassification;
use crate::formatting::format_timestamp;

/// Valor de una propiedad. `Null` se conserva hasta el momento de mostrarlo.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Timestamp(DateTime<FixedOffset>),
    Null,
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<DateTime<FixedOffset>> for FieldValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Timestamp(value) => f.write_str(&format_timestamp(value)),
            Self::Null => f.write_str("N/A"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetadataField {
    pub label: String,
    pub value: FieldValue,
}

impl MetadataField {
    pub fn new(label: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Lista ordenada de propiedades tal como la produce un decodificador.
pub type FieldList = Vec<MetadataField>;

/// Error suave: degrada una etapa sin abortar la extracción.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExtractionError {
    pub stage: String,
    pub message: String,
}

impl ExtractionError {
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Etiqueta con la que el error aparece entre las propiedades.
    pub fn label(&self) -> String {
        format!("Error ({} Metadata)", self.stage)
    }

    pub fn as_field(&self) -> MetadataField {
        MetadataField::new(self.label(), self.message.clone())
    }
}

/// Propiedades y errores suaves devueltos por una etapa.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StageOutput {
    pub fields: FieldList,
    pub errors: Vec<ExtractionError>,
}

impl StageOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra el error y deja su campo `Error (...)` en la posición actual.
    pub fn record_error(&mut self, stage: &str, message: impl Into<String>) {
        let error = ExtractionError::new(stage, message);
        self.fields.push(error.as_field());
        self.errors.push(error);
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ExtractionResult {
    pub path: PathBuf,
    pub classification: FormatClassification,
    pub fields: FieldList,
    pub errors: Vec<ExtractionError>,
}

impl ExtractionResult {
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|field| field.label == label)
            .map(|field| &field.value)
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct ExtractionOptions {
    /// Agrega los hashes MD5 y SHA-256 a las propiedades generales.
    pub include_hash: bool,
    /// Inspecciona el contenido cuando la extensión no basta para clasificar.
    pub sniff_content: bool,
}
