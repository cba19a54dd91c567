//! Modelo de reporte, clasificación y orquestación de la extracción.

pub mod export;
pub mod extract;
pub mod general;
mod hashing;
pub(crate) mod mime;
pub mod normalize;
pub mod output;
mod permissions;
pub mod report;
pub mod sniffer;


pub use export::{ExportFormat, export, export_all, to_json, to_text};
pub use extract::{run, run_with};
pub use report::{
    ExtractionError, ExtractionOptions, ExtractionResult, FieldList, FieldValue, MetadataField,
};
pub use sniffer::{FormatClassification, FormatKind, TypeOverride, classify, classify_with};
