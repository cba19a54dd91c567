//! Punto de entrada de la extracción: una ruta y un tipo opcional.

use std::path::Path;
use tracing::{debug, info};

use super::general::collect_general;
use super::normalize::normalize;
use super::report::{ExtractionOptions, ExtractionResult};
use super::sniffer::{TypeOverride, classify_with};
use crate::decoders::decoder_for;
use crate::error::ExtractError;

/// Extrae la metadata con las opciones por defecto.
pub fn run(path: &Path, manual: TypeOverride) -> Result<ExtractionResult, ExtractError> {
    run_with(path, manual, &ExtractionOptions::default())
}

/// Solo falla si la ruta no existe. Cualquier otro problema queda registrado
/// como error suave dentro del resultado.
pub fn run_with(
    path: &Path,
    manual: TypeOverride,
    options: &ExtractionOptions,
) -> Result<ExtractionResult, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::PathNotFound(path.to_path_buf()));
    }

    let general = collect_general(path, options);
    let classification = classify_with(path, manual, options);
    let decoder = decoder_for(classification.kind);
    debug!(
        kind = %classification.kind,
        source = ?classification.source,
        decoder = decoder.name(),
        "despachando"
    );

    let decoded = decoder.extract(path);
    let result = normalize(path, classification, general, decoded);
    info!(
        path = %path.display(),
        fields = result.fields.len(),
        errors = result.errors.len(),
        "metadata extraída"
    );
    Ok(result)
}
