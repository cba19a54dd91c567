//! Lectura de propiedades en documentos Office Open XML empaquetados en ZIP.
//!
//! Cada formato expone un esquema fijo y ordenado. Las propiedades ausentes o
//! vacías se reportan como `Null`.

use chrono::DateTime;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use xmltree::{Element, XMLNode};
use zip::ZipArchive;
use zip::result::ZipError;

use super::Decoder;
use crate::error::DecodeError;
use crate::metadata::report::{FieldList, FieldValue, MetadataField};

pub const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
pub const CP_NS: &str = "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
pub const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
pub const APP_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties";
pub const PML_NS: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
pub const SML_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

const CORE_PART: &str = "docProps/core.xml";
const APP_PART: &str = "docProps/app.xml";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Part {
    Core,
    App,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Text,
    Integer,
    Timestamp,
}

struct PropertySpec {
    label: &'static str,
    part: Part,
    local_name: &'static str,
    namespace: &'static str,
    kind: Kind,
}

const fn core(
    label: &'static str,
    local_name: &'static str,
    namespace: &'static str,
    kind: Kind,
) -> PropertySpec {
    PropertySpec {
        label,
        part: Part::Core,
        local_name,
        namespace,
        kind,
    }
}

const fn app(label: &'static str, local_name: &'static str) -> PropertySpec {
    PropertySpec {
        label,
        part: Part::App,
        local_name,
        namespace: APP_NS,
        kind: Kind::Text,
    }
}

/// Propiedades comunes de documentos de texto y presentaciones.
const CORE_SCHEMA: [PropertySpec; 15] = [
    core("Title", "title", DC_NS, Kind::Text),
    core("Author", "creator", DC_NS, Kind::Text),
    core("Last Modified By", "lastModifiedBy", CP_NS, Kind::Text),
    core("Revision", "revision", CP_NS, Kind::Integer),
    core("Created", "created", DCTERMS_NS, Kind::Timestamp),
    core("Modified", "modified", DCTERMS_NS, Kind::Timestamp),
    core("Last Printed", "lastPrinted", CP_NS, Kind::Timestamp),
    core("Category", "category", CP_NS, Kind::Text),
    core("Comments", "description", DC_NS, Kind::Text),
    core("Content Status", "contentStatus", CP_NS, Kind::Text),
    core("Identifier", "identifier", DC_NS, Kind::Text),
    core("Keywords", "keywords", CP_NS, Kind::Text),
    core("Language", "language", DC_NS, Kind::Text),
    core("Subject", "subject", DC_NS, Kind::Text),
    core("Version", "version", CP_NS, Kind::Text),
];

const WORKBOOK_SCHEMA: [PropertySpec; 12] = [
    core("Creator", "creator", DC_NS, Kind::Text),
    core("Last Modified By", "lastModifiedBy", CP_NS, Kind::Text),
    core("Created", "created", DCTERMS_NS, Kind::Timestamp),
    core("Modified", "modified", DCTERMS_NS, Kind::Timestamp),
    core("Title", "title", DC_NS, Kind::Text),
    core("Subject", "subject", DC_NS, Kind::Text),
    core("Description", "description", DC_NS, Kind::Text),
    core("Keywords", "keywords", CP_NS, Kind::Text),
    core("Category", "category", CP_NS, Kind::Text),
    app("Manager", "Manager"),
    app("Company", "Company"),
    core("Version", "version", CP_NS, Kind::Text),
];

pub struct WordDecoder;
pub struct PresentationDecoder;
pub struct SpreadsheetDecoder;

impl Decoder for WordDecoder {
    fn name(&self) -> &'static str {
        "DOCX"
    }

    fn decode(&self, path: &Path, fields: &mut FieldList) -> Result<(), DecodeError> {
        let mut package = OfficePackage::open(path, "word/document.xml")?;
        package.push_schema("DOCX", &CORE_SCHEMA, fields)
    }
}

impl Decoder for PresentationDecoder {
    fn name(&self) -> &'static str {
        "PPTX"
    }

    fn decode(&self, path: &Path, fields: &mut FieldList) -> Result<(), DecodeError> {
        let mut package = OfficePackage::open(path, "ppt/presentation.xml")?;
        package.push_schema("PPTX", &CORE_SCHEMA, fields)?;

        let presentation = package.main_part()?;
        let slides = find_child(&presentation, "sldIdLst", PML_NS)
            .map(|list| child_elements(list, "sldId", PML_NS).count())
            .unwrap_or(0);
        fields.push(MetadataField::new("PPTX: Number of Slides", slides));
        Ok(())
    }
}

impl Decoder for SpreadsheetDecoder {
    fn name(&self) -> &'static str {
        "XLSX"
    }

    fn decode(&self, path: &Path, fields: &mut FieldList) -> Result<(), DecodeError> {
        let mut package = OfficePackage::open(path, "xl/workbook.xml")?;
        package.push_schema("XLSX", &WORKBOOK_SCHEMA, fields)?;

        let workbook = package.main_part()?;
        let names: Vec<String> = find_child(&workbook, "sheets", SML_NS)
            .map(|sheets| {
                child_elements(sheets, "sheet", SML_NS)
                    .filter_map(|sheet| sheet.attributes.get("name").cloned())
                    .collect()
            })
            .unwrap_or_default();
        fields.push(MetadataField::new("XLSX: Sheet Names", names.join(", ")));
        fields.push(MetadataField::new("XLSX: Number of Sheets", names.len()));
        Ok(())
    }
}

struct OfficePackage {
    archive: ZipArchive<File>,
    main_part: &'static str,
}

impl OfficePackage {
    fn open(path: &Path, main_part: &'static str) -> Result<Self, DecodeError> {
        let mut archive = ZipArchive::new(File::open(path)?)?;
        if archive.by_name(main_part).is_err() {
            return Err(DecodeError::invalid(format!(
                "Package is missing its main part `{main_part}`"
            )));
        }
        Ok(Self { archive, main_part })
    }

    fn main_part(&mut self) -> Result<Element, DecodeError> {
        self.read_xml(self.main_part)?
            .ok_or_else(|| DecodeError::invalid(format!("`{}` is unreadable", self.main_part)))
    }

    /// Parte XML opcional: `None` si el paquete no la incluye.
    fn read_xml(&mut self, name: &str) -> Result<Option<Element>, DecodeError> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        let mut contents = String::new();
        entry.read_to_string(&mut contents)?;
        Ok(Some(Element::parse(contents.as_bytes())?))
    }

    fn push_schema(
        &mut self,
        prefix: &str,
        schema: &[PropertySpec],
        fields: &mut FieldList,
    ) -> Result<(), DecodeError> {
        let core = self.read_xml(CORE_PART)?;
        let app = if schema.iter().any(|spec| spec.part == Part::App) {
            self.read_xml(APP_PART)?
        } else {
            None
        };

        for spec in schema {
            let root = match spec.part {
                Part::Core => core.as_ref(),
                Part::App => app.as_ref(),
            };
            let text = root.and_then(|root| find_child_text(root, spec.local_name, spec.namespace));
            fields.push(MetadataField::new(
                format!("{prefix}: {}", spec.label),
                property_value(text, spec.kind),
            ));
        }
        Ok(())
    }
}

fn property_value(text: Option<String>, kind: Kind) -> FieldValue {
    let Some(text) = text.filter(|text| !text.is_empty()) else {
        return FieldValue::Null;
    };
    match kind {
        Kind::Integer => text
            .parse::<i64>()
            .map(FieldValue::Integer)
            .unwrap_or(FieldValue::Text(text)),
        Kind::Timestamp => DateTime::parse_from_rfc3339(&text)
            .map(FieldValue::Timestamp)
            .unwrap_or(FieldValue::Text(text)),
        Kind::Text => FieldValue::Text(text),
    }
}

fn child_elements<'a>(
    parent: &'a Element,
    local_name: &'a str,
    namespace: &'a str,
) -> impl Iterator<Item = &'a Element> + 'a {
    parent.children.iter().filter_map(move |node| match node {
        XMLNode::Element(child)
            if child.name == local_name && namespace_matches(child, namespace) =>
        {
            Some(child)
        }
        _ => None,
    })
}

fn find_child<'a>(parent: &'a Element, local_name: &'a str, namespace: &'a str) -> Option<&'a Element> {
    child_elements(parent, local_name, namespace).next()
}

fn find_child_text(root: &Element, local_name: &str, namespace: &str) -> Option<String> {
    find_child(root, local_name, namespace).map(element_text_content)
}

fn namespace_matches(element: &Element, namespace: &str) -> bool {
    element.namespace.as_deref() == Some(namespace)
}

fn element_text_content(element: &Element) -> String {
    let mut content = String::new();
    for node in &element.children {
        match node {
            XMLNode::Text(text) | XMLNode::CData(text) => content.push_str(text),
            _ => {}
        }
    }
    content.trim().to_string()
}

/// Escribe un paquete ZIP con las partes indicadas, sin compresión.
#[cfg(test)]
pub(crate) fn write_package(
    path: &Path,
    parts: &[(&str, &str)],
) -> Result<(), Box<dyn std::error::Error>> {
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    let mut writer = ZipWriter::new(File::create(path)?);
    let options = FileOptions::<'_, ()>::default().compression_method(CompressionMethod::Stored);
    for (name, contents) in parts {
        writer.start_file(*name, options)?;
        writer.write_all(contents.as_bytes())?;
    }
    writer.finish()?;
    Ok(())
}
