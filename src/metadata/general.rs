//! Atributos del sistema de archivos, disponibles para cualquier formato.

use chrono::{DateTime, FixedOffset};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::hashing::file_hashes;
use super::permissions::{
    format_octal_permissions, format_unix_permissions, group_name, owner_name,
};
use super::report::{ExtractionOptions, FieldList, FieldValue, MetadataField, StageOutput};
use crate::formatting::{format_size, system_time_to_timestamp};

pub const GENERAL_STAGE: &str = "General";

/// Instantánea inmutable del `stat` de un archivo.
#[derive(Clone, Debug)]
pub struct FileHandle {
    pub path: PathBuf,
    pub size: u64,
    pub created: Option<DateTime<FixedOffset>>,
    pub modified: Option<DateTime<FixedOffset>>,
    pub accessed: Option<DateTime<FixedOffset>>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub mode: Option<u32>,
}

impl FileHandle {
    pub fn read(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;

        let created = metadata
            .created()
            .ok()
            .map(system_time_to_timestamp)
            .or_else(|| change_time(&metadata));

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            created,
            modified: metadata.modified().ok().map(system_time_to_timestamp),
            accessed: metadata.accessed().ok().map(system_time_to_timestamp),
            uid: unix_ids(&metadata).map(|(uid, _)| uid),
            gid: unix_ids(&metadata).map(|(_, gid)| gid),
            mode: unix_mode(&metadata),
        })
    }

    pub fn fields(&self, options: &ExtractionOptions) -> FieldList {
        let mut fields = vec![
            MetadataField::new("File Size", format_size(self.size)),
            MetadataField::new("Creation Time", self.created),
            MetadataField::new("Modification Time", self.modified),
            MetadataField::new("Last Access Time", self.accessed),
            MetadataField::new("Owner UID", self.uid),
            MetadataField::new("Group GID", self.gid),
            MetadataField::new(
                "Permissions",
                self.mode.map(format_octal_permissions),
            ),
            MetadataField::new("Owner", self.uid.and_then(owner_name)),
            MetadataField::new("Group", self.gid.and_then(group_name)),
            MetadataField::new(
                "Permissions (rwx)",
                self.mode.map(format_unix_permissions),
            ),
        ];

        if options.include_hash {
            let hashes = file_hashes(&self.path, self.size);
            fields.push(MetadataField::new("MD5", hashes.md5));
            fields.push(MetadataField::new("SHA-256", hashes.sha256));
        }

        fields
    }
}

/// Etapa general: nunca aborta, un fallo de `stat` queda como error suave.
pub fn collect_general(path: &Path, options: &ExtractionOptions) -> StageOutput {
    general_output(FileHandle::read(path), options)
}

pub(crate) fn general_output(
    handle: io::Result<FileHandle>,
    options: &ExtractionOptions,
) -> StageOutput {
    let mut output = StageOutput::new();
    match handle {
        Ok(handle) => output.fields = handle.fields(options),
        Err(error) => {
            tracing::warn!(%error, "no se pudo leer la metadata general");
            output.record_error(GENERAL_STAGE, error.to_string());
        }
    }
    output
}

/// Etiquetas de las propiedades generales que dependen del reloj de acceso.
pub fn is_access_time_label(label: &str) -> bool {
    label == "Last Access Time"
}

#[cfg(unix)]
fn unix_ids(metadata: &fs::Metadata) -> Option<(u32, u32)> {
    use std::os::unix::fs::MetadataExt;

    Some((metadata.uid(), metadata.gid()))
}

#[cfg(not(unix))]
fn unix_ids(_metadata: &fs::Metadata) -> Option<(u32, u32)> {
    None
}

#[cfg(unix)]
fn unix_mode(metadata: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;

    Some(metadata.permissions().mode())
}

#[cfg(not(unix))]
fn unix_mode(_metadata: &fs::Metadata) -> Option<u32> {
    None
}

#[cfg(unix)]
fn change_time(metadata: &fs::Metadata) -> Option<DateTime<FixedOffset>> {
    use chrono::{Local, TimeZone};
    use std::os::unix::fs::MetadataExt;

    Local
        .timestamp_opt(metadata.ctime(), metadata.ctime_nsec() as u32)
        .single()
        .map(|value| value.fixed_offset())
}

#[cfg(not(unix))]
fn change_time(_metadata: &fs::Metadata) -> Option<DateTime<FixedOffset>> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_fields_come_in_documented_order() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("data.bin");
        std::fs::write(&path, vec![0_u8; 2048])?;

        let output = collect_general(&path, &ExtractionOptions::default());
        assert!(output.errors.is_empty());

        let labels: Vec<&str> = output.fields.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(
            &labels[..7],
            &[
                "File Size",
                "Creation Time",
                "Modification Time",
                "Last Access Time",
                "Owner UID",
                "Group GID",
                "Permissions",
            ]
        );
        assert_eq!(
            output.fields[0].value,
            FieldValue::text("2.00 KiB (2048 bytes)")
        );
        assert!(matches!(output.fields[2].value, FieldValue::Timestamp(_)));
        assert!(!labels.contains(&"SHA-256"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn reports_unix_permissions() -> Result<(), Box<dyn std::error::Error>> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("script.sh");
        std::fs::write(&path, b"#!/bin/sh\n")?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640))?;

        let handle = FileHandle::read(&path)?;
        let fields = handle.fields(&ExtractionOptions::default());
        let permissions = fields
            .iter()
            .find(|field| field.label == "Permissions")
            .map(|field| field.value.clone());
        assert_eq!(permissions, Some(FieldValue::text("0o640")));
        assert!(matches!(
            fields.iter().find(|f| f.label == "Owner UID").map(|f| &f.value),
            Some(FieldValue::Integer(_))
        ));
        Ok(())
    }

    #[test]
    fn hashes_are_opt_in() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abc")?;

        let options = ExtractionOptions {
            include_hash: true,
            ..ExtractionOptions::default()
        };
        let output = collect_general(&path, &options);
        let last = output.fields.last().map(|f| f.label.as_str());
        assert_eq!(last, Some("SHA-256"));
        Ok(())
    }

    #[test]
    fn stat_failure_becomes_soft_error() {
        let output = general_output(
            Err(io::Error::other("permiso denegado")),
            &ExtractionOptions::default(),
        );
        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.errors[0].stage, GENERAL_STAGE);
        assert_eq!(output.fields[0].label, "Error (General Metadata)");
        assert_eq!(output.fields[0].value, FieldValue::text("permiso denegado"));
    }
}
