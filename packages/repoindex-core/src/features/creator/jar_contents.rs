//! Class-name extraction from archive artifacts.

use std::fs::File;

use tantivy::schema::Value;
use tantivy::TantivyDocument;
use tracing::debug;

use crate::errors::Result;
use crate::features::schema::fields::{FLD_CLASSNAMES, FLD_CLASSNAMES_KW};
use crate::features::schema::{IndexerField, SchemaFields};
use crate::shared::models::{ArtifactContext, ArtifactInfo};

use super::IndexCreator;

const OWNED_FIELDS: &[IndexerField] = &[FLD_CLASSNAMES, FLD_CLASSNAMES_KW];

/// Archive extensions whose entries are worth enumerating.
const ARCHIVE_EXTENSIONS: &[&str] = &["jar", "war", "ear", "zip", "sar"];

const WAR_CLASSES_PREFIX: &str = "WEB-INF/classes";

/// Enumerates `.class` entries of an archive artifact and records their
/// fully qualified, slash-separated names. The tokenized field gets the
/// newline-joined list once; the keyword field gets one raw term per
/// class name, so exact and wildcard lookups hit individual names.
#[derive(Debug, Default, Clone, Copy)]
pub struct JarFileContentsIndexCreator;

impl IndexCreator for JarFileContentsIndexCreator {
    fn id(&self) -> &'static str {
        "jarContent"
    }

    fn indexer_fields(&self) -> &'static [IndexerField] {
        OWNED_FIELDS
    }

    fn populate_artifact_info(&self, context: &mut ArtifactContext) -> Result<()> {
        if !ARCHIVE_EXTENSIONS.contains(&context.artifact_info.extension.as_str()) {
            return Ok(());
        }

        let file = File::open(context.artifact_path())?;
        let mut archive = match zip::ZipArchive::new(file) {
            Ok(archive) => archive,
            Err(e) => {
                // Not a readable archive; index the artifact without
                // class names rather than failing the whole scan.
                debug!(
                    artifact = %context.artifact_path().display(),
                    error = %e,
                    "failed to open archive, skipping class enumeration"
                );
                return Ok(());
            }
        };

        let mut class_names = Vec::new();
        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            if !entry.is_file() {
                continue;
            }
            if let Some(class_name) = class_name_of_entry(entry.name()) {
                class_names.push(class_name);
            }
        }
        context.artifact_info.class_names = class_names;

        Ok(())
    }

    fn update_document(
        &self,
        info: &ArtifactInfo,
        fields: &SchemaFields,
        doc: &mut TantivyDocument,
    ) {
        if info.class_names.is_empty() {
            return;
        }
        doc.add_text(fields.of(&FLD_CLASSNAMES), info.class_names.join("\n"));
        for class_name in &info.class_names {
            doc.add_text(fields.of(&FLD_CLASSNAMES_KW), class_name);
        }
    }

    fn update_artifact_info(
        &self,
        fields: &SchemaFields,
        doc: &TantivyDocument,
        info: &mut ArtifactInfo,
    ) -> bool {
        let class_names: Vec<String> = doc
            .get_all(fields.of(&FLD_CLASSNAMES_KW))
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect();
        if class_names.is_empty() {
            return false;
        }
        info.class_names = class_names;
        true
    }
}

/// Map an archive entry name to a class name, or `None` for entries that
/// are not indexable classes.
fn class_name_of_entry(entry: &str) -> Option<String> {
    let stem = entry.strip_suffix(".class")?;
    if stem.starts_with("META-INF/") {
        return None;
    }
    // War files bury their classes below WEB-INF/classes.
    let stem = stem
        .strip_prefix(WAR_CLASSES_PREFIX)
        .map(|s| s.trim_start_matches('/'))
        .unwrap_or(stem);
    if stem.is_empty() {
        return None;
    }
    if stem.starts_with('/') {
        Some(stem.to_string())
    } else {
        Some(format!("/{stem}"))
    }
}
