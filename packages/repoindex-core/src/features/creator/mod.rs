//! Index creators: schema plug-ins that turn artifacts into documents
//! and documents back into artifact records.
//!
//! Each creator owns a set of [`IndexerField`]s, computes them from the
//! on-disk artifact (`populate_artifact_info`), writes them into the
//! document (`update_document`) and recognises them when a stored
//! document is reconstituted (`update_artifact_info`). Creators run in
//! declared order and the stored document is the merge of all
//! contributions.

pub mod jar_contents;
pub mod minimal;

use tantivy::TantivyDocument;

use crate::errors::Result;
use crate::features::schema::{IndexerField, SchemaFields};
use crate::shared::models::{ArtifactContext, ArtifactInfo};

pub use jar_contents::JarFileContentsIndexCreator;
pub use minimal::MinimalArtifactInfoIndexCreator;

/// A schema plug-in. Implementations are stateless and shared across
/// threads; the scanner populates artifacts in parallel.
pub trait IndexCreator: Send + Sync {
    /// Stable identifier, used in logs.
    fn id(&self) -> &'static str;

    /// The indexer fields this creator introduces to the index.
    fn indexer_fields(&self) -> &'static [IndexerField];

    /// Compute this creator's fields from the artifact on disk.
    fn populate_artifact_info(&self, context: &mut ArtifactContext) -> Result<()>;

    /// Write this creator's fields into the document.
    fn update_document(
        &self,
        info: &ArtifactInfo,
        fields: &SchemaFields,
        doc: &mut TantivyDocument,
    );

    /// Read this creator's fields back from a stored document. Returns
    /// whether any field was recognised.
    fn update_artifact_info(
        &self,
        fields: &SchemaFields,
        doc: &TantivyDocument,
        info: &mut ArtifactInfo,
    ) -> bool;
}

/// The default creator chain: coordinates and checksums first, then jar
/// contents.
pub fn default_creators() -> Vec<Box<dyn IndexCreator>> {
    vec![
        Box::new(MinimalArtifactInfoIndexCreator),
        Box::new(JarFileContentsIndexCreator),
    ]
}

/// Merge all creator contributions for `info` into a fresh document.
pub fn build_document(
    info: &ArtifactInfo,
    fields: &SchemaFields,
    creators: &[Box<dyn IndexCreator>],
) -> TantivyDocument {
    let mut doc = TantivyDocument::default();
    for creator in creators {
        creator.update_document(info, fields, &mut doc);
    }
    doc
}

/// Reconstitute an artifact record from a stored document. `None` when
/// no creator recognises the document (descriptor, group markers,
/// foreign documents).
pub fn construct_artifact_info(
    doc: &TantivyDocument,
    fields: &SchemaFields,
    creators: &[Box<dyn IndexCreator>],
) -> Option<ArtifactInfo> {
    let mut info = ArtifactInfo::default();
    let mut recognised = false;
    for creator in creators {
        recognised |= creator.update_artifact_info(fields, doc, &mut info);
    }
    recognised.then_some(info)
}
