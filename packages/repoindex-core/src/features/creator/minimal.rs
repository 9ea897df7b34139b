//! Coordinate, size, timestamp, checksum and packaging fields.

use std::fs::File;
use std::io::Read;
use std::time::UNIX_EPOCH;

use md5::Md5;
use sha1::{Digest, Sha1};
use tantivy::schema::Value;
use tantivy::TantivyDocument;

use crate::errors::Result;
use crate::features::schema::fields::{
    FLD_ARTIFACT_ID, FLD_ARTIFACT_ID_KW, FLD_DESCRIPTION, FLD_GROUP_ID, FLD_GROUP_ID_KW, FLD_INFO,
    FLD_MD5, FLD_NAME, FLD_PACKAGING, FLD_SHA1, FLD_UINFO, FLD_VERSION, FLD_VERSION_KW,
};
use crate::features::schema::{IndexerField, SchemaFields};
use crate::shared::models::{ArtifactContext, ArtifactInfo, FS, NA};

use super::IndexCreator;

const OWNED_FIELDS: &[IndexerField] = &[
    FLD_UINFO,
    FLD_INFO,
    FLD_GROUP_ID_KW,
    FLD_GROUP_ID,
    FLD_ARTIFACT_ID_KW,
    FLD_ARTIFACT_ID,
    FLD_VERSION_KW,
    FLD_VERSION,
    FLD_PACKAGING,
    FLD_NAME,
    FLD_DESCRIPTION,
    FLD_SHA1,
    FLD_MD5,
];

/// Mandatory creator: without it a document carries no identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinimalArtifactInfoIndexCreator;

impl IndexCreator for MinimalArtifactInfoIndexCreator {
    fn id(&self) -> &'static str {
        "min"
    }

    fn indexer_fields(&self) -> &'static [IndexerField] {
        OWNED_FIELDS
    }

    fn populate_artifact_info(&self, context: &mut ArtifactContext) -> Result<()> {
        let meta = std::fs::metadata(&context.artifact)?;
        let (sha1, md5) = digest_file(context.artifact_path())?;
        let info = &mut context.artifact_info;

        info.size = Some(meta.len());
        info.last_modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64);

        info.sha1 = Some(sha1);
        info.md5 = Some(md5);

        Ok(())
    }

    fn update_document(
        &self,
        info: &ArtifactInfo,
        fields: &SchemaFields,
        doc: &mut TantivyDocument,
    ) {
        doc.add_text(fields.of(&FLD_UINFO), info.uinfo());
        doc.add_text(fields.of(&FLD_INFO), pack_info(info));

        doc.add_text(fields.of(&FLD_GROUP_ID_KW), &info.group_id);
        doc.add_text(fields.of(&FLD_GROUP_ID), &info.group_id);
        doc.add_text(fields.of(&FLD_ARTIFACT_ID_KW), &info.artifact_id);
        doc.add_text(fields.of(&FLD_ARTIFACT_ID), &info.artifact_id);
        doc.add_text(fields.of(&FLD_VERSION_KW), &info.version);
        doc.add_text(fields.of(&FLD_VERSION), &info.version);

        if !info.packaging.is_empty() {
            doc.add_text(fields.of(&FLD_PACKAGING), &info.packaging);
        }
        if !info.name.is_empty() {
            doc.add_text(fields.of(&FLD_NAME), &info.name);
        }
        if !info.description.is_empty() {
            doc.add_text(fields.of(&FLD_DESCRIPTION), &info.description);
        }
        if let Some(sha1) = &info.sha1 {
            doc.add_text(fields.of(&FLD_SHA1), sha1);
        }
        if let Some(md5) = &info.md5 {
            doc.add_text(fields.of(&FLD_MD5), md5);
        }
    }

    fn update_artifact_info(
        &self,
        fields: &SchemaFields,
        doc: &TantivyDocument,
        info: &mut ArtifactInfo,
    ) -> bool {
        let Some(uinfo) = doc
            .get_first(fields.of(&FLD_UINFO))
            .and_then(|v| v.as_str())
        else {
            return false;
        };
        if !info.apply_uinfo(uinfo) {
            return false;
        }

        if let Some(packed) = doc.get_first(fields.of(&FLD_INFO)).and_then(|v| v.as_str()) {
            unpack_info(packed, info);
        }
        if let Some(name) = doc.get_first(fields.of(&FLD_NAME)).and_then(|v| v.as_str()) {
            info.name = name.to_string();
        }
        if let Some(description) = doc
            .get_first(fields.of(&FLD_DESCRIPTION))
            .and_then(|v| v.as_str())
        {
            info.description = description.to_string();
        }
        if let Some(sha1) = doc.get_first(fields.of(&FLD_SHA1)).and_then(|v| v.as_str()) {
            info.sha1 = Some(sha1.to_string());
        }
        if let Some(md5) = doc.get_first(fields.of(&FLD_MD5)).and_then(|v| v.as_str()) {
            info.md5 = Some(md5.to_string());
        }

        true
    }
}

/// `packaging|lastModified|size`, with [`NA`] for unknown values.
fn pack_info(info: &ArtifactInfo) -> String {
    format!(
        "{}{FS}{}{FS}{}",
        info.packaging,
        info.last_modified
            .map(|m| m.to_string())
            .unwrap_or_else(|| NA.to_string()),
        info.size
            .map(|s| s.to_string())
            .unwrap_or_else(|| NA.to_string()),
    )
}

fn unpack_info(packed: &str, info: &mut ArtifactInfo) {
    let mut parts = packed.split(FS);
    if let Some(packaging) = parts.next() {
        info.packaging = packaging.to_string();
    }
    info.last_modified = parts.next().and_then(|m| m.parse().ok());
    info.size = parts.next().and_then(|s| s.parse().ok());
}

/// SHA-1 and MD5 of the artifact bytes, hex encoded, in one pass.
fn digest_file(path: &std::path::Path) -> Result<(String, String)> {
    let mut file = File::open(path)?;
    let mut sha1 = Sha1::new();
    let mut md5 = Md5::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        sha1.update(&buf[..n]);
        md5.update(&buf[..n]);
    }
    Ok((to_hex(&sha1.finalize()), to_hex(&md5.finalize())))
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::creator::{build_document, construct_artifact_info, default_creators};
    use crate::shared::models::{Gav, M2GavCalculator};
    use std::io::Write;

    fn sample_info() -> ArtifactInfo {
        let mut info = ArtifactInfo::new("org.apache.maven", "maven-model", "2.2.1");
        info.extension = "jar".to_string();
        info.packaging = "jar".to_string();
        info.size = Some(12345);
        info.last_modified = Some(1_264_893_000_000);
        info.sha1 = Some("aabbcc".to_string());
        info.md5 = Some("ddeeff".to_string());
        info
    }

    #[test]
    fn test_document_round_trip() {
        let fields = SchemaFields::build();
        let creators = default_creators();
        let info = sample_info();

        let doc = build_document(&info, &fields, &creators);
        let back = construct_artifact_info(&doc, &fields, &creators).unwrap();

        assert_eq!(back.uinfo(), info.uinfo());
        assert_eq!(back.packaging, "jar");
        assert_eq!(back.size, Some(12345));
        assert_eq!(back.last_modified, Some(1_264_893_000_000));
        assert_eq!(back.sha1.as_deref(), Some("aabbcc"));
        assert_eq!(back.md5.as_deref(), Some("ddeeff"));
    }

    #[test]
    fn test_unrecognised_document_yields_none() {
        let fields = SchemaFields::build();
        let creators = default_creators();
        let doc = TantivyDocument::default();
        assert!(construct_artifact_info(&doc, &fields, &creators).is_none());
    }

    #[test]
    fn test_populate_reads_file_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maven-model-2.2.1.jar");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"not really a jar").unwrap();
        drop(f);

        let gav = M2GavCalculator::new()
            .gav_from_path("org/apache/maven/maven-model/2.2.1/maven-model-2.2.1.jar")
            .unwrap();
        let mut context = ArtifactContext::new(&path, None, gav);
        MinimalArtifactInfoIndexCreator
            .populate_artifact_info(&mut context)
            .unwrap();

        let info = &context.artifact_info;
        assert_eq!(info.size, Some(16));
        assert!(info.last_modified.is_some());
        // Digest of the literal bytes above.
        assert_eq!(info.sha1.as_deref().map(str::len), Some(40));
        assert_eq!(info.md5.as_deref().map(str::len), Some(32));
        assert_eq!(info.fname, "maven-model-2.2.1.jar");
    }

    #[test]
    fn test_pack_info_with_unknowns() {
        let mut info = ArtifactInfo::new("g", "a", "1");
        info.packaging = "jar".to_string();
        let packed = pack_info(&info);
        assert_eq!(packed, "jar|NA|NA");

        let mut back = ArtifactInfo::default();
        unpack_info(&packed, &mut back);
        assert_eq!(back.packaging, "jar");
        assert_eq!(back.last_modified, None);
        assert_eq!(back.size, None);
    }

    #[test]
    fn test_gav_seed_is_preserved() {
        let gav = Gav::release("org.example", "app", "1.0", None, "jar");
        let context = ArtifactContext::new("/tmp/app-1.0.jar", None, gav);
        assert_eq!(context.artifact_info.packaging, "jar");
        assert_eq!(context.artifact_info.uinfo(), "org.example|app|1.0|NA|jar");
    }
}
