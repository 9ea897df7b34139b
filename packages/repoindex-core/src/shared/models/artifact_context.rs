//! Scanner -> creator handoff record.

use std::path::{Path, PathBuf};

use super::{ArtifactInfo, Gav};

/// Everything an [`IndexCreator`](crate::features::creator::IndexCreator)
/// needs to know about one artifact on disk: the file, its sibling pom
/// (if any), the parsed coordinates, and the record under construction.
#[derive(Debug, Clone)]
pub struct ArtifactContext {
    pub artifact: PathBuf,
    pub pom: Option<PathBuf>,
    pub gav: Gav,
    pub artifact_info: ArtifactInfo,
}

impl ArtifactContext {
    /// Seed the record with the identity fields derived from the
    /// coordinates; creators fill in the rest.
    pub fn new(artifact: impl Into<PathBuf>, pom: Option<PathBuf>, gav: Gav) -> ArtifactContext {
        let artifact = artifact.into();
        let mut info = ArtifactInfo::new(&gav.group_id, &gav.artifact_id, &gav.version);
        info.classifier = gav.classifier.clone();
        info.extension = gav.extension.clone();
        info.packaging = gav.extension.clone();
        info.fname = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        ArtifactContext {
            artifact,
            pom,
            gav,
            artifact_info: info,
        }
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact
    }
}
