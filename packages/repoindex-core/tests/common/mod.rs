//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::Path;

use repoindex_core::{ArtifactInfo, ComponentRegistry, ContextConfig, IndexingContext};

/// A release jar coordinate.
pub fn artifact(group_id: &str, artifact_id: &str, version: &str) -> ArtifactInfo {
    let mut info = ArtifactInfo::new(group_id, artifact_id, version);
    info.extension = "jar".to_string();
    info.packaging = "jar".to_string();
    info.size = Some(1024);
    info.last_modified = Some(1_700_000_000_000);
    info
}

/// Open a context with `id` doubling as the repository id.
pub fn open_context(
    registry: &ComponentRegistry,
    index_dir: &Path,
    id: &str,
) -> IndexingContext {
    registry
        .create_context(ContextConfig::new(id, id), index_dir)
        .expect("open context")
}

/// Index a batch and make it visible to searches.
pub fn index_artifacts(context: &IndexingContext, infos: &[ArtifactInfo]) {
    for info in infos {
        context.add_artifact(info).expect("add artifact");
    }
    context.commit().expect("commit");
}
