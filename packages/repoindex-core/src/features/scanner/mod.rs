//! Repository walker: feeds artifacts on disk into a context.
//!
//! Deliberately small — it walks the Maven2 layout, parses every
//! candidate path with the context's [`M2GavCalculator`], runs the
//! creator chain over each artifact (in parallel) and upserts the
//! resulting documents by `UINFO`. Groups and the timestamp are
//! refreshed and the index committed and optimized at the end.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::errors::{IndexError, Result};
use crate::features::context::IndexingContext;
use crate::shared::models::ArtifactContext;

/// Outcome of one repository scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResult {
    /// Candidate artifact files seen.
    pub total_files: usize,
    /// Documents written.
    pub indexed: usize,
    /// `(path, error)` for artifacts that could not be processed.
    pub failures: Vec<(String, String)>,
}

/// Walks a repository tree and indexes every artifact it recognises.
#[derive(Debug, Default, Clone, Copy)]
pub struct Scanner;

impl Scanner {
    pub fn new() -> Scanner {
        Scanner
    }

    pub fn scan(&self, context: &IndexingContext) -> Result<ScanResult> {
        let Some(repository) = context.repository() else {
            return Err(IndexError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "context has no repository path to scan",
            )));
        };

        let candidates = collect_candidates(repository);
        let mut result = ScanResult {
            total_files: candidates.len(),
            ..ScanResult::default()
        };

        // Populating runs the creator chain (checksums, archive
        // enumeration) per artifact; spread it across cores.
        let populated: Vec<(PathBuf, Result<ArtifactContext>)> = candidates
            .into_par_iter()
            .map(|path| {
                let populated = populate(context, &path);
                (path, populated)
            })
            .collect();

        for (path, populated) in populated {
            match populated {
                Ok(artifact_context) => {
                    context.add_artifact(&artifact_context.artifact_info)?;
                    result.indexed += 1;
                }
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "artifact skipped");
                    result
                        .failures
                        .push((path.display().to_string(), e.to_string()));
                }
            }
        }

        context.commit()?;
        context.rebuild_groups()?;
        context.update_timestamp(true)?;
        context.optimize()?;

        info!(
            context = context.id(),
            indexed = result.indexed,
            failures = result.failures.len(),
            "repository scan finished"
        );
        Ok(result)
    }
}

fn populate(context: &IndexingContext, path: &Path) -> Result<ArtifactContext> {
    let repository = context.repository().unwrap_or_else(|| Path::new(""));
    let relative = path.strip_prefix(repository).unwrap_or(path);
    let relative = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    let gav = context
        .gav_calculator()
        .gav_from_path(&relative)
        .ok_or_else(|| {
            IndexError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{relative} is not a Maven2 artifact path"),
            ))
        })?;

    let pom = sibling_pom(path, &gav.artifact_id, &gav.version);
    let mut artifact_context = ArtifactContext::new(path, pom, gav);
    for creator in context.creators() {
        creator.populate_artifact_info(&mut artifact_context)?;
    }
    Ok(artifact_context)
}

fn sibling_pom(artifact: &Path, artifact_id: &str, version: &str) -> Option<PathBuf> {
    let pom = artifact.with_file_name(format!("{artifact_id}-{version}.pom"));
    pom.exists().then_some(pom)
}

/// Artifact candidates: plain files, not hidden, not checksum or
/// signature side-files, not repository metadata.
fn collect_candidates(repository: &Path) -> Vec<PathBuf> {
    WalkDir::new(repository)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            // The walk root keeps whatever name it has; only entries
            // below it can be hidden.
            entry.depth() == 0 || !is_hidden(entry.file_name().to_string_lossy().as_ref())
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            !is_side_file(&name)
        })
        .collect()
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') && name != "."
}

fn is_side_file(name: &str) -> bool {
    name.ends_with(".sha1")
        || name.ends_with(".md5")
        || name.ends_with(".asc")
        || name.starts_with("maven-metadata")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_files_are_skipped() {
        assert!(is_side_file("maven-model-2.2.1.jar.sha1"));
        assert!(is_side_file("maven-model-2.2.1.jar.md5"));
        assert!(is_side_file("maven-model-2.2.1.jar.asc"));
        assert!(is_side_file("maven-metadata.xml"));
        assert!(is_side_file("maven-metadata-central.xml"));
        assert!(!is_side_file("maven-model-2.2.1.jar"));
    }

    #[test]
    fn test_collect_candidates_walks_layout() {
        let dir = tempfile::tempdir().unwrap();
        let artifact_dir = dir.path().join("org/example/app/1.0");
        std::fs::create_dir_all(&artifact_dir).unwrap();
        std::fs::write(artifact_dir.join("app-1.0.jar"), b"jar").unwrap();
        std::fs::write(artifact_dir.join("app-1.0.jar.sha1"), b"x").unwrap();
        std::fs::write(artifact_dir.join("maven-metadata.xml"), b"x").unwrap();
        std::fs::create_dir_all(dir.path().join(".index")).unwrap();
        std::fs::write(dir.path().join(".index/ignored"), b"x").unwrap();

        let candidates = collect_candidates(dir.path());
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].ends_with("org/example/app/1.0/app-1.0.jar"));
    }
}
