//! Maven2 repository layout: path <-> coordinate mapping.
//!
//! The mapping is pure and bidirectional. For a release artifact the path
//! grammar is:
//!
//! ```text
//! <groupPath>/<artifactId>/<version>/<artifactId>-<version>[-<classifier>].<ext>
//! ```
//!
//! A timestamped snapshot replaces the file-name version with
//! `<baseVersion>-<YYYYMMDD.HHMMSS>-<buildNumber>` while the version
//! directory stays `<baseVersion>-SNAPSHOT`.

use serde::{Deserialize, Serialize};

/// Maven artifact coordinates, as resolved from a repository path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gav {
    pub group_id: String,
    pub artifact_id: String,
    /// The version as it appears in the file name, e.g.
    /// `1.0-20100111.064938-1` for a timestamped snapshot.
    pub version: String,
    /// The version directory name, e.g. `1.0-SNAPSHOT`. Equals `version`
    /// for release artifacts.
    pub base_version: String,
    pub classifier: Option<String>,
    pub extension: String,
    pub snapshot: bool,
    /// `YYYYMMDD.HHMMSS` part of a timestamped snapshot file name.
    pub snapshot_timestamp: Option<String>,
    pub snapshot_build_number: Option<u32>,
}

impl Gav {
    /// A release (non-snapshot) coordinate.
    pub fn release(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        classifier: Option<String>,
        extension: impl Into<String>,
    ) -> Gav {
        let version = version.into();
        Gav {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            base_version: version.clone(),
            version,
            classifier,
            extension: extension.into(),
            snapshot: false,
            snapshot_timestamp: None,
            snapshot_build_number: None,
        }
    }
}

/// Extensions recognised when splitting a file name into version,
/// classifier and extension. Longest suffix wins, so `tar.gz` is tried
/// before `gz`.
const KNOWN_EXTENSIONS: &[&str] = &[
    "tar.bz2", "tar.gz", "jar", "war", "ear", "aar", "rar", "sar", "zip", "pom", "swc", "nar",
    "gz", "xml", "so", "dll", "exe",
];

const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// Path <-> [`Gav`] mapping for the Maven2 repository layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct M2GavCalculator;

impl M2GavCalculator {
    pub fn new() -> M2GavCalculator {
        M2GavCalculator
    }

    /// Parse a slash-separated repository-relative path into a [`Gav`].
    ///
    /// Returns `None` for paths that are not artifacts under the Maven2
    /// layout (checksum side-files, metadata, malformed names).
    pub fn gav_from_path(&self, path: &str) -> Option<Gav> {
        let path = path.trim_start_matches('/');
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() < 4 {
            return None;
        }

        let file_name = segments[segments.len() - 1];
        let version_dir = segments[segments.len() - 2];
        let artifact_id = segments[segments.len() - 3];
        let group_id = segments[..segments.len() - 3].join(".");
        if group_id.is_empty() || artifact_id.is_empty() || version_dir.is_empty() {
            return None;
        }

        let (stem, extension) = split_extension(file_name)?;

        // File name must be "<artifactId>-<version>[-<classifier>]".
        let rest = stem.strip_prefix(artifact_id)?.strip_prefix('-')?;

        if let Some(base) = version_dir.strip_suffix(SNAPSHOT_SUFFIX) {
            self.parse_snapshot(&group_id, artifact_id, version_dir, base, rest, extension)
        } else {
            let classifier = match rest.strip_prefix(version_dir) {
                Some("") => None,
                Some(tail) => Some(tail.strip_prefix('-')?.to_string()),
                None => return None,
            };
            Some(Gav::release(
                group_id,
                artifact_id,
                version_dir,
                classifier,
                extension,
            ))
        }
    }

    fn parse_snapshot(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_dir: &str,
        base: &str,
        rest: &str,
        extension: &str,
    ) -> Option<Gav> {
        let tail = rest.strip_prefix(base)?.strip_prefix('-')?;

        if let Some(tail) = tail.strip_prefix("SNAPSHOT") {
            // Non-timestamped snapshot: file version equals the directory.
            let classifier = match tail {
                "" => None,
                t => Some(t.strip_prefix('-')?.to_string()),
            };
            return Some(Gav {
                group_id: group_id.to_string(),
                artifact_id: artifact_id.to_string(),
                version: version_dir.to_string(),
                base_version: version_dir.to_string(),
                classifier,
                extension: extension.to_string(),
                snapshot: true,
                snapshot_timestamp: None,
                snapshot_build_number: None,
            });
        }

        // Timestamped: "<YYYYMMDD.HHMMSS>-<buildNumber>[-<classifier>]".
        if tail.len() < 15 || !is_snapshot_timestamp(&tail[..15]) {
            return None;
        }
        let timestamp = &tail[..15];
        let tail = tail[15..].strip_prefix('-')?;
        let build_end = tail
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(tail.len());
        if build_end == 0 {
            return None;
        }
        let build_number: u32 = tail[..build_end].parse().ok()?;
        let classifier = match &tail[build_end..] {
            "" => None,
            t => Some(t.strip_prefix('-')?.to_string()),
        };

        Some(Gav {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: format!("{}-{}-{}", base, timestamp, &tail[..build_end]),
            base_version: version_dir.to_string(),
            classifier,
            extension: extension.to_string(),
            snapshot: true,
            snapshot_timestamp: Some(timestamp.to_string()),
            snapshot_build_number: Some(build_number),
        })
    }

    /// Render the repository-relative path of a coordinate.
    pub fn path_of(&self, gav: &Gav) -> String {
        let mut path = String::with_capacity(64);
        path.push_str(&gav.group_id.replace('.', "/"));
        path.push('/');
        path.push_str(&gav.artifact_id);
        path.push('/');
        path.push_str(&gav.base_version);
        path.push('/');
        path.push_str(&gav.artifact_id);
        path.push('-');
        path.push_str(&gav.version);
        if let Some(classifier) = &gav.classifier {
            path.push('-');
            path.push_str(classifier);
        }
        path.push('.');
        path.push_str(&gav.extension);
        path
    }
}

/// Split a file name into stem and extension, preferring the longest
/// known extension suffix.
fn split_extension(file_name: &str) -> Option<(&str, &str)> {
    for ext in KNOWN_EXTENSIONS {
        if let Some(stem) = file_name
            .strip_suffix(ext)
            .and_then(|s| s.strip_suffix('.'))
        {
            if !stem.is_empty() {
                return Some((stem, ext));
            }
        }
    }
    // Fall back to the last dot.
    let dot = file_name.rfind('.')?;
    if dot == 0 || dot + 1 == file_name.len() {
        return None;
    }
    Some((&file_name[..dot], &file_name[dot + 1..]))
}

/// `YYYYMMDD.HHMMSS`
fn is_snapshot_timestamp(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 15
        && bytes[..8].iter().all(u8::is_ascii_digit)
        && bytes[8] == b'.'
        && bytes[9..].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc() -> M2GavCalculator {
        M2GavCalculator::new()
    }

    #[test]
    fn test_release_jar() {
        let gav = calc()
            .gav_from_path("org/apache/maven/maven-model/2.2.1/maven-model-2.2.1.jar")
            .unwrap();
        assert_eq!(gav.group_id, "org.apache.maven");
        assert_eq!(gav.artifact_id, "maven-model");
        assert_eq!(gav.version, "2.2.1");
        assert_eq!(gav.base_version, "2.2.1");
        assert_eq!(gav.classifier, None);
        assert_eq!(gav.extension, "jar");
        assert!(!gav.snapshot);
    }

    #[test]
    fn test_release_with_classifier() {
        let gav = calc()
            .gav_from_path("org/slf4j/slf4j-api/1.6.1/slf4j-api-1.6.1-sources.jar")
            .unwrap();
        assert_eq!(gav.classifier.as_deref(), Some("sources"));
        assert_eq!(gav.extension, "jar");
    }

    #[test]
    fn test_compound_extension() {
        let gav = calc()
            .gav_from_path("org/example/dist/1.0/dist-1.0-bin.tar.gz")
            .unwrap();
        assert_eq!(gav.extension, "tar.gz");
        assert_eq!(gav.classifier.as_deref(), Some("bin"));
    }

    #[test]
    fn test_timestamped_snapshot() {
        let gav = calc()
            .gav_from_path("org/example/app/1.0-SNAPSHOT/app-1.0-20100111.064938-7.jar")
            .unwrap();
        assert!(gav.snapshot);
        assert_eq!(gav.version, "1.0-20100111.064938-7");
        assert_eq!(gav.base_version, "1.0-SNAPSHOT");
        assert_eq!(gav.snapshot_timestamp.as_deref(), Some("20100111.064938"));
        assert_eq!(gav.snapshot_build_number, Some(7));
    }

    #[test]
    fn test_snapshot_with_classifier() {
        let gav = calc()
            .gav_from_path("org/example/app/1.0-SNAPSHOT/app-1.0-20100111.064938-7-javadoc.jar")
            .unwrap();
        assert_eq!(gav.classifier.as_deref(), Some("javadoc"));
        assert_eq!(gav.snapshot_build_number, Some(7));
    }

    #[test]
    fn test_plain_snapshot() {
        let gav = calc()
            .gav_from_path("org/example/app/1.0-SNAPSHOT/app-1.0-SNAPSHOT.pom")
            .unwrap();
        assert!(gav.snapshot);
        assert_eq!(gav.version, "1.0-SNAPSHOT");
        assert_eq!(gav.snapshot_timestamp, None);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(calc().gav_from_path("org/example/app/1.0/other-1.0.jar").is_none());
        assert!(calc().gav_from_path("app-1.0.jar").is_none());
        assert!(calc().gav_from_path("org/example/app/1.0/app-2.0.jar").is_none());
    }

    #[test]
    fn test_path_round_trip() {
        let paths = [
            "org/apache/maven/maven-model/2.2.1/maven-model-2.2.1.jar",
            "org/slf4j/slf4j-api/1.6.1/slf4j-api-1.6.1-sources.jar",
            "org/example/app/1.0-SNAPSHOT/app-1.0-20100111.064938-7.jar",
            "org/example/app/1.0-SNAPSHOT/app-1.0-SNAPSHOT.pom",
            "commons-logging/commons-logging/1.1.1/commons-logging-1.1.1.jar",
        ];
        for path in paths {
            let gav = calc().gav_from_path(path).unwrap();
            assert_eq!(calc().path_of(&gav), path, "round-trip failed for {path}");
        }
    }
}
