//! Canonical artifact record.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Record separator used inside packed field values (`UINFO`, `IDXINFO`,
/// the group lists).
pub const FS: &str = "|";

/// Placeholder for an absent classifier inside a `UINFO` value.
pub const NA: &str = "NA";

/// The canonical artifact record: identity, location, content metadata
/// and (for archives) the contained class names.
///
/// Two records are considered equal when their `(uinfo, repository_id)`
/// pair matches; this is also the ordering used by flat search results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactInfo {
    // Identity
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub packaging: String,
    pub extension: String,

    // Location
    pub repository_id: String,
    pub context_id: String,
    /// File name on disk.
    pub fname: String,
    pub size: Option<u64>,
    /// Millis since the epoch.
    pub last_modified: Option<i64>,

    // Content metadata
    pub name: String,
    pub description: String,
    pub sha1: Option<String>,
    pub md5: Option<String>,

    /// Fully qualified, slash-separated class names found in the
    /// artifact, each with a leading `/`.
    pub class_names: Vec<String>,
}

impl ArtifactInfo {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> ArtifactInfo {
        ArtifactInfo {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            ..ArtifactInfo::default()
        }
    }

    /// The unit info string: primary sort and dedup key of a live
    /// document. `groupId|artifactId|version|classifier|extension`, with
    /// [`NA`] marking an absent classifier.
    pub fn uinfo(&self) -> String {
        format!(
            "{}{FS}{}{FS}{}{FS}{}{FS}{}",
            self.group_id,
            self.artifact_id,
            self.version,
            self.classifier.as_deref().unwrap_or(NA),
            self.extension,
        )
    }

    /// Parse a `UINFO` value back into the identity fields. Returns
    /// `false` if the value does not have the expected shape.
    pub fn apply_uinfo(&mut self, uinfo: &str) -> bool {
        let parts: Vec<&str> = uinfo.split(FS).collect();
        if parts.len() != 5 {
            return false;
        }
        self.group_id = parts[0].to_string();
        self.artifact_id = parts[1].to_string();
        self.version = parts[2].to_string();
        self.classifier = match parts[3] {
            NA => None,
            c => Some(c.to_string()),
        };
        self.extension = parts[4].to_string();
        true
    }

    /// The root (first dot-separated segment) of the group id.
    pub fn root_group(&self) -> &str {
        self.group_id.split('.').next().unwrap_or(&self.group_id)
    }
}

impl PartialEq for ArtifactInfo {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ArtifactInfo {}

impl PartialOrd for ArtifactInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ArtifactInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.uinfo()
            .cmp(&other.uinfo())
            .then_with(|| self.repository_id.cmp(&other.repository_id))
    }
}

/// A named group of artifacts, as produced by grouped search.
#[derive(Debug, Clone, Default)]
pub struct ArtifactInfoGroup {
    pub group_key: String,
    pub artifact_infos: BTreeSet<ArtifactInfo>,
}

impl ArtifactInfoGroup {
    pub fn new(group_key: impl Into<String>) -> ArtifactInfoGroup {
        ArtifactInfoGroup {
            group_key: group_key.into(),
            artifact_infos: BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uinfo_round_trip() {
        let mut info = ArtifactInfo::new("org.apache.maven", "maven-model", "2.2.1");
        info.extension = "jar".to_string();
        let uinfo = info.uinfo();
        assert_eq!(uinfo, "org.apache.maven|maven-model|2.2.1|NA|jar");

        let mut parsed = ArtifactInfo::default();
        assert!(parsed.apply_uinfo(&uinfo));
        assert_eq!(parsed.uinfo(), uinfo);
        assert_eq!(parsed.classifier, None);
    }

    #[test]
    fn test_uinfo_with_classifier() {
        let mut info = ArtifactInfo::new("org.slf4j", "slf4j-api", "1.6.1");
        info.classifier = Some("sources".to_string());
        info.extension = "jar".to_string();

        let mut parsed = ArtifactInfo::default();
        assert!(parsed.apply_uinfo(&info.uinfo()));
        assert_eq!(parsed.classifier.as_deref(), Some("sources"));
    }

    #[test]
    fn test_ordering_by_uinfo_then_repository() {
        let mut a = ArtifactInfo::new("org.a", "x", "1");
        a.repository_id = "r1".to_string();
        let mut b = a.clone();
        b.repository_id = "r2".to_string();
        let c = ArtifactInfo::new("org.b", "x", "1");

        assert!(a < b);
        assert!(b < c);

        // Same coordinates in the same repository collapse in a set.
        let mut set = BTreeSet::new();
        set.insert(a.clone());
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_root_group() {
        let info = ArtifactInfo::new("org.apache.maven", "m", "1");
        assert_eq!(info.root_group(), "org");
    }
}
