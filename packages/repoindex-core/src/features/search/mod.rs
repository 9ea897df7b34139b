//! Search over one or many indexing contexts.
//!
//! Three modes:
//! - **flat paged** — hits from all contexts collected into one ordered,
//!   deduplicated set;
//! - **grouped** — hits folded into named groups by a [`Grouping`];
//! - **iterator** — a lazy cursor that holds a shared lock on every
//!   participating context until it is dropped.
//!
//! The `force_*` engine variants include contexts whose `searchable`
//! flag is off.

pub mod engine;
pub mod iterator;

use std::collections::{BTreeMap, BTreeSet};

use tantivy::query::Query;

use crate::shared::models::{ArtifactInfo, ArtifactInfoGroup};

pub use engine::SearchEngine;
pub use iterator::IteratorResultSet;

/// Total hit count of a limited search. `LimitExceeded` is a sentinel
/// distinct from any natural count: the result set it accompanies is
/// empty and the caller is expected to narrow the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalHits {
    Exact(usize),
    LimitExceeded,
}

impl TotalHits {
    pub fn count(&self) -> Option<usize> {
        match self {
            TotalHits::Exact(n) => Some(*n),
            TotalHits::LimitExceeded => None,
        }
    }

    pub fn is_limit_exceeded(&self) -> bool {
        matches!(self, TotalHits::LimitExceeded)
    }
}

/// Flat search: every hit materialised into one ordered set.
pub struct FlatSearchRequest {
    pub query: Box<dyn Query>,
    /// When set, a search producing more hits than this returns
    /// [`TotalHits::LimitExceeded`] and no results.
    pub result_hit_limit: Option<usize>,
}

impl FlatSearchRequest {
    pub fn new(query: Box<dyn Query>) -> FlatSearchRequest {
        FlatSearchRequest {
            query,
            result_hit_limit: None,
        }
    }

    pub fn with_hit_limit(mut self, limit: usize) -> Self {
        self.result_hit_limit = Some(limit);
        self
    }
}

#[derive(Debug)]
pub struct FlatSearchResponse {
    pub total_hits: TotalHits,
    /// Ordered by `(uinfo, repository_id)`, deduplicated across contexts.
    pub results: BTreeSet<ArtifactInfo>,
}

/// Folds artifacts into a map keyed by a group string. Returning `false`
/// rejects the artifact: it is dropped and not counted.
pub trait Grouping: Send + Sync {
    fn add_artifact_info(
        &self,
        result: &mut BTreeMap<String, ArtifactInfoGroup>,
        info: ArtifactInfo,
    ) -> bool;
}

/// Group by `groupId`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GGrouping;

impl Grouping for GGrouping {
    fn add_artifact_info(
        &self,
        result: &mut BTreeMap<String, ArtifactInfoGroup>,
        info: ArtifactInfo,
    ) -> bool {
        let key = info.group_id.clone();
        result
            .entry(key.clone())
            .or_insert_with(|| ArtifactInfoGroup::new(key))
            .artifact_infos
            .insert(info)
    }
}

/// Group by `groupId:artifactId`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GaGrouping;

impl Grouping for GaGrouping {
    fn add_artifact_info(
        &self,
        result: &mut BTreeMap<String, ArtifactInfoGroup>,
        info: ArtifactInfo,
    ) -> bool {
        let key = format!("{}:{}", info.group_id, info.artifact_id);
        result
            .entry(key.clone())
            .or_insert_with(|| ArtifactInfoGroup::new(key))
            .artifact_infos
            .insert(info)
    }
}

pub struct GroupedSearchRequest {
    pub query: Box<dyn Query>,
    pub grouping: Box<dyn Grouping>,
    pub result_hit_limit: Option<usize>,
}

impl GroupedSearchRequest {
    pub fn new(query: Box<dyn Query>, grouping: Box<dyn Grouping>) -> GroupedSearchRequest {
        GroupedSearchRequest {
            query,
            grouping,
            result_hit_limit: None,
        }
    }

    pub fn with_hit_limit(mut self, limit: usize) -> Self {
        self.result_hit_limit = Some(limit);
        self
    }
}

pub struct GroupedSearchResponse {
    pub total_hits: TotalHits,
    pub groups: BTreeMap<String, ArtifactInfoGroup>,
}

/// Iterator search: paging bounds are applied to the merged hit list.
pub struct IteratorSearchRequest {
    pub query: Box<dyn Query>,
    pub start: usize,
    pub count: Option<usize>,
}

impl IteratorSearchRequest {
    pub fn new(query: Box<dyn Query>) -> IteratorSearchRequest {
        IteratorSearchRequest {
            query,
            start: 0,
            count: None,
        }
    }

    pub fn with_start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(group: &str, artifact: &str) -> ArtifactInfo {
        let mut info = ArtifactInfo::new(group, artifact, "1.0");
        info.extension = "jar".to_string();
        info
    }

    #[test]
    fn test_g_grouping_folds_by_group() {
        let mut result = BTreeMap::new();
        assert!(GGrouping.add_artifact_info(&mut result, info("org.a", "x")));
        assert!(GGrouping.add_artifact_info(&mut result, info("org.a", "y")));
        assert!(GGrouping.add_artifact_info(&mut result, info("org.b", "z")));

        assert_eq!(result.len(), 2);
        assert_eq!(result["org.a"].artifact_infos.len(), 2);
    }

    #[test]
    fn test_grouping_rejects_duplicates() {
        let mut result = BTreeMap::new();
        assert!(GaGrouping.add_artifact_info(&mut result, info("org.a", "x")));
        assert!(!GaGrouping.add_artifact_info(&mut result, info("org.a", "x")));
        assert_eq!(result["org.a:x"].artifact_infos.len(), 1);
    }

    #[test]
    fn test_total_hits_sentinel() {
        assert_eq!(TotalHits::Exact(3).count(), Some(3));
        assert_eq!(TotalHits::LimitExceeded.count(), None);
        assert!(TotalHits::LimitExceeded.is_limit_exceeded());
    }
}
