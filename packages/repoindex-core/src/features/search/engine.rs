//! Flat and grouped search execution.

use std::collections::{BTreeMap, BTreeSet};

use tantivy::collector::DocSetCollector;
use tantivy::TantivyDocument;

use crate::errors::{IndexError, Result};
use crate::features::context::IndexingContext;
use crate::features::creator::construct_artifact_info;
use crate::shared::models::{ArtifactInfo, ArtifactInfoGroup};

use super::iterator::IteratorResultSet;
use super::{
    FlatSearchRequest, FlatSearchResponse, GroupedSearchRequest, GroupedSearchResponse,
    IteratorSearchRequest, TotalHits,
};

/// Executes searches across contexts, in the order the caller supplies
/// them. Stateless; one engine serves any number of contexts.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchEngine;

enum ContextHits {
    Counted(usize),
    LimitExceeded,
}

impl SearchEngine {
    pub fn new() -> SearchEngine {
        SearchEngine
    }

    /// Flat search over every searchable context.
    pub fn search_flat_paged(
        &self,
        request: &FlatSearchRequest,
        contexts: &[&IndexingContext],
    ) -> Result<FlatSearchResponse> {
        self.flat(request, contexts, false)
    }

    /// Flat search ignoring the `searchable` flag.
    pub fn force_search_flat_paged(
        &self,
        request: &FlatSearchRequest,
        contexts: &[&IndexingContext],
    ) -> Result<FlatSearchResponse> {
        self.flat(request, contexts, true)
    }

    pub fn search_grouped(
        &self,
        request: &GroupedSearchRequest,
        contexts: &[&IndexingContext],
    ) -> Result<GroupedSearchResponse> {
        self.grouped(request, contexts, false)
    }

    pub fn force_search_grouped(
        &self,
        request: &GroupedSearchRequest,
        contexts: &[&IndexingContext],
    ) -> Result<GroupedSearchResponse> {
        self.grouped(request, contexts, true)
    }

    /// Streaming search. The returned cursor holds a shared lock on
    /// every participating context until dropped.
    pub fn search_iterator<'a>(
        &self,
        request: &IteratorSearchRequest,
        contexts: &[&'a IndexingContext],
    ) -> Result<IteratorResultSet<'a>> {
        IteratorResultSet::open(request, contexts, false)
    }

    pub fn force_search_iterator<'a>(
        &self,
        request: &IteratorSearchRequest,
        contexts: &[&'a IndexingContext],
    ) -> Result<IteratorResultSet<'a>> {
        IteratorResultSet::open(request, contexts, true)
    }

    fn flat(
        &self,
        request: &FlatSearchRequest,
        contexts: &[&IndexingContext],
        ignore_searchable: bool,
    ) -> Result<FlatSearchResponse> {
        let mut results = BTreeSet::new();
        let mut total = 0usize;

        for context in contexts {
            if !ignore_searchable && !context.is_searchable() {
                continue;
            }
            match self.flat_in_context(request, context, &mut results)? {
                ContextHits::Counted(hits) => total += hits,
                ContextHits::LimitExceeded => {
                    return Ok(FlatSearchResponse {
                        total_hits: TotalHits::LimitExceeded,
                        results: BTreeSet::new(),
                    })
                }
            }
            if request.result_hit_limit.is_some_and(|limit| total > limit) {
                return Ok(FlatSearchResponse {
                    total_hits: TotalHits::LimitExceeded,
                    results: BTreeSet::new(),
                });
            }
        }

        Ok(FlatSearchResponse {
            total_hits: TotalHits::Exact(total),
            results,
        })
    }

    fn flat_in_context(
        &self,
        request: &FlatSearchRequest,
        context: &IndexingContext,
        results: &mut BTreeSet<ArtifactInfo>,
    ) -> Result<ContextHits> {
        let guard = context.pool().read();
        let pool = guard.as_ref().ok_or(IndexError::Closed)?;
        let searcher = &pool.searcher;

        let addresses = searcher.search(request.query.as_ref(), &DocSetCollector)?;
        let hit_count = addresses.len();
        if request
            .result_hit_limit
            .is_some_and(|limit| hit_count > limit)
        {
            return Ok(ContextHits::LimitExceeded);
        }

        let mut sorted: Vec<_> = addresses.into_iter().collect();
        sorted.sort();
        for addr in sorted {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let Some(mut info) =
                construct_artifact_info(&doc, context.fields(), context.creators())
            else {
                continue;
            };
            info.repository_id = context.repository_id().to_string();
            info.context_id = context.id().to_string();
            results.insert(info);

            if request
                .result_hit_limit
                .is_some_and(|limit| results.len() > limit)
            {
                return Ok(ContextHits::LimitExceeded);
            }
        }

        Ok(ContextHits::Counted(hit_count))
    }

    fn grouped(
        &self,
        request: &GroupedSearchRequest,
        contexts: &[&IndexingContext],
        ignore_searchable: bool,
    ) -> Result<GroupedSearchResponse> {
        let mut groups = BTreeMap::new();
        let mut total = 0usize;

        for context in contexts {
            if !ignore_searchable && !context.is_searchable() {
                continue;
            }
            match self.grouped_in_context(request, context, &mut groups)? {
                ContextHits::Counted(hits) => total += hits,
                ContextHits::LimitExceeded => {
                    return Ok(GroupedSearchResponse {
                        total_hits: TotalHits::LimitExceeded,
                        groups: BTreeMap::new(),
                    })
                }
            }
            if request.result_hit_limit.is_some_and(|limit| total > limit) {
                return Ok(GroupedSearchResponse {
                    total_hits: TotalHits::LimitExceeded,
                    groups: BTreeMap::new(),
                });
            }
        }

        Ok(GroupedSearchResponse {
            total_hits: TotalHits::Exact(total),
            groups,
        })
    }

    fn grouped_in_context(
        &self,
        request: &GroupedSearchRequest,
        context: &IndexingContext,
        groups: &mut BTreeMap<String, ArtifactInfoGroup>,
    ) -> Result<ContextHits> {
        let guard = context.pool().read();
        let pool = guard.as_ref().ok_or(IndexError::Closed)?;
        let searcher = &pool.searcher;

        let addresses = searcher.search(request.query.as_ref(), &DocSetCollector)?;
        if request
            .result_hit_limit
            .is_some_and(|limit| addresses.len() > limit)
        {
            return Ok(ContextHits::LimitExceeded);
        }

        let mut hit_count = addresses.len();
        let mut sorted: Vec<_> = addresses.into_iter().collect();
        sorted.sort();
        for addr in sorted {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let Some(mut info) =
                construct_artifact_info(&doc, context.fields(), context.creators())
            else {
                continue;
            };
            info.repository_id = context.repository_id().to_string();
            info.context_id = context.id().to_string();
            if !request.grouping.add_artifact_info(groups, info) {
                hit_count -= 1;
            }
        }

        Ok(ContextHits::Counted(hit_count))
    }
}
