//! Streaming search: a cursor over the merged hits of many contexts.
//!
//! The cursor pins one committed snapshot per context (the cloned
//! searcher) and keeps a shared lock on each context so the pool cannot
//! be replaced underneath it. Locks are guard-owned: they are released
//! when the cursor is dropped, including on panic. If construction
//! fails halfway, the guards acquired so far unwind the same way.

use parking_lot::RwLockReadGuard;
use tantivy::collector::TopDocs;
use tantivy::{DocAddress, Searcher, TantivyDocument};
use tracing::debug;

use crate::errors::{IndexError, Result};
use crate::features::context::{ContextPool, IndexingContext};
use crate::features::creator::construct_artifact_info;
use crate::shared::models::ArtifactInfo;

use super::IteratorSearchRequest;

struct SearchSource<'a> {
    context: &'a IndexingContext,
    searcher: Searcher,
    _guard: RwLockReadGuard<'a, Option<ContextPool>>,
}

struct Hit {
    score: f32,
    source: usize,
    address: DocAddress,
}

/// Single-pass cursor yielding [`ArtifactInfo`] values ordered by score
/// descending, then document address ascending.
pub struct IteratorResultSet<'a> {
    sources: Vec<SearchSource<'a>>,
    hits: std::vec::IntoIter<Hit>,
    remaining: Option<usize>,
    total_hits: usize,
}

impl<'a> IteratorResultSet<'a> {
    pub(crate) fn open(
        request: &IteratorSearchRequest,
        contexts: &[&'a IndexingContext],
        ignore_searchable: bool,
    ) -> Result<IteratorResultSet<'a>> {
        let mut sources = Vec::new();
        for &context in contexts {
            if !ignore_searchable && !context.is_searchable() {
                continue;
            }
            let guard = context.pool().read();
            // A closed context aborts construction; guards collected so
            // far are released on drop.
            if guard.is_none() {
                return Err(IndexError::Closed);
            }
            let searcher = guard.as_ref().map(|pool| pool.searcher.clone()).unwrap();
            sources.push(SearchSource {
                context,
                searcher,
                _guard: guard,
            });
        }

        let mut hits: Vec<Hit> = Vec::new();
        for (source_index, source) in sources.iter().enumerate() {
            let limit = (source.searcher.num_docs() as usize).max(1);
            let top = source
                .searcher
                .search(request.query.as_ref(), &TopDocs::with_limit(limit))?;
            hits.extend(top.into_iter().map(|(score, address)| Hit {
                score,
                source: source_index,
                address,
            }));
        }

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.source.cmp(&b.source))
                .then(a.address.cmp(&b.address))
        });
        let total_hits = hits.len();

        if request.start > 0 {
            hits.drain(..request.start.min(hits.len()));
        }

        Ok(IteratorResultSet {
            sources,
            hits: hits.into_iter(),
            remaining: request.count,
            total_hits,
        })
    }

    /// Number of raw hits across all contexts, before paging bounds and
    /// before unrecognised documents are skipped.
    pub fn total_hits(&self) -> usize {
        self.total_hits
    }
}

impl<'a> Iterator for IteratorResultSet<'a> {
    type Item = ArtifactInfo;

    fn next(&mut self) -> Option<ArtifactInfo> {
        if self.remaining == Some(0) {
            return None;
        }
        for hit in self.hits.by_ref() {
            let source = &self.sources[hit.source];
            let doc: TantivyDocument = match source.searcher.doc(hit.address) {
                Ok(doc) => doc,
                Err(e) => {
                    debug!(error = %e, "failed to load hit document, skipping");
                    continue;
                }
            };
            let Some(mut info) =
                construct_artifact_info(&doc, source.context.fields(), source.context.creators())
            else {
                continue;
            };
            info.repository_id = source.context.repository_id().to_string();
            info.context_id = source.context.id().to_string();
            if let Some(remaining) = &mut self.remaining {
                *remaining -= 1;
            }
            return Some(info);
        }
        None
    }
}
