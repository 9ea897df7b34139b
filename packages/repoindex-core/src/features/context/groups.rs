//! Group cache: the persisted sets of all group ids and root group ids.
//!
//! Both sets live in the index itself, as one document each keyed by a
//! reserved `UINFO` marker, with the members joined by the record
//! separator in a stored-only list field. Reads are a single term
//! lookup; rebuilds scan every live document once.

use std::collections::BTreeSet;

use tantivy::collector::{DocSetCollector, TopDocs};
use tantivy::query::{AllQuery, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::{TantivyDocument, Term};

use crate::errors::{IndexError, Result};
use crate::shared::models::FS;

use super::{ContextPool, IndexingContext};

/// Reserved `UINFO` of the all-groups document.
pub const ALL_GROUPS_MARKER: &str = "allGroups";

/// Reserved `UINFO` of the root-groups document.
pub const ROOT_GROUPS_MARKER: &str = "rootGroups";

/// Group-cache documents carry a `UINFO` so they can be addressed by
/// term, but they are not artifacts: search, merge and the packer skip
/// these markers.
pub fn is_reserved_marker(uinfo: &str) -> bool {
    uinfo == ALL_GROUPS_MARKER || uinfo == ROOT_GROUPS_MARKER
}

impl IndexingContext {
    /// Every `groupId` present in this context.
    pub fn all_groups(&self) -> Result<BTreeSet<String>> {
        self.read_group_list(ALL_GROUPS_MARKER, self.fields.all_groups_list())
    }

    /// The first dot-separated segment of every `groupId`.
    pub fn root_groups(&self) -> Result<BTreeSet<String>> {
        self.read_group_list(ROOT_GROUPS_MARKER, self.fields.root_groups_list())
    }

    pub fn set_all_groups(&self, groups: &BTreeSet<String>) -> Result<()> {
        self.write_group_list(ALL_GROUPS_MARKER, self.fields.all_groups_list(), groups)
    }

    pub fn set_root_groups(&self, groups: &BTreeSet<String>) -> Result<()> {
        self.write_group_list(ROOT_GROUPS_MARKER, self.fields.root_groups_list(), groups)
    }

    /// Recompute both group documents from the live artifact documents.
    pub fn rebuild_groups(&self) -> Result<()> {
        let mut guard = self.pool.write();
        let pool = guard.as_mut().ok_or(IndexError::Closed)?;
        self.rebuild_groups_in(pool)
    }

    pub(crate) fn rebuild_groups_in(&self, pool: &mut ContextPool) -> Result<()> {
        Self::refresh_readers_in(&self.fields, pool)?;

        let searcher = pool.reader.searcher();
        let addresses = searcher.search(&AllQuery, &DocSetCollector)?;

        let mut all = BTreeSet::new();
        let mut roots = BTreeSet::new();
        for addr in addresses {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let Some(uinfo) = doc.get_first(self.fields.uinfo()).and_then(|v| v.as_str()) else {
                continue;
            };
            if is_reserved_marker(uinfo) {
                continue;
            }
            let Some(group_id) = uinfo.split(FS).next().filter(|g| !g.is_empty()) else {
                continue;
            };
            all.insert(group_id.to_string());
            roots.insert(
                group_id
                    .split('.')
                    .next()
                    .unwrap_or(group_id)
                    .to_string(),
            );
        }

        self.set_group_list_in(pool, ALL_GROUPS_MARKER, self.fields.all_groups_list(), &all)?;
        self.set_group_list_in(
            pool,
            ROOT_GROUPS_MARKER,
            self.fields.root_groups_list(),
            &roots,
        )?;
        Self::refresh_readers_in(&self.fields, pool)
    }

    fn write_group_list(
        &self,
        marker: &str,
        list_field: Field,
        groups: &BTreeSet<String>,
    ) -> Result<()> {
        let mut guard = self.pool.write();
        let pool = guard.as_mut().ok_or(IndexError::Closed)?;
        self.set_group_list_in(pool, marker, list_field, groups)?;
        Self::refresh_readers_in(&self.fields, pool)
    }

    fn set_group_list_in(
        &self,
        pool: &mut ContextPool,
        marker: &str,
        list_field: Field,
        groups: &BTreeSet<String>,
    ) -> Result<()> {
        let joined = groups.iter().cloned().collect::<Vec<_>>().join(FS);

        let mut doc = TantivyDocument::default();
        doc.add_text(self.fields.uinfo(), marker);
        doc.add_text(list_field, joined);

        let writer = pool.writer.get_mut();
        writer.delete_term(Term::from_field_text(self.fields.uinfo(), marker));
        writer.add_document(doc)?;
        writer.commit()?;
        Ok(())
    }

    fn read_group_list(&self, marker: &str, list_field: Field) -> Result<BTreeSet<String>> {
        let guard = self.pool.read();
        let pool = guard.as_ref().ok_or(IndexError::Closed)?;
        pool.reader.reload()?;
        let searcher = pool.reader.searcher();

        let query = TermQuery::new(
            Term::from_field_text(self.fields.uinfo(), marker),
            IndexRecordOption::Basic,
        );
        let hits = searcher.search(&query, &TopDocs::with_limit(1))?;
        let Some((_, addr)) = hits.first() else {
            return Ok(BTreeSet::new());
        };

        let doc: TantivyDocument = searcher.doc(*addr)?;
        Ok(doc
            .get_first(list_field)
            .and_then(|v| v.as_str())
            .map(|list| {
                list.split(FS)
                    .filter(|g| !g.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}

