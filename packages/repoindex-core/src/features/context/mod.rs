//! Indexing context: the lockable owner of one on-disk inverted index.
//!
//! # Architecture
//!
//! ```text
//! IndexingContext
//!   ├── RwLock<Option<ContextPool>>     shared state, None = closed
//!   │     ├── Index                      tantivy index + tokenizers
//!   │     ├── Mutex<IndexWriter>         the writer singleton
//!   │     ├── IndexReader                manual reload policy
//!   │     └── Searcher                   committed snapshot
//!   ├── timestamp                        persisted to `timestamp` file
//!   └── .context.lock                    one process per directory
//! ```
//!
//! Shared operations (searches, commit, group reads, handing out the
//! writer) take the read lease; operations that may replace the pool
//! (rollback, optimize, purge, replace, merge, close, group rewrites)
//! take the write lease. The writer serialises its own append/delete
//! traffic, which is what makes handing it out under a shared lease
//! sound — it is only ever swapped under the exclusive lease.
//!
//! A failed commit drops the pool: the context enters the closed state
//! and every subsequent call returns [`IndexError::Closed`] until the
//! caller reopens it.

pub mod groups;
pub mod timestamp;

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use tantivy::collector::{Count, DocSetCollector, TopDocs};
use tantivy::query::{AllQuery, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{
    DocAddress, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term,
};
use tracing::debug;

use crate::errors::{IndexError, Result};
use crate::features::creator::{build_document, construct_artifact_info, IndexCreator};
use crate::features::schema::{register_tokenizers, SchemaFields};
use crate::shared::models::{ArtifactInfo, M2GavCalculator, FS};

/// Standard name of the published repository index.
pub const INDEX_FILE: &str = "nexus-maven-repository-index";

/// Contents of the descriptor marker field.
pub const DESCRIPTOR_CONTENTS: &str = "NexusIndex";

/// Index format version carried in the descriptor. Versions other than
/// this one are refused on open.
pub const INDEX_VERSION: &str = "1.0";

/// Standard location of a published index below the repository url.
const INDEX_DIRECTORY: &str = ".index";

const PROCESS_LOCK_FILE: &str = ".context.lock";

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Filter applied to source documents during [`IndexingContext::merge_filtered`].
pub type DocumentFilter = dyn Fn(&TantivyDocument) -> bool + Sync;

/// Construction parameters for an indexing context.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    pub id: String,
    pub repository_id: String,
    pub repository: Option<PathBuf>,
    pub repository_url: Option<String>,
    pub index_update_url: Option<String>,
    /// Adopt an existing index directory even when its descriptor does
    /// not match, rewriting the descriptor as ours.
    pub reclaim: bool,
}

impl ContextConfig {
    pub fn new(id: impl Into<String>, repository_id: impl Into<String>) -> ContextConfig {
        ContextConfig {
            id: id.into(),
            repository_id: repository_id.into(),
            repository: None,
            repository_url: None,
            index_update_url: None,
            reclaim: false,
        }
    }

    pub fn with_repository(mut self, path: impl Into<PathBuf>) -> Self {
        self.repository = Some(path.into());
        self
    }

    pub fn with_repository_url(mut self, url: impl Into<String>) -> Self {
        self.repository_url = Some(url.into());
        self
    }

    pub fn with_index_update_url(mut self, url: impl Into<String>) -> Self {
        self.index_update_url = Some(url.into());
        self
    }

    pub fn with_reclaim(mut self, reclaim: bool) -> Self {
        self.reclaim = reclaim;
        self
    }
}

/// The reader/writer/searcher triple. Replaced as a unit, only ever
/// under the exclusive lease.
pub(crate) struct ContextPool {
    pub(crate) index: Index,
    pub(crate) writer: Mutex<IndexWriter>,
    pub(crate) reader: IndexReader,
    pub(crate) searcher: Searcher,
}

enum ContextDirectory {
    Disk {
        path: PathBuf,
        /// Held for the lifetime of the context; advisory locks are
        /// released by the OS if the process dies, so stale locks do
        /// not survive crashes.
        _lock: File,
    },
    Ram,
}

/// A stateful handle on one repository's index.
pub struct IndexingContext {
    id: String,
    repository_id: String,
    repository: Option<PathBuf>,
    repository_url: Option<String>,
    index_update_url: Option<String>,
    directory: ContextDirectory,
    searchable: AtomicBool,
    timestamp: Mutex<Option<DateTime<Utc>>>,
    gav_calculator: M2GavCalculator,
    creators: Arc<Vec<Box<dyn IndexCreator>>>,
    fields: SchemaFields,
    pool: RwLock<Option<ContextPool>>,
}

impl IndexingContext {
    /// Open (or create) an on-disk context. The directory is locked for
    /// this process; the descriptor is validated or written.
    pub(crate) fn open(
        config: ContextConfig,
        index_dir: &Path,
        creators: Arc<Vec<Box<dyn IndexCreator>>>,
        fields: SchemaFields,
    ) -> Result<IndexingContext> {
        std::fs::create_dir_all(index_dir)?;
        let lock = acquire_directory_lock(index_dir)?;
        let pool = open_pool_on_disk(index_dir, &fields)?;
        let timestamp = timestamp::read_timestamp_file(index_dir);

        let context = IndexingContext {
            id: config.id,
            repository_id: config.repository_id,
            repository: config.repository,
            repository_url: config.repository_url,
            index_update_url: config.index_update_url,
            directory: ContextDirectory::Disk {
                path: index_dir.to_path_buf(),
                _lock: lock,
            },
            searchable: AtomicBool::new(true),
            timestamp: Mutex::new(timestamp),
            gav_calculator: M2GavCalculator::new(),
            creators,
            fields,
            pool: RwLock::new(Some(pool)),
        };
        context.prepare_index(config.reclaim)?;
        Ok(context)
    }

    /// Open a scratch context backed by RAM. Useful for tests and
    /// short-lived merges; `replace` and legacy zip snapshots need a
    /// disk directory and refuse RAM contexts.
    pub(crate) fn open_in_ram(
        config: ContextConfig,
        creators: Arc<Vec<Box<dyn IndexCreator>>>,
        fields: SchemaFields,
    ) -> Result<IndexingContext> {
        let index = Index::create_in_ram(fields.schema.clone());
        register_tokenizers(&index);
        let pool = build_pool(index)?;

        let context = IndexingContext {
            id: config.id,
            repository_id: config.repository_id,
            repository: config.repository,
            repository_url: config.repository_url,
            index_update_url: config.index_update_url,
            directory: ContextDirectory::Ram,
            searchable: AtomicBool::new(true),
            timestamp: Mutex::new(None),
            gav_calculator: M2GavCalculator::new(),
            creators,
            fields,
            pool: RwLock::new(Some(pool)),
        };
        context.prepare_index(config.reclaim)?;
        Ok(context)
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }

    pub fn repository(&self) -> Option<&Path> {
        self.repository.as_deref()
    }

    pub fn repository_url(&self) -> Option<&str> {
        self.repository_url.as_deref()
    }

    /// The url peers download the published index from. Defaults to
    /// `<repositoryUrl>/.index` when only the repository url is known.
    pub fn index_update_url(&self) -> Option<String> {
        let explicit = self
            .index_update_url
            .as_deref()
            .filter(|u| !u.trim().is_empty());
        match (explicit, self.repository_url.as_deref()) {
            (Some(url), _) => Some(url.to_string()),
            (None, Some(repo)) => {
                let sep = if repo.ends_with('/') { "" } else { "/" };
                Some(format!("{repo}{sep}{INDEX_DIRECTORY}"))
            }
            (None, None) => None,
        }
    }

    pub fn index_directory_path(&self) -> Option<&Path> {
        match &self.directory {
            ContextDirectory::Disk { path, .. } => Some(path),
            ContextDirectory::Ram => None,
        }
    }

    pub fn is_searchable(&self) -> bool {
        self.searchable.load(Ordering::Relaxed)
    }

    pub fn set_searchable(&self, searchable: bool) {
        self.searchable.store(searchable, Ordering::Relaxed);
    }

    pub fn gav_calculator(&self) -> &M2GavCalculator {
        &self.gav_calculator
    }

    pub fn creators(&self) -> &[Box<dyn IndexCreator>] {
        &self.creators
    }

    pub(crate) fn fields(&self) -> &SchemaFields {
        &self.fields
    }

    pub(crate) fn pool(&self) -> &RwLock<Option<ContextPool>> {
        &self.pool
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        *self.timestamp.lock()
    }

    /// Set the timestamp to now.
    pub fn update_timestamp(&self, save: bool) -> Result<()> {
        self.update_timestamp_to(save, Some(Utc::now()))
    }

    /// Set (or, with `None`, reset) the timestamp; `save` persists the
    /// change into the index directory.
    pub fn update_timestamp_to(&self, save: bool, ts: Option<DateTime<Utc>>) -> Result<()> {
        *self.timestamp.lock() = ts;
        if save {
            if let ContextDirectory::Disk { path, .. } = &self.directory {
                timestamp::write_timestamp_file(path, ts)?;
            }
        }
        Ok(())
    }

    /// Number of live documents (descriptor and group markers included).
    /// Only meaningful for comparisons between contexts.
    pub fn size(&self) -> Result<usize> {
        let guard = self.pool.read();
        let pool = guard.as_ref().ok_or(IndexError::Closed)?;
        pool.reader.reload()?;
        Ok(pool.reader.searcher().num_docs() as usize)
    }

    /// Run `f` against the current committed searcher, under the shared
    /// lease.
    pub fn with_searcher<T>(&self, f: impl FnOnce(&Searcher) -> Result<T>) -> Result<T> {
        let guard = self.pool.read();
        let pool = guard.as_ref().ok_or(IndexError::Closed)?;
        f(&pool.searcher)
    }

    /// Run `f` against the writer, under the shared lease. The writer
    /// serialises its own append/delete traffic and is only ever
    /// replaced under the exclusive lease, so the handle stays valid
    /// for the duration of `f`.
    pub fn with_writer<T>(&self, f: impl FnOnce(&IndexWriter) -> Result<T>) -> Result<T> {
        let guard = self.pool.read();
        let pool = guard.as_ref().ok_or(IndexError::Closed)?;
        let writer = pool.writer.lock();
        f(&writer)
    }

    // ── Write path ─────────────────────────────────────────────────────

    /// Index (or re-index) one artifact record, replacing any previous
    /// document with the same `UINFO`.
    pub fn add_artifact(&self, info: &ArtifactInfo) -> Result<()> {
        let guard = self.pool.read();
        let pool = guard.as_ref().ok_or(IndexError::Closed)?;
        let doc = build_document(info, &self.fields, &self.creators);
        let writer = pool.writer.lock();
        writer.delete_term(Term::from_field_text(self.fields.uinfo(), &info.uinfo()));
        writer.add_document(doc)?;
        Ok(())
    }

    /// Remove an artifact and record a tombstone carrying its `UINFO`,
    /// so that incremental consumers can propagate the deletion.
    pub fn delete_artifact(&self, uinfo: &str) -> Result<()> {
        let guard = self.pool.read();
        let pool = guard.as_ref().ok_or(IndexError::Closed)?;
        let writer = pool.writer.lock();
        writer.delete_term(Term::from_field_text(self.fields.uinfo(), uinfo));
        let mut tombstone = TantivyDocument::default();
        tombstone.add_text(self.fields.deleted(), uinfo);
        writer.add_document(tombstone)?;
        Ok(())
    }

    /// Flush the writer. Readers are refreshed opportunistically: if the
    /// exclusive lease is free, the searcher is replaced with one over
    /// the committed state and warmed up.
    pub fn commit(&self) -> Result<()> {
        let committed = {
            let guard = self.pool.read();
            let pool = guard.as_ref().ok_or(IndexError::Closed)?;
            let mut writer = pool.writer.lock();
            writer.commit()
        };
        match committed {
            Ok(_) => {
                self.try_refresh_readers();
                Ok(())
            }
            Err(e) => {
                self.force_close();
                Err(e.into())
            }
        }
    }

    /// Discard uncommitted changes.
    pub fn rollback(&self) -> Result<()> {
        let mut guard = self.pool.write();
        let pool = guard.as_mut().ok_or(IndexError::Closed)?;
        match pool.writer.get_mut().rollback() {
            Ok(_) => Ok(()),
            Err(e) => {
                *guard = None;
                Err(e.into())
            }
        }
    }

    /// Compact the index into a single segment, then commit and refresh.
    pub fn optimize(&self) -> Result<()> {
        let mut guard = self.pool.write();
        let pool = guard.as_mut().ok_or(IndexError::Closed)?;
        match Self::optimize_in(&self.fields, pool) {
            Ok(()) => Ok(()),
            Err(e) => {
                *guard = None;
                Err(e)
            }
        }
    }

    /// Delete every document, restore the descriptor, rebuild the group
    /// cache and reset the timestamp.
    pub fn purge(&self) -> Result<()> {
        {
            let mut guard = self.pool.write();
            let pool = guard.as_mut().ok_or(IndexError::Closed)?;
            let purged = (|| -> Result<()> {
                {
                    let writer = pool.writer.get_mut();
                    writer.delete_all_documents()?;
                    writer.commit()?;
                }
                self.store_descriptor_in(pool)?;
                self.rebuild_groups_in(pool)?;
                Self::refresh_readers_in(&self.fields, pool)
            })();
            if let Err(e) = purged {
                *guard = None;
                return Err(e);
            }
        }
        self.update_timestamp_to(true, None)
    }

    /// Replace this index with the contents of `source` (a directory
    /// holding an index written with the same schema). The descriptor is
    /// reclaimed as ours and the source timestamp adopted.
    pub fn replace(&self, source: &Path) -> Result<()> {
        let path = match &self.directory {
            ContextDirectory::Disk { path, .. } => path.clone(),
            ContextDirectory::Ram => {
                return Err(IndexError::Io(std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "replace requires an on-disk index directory",
                )))
            }
        };
        let source_ts = timestamp::read_timestamp_file(source);

        let mut guard = self.pool.write();
        // Drop the current pool first so the writer releases its lock
        // before the directory is wiped.
        guard.take();

        let replaced = (|| -> Result<ContextPool> {
            if !source.join("meta.json").exists() {
                return Err(IndexError::unsupported(format!(
                    "{} is not an index directory",
                    source.display()
                )));
            }
            delete_index_files(&path)?;
            copy_index_files(source, &path)?;
            let mut pool = open_pool_on_disk(&path, &self.fields)?;
            self.store_descriptor_in(&mut pool)?;
            Self::optimize_in(&self.fields, &mut pool)?;
            Ok(pool)
        })();

        match replaced {
            Ok(pool) => {
                *guard = Some(pool);
                drop(guard);
                self.update_timestamp_to(true, source_ts)
            }
            // Pool stays None: the context is closed until reopened.
            Err(e) => Err(e),
        }
    }

    /// Merge the contents of `source` into this index. Documents whose
    /// `UINFO` is already present are skipped; tombstones delete their
    /// target and are persisted themselves. Groups are rebuilt, the
    /// newer timestamp wins, and the index is optimized.
    pub fn merge(&self, source: &Path) -> Result<()> {
        self.merge_filtered(source, None)
    }

    pub fn merge_filtered(&self, source: &Path, filter: Option<&DocumentFilter>) -> Result<()> {
        let source_ts = timestamp::read_timestamp_file(source);
        {
            let mut guard = self.pool.write();
            let pool = guard.as_mut().ok_or(IndexError::Closed)?;
            if let Err(e) = self.merge_in(pool, source, filter) {
                *guard = None;
                return Err(e);
            }
        }
        let new_ts = match (self.timestamp(), source_ts) {
            (Some(current), Some(merged)) if merged > current => merged,
            _ => Utc::now(),
        };
        self.update_timestamp_to(true, Some(new_ts))
    }

    /// Persist the timestamp, flush and drop the pool, optionally wipe
    /// the index files. The context cannot be used afterwards.
    pub fn close(&self, delete_files: bool) -> Result<()> {
        let mut guard = self.pool.write();
        let mut flush_result = Ok(());
        if let Some(pool) = guard.take() {
            let mut writer = pool.writer.into_inner();
            flush_result = writer.commit().map(|_| ()).map_err(IndexError::from);
        }
        if let ContextDirectory::Disk { path, .. } = &self.directory {
            timestamp::write_timestamp_file(path, *self.timestamp.lock())?;
            if delete_files {
                delete_index_files(path)?;
            }
        }
        flush_result
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn prepare_index(&self, reclaim: bool) -> Result<()> {
        let mut guard = self.pool.write();
        let pool = guard.as_mut().ok_or(IndexError::Closed)?;
        if pool.searcher.num_docs() > 0 {
            self.check_and_update_descriptor(pool, reclaim)
        } else {
            self.store_descriptor_in(pool)
        }
    }

    fn check_and_update_descriptor(&self, pool: &mut ContextPool, reclaim: bool) -> Result<()> {
        if reclaim {
            return self.store_descriptor_in(pool);
        }

        let term = Term::from_field_text(self.fields.descriptor(), DESCRIPTOR_CONTENTS);
        let query = TermQuery::new(term, IndexRecordOption::Basic);
        let hits = pool.searcher.search(&query, &TopDocs::with_limit(2))?;

        let Some((_, addr)) = hits.first() else {
            return Err(IndexError::unsupported(
                "the existing index has no descriptor",
            ));
        };
        let doc: TantivyDocument = pool.searcher.doc(*addr)?;
        let idxinfo = doc
            .get_first(self.fields.idxinfo())
            .and_then(|v| v.as_str())
            .ok_or_else(|| IndexError::unsupported("descriptor document has no index info"))?;

        let mut parts = idxinfo.split(FS);
        let version = parts.next().unwrap_or_default();
        let repository_id = parts.next().unwrap_or_default();

        if version != INDEX_VERSION {
            return Err(IndexError::unsupported(format!(
                "the existing index has version [{version}], expected [{INDEX_VERSION}]"
            )));
        }
        if repository_id != self.repository_id {
            return Err(IndexError::unsupported(format!(
                "the existing index is for repository [{repository_id}], \
                 not for repository [{}]",
                self.repository_id
            )));
        }

        if hits.len() > 1 {
            // Collapse duplicate descriptors back to one.
            self.store_descriptor_in(pool)?;
        }
        Ok(())
    }

    fn store_descriptor_in(&self, pool: &mut ContextPool) -> Result<()> {
        let mut doc = TantivyDocument::default();
        doc.add_text(self.fields.descriptor(), DESCRIPTOR_CONTENTS);
        doc.add_text(
            self.fields.idxinfo(),
            format!("{INDEX_VERSION}{FS}{}", self.repository_id),
        );
        {
            let writer = pool.writer.get_mut();
            writer.delete_term(Term::from_field_text(
                self.fields.descriptor(),
                DESCRIPTOR_CONTENTS,
            ));
            writer.add_document(doc)?;
            writer.commit()?;
        }
        Self::refresh_readers_in(&self.fields, pool)
    }

    fn merge_in(
        &self,
        pool: &mut ContextPool,
        source: &Path,
        filter: Option<&DocumentFilter>,
    ) -> Result<()> {
        let source_index = Index::open_in_dir(source)?;
        self.fields.check_index_schema(&source_index)?;
        let source_reader: IndexReader = source_index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let source_searcher = source_reader.searcher();

        Self::refresh_readers_in(&self.fields, pool)?;

        let mut addresses: Vec<DocAddress> = source_searcher
            .search(&AllQuery, &DocSetCollector)?
            .into_iter()
            .collect();
        addresses.sort();

        let mut added: HashSet<String> = HashSet::new();
        for addr in addresses {
            let doc: TantivyDocument = source_searcher.doc(addr)?;
            if let Some(filter) = filter {
                if !filter(&doc) {
                    continue;
                }
            }

            if let Some(uinfo) = doc.get_first(self.fields.uinfo()).and_then(|v| v.as_str()) {
                if groups::is_reserved_marker(uinfo) || added.contains(uinfo) {
                    continue;
                }
                let present = count_term(&pool.searcher, self.fields.uinfo(), uinfo)? > 0;
                if present {
                    continue;
                }
                // Rewrite through the creator chain so adopted documents
                // are normalised to our field layout.
                if let Some(info) = construct_artifact_info(&doc, &self.fields, &self.creators) {
                    let normalised = build_document(&info, &self.fields, &self.creators);
                    pool.writer.lock().add_document(normalised)?;
                    added.insert(uinfo.to_string());
                }
            } else if let Some(deleted) = doc
                .get_first(self.fields.deleted())
                .and_then(|v| v.as_str())
            {
                // Applying the delete and dropping the tombstone would
                // lose the deletion for incremental consumers; keep it.
                let writer = pool.writer.lock();
                writer.delete_term(Term::from_field_text(self.fields.uinfo(), deleted));
                let mut tombstone = TantivyDocument::default();
                tombstone.add_text(self.fields.deleted(), deleted);
                writer.add_document(tombstone)?;
            }
        }

        pool.writer.get_mut().commit()?;
        self.rebuild_groups_in(pool)?;
        Self::optimize_in(&self.fields, pool)
    }

    fn optimize_in(fields: &SchemaFields, pool: &mut ContextPool) -> Result<()> {
        {
            let writer = pool.writer.get_mut();
            writer.commit()?;
            let segment_ids = pool.index.searchable_segment_ids()?;
            if segment_ids.len() > 1 {
                writer.merge(&segment_ids).wait()?;
            }
        }
        Self::refresh_readers_in(fields, pool)
    }

    pub(crate) fn refresh_readers_in(fields: &SchemaFields, pool: &mut ContextPool) -> Result<()> {
        pool.reader.reload()?;
        pool.searcher = pool.reader.searcher();
        // Warm up term dictionaries and caches.
        let term = Term::from_field_text(fields.group_id_kw(), "org");
        let warmup = TermQuery::new(term, IndexRecordOption::Basic);
        let _ = pool.searcher.search(&warmup, &Count);
        Ok(())
    }

    fn try_refresh_readers(&self) {
        if let Some(mut guard) = self.pool.try_write() {
            if let Some(pool) = guard.as_mut() {
                if let Err(e) = Self::refresh_readers_in(&self.fields, pool) {
                    debug!(context = %self.id, error = %e, "reader refresh failed");
                }
            }
        }
    }

    fn force_close(&self) {
        *self.pool.write() = None;
    }
}

impl std::fmt::Debug for IndexingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexingContext")
            .field("id", &self.id)
            .field("repository_id", &self.repository_id)
            .field("timestamp", &self.timestamp())
            .finish()
    }
}

fn acquire_directory_lock(dir: &Path) -> Result<File> {
    let path = dir.join(PROCESS_LOCK_FILE);
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&path)?;
    file.try_lock_exclusive().map_err(|_| {
        IndexError::Io(std::io::Error::new(
            std::io::ErrorKind::WouldBlock,
            format!(
                "index directory {} is already in use by another process",
                dir.display()
            ),
        ))
    })?;
    Ok(file)
}

fn open_pool_on_disk(path: &Path, fields: &SchemaFields) -> Result<ContextPool> {
    let index = if path.join("meta.json").exists() {
        let index = Index::open_in_dir(path)?;
        fields.check_index_schema(&index)?;
        index
    } else {
        Index::create_in_dir(path, fields.schema.clone())?
    };
    register_tokenizers(&index);
    build_pool(index)
}

fn build_pool(index: Index) -> Result<ContextPool> {
    let writer: IndexWriter = index.writer(WRITER_HEAP_BYTES)?;
    let reader: IndexReader = index
        .reader_builder()
        .reload_policy(ReloadPolicy::Manual)
        .try_into()?;
    let searcher = reader.searcher();
    Ok(ContextPool {
        index,
        writer: Mutex::new(writer),
        reader,
        searcher,
    })
}

pub(crate) fn count_term(
    searcher: &Searcher,
    field: tantivy::schema::Field,
    value: &str,
) -> Result<usize> {
    let query = TermQuery::new(
        Term::from_field_text(field, value),
        IndexRecordOption::Basic,
    );
    Ok(searcher.search(&query, &Count)?)
}

/// Delete every file of the index directory except the process lock.
fn delete_index_files(dir: &Path) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy() == PROCESS_LOCK_FILE {
            continue;
        }
        std::fs::remove_file(entry.path())?;
    }
    Ok(())
}

/// Copy index files from `source`, leaving lock files and the source
/// timestamp behind.
fn copy_index_files(source: &Path, target: &Path) -> Result<()> {
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if name_str.ends_with(".lock")
            || name_str == PROCESS_LOCK_FILE
            || name_str == timestamp::TIMESTAMP_FILE
        {
            continue;
        }
        std::fs::copy(entry.path(), target.join(&name))?;
    }
    Ok(())
}
