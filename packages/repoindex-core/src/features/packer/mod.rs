//! Index publication: full snapshot plus a bounded chain of incremental
//! chunks.
//!
//! Every pack writes the full `.gz` snapshot (and the legacy `.zip` of
//! the index directory). With incremental chunks enabled, a delta chunk
//! `.<n>.gz` is added per pack that changed the index, and the
//! properties file tracks the chain: a `chain-id` minted when the chain
//! (re)starts, the highest chunk counter ever emitted, and the counter
//! of each of the most recent `max_index_chunks` chunks.
//!
//! The delta is computed by set difference against a baseline file
//! recording the identity key of every artifact document in the last
//! published snapshot — never from document id ordering, which does not
//! survive optimize. A baseline key that disappears without a matching
//! tombstone means the history is gone (purge, replace), and the chain
//! resets: consumers holding a different chain id must take the full
//! snapshot.

pub mod properties;
pub mod transfer;

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use md5::Md5;
use sha1::{Digest, Sha1};
use tantivy::collector::DocSetCollector;
use tantivy::TantivyDocument;
use tracing::{debug, info};
use uuid::Uuid;
use zip::write::FileOptions;

use crate::errors::{IndexError, Result};
use crate::features::context::groups::is_reserved_marker;
use crate::features::context::timestamp::{format_timestamp, parse_timestamp};
use crate::features::context::{IndexingContext, INDEX_FILE};
use crate::features::creator::minimal::to_hex;
use crate::features::schema::fields::{FLD_DELETED, FLD_UINFO};

use transfer::{ChunkWriter, TransferDocument};

pub const INDEX_ID_KEY: &str = "nexus.index.id";
pub const INDEX_TIMESTAMP_KEY: &str = "nexus.index.timestamp";
pub const INDEX_CHAIN_ID_KEY: &str = "nexus.index.chain-id";
pub const INDEX_CHUNK_COUNTER_KEY: &str = "nexus.index.last-incremental";
pub const INDEX_CHUNK_PREFIX: &str = "nexus.index.incremental-";

const DEFAULT_MAX_CHUNKS: usize = 30;

const BASELINE_LIVE_PREFIX: &str = "U:";
const BASELINE_TOMBSTONE_PREFIX: &str = "D:";

/// What to publish, and where.
pub struct IndexPackingRequest<'a> {
    pub context: &'a IndexingContext,
    pub target_dir: PathBuf,
    pub create_incremental_chunks: bool,
    pub create_checksum_files: bool,
    pub max_index_chunks: usize,
}

impl<'a> IndexPackingRequest<'a> {
    pub fn new(context: &'a IndexingContext, target_dir: impl Into<PathBuf>) -> Self {
        IndexPackingRequest {
            context,
            target_dir: target_dir.into(),
            create_incremental_chunks: true,
            create_checksum_files: false,
            max_index_chunks: DEFAULT_MAX_CHUNKS,
        }
    }

    pub fn with_incremental_chunks(mut self, enabled: bool) -> Self {
        self.create_incremental_chunks = enabled;
        self
    }

    pub fn with_checksum_files(mut self, enabled: bool) -> Self {
        self.create_checksum_files = enabled;
        self
    }

    pub fn with_max_index_chunks(mut self, max: usize) -> Self {
        self.max_index_chunks = max.max(1);
        self
    }
}

/// Everything the packer pulled out of the index in one pass under the
/// shared lease.
struct PackedState {
    all_docs: Vec<TransferDocument>,
    delta_candidates: Vec<(String, TransferDocument)>,
    keys: BTreeSet<String>,
}

/// Publishes a context as a downloadable snapshot plus delta chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct IndexPacker;

impl IndexPacker {
    pub fn new() -> IndexPacker {
        IndexPacker
    }

    pub fn pack_index(&self, request: &IndexPackingRequest<'_>) -> Result<()> {
        std::fs::create_dir_all(&request.target_dir)?;
        let context = request.context;
        let target = request.target_dir.as_path();

        let state = collect_documents(context)?;

        let context_ts = context.timestamp();
        let publish_ts = context_ts.unwrap_or_else(Utc::now);
        let ts_millis = publish_ts.timestamp_millis() as u64;

        let props_path = target.join(format!("{INDEX_FILE}.properties"));
        let old_props = if props_path.exists() {
            Some(properties::read_properties(&props_path)?)
        } else {
            None
        };
        let prev_ts = old_props
            .as_ref()
            .and_then(|p| p.get(INDEX_TIMESTAMP_KEY))
            .and_then(|raw| parse_timestamp(raw));

        let mut written: Vec<PathBuf> = Vec::new();

        let mut props: BTreeMap<String, String> = BTreeMap::new();
        props.insert(INDEX_ID_KEY.to_string(), context.id().to_string());
        props.insert(
            INDEX_TIMESTAMP_KEY.to_string(),
            format_timestamp(publish_ts),
        );

        // An index not newer than the published one refreshes the full
        // snapshot and leaves the chain untouched.
        let unchanged = match (context_ts, prev_ts) {
            (Some(current), Some(previous)) => current <= previous,
            _ => false,
        };

        if request.create_incremental_chunks && !unchanged {
            self.advance_chain(request, &state, ts_millis, old_props.as_ref(), &mut props, &mut written)?;
        } else if let Some(old) = &old_props {
            // Carry existing chain bookkeeping through unchanged packs.
            for (key, value) in old {
                if key == INDEX_CHAIN_ID_KEY
                    || key == INDEX_CHUNK_COUNTER_KEY
                    || key.starts_with(INDEX_CHUNK_PREFIX)
                {
                    props.insert(key.clone(), value.clone());
                }
            }
            if unchanged {
                if let Some(previous) = old.get(INDEX_TIMESTAMP_KEY) {
                    props.insert(INDEX_TIMESTAMP_KEY.to_string(), previous.clone());
                }
            }
        }

        // Full snapshot, legacy zip, baseline, then properties last so a
        // failure mid-flight leaves the previous publication valid.
        let full_path = target.join(format!("{INDEX_FILE}.gz"));
        write_transfer_file(&full_path, ts_millis, &state.all_docs)?;
        written.push(full_path);

        if let Some(index_dir) = context.index_directory_path() {
            let zip_path = target.join(format!("{INDEX_FILE}.zip"));
            write_legacy_zip(index_dir, &zip_path)?;
            written.push(zip_path);
        }

        if request.create_incremental_chunks {
            write_baseline(target, &state.keys)?;
        }

        properties::write_properties(&props_path, &props)?;
        written.push(props_path);

        if request.create_checksum_files {
            for path in &written {
                write_checksum_files(path)?;
            }
        }

        info!(
            context = context.id(),
            documents = state.all_docs.len(),
            "index packed"
        );
        Ok(())
    }

    /// Compute the delta, emit the chunk, shift the chunk window, drop
    /// orphans — or reset the chain when the delta cannot be computed.
    fn advance_chain(
        &self,
        request: &IndexPackingRequest<'_>,
        state: &PackedState,
        ts_millis: u64,
        old_props: Option<&BTreeMap<String, String>>,
        props: &mut BTreeMap<String, String>,
        written: &mut Vec<PathBuf>,
    ) -> Result<()> {
        let target = request.target_dir.as_path();
        let baseline = read_baseline(target)?;
        let prev_chain_id = old_props.and_then(|p| p.get(INDEX_CHAIN_ID_KEY)).cloned();
        let prev_counter: Option<u64> = old_props
            .and_then(|p| p.get(INDEX_CHUNK_COUNTER_KEY))
            .and_then(|c| c.parse().ok());

        let chain_intact = match (&prev_chain_id, prev_counter, &baseline) {
            (Some(_), Some(_), Some(baseline)) => baseline_still_valid(baseline, &state.keys),
            _ => false,
        };

        if !chain_intact {
            let chain_id = Uuid::new_v4().simple().to_string();
            debug!(chain_id = %chain_id, "index chain reset");
            props.insert(INDEX_CHAIN_ID_KEY.to_string(), chain_id);
            props.insert(INDEX_CHUNK_COUNTER_KEY.to_string(), "0".to_string());
            delete_chunk_files(target, &BTreeSet::new())?;
            return Ok(());
        }

        let prev_counter = prev_counter.unwrap_or(0);
        let chain_id = prev_chain_id.unwrap_or_default();
        let baseline = baseline.unwrap_or_default();

        let delta: Vec<&TransferDocument> = state
            .delta_candidates
            .iter()
            .filter(|(key, _)| !baseline.contains(key))
            .map(|(_, doc)| doc)
            .collect();

        props.insert(INDEX_CHAIN_ID_KEY.to_string(), chain_id);

        if delta.is_empty() {
            // Nothing new since the last snapshot; keep the window.
            props.insert(INDEX_CHUNK_COUNTER_KEY.to_string(), prev_counter.to_string());
            if let Some(old) = old_props {
                for (key, value) in old {
                    if key.starts_with(INDEX_CHUNK_PREFIX) {
                        props.insert(key.clone(), value.clone());
                    }
                }
            }
            return Ok(());
        }

        let counter = prev_counter + 1;
        let chunk_path = target.join(format!("{INDEX_FILE}.{counter}.gz"));
        let mut writer = ChunkWriter::new(
            BufWriter::new(File::create(&chunk_path)?),
            ts_millis,
            delta.len() as u64,
        )?;
        for doc in &delta {
            writer.write_document(doc)?;
        }
        writer.finish()?.flush()?;
        written.push(chunk_path);

        // Shift the window: slot 0 is the fresh chunk, older slots move
        // down, anything past the bound falls off.
        let mut window: BTreeMap<usize, u64> = BTreeMap::new();
        window.insert(0, counter);
        if let Some(old) = old_props {
            for (key, value) in old {
                let Some(slot) = key
                    .strip_prefix(INDEX_CHUNK_PREFIX)
                    .and_then(|s| s.parse::<usize>().ok())
                else {
                    continue;
                };
                let Ok(chunk) = value.parse::<u64>() else {
                    continue;
                };
                if slot + 1 < request.max_index_chunks {
                    window.insert(slot + 1, chunk);
                }
            }
        }

        props.insert(INDEX_CHUNK_COUNTER_KEY.to_string(), counter.to_string());
        let mut referenced = BTreeSet::new();
        for (slot, chunk) in &window {
            props.insert(format!("{INDEX_CHUNK_PREFIX}{slot}"), chunk.to_string());
            referenced.insert(*chunk);
        }
        delete_chunk_files(target, &referenced)?;

        Ok(())
    }
}

/// Pull every document out of the committed index, classifying artifact
/// documents (live and tombstones) for delta computation.
fn collect_documents(context: &IndexingContext) -> Result<PackedState> {
    let guard = context.pool().read();
    let pool = guard.as_ref().ok_or(IndexError::Closed)?;
    pool.reader.reload()?;
    let searcher = pool.reader.searcher();
    let fields = context.fields();

    let mut addresses: Vec<_> = searcher
        .search(&tantivy::query::AllQuery, &DocSetCollector)?
        .into_iter()
        .collect();
    addresses.sort();

    let mut state = PackedState {
        all_docs: Vec::with_capacity(addresses.len()),
        delta_candidates: Vec::new(),
        keys: BTreeSet::new(),
    };

    for addr in addresses {
        let doc: TantivyDocument = searcher.doc(addr)?;
        let transfer = TransferDocument::from_document(&doc, fields);

        // Descriptor and group markers travel in the full snapshot
        // only; artifact documents and tombstones also feed the delta.
        if let Some(uinfo) = transfer.get(FLD_UINFO.key) {
            if !is_reserved_marker(uinfo) {
                let key = format!("{BASELINE_LIVE_PREFIX}{uinfo}");
                state.keys.insert(key.clone());
                state.delta_candidates.push((key, transfer.clone()));
            }
        } else if let Some(deleted) = transfer.get(FLD_DELETED.key) {
            let key = format!("{BASELINE_TOMBSTONE_PREFIX}{deleted}");
            state.keys.insert(key.clone());
            state.delta_candidates.push((key, transfer.clone()));
        }

        state.all_docs.push(transfer);
    }

    Ok(state)
}

/// Every baseline live key must still be live, or explicitly
/// tombstoned. Anything else means history was lost and the delta is
/// not computable.
fn baseline_still_valid(baseline: &BTreeSet<String>, current: &BTreeSet<String>) -> bool {
    baseline.iter().all(|key| {
        if !key.starts_with(BASELINE_LIVE_PREFIX) {
            return true;
        }
        if current.contains(key) {
            return true;
        }
        let uinfo = &key[BASELINE_LIVE_PREFIX.len()..];
        current.contains(&format!("{BASELINE_TOMBSTONE_PREFIX}{uinfo}"))
    })
}

fn baseline_path(target: &Path) -> PathBuf {
    target.join(format!("{INDEX_FILE}.baseline.gz"))
}

fn read_baseline(target: &Path) -> Result<Option<BTreeSet<String>>> {
    let path = baseline_path(target);
    if !path.exists() {
        return Ok(None);
    }
    let reader = BufReader::new(GzDecoder::new(File::open(&path)?));
    let mut keys = BTreeSet::new();
    for line in reader.lines() {
        let line = line?;
        if !line.is_empty() {
            keys.insert(line);
        }
    }
    Ok(Some(keys))
}

fn write_baseline(target: &Path, keys: &BTreeSet<String>) -> Result<()> {
    let path = baseline_path(target);
    let mut encoder = GzEncoder::new(
        BufWriter::new(File::create(&path)?),
        Compression::default(),
    );
    for key in keys {
        writeln!(encoder, "{key}")?;
    }
    encoder.finish()?.flush()?;
    Ok(())
}

fn write_transfer_file(path: &Path, ts_millis: u64, docs: &[TransferDocument]) -> Result<()> {
    let mut writer = ChunkWriter::new(
        BufWriter::new(File::create(path)?),
        ts_millis,
        docs.len() as u64,
    )?;
    for doc in docs {
        writer.write_document(doc)?;
    }
    writer.finish()?.flush()?;
    Ok(())
}

/// The legacy full snapshot: the raw index directory, zipped. Lock
/// files, previously published outputs and temporaries stay out.
fn write_legacy_zip(index_dir: &Path, zip_path: &Path) -> Result<()> {
    let file = File::create(zip_path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::<()>::default();

    for entry in std::fs::read_dir(index_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".lock")
            || name.ends_with(".tmp")
            || name.starts_with('.')
            || name.starts_with(INDEX_FILE)
        {
            continue;
        }
        zip.start_file(name, options)?;
        let mut source = File::open(entry.path())?;
        std::io::copy(&mut source, &mut zip)?;
    }
    zip.finish()?;
    Ok(())
}

/// Remove chunk files whose counter is not referenced by the window.
fn delete_chunk_files(target: &Path, referenced: &BTreeSet<u64>) -> Result<()> {
    for entry in std::fs::read_dir(target)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(counter) = chunk_counter_of(&name) else {
            continue;
        };
        if !referenced.contains(&counter) {
            debug!(file = %name, "removing orphan chunk");
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// `nexus-maven-repository-index.<n>.gz` -> `n`
fn chunk_counter_of(name: &str) -> Option<u64> {
    name.strip_prefix(INDEX_FILE)?
        .strip_prefix('.')?
        .strip_suffix(".gz")?
        .parse()
        .ok()
}

fn write_checksum_files(path: &Path) -> Result<()> {
    let mut file = File::open(path)?;
    let mut sha1 = Sha1::new();
    let mut md5 = Md5::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        sha1.update(&buf[..n]);
        md5.update(&buf[..n]);
    }
    std::fs::write(
        append_extension(path, "sha1"),
        to_hex(&sha1.finalize()),
    )?;
    std::fs::write(append_extension(path, "md5"), to_hex(&md5.finalize()))?;
    Ok(())
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}
