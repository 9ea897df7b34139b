//! Incremental publication: chain bookkeeping, chunk window, resets.

mod common;

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use chrono::{TimeZone, Utc};
use repoindex_core::features::packer::properties::read_properties;
use repoindex_core::features::packer::transfer::ChunkReader;
use repoindex_core::features::packer::{
    INDEX_CHAIN_ID_KEY, INDEX_CHUNK_COUNTER_KEY, INDEX_CHUNK_PREFIX,
};
use repoindex_core::{ComponentRegistry, IndexPackingRequest, IndexingContext, INDEX_FILE};

use common::{artifact, index_artifacts, open_context};

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn props_of(dir: &Path) -> BTreeMap<String, String> {
    read_properties(&dir.join(format!("{INDEX_FILE}.properties"))).unwrap()
}

fn stamp(context: &IndexingContext, millis: i64) {
    context
        .update_timestamp_to(true, Some(Utc.timestamp_millis_opt(millis).unwrap()))
        .unwrap();
}

fn pack(registry: &ComponentRegistry, context: &IndexingContext, target: &Path, max_chunks: usize) {
    let request = IndexPackingRequest::new(context, target)
        .with_incremental_chunks(true)
        .with_max_index_chunks(max_chunks);
    registry.packer().pack_index(&request).unwrap();
}

const T0: i64 = 1_700_000_000_000;
const STEP: i64 = 60_000;

#[test]
fn test_first_pack_starts_chain() {
    let registry = ComponentRegistry::new();
    let index_dir = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let context = open_context(&registry, index_dir.path(), "test");

    index_artifacts(&context, &[artifact("org.example", "app", "1.0")]);
    stamp(&context, T0);
    pack(&registry, &context, target.path(), 30);

    let names = file_names(target.path());
    assert!(names.contains(&format!("{INDEX_FILE}.gz")));
    assert!(names.contains(&format!("{INDEX_FILE}.zip")));
    assert!(names.contains(&format!("{INDEX_FILE}.properties")));
    assert!(!names.contains(&format!("{INDEX_FILE}.1.gz")));

    let props = props_of(target.path());
    assert!(props.contains_key(INDEX_CHAIN_ID_KEY));
    assert_eq!(props[INDEX_CHUNK_COUNTER_KEY], "0");
    assert!(!props.contains_key(&format!("{INDEX_CHUNK_PREFIX}0")));
}

#[test]
fn test_incremental_chain_steps() {
    let registry = ComponentRegistry::new();
    let index_dir = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let context = open_context(&registry, index_dir.path(), "test");

    index_artifacts(&context, &[artifact("org.example", "app", "1.0")]);
    stamp(&context, T0);
    pack(&registry, &context, target.path(), 30);
    let chain_id = props_of(target.path())[INDEX_CHAIN_ID_KEY].clone();

    // One new artifact -> one delta chunk.
    index_artifacts(&context, &[artifact("org.example", "lib", "2.0")]);
    stamp(&context, T0 + STEP);
    pack(&registry, &context, target.path(), 30);

    let names = file_names(target.path());
    assert!(names.contains(&format!("{INDEX_FILE}.1.gz")));
    assert!(!names.contains(&format!("{INDEX_FILE}.2.gz")));

    let props = props_of(target.path());
    assert_eq!(props[INDEX_CHAIN_ID_KEY], chain_id);
    assert_eq!(props[INDEX_CHUNK_COUNTER_KEY], "1");
    assert_eq!(props[&format!("{INDEX_CHUNK_PREFIX}0")], "1");
    assert!(!props.contains_key(&format!("{INDEX_CHUNK_PREFIX}1")));

    // The chunk carries exactly the delta.
    let chunk = ChunkReader::new(
        File::open(target.path().join(format!("{INDEX_FILE}.1.gz"))).unwrap(),
    )
    .unwrap();
    let docs = chunk.read_all().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].get("u"), Some("org.example|lib|2.0|NA|jar"));

    // Second step shifts the window.
    index_artifacts(&context, &[artifact("org.example", "cli", "3.0")]);
    stamp(&context, T0 + 2 * STEP);
    pack(&registry, &context, target.path(), 30);

    let props = props_of(target.path());
    assert_eq!(props[INDEX_CHAIN_ID_KEY], chain_id);
    assert_eq!(props[INDEX_CHUNK_COUNTER_KEY], "2");
    assert_eq!(props[&format!("{INDEX_CHUNK_PREFIX}0")], "2");
    assert_eq!(props[&format!("{INDEX_CHUNK_PREFIX}1")], "1");
}

#[test]
fn test_chunk_window_bound() {
    let registry = ComponentRegistry::new();
    let index_dir = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let context = open_context(&registry, index_dir.path(), "test");

    index_artifacts(&context, &[artifact("org.example", "app", "1.0")]);
    stamp(&context, T0);
    pack(&registry, &context, target.path(), 3);

    for step in 1..=4 {
        index_artifacts(
            &context,
            &[artifact("org.example", "inc", &format!("{step}.0"))],
        );
        stamp(&context, T0 + step as i64 * STEP);
        pack(&registry, &context, target.path(), 3);
    }

    let names = file_names(target.path());
    assert!(!names.contains(&format!("{INDEX_FILE}.1.gz")));
    assert!(names.contains(&format!("{INDEX_FILE}.2.gz")));
    assert!(names.contains(&format!("{INDEX_FILE}.3.gz")));
    assert!(names.contains(&format!("{INDEX_FILE}.4.gz")));

    let props = props_of(target.path());
    assert_eq!(props[INDEX_CHUNK_COUNTER_KEY], "4");
    assert_eq!(props[&format!("{INDEX_CHUNK_PREFIX}0")], "4");
    assert_eq!(props[&format!("{INDEX_CHUNK_PREFIX}1")], "3");
    assert_eq!(props[&format!("{INDEX_CHUNK_PREFIX}2")], "2");
    assert!(!props.contains_key(&format!("{INDEX_CHUNK_PREFIX}3")));
}

#[test]
fn test_chain_resets_on_purge() {
    let registry = ComponentRegistry::new();
    let index_dir = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let context = open_context(&registry, index_dir.path(), "test");

    index_artifacts(&context, &[artifact("org.example", "app", "1.0")]);
    stamp(&context, T0);
    pack(&registry, &context, target.path(), 30);

    index_artifacts(&context, &[artifact("org.example", "lib", "2.0")]);
    stamp(&context, T0 + STEP);
    pack(&registry, &context, target.path(), 30);
    let old_chain = props_of(target.path())[INDEX_CHAIN_ID_KEY].clone();
    assert_eq!(props_of(target.path())[INDEX_CHUNK_COUNTER_KEY], "1");

    // Purge wipes history: the baseline no longer matches, the chain
    // must restart and consumers must take the full snapshot.
    context.purge().unwrap();
    pack(&registry, &context, target.path(), 30);

    let props = props_of(target.path());
    assert_ne!(props[INDEX_CHAIN_ID_KEY], old_chain);
    assert_eq!(props[INDEX_CHUNK_COUNTER_KEY], "0");
    assert!(props.keys().all(|k| !k.starts_with(INDEX_CHUNK_PREFIX)));

    let names = file_names(target.path());
    assert!(!names.contains(&format!("{INDEX_FILE}.1.gz")));
}

#[test]
fn test_unchanged_index_keeps_chain() {
    let registry = ComponentRegistry::new();
    let index_dir = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let context = open_context(&registry, index_dir.path(), "test");

    index_artifacts(&context, &[artifact("org.example", "app", "1.0")]);
    stamp(&context, T0);
    pack(&registry, &context, target.path(), 30);
    let before = props_of(target.path());

    // Same timestamp, same content: full snapshot refresh only.
    pack(&registry, &context, target.path(), 30);
    let after = props_of(target.path());

    assert_eq!(before[INDEX_CHAIN_ID_KEY], after[INDEX_CHAIN_ID_KEY]);
    assert_eq!(
        before[INDEX_CHUNK_COUNTER_KEY],
        after[INDEX_CHUNK_COUNTER_KEY]
    );
    assert!(!file_names(target.path()).contains(&format!("{INDEX_FILE}.1.gz")));
}

#[test]
fn test_full_snapshot_carries_everything() {
    let registry = ComponentRegistry::new();
    let index_dir = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let context = open_context(&registry, index_dir.path(), "test");

    index_artifacts(
        &context,
        &[
            artifact("org.example", "app", "1.0"),
            artifact("com.example", "lib", "2.0"),
        ],
    );
    context.rebuild_groups().unwrap();
    stamp(&context, T0);
    pack(&registry, &context, target.path(), 30);

    let reader =
        ChunkReader::new(File::open(target.path().join(format!("{INDEX_FILE}.gz"))).unwrap())
            .unwrap();
    assert_eq!(reader.timestamp_millis, T0 as u64);
    let docs = reader.read_all().unwrap();

    let descriptors = docs
        .iter()
        .filter(|d| d.get("DESCRIPTOR") == Some("NexusIndex"))
        .count();
    assert_eq!(descriptors, 1);

    let uinfos: Vec<_> = docs.iter().filter_map(|d| d.get("u")).collect();
    assert!(uinfos.contains(&"org.example|app|1.0|NA|jar"));
    assert!(uinfos.contains(&"com.example|lib|2.0|NA|jar"));
    // Group cache documents ride along in the full snapshot.
    assert!(uinfos.contains(&"allGroups"));
    assert!(uinfos.contains(&"rootGroups"));
}

#[test]
fn test_tombstone_travels_in_chunk() {
    let registry = ComponentRegistry::new();
    let index_dir = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let context = open_context(&registry, index_dir.path(), "test");

    let app = artifact("org.example", "app", "1.0");
    index_artifacts(&context, &[app.clone()]);
    stamp(&context, T0);
    pack(&registry, &context, target.path(), 30);

    context.delete_artifact(&app.uinfo()).unwrap();
    context.commit().unwrap();
    stamp(&context, T0 + STEP);
    pack(&registry, &context, target.path(), 30);

    let props = props_of(target.path());
    assert_eq!(props[INDEX_CHUNK_COUNTER_KEY], "1");

    let chunk = ChunkReader::new(
        File::open(target.path().join(format!("{INDEX_FILE}.1.gz"))).unwrap(),
    )
    .unwrap();
    let docs = chunk.read_all().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].get("del"), Some(app.uinfo().as_str()));
}

#[test]
fn test_checksum_files() {
    let registry = ComponentRegistry::new();
    let index_dir = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let context = open_context(&registry, index_dir.path(), "test");

    index_artifacts(&context, &[artifact("org.example", "app", "1.0")]);
    stamp(&context, T0);
    let request = IndexPackingRequest::new(&context, target.path())
        .with_incremental_chunks(true)
        .with_checksum_files(true);
    registry.packer().pack_index(&request).unwrap();

    let names = file_names(target.path());
    assert!(names.contains(&format!("{INDEX_FILE}.gz.sha1")));
    assert!(names.contains(&format!("{INDEX_FILE}.gz.md5")));
    assert!(names.contains(&format!("{INDEX_FILE}.properties.sha1")));

    let sha1 = std::fs::read_to_string(target.path().join(format!("{INDEX_FILE}.gz.sha1"))).unwrap();
    assert_eq!(sha1.len(), 40);
}
