//! repoindex-core — the core of a Maven artifact repository indexer.
//!
//! A long-lived service core that scans a local artifact repository,
//! maintains a persistent inverted index of every discovered artifact,
//! serves keyword and faceted search over that index, and publishes the
//! index as downloadable snapshots (full plus incremental chunks) so
//! that peers can mirror it cheaply.
//!
//! ```text
//! scanner ──> creators ──> IndexingContext ──> IndexPacker ──> .gz/.zip + chain
//!                              │
//!              QueryCreator ──>│<── SearchEngine (flat / grouped / iterator)
//! ```
//!
//! Entry point is [`ComponentRegistry`]: it owns the creator chain and
//! the shared schema, opens [`IndexingContext`]s, and hands out the
//! query creator, search engine, packer and scanner.

// ═══════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════

pub mod errors;
pub mod features;
pub mod registry;
pub mod shared;

// ═══════════════════════════════════════════════════════════════════════
// Re-exports
// ═══════════════════════════════════════════════════════════════════════

pub use errors::{IndexError, Result};
pub use registry::ComponentRegistry;

pub use features::context::{ContextConfig, IndexingContext, INDEX_FILE};
pub use features::creator::{
    IndexCreator, JarFileContentsIndexCreator, MinimalArtifactInfoIndexCreator,
};
pub use features::packer::{IndexPacker, IndexPackingRequest};
pub use features::query::QueryCreator;
pub use features::scanner::{ScanResult, Scanner};
pub use features::schema::{IndexerField, SearchType};
pub use features::search::{
    FlatSearchRequest, FlatSearchResponse, GGrouping, GaGrouping, GroupedSearchRequest,
    GroupedSearchResponse, Grouping, IteratorResultSet, IteratorSearchRequest, SearchEngine,
    TotalHits,
};
pub use shared::models::{ArtifactContext, ArtifactInfo, ArtifactInfoGroup, Gav, M2GavCalculator};
