//! Component registry: one constructed instance of every engine piece,
//! shared by reference. Contexts opened through the registry all carry
//! the same schema and creator chain, which is what makes cross-context
//! search and directory merges well-defined. No global state.

use std::path::Path;
use std::sync::Arc;

use crate::errors::Result;
use crate::features::context::{ContextConfig, IndexingContext};
use crate::features::creator::{default_creators, IndexCreator};
use crate::features::packer::IndexPacker;
use crate::features::query::QueryCreator;
use crate::features::scanner::Scanner;
use crate::features::schema::SchemaFields;
use crate::features::search::SearchEngine;

pub struct ComponentRegistry {
    creators: Arc<Vec<Box<dyn IndexCreator>>>,
    fields: SchemaFields,
    query_creator: QueryCreator,
    search_engine: SearchEngine,
    packer: IndexPacker,
    scanner: Scanner,
}

impl ComponentRegistry {
    /// Registry with the default creator chain (minimal artifact info
    /// plus jar contents).
    pub fn new() -> ComponentRegistry {
        ComponentRegistry::with_creators(default_creators())
    }

    pub fn with_creators(creators: Vec<Box<dyn IndexCreator>>) -> ComponentRegistry {
        let fields = SchemaFields::build();
        ComponentRegistry {
            creators: Arc::new(creators),
            query_creator: QueryCreator::new(fields.clone()),
            search_engine: SearchEngine::new(),
            packer: IndexPacker::new(),
            scanner: Scanner::new(),
            fields,
        }
    }

    /// Open (or create) an on-disk indexing context.
    pub fn create_context(
        &self,
        config: ContextConfig,
        index_dir: &Path,
    ) -> Result<IndexingContext> {
        IndexingContext::open(
            config,
            index_dir,
            Arc::clone(&self.creators),
            self.fields.clone(),
        )
    }

    /// Open a RAM-backed scratch context.
    pub fn create_context_in_ram(&self, config: ContextConfig) -> Result<IndexingContext> {
        IndexingContext::open_in_ram(config, Arc::clone(&self.creators), self.fields.clone())
    }

    pub fn creators(&self) -> &[Box<dyn IndexCreator>] {
        &self.creators
    }

    pub fn fields(&self) -> &SchemaFields {
        &self.fields
    }

    pub fn query_creator(&self) -> &QueryCreator {
        &self.query_creator
    }

    pub fn search_engine(&self) -> &SearchEngine {
        &self.search_engine
    }

    pub fn packer(&self) -> &IndexPacker {
        &self.packer
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        ComponentRegistry::new()
    }
}
