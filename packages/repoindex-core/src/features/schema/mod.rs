//! Tantivy schema construction from the field registry.
//!
//! Keyword fields are indexed with the `raw` tokenizer (one term per
//! value, no normalization); tokenized fields go through the
//! [`analyzer`] pipeline with positions enabled so phrase queries work.
//! Every context built by one registry shares the identical schema, and
//! an existing directory whose schema differs is refused on open.

pub mod analyzer;
pub mod fields;

use std::collections::HashMap;

use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions};
use tantivy::Index;

use crate::errors::{IndexError, Result};
pub use fields::{IndexerField, SearchType, NOT_PRESENT};

/// Name under which the analyzer pipeline is registered on every index.
pub const TOKENIZER_NAME: &str = "nexus";

/// The built schema plus resolved field handles, keyed by storage key.
#[derive(Debug, Clone)]
pub struct SchemaFields {
    pub schema: Schema,
    by_key: HashMap<&'static str, Field>,
}

impl SchemaFields {
    /// Build the canonical schema from the field registry.
    pub fn build() -> SchemaFields {
        let mut builder = Schema::builder();
        let mut by_key = HashMap::new();

        for field in fields::ALL_FIELDS {
            let mut options = TextOptions::default();
            if field.indexed {
                let tokenizer = if field.keyword { "raw" } else { TOKENIZER_NAME };
                let record = if field.keyword {
                    IndexRecordOption::Basic
                } else {
                    IndexRecordOption::WithFreqsAndPositions
                };
                options = options.set_indexing_options(
                    TextFieldIndexing::default()
                        .set_tokenizer(tokenizer)
                        .set_index_option(record),
                );
            }
            if field.stored {
                options = options.set_stored();
            }
            by_key.insert(field.key, builder.add_text_field(field.key, options));
        }

        SchemaFields {
            schema: builder.build(),
            by_key,
        }
    }

    /// Handle for a storage key. Panics on a key that is not in the
    /// registry; all call sites use registry constants.
    pub fn field(&self, key: &str) -> Field {
        self.by_key[key]
    }

    /// Handle for a registry element.
    pub fn of(&self, field: &IndexerField) -> Field {
        self.field(field.key)
    }

    // Hot handles.

    pub fn uinfo(&self) -> Field {
        self.of(&fields::FLD_UINFO)
    }

    pub fn deleted(&self) -> Field {
        self.of(&fields::FLD_DELETED)
    }

    pub fn descriptor(&self) -> Field {
        self.of(&fields::FLD_DESCRIPTOR)
    }

    pub fn idxinfo(&self) -> Field {
        self.of(&fields::FLD_IDXINFO)
    }

    pub fn group_id_kw(&self) -> Field {
        self.of(&fields::FLD_GROUP_ID_KW)
    }

    pub fn all_groups_list(&self) -> Field {
        self.of(&fields::FLD_ALL_GROUPS_LIST)
    }

    pub fn root_groups_list(&self) -> Field {
        self.of(&fields::FLD_ROOT_GROUPS_LIST)
    }

    /// Verify that an opened index carries exactly this schema.
    pub fn check_index_schema(&self, index: &Index) -> Result<()> {
        let ours = serde_json::to_string(&self.schema).unwrap_or_default();
        let theirs = serde_json::to_string(&index.schema()).unwrap_or_default();
        if ours != theirs {
            return Err(IndexError::unsupported(
                "index directory was written with a different schema",
            ));
        }
        Ok(())
    }
}

impl Default for SchemaFields {
    fn default() -> Self {
        SchemaFields::build()
    }
}

/// Register the analyzer on a freshly opened or created index. Must run
/// before the first writer or query touches a tokenized field.
pub fn register_tokenizers(index: &Index) {
    index
        .tokenizers()
        .register(TOKENIZER_NAME, analyzer::build_analyzer());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tantivy::schema::Value;
    use tantivy::TantivyDocument;

    #[test]
    fn test_schema_covers_registry() {
        let fields = SchemaFields::build();
        for field in fields::ALL_FIELDS {
            // Resolvable both through the map and through the schema.
            let handle = fields.of(field);
            assert_eq!(fields.schema.get_field(field.key).unwrap(), handle);
        }
    }

    #[test]
    fn test_stored_flags_respected() {
        let fields = SchemaFields::build();
        let entry = fields.schema.get_field_entry(fields.uinfo());
        assert!(entry.is_stored());
        assert!(entry.is_indexed());

        let unstored = fields.schema.get_field_entry(fields.group_id_kw());
        assert!(!unstored.is_stored());
    }

    #[test]
    fn test_keyword_field_keeps_raw_value() {
        let fields = SchemaFields::build();
        let index = Index::create_in_ram(fields.schema.clone());
        register_tokenizers(&index);

        let mut writer = index.writer(15_000_000).unwrap();
        let mut doc = TantivyDocument::default();
        doc.add_text(fields.uinfo(), "org.apache.maven|maven-model|2.2.1|NA|jar");
        doc.add_text(fields.field("groupId"), "org.apache.maven");
        writer.add_document(doc).unwrap();
        writer.commit().unwrap();

        let reader = index.reader().unwrap();
        let searcher = reader.searcher();

        // The raw term is searchable as a whole...
        let term = tantivy::Term::from_field_text(
            fields.uinfo(),
            "org.apache.maven|maven-model|2.2.1|NA|jar",
        );
        let query = tantivy::query::TermQuery::new(term, IndexRecordOption::Basic);
        let count = searcher
            .search(&query, &tantivy::collector::Count)
            .unwrap();
        assert_eq!(count, 1);

        // ...and the tokenized variant by its lowercased segments.
        let term = tantivy::Term::from_field_text(fields.field("groupId"), "apache");
        let query = tantivy::query::TermQuery::new(term, IndexRecordOption::Basic);
        let count = searcher
            .search(&query, &tantivy::collector::Count)
            .unwrap();
        assert_eq!(count, 1);

        // Stored value comes back verbatim.
        let addr = searcher
            .search(&query, &tantivy::collector::DocSetCollector)
            .unwrap()
            .into_iter()
            .next()
            .unwrap();
        let doc: TantivyDocument = searcher.doc(addr).unwrap();
        assert_eq!(
            doc.get_first(fields.uinfo()).and_then(|v| v.as_str()),
            Some("org.apache.maven|maven-model|2.2.1|NA|jar")
        );
    }
}
