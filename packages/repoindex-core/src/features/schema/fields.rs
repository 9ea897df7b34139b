//! Declarative field registry.
//!
//! An [`IndexerField`] maps a logical (ontology) name onto one on-disk
//! field. A logical name may be backed by several indexer fields — for
//! the coordinate fields there is a keyword (untokenized) variant used by
//! exact searches and a tokenized variant used by scored searches.

/// Sentinel query value meaning "match documents where this field is
/// present at all".
pub const NOT_PRESENT: &str = "N/P";

/// Ontology names — the logical field identifiers used by callers.
pub mod ontology {
    pub const UINFO: &str = "uinfo";
    pub const DELETED: &str = "deleted";
    pub const INFO: &str = "info";
    pub const GROUP_ID: &str = "groupId";
    pub const ARTIFACT_ID: &str = "artifactId";
    pub const VERSION: &str = "version";
    pub const PACKAGING: &str = "packaging";
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const SHA1: &str = "sha1";
    pub const MD5: &str = "md5";
    pub const CLASSNAMES: &str = "classnames";
}

/// One schema element: a logical name bound to an on-disk storage key
/// plus its storage/indexing flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexerField {
    /// Logical field this element belongs to.
    pub ontology: &'static str,
    /// On-disk field name.
    pub key: &'static str,
    /// Value is kept in the document store.
    pub stored: bool,
    /// Value is searchable.
    pub indexed: bool,
    /// Indexed without tokenization (single raw term).
    pub keyword: bool,
}

impl IndexerField {
    const fn new(
        ontology: &'static str,
        key: &'static str,
        stored: bool,
        indexed: bool,
        keyword: bool,
    ) -> IndexerField {
        IndexerField {
            ontology,
            key,
            stored,
            indexed,
            keyword,
        }
    }
}

pub const FLD_UINFO: IndexerField = IndexerField::new(ontology::UINFO, "u", true, true, true);
pub const FLD_DELETED: IndexerField = IndexerField::new(ontology::DELETED, "del", true, true, true);
pub const FLD_INFO: IndexerField = IndexerField::new(ontology::INFO, "i", true, false, false);

pub const FLD_GROUP_ID_KW: IndexerField =
    IndexerField::new(ontology::GROUP_ID, "g", false, true, true);
pub const FLD_GROUP_ID: IndexerField =
    IndexerField::new(ontology::GROUP_ID, "groupId", false, true, false);
pub const FLD_ARTIFACT_ID_KW: IndexerField =
    IndexerField::new(ontology::ARTIFACT_ID, "a", false, true, true);
pub const FLD_ARTIFACT_ID: IndexerField =
    IndexerField::new(ontology::ARTIFACT_ID, "artifactId", false, true, false);
pub const FLD_VERSION_KW: IndexerField =
    IndexerField::new(ontology::VERSION, "v", false, true, true);
pub const FLD_VERSION: IndexerField =
    IndexerField::new(ontology::VERSION, "version", false, true, false);
pub const FLD_PACKAGING: IndexerField =
    IndexerField::new(ontology::PACKAGING, "p", false, true, true);

pub const FLD_NAME: IndexerField = IndexerField::new(ontology::NAME, "n", true, false, false);
pub const FLD_DESCRIPTION: IndexerField =
    IndexerField::new(ontology::DESCRIPTION, "d", true, false, false);
pub const FLD_SHA1: IndexerField = IndexerField::new(ontology::SHA1, "1", true, true, true);
pub const FLD_MD5: IndexerField = IndexerField::new(ontology::MD5, "m5", true, false, false);

pub const FLD_CLASSNAMES: IndexerField =
    IndexerField::new(ontology::CLASSNAMES, "classnames", false, true, false);
pub const FLD_CLASSNAMES_KW: IndexerField =
    IndexerField::new(ontology::CLASSNAMES, "classnames_kw", true, true, true);

// Context-reserved fields. These belong to the indexing context itself,
// not to any creator: the descriptor marker pair and the two group-cache
// list fields.
pub const FLD_DESCRIPTOR: IndexerField =
    IndexerField::new("descriptor", "DESCRIPTOR", true, true, true);
pub const FLD_IDXINFO: IndexerField = IndexerField::new("idxinfo", "IDXINFO", true, false, false);
pub const FLD_ALL_GROUPS_LIST: IndexerField =
    IndexerField::new("allGroupsList", "allGroupsList", true, false, false);
pub const FLD_ROOT_GROUPS_LIST: IndexerField =
    IndexerField::new("rootGroupsList", "rootGroupsList", true, false, false);

/// Every field in declaration order. Schema construction and the
/// transfer codec iterate this list; its order is part of the on-disk
/// format.
pub const ALL_FIELDS: &[IndexerField] = &[
    FLD_UINFO,
    FLD_DELETED,
    FLD_INFO,
    FLD_GROUP_ID_KW,
    FLD_GROUP_ID,
    FLD_ARTIFACT_ID_KW,
    FLD_ARTIFACT_ID,
    FLD_VERSION_KW,
    FLD_VERSION,
    FLD_PACKAGING,
    FLD_NAME,
    FLD_DESCRIPTION,
    FLD_SHA1,
    FLD_MD5,
    FLD_CLASSNAMES,
    FLD_CLASSNAMES_KW,
    FLD_DESCRIPTOR,
    FLD_IDXINFO,
    FLD_ALL_GROUPS_LIST,
    FLD_ROOT_GROUPS_LIST,
];

/// How a query wants a field matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    /// Term-level matching against the untokenized variant.
    Exact,
    /// Relevance-ranked matching against the tokenized variant.
    Scored,
}

impl SearchType {
    /// Does `field` satisfy this search type?
    pub fn matches(&self, field: &IndexerField) -> bool {
        match self {
            SearchType::Exact => field.indexed && field.keyword,
            SearchType::Scored => field.indexed && !field.keyword,
        }
    }
}

/// Resolve a logical field name to the indexer field best matching the
/// search type. Falls back to the last declared variant when none
/// matches; `None` only for unknown ontology names.
pub fn select_indexer_field(
    ontology: &str,
    search_type: SearchType,
) -> Option<&'static IndexerField> {
    let mut last = None;
    for field in ALL_FIELDS {
        if field.ontology == ontology {
            if search_type.matches(field) {
                return Some(field);
            }
            last = Some(field);
        }
    }
    last
}

/// Look up a field by its on-disk key.
pub fn field_by_key(key: &str) -> Option<&'static IndexerField> {
    ALL_FIELDS.iter().find(|f| f.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_prefers_keyword_for_exact() {
        let f = select_indexer_field(ontology::GROUP_ID, SearchType::Exact).unwrap();
        assert_eq!(f.key, "g");
        assert!(f.keyword);
    }

    #[test]
    fn test_select_prefers_tokenized_for_scored() {
        let f = select_indexer_field(ontology::ARTIFACT_ID, SearchType::Scored).unwrap();
        assert_eq!(f.key, "artifactId");
        assert!(!f.keyword);
    }

    #[test]
    fn test_select_falls_back_to_last_variant() {
        // `name` has no indexed variant at all; the last declared one is
        // still returned so the caller can log a meaningful refusal.
        let f = select_indexer_field(ontology::NAME, SearchType::Exact).unwrap();
        assert_eq!(f.key, "n");
        assert!(!f.indexed);
    }

    #[test]
    fn test_unknown_ontology() {
        assert!(select_indexer_field("nope", SearchType::Exact).is_none());
    }

    #[test]
    fn test_storage_keys_are_unique() {
        let mut keys: Vec<&str> = ALL_FIELDS.iter().map(|f| f.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), ALL_FIELDS.len());
    }
}
