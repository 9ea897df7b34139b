//! Query construction: user query text -> structured index query.
//!
//! The default wildcarding philosophy is prefix-by-default: plain query
//! text matches the beginning of a field value or of a name segment.
//! Explicit markers override it: `*` matches anything, `^` anchors the
//! start, `$`, `<` or a trailing space anchor the end. For example,
//! `junit` matches `junit` and `junit-foo` but not `foo-junit`, while
//! `*junit` matches all three and `^junit$` only the exact value.
//!
//! Tantivy's query parser has no wildcard support, so the tokenising
//! parse is done here: clauses are combined with AND, wildcard tokens
//! become regex queries, plain tokens become term-or-prefix pairs.
//! Whatever cannot be parsed falls back to the legacy path — query
//! construction never surfaces an error.

use tantivy::query::{BooleanQuery, BoostQuery, Occur, PhraseQuery, Query, RegexQuery, TermQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::Term;
use tracing::{debug, warn};

use crate::features::schema::fields::{self, IndexerField, SearchType};
use crate::features::schema::{analyzer, SchemaFields, NOT_PRESENT};

const PREFIX_BOOST: f32 = 0.8;

/// Builds index queries from logical field names and raw query text.
#[derive(Debug, Clone)]
pub struct QueryCreator {
    fields: SchemaFields,
}

impl QueryCreator {
    pub fn new(fields: SchemaFields) -> QueryCreator {
        QueryCreator { fields }
    }

    /// Construct a query against a logical field. `None` means the
    /// query is unsatisfiable (unknown or unindexed field, empty text).
    pub fn construct_query(
        &self,
        ontology: &str,
        query: &str,
        search_type: SearchType,
    ) -> Option<Box<dyn Query>> {
        let Some(indexer_field) = fields::select_indexer_field(ontology, search_type) else {
            warn!(field = ontology, "query for unknown field refused");
            return None;
        };
        self.construct_for(indexer_field, query, search_type)
    }

    fn construct_for(
        &self,
        indexer_field: &IndexerField,
        query: &str,
        search_type: SearchType,
    ) -> Option<Box<dyn Query>> {
        if !indexer_field.indexed {
            warn!(
                field = indexer_field.ontology,
                key = indexer_field.key,
                "query for non-indexed field refused"
            );
            return None;
        }
        let field = self.fields.of(indexer_field);

        if query == NOT_PRESENT {
            return wildcard_query(field, "*");
        }

        match (search_type, indexer_field.keyword) {
            (SearchType::Exact, true) => {
                if has_wildcard(query) {
                    wildcard_query(field, query)
                } else {
                    Some(term_query(field, query))
                }
            }
            (SearchType::Exact, false) => {
                warn!(
                    field = indexer_field.ontology,
                    "exact query against tokenized field refused"
                );
                None
            }
            (SearchType::Scored, true) => {
                if has_wildcard(query) {
                    wildcard_query(field, query)
                } else {
                    let term = term_query(field, query);
                    let prefix = prefix_query(field, query)?;
                    Some(Box::new(BooleanQuery::new(vec![
                        (Occur::Should, term),
                        (Occur::Should, Box::new(BoostQuery::new(prefix, PREFIX_BOOST))),
                    ])))
                }
            }
            (SearchType::Scored, false) => self.scored_tokenized(indexer_field, field, query),
        }
    }

    /// SCORED over a tokenized field: normalise punctuation to spaces,
    /// make the query prefix-matching, AND the clauses, OR in a phrase
    /// for multi-word input and, for punctuated single words, the
    /// keyword-field variant.
    fn scored_tokenized(
        &self,
        indexer_field: &IndexerField,
        field: Field,
        query: &str,
    ) -> Option<Box<dyn Query>> {
        let mut processed: String = query
            .to_lowercase()
            .chars()
            .map(|c| if matches!(c, '.' | '-' | '_') { ' ' } else { c })
            .collect();
        if !processed.ends_with('*') {
            processed.push('*');
        }

        let Some(mut parsed) = self.tokenized_parse(field, &processed) else {
            debug!(query, "tokenising parse failed, using legacy query");
            return self.legacy_construct_query(indexer_field.key, query);
        };

        if processed.contains(' ') {
            if let Some(phrase) = phrase_query(field, &processed) {
                parsed = Box::new(BooleanQuery::new(vec![
                    (Occur::Should, parsed),
                    (Occur::Should, phrase),
                ]));
            }
        }

        // A punctuated single word such as `commons-logging` also gets a
        // shot at the keyword variant, where it is still one term.
        if !query.contains(' ') && analyzer::analyze(query).len() > 1 {
            let keyword_variant = fields::select_indexer_field(
                indexer_field.ontology,
                SearchType::Exact,
            )
            .filter(|f| f.keyword)
            .and_then(|f| self.construct_for(f, query, SearchType::Exact));
            if let Some(keyword_query) = keyword_variant {
                return Some(Box::new(BooleanQuery::new(vec![
                    (Occur::Should, keyword_query),
                    (Occur::Should, parsed),
                ])));
            }
        }

        Some(parsed)
    }

    /// AND together one clause per whitespace-separated token. Wildcard
    /// tokens become regex queries; plain tokens match as a term or as
    /// a slightly demoted prefix.
    fn tokenized_parse(&self, field: Field, processed: &str) -> Option<Box<dyn Query>> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        for token in processed.split_whitespace() {
            if has_wildcard(token) {
                clauses.push((Occur::Must, wildcard_query(field, token)?));
                continue;
            }
            for term in analyzer::analyze(token) {
                let term_q = term_query(field, &term);
                let prefix = prefix_query(field, &term)?;
                clauses.push((
                    Occur::Must,
                    Box::new(BooleanQuery::new(vec![
                        (Occur::Should, term_q),
                        (Occur::Should, Box::new(BoostQuery::new(prefix, PREFIX_BOOST))),
                    ])),
                ));
            }
        }

        match clauses.len() {
            0 => None,
            1 => Some(clauses.pop().unwrap().1),
            _ => Some(Box::new(BooleanQuery::new(clauses))),
        }
    }

    /// The legacy anchor-based path. `^` anchors the start, `$`, `<` or
    /// a trailing space the end; otherwise the text is wrapped in
    /// wildcards according to the prefix-by-default philosophy. Class
    /// name queries additionally normalise `.` to `/` and anchor on a
    /// segment boundary, so `^com.foo.Bar` matches `/com/foo/Bar`.
    pub fn legacy_construct_query(&self, key: &str, query: &str) -> Option<Box<dyn Query>> {
        if query.is_empty() {
            debug!(field = key, "empty legacy query");
            return None;
        }
        let indexer_field = fields::field_by_key(key)?;
        if !indexer_field.indexed {
            return None;
        }
        let field = self.fields.field(key);

        let mut q = query.to_lowercase();

        let classnames = key == fields::FLD_CLASSNAMES.key || key == fields::FLD_CLASSNAMES_KW.key;
        if classnames {
            q = q.replace('.', "/");
            if let Some(rest) = q.strip_prefix('^') {
                q = if rest.starts_with('/') {
                    rest.to_string()
                } else {
                    format!("/{rest}")
                };
            } else if !q.starts_with('*') {
                q = format!("*/{q}");
            }
        } else if let Some(rest) = q.strip_prefix('^') {
            q = rest.to_string();
        } else if !q.starts_with('*') {
            q = format!("*{q}");
        }

        match q.chars().last() {
            Some(' ') | Some('<') | Some('$') => {
                q.pop();
            }
            Some('*') => {}
            _ => q.push('*'),
        }

        match q.find('*') {
            None => Some(term_query(field, &q)),
            Some(n) if n > 0 && n == q.len() - 1 => prefix_query(field, &q[..q.len() - 1]),
            _ => wildcard_query(field, &q),
        }
    }
}

fn has_wildcard(query: &str) -> bool {
    query.contains('*') || query.contains('?')
}

fn term_query(field: Field, value: &str) -> Box<dyn Query> {
    Box::new(TermQuery::new(
        Term::from_field_text(field, value),
        IndexRecordOption::Basic,
    ))
}

/// Translate a glob-style pattern (`*`, `?`) into a term-level regex
/// query. `None` if the resulting regex is invalid.
fn wildcard_query(field: Field, pattern: &str) -> Option<Box<dyn Query>> {
    let mut regex = String::with_capacity(pattern.len() + 8);
    for c in pattern.chars() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            c if regex_metachar(c) => {
                regex.push('\\');
                regex.push(c);
            }
            c => regex.push(c),
        }
    }
    match RegexQuery::from_pattern(&regex, field) {
        Ok(query) => Some(Box::new(query)),
        Err(e) => {
            debug!(pattern, error = %e, "invalid wildcard pattern");
            None
        }
    }
}

fn prefix_query(field: Field, prefix: &str) -> Option<Box<dyn Query>> {
    let mut regex = String::with_capacity(prefix.len() + 2);
    for c in prefix.chars() {
        if regex_metachar(c) {
            regex.push('\\');
        }
        regex.push(c);
    }
    regex.push_str(".*");
    match RegexQuery::from_pattern(&regex, field) {
        Ok(query) => Some(Box::new(query)),
        Err(e) => {
            debug!(prefix, error = %e, "invalid prefix pattern");
            None
        }
    }
}

fn regex_metachar(c: char) -> bool {
    matches!(
        c,
        '.' | '+' | '*' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '\\'
    )
}

/// Phrase over the analyzed plain tokens; needs at least two terms.
fn phrase_query(field: Field, processed: &str) -> Option<Box<dyn Query>> {
    let terms: Vec<Term> = analyzer::analyze(processed)
        .into_iter()
        .map(|t| Term::from_field_text(field, &t))
        .collect();
    if terms.len() < 2 {
        return None;
    }
    Some(Box::new(PhraseQuery::new(terms)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::schema::fields::ontology;
    use tantivy::collector::DocSetCollector;
    use tantivy::{doc, Index};

    struct Fixture {
        index: Index,
        creator: QueryCreator,
    }

    /// In-RAM index with a handful of artifactId shapes.
    fn fixture() -> Fixture {
        let fields = SchemaFields::build();
        let index = Index::create_in_ram(fields.schema.clone());
        crate::features::schema::register_tokenizers(&index);

        let a_kw = fields.field("a");
        let a_tok = fields.field("artifactId");
        let g_kw = fields.field("g");
        let classnames_kw = fields.field("classnames_kw");

        let mut writer: tantivy::IndexWriter = index.writer(15_000_000).unwrap();
        for (artifact_id, class_name) in [
            ("commons-logging", "/org/apache/commons/logging/Log"),
            ("log4j", "/org/apache/log4j/Logger"),
            ("junit", "/junit/framework/TestCase"),
        ] {
            writer
                .add_document(doc!(
                    a_kw => artifact_id,
                    a_tok => artifact_id,
                    g_kw => "org.example",
                    classnames_kw => class_name,
                ))
                .unwrap();
        }
        writer.commit().unwrap();

        Fixture {
            index,
            creator: QueryCreator::new(fields),
        }
    }

    fn count(fixture: &Fixture, query: &Box<dyn Query>) -> usize {
        let searcher = fixture.index.reader().unwrap().searcher();
        searcher
            .search(query.as_ref(), &DocSetCollector)
            .unwrap()
            .len()
    }

    #[test]
    fn test_exact_keyword_term() {
        let f = fixture();
        let q = f
            .creator
            .construct_query(ontology::ARTIFACT_ID, "commons-logging", SearchType::Exact)
            .unwrap();
        assert_eq!(count(&f, &q), 1);

        let none = f
            .creator
            .construct_query(ontology::ARTIFACT_ID, "commons", SearchType::Exact)
            .unwrap();
        assert_eq!(count(&f, &none), 0);
    }

    #[test]
    fn test_exact_keyword_wildcard() {
        let f = fixture();
        let q = f
            .creator
            .construct_query(ontology::ARTIFACT_ID, "commons-*", SearchType::Exact)
            .unwrap();
        assert_eq!(count(&f, &q), 1);
    }

    #[test]
    fn test_scored_wildcard_normalisation() {
        let f = fixture();
        // `common-log*` must reach `commons-logging` via the
        // prefix-by-default tokenised clauses, and must not match
        // `log4j` (no `common` prefix there).
        let q = f
            .creator
            .construct_query(ontology::ARTIFACT_ID, "common-log*", SearchType::Scored)
            .unwrap();
        assert_eq!(count(&f, &q), 1);
    }

    #[test]
    fn test_scored_plain_word_is_prefix() {
        let f = fixture();
        let q = f
            .creator
            .construct_query(ontology::ARTIFACT_ID, "junit", SearchType::Scored)
            .unwrap();
        assert_eq!(count(&f, &q), 1);

        let q = f
            .creator
            .construct_query(ontology::ARTIFACT_ID, "log", SearchType::Scored)
            .unwrap();
        // Matches both `log4j` and the `logging` token of commons-logging.
        assert_eq!(count(&f, &q), 2);
    }

    #[test]
    fn test_exact_on_tokenized_field_refused() {
        let f = fixture();
        // `classnames` resolves its EXACT variant to the keyword field;
        // an unindexed field refuses outright.
        assert!(f
            .creator
            .construct_query(ontology::NAME, "anything", SearchType::Exact)
            .is_none());
    }

    #[test]
    fn test_not_present_sentinel() {
        let f = fixture();
        let q = f
            .creator
            .construct_query(ontology::GROUP_ID, NOT_PRESENT, SearchType::Exact)
            .unwrap();
        assert_eq!(count(&f, &q), 3);
    }

    #[test]
    fn test_legacy_classname_anchoring() {
        let f = fixture();
        // `^org.apache.log4j.Logger` -> `/org/apache/log4j/logger`...
        let q = f
            .creator
            .legacy_construct_query("classnames_kw", "^org.apache.log4j.Logger$")
            .unwrap();
        // ...but keyword class names keep their case, so the lowercased
        // legacy term cannot match; the tokenized field can.
        assert_eq!(count(&f, &q), 0);

        let q = f
            .creator
            .legacy_construct_query("classnames_kw", "Logger")
            .unwrap();
        // `*/logger*` wildcard, again case-normalised.
        assert_eq!(count(&f, &q), 0);
    }

    #[test]
    fn test_legacy_anchor_semantics() {
        let f = fixture();

        // junit -> junit* prefix wrapped as *junit* by default.
        let q = f.creator.legacy_construct_query("a", "^junit$").unwrap();
        assert_eq!(count(&f, &q), 1);

        let q = f.creator.legacy_construct_query("a", "^log").unwrap();
        assert_eq!(count(&f, &q), 1); // log4j, prefix only

        let q = f.creator.legacy_construct_query("a", "log").unwrap();
        assert_eq!(count(&f, &q), 2); // *log* hits commons-logging too
    }

    #[test]
    fn test_empty_query_is_none() {
        let f = fixture();
        assert!(f.creator.legacy_construct_query("a", "").is_none());
    }
}
