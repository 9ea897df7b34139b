//! The index analyzer.
//!
//! One pipeline for write, query parse and term counting: split on any
//! non-alphanumeric character, then unicode-lowercase. Keyword fields
//! bypass it entirely (they use the `raw` tokenizer). Changing this
//! pipeline changes the published index format.

use tantivy::tokenizer::{LowerCaser, TextAnalyzer, Token, TokenStream, Tokenizer};

/// Splits text into maximal alphanumeric runs.
///
/// - `commons-logging` -> `["commons", "logging"]`
/// - `/org/apache/maven/model/Model` -> `["org", "apache", "maven", "model", "Model"]`
/// - `log4j` -> `["log4j"]`
#[derive(Clone, Default)]
pub struct AlphanumTokenizer;

impl Tokenizer for AlphanumTokenizer {
    type TokenStream<'a> = AlphanumTokenStream<'a>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        AlphanumTokenStream {
            text,
            tokens: Vec::new(),
            split: false,
            current_index: 0,
        }
    }
}

pub struct AlphanumTokenStream<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    split: bool,
    current_index: usize,
}

impl<'a> AlphanumTokenStream<'a> {
    fn split_runs(&mut self) {
        let text = self.text;
        let mut start: Option<usize> = None;

        let mut flush = |tokens: &mut Vec<Token>, from: usize, to: usize| {
            if from < to {
                tokens.push(Token {
                    offset_from: from,
                    offset_to: to,
                    position: tokens.len(),
                    text: text[from..to].to_string(),
                    position_length: 1,
                });
            }
        };

        for (i, ch) in text.char_indices() {
            if ch.is_alphanumeric() {
                if start.is_none() {
                    start = Some(i);
                }
            } else if let Some(from) = start.take() {
                flush(&mut self.tokens, from, i);
            }
        }
        if let Some(from) = start {
            flush(&mut self.tokens, from, text.len());
        }
    }
}

impl<'a> TokenStream for AlphanumTokenStream<'a> {
    fn advance(&mut self) -> bool {
        if !self.split {
            self.split = true;
            self.split_runs();
        }

        if self.current_index < self.tokens.len() {
            self.current_index += 1;
            true
        } else {
            false
        }
    }

    fn token(&self) -> &Token {
        &self.tokens[self.current_index - 1]
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.tokens[self.current_index - 1]
    }
}

/// Build the analyzer: alphanumeric runs, lowercased.
pub fn build_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(AlphanumTokenizer)
        .filter(LowerCaser)
        .build()
}

/// Run `text` through the analyzer and collect the resulting terms.
pub fn analyze(text: &str) -> Vec<String> {
    let mut analyzer = build_analyzer();
    let mut stream = analyzer.token_stream(text);
    let mut out = Vec::new();
    while stream.advance() {
        out.push(stream.token().text.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_punctuation() {
        assert_eq!(analyze("commons-logging"), vec!["commons", "logging"]);
        assert_eq!(analyze("org.apache.maven"), vec!["org", "apache", "maven"]);
        assert_eq!(
            analyze("/org/apache/maven/model/Model"),
            vec!["org", "apache", "maven", "model", "model"]
        );
    }

    #[test]
    fn test_digits_stay_inside_tokens() {
        assert_eq!(analyze("log4j"), vec!["log4j"]);
        assert_eq!(analyze("2.2.1"), vec!["2", "2", "1"]);
    }

    #[test]
    fn test_lowercases() {
        assert_eq!(analyze("CommonsLogging"), vec!["commonslogging"]);
    }

    #[test]
    fn test_empty_and_punctuation_only() {
        assert!(analyze("").is_empty());
        assert!(analyze("-._").is_empty());
    }
}
