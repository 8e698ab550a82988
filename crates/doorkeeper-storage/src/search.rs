//! Member search query parser.
//!
//! A query is a sequence of terms separated by whitespace. A term is an
//! optional qualifier followed by `:` and a value; both are either a bare word
//! (`[\w-]+`) or a quoted phrase (`"[\w -]+"`):
//!
//! ```text
//! smith                     # name, email or key UID contains "smith"
//! group:board               # member of the group named "board"
//! tag:"front door" jones    # holds the "front door" tag and matches "jones"
//! ```
//!
//! All terms must match. Values are compared lowercased.

use crate::error::{StorageError, StorageResult};
use regex::Regex;
use std::sync::LazyLock;

static RE_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:(?:"(?P<qquoted>[\w -]+)"|(?P<qbare>[\w-]+)):)?(?:"(?P<vquoted>[\w -]+)"|(?P<vbare>[\w-]+))"#)
        .expect("search term pattern is valid")
});

/// One parsed search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTerm {
    /// Substring of first name, last name, email or a bound key UID.
    Text(String),
    /// Exact (lowercased) group name.
    Group(String),
    /// Exact (lowercased) authorization tag name.
    Tag(String),
}

impl SearchTerm {
    fn qualified(qualifier: &str, value: String) -> StorageResult<Self> {
        match qualifier.to_lowercase().as_str() {
            "group" => Ok(Self::Group(value)),
            "tag" => Ok(Self::Tag(value)),
            other => Err(StorageError::validation(format!(
                "unknown search qualifier '{other}' (expected group or tag)"
            ))),
        }
    }
}

/// Split a query into terms.
///
/// Characters that cannot start a term are skipped. An empty query yields no
/// terms and therefore matches every user.
///
/// # Errors
///
/// Returns `StorageError::Validation` for a qualifier other than `group` or
/// `tag`.
pub fn parse_query(query: &str) -> StorageResult<Vec<SearchTerm>> {
    RE_TERM
        .captures_iter(query)
        .map(|caps| {
            let value = caps
                .name("vquoted")
                .or_else(|| caps.name("vbare"))
                .map(|m| m.as_str().to_lowercase())
                .unwrap_or_default();

            match caps.name("qquoted").or_else(|| caps.name("qbare")) {
                Some(qualifier) => SearchTerm::qualified(qualifier.as_str(), value),
                None => Ok(SearchTerm::Text(value)),
            }
        })
        .collect()
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub(crate) fn like_pattern(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("smith", vec![SearchTerm::Text("smith".into())])]
    #[case("Smith JONES", vec![SearchTerm::Text("smith".into()), SearchTerm::Text("jones".into())])]
    #[case("group:Board", vec![SearchTerm::Group("board".into())])]
    #[case("tag:\"Front Door\"", vec![SearchTerm::Tag("front door".into())])]
    #[case("\"Mary Ann\"", vec![SearchTerm::Text("mary ann".into())])]
    #[case("tag:\"group name\" smith", vec![SearchTerm::Tag("group name".into()), SearchTerm::Text("smith".into())])]
    #[case("04ab-cd", vec![SearchTerm::Text("04ab-cd".into())])]
    #[case("", vec![])]
    fn test_parse_query(#[case] query: &str, #[case] expected: Vec<SearchTerm>) {
        assert_eq!(parse_query(query).unwrap(), expected);
    }

    #[test]
    fn test_quoted_qualifier() {
        let terms = parse_query("\"Group\":makers").unwrap();
        assert_eq!(terms, vec![SearchTerm::Group("makers".into())]);
    }

    #[rstest]
    #[case("email:foo")]
    #[case("smith status:active")]
    fn test_unknown_qualifier(#[case] query: &str) {
        assert!(matches!(parse_query(query), Err(StorageError::Validation(_))));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("a_b%c"), "%a\\_b\\%c%");
    }

    proptest! {
        #[test]
        fn bare_words_become_text_terms(words in prop::collection::vec("[a-z0-9][a-z0-9-]{0,11}", 0..6)) {
            let query = words.join(" ");
            let terms = parse_query(&query).unwrap();
            let expected: Vec<SearchTerm> = words.into_iter().map(SearchTerm::Text).collect();
            prop_assert_eq!(terms, expected);
        }

        #[test]
        fn parser_never_panics(query in "\\PC{0,40}") {
            let _ = parse_query(&query);
        }
    }
}
