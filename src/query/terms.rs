//! Search term extraction from natural-language queries

/// Filler words dropped from queries before searching
pub const STOPWORDS: [&str; 10] = [
    "get",
    "me",
    "all",
    "with",
    "the",
    "word",
    "about",
    "containing",
    "related",
    "to",
];

/// Lowercase the query, drop stopwords, and rejoin the remaining tokens with
/// single spaces in their original order.
///
/// A query made only of stopwords yields an empty string.
pub fn extract_search_terms(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|token| !STOPWORDS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_stopwords_preserving_order() {
        assert_eq!(
            extract_search_terms("get me all patents with the word hydrocarbon"),
            "patents hydrocarbon"
        );
    }

    #[test]
    fn lowercases_and_collapses_whitespace() {
        assert_eq!(extract_search_terms("  Solar\tPANELS  related to   Roofs "), "solar panels roofs");
    }

    #[test]
    fn all_stopwords_is_empty() {
        assert_eq!(extract_search_terms("Get me ALL about the"), "");
        assert_eq!(extract_search_terms(""), "");
    }

    #[test]
    fn stopwords_only_match_whole_tokens() {
        assert_eq!(extract_search_terms("together within"), "together within");
    }
}
