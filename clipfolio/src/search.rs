//! Search over history and favorites
//!
//! Pure reads over borrowed snapshots of both stores. Results keep store
//! order: history first, then each folder in display order. A candidate hits
//! on its text, or failing that on its description.
//!
//! Literal queries are compiled to an escaped regex so case folding and
//! highlight offsets behave the same in both modes. Whole-word literal
//! matching accepts an occurrence only when the characters on either side
//! are not word characters, which is token equality for single-word queries.

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::favorites::FavoritesCollection;
use crate::interface::{
    HighlightRange, MatchedField, SearchHit, SearchOptions, SearchOutcome, SearchScope, SearchSource,
};

/// Highlight ranges kept per hit
const MAX_HIGHLIGHTS: usize = 100;

/// Borrowed view of everything a query can see
#[derive(Debug, Clone, Copy)]
pub struct SearchSources<'a> {
    pub history: &'a [String],
    pub favorites: &'a FavoritesCollection,
    /// Folder that [`SearchScope::CurrentFolder`] resolves to
    pub current_folder: &'a str,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// A compiled query
pub(crate) struct QueryMatcher {
    /// `None` when even the escaped literal can't compile; nothing matches
    regex: Option<Regex>,
    /// Literal whole-word mode: boundaries are checked around each occurrence
    check_boundaries: bool,
}

impl QueryMatcher {
    /// Compile `query`. An invalid regex degrades to a literal search and the
    /// compile error is returned alongside.
    pub(crate) fn compile(query: &str, options: SearchOptions) -> (Self, Option<String>) {
        if options.use_regex {
            let pattern = if options.whole_word {
                format!(r"\b(?:{})\b", query)
            } else {
                query.to_string()
            };
            match RegexBuilder::new(&pattern)
                .case_insensitive(!options.case_sensitive)
                .build()
            {
                Ok(regex) => {
                    return (
                        Self {
                            regex: Some(regex),
                            check_boundaries: false,
                        },
                        None,
                    )
                }
                Err(e) => {
                    warn!(query, error = %e, "Invalid regex, falling back to literal search");
                    return (Self::literal(query, options), Some(e.to_string()));
                }
            }
        }
        (Self::literal(query, options), None)
    }

    fn literal(query: &str, options: SearchOptions) -> Self {
        let regex = RegexBuilder::new(&regex::escape(query))
            .case_insensitive(!options.case_sensitive)
            .build()
            .map_err(|e| warn!(error = %e, "Literal query failed to compile"))
            .ok();
        Self {
            regex,
            check_boundaries: options.whole_word,
        }
    }

    fn boundaries_ok(haystack: &str, start: usize, end: usize) -> bool {
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    }

    /// Byte ranges of accepted matches. `None` means no match at all;
    /// an empty vec means the pattern matched only empty strings.
    fn byte_matches(&self, haystack: &str) -> Option<Vec<(usize, usize)>> {
        let regex = self.regex.as_ref()?;
        if !self.check_boundaries {
            if !regex.is_match(haystack) {
                return None;
            }
            let ranges = regex
                .find_iter(haystack)
                .filter(|m| !m.is_empty())
                .take(MAX_HIGHLIGHTS)
                .map(|m| (m.start(), m.end()))
                .collect();
            return Some(ranges);
        }

        let mut ranges = Vec::new();
        let mut start = 0;
        while start <= haystack.len() && ranges.len() < MAX_HIGHLIGHTS {
            let Some(m) = regex.find_at(haystack, start) else {
                break;
            };
            if !m.is_empty() && Self::boundaries_ok(haystack, m.start(), m.end()) {
                ranges.push((m.start(), m.end()));
                start = m.end();
            } else {
                // Retry from the next character so overlapping occurrences aren't skipped
                start = match haystack[m.start()..].chars().next() {
                    Some(c) => m.start() + c.len_utf8(),
                    None => break,
                };
            }
        }
        (!ranges.is_empty()).then_some(ranges)
    }

    /// Highlight ranges in character offsets, or `None` when `haystack` doesn't match.
    pub(crate) fn find(&self, haystack: &str) -> Option<Vec<HighlightRange>> {
        self.byte_matches(haystack)
            .map(|ranges| byte_ranges_to_char_ranges(haystack, &ranges))
    }
}

/// Convert sorted, non-overlapping byte ranges into character-offset highlights.
fn byte_ranges_to_char_ranges(haystack: &str, ranges: &[(usize, usize)]) -> Vec<HighlightRange> {
    let mut out = Vec::with_capacity(ranges.len());
    let mut chars_seen = 0u64;
    let mut byte_pos = 0usize;

    for &(start, end) in ranges {
        chars_seen += haystack[byte_pos..start].chars().count() as u64;
        let char_start = chars_seen;
        chars_seen += haystack[start..end].chars().count() as u64;
        byte_pos = end;
        out.push(HighlightRange {
            start: char_start,
            end: chars_seen,
        });
    }
    out
}

/// Highlight ranges for `query` in `text` using the same rules as a search.
pub fn highlight_ranges(text: &str, query: &str, options: SearchOptions) -> Vec<HighlightRange> {
    if query.is_empty() {
        return Vec::new();
    }
    let (matcher, _) = QueryMatcher::compile(query, options);
    matcher.find(text).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchEngine;

impl SearchEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn search(
        &self,
        sources: &SearchSources<'_>,
        query: &str,
        scope: &SearchScope,
        options: SearchOptions,
    ) -> SearchOutcome {
        if query.is_empty() {
            return SearchOutcome::default();
        }

        let (matcher, regex_error) = QueryMatcher::compile(query, options);
        let mut hits = Vec::new();

        let (include_history, folders): (bool, Vec<&str>) = match scope {
            SearchScope::All => (true, sources.favorites.folder_names().collect()),
            SearchScope::HistoryOnly => (true, Vec::new()),
            SearchScope::AllFolders => (false, sources.favorites.folder_names().collect()),
            SearchScope::CurrentFolder => (false, vec![sources.current_folder]),
            SearchScope::Folder(name) => (false, vec![name.as_str()]),
        };

        if include_history {
            for (index, text) in sources.history.iter().enumerate() {
                if let Some(highlights) = matcher.find(text) {
                    hits.push(SearchHit {
                        source: SearchSource::History,
                        index,
                        text: text.clone(),
                        description: String::new(),
                        matched_field: MatchedField::Text,
                        highlights,
                    });
                }
            }
        }

        for name in folders {
            let Some(folder) = sources.favorites.folder(name) else {
                debug!(folder = name, "Search scope names a missing folder");
                continue;
            };
            for (index, item) in folder.items.iter().enumerate() {
                let found = match matcher.find(&item.text) {
                    Some(h) => Some((MatchedField::Text, h)),
                    None if !item.description.is_empty() => matcher
                        .find(&item.description)
                        .map(|h| (MatchedField::Description, h)),
                    None => None,
                };
                if let Some((matched_field, highlights)) = found {
                    hits.push(SearchHit {
                        source: SearchSource::Folder(folder.name.clone()),
                        index,
                        text: item.text.clone(),
                        description: item.description.clone(),
                        matched_field,
                        highlights,
                    });
                }
            }
        }

        debug!(query, hits = hits.len(), "Search finished");
        SearchOutcome { hits, regex_error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{FavoriteItem, DEFAULT_FOLDER};
    use crate::models::FavoriteFolder;

    fn hr(start: u64, end: u64) -> HighlightRange {
        HighlightRange { start, end }
    }

    fn fixture() -> (Vec<String>, FavoritesCollection) {
        let history = vec![
            "a cat sat".to_string(),
            "concatenate strings".to_string(),
            "Dog days".to_string(),
        ];
        let favorites = FavoritesCollection::from_folders(vec![
            FavoriteFolder::with_items(
                DEFAULT_FOLDER,
                vec![FavoriteItem::with_description("ssh host", "cat server login")],
            ),
            FavoriteFolder::with_items(
                "pets",
                vec![FavoriteItem::new("cat food"), FavoriteItem::new("dog food")],
            ),
        ]);
        (history, favorites)
    }

    fn run(query: &str, scope: SearchScope, options: SearchOptions) -> SearchOutcome {
        let (history, favorites) = fixture();
        let sources = SearchSources {
            history: &history,
            favorites: &favorites,
            current_folder: "pets",
        };
        SearchEngine::new().search(&sources, query, &scope, options)
    }

    fn labels(outcome: &SearchOutcome) -> Vec<(String, usize)> {
        outcome
            .hits
            .iter()
            .map(|h| (h.source_label(), h.index))
            .collect()
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        assert!(run("", SearchScope::All, SearchOptions::default()).hits.is_empty());
    }

    #[test]
    fn test_results_keep_store_order() {
        let outcome = run("cat", SearchScope::All, SearchOptions::default());
        assert_eq!(
            labels(&outcome),
            vec![
                ("history".to_string(), 0),
                ("history".to_string(), 1),
                ("folder:default".to_string(), 0),
                ("folder:pets".to_string(), 0),
            ]
        );
    }

    #[test]
    fn test_description_match_is_used_as_fallback() {
        let outcome = run("server", SearchScope::AllFolders, SearchOptions::default());
        assert_eq!(outcome.hits.len(), 1);
        let hit = &outcome.hits[0];
        assert_eq!(hit.text, "ssh host");
        assert_eq!(hit.matched_field, MatchedField::Description);
        assert_eq!(hit.highlights, vec![hr(4, 10)]);
    }

    #[test]
    fn test_scope_isolation() {
        let outcome = run("food", SearchScope::Folder("pets".into()), SearchOptions::default());
        assert!(outcome
            .hits
            .iter()
            .all(|h| h.source == SearchSource::Folder("pets".into())));
        assert_eq!(outcome.hits.len(), 2);

        let outcome = run("cat", SearchScope::Folder("pets".into()), SearchOptions::default());
        assert_eq!(labels(&outcome), vec![("folder:pets".to_string(), 0)]);

        let outcome = run("cat", SearchScope::HistoryOnly, SearchOptions::default());
        assert!(outcome.hits.iter().all(|h| h.source == SearchSource::History));

        let outcome = run("dog", SearchScope::CurrentFolder, SearchOptions::default());
        assert_eq!(labels(&outcome), vec![("folder:pets".to_string(), 1)]);

        assert!(run("cat", SearchScope::Folder("missing".into()), SearchOptions::default())
            .hits
            .is_empty());
    }

    #[test]
    fn test_literal_whole_word() {
        let options = SearchOptions {
            whole_word: true,
            ..Default::default()
        };
        let outcome = run("cat", SearchScope::HistoryOnly, options);
        assert_eq!(labels(&outcome), vec![("history".to_string(), 0)]);
        assert_eq!(outcome.hits[0].highlights, vec![hr(2, 5)]);
    }

    #[test]
    fn test_whole_word_finds_later_occurrence() {
        let options = SearchOptions {
            whole_word: true,
            ..Default::default()
        };
        assert_eq!(highlight_ranges("cats cat", "cat", options), vec![hr(5, 8)]);
        assert_eq!(highlight_ranges("c++ and c", "c++", options), vec![hr(0, 3)]);
        assert!(highlight_ranges("concatenate", "cat", options).is_empty());
    }

    #[test]
    fn test_case_sensitivity() {
        let insensitive = run("dog days", SearchScope::HistoryOnly, SearchOptions::default());
        assert_eq!(insensitive.hits.len(), 1);

        let sensitive = run(
            "dog days",
            SearchScope::HistoryOnly,
            SearchOptions {
                case_sensitive: true,
                ..Default::default()
            },
        );
        assert!(sensitive.hits.is_empty());
    }

    #[test]
    fn test_regex_search() {
        let options = SearchOptions {
            use_regex: true,
            ..Default::default()
        };
        let outcome = run(r"^(dog|cat) food$", SearchScope::All, options);
        assert_eq!(
            labels(&outcome),
            vec![("folder:pets".to_string(), 0), ("folder:pets".to_string(), 1)]
        );
        assert!(outcome.regex_error.is_none());
    }

    #[test]
    fn test_regex_whole_word() {
        let options = SearchOptions {
            use_regex: true,
            whole_word: true,
            ..Default::default()
        };
        let outcome = run("c.t", SearchScope::HistoryOnly, options);
        assert_eq!(labels(&outcome), vec![("history".to_string(), 0)]);
    }

    #[test]
    fn test_invalid_regex_falls_back_to_literal() {
        let history = vec!["call foo(bar".to_string(), "other".to_string()];
        let favorites = FavoritesCollection::new();
        let sources = SearchSources {
            history: &history,
            favorites: &favorites,
            current_folder: DEFAULT_FOLDER,
        };
        let options = SearchOptions {
            use_regex: true,
            ..Default::default()
        };
        let outcome = SearchEngine::new().search(&sources, "foo(", &SearchScope::All, options);
        assert!(outcome.regex_error.is_some());
        assert_eq!(outcome.hits.len(), 1);
        assert_eq!(outcome.hits[0].highlights, vec![hr(5, 9)]);
    }

    #[test]
    fn test_highlights_use_char_offsets() {
        let ranges = highlight_ranges("héllo wörld wörld", "wörld", SearchOptions::default());
        assert_eq!(ranges, vec![hr(6, 11), hr(12, 17)]);
    }

    #[test]
    fn test_empty_regex_match_counts_without_highlight() {
        let options = SearchOptions {
            use_regex: true,
            ..Default::default()
        };
        let outcome = run("x*", SearchScope::HistoryOnly, options);
        assert_eq!(outcome.hits.len(), 3);
        assert!(outcome.hits.iter().all(|h| h.highlights.is_empty()));
    }
}
