//! Brand-prefix inference over free-text product names.
//!
//! A word trie is built over every distinct name; each node counts how many
//! names pass through it. A name's brand prefix is the run of leading words
//! whose nodes are shared by at least [`MIN_SHARED_NAMES`] names, capped so
//! the display name keeps [`MIN_DISPLAY_WORDS`] words (one for two-word
//! names).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;

/// A word sequence must be shared by this many names to count as a brand.
pub const MIN_SHARED_NAMES: usize = 2;

/// Words a display name keeps when the original has three or more.
pub const MIN_DISPLAY_WORDS: usize = 2;

/// Longest prefix, in words, that may be stripped from a name of `word_count`.
fn max_prefix_words(word_count: usize) -> usize {
    match word_count {
        0 | 1 => 0,
        2 => 1,
        n => n - MIN_DISPLAY_WORDS,
    }
}

// ── BrandMapping ──────────────────────────────────────────────────────────────

/// The inferred brand prefix and shortened label for one product name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandLabel {
    /// Leading words shared with other names, sliced from the original text.
    /// Empty when none were shared.
    pub brand_prefix: String,
    /// The name with `brand_prefix` removed, or the whole name when the
    /// prefix is empty.
    pub display_name: String,
}

/// Original product name → [`BrandLabel`].
///
/// Names absent from the mapping map to themselves with an empty prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BrandMapping {
    labels: BTreeMap<String, BrandLabel>,
}

impl BrandMapping {
    pub fn get(&self, name: &str) -> Option<&BrandLabel> {
        self.labels.get(name)
    }

    /// Display label for `name`, falling back to `name` itself.
    pub fn display_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.labels
            .get(name)
            .map(|l| l.display_name.as_str())
            .unwrap_or(name)
    }

    /// Brand prefix for `name`, empty when unknown.
    pub fn brand_prefix(&self, name: &str) -> &str {
        self.labels
            .get(name)
            .map(|l| l.brand_prefix.as_str())
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BrandLabel)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ── WordTrie ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct TrieNode {
    /// Names passing through this node.
    count: usize,
    children: HashMap<String, usize>,
}

/// Arena-backed trie keyed by whole words. Node 0 is the root.
struct WordTrie {
    nodes: Vec<TrieNode>,
}

impl WordTrie {
    fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
        }
    }

    fn insert(&mut self, words: &[&str]) {
        let mut current = 0;
        for word in words {
            let next = match self.nodes[current].children.get(*word) {
                Some(&idx) => idx,
                None => {
                    let idx = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[current].children.insert((*word).to_string(), idx);
                    idx
                }
            };
            self.nodes[next].count += 1;
            current = next;
        }
    }

    /// Number of leading words of `words` whose nodes are shared by at least
    /// `min_count` inserted names.
    fn shared_prefix_len(&self, words: &[&str], min_count: usize) -> usize {
        let mut current = 0;
        let mut depth = 0;
        for word in words {
            let Some(&next) = self.nodes[current].children.get(*word) else {
                break;
            };
            if self.nodes[next].count < min_count {
                break;
            }
            depth += 1;
            current = next;
        }
        depth
    }
}

// ── BrandPrefixDetector ───────────────────────────────────────────────────────

/// Infers brand prefixes from word frequency alone.
pub struct BrandPrefixDetector;

impl BrandPrefixDetector {
    /// Build a [`BrandMapping`] for `names`.
    ///
    /// Names are trimmed and de-duplicated first, so the result depends only
    /// on the set of names and never on their order. Fewer than two distinct
    /// names yields an empty mapping.
    ///
    /// A prefix never consumes a whole name: `"Acme Bar"` alongside
    /// `"Acme Bar Large"` yields `"Acme"` / `"Bar"`, and single-word names
    /// always keep an empty prefix.
    pub fn detect<S: AsRef<str>>(names: &[S]) -> BrandMapping {
        let distinct: BTreeSet<&str> = names
            .iter()
            .map(|n| n.as_ref().trim())
            .filter(|n| !n.is_empty())
            .collect();

        if distinct.len() < MIN_SHARED_NAMES {
            return BrandMapping::default();
        }

        let tokenised: Vec<(&str, Vec<&str>)> = distinct
            .iter()
            .map(|name| (*name, name.split_whitespace().collect()))
            .collect();

        let mut trie = WordTrie::new();
        for (_, words) in &tokenised {
            trie.insert(words);
        }

        let mut labels = BTreeMap::new();
        let mut prefixed = 0usize;
        for (name, words) in &tokenised {
            let depth = trie
                .shared_prefix_len(words, MIN_SHARED_NAMES)
                .min(max_prefix_words(words.len()));
            let label = if depth == 0 {
                BrandLabel {
                    brand_prefix: String::new(),
                    display_name: (*name).to_string(),
                }
            } else {
                prefixed += 1;
                // Slice the original text so internal whitespace survives.
                let end = word_end(name, words[depth - 1]);
                BrandLabel {
                    brand_prefix: name[..end].to_string(),
                    display_name: name[end..].trim_start().to_string(),
                }
            };
            labels.insert((*name).to_string(), label);
        }

        debug!(
            "Brand detection: {} of {} product names share a prefix",
            prefixed,
            labels.len()
        );

        BrandMapping { labels }
    }
}

/// Byte offset just past `word`, which must be a subslice of `name`.
fn word_end(name: &str, word: &str) -> usize {
    word.as_ptr() as usize - name.as_ptr() as usize + word.len()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── detect ────────────────────────────────────────────────────────────────

    #[test]
    fn test_detect_shared_first_word() {
        let mapping = BrandPrefixDetector::detect(&["Acme Choco Bar", "Acme Choco Drink"]);
        let bar = mapping.get("Acme Choco Bar").unwrap();
        assert_eq!(bar.brand_prefix, "Acme");
        assert_eq!(bar.display_name, "Choco Bar");
        let drink = mapping.get("Acme Choco Drink").unwrap();
        assert_eq!(drink.brand_prefix, "Acme");
        assert_eq!(drink.display_name, "Choco Drink");
    }

    #[test]
    fn test_detect_multi_word_prefix() {
        let mapping = BrandPrefixDetector::detect(&[
            "Acme Choco Bar Family Pack",
            "Acme Choco Bar Single",
            "Acme Choco Drink Large Bottle",
        ]);
        // "Acme Choco Bar" is shared by two names.
        let family = mapping.get("Acme Choco Bar Family Pack").unwrap();
        assert_eq!(family.brand_prefix, "Acme Choco Bar");
        assert_eq!(family.display_name, "Family Pack");
        // Capped so that two display words remain.
        let single = mapping.get("Acme Choco Bar Single").unwrap();
        assert_eq!(single.brand_prefix, "Acme Choco");
        assert_eq!(single.display_name, "Bar Single");
        let drink = mapping.get("Acme Choco Drink Large Bottle").unwrap();
        assert_eq!(drink.brand_prefix, "Acme Choco");
        assert_eq!(drink.display_name, "Drink Large Bottle");
    }

    #[test]
    fn test_detect_stops_at_first_unique_word() {
        let mapping = BrandPrefixDetector::detect(&[
            "Acme Choco Bar Large",
            "Acme Mint Drink Small",
            "Zeta Soda Can",
        ]);
        let choco = mapping.get("Acme Choco Bar Large").unwrap();
        assert_eq!(choco.brand_prefix, "Acme");
        assert_eq!(choco.display_name, "Choco Bar Large");
        let mint = mapping.get("Acme Mint Drink Small").unwrap();
        assert_eq!(mint.brand_prefix, "Acme");
        assert_eq!(mint.display_name, "Mint Drink Small");
    }

    #[test]
    fn test_detect_unique_name_has_no_prefix() {
        let mapping = BrandPrefixDetector::detect(&["Acme Bar", "Acme Drink", "Zeta Soda"]);
        let zeta = mapping.get("Zeta Soda").unwrap();
        assert_eq!(zeta.brand_prefix, "");
        assert_eq!(zeta.display_name, "Zeta Soda");
    }

    #[test]
    fn test_detect_single_name_is_empty() {
        assert!(BrandPrefixDetector::detect(&["Acme Choco Bar"]).is_empty());
        let empty: [&str; 0] = [];
        assert!(BrandPrefixDetector::detect(&empty).is_empty());
    }

    #[test]
    fn test_detect_duplicates_count_once() {
        let mapping = BrandPrefixDetector::detect(&["Acme Bar", "Acme Bar"]);
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_detect_never_consumes_whole_name() {
        let mapping = BrandPrefixDetector::detect(&["Acme Bar", "Acme Bar Large"]);
        let short = mapping.get("Acme Bar").unwrap();
        assert_eq!(short.brand_prefix, "Acme");
        assert_eq!(short.display_name, "Bar");
        let long = mapping.get("Acme Bar Large").unwrap();
        assert_eq!(long.brand_prefix, "Acme");
        assert_eq!(long.display_name, "Bar Large");
    }

    #[test]
    fn test_detect_single_word_names_keep_no_prefix() {
        let mapping = BrandPrefixDetector::detect(&["Acme", "Acme Bar"]);
        let single = mapping.get("Acme").unwrap();
        assert_eq!(single.brand_prefix, "");
        assert_eq!(single.display_name, "Acme");
        assert_eq!(mapping.display_name("Acme Bar"), "Bar");
    }

    #[test]
    fn test_detect_majority_branch_wins() {
        // "Acme Choco" is shared by three names, "Acme Mint" by one.
        let names = [
            "Acme Choco Bar Mini",
            "Acme Choco Drink Mini",
            "Acme Choco Cookie Mini",
            "Acme Mint Gum Mini",
        ];
        let mapping = BrandPrefixDetector::detect(&names);
        assert_eq!(mapping.brand_prefix("Acme Choco Cookie Mini"), "Acme Choco");
        assert_eq!(mapping.brand_prefix("Acme Mint Gum Mini"), "Acme");
    }

    #[test]
    fn test_detect_is_order_independent() {
        let names = vec![
            "Acme Choco Bar",
            "Acme Choco Drink",
            "Zeta Soda Can",
            "Zeta Soda Bottle",
            "Solo Item",
        ];
        let forward = BrandPrefixDetector::detect(&names);
        let mut reversed = names.clone();
        reversed.reverse();
        let mut rotated = names.clone();
        rotated.rotate_left(2);

        assert_eq!(forward, BrandPrefixDetector::detect(&reversed));
        assert_eq!(forward, BrandPrefixDetector::detect(&rotated));
    }

    #[test]
    fn test_detect_round_trip_restores_name() {
        let names = [
            "Acme Choco Bar",
            "Acme Choco Drink",
            "Acme Mint Gum",
            "Zeta Soda Can",
            "Zeta Soda Bottle",
            "Solo Item",
        ];
        let mapping = BrandPrefixDetector::detect(&names);
        for name in names {
            let label = mapping.get(name).unwrap();
            let restored = if label.brand_prefix.is_empty() {
                label.display_name.clone()
            } else {
                format!("{} {}", label.brand_prefix, label.display_name)
            };
            assert_eq!(restored, name);
        }
    }

    #[test]
    fn test_detect_keeps_irregular_whitespace() {
        let names = [
            "Acme Choco  Bar",
            "Acme Choco Drink",
            "Big\tZeta Soda Can",
            "Big\tZeta Soda Jar",
        ];
        let mapping = BrandPrefixDetector::detect(&names);

        let bar = mapping.get("Acme Choco  Bar").unwrap();
        assert_eq!(bar.brand_prefix, "Acme");
        assert_eq!(bar.display_name, "Choco  Bar");

        let can = mapping.get("Big\tZeta Soda Can").unwrap();
        assert_eq!(can.brand_prefix, "Big\tZeta");
        assert_eq!(can.display_name, "Soda Can");

        for name in names {
            let label = mapping.get(name).unwrap();
            assert!(name.starts_with(&label.brand_prefix));
            assert_eq!(name[label.brand_prefix.len()..].trim_start(), label.display_name);
        }
    }

    #[test]
    fn test_detect_trims_names() {
        let mapping = BrandPrefixDetector::detect(&["  Acme Bar ", "Acme Drink"]);
        assert_eq!(mapping.display_name("Acme Bar"), "Bar");
    }

    // ── BrandMapping lookups ──────────────────────────────────────────────────

    #[test]
    fn test_mapping_falls_back_to_self() {
        let mapping = BrandMapping::default();
        assert_eq!(mapping.display_name("Anything Goes"), "Anything Goes");
        assert_eq!(mapping.brand_prefix("Anything Goes"), "");
    }

    #[test]
    fn test_mapping_serializes_camel_case() {
        let mapping = BrandPrefixDetector::detect(&["Acme Bar", "Acme Drink"]);
        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(json["Acme Bar"]["brandPrefix"], "Acme");
        assert_eq!(json["Acme Bar"]["displayName"], "Bar");
    }
}
