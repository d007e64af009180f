use std::collections::{HashMap, HashSet};

/// Limits used for heading ids and title links, large enough to never cut a heading.
pub(crate) const ANCHOR_LIMIT: usize = 768;

/// Builds a URL-safe slug: transliterated, lowercased, punctuation removed,
/// stop words dropped, at most `word_limit` words and `char_limit` characters.
pub(crate) fn slugify(
    title: &str,
    context_words: &[String],
    word_limit: usize,
    char_limit: usize,
) -> String {
    let ascii: String = deunicode::deunicode(title)
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();

    let joined = ascii
        .split_whitespace()
        .filter(|w| !context_words.iter().any(|c| c == w))
        .take(word_limit)
        .collect::<Vec<_>>()
        .join("-");

    let slug: String = joined.chars().take(char_limit).collect();
    let slug = slug.trim_matches('-');

    if slug.is_empty() {
        "post".to_string()
    } else {
        slug.to_string()
    }
}

pub(crate) fn anchor(text: &str) -> String {
    slugify(text, &[], ANCHOR_LIMIT, ANCHOR_LIMIT)
}

/// Hands out unique anchors within one document: `a`, `a-1`, `a-2`, ...
#[derive(Default)]
pub(crate) struct AnchorState {
    counts: HashMap<String, usize>,
    issued: HashSet<String>,
}

impl AnchorState {
    pub fn next_anchor(&mut self, text: &str) -> String {
        let base = anchor(text);
        let count = self.counts.entry(base.clone()).or_insert(0);
        let mut slug = base.clone();
        while self.issued.contains(&slug) {
            *count += 1;
            slug = format!("{base}-{count}");
        }
        self.issued.insert(slug.clone());
        slug
    }
}

/// Returns `base`, or `base-N` when `base` is already taken.
pub(crate) fn unique_slug<'a>(base: &str, taken: impl Iterator<Item = &'a str> + Clone) -> String {
    if !taken.clone().any(|s| s == base) {
        return base.to_string();
    }

    let mut n = taken.clone().filter(|s| s.starts_with(base)).count();
    loop {
        let candidate = format!("{base}-{n}");
        if !taken.clone().any(|s| s == candidate) {
            return candidate;
        }
        n += 1;
    }
}
