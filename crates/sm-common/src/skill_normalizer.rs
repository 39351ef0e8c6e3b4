use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;

/// Fold a free-text skill name into its comparison form: NFKC, trimmed,
/// lowercased. Skill names come from GitHub language stats and manual entry,
/// so width/compatibility variants of the same name must compare equal.
pub fn normalize_skill_name(name: &str) -> String {
    name.nfkc().collect::<String>().trim().to_lowercase()
}

/// Deduplicate a list of names into a normalized set, dropping entries that
/// are empty after folding.
pub fn normalize_skill_set<I, S>(names: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| normalize_skill_name(name.as_ref()))
        .filter(|name| !name.is_empty())
        .collect()
}
