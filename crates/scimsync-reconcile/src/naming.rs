//! Display-name derivation for newly provisioned users.

/// Derive a human display name from an address's local part.
///
/// `.`, `_`, `-` and whitespace separate words; each word is title-cased.
/// An empty result falls back to the raw address.
///
/// ```
/// use scimsync_reconcile::naming::display_name_from_address;
///
/// assert_eq!(display_name_from_address("mary-jane.o_neil@co"), "Mary Jane O Neil");
/// assert_eq!(display_name_from_address("...@co"), "...@co");
/// ```
#[must_use]
pub fn display_name_from_address(address: &str) -> String {
    let local = address.split_once('@').map_or(address, |(local, _)| local);

    let words: Vec<String> = local
        .split(is_word_separator)
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect();

    if words.is_empty() {
        address.to_string()
    } else {
        words.join(" ")
    }
}

/// Separators between words of a local part.
pub fn is_word_separator(c: char) -> bool {
    matches!(c, '.' | '_' | '-') || c.is_whitespace()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
