//! Palindrome derivation.

/// Whether `text` reads the same forwards and backwards once every
/// character that is not a letter or digit is stripped and the remainder
/// is lowercased.
///
/// Comparison is per Unicode codepoint, so non-ASCII input behaves
/// sensibly. An input that normalizes to nothing (including the empty
/// string) is trivially a palindrome.
pub fn is_palindrome(text: &str) -> bool {
    let normalized: Vec<char> = text
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();

    normalized
        .iter()
        .zip(normalized.iter().rev())
        .all(|(a, b)| a == b)
}
