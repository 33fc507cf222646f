//! q-gram tokenization

/// Split a value into overlapping q-grams after padding both ends with
/// `q - 1` copies of the padding string, so that boundary characters get
/// the same representational weight as inner ones.
///
/// Operates on chars, not bytes, so multi-byte characters form single
/// gram positions.
pub fn tokenize(value: &str, q: usize, padding: &str) -> Vec<String> {
    let pad = padding.repeat(q.saturating_sub(1));
    let padded: Vec<char> = format!("{pad}{value}{pad}").chars().collect();

    if padded.len() < q {
        return Vec::new();
    }

    padded.windows(q).map(|w| w.iter().collect()).collect()
}

/// Number of q-grams `tokenize` yields for a value, without materializing
/// them. Used by the attribute statistics.
pub fn token_count(value: &str, q: usize, padding: &str) -> usize {
    let padded_len = value.chars().count() + 2 * padding.chars().count() * q.saturating_sub(1);
    (padded_len + 1).saturating_sub(q)
}
