/// Collapses a recipient name into a form safe as a redis hash-field key:
/// lowercased, leading `@` stripped, whitespace and `:` replaced with `-`.
///
/// `:` would otherwise collide with the field namespacing used by the score
/// hashes.
pub fn clean_name(name: &str) -> String {
    name.trim()
        .trim_start_matches('@')
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == ':' { '-' } else { c })
        .collect()
}
