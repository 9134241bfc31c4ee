/// Truncates `value` to at most `max_chars` characters.
///
/// When truncation happens the tail is replaced with `...`, still within the
/// bound. Counts chars, not bytes, so multi-byte text never splits mid-codepoint.
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    if max_chars < 3 {
        return value.chars().take(max_chars).collect();
    }
    let mut truncated = value.chars().take(max_chars - 3).collect::<String>();
    truncated.push_str("...");
    truncated
}
