/// Longest payload excerpt written to logs.
pub const MAX_LOGGED_PAYLOAD: usize = 512;

/// Truncates `s` to at most `max_len` bytes on a character boundary.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}
