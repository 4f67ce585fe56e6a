//! Quote-aware splitting of one VALUES tuple into raw field tokens.

/// Split the inner text of a `( ... )` tuple on top-level commas.
///
/// Tokens are trimmed but keep their quotes. A comma inside an open `'...'`
/// or `"..."` region is content. A quote of the other kind inside an open
/// region is content too. Unbalanced quotes never fail: whatever was
/// accumulated at end of input is flushed.
///
/// An empty final field is dropped (`"1,2,"` yields two tokens) while empty
/// middle fields are kept.
pub fn tokenize(row_text: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut active_quote: Option<char> = None;

    for ch in row_text.chars() {
        match active_quote {
            None if ch == '\'' || ch == '"' => active_quote = Some(ch),
            Some(q) if ch == q => active_quote = None,
            None if ch == ',' => {
                fields.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }

    let last = current.trim();
    if !last.is_empty() {
        fields.push(last.to_string());
    }

    fields
}
