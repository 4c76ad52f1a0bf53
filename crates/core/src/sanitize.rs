/// Collapses runs of `_` and runs of whitespace, then trims both from the ends.
///
/// Whitespace runs become a single ASCII space. Dashes are left alone since they are
/// part of the date format.
pub fn cleanup_name(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev: Option<char> = None;

    for ch in value.chars() {
        let ch = if ch.is_whitespace() { ' ' } else { ch };
        if is_collapse_separator(ch) && prev == Some(ch) {
            continue;
        }
        prev = Some(ch);
        out.push(ch);
    }

    out.trim_matches(|c: char| c == '_' || c.is_whitespace())
        .to_string()
}

fn is_collapse_separator(ch: char) -> bool {
    matches!(ch, '_' | ' ')
}
