use std::borrow::Cow;

/// How [`NodeRef::text`](crate::NodeRef::text) should present text content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextMode {
    Raw,
    Normalized,
}

/// Trim, collapse whitespace runs to a single space and lowercase.
pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for word in raw.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.extend(word.chars().flat_map(char::to_lowercase));
    }
    out
}

pub(crate) fn present(raw: &str, mode: TextMode) -> Cow<'_, str> {
    match mode {
        TextMode::Raw => Cow::Borrowed(raw),
        TextMode::Normalized => Cow::Owned(normalize_text(raw)),
    }
}
