//! Pure Jade escaping utilities.
//!
//! Jade passes text through to the generated HTML untouched and interpolates
//! `#{...}`, `!{...}` and `#[...]`, so text taken from a parsed DOM must have
//! markup characters re-escaped and interpolation openers neutralized.

/// Escape text for use as Jade plain text (piped, inline or block text).
///
/// # Examples
///
/// ```
/// use scorm2lfa::jade::escape_text;
///
/// assert_eq!(escape_text("a < b & c"), "a &lt; b &amp; c");
/// assert_eq!(escape_text("#{user}"), "\\#{user}");
/// ```
pub fn escape_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 10);
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '#' | '!' if matches!(chars.peek(), Some('{') | Some('[')) => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }

    result
}

/// Escape raw text (`script`, `style`) where only interpolation is special.
pub fn escape_interpolation(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if matches!(c, '#' | '!') && matches!(chars.peek(), Some('{') | Some('[')) {
            result.push('\\');
        }
        result.push(c);
    }

    result
}

/// Quote an attribute value as a JavaScript string literal.
///
/// # Examples
///
/// ```
/// use scorm2lfa::jade::quote_attribute;
///
/// assert_eq!(quote_attribute("a.png"), "\"a.png\"");
/// assert_eq!(quote_attribute("say \"hi\""), "\"say \\\"hi\\\"\"");
/// ```
pub fn quote_attribute(value: &str) -> String {
    let mut result = String::with_capacity(value.len() + 2);
    result.push('"');
    for c in value.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\u{2028}' => result.push_str("\\u2028"),
            '\u{2029}' => result.push_str("\\u2029"),
            _ => result.push(c),
        }
    }
    result.push('"');
    result
}

/// Whether an attribute name can be written bare inside `(...)`.
pub fn is_plain_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

/// Whether a value can use the `#id` / `.class` shorthand.
pub fn is_shorthand_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Collapse runs of whitespace into single spaces.
///
/// Leading and trailing whitespace are kept as one space each so adjacent
/// inline content stays separated.
pub fn collapse_whitespace(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return if text.is_empty() {
            String::new()
        } else {
            " ".to_string()
        };
    }

    let mut out = String::with_capacity(text.len());
    if text.starts_with(char::is_whitespace) {
        out.push(' ');
    }
    out.push_str(&words.join(" "));
    if text.ends_with(char::is_whitespace) {
        out.push(' ');
    }
    out
}
