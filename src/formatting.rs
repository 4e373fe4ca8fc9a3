/*!
 * Markup helpers shared by the codecs.
 *
 * The internal text representation uses a minimal HTML-like subset:
 * `<i>`, `<b>`, `<u>` (plus `<font ...>` passthrough) and `\n` line breaks.
 * Codecs translate their native styling to and from this subset.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Any HTML-like tag
static HTML_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[a-zA-Z][^<>]*>").unwrap());

/// Upper-case basic style tags
static UPPER_STYLE_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(/?)([IBU])>").unwrap());

/// Basic style tags, already lower-cased
static STYLE_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(/?)([ibu])>").unwrap());

/// `<font ...>` passthrough tags
static FONT_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</?font\b[^>]*>").unwrap());

/// SSA/ASS override block ({\an8}, {\pos(1,2)}, ...)
static ASS_OVERRIDE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\\[^}]*\}").unwrap());

/// Basic SSA/ASS style toggles
static ASS_STYLE_TOGGLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\\([ibu])([01]?)\}").unwrap());

/// Remove every HTML-like tag, keeping the text
pub fn remove_html_tags(text: &str) -> String {
    HTML_TAG_REGEX.replace_all(text, "").into_owned()
}

/// Lower-case `<I>`/`</B>`-style tags
pub fn normalize_style_tags(text: &str) -> String {
    UPPER_STYLE_TAG_REGEX
        .replace_all(text, |caps: &regex::Captures| {
            format!("<{}{}>", &caps[1], caps[2].to_ascii_lowercase())
        })
        .into_owned()
}

/// Number of non-overlapping occurrences of `tag`
pub fn count_tag(text: &str, tag: &str) -> usize {
    if tag.is_empty() {
        return 0;
    }
    text.matches(tag).count()
}

/// Map `{\i1}`/`{\i0}`-style toggles to markup; other override blocks are kept
pub fn ass_toggles_to_markup(text: &str) -> String {
    ASS_STYLE_TOGGLE_REGEX
        .replace_all(text, |caps: &regex::Captures| {
            // `{\i}` resets to the style default
            let closing = if &caps[2] == "1" { "" } else { "/" };
            format!("<{}{}>", closing, &caps[1])
        })
        .into_owned()
}

/// Map markup to `{\i1}`/`{\i0}`-style toggles
pub fn markup_to_ass_toggles(text: &str) -> String {
    let mut result = normalize_style_tags(text);
    for tag in ["i", "b", "u"] {
        result = result
            .replace(&format!("<{}>", tag), &format!("{{\\{}1}}", tag))
            .replace(&format!("</{}>", tag), &format!("{{\\{}0}}", tag));
    }
    result
}

/// Strip SSA/ASS override blocks
pub fn remove_ass_override_tags(text: &str) -> String {
    ASS_OVERRIDE_REGEX.replace_all(text, "").into_owned()
}

/// Close any `<i>`, `<b>`, `<u>` left open, innermost first
pub fn close_open_tags(text: &str) -> String {
    let mut result = text.to_string();
    for tag in ["u", "b", "i"] {
        let opened = count_tag(&result, &format!("<{}>", tag));
        let closed = count_tag(&result, &format!("</{}>", tag));
        for _ in closed..opened {
            result.push_str(&format!("</{}>", tag));
        }
    }
    result
}

/// Escape text for XML content
pub fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render markup as well-formed XML content. Style tags go through `open`
/// and `close`, line breaks become `<br/>`, and closers without an opener are
/// dropped.
pub fn markup_to_xml<O, C>(text: &str, open: O, close: C) -> String
where
    O: Fn(&str) -> String,
    C: Fn(&str) -> String,
{
    let text = normalize_style_tags(&FONT_TAG_REGEX.replace_all(text, ""));
    let mut out = String::with_capacity(text.len());
    let mut stack: Vec<String> = Vec::new();
    let mut last = 0;

    let push_text = |out: &mut String, segment: &str| {
        out.push_str(&xml_escape(segment).replace('\n', "<br/>"));
    };

    for caps in STYLE_TAG_REGEX.captures_iter(&text) {
        let Some(whole) = caps.get(0) else { continue };
        push_text(&mut out, &text[last..whole.start()]);
        last = whole.end();
        let tag = &caps[2];
        if caps[1].is_empty() {
            out.push_str(&open(tag));
            stack.push(tag.to_string());
        } else if let Some(pos) = stack.iter().rposition(|t| t == tag) {
            while stack.len() > pos {
                if let Some(t) = stack.pop() {
                    out.push_str(&close(&t));
                }
            }
        }
    }
    push_text(&mut out, &text[last..]);
    while let Some(t) = stack.pop() {
        out.push_str(&close(&t));
    }
    out
}
