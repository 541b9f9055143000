//! Allow-list HTML sanitizer for inline rich text.
//!
//! Every tag outside [`ALLOWED_TAGS`] is removed: its text is kept, except
//! for elements in [`DROPPED_WITH_CONTENT`] which disappear entirely.
//! Attributes outside [`ALLOWED_ATTRS`] are removed and `href` must use a
//! safe scheme. Output is canonical (lower-case names, double-quoted
//! attributes, escaped text), so running it twice is a no-op.

const ALLOWED_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "span", "div", "ul", "ol", "li", "b", "strong", "i",
    "em", "u", "a", "br",
];

const VOID_TAGS: &[&str] = &["br"];

const ALLOWED_ATTRS: &[&str] = &["href", "target", "rel", "class"];

const DROPPED_WITH_CONTENT: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template", "textarea", "select",
    "svg", "math", "title", "head",
];

const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

struct Tag<'a> {
    name: String,
    closing: bool,
    attrs: Vec<(String, Option<&'a str>)>,
}

enum Markup<'a> {
    Tag(Tag<'a>, usize),
    /// Comment, doctype or processing instruction; dropped.
    Ignored(usize),
    /// A `<` that does not start markup.
    Text,
}

pub(crate) fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(lt) = rest.find('<') {
        push_text(&mut out, &rest[..lt]);
        let markup = &rest[lt..];

        match parse_markup(markup) {
            Markup::Text => {
                out.push_str("&lt;");
                rest = &markup[1..];
            }
            Markup::Ignored(consumed) => rest = &markup[consumed..],
            Markup::Tag(tag, consumed) => {
                rest = &markup[consumed..];

                if !tag.closing && DROPPED_WITH_CONTENT.contains(&tag.name.as_str()) {
                    rest = skip_past_closing(rest, &tag.name);
                    continue;
                }

                if ALLOWED_TAGS.contains(&tag.name.as_str()) {
                    push_tag(&mut out, &tag);
                }
            }
        }
    }

    push_text(&mut out, rest);
    out
}

fn parse_markup(s: &str) -> Markup<'_> {
    let bytes = s.as_bytes();
    debug_assert_eq!(bytes.first(), Some(&b'<'));

    match bytes.get(1) {
        Some(b'!') if s.starts_with("<!--") => {
            let end = s[4..].find("-->").map(|i| 4 + i + 3).unwrap_or(s.len());
            Markup::Ignored(end)
        }
        Some(b'!') | Some(b'?') => Markup::Ignored(s.find('>').map(|i| i + 1).unwrap_or(s.len())),
        Some(b'/') if bytes.get(2).is_some_and(|b| b.is_ascii_alphabetic()) => {
            let (name, after_name) = read_name(s, 2);
            // Anything after the name of a closing tag is junk.
            let end = s[after_name..]
                .find('>')
                .map(|i| after_name + i + 1)
                .unwrap_or(s.len());
            Markup::Tag(
                Tag {
                    name,
                    closing: true,
                    attrs: vec![],
                },
                end,
            )
        }
        Some(b) if b.is_ascii_alphabetic() => {
            let (name, after_name) = read_name(s, 1);
            match read_attrs(s, after_name) {
                Some((attrs, end)) => Markup::Tag(
                    Tag {
                        name,
                        closing: false,
                        attrs,
                    },
                    end,
                ),
                // Unterminated tag: drop the remainder rather than emit it.
                None => Markup::Ignored(s.len()),
            }
        }
        _ => Markup::Text,
    }
}

fn is_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'>' || b == b'/'
}

fn read_name(s: &str, start: usize) -> (String, usize) {
    let bytes = s.as_bytes();
    let mut i = start;
    while i < bytes.len() && !is_delimiter(bytes[i]) {
        i += 1;
    }
    (s[start..i].to_ascii_lowercase(), i)
}

/// Parses attributes up to the closing `>`. Returns `None` if the tag never closes.
fn read_attrs(s: &str, start: usize) -> Option<(Vec<(String, Option<&str>)>, usize)> {
    let bytes = s.as_bytes();
    let mut attrs = Vec::new();
    let mut i = start;

    loop {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        if bytes[i] == b'>' {
            return Some((attrs, i + 1));
        }

        let name_start = i;
        while i < bytes.len() && !is_delimiter(bytes[i]) && bytes[i] != b'=' {
            i += 1;
        }
        if i == name_start {
            // Stray `=`.
            i += 1;
            continue;
        }
        let name = s[name_start..i].to_ascii_lowercase();

        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= bytes.len() || bytes[j] != b'=' {
            attrs.push((name, None));
            continue;
        }

        j += 1;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= bytes.len() {
            return None;
        }

        match bytes[j] {
            quote @ (b'"' | b'\'') => {
                let close = s[j + 1..].find(quote as char)? + j + 1;
                attrs.push((name, Some(&s[j + 1..close])));
                i = close + 1;
            }
            _ => {
                let value_start = j;
                while j < bytes.len() && !bytes[j].is_ascii_whitespace() && bytes[j] != b'>' {
                    j += 1;
                }
                attrs.push((name, Some(&s[value_start..j])));
                i = j;
            }
        }
    }
}

fn skip_past_closing<'a>(rest: &'a str, name: &str) -> &'a str {
    let needle = format!("</{name}");
    // ASCII lower-casing keeps byte offsets stable.
    let lowered = rest.to_ascii_lowercase();
    let Some(pos) = lowered.find(&needle) else {
        return "";
    };
    let after = pos + needle.len();
    match rest[after..].find('>') {
        Some(i) => &rest[after + i + 1..],
        None => "",
    }
}

fn push_tag(out: &mut String, tag: &Tag<'_>) {
    let is_void = VOID_TAGS.contains(&tag.name.as_str());

    if tag.closing {
        if !is_void {
            out.push_str("</");
            out.push_str(&tag.name);
            out.push('>');
        }
        return;
    }

    out.push('<');
    out.push_str(&tag.name);

    let mut seen: Vec<&str> = Vec::new();
    for (name, value) in &tag.attrs {
        let Some(allowed) = ALLOWED_ATTRS.iter().find(|a| **a == name.as_str()) else {
            continue;
        };
        if seen.contains(allowed) {
            continue;
        }

        let escaped = escape_attr(value.unwrap_or(""));
        if *allowed == "href" && !is_safe_href(&escaped) {
            continue;
        }

        seen.push(*allowed);
        out.push(' ');
        out.push_str(allowed);
        out.push_str("=\"");
        out.push_str(&escaped);
        out.push('"');
    }

    out.push('>');
}

/// Decided on the escaped value so a second pass reaches the same verdict.
fn is_safe_href(escaped: &str) -> bool {
    let compact: String = escaped
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();

    if compact.is_empty() {
        return false;
    }

    for (i, c) in compact.char_indices() {
        match c {
            '/' | '?' | '#' => return true,
            // An entity before any scheme separator can hide a `:`.
            '&' => return false,
            ':' => {
                let scheme = compact[..i].to_ascii_lowercase();
                return SAFE_SCHEMES.contains(&scheme.as_str());
            }
            _ => {}
        }
    }

    true
}

#[derive(Clone, Copy)]
enum RefKind {
    Hex,
    Decimal,
    Named,
}

impl RefKind {
    fn accepts(self, b: u8) -> bool {
        match self {
            RefKind::Hex => b.is_ascii_hexdigit(),
            RefKind::Decimal => b.is_ascii_digit(),
            RefKind::Named => b.is_ascii_alphanumeric(),
        }
    }
}

/// Length of a well-formed character reference at the start of `s`, if any.
fn entity_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'&') {
        return None;
    }

    let (body_start, kind) = match (bytes.get(1), bytes.get(2)) {
        (Some(b'#'), Some(b'x' | b'X')) => (3, RefKind::Hex),
        (Some(b'#'), _) => (2, RefKind::Decimal),
        (Some(b), _) if b.is_ascii_alphabetic() => (1, RefKind::Named),
        _ => return None,
    };

    let mut i = body_start;
    while i < bytes.len() && i - body_start < 32 && kind.accepts(bytes[i]) {
        i += 1;
    }
    if i > body_start && bytes.get(i) == Some(&b';') {
        Some(i + 1)
    } else {
        None
    }
}

fn push_escaped(out: &mut String, s: &str, escape_quotes: bool) {
    let mut i = 0;
    while let Some(c) = s[i..].chars().next() {
        match c {
            '&' => match entity_len(&s[i..]) {
                Some(len) => {
                    out.push_str(&s[i..i + len]);
                    i += len;
                    continue;
                }
                None => out.push_str("&amp;"),
            },
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if escape_quotes => out.push_str("&quot;"),
            '\0' => {}
            c => out.push(c),
        }
        i += c.len_utf8();
    }
}

fn push_text(out: &mut String, text: &str) {
    push_escaped(out, text, false);
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    push_escaped(&mut out, value, true);
    out
}
