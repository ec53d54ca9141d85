//! Readable text from an HTML document.
//!
//! This is a scraper, not a parser: it works on the raw markup with a few
//! regular expressions and a tag-depth scan. Malformed documents degrade to
//! "more text than wanted", never to an error.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Elements removed together with their content.
pub const STRIPPED_ELEMENTS: [&str; 7] = [
    "script", "style", "nav", "header", "footer", "iframe", "noscript",
];

/// Minimum length, in characters, of useful extracted text.
pub const MIN_TEXT_CHARS: usize = 10;

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"));

static STRIPPED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    STRIPPED_ELEMENTS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*?(?:/>|>.*?</{tag}\s*>)"))
                .expect("valid element regex")
        })
        .collect()
});

static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<([a-z][a-z0-9]*)\b([^>]*)>").expect("valid open tag regex")
});

static CLASS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)class\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid class regex")
});

static ID_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)id\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid id regex")
});

static ELEMENT_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(/?)([a-z][a-z0-9]*)\b[^>]*>").expect("valid element tag regex")
});

static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("valid entity regex")
});

/// Extract the readable text of `html`.
///
/// Drops [`STRIPPED_ELEMENTS`], narrows to the first main-content element
/// (`main`, `article`, `.content`, `.post`, `.article`, `#content`) or to
/// `body`, then strips tags, decodes entities and collapses whitespace.
pub fn extract_text(html: &str) -> String {
    let mut doc = COMMENT.replace_all(html, " ").into_owned();
    for element in STRIPPED.iter() {
        doc = element.replace_all(&doc, " ").into_owned();
    }

    let root = content_root(&doc)
        .or_else(|| element_inner(&doc, "body"))
        .unwrap_or(&doc);

    let text = ANY_TAG.replace_all(root, " ");
    let text = decode_entities(&text);
    collapse_whitespace(&text)
}

/// Collapse every run of whitespace into a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn content_root(doc: &str) -> Option<&str> {
    OPEN_TAG.captures_iter(doc).find_map(|caps| {
        let name = caps[1].to_ascii_lowercase();
        let attrs = caps.get(2).map_or("", |m| m.as_str());
        if !is_content_element(&name, attrs) {
            return None;
        }
        let open = caps.get(0)?;
        Some(inner_from(doc, &name, open.end()))
    })
}

fn is_content_element(name: &str, attrs: &str) -> bool {
    if name == "main" || name == "article" {
        return true;
    }
    let has_class = attr_value(&CLASS_ATTR, attrs).is_some_and(|classes| {
        classes
            .split_whitespace()
            .any(|c| c == "content" || c == "post" || c == "article")
    });
    has_class || attr_value(&ID_ATTR, attrs).is_some_and(|id| id == "content")
}

fn attr_value<'a>(pattern: &Regex, attrs: &'a str) -> Option<&'a str> {
    let caps = pattern.captures(attrs)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str())
}

/// Inner markup of the first `name` element, if any.
fn element_inner<'a>(doc: &'a str, name: &str) -> Option<&'a str> {
    let open = OPEN_TAG
        .captures_iter(doc)
        .find(|caps| caps[1].eq_ignore_ascii_case(name))?
        .get(0)?;
    Some(inner_from(doc, name, open.end()))
}

/// Markup from `start` up to the tag closing an element `name` opened just
/// before `start`, or to the end of the document if it is never closed.
fn inner_from<'a>(doc: &'a str, name: &str, start: usize) -> &'a str {
    let rest = &doc[start..];

    let mut depth = 1usize;
    for caps in ELEMENT_TAG.captures_iter(rest) {
        if !caps[2].eq_ignore_ascii_case(name) {
            continue;
        }
        let Some(tag) = caps.get(0) else { continue };
        if !caps[1].is_empty() {
            depth -= 1;
            if depth == 0 {
                return &rest[..tag.start()];
            }
        } else if !tag.as_str().ends_with("/>") {
            depth += 1;
        }
    }
    rest
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures<'_>| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(entity)
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "laquo" => '\u{00ab}',
        "raquo" => '\u{00bb}',
        "copy" => '\u{00a9}',
        _ => return None,
    })
}
