//! Lightweight HTML navigation for the source's server-rendered pages.
//!
//! Only what the fetchers need is supported: locating elements by tag and
//! `id`/`class`, reading attributes, collecting visible text and the
//! concatenated inline scripts. Nested elements of the same tag are matched
//! by depth, so a `<div>` query returns the whole subtree.

use std::sync::OnceLock;

use regex::{Captures, Regex};

static TAG: OnceLock<Regex> = OnceLock::new();
static ATTRIBUTE: OnceLock<Regex> = OnceLock::new();
static ENTITY: OnceLock<Regex> = OnceLock::new();
static SCRIPT: OnceLock<Regex> = OnceLock::new();

fn tag_pattern() -> &'static Regex {
    TAG.get_or_init(|| {
        Regex::new(r"(?s)<(/?)([A-Za-z][A-Za-z0-9]*)\b((?:[^>\x22']|\x22[^\x22]*\x22|'[^']*')*)>")
            .expect("tag pattern is valid")
    })
}

fn attribute_pattern() -> &'static Regex {
    ATTRIBUTE.get_or_init(|| {
        Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
            .expect("attribute pattern is valid")
    })
}

fn entity_pattern() -> &'static Regex {
    ENTITY.get_or_init(|| {
        Regex::new(r"&(#[0-9]+|#[xX][0-9A-Fa-f]+|[A-Za-z]+);").expect("entity pattern is valid")
    })
}

fn script_pattern() -> &'static Regex {
    SCRIPT.get_or_init(|| {
        Regex::new(r"(?is)<script\b[^>]*>(.*?)</script\s*>").expect("script pattern is valid")
    })
}

/// Element filter used by [`Element::find`] and [`Element::find_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<'s> {
    Any,
    Id(&'s str),
    Class(&'s str),
}

impl Selector<'_> {
    fn matches(self, attributes: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Id(id) => attribute(attributes, "id").is_some_and(|value| value == id),
            Self::Class(class) => attribute(attributes, "class")
                .is_some_and(|value| value.split_whitespace().any(|name| name == class)),
        }
    }
}

/// Parsed page owning the raw markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    html: String,
}

impl Document {
    pub fn parse(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn root(&self) -> Element<'_> {
        Element {
            attributes: "",
            inner: &self.html,
        }
    }

    pub fn find(&self, tag: &str, selector: Selector<'_>) -> Option<Element<'_>> {
        self.root().find(tag, selector)
    }

    /// Bodies of every inline `<script>` block, concatenated in document order.
    pub fn scripts(&self) -> String {
        script_pattern()
            .captures_iter(&self.html)
            .filter_map(|captures| captures.get(1))
            .map(|body| body.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Borrowed view of one element: its opening-tag attributes and inner markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    attributes: &'a str,
    inner: &'a str,
}

impl<'a> Element<'a> {
    pub fn attr(&self, name: &str) -> Option<String> {
        attribute(self.attributes, name).map(|value| decode_entities(&value))
    }

    /// First descendant with the given tag that satisfies `selector`.
    pub fn find(&self, tag: &str, selector: Selector<'_>) -> Option<Element<'a>> {
        self.descendants(tag, selector).next()
    }

    /// Every descendant with the given tag that satisfies `selector`, outermost first.
    pub fn find_all(&self, tag: &str, selector: Selector<'_>) -> Vec<Element<'a>> {
        self.descendants(tag, selector).collect()
    }

    /// Visible text fragments, trimmed, with empty fragments dropped.
    pub fn stripped_strings(&self) -> Vec<String> {
        tag_pattern()
            .split(self.inner)
            .map(|fragment| collapse_whitespace(&decode_entities(fragment)))
            .filter(|fragment| !fragment.is_empty())
            .collect()
    }

    pub fn text(&self) -> String {
        self.stripped_strings().join(" ")
    }

    fn descendants<'s>(
        &self,
        tag: &'s str,
        selector: Selector<'s>,
    ) -> impl Iterator<Item = Element<'a>> + 's
    where
        'a: 's,
    {
        let inner = self.inner;
        tag_pattern()
            .captures_iter(inner)
            .filter(move |captures| {
                captures.get(1).is_some_and(|slash| slash.as_str().is_empty())
                    && captures
                        .get(2)
                        .is_some_and(|name| name.as_str().eq_ignore_ascii_case(tag))
            })
            .filter_map(move |captures| {
                let attributes = captures.get(3).map_or("", |group| group.as_str());
                if !selector.matches(attributes) {
                    return None;
                }
                let open = captures.get(0)?;
                let body = &inner[open.end()..];
                let self_closing = attributes.trim_end().ends_with('/');
                let inner = if self_closing {
                    ""
                } else {
                    &body[..closing_offset(body, tag)]
                };
                Some(Element {
                    attributes: attributes.trim_end_matches('/'),
                    inner,
                })
            })
    }
}

/// Offset of the closing tag matching an already opened `tag`, or the end of input.
fn closing_offset(body: &str, tag: &str) -> usize {
    let mut depth = 0usize;
    for captures in tag_pattern().captures_iter(body) {
        let same_tag = captures
            .get(2)
            .is_some_and(|name| name.as_str().eq_ignore_ascii_case(tag));
        if !same_tag {
            continue;
        }
        let closing = captures.get(1).is_some_and(|slash| !slash.as_str().is_empty());
        let self_closing = captures
            .get(3)
            .is_some_and(|attrs| attrs.as_str().trim_end().ends_with('/'));
        match (closing, depth) {
            (true, 0) => return captures.get(0).map_or(body.len(), |open| open.start()),
            (true, _) => depth -= 1,
            (false, _) if !self_closing => depth += 1,
            _ => {}
        }
    }
    body.len()
}

fn attribute(attributes: &str, name: &str) -> Option<String> {
    attribute_pattern()
        .captures_iter(attributes)
        .find(|captures| {
            captures
                .get(1)
                .is_some_and(|key| key.as_str().eq_ignore_ascii_case(name))
        })
        .and_then(|captures| {
            captures
                .get(2)
                .or_else(|| captures.get(3))
                .or_else(|| captures.get(4))
                .map(|value| value.as_str().to_owned())
        })
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decodes the character references the source emits (numeric and common named ones).
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_owned();
    }
    entity_pattern()
        .replace_all(input, |captures: &Captures<'_>| {
            let reference = &captures[1];
            let decoded = match reference.strip_prefix('#') {
                Some(numeric) => {
                    let code = match numeric.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => numeric.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }
                None => match reference {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                },
            };
            decoded.map_or_else(|| captures[0].to_owned(), String::from)
        })
        .into_owned()
}
