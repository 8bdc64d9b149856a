//! Finds, reads and rewrites diagram macros inside Confluence storage-format text.
//!
//! Storage format is XHTML that rarely declares its `ac:` namespace, so the host document is
//! scanned as text rather than parsed as XML. The scanner understands comments, CDATA
//! sections, processing instructions and quoted attribute values; everything else is treated
//! as opaque text, which also keeps edits byte-exact outside the spliced range.

use crate::error::{Error, Result};
use crate::xml::escape_text;
use serde::Serialize;
use std::borrow::Cow;
use std::ops::Range;

/// Kind name of the draw.io macro.
pub const DEFAULT_MACRO_KIND: &str = "drawio";

/// Parameter holding the base64 transport payload.
pub const PAYLOAD_PARAMETER: &str = "diagramData";
pub const NAME_PARAMETER: &str = "diagramName";

const MACRO_ELEMENT: &str = "structured-macro";
const PARAMETER_ELEMENT: &str = "parameter";

/// Addresses one macro in a host document by `(macro id, kind name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroQuery {
    pub macro_id: String,
    pub kind_name: String,
}

impl MacroQuery {
    pub fn new(macro_id: impl Into<String>) -> Self {
        Self {
            macro_id: macro_id.into(),
            kind_name: DEFAULT_MACRO_KIND.to_string(),
        }
    }

    pub fn with_kind(mut self, kind_name: impl Into<String>) -> Self {
        self.kind_name = kind_name.into();
        self
    }
}

/// Where the payload of a located macro lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadSlot {
    /// Text between the parameter's start and end tags (possibly empty).
    Content(Range<usize>),
    /// A self-closing parameter tag; filling it rewrites the tag into start/end form.
    SelfClosing { tag: Range<usize>, element: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedMacro {
    pub macro_id: String,
    /// Id of the match strategy that found the macro.
    pub strategy: &'static str,
    /// Byte range of the whole macro block, start tag through end tag.
    pub block: Range<usize>,
    pub diagram_name: Option<String>,
    /// `None` when the macro has no payload parameter at its own level.
    pub payload: Option<PayloadSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroSummary {
    pub macro_id: String,
    pub diagram_name: Option<String>,
    pub has_payload: bool,
}

/// Matches a qualified element/attribute name against the local name it should carry.
pub type NameMatcherFn = fn(qualified: &str, local: &str) -> bool;

#[derive(Debug, Clone, Copy)]
pub struct MatchStrategy {
    pub id: &'static str,
    pub matches: NameMatcherFn,
}

/// Match strategies in priority order. The first strategy that finds the macro anywhere in the
/// document wins, so a well-formed `ac:` macro is never shadowed by a looser match elsewhere.
pub const STRATEGIES: &[MatchStrategy] = &[
    MatchStrategy {
        id: "ac-prefixed",
        matches: match_ac_prefixed,
    },
    MatchStrategy {
        id: "unprefixed",
        matches: match_unprefixed,
    },
    MatchStrategy {
        id: "any-prefix",
        matches: match_any_prefix,
    },
];

pub fn match_ac_prefixed(qualified: &str, local: &str) -> bool {
    qualified
        .strip_prefix("ac:")
        .is_some_and(|rest| rest == local)
}

pub fn match_unprefixed(qualified: &str, local: &str) -> bool {
    qualified == local
}

pub fn match_any_prefix(qualified: &str, local: &str) -> bool {
    qualified
        .split_once(':')
        .is_some_and(|(prefix, rest)| !prefix.is_empty() && rest == local)
}

/// Locates the macro addressed by `query`, trying every strategy in order.
pub fn locate(doc: &str, query: &MacroQuery) -> Result<LocatedMacro> {
    let tags = scan_tags(doc);
    for strategy in STRATEGIES {
        if let Some(found) = locate_in(doc, &tags, query, strategy)? {
            tracing::debug!(
                macro_id = %query.macro_id,
                strategy = strategy.id,
                start = found.block.start,
                end = found.block.end,
                "located macro"
            );
            return Ok(found);
        }
    }
    Err(Error::MacroNotFound {
        macro_id: query.macro_id.clone(),
        kind: query.kind_name.clone(),
    })
}

/// Locates the macro with a single strategy. `Ok(None)` means this strategy found nothing.
pub fn locate_with(
    doc: &str,
    query: &MacroQuery,
    strategy: &MatchStrategy,
) -> Result<Option<LocatedMacro>> {
    locate_in(doc, &scan_tags(doc), query, strategy)
}

/// Returns the trimmed payload text of the addressed macro, entity-unescaped and with any
/// CDATA wrapper removed.
pub fn extract_payload(doc: &str, query: &MacroQuery) -> Result<String> {
    locate(doc, query)?.payload_text(doc)
}

/// Returns a copy of `doc` in which only the payload text of the addressed macro changed.
pub fn replace_payload(doc: &str, query: &MacroQuery, payload: &str) -> Result<String> {
    locate(doc, query)?.splice_payload(doc, payload)
}

impl LocatedMacro {
    /// Payload text of this macro in `doc`, the document it was located in.
    pub fn payload_text(&self, doc: &str) -> Result<String> {
        let payload = match &self.payload {
            Some(PayloadSlot::Content(range)) => parameter_text(&doc[range.clone()]),
            Some(PayloadSlot::SelfClosing { .. }) | None => String::new(),
        };
        if payload.is_empty() {
            return Err(self.payload_missing());
        }
        Ok(payload)
    }

    /// Copy of `doc`, the document this macro was located in, with only the payload text
    /// replaced. A self-closing payload parameter is expanded in place.
    pub fn splice_payload(&self, doc: &str, payload: &str) -> Result<String> {
        let Some(slot) = &self.payload else {
            return Err(self.payload_missing());
        };

        let payload = escape_text(payload);
        let mut out = String::with_capacity(doc.len() + payload.len());
        match slot {
            PayloadSlot::Content(range) => {
                out.push_str(&doc[..range.start]);
                out.push_str(&payload);
                out.push_str(&doc[range.end..]);
            }
            PayloadSlot::SelfClosing { tag, element } => {
                let open = doc[tag.clone()]
                    .trim_end_matches('>')
                    .trim_end_matches('/')
                    .trim_end();
                out.push_str(&doc[..tag.start]);
                out.push_str(open);
                out.push('>');
                out.push_str(&payload);
                out.push_str("</");
                out.push_str(element);
                out.push('>');
                out.push_str(&doc[tag.end..]);
            }
        }
        Ok(out)
    }

    fn payload_missing(&self) -> Error {
        Error::PayloadMissing {
            macro_id: self.macro_id.clone(),
        }
    }
}

/// Every macro of `kind_name` that carries a macro id, in document order.
pub fn list_macros(doc: &str, kind_name: &str) -> Vec<MacroSummary> {
    let tags = scan_tags(doc);
    for strategy in STRATEGIES {
        let mut found = Vec::new();
        for (idx, tag) in tags.iter().enumerate() {
            if !is_macro_start(tag, strategy, kind_name) {
                continue;
            }
            let Some(macro_id) = tag.attribute(strategy, "macro-id") else {
                continue;
            };
            match read_macro(doc, &tags, idx, strategy, &macro_id) {
                Ok(located) => found.push(MacroSummary {
                    has_payload: matches!(
                        &located.payload,
                        Some(PayloadSlot::Content(range)) if !parameter_text(&doc[range.clone()]).is_empty()
                    ),
                    macro_id: located.macro_id,
                    diagram_name: located.diagram_name,
                }),
                Err(err) => {
                    tracing::warn!(macro_id = %macro_id, error = %err, "skipping unreadable macro");
                }
            }
        }
        if !found.is_empty() {
            tracing::debug!(strategy = strategy.id, count = found.len(), "listed macros");
            return found;
        }
    }
    Vec::new()
}

fn locate_in(
    doc: &str,
    tags: &[Tag<'_>],
    query: &MacroQuery,
    strategy: &MatchStrategy,
) -> Result<Option<LocatedMacro>> {
    for (idx, tag) in tags.iter().enumerate() {
        if !is_macro_start(tag, strategy, &query.kind_name) {
            continue;
        }
        if tag.attribute(strategy, "macro-id").as_deref() != Some(query.macro_id.as_str()) {
            continue;
        }
        return read_macro(doc, tags, idx, strategy, &query.macro_id).map(Some);
    }
    Ok(None)
}

fn is_macro_start(tag: &Tag<'_>, strategy: &MatchStrategy, kind_name: &str) -> bool {
    tag.kind != TagKind::End
        && (strategy.matches)(tag.name, MACRO_ELEMENT)
        && tag.attribute(strategy, "name").as_deref() == Some(kind_name)
}

/// Reads the macro whose start tag is `tags[start]`: its extent and its own-level parameters.
/// Parameters of nested macros are skipped.
fn read_macro(
    doc: &str,
    tags: &[Tag<'_>],
    start: usize,
    strategy: &MatchStrategy,
    macro_id: &str,
) -> Result<LocatedMacro> {
    let open = &tags[start];
    let mut located = LocatedMacro {
        macro_id: macro_id.to_string(),
        strategy: strategy.id,
        block: open.span.clone(),
        diagram_name: None,
        payload: None,
    };
    if open.kind == TagKind::Empty {
        return Ok(located);
    }

    let unclosed = |what: &str| Error::MalformedDocument {
        message: format!("{what} in macro `{macro_id}` has no end tag"),
    };

    let mut depth = 0usize;
    let mut i = start + 1;
    while i < tags.len() {
        let tag = &tags[i];
        if local_name(tag.name) == MACRO_ELEMENT {
            match tag.kind {
                TagKind::Start => depth += 1,
                TagKind::End if depth == 0 => {
                    located.block.end = tag.span.end;
                    return Ok(located);
                }
                TagKind::End => depth -= 1,
                TagKind::Empty => {}
            }
            i += 1;
            continue;
        }

        let own_parameter = depth == 0
            && tag.kind != TagKind::End
            && (strategy.matches)(tag.name, PARAMETER_ELEMENT);
        if !own_parameter {
            i += 1;
            continue;
        }

        let param_name = tag.attribute(strategy, "name");
        let (content, next) = if tag.kind == TagKind::Empty {
            (None, i + 1)
        } else {
            let close = tags[i + 1..]
                .iter()
                .position(|t| t.kind == TagKind::End && t.name == tag.name)
                .map(|offset| i + 1 + offset)
                .ok_or_else(|| unclosed("parameter"))?;
            (Some(tag.span.end..tags[close].span.start), close + 1)
        };

        match param_name.as_deref() {
            Some(PAYLOAD_PARAMETER) if located.payload.is_none() => {
                located.payload = Some(match content {
                    Some(range) => PayloadSlot::Content(range),
                    None => PayloadSlot::SelfClosing {
                        tag: tag.span.clone(),
                        element: tag.name.to_string(),
                    },
                });
            }
            Some(NAME_PARAMETER) if located.diagram_name.is_none() => {
                located.diagram_name = content.map(|range| parameter_text(&doc[range]));
            }
            _ => {}
        }
        i = next;
    }

    Err(unclosed("structured-macro start tag"))
}

/// Parameter text as its value: trimmed, CDATA unwrapped, entities decoded.
fn parameter_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(inner) = trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
    {
        return inner.trim().to_string();
    }
    htmlize::unescape(trimmed).trim().to_string()
}

fn local_name(qualified: &str) -> &str {
    qualified
        .split_once(':')
        .map_or(qualified, |(_, local)| local)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Start,
    End,
    Empty,
}

#[derive(Debug, Clone)]
struct Tag<'d> {
    kind: TagKind,
    name: &'d str,
    /// Raw text between the name and the closing `>` (or `/>`).
    attrs: &'d str,
    span: Range<usize>,
}

impl Tag<'_> {
    /// First attribute whose name the strategy accepts for `local`, entity-decoded.
    fn attribute(&self, strategy: &MatchStrategy, local: &str) -> Option<Cow<'_, str>> {
        attributes(self.attrs)
            .into_iter()
            .find(|(name, _)| (strategy.matches)(name, local))
            .map(|(_, value)| htmlize::unescape(value))
    }
}

/// Tokenizes every start, end and empty-element tag of `doc`. Comments, CDATA sections,
/// processing instructions and declarations are skipped; an unterminated one swallows the
/// rest of the document.
fn scan_tags(doc: &str) -> Vec<Tag<'_>> {
    let bytes = doc.as_bytes();
    let mut tags = Vec::new();
    let mut i = 0usize;

    while let Some(offset) = doc[i..].find('<') {
        let start = i + offset;
        let rest = &doc[start..];
        if rest.starts_with("<!--") {
            i = skip_past(doc, start + 4, "-->");
            continue;
        }
        if rest.starts_with("<![CDATA[") {
            i = skip_past(doc, start + 9, "]]>");
            continue;
        }
        if rest.starts_with("<?") {
            i = skip_past(doc, start + 2, "?>");
            continue;
        }
        if rest.starts_with("<!") {
            i = skip_past(doc, start + 2, ">");
            continue;
        }

        let is_end = rest.starts_with("</");
        let name_start = start + if is_end { 2 } else { 1 };
        let name_len = doc[name_start..]
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(doc.len() - name_start);
        let name_end = name_start + name_len;
        if name_len == 0 {
            // A stray `<` in text.
            i = start + 1;
            continue;
        }
        let Some(close) = find_tag_close(bytes, name_end) else {
            break;
        };

        let self_closing = !is_end && close > name_end && bytes[close - 1] == b'/';
        let attrs_end = if self_closing { close - 1 } else { close };
        tags.push(Tag {
            kind: if is_end {
                TagKind::End
            } else if self_closing {
                TagKind::Empty
            } else {
                TagKind::Start
            },
            name: &doc[name_start..name_end],
            attrs: &doc[name_end..attrs_end],
            span: start..close + 1,
        });
        i = close + 1;
    }
    tags
}

fn skip_past(doc: &str, from: usize, terminator: &str) -> usize {
    doc.get(from..)
        .and_then(|rest| rest.find(terminator))
        .map_or(doc.len(), |pos| from + pos + terminator.len())
}

/// Index of the `>` ending the tag whose name ends at `from`, honoring quoted values.
fn find_tag_close(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(i),
            None => {}
        }
    }
    None
}

/// Splits raw tag attribute text into `(name, raw value)` pairs.
fn attributes(src: &str) -> Vec<(&str, &str)> {
    let bytes = src.as_bytes();
    let len = bytes.len();
    let mut out = Vec::new();
    let mut i = 0usize;

    loop {
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len {
            break;
        }
        let name_start = i;
        while i < len && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' && bytes[i] != b'/'
        {
            i += 1;
        }
        let name = &src[name_start..i];
        if name.is_empty() {
            i += 1;
            continue;
        }
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = "";
        if i < len && bytes[i] == b'=' {
            i += 1;
            while i < len && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < len && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                let value_start = i + 1;
                i = value_start;
                while i < len && bytes[i] != quote {
                    i += 1;
                }
                value = &src[value_start..i];
                i = (i + 1).min(len);
            } else {
                let value_start = i;
                while i < len && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                value = &src[value_start..i];
            }
        }
        out.push((name, value));
    }
    out
}
