//! Namespace clean-up applied to envelope XML before tree parsing.
//!
//! Payloads written by different draw.io builds disagree on namespaces: some declare a default
//! namespace, some use an `mx:` prefix, and some use a prefix without declaring it at all (which
//! a conforming parser rejects). Structural parsing matches by local name, so all this pass has
//! to do is make the text acceptable to the parser.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::ops::Range;

pub(crate) const MX_PREFIX: &str = "mx";
const PLACEHOLDER_NAMESPACE: &str = "urn:drawmacro:undeclared:";

fn start_tag_regex() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[A-Za-z_][\w.\-:]*").expect("valid regex"))
}

/// One attribute: leading space, qualified name, `=` with its padding, quoted value. Matching
/// left to right consumes each value whole, so nothing inside a value is read as a name.
fn attribute_regex() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(\s)([A-Za-z_][\w.\-:]*)(\s*=\s*)("[^"]*"|'[^']*')"#).expect("valid regex")
    })
}

fn element_prefix_regex() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"</?([A-Za-z_][\w.\-]*):[A-Za-z_]").expect("valid regex"))
}

/// Byte ranges of every start tag, `<` through `>`.
fn start_tags(text: &str) -> Vec<Range<usize>> {
    let mut tags = Vec::new();
    let mut from = 0;
    while let Some(open) = start_tag_regex().find_at(text, from) {
        let end = start_tag_end(text, open.end());
        tags.push(open.start()..end);
        from = end;
    }
    tags
}

fn attribute_names(tag: &str) -> impl Iterator<Item = &str> {
    attribute_regex()
        .captures_iter(tag)
        .filter_map(|c| c.get(2))
        .map(|m| m.as_str())
}

/// Rewrites `xmlns="URI"` to `xmlns:mx="URI"` and declares every used-but-undeclared prefix on
/// the root element. Only attribute names are inspected, never attribute values. Returns the
/// input unchanged when nothing needs fixing.
pub(crate) fn normalize(xml: &str) -> Cow<'_, str> {
    let mut text = Cow::Borrowed(xml);

    let tags = start_tags(&text);
    let has_default = tags
        .iter()
        .any(|tag| attribute_names(&text[tag.clone()]).any(|name| name == "xmlns"));
    if has_default {
        let mx_declared = tags.iter().any(|tag| {
            attribute_names(&text[tag.clone()])
                .any(|name| name.strip_prefix("xmlns:") == Some(MX_PREFIX))
        });
        let mut rewritten = String::with_capacity(text.len() + 8);
        let mut last = 0;
        for tag in &tags {
            rewritten.push_str(&text[last..tag.start]);
            let tag_text =
                attribute_regex().replace_all(&text[tag.clone()], |caps: &Captures<'_>| {
                    if &caps[2] != "xmlns" {
                        caps[0].to_string()
                    } else if mx_declared {
                        // The prefixed form is already declared; drop the default one.
                        String::new()
                    } else {
                        format!("{}xmlns:{MX_PREFIX}{}{}", &caps[1], &caps[3], &caps[4])
                    }
                });
            rewritten.push_str(&tag_text);
            last = tag.end;
        }
        rewritten.push_str(&text[last..]);
        text = Cow::Owned(rewritten);
    }

    let tags = start_tags(&text);
    let Some(root) = tags.first().cloned() else {
        return text;
    };
    let declared: BTreeSet<&str> = attribute_names(&text[root.clone()])
        .filter_map(|name| name.strip_prefix("xmlns:"))
        .collect();

    let mut used: BTreeSet<&str> = BTreeSet::new();
    for caps in element_prefix_regex().captures_iter(&text) {
        if let Some(prefix) = caps.get(1) {
            used.insert(prefix.as_str());
        }
    }
    for tag in &tags {
        for name in attribute_names(&text[tag.clone()]) {
            if let Some((prefix, _)) = name.split_once(':') {
                used.insert(prefix);
            }
        }
    }
    let missing: Vec<String> = used
        .into_iter()
        .filter(|p| *p != "xml" && *p != "xmlns" && !declared.contains(p))
        .map(str::to_string)
        .collect();
    if missing.is_empty() {
        return text;
    }

    tracing::debug!(prefixes = ?missing, "declaring undeclared namespace prefixes");
    let name_end = start_tag_regex()
        .find_at(&text, root.start)
        .map_or(root.start, |m| m.end());
    let mut out = String::with_capacity(text.len() + missing.len() * 48);
    out.push_str(&text[..name_end]);
    for prefix in &missing {
        out.push_str(" xmlns:");
        out.push_str(prefix);
        out.push_str("=\"");
        out.push_str(PLACEHOLDER_NAMESPACE);
        out.push_str(prefix);
        out.push('"');
    }
    out.push_str(&text[name_end..]);
    Cow::Owned(out)
}

/// Byte offset just past the `>` closing the start tag that begins before `from`, skipping
/// quoted attribute values.
fn start_tag_end(text: &str, from: usize) -> usize {
    let mut quote: Option<u8> = None;
    for (i, &b) in text.as_bytes().iter().enumerate().skip(from) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return i + 1,
            None => {}
        }
    }
    text.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_namespace_becomes_mx_prefix_declaration() {
        let xml = r#"<mxfile xmlns="http://www.jgraph.com/"><diagram/></mxfile>"#;
        assert_eq!(
            normalize(xml),
            r#"<mxfile xmlns:mx="http://www.jgraph.com/"><diagram/></mxfile>"#
        );
    }

    #[test]
    fn default_namespace_is_dropped_when_mx_is_already_declared() {
        let xml = r#"<mxfile xmlns:mx="urn:a" xmlns="urn:a"><diagram/></mxfile>"#;
        assert_eq!(
            normalize(xml),
            r#"<mxfile xmlns:mx="urn:a"><diagram/></mxfile>"#
        );
    }

    #[test]
    fn undeclared_prefixes_are_declared_on_the_root() {
        let xml = r#"<?xml version="1.0"?><mx:mxfile><mx:diagram a:b="1"/></mx:mxfile>"#;
        let out = normalize(xml);
        assert!(out.starts_with(
            r#"<?xml version="1.0"?><mx:mxfile xmlns:a="urn:drawmacro:undeclared:a" xmlns:mx="urn:drawmacro:undeclared:mx">"#
        ));
        assert!(roxmltree::Document::parse(&out).is_ok());
    }

    #[test]
    fn attribute_values_are_left_alone() {
        let xml = r#"<mxfile xmlns="urn:a"><mxCell value="see xmlns='urn:x' here" tip="q a:b='c'"/></mxfile>"#;
        assert_eq!(
            normalize(xml),
            r#"<mxfile xmlns:mx="urn:a"><mxCell value="see xmlns='urn:x' here" tip="q a:b='c'"/></mxfile>"#
        );

        let xml = r#"<mxfile><mxCell value="see xmlns='urn:x' a:b='c'"/></mxfile>"#;
        assert!(matches!(normalize(xml), Cow::Borrowed(_)));
    }

    #[test]
    fn clean_documents_are_borrowed() {
        let xml = r#"<mxfile host="x"><diagram name="a:b"/></mxfile>"#;
        assert!(matches!(normalize(xml), Cow::Borrowed(_)));
    }
}
