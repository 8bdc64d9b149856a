//! XML text escaping shared by the envelope writer and the macro block builder.

/// Escapes text for use inside a double-quoted attribute value.
///
/// Line breaks and tabs are written as character references: XML attribute-value
/// normalization would otherwise turn them into spaces on the way back in.
pub(crate) fn escape_attr_into(out: &mut String, text: &str) {
    escape_into(out, text, true);
}

pub(crate) fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_attr_into(&mut out, text);
    out
}

/// Escapes element text content.
pub(crate) fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(&mut out, text, false);
    out
}

/// First character of `text` outside the XML 1.0 `Char` production. Such characters cannot be
/// written even as character references.
pub(crate) fn first_non_xml_char(text: &str) -> Option<char> {
    text.chars().find(|&c| {
        !matches!(
            c,
            '\t' | '\n'
                | '\r'
                | '\u{20}'..='\u{D7FF}'
                | '\u{E000}'..='\u{FFFD}'
                | '\u{10000}'..='\u{10FFFF}'
        )
    })
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    let bytes = text.as_bytes();
    let mut start = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        let esc = match b {
            b'&' => Some("&amp;"),
            b'<' => Some("&lt;"),
            b'>' => Some("&gt;"),
            b'"' if attribute => Some("&quot;"),
            b'\'' if attribute => Some("&apos;"),
            b'\n' if attribute => Some("&#10;"),
            b'\r' => Some("&#13;"),
            b'\t' if attribute => Some("&#9;"),
            _ => None,
        };
        let Some(esc) = esc else {
            continue;
        };
        if start < i {
            out.push_str(&text[start..i]);
        }
        out.push_str(esc);
        start = i + 1;
    }
    if start < text.len() {
        out.push_str(&text[start..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_attr_covers_markup_and_whitespace() {
        assert_eq!(
            escape_attr("a<b & \"c\"\nd\te"),
            "a&lt;b &amp; &quot;c&quot;&#10;d&#9;e"
        );
        assert_eq!(escape_attr("xmlns='urn:x'"), "xmlns=&apos;urn:x&apos;");
        assert_eq!(escape_attr("plain"), "plain");
    }

    #[test]
    fn escape_text_keeps_quotes_and_newlines() {
        assert_eq!(escape_text("x > \"y\" 'z'\n"), "x &gt; \"y\" 'z'\n");
    }

    #[test]
    fn non_xml_chars_are_found() {
        assert_eq!(first_non_xml_char("tab\tnewline\n\u{1F600}"), None);
        assert_eq!(first_non_xml_char("bell\u{7}"), Some('\u{7}'));
        assert_eq!(first_non_xml_char("\u{0}"), Some('\u{0}'));
        assert_eq!(first_non_xml_char("x\u{FFFE}"), Some('\u{FFFE}'));
    }
}
